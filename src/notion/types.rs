//! Typed views of the Notion JSON documents this crate handles.
//!
//! Notion properties and blocks are loosely typed JSON objects keyed by a
//! `type` field. Only the kinds the task board needs are modelled; anything
//! else is kept as an explicit `Unsupported` variant carrying its type name.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Longest content Notion accepts in a single rich-text segment.
pub const MAX_TEXT_LEN: usize = 2000;

/// Implement `Serialize`/`Deserialize` through a type's `to_json`/`from_json` pair.
macro_rules! serde_via_json {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                self.to_json().serialize(serializer)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                Value::deserialize(deserializer).map(|value| Self::from_json(&value))
            }
        }
    };
}

/// Inline formatting flags on a rich-text segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Annotations {
    /// Bold text.
    pub bold: bool,
    /// Italic text.
    pub italic: bool,
    /// Struck-through text.
    pub strikethrough: bool,
    /// Inline code.
    pub code: bool,
}

/// A run of text with uniform formatting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RichText {
    /// The text itself.
    pub content: String,
    /// Formatting applied to the whole run.
    pub annotations: Annotations,
    /// Link target, if the run is a link.
    pub link: Option<String>,
}

impl RichText {
    /// An unformatted run.
    pub fn plain(content: impl Into<String>) -> Self {
        Self { content: content.into(), ..Self::default() }
    }

    /// Serialize to Notion's request shape.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut text = json!({ "content": self.content });
        if let Some(url) = &self.link {
            text["link"] = json!({ "url": url });
        }
        let mut value = json!({ "type": "text", "text": text });
        if self.annotations != Annotations::default() {
            let a = self.annotations;
            value["annotations"] = json!({
                "bold": a.bold,
                "italic": a.italic,
                "strikethrough": a.strikethrough,
                "code": a.code,
            });
        }
        value
    }

    /// Parse a rich-text object from a Notion response.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        let content = value
            .get("plain_text")
            .and_then(Value::as_str)
            .or_else(|| value.pointer("/text/content").and_then(Value::as_str))
            .unwrap_or_default()
            .to_string();
        let flag = |name: &str| {
            value
                .get("annotations")
                .and_then(|a| a.get(name))
                .and_then(Value::as_bool)
                .unwrap_or(false)
        };
        let link = value
            .get("href")
            .and_then(Value::as_str)
            .or_else(|| value.pointer("/text/link/url").and_then(Value::as_str))
            .map(str::to_string);
        Self {
            content,
            annotations: Annotations {
                bold: flag("bold"),
                italic: flag("italic"),
                strikethrough: flag("strikethrough"),
                code: flag("code"),
            },
            link,
        }
    }
}

serde_via_json!(RichText);

/// Concatenate the text of a rich-text array, dropping formatting.
#[must_use]
pub fn plain_text(segments: &[RichText]) -> String {
    segments.iter().map(|s| s.content.as_str()).collect()
}

/// Split plain text into segments no longer than [`MAX_TEXT_LEN`] characters.
#[must_use]
pub fn text_segments(content: &str) -> Vec<RichText> {
    if content.is_empty() {
        return Vec::new();
    }
    let chars: Vec<char> = content.chars().collect();
    chars.chunks(MAX_TEXT_LEN).map(|chunk| RichText::plain(chunk.iter().collect::<String>())).collect()
}

fn rich_text_json(segments: &[RichText]) -> Value {
    Value::Array(segments.iter().map(RichText::to_json).collect())
}

fn parse_rich_text(value: Option<&Value>) -> Vec<RichText> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().map(RichText::from_json).collect())
        .unwrap_or_default()
}

fn names(value: Option<&Value>, key: &str) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get(key).and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// A single page property value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// The page title.
    Title(Vec<RichText>),
    /// A free-text property.
    RichText(Vec<RichText>),
    /// A single-select property; `None` when empty.
    Select(Option<String>),
    /// A multi-select property, one label per option.
    MultiSelect(Vec<String>),
    /// A people property, holding user ids.
    People(Vec<String>),
    /// A relation property, holding related page ids.
    Relation(Vec<String>),
    /// An auto-increment ID such as `MKL-123`. Read-only.
    UniqueId {
        /// Prefix configured on the database, if any.
        prefix: Option<String>,
        /// The numeric part.
        number: Option<u64>,
    },
    /// Any property type this crate does not model.
    Unsupported(String),
}

impl PropertyValue {
    /// Notion's type name for this value.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Self::Title(_) => "title",
            Self::RichText(_) => "rich_text",
            Self::Select(_) => "select",
            Self::MultiSelect(_) => "multi_select",
            Self::People(_) => "people",
            Self::Relation(_) => "relation",
            Self::UniqueId { .. } => "unique_id",
            Self::Unsupported(kind) => kind.as_str(),
        }
    }

    /// Serialize to Notion's request shape.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Title(text) => json!({ "title": rich_text_json(text) }),
            Self::RichText(text) => json!({ "rich_text": rich_text_json(text) }),
            Self::Select(Some(name)) => json!({ "select": { "name": name } }),
            Self::Select(None) => json!({ "select": null }),
            Self::MultiSelect(labels) => json!({
                "multi_select": labels.iter().map(|name| json!({ "name": name })).collect::<Vec<_>>()
            }),
            Self::People(ids) => json!({
                "people": ids.iter().map(|id| json!({ "object": "user", "id": id })).collect::<Vec<_>>()
            }),
            Self::Relation(ids) => json!({
                "relation": ids.iter().map(|id| json!({ "id": id })).collect::<Vec<_>>()
            }),
            Self::UniqueId { prefix, number } => {
                json!({ "unique_id": { "prefix": prefix, "number": number } })
            }
            Self::Unsupported(kind) => json!({ "type": kind }),
        }
    }

    /// Parse a property object from a page response.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        let kind = value.get("type").and_then(Value::as_str).unwrap_or("unknown");
        let body = value.get(kind);
        match kind {
            "title" => Self::Title(parse_rich_text(body)),
            "rich_text" => Self::RichText(parse_rich_text(body)),
            "select" => Self::Select(
                body.and_then(|b| b.get("name")).and_then(Value::as_str).map(str::to_string),
            ),
            "multi_select" => Self::MultiSelect(names(body, "name")),
            "people" => Self::People(names(body, "id")),
            "relation" => Self::Relation(names(body, "id")),
            "unique_id" => Self::UniqueId {
                prefix: body
                    .and_then(|b| b.get("prefix"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
                number: body.and_then(|b| b.get("number")).and_then(Value::as_u64),
            },
            other => Self::Unsupported(other.to_string()),
        }
    }
}

serde_via_json!(PropertyValue);

/// Page properties keyed by property name.
pub type PropertyMap = BTreeMap<String, PropertyValue>;

/// A Notion page with its properties (the body is fetched separately).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Page {
    /// Page identifier.
    pub id: String,
    /// Public URL of the page.
    #[serde(default)]
    pub url: Option<String>,
    /// Whether the page is archived (in the trash).
    #[serde(default)]
    pub archived: bool,
    /// Page properties.
    #[serde(default)]
    pub properties: PropertyMap,
}

/// A content block in a page body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Plain paragraph.
    Paragraph(Vec<RichText>),
    /// Heading of level 1 to 3.
    Heading {
        /// Heading level, clamped to 1..=3.
        level: u8,
        /// Heading text.
        text: Vec<RichText>,
    },
    /// Bulleted list item.
    BulletedListItem(Vec<RichText>),
    /// Numbered list item.
    NumberedListItem(Vec<RichText>),
    /// Checkbox item.
    ToDo {
        /// Whether the box is ticked.
        checked: bool,
        /// Item text.
        text: Vec<RichText>,
    },
    /// Block quote.
    Quote(Vec<RichText>),
    /// Fenced code.
    Code {
        /// Notion language name; `plain text` when untagged.
        language: String,
        /// Code text.
        text: Vec<RichText>,
    },
    /// Horizontal rule.
    Divider,
    /// A block type this crate does not model.
    Unsupported(String),
}

impl Block {
    /// A paragraph of plain text.
    pub fn paragraph(content: &str) -> Self {
        Self::Paragraph(text_segments(content))
    }

    /// A heading of plain text; levels outside 1..=3 are clamped.
    pub fn heading(level: u8, content: &str) -> Self {
        Self::Heading { level: level.clamp(1, 3), text: text_segments(content) }
    }

    /// Notion's type name for this block.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Self::Paragraph(_) => "paragraph",
            Self::Heading { level: 1, .. } => "heading_1",
            Self::Heading { level: 2, .. } => "heading_2",
            Self::Heading { .. } => "heading_3",
            Self::BulletedListItem(_) => "bulleted_list_item",
            Self::NumberedListItem(_) => "numbered_list_item",
            Self::ToDo { .. } => "to_do",
            Self::Quote(_) => "quote",
            Self::Code { .. } => "code",
            Self::Divider => "divider",
            Self::Unsupported(kind) => kind.as_str(),
        }
    }

    /// The block's rich text, if it carries any.
    #[must_use]
    pub fn rich_text(&self) -> Option<&[RichText]> {
        match self {
            Self::Paragraph(text)
            | Self::Heading { text, .. }
            | Self::BulletedListItem(text)
            | Self::NumberedListItem(text)
            | Self::ToDo { text, .. }
            | Self::Quote(text)
            | Self::Code { text, .. } => Some(text),
            Self::Divider | Self::Unsupported(_) => None,
        }
    }

    /// Serialize to Notion's request shape.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let body = match self {
            Self::ToDo { checked, text } => {
                json!({ "rich_text": rich_text_json(text), "checked": checked })
            }
            Self::Code { language, text } => {
                json!({ "rich_text": rich_text_json(text), "language": language })
            }
            Self::Divider | Self::Unsupported(_) => json!({}),
            other => json!({ "rich_text": rich_text_json(other.rich_text().unwrap_or_default()) }),
        };
        let kind = self.type_name();
        let mut value = json!({ "object": "block", "type": kind });
        value[kind] = body;
        value
    }

    /// Parse a block object from a Notion response.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        let kind = value.get("type").and_then(Value::as_str).unwrap_or("unknown");
        let body = value.get(kind);
        let text = || parse_rich_text(body.and_then(|b| b.get("rich_text")));
        match kind {
            "paragraph" => Self::Paragraph(text()),
            "heading_1" => Self::Heading { level: 1, text: text() },
            "heading_2" => Self::Heading { level: 2, text: text() },
            "heading_3" => Self::Heading { level: 3, text: text() },
            "bulleted_list_item" => Self::BulletedListItem(text()),
            "numbered_list_item" => Self::NumberedListItem(text()),
            "to_do" => Self::ToDo {
                checked: body
                    .and_then(|b| b.get("checked"))
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
                text: text(),
            },
            "quote" => Self::Quote(text()),
            "code" => Self::Code {
                language: body
                    .and_then(|b| b.get("language"))
                    .and_then(Value::as_str)
                    .unwrap_or("plain text")
                    .to_string(),
                text: text(),
            },
            "divider" => Self::Divider,
            other => Self::Unsupported(other.to_string()),
        }
    }
}

serde_via_json!(Block);

/// Person-specific fields of a workspace user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PersonDetails {
    /// Primary email address.
    #[serde(default)]
    pub email: Option<String>,
}

/// A workspace member (person or bot).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    /// User identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Present for people, absent for bots.
    #[serde(default)]
    pub person: Option<PersonDetails>,
}

impl User {
    /// Build a person entry.
    pub fn person(id: impl Into<String>, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            person: Some(PersonDetails { email: Some(email.into()) }),
        }
    }

    /// The user's email address, if they are a person with one.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.person.as_ref().and_then(|p| p.email.as_deref())
    }
}

/// One page of a cursor-paginated list response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Paginated<T> {
    /// Items on this page.
    pub results: Vec<T>,
    /// Cursor for the next page.
    #[serde(default)]
    pub next_cursor: Option<String>,
    /// Whether more pages follow.
    #[serde(default)]
    pub has_more: bool,
}

impl<T> Paginated<T> {
    /// A final page holding `results`.
    pub const fn last(results: Vec<T>) -> Self {
        Self { results, next_cursor: None, has_more: false }
    }
}

/// Body of a page update: new property values and/or the archived flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageUpdate {
    /// Properties to overwrite. Properties not listed are left untouched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<PropertyMap>,
    /// New archived state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,
}

impl PageUpdate {
    /// Overwrite the given properties.
    pub const fn properties(properties: PropertyMap) -> Self {
        Self { properties: Some(properties), archived: None }
    }

    /// Set the archived flag.
    pub const fn archived(archived: bool) -> Self {
        Self { properties: None, archived: Some(archived) }
    }
}

/// A database query filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Unique-id property equals a number.
    UniqueIdEquals {
        /// Property name.
        property: String,
        /// Number to match.
        number: u64,
    },
    /// Select property equals a label.
    SelectEquals {
        /// Property name.
        property: String,
        /// Label to match.
        value: String,
    },
    /// Multi-select property contains a label.
    MultiSelectContains {
        /// Property name.
        property: String,
        /// Label to match.
        value: String,
    },
    /// People property contains a user.
    PeopleContains {
        /// Property name.
        property: String,
        /// User id to match.
        person_id: String,
    },
    /// All sub-filters must match.
    And(Vec<Filter>),
}

impl Filter {
    /// Combine filters with `and`, collapsing the trivial cases.
    #[must_use]
    pub fn all(mut filters: Vec<Self>) -> Option<Self> {
        match filters.len() {
            0 => None,
            1 => filters.pop(),
            _ => Some(Self::And(filters)),
        }
    }

    /// Serialize to Notion's filter shape.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::UniqueIdEquals { property, number } => {
                json!({ "property": property, "unique_id": { "equals": number } })
            }
            Self::SelectEquals { property, value } => {
                json!({ "property": property, "select": { "equals": value } })
            }
            Self::MultiSelectContains { property, value } => {
                json!({ "property": property, "multi_select": { "contains": value } })
            }
            Self::PeopleContains { property, person_id } => {
                json!({ "property": property, "people": { "contains": person_id } })
            }
            Self::And(filters) => json!({ "and": filters.iter().map(Self::to_json).collect::<Vec<_>>() }),
        }
    }
}

/// A database query request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseQuery {
    /// Optional filter.
    pub filter: Option<Filter>,
    /// Sort newest pages first.
    pub newest_first: bool,
    /// Cursor from a previous page.
    pub start_cursor: Option<String>,
    /// Requested page size (Notion caps this at 100).
    pub page_size: Option<usize>,
}

impl DatabaseQuery {
    /// Serialize to Notion's request body.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut body = json!({});
        if let Some(filter) = &self.filter {
            body["filter"] = filter.to_json();
        }
        if self.newest_first {
            body["sorts"] = json!([{ "timestamp": "created_time", "direction": "descending" }]);
        }
        if let Some(cursor) = &self.start_cursor {
            body["start_cursor"] = json!(cursor);
        }
        if let Some(size) = self.page_size {
            body["page_size"] = json!(size);
        }
        body
    }
}
