//! Mapping between task/inbox fields and Notion page properties.
//!
//! Writing emits a property only for fields that are set, so a partial
//! update never clears what it does not mention. Reading treats a missing
//! property as an empty field, but a property of the wrong type or a select
//! label outside the known set is an error naming the property.

use crate::error::{Error, Result};
use crate::notion::types::{plain_text, text_segments, Page, PropertyMap, PropertyValue};
use crate::tasks::models::{InboxFields, InboxItem, Priority, Task, TaskFields, TaskStatus};
use serde::{Deserialize, Serialize};

/// Property names of the tasks database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskSchema {
    /// Title property.
    pub title: String,
    /// Status select.
    pub status: String,
    /// Priority select.
    pub priority: String,
    /// Assignee people property.
    pub assignees: String,
    /// Tags multi-select.
    pub tags: String,
    /// Sprint relation.
    pub sprint: String,
    /// Unique-id property holding the human key.
    pub key: String,
}

impl Default for TaskSchema {
    fn default() -> Self {
        Self {
            title: "Title".to_string(),
            status: "Status".to_string(),
            priority: "Priority".to_string(),
            assignees: "Assignee".to_string(),
            tags: "Tags".to_string(),
            sprint: "Sprint".to_string(),
            key: "ID".to_string(),
        }
    }
}

/// Property names of the inbox database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InboxSchema {
    /// Title property.
    pub title: String,
    /// Author people property.
    pub authors: String,
    /// Tags multi-select.
    pub tags: String,
}

impl Default for InboxSchema {
    fn default() -> Self {
        Self { title: "Title".to_string(), authors: "Author".to_string(), tags: "Tags".to_string() }
    }
}

/// Build the property map for the set fields of a task.
#[must_use]
pub fn task_to_properties(fields: &TaskFields, schema: &TaskSchema) -> PropertyMap {
    let mut properties = PropertyMap::new();
    put_title(&mut properties, &schema.title, fields.title.as_deref());
    if let Some(status) = fields.status {
        properties.insert(schema.status.clone(), PropertyValue::Select(Some(status.label().to_string())));
    }
    if let Some(priority) = fields.priority {
        properties
            .insert(schema.priority.clone(), PropertyValue::Select(Some(priority.label().to_string())));
    }
    put_list(&mut properties, &schema.assignees, &fields.assignees, PropertyValue::People);
    put_list(&mut properties, &schema.tags, &fields.tags, PropertyValue::MultiSelect);
    properties
}

/// Read task fields from a property map.
///
/// # Errors
///
/// Returns [`Error::PropertyParse`] if a property has the wrong type or a
/// select holds an unknown label.
pub fn task_fields_from_properties(properties: &PropertyMap, schema: &TaskSchema) -> Result<TaskFields> {
    Ok(TaskFields {
        title: read_title(properties, &schema.title)?,
        status: read_select(properties, &schema.status)?
            .map(|label| {
                TaskStatus::from_label(&label)
                    .ok_or_else(|| Error::property(&schema.status, format!("unrecognized status '{label}'")))
            })
            .transpose()?,
        priority: read_select(properties, &schema.priority)?
            .map(|label| {
                Priority::from_label(&label).ok_or_else(|| {
                    Error::property(&schema.priority, format!("unrecognized priority '{label}'"))
                })
            })
            .transpose()?,
        assignees: read_people(properties, &schema.assignees)?,
        tags: read_multi_select(properties, &schema.tags)?,
    })
}

/// Build a [`Task`] from a page of the tasks database.
///
/// # Errors
///
/// Returns [`Error::PropertyParse`] under the same conditions as
/// [`task_fields_from_properties`].
pub fn task_from_page(page: &Page, schema: &TaskSchema) -> Result<Task> {
    let properties = &page.properties;
    let key = match properties.get(&schema.key) {
        None => None,
        Some(PropertyValue::UniqueId { prefix, number }) => number.map(|n| match prefix {
            Some(prefix) if !prefix.is_empty() => format!("{prefix}-{n}"),
            _ => n.to_string(),
        }),
        Some(other) => return Err(wrong_type(&schema.key, "unique_id", other)),
    };
    let sprint = match properties.get(&schema.sprint) {
        None => None,
        Some(PropertyValue::Relation(ids)) => ids.first().cloned(),
        Some(other) => return Err(wrong_type(&schema.sprint, "relation", other)),
    };
    Ok(Task {
        page_id: page.id.clone(),
        key,
        fields: task_fields_from_properties(properties, schema)?,
        sprint,
        url: page.url.clone(),
        archived: page.archived,
    })
}

/// Build the property map for the set fields of an inbox item.
#[must_use]
pub fn inbox_to_properties(fields: &InboxFields, schema: &InboxSchema) -> PropertyMap {
    let mut properties = PropertyMap::new();
    put_title(&mut properties, &schema.title, fields.title.as_deref());
    put_list(&mut properties, &schema.authors, &fields.authors, PropertyValue::People);
    put_list(&mut properties, &schema.tags, &fields.tags, PropertyValue::MultiSelect);
    properties
}

/// Read inbox fields from a property map.
///
/// # Errors
///
/// Returns [`Error::PropertyParse`] if a property has the wrong type.
pub fn inbox_fields_from_properties(
    properties: &PropertyMap,
    schema: &InboxSchema,
) -> Result<InboxFields> {
    Ok(InboxFields {
        title: read_title(properties, &schema.title)?,
        authors: read_people(properties, &schema.authors)?,
        tags: read_multi_select(properties, &schema.tags)?,
    })
}

/// Build an [`InboxItem`] from a page of the inbox database.
///
/// # Errors
///
/// Returns [`Error::PropertyParse`] if a property has the wrong type.
pub fn inbox_from_page(page: &Page, schema: &InboxSchema) -> Result<InboxItem> {
    Ok(InboxItem {
        page_id: page.id.clone(),
        fields: inbox_fields_from_properties(&page.properties, schema)?,
        url: page.url.clone(),
        archived: page.archived,
    })
}

fn put_title(properties: &mut PropertyMap, name: &str, title: Option<&str>) {
    if let Some(title) = title.filter(|t| !t.is_empty()) {
        properties.insert(name.to_string(), PropertyValue::Title(text_segments(title)));
    }
}

fn put_list(
    properties: &mut PropertyMap,
    name: &str,
    values: &[String],
    make: fn(Vec<String>) -> PropertyValue,
) {
    if !values.is_empty() {
        properties.insert(name.to_string(), make(values.to_vec()));
    }
}

fn wrong_type(name: &str, expected: &str, found: &PropertyValue) -> Error {
    Error::property(name, format!("expected {expected} property, found {}", found.type_name()))
}

fn read_title(properties: &PropertyMap, name: &str) -> Result<Option<String>> {
    match properties.get(name) {
        None => Ok(None),
        Some(PropertyValue::Title(text) | PropertyValue::RichText(text)) => {
            let title = plain_text(text);
            Ok((!title.is_empty()).then_some(title))
        }
        Some(other) => Err(wrong_type(name, "title", other)),
    }
}

fn read_select(properties: &PropertyMap, name: &str) -> Result<Option<String>> {
    match properties.get(name) {
        None => Ok(None),
        Some(PropertyValue::Select(label)) => Ok(label.clone()),
        Some(other) => Err(wrong_type(name, "select", other)),
    }
}

fn read_multi_select(properties: &PropertyMap, name: &str) -> Result<Vec<String>> {
    match properties.get(name) {
        None => Ok(Vec::new()),
        Some(PropertyValue::MultiSelect(labels)) => Ok(labels.clone()),
        Some(other) => Err(wrong_type(name, "multi_select", other)),
    }
}

fn read_people(properties: &PropertyMap, name: &str) -> Result<Vec<String>> {
    match properties.get(name) {
        None => Ok(Vec::new()),
        Some(PropertyValue::People(ids)) => Ok(ids.clone()),
        Some(other) => Err(wrong_type(name, "people", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::notion::types::RichText;
    use proptest::prelude::*;

    fn schema() -> TaskSchema {
        TaskSchema::default()
    }

    #[test]
    fn test_only_set_fields_are_written() {
        let fields = TaskFields { status: Some(TaskStatus::Done), ..TaskFields::default() };
        let properties = task_to_properties(&fields, &schema());
        assert_eq!(properties.len(), 1);
        assert_eq!(properties["Status"], PropertyValue::Select(Some("완료".to_string())));
    }

    #[test]
    fn test_empty_title_is_not_written() {
        let fields = TaskFields { title: Some(String::new()), ..TaskFields::default() };
        assert!(task_to_properties(&fields, &schema()).is_empty());
    }

    #[test]
    fn test_missing_properties_read_as_empty() {
        let fields = task_fields_from_properties(&PropertyMap::new(), &schema()).unwrap();
        assert!(fields.is_empty());
    }

    #[test]
    fn test_unknown_status_label_names_property() {
        let mut properties = PropertyMap::new();
        properties.insert("Status".to_string(), PropertyValue::Select(Some("Later".to_string())));
        let err = task_fields_from_properties(&properties, &schema()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let message = err.to_string();
        assert!(message.contains("Status"));
        assert!(message.contains("Later"));
    }

    #[test]
    fn test_wrong_property_type_is_an_error() {
        let mut properties = PropertyMap::new();
        properties.insert("Tags".to_string(), PropertyValue::RichText(vec![RichText::plain("x")]));
        let err = task_fields_from_properties(&properties, &schema()).unwrap_err();
        assert!(err.to_string().contains("expected multi_select"));
    }

    #[test]
    fn test_empty_select_reads_as_none() {
        let mut properties = PropertyMap::new();
        properties.insert("Priority".to_string(), PropertyValue::Select(None));
        let fields = task_fields_from_properties(&properties, &schema()).unwrap();
        assert_eq!(fields.priority, None);
    }

    #[test]
    fn test_task_from_page_reads_key_and_sprint() {
        let mut properties = PropertyMap::new();
        properties.insert(
            "ID".to_string(),
            PropertyValue::UniqueId { prefix: Some("MKL".to_string()), number: Some(123) },
        );
        properties.insert("Sprint".to_string(), PropertyValue::Relation(vec!["s1".to_string()]));
        properties.insert("Title".to_string(), PropertyValue::Title(vec![RichText::plain("Ship")]));
        properties.insert(
            "Assignee".to_string(),
            PropertyValue::People(vec!["u1".to_string(), "u2".to_string()]),
        );
        let page = Page { id: "p1".to_string(), url: None, archived: false, properties };

        let task = task_from_page(&page, &schema()).unwrap();
        assert_eq!(task.key.as_deref(), Some("MKL-123"));
        assert_eq!(task.sprint.as_deref(), Some("s1"));
        assert_eq!(task.fields.title.as_deref(), Some("Ship"));
        assert_eq!(task.fields.assignees, vec!["u1", "u2"]);
    }

    #[test]
    fn test_custom_property_names() {
        let schema = InboxSchema { authors: "작성자".to_string(), ..InboxSchema::default() };
        let fields = InboxFields { authors: vec!["u1".to_string()], ..InboxFields::default() };
        let properties = inbox_to_properties(&fields, &schema);
        assert!(properties.contains_key("작성자"));
        assert_eq!(inbox_fields_from_properties(&properties, &schema).unwrap(), fields);
    }

    fn label() -> impl Strategy<Value = String> {
        "[a-z가-힣][a-z0-9가-힣 ]{0,15}"
    }

    prop_compose! {
        fn task_fields()(
            title in prop::option::of(label()),
            status in prop::option::of(prop::sample::select(TaskStatus::ALL)),
            priority in prop::option::of(prop::sample::select(Priority::ALL)),
            assignees in prop::collection::vec("[0-9a-f]{32}", 0..3),
            tags in prop::collection::vec(label(), 0..4),
        ) -> TaskFields {
            TaskFields { title, status, priority, assignees, tags }
        }
    }

    proptest! {
        #[test]
        fn prop_task_properties_round_trip(fields in task_fields()) {
            let properties = task_to_properties(&fields, &schema());
            let parsed = task_fields_from_properties(&properties, &schema()).unwrap();
            prop_assert_eq!(parsed, fields);
        }

        #[test]
        fn prop_inbox_properties_round_trip(
            title in prop::option::of(label()),
            authors in prop::collection::vec("[0-9a-f]{32}", 0..3),
            tags in prop::collection::vec(label(), 0..4),
        ) {
            let fields = InboxFields { title, authors, tags };
            let schema = InboxSchema::default();
            let parsed = inbox_fields_from_properties(&inbox_to_properties(&fields, &schema), &schema).unwrap();
            prop_assert_eq!(parsed, fields);
        }
    }
}
