//! Task and inbox model types.
//!
//! Select-backed enumerations carry both a stable machine code (used in tool
//! inputs and JSON output) and the Korean display label stored in Notion.
//! Parsing accepts either, so a renamed label upstream only breaks reads of
//! that label and not the tool surface.

use serde::{Deserialize, Serialize};

/// Error when a label or code is not part of a fixed enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidLabel {
    /// Which enumeration was being parsed ("status", "priority", "log type").
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
    /// Accepted codes, for the error message.
    pub expected: &'static [&'static str],
}

impl std::fmt::Display for InvalidLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid {}: '{}' (must be one of: {})",
            self.kind,
            self.value,
            self.expected.join(", ")
        )
    }
}

impl std::error::Error for InvalidLabel {}

impl From<InvalidLabel> for crate::error::Error {
    fn from(err: InvalidLabel) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Define a select-backed enumeration with a machine code and a display label.
macro_rules! labelled_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $code:literal, $label:literal; )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "kebab-case")]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $name {
            /// Every value, in display order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            const CODES: &'static [&'static str] = &[$($code),+];

            /// Stable machine code.
            #[must_use]
            pub const fn code(self) -> &'static str {
                match self {
                    $(Self::$variant => $code,)+
                }
            }

            /// Label stored in the Notion select property.
            #[must_use]
            pub const fn label(self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }

            /// Parse a display label exactly as stored in Notion.
            #[must_use]
            pub fn from_label(label: &str) -> Option<Self> {
                Self::ALL.iter().copied().find(|v| v.label() == label)
            }

            /// Parse caller input: a machine code (case-insensitive, `_` or `-`)
            /// or a display label.
            ///
            /// # Errors
            ///
            /// Returns an error if the input matches neither.
            pub fn parse(input: &str) -> Result<Self, InvalidLabel> {
                let trimmed = input.trim();
                let code = trimmed.to_ascii_lowercase().replace('_', "-");
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.code() == code || v.label() == trimmed)
                    .ok_or_else(|| InvalidLabel {
                        kind: $kind,
                        value: input.to_string(),
                        expected: Self::CODES,
                    })
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

labelled_enum! {
    /// Task status.
    TaskStatus, "status" {
        /// Not picked up yet.
        NotStarted => "not-started", "시작 전";
        /// Put on hold.
        Paused => "paused", "일시중지";
        /// Being worked on.
        InProgress => "in-progress", "진행 중";
        /// Finished.
        Done => "done", "완료";
        /// Shelved for good.
        Archived => "archived", "보관";
        /// Handed over for consultation.
        Consulted => "consulted", "상담 완료";
    }
}

labelled_enum! {
    /// Task priority.
    Priority, "priority" {
        /// Drop everything.
        Urgent => "urgent", "긴급";
        /// High priority.
        High => "high", "높음";
        /// Normal priority.
        Medium => "medium", "보통";
        /// Low priority.
        Low => "low", "낮음";
    }
}

labelled_enum! {
    /// Kind of a work-log entry appended to a task page.
    LogType, "log type" {
        /// Progress report.
        Progress => "progress", "진행 상황";
        /// Something blocking the task.
        Blocker => "blocker", "이슈";
        /// A decision that was made.
        Decision => "decision", "결정 사항";
        /// Free-form note.
        Note => "note", "메모";
    }
}

impl LogType {
    /// Marker shown in front of the log heading.
    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Progress => "📝",
            Self::Blocker => "🚧",
            Self::Decision => "✅",
            Self::Note => "💬",
        }
    }
}

/// The writable fields of a task, as stored in page properties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFields {
    /// Task title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Current status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    /// Priority.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// Assigned user ids.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assignees: Vec<String>,
    /// Tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl TaskFields {
    /// Whether no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.assignees.is_empty()
            && self.tags.is_empty()
    }
}

/// A task page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Notion page id.
    pub page_id: String,
    /// Human-facing key such as `MKL-123`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Property values.
    #[serde(flatten)]
    pub fields: TaskFields,
    /// Related sprint page id (lookup only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sprint: Option<String>,
    /// Page URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Whether the page is archived.
    pub archived: bool,
}

/// A task with its page body rendered as Markdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskDetail {
    /// The task.
    #[serde(flatten)]
    pub task: Task,
    /// Page body.
    pub content: String,
    /// Whether the body was cut off at the block limit.
    pub truncated: bool,
}

/// The writable fields of an inbox item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxFields {
    /// Item title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Author user ids.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    /// Tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// An inbox page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxItem {
    /// Notion page id.
    pub page_id: String,
    /// Property values.
    #[serde(flatten)]
    pub fields: InboxFields,
    /// Page URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Whether the page is archived.
    pub archived: bool,
}

/// An inbox item with its page body rendered as Markdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InboxDetail {
    /// The item.
    #[serde(flatten)]
    pub item: InboxItem,
    /// Page body.
    pub content: String,
    /// Whether the body was cut off at the block limit.
    pub truncated: bool,
}

/// Confirmation of an appended log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogReceipt {
    /// Page the entry was appended to.
    pub page_id: String,
    /// Heading text of the entry.
    pub heading: String,
    /// Number of blocks appended.
    pub blocks_appended: usize,
}
