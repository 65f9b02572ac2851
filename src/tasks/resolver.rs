//! Resolution of task identifiers to Notion page ids.
//!
//! A task can be named by its page id or by its human key (`MKL-123`). Page
//! ids pass through untouched; keys are looked up with a query on the
//! database's unique-id property.

use crate::error::{Error, Result};
use crate::notion::types::{DatabaseQuery, Filter, PropertyValue};
use crate::notion::{is_notion_id, NotionApi};
use crate::tasks::properties::TaskSchema;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

static HUMAN_KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([A-Za-z][A-Za-z0-9]*)-(\d+)$").unwrap());

/// A human-facing task key such as `MKL-123`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HumanKey {
    /// Database prefix.
    pub prefix: String,
    /// Auto-increment number.
    pub number: u64,
}

impl HumanKey {
    /// Whether a unique-id property value denotes this key.
    ///
    /// Prefixes compare case-insensitively.
    #[must_use]
    pub fn matches(&self, value: &PropertyValue) -> bool {
        match value {
            PropertyValue::UniqueId { prefix, number } => {
                *number == Some(self.number)
                    && prefix.as_deref().is_some_and(|p| p.eq_ignore_ascii_case(&self.prefix))
            }
            _ => false,
        }
    }
}

impl fmt::Display for HumanKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.prefix, self.number)
    }
}

impl FromStr for HumanKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || {
            Error::validation(format!(
                "invalid task id '{s}': expected a page id or a key like PREFIX-123"
            ))
        };
        let caps = HUMAN_KEY.captures(s).ok_or_else(invalid)?;
        let number = caps[2].parse().map_err(|_| invalid())?;
        Ok(Self { prefix: caps[1].to_string(), number })
    }
}

/// How a task was identified by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskRef {
    /// A Notion page id.
    PageId(String),
    /// A human key.
    Key(HumanKey),
}

impl TaskRef {
    /// Classify an identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if `id` is neither a page id nor a key.
    pub fn parse(id: &str) -> Result<Self> {
        let id = id.trim();
        if is_notion_id(id) {
            Ok(Self::PageId(id.to_string()))
        } else {
            id.parse().map(Self::Key)
        }
    }
}

/// Resolve a page id or human key to a page id in the tasks database.
///
/// Page ids are returned unchanged without contacting Notion.
///
/// # Errors
///
/// Returns [`Error::Validation`] for a malformed id, [`Error::NotFound`] if
/// no page has the key, [`Error::Ambiguous`] if several do, and any error
/// from the query itself.
pub async fn resolve_task_id(
    api: &dyn NotionApi,
    database_id: &str,
    schema: &TaskSchema,
    id: &str,
) -> Result<String> {
    let key = match TaskRef::parse(id)? {
        TaskRef::PageId(page_id) => return Ok(page_id),
        TaskRef::Key(key) => key,
    };

    let query = DatabaseQuery {
        filter: Some(Filter::UniqueIdEquals { property: schema.key.clone(), number: key.number }),
        page_size: Some(10),
        ..DatabaseQuery::default()
    };
    let response = api.query_database(database_id, query).await?;
    let mut matches: Vec<String> = response
        .results
        .into_iter()
        .filter(|page| page.properties.get(&schema.key).is_some_and(|v| key.matches(v)))
        .map(|page| page.id)
        .collect();
    debug!(key = %key, matches = matches.len(), "Resolved task key");

    match matches.len() {
        0 => Err(Error::KeyNotFound { key: key.to_string() }),
        1 => Ok(matches.remove(0)),
        count => Err(Error::Ambiguous { what: "task", id: key.to_string(), count }),
    }
}

/// Check that an inbox item id is a page id.
///
/// Inbox items have no human key, so nothing needs looking up.
///
/// # Errors
///
/// Returns [`Error::Validation`] if `id` is not a page id.
pub fn inbox_page_id(id: &str) -> Result<String> {
    let id = id.trim();
    if is_notion_id(id) {
        Ok(id.to_string())
    } else {
        Err(Error::validation(format!("invalid inbox id '{id}': expected a Notion page id")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::FakeNotion;

    const TASKS_DB: &str = "tasks-db";
    const PAGE_ID: &str = "1c6f2a1e8b7d4c3a9e5f0a1b2c3d4e5f";

    fn keyed(notion: &FakeNotion, id: &str, prefix: &str, number: u64) {
        notion.add_page_with(TASKS_DB, id, |props| {
            props.insert(
                "ID".to_string(),
                PropertyValue::UniqueId { prefix: Some(prefix.to_string()), number: Some(number) },
            );
        });
    }

    #[test]
    fn test_parse_human_key() {
        let key: HumanKey = "MKL-123".parse().unwrap();
        assert_eq!(key, HumanKey { prefix: "MKL".to_string(), number: 123 });
        assert_eq!(key.to_string(), "MKL-123");
    }

    #[test]
    fn test_malformed_keys_are_rejected() {
        for bad in ["", "123", "MKL", "MKL-", "-12", "MKL-12a", "MKL 12"] {
            let err = bad.parse::<HumanKey>().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{bad}");
        }
    }

    #[test]
    fn test_task_ref_classifies() {
        assert_eq!(TaskRef::parse(PAGE_ID).unwrap(), TaskRef::PageId(PAGE_ID.to_string()));
        assert!(matches!(TaskRef::parse("mkl-4").unwrap(), TaskRef::Key(_)));
    }

    #[tokio::test]
    async fn test_page_id_passes_through_without_calls() {
        let notion = FakeNotion::new();
        let resolved =
            resolve_task_id(&notion, TASKS_DB, &TaskSchema::default(), PAGE_ID).await.unwrap();
        assert_eq!(resolved, PAGE_ID);
        assert!(notion.calls().is_empty());
    }

    #[tokio::test]
    async fn test_key_resolves_to_page() {
        let notion = FakeNotion::new();
        keyed(&notion, "p1", "MKL", 123);
        keyed(&notion, "p2", "MKL", 124);
        let resolved =
            resolve_task_id(&notion, TASKS_DB, &TaskSchema::default(), "MKL-123").await.unwrap();
        assert_eq!(resolved, "p1");
    }

    #[tokio::test]
    async fn test_other_prefix_is_discarded() {
        let notion = FakeNotion::new();
        keyed(&notion, "p1", "OPS", 7);
        let err =
            resolve_task_id(&notion, TASKS_DB, &TaskSchema::default(), "MKL-7").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("MKL-7"));
    }

    #[tokio::test]
    async fn test_duplicate_key_is_ambiguous() {
        let notion = FakeNotion::new();
        keyed(&notion, "p1", "MKL", 9);
        keyed(&notion, "p2", "MKL", 9);
        let err =
            resolve_task_id(&notion, TASKS_DB, &TaskSchema::default(), "MKL-9").await.unwrap_err();
        assert!(matches!(err, Error::Ambiguous { count: 2, .. }));
    }

    #[test]
    fn test_inbox_ids_must_be_page_ids() {
        assert_eq!(inbox_page_id(PAGE_ID).unwrap(), PAGE_ID);
        assert_eq!(inbox_page_id("INB-1").unwrap_err().kind(), ErrorKind::Validation);
    }
}
