//! Resolution of person references to Notion user ids.
//!
//! Callers name people by email, by the local part of their email, by
//! display name, or by user id. All references in one call are resolved
//! against a single listing of the workspace directory.

use crate::error::{Error, Result};
use crate::notion::types::User;
use crate::notion::{is_notion_id, NotionApi};
use tracing::debug;

/// Resolve person references to user ids, preserving order and dropping
/// duplicates.
///
/// The directory is only listed if some reference is not already a user id.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if a reference matches nobody,
/// [`Error::Ambiguous`] if it matches several people, and any error from
/// listing the directory.
pub async fn resolve_people(api: &dyn NotionApi, references: &[String]) -> Result<Vec<String>> {
    let references: Vec<&str> =
        references.iter().map(|r| r.trim()).filter(|r| !r.is_empty()).collect();
    if references.iter().all(|r| is_notion_id(r)) {
        return Ok(dedupe(references.into_iter().map(str::to_string)));
    }

    let users = list_all_users(api).await?;
    debug!(users = users.len(), references = references.len(), "Resolving people");
    let resolved = references
        .into_iter()
        .map(|reference| match_person(&users, reference))
        .collect::<Result<Vec<_>>>()?;
    Ok(dedupe(resolved.into_iter()))
}

async fn list_all_users(api: &dyn NotionApi) -> Result<Vec<User>> {
    let mut users = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = api.list_users(cursor.as_deref()).await?;
        users.extend(page.results);
        match page.next_cursor {
            Some(next) if page.has_more => cursor = Some(next),
            _ => return Ok(users),
        }
    }
}

/// Match one reference against the directory.
///
/// Tried in order: user id, full email, email local part, display name. The
/// first rule with any match decides.
fn match_person(users: &[User], reference: &str) -> Result<String> {
    if is_notion_id(reference) {
        return Ok(reference.to_string());
    }

    let rules: [&dyn Fn(&User) -> bool; 3] = [
        &|u: &User| u.email().is_some_and(|e| e.eq_ignore_ascii_case(reference)),
        &|u: &User| {
            u.email()
                .and_then(|e| e.split('@').next())
                .is_some_and(|local| local.eq_ignore_ascii_case(reference))
        },
        &|u: &User| u.name.as_deref().is_some_and(|n| n.trim() == reference),
    ];

    for rule in rules {
        let matches: Vec<&User> = users.iter().filter(|&u| rule(u)).collect();
        match matches.as_slice() {
            [] => continue,
            [user] => return Ok(user.id.clone()),
            many => {
                return Err(Error::Ambiguous {
                    what: "person",
                    id: reference.to_string(),
                    count: many.len(),
                })
            }
        }
    }
    Err(Error::NotFound { what: "person", id: reference.to_string() })
}

fn dedupe(ids: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = Vec::new();
    for id in ids {
        if !seen.contains(&id) {
            seen.push(id);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::{Call, FakeNotion};

    const HONG_ID: &str = "11111111111111111111111111111111";

    fn directory() -> FakeNotion {
        let notion = FakeNotion::new();
        notion.add_user(User::person(HONG_ID, "홍길동", "hong@example.com"));
        notion.add_user(User::person("u-kim", "Kim", "kim@example.com"));
        notion.add_user(User::person("u-lee1", "Lee", "lee.a@example.com"));
        notion.add_user(User::person("u-lee2", "Lee", "lee.b@example.com"));
        notion
    }

    #[tokio::test]
    async fn test_ids_skip_the_directory() {
        let notion = directory();
        let ids = resolve_people(&notion, &[HONG_ID.to_string()]).await.unwrap();
        assert_eq!(ids, vec![HONG_ID]);
        assert!(notion.calls().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_by_email_local_part_and_name() {
        let notion = directory();
        let refs = vec![
            "hong".to_string(),
            "KIM@example.com".to_string(),
            "홍길동".to_string(),
        ];
        let ids = resolve_people(&notion, &refs).await.unwrap();
        assert_eq!(ids, vec![HONG_ID, "u-kim"]);
        let listings = notion.calls().iter().filter(|c| matches!(c, Call::ListUsers)).count();
        assert_eq!(listings, 1);
    }

    #[tokio::test]
    async fn test_shared_name_is_ambiguous() {
        let notion = directory();
        let err = resolve_people(&notion, &["Lee".to_string()]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Ambiguous);
    }

    #[tokio::test]
    async fn test_unknown_person() {
        let notion = directory();
        let err = resolve_people(&notion, &["nobody".to_string()]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("nobody"));
    }

    #[tokio::test]
    async fn test_blank_references_are_ignored() {
        let notion = directory();
        assert!(resolve_people(&notion, &["  ".to_string()]).await.unwrap().is_empty());
    }
}
