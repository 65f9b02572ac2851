//! Testing utilities and fake implementations.
//!
//! These types are provided for use in tests. They may appear unused in
//! the library itself but are consumed by unit tests.

#![allow(dead_code)]
#![allow(clippy::missing_panics_doc)] // poisoned locks only happen after a test already panicked

use crate::error::{Error, Result};
use crate::notion::types::{
    Block, DatabaseQuery, Filter, Page, PageUpdate, Paginated, PropertyMap, PropertyValue, User,
};
use crate::notion::{NotionApi, MAX_BLOCKS_PER_REQUEST, MAX_PAGE_SIZE};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// A call made against [`FakeNotion`], recorded in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// `retrieve_page`.
    RetrievePage(String),
    /// `create_page`.
    CreatePage {
        /// Target database.
        database_id: String,
        /// Properties sent.
        properties: PropertyMap,
        /// Initial body blocks.
        children: Vec<Block>,
    },
    /// `update_page`.
    UpdatePage {
        /// Target page.
        page_id: String,
        /// Update sent.
        update: PageUpdate,
    },
    /// `query_database`.
    QueryDatabase {
        /// Target database.
        database_id: String,
        /// Query sent.
        query: DatabaseQuery,
    },
    /// `list_block_children`.
    ListBlockChildren {
        /// Parent block.
        block_id: String,
        /// Cursor sent.
        start_cursor: Option<String>,
    },
    /// `append_block_children`.
    AppendBlockChildren {
        /// Parent block.
        block_id: String,
        /// Blocks sent.
        children: Vec<Block>,
    },
    /// `list_users`.
    ListUsers,
}

#[derive(Debug)]
struct StoredPage {
    database_id: String,
    page: Page,
}

#[derive(Debug, Default)]
struct State {
    pages: Vec<StoredPage>,
    blocks: HashMap<String, Vec<Block>>,
    users: Vec<User>,
    calls: Vec<Call>,
    next_id: u64,
}

/// An in-memory Notion workspace.
///
/// Pages live in named databases, page bodies are flat block lists, and
/// every call is recorded for later inspection. Request limits (100 blocks
/// per create or append) are enforced the way Notion enforces them.
#[derive(Debug)]
pub struct FakeNotion {
    state: Mutex<State>,
    page_size: usize,
}

impl Default for FakeNotion {
    fn default() -> Self {
        Self { state: Mutex::new(State::default()), page_size: MAX_PAGE_SIZE }
    }
}

impl FakeNotion {
    /// Create an empty workspace.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return list results in pages of `page_size` regardless of the request.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Add a page to a database.
    pub fn add_page(&self, database_id: &str, page: Page) {
        self.state
            .lock()
            .unwrap()
            .pages
            .push(StoredPage { database_id: database_id.to_string(), page });
    }

    /// Add a page whose properties are filled in by `build`.
    pub fn add_page_with(&self, database_id: &str, page_id: &str, build: impl FnOnce(&mut PropertyMap)) {
        let mut properties = PropertyMap::new();
        build(&mut properties);
        self.add_page(
            database_id,
            Page {
                id: page_id.to_string(),
                url: Some(format!("https://www.notion.so/{page_id}")),
                archived: false,
                properties,
            },
        );
    }

    /// Replace a page's body.
    pub fn set_blocks(&self, page_id: &str, blocks: Vec<Block>) {
        self.state.lock().unwrap().blocks.insert(page_id.to_string(), blocks);
    }

    /// Add a workspace user.
    pub fn add_user(&self, user: User) {
        self.state.lock().unwrap().users.push(user);
    }

    /// Calls made so far.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Current state of a page.
    #[must_use]
    pub fn page(&self, page_id: &str) -> Option<Page> {
        let state = self.state.lock().unwrap();
        state.pages.iter().find(|p| p.page.id == page_id).map(|p| p.page.clone())
    }

    /// Current body of a page.
    #[must_use]
    pub fn blocks(&self, page_id: &str) -> Vec<Block> {
        self.state.lock().unwrap().blocks.get(page_id).cloned().unwrap_or_default()
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn paginate<T: Clone>(&self, items: &[T], cursor: Option<&str>, requested: usize) -> Result<Paginated<T>> {
        let start = match cursor {
            None => 0,
            Some(cursor) => cursor.parse::<usize>().map_err(|_| bad_request("invalid start_cursor"))?,
        };
        let size = requested.clamp(1, MAX_PAGE_SIZE).min(self.page_size);
        let end = (start + size).min(items.len());
        let results = items.get(start..end).map(<[T]>::to_vec).unwrap_or_default();
        let has_more = end < items.len();
        Ok(Paginated { results, next_cursor: has_more.then(|| end.to_string()), has_more })
    }
}

fn bad_request(message: &str) -> Error {
    Error::Upstream { status: 400, code: "validation_error".to_string(), message: message.to_string() }
}

fn check_block_limit(children: &[Block]) -> Result<()> {
    if children.len() > MAX_BLOCKS_PER_REQUEST {
        return Err(bad_request("body.children.length should be ≤ 100"));
    }
    Ok(())
}

/// Evaluate a query filter against a page's properties.
#[must_use]
pub fn filter_matches(filter: &Filter, properties: &PropertyMap) -> bool {
    match filter {
        Filter::UniqueIdEquals { property, number } => matches!(
            properties.get(property),
            Some(PropertyValue::UniqueId { number: Some(n), .. }) if n == number
        ),
        Filter::SelectEquals { property, value } => matches!(
            properties.get(property),
            Some(PropertyValue::Select(Some(label))) if label == value
        ),
        Filter::MultiSelectContains { property, value } => matches!(
            properties.get(property),
            Some(PropertyValue::MultiSelect(labels)) if labels.contains(value)
        ),
        Filter::PeopleContains { property, person_id } => matches!(
            properties.get(property),
            Some(PropertyValue::People(ids)) if ids.contains(person_id)
        ),
        Filter::And(filters) => filters.iter().all(|f| filter_matches(f, properties)),
    }
}

#[async_trait]
impl NotionApi for FakeNotion {
    async fn retrieve_page(&self, page_id: &str) -> Result<Page> {
        self.record(Call::RetrievePage(page_id.to_string()));
        self.page(page_id).ok_or_else(|| Error::NotFound { what: "page", id: page_id.to_string() })
    }

    async fn create_page(
        &self,
        database_id: &str,
        properties: PropertyMap,
        children: Vec<Block>,
    ) -> Result<Page> {
        self.record(Call::CreatePage {
            database_id: database_id.to_string(),
            properties: properties.clone(),
            children: children.clone(),
        });
        check_block_limit(&children)?;

        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("{:032x}", state.next_id);
        let page = Page {
            id: id.clone(),
            url: Some(format!("https://www.notion.so/{id}")),
            archived: false,
            properties,
        };
        state.pages.push(StoredPage { database_id: database_id.to_string(), page: page.clone() });
        state.blocks.insert(id, children);
        Ok(page)
    }

    async fn update_page(&self, page_id: &str, update: PageUpdate) -> Result<Page> {
        self.record(Call::UpdatePage { page_id: page_id.to_string(), update: update.clone() });
        let mut state = self.state.lock().unwrap();
        let stored = state
            .pages
            .iter_mut()
            .find(|p| p.page.id == page_id)
            .ok_or_else(|| Error::NotFound { what: "page", id: page_id.to_string() })?;
        if let Some(properties) = update.properties {
            stored.page.properties.extend(properties);
        }
        if let Some(archived) = update.archived {
            stored.page.archived = archived;
        }
        Ok(stored.page.clone())
    }

    async fn query_database(
        &self,
        database_id: &str,
        query: DatabaseQuery,
    ) -> Result<Paginated<Page>> {
        self.record(Call::QueryDatabase { database_id: database_id.to_string(), query: query.clone() });
        let mut pages: Vec<Page> = {
            let state = self.state.lock().unwrap();
            state
                .pages
                .iter()
                .filter(|p| p.database_id == database_id && !p.page.archived)
                .filter(|p| query.filter.as_ref().map_or(true, |f| filter_matches(f, &p.page.properties)))
                .map(|p| p.page.clone())
                .collect()
        };
        if query.newest_first {
            pages.reverse();
        }
        self.paginate(&pages, query.start_cursor.as_deref(), query.page_size.unwrap_or(MAX_PAGE_SIZE))
    }

    async fn list_block_children(
        &self,
        block_id: &str,
        start_cursor: Option<&str>,
        page_size: usize,
    ) -> Result<Paginated<Block>> {
        self.record(Call::ListBlockChildren {
            block_id: block_id.to_string(),
            start_cursor: start_cursor.map(str::to_string),
        });
        let blocks = {
            let state = self.state.lock().unwrap();
            if !state.pages.iter().any(|p| p.page.id == block_id) && !state.blocks.contains_key(block_id) {
                return Err(Error::NotFound { what: "block", id: block_id.to_string() });
            }
            state.blocks.get(block_id).cloned().unwrap_or_default()
        };
        self.paginate(&blocks, start_cursor, page_size)
    }

    async fn append_block_children(&self, block_id: &str, children: Vec<Block>) -> Result<()> {
        self.record(Call::AppendBlockChildren {
            block_id: block_id.to_string(),
            children: children.clone(),
        });
        check_block_limit(&children)?;
        let mut state = self.state.lock().unwrap();
        if !state.pages.iter().any(|p| p.page.id == block_id) {
            return Err(Error::NotFound { what: "block", id: block_id.to_string() });
        }
        state.blocks.entry(block_id.to_string()).or_default().extend(children);
        Ok(())
    }

    async fn list_users(&self, start_cursor: Option<&str>) -> Result<Paginated<User>> {
        self.record(Call::ListUsers);
        let users = self.state.lock().unwrap().users.clone();
        self.paginate(&users, start_cursor, MAX_PAGE_SIZE)
    }
}

/// A store whose every call fails with the same upstream error.
#[derive(Debug)]
pub struct FailingNotion {
    status: u16,
    code: String,
}

impl FailingNotion {
    /// Fail every call with the given HTTP status and Notion error code.
    #[must_use]
    pub fn new(status: u16, code: impl Into<String>) -> Self {
        Self { status, code: code.into() }
    }

    fn fail<T>(&self) -> Result<T> {
        Err(Error::Upstream {
            status: self.status,
            code: self.code.clone(),
            message: format!("simulated {} failure", self.code),
        })
    }
}

#[async_trait]
impl NotionApi for FailingNotion {
    async fn retrieve_page(&self, _page_id: &str) -> Result<Page> {
        self.fail()
    }

    async fn create_page(&self, _: &str, _: PropertyMap, _: Vec<Block>) -> Result<Page> {
        self.fail()
    }

    async fn update_page(&self, _page_id: &str, _update: PageUpdate) -> Result<Page> {
        self.fail()
    }

    async fn query_database(&self, _: &str, _: DatabaseQuery) -> Result<Paginated<Page>> {
        self.fail()
    }

    async fn list_block_children(&self, _: &str, _: Option<&str>, _: usize) -> Result<Paginated<Block>> {
        self.fail()
    }

    async fn append_block_children(&self, _: &str, _: Vec<Block>) -> Result<()> {
        self.fail()
    }

    async fn list_users(&self, _start_cursor: Option<&str>) -> Result<Paginated<User>> {
        self.fail()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_paginates_blocks() {
        let notion = FakeNotion::new().with_page_size(2);
        notion.add_page_with("db", "p1", |_| {});
        notion.set_blocks("p1", (0..5).map(|i| Block::paragraph(&i.to_string())).collect());

        let first = notion.list_block_children("p1", None, 100).await.unwrap();
        assert_eq!(first.results.len(), 2);
        assert!(first.has_more);
        let second = notion
            .list_block_children("p1", first.next_cursor.as_deref(), 100)
            .await
            .unwrap();
        assert_eq!(second.results[0], Block::paragraph("2"));
    }

    #[tokio::test]
    async fn test_fake_enforces_block_limit() {
        let notion = FakeNotion::new();
        let blocks = vec![Block::Divider; MAX_BLOCKS_PER_REQUEST + 1];
        let err = notion.create_page("db", PropertyMap::new(), blocks).await.unwrap_err();
        assert!(matches!(err, Error::Upstream { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_fake_query_skips_archived_pages() {
        let notion = FakeNotion::new();
        notion.add_page_with("db", "p1", |props| {
            props.insert("Status".to_string(), PropertyValue::Select(Some("완료".to_string())));
        });
        notion.add_page_with("db", "p2", |_| {});
        notion.update_page("p2", PageUpdate::archived(true)).await.unwrap();

        let all = notion.query_database("db", DatabaseQuery::default()).await.unwrap();
        assert_eq!(all.results.len(), 1);

        let filtered = notion
            .query_database(
                "db",
                DatabaseQuery {
                    filter: Some(Filter::SelectEquals {
                        property: "Status".to_string(),
                        value: "보류".to_string(),
                    }),
                    ..DatabaseQuery::default()
                },
            )
            .await
            .unwrap();
        assert!(filtered.results.is_empty());
    }

    #[tokio::test]
    async fn test_failing_notion() {
        let notion = FailingNotion::new(429, "rate_limited");
        let err = notion.retrieve_page("p1").await.unwrap_err();
        assert!(err.is_retryable());
    }
}
