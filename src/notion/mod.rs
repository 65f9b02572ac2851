//! Access to the Notion API.
//!
//! [`NotionApi`] is the seam between the task board and the remote store:
//! [`NotionClient`] talks HTTP, while tests use the in-memory fake in
//! [`crate::testing`].

pub mod client;
pub mod types;

pub use client::NotionClient;
pub use types::{
    Block, DatabaseQuery, Filter, Page, PageUpdate, Paginated, PropertyMap, PropertyValue,
    RichText, User,
};

use crate::error::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

/// Most blocks Notion accepts in a single create or append request.
pub const MAX_BLOCKS_PER_REQUEST: usize = 100;

/// Largest page size Notion returns for list endpoints.
pub const MAX_PAGE_SIZE: usize = 100;

static NOTION_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-?[0-9a-fA-F]{4}-?[0-9a-fA-F]{4}-?[0-9a-fA-F]{4}-?[0-9a-fA-F]{12}$")
        .unwrap()
});

/// Whether `id` has the shape of a Notion object id (a UUID, dashed or not).
#[must_use]
pub fn is_notion_id(id: &str) -> bool {
    NOTION_ID.is_match(id)
}

/// Operations the task board needs from Notion.
///
/// Every method is a single remote call (or, for the list methods, a single
/// page of results). Retries and rate limiting belong to the implementation.
#[async_trait]
pub trait NotionApi: Send + Sync {
    /// Fetch a page's properties.
    async fn retrieve_page(&self, page_id: &str) -> Result<Page>;

    /// Create a page in a database with initial body blocks.
    ///
    /// Callers pass at most [`MAX_BLOCKS_PER_REQUEST`] children.
    async fn create_page(
        &self,
        database_id: &str,
        properties: PropertyMap,
        children: Vec<Block>,
    ) -> Result<Page>;

    /// Update a page's properties or archived flag.
    async fn update_page(&self, page_id: &str, update: PageUpdate) -> Result<Page>;

    /// Query a database for pages.
    async fn query_database(
        &self,
        database_id: &str,
        query: DatabaseQuery,
    ) -> Result<Paginated<Page>>;

    /// List one page of a block's children.
    async fn list_block_children(
        &self,
        block_id: &str,
        start_cursor: Option<&str>,
        page_size: usize,
    ) -> Result<Paginated<Block>>;

    /// Append blocks to the end of a block's children.
    ///
    /// Callers pass at most [`MAX_BLOCKS_PER_REQUEST`] children.
    async fn append_block_children(&self, block_id: &str, children: Vec<Block>) -> Result<()>;

    /// List one page of workspace users.
    async fn list_users(&self, start_cursor: Option<&str>) -> Result<Paginated<User>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_notion_id() {
        assert!(is_notion_id("1c6f2a1e8b7d4c3a9e5f0a1b2c3d4e5f"));
        assert!(is_notion_id("1c6f2a1e-8b7d-4c3a-9e5f-0a1b2c3d4e5f"));
        assert!(is_notion_id("1C6F2A1E-8B7D-4C3A-9E5F-0A1B2C3D4E5F"));
        assert!(!is_notion_id("MKL-123"));
        assert!(!is_notion_id("1c6f2a1e8b7d4c3a9e5f0a1b2c3d4e5"));
        assert!(!is_notion_id(""));
    }
}
