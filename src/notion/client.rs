//! HTTP implementation of [`NotionApi`] over `reqwest`.
//!
//! The client does not retry. Failed responses are mapped to
//! [`Error::NotFound`] (HTTP 404) or [`Error::Upstream`] carrying Notion's
//! error code and message; [`Error::is_retryable`] tells callers whether a
//! later attempt could succeed.

use super::types::{Block, DatabaseQuery, Page, PageUpdate, Paginated, PropertyMap, User};
use super::{NotionApi, MAX_PAGE_SIZE};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// Public Notion API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.notion.com";

/// API version sent in the `Notion-Version` header.
pub const NOTION_VERSION: &str = "2022-06-28";

/// Default timeout for HTTP requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Notion REST client authenticated with an integration token.
#[derive(Clone)]
pub struct NotionClient {
    base_url: String,
    token: String,
    http: Client,
}

impl std::fmt::Debug for NotionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotionClient").field("base_url", &self.base_url).finish_non_exhaustive()
    }
}

impl NotionClient {
    /// Create a client for the public Notion API.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Self::with_base_url(token, DEFAULT_BASE_URL)
    }

    /// Create a client against a different endpoint (proxies, test servers).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_base_url(token: impl Into<String>, base_url: impl AsRef<str>) -> Result<Self> {
        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(format!("notion-tasks/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            base_url: base_url.as_ref().trim_end_matches('/').to_string(),
            token: token.into(),
            http,
        })
    }

    /// The endpoint this client talks to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/v1/{path}", self.base_url))
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
    }

    /// Send a request and decode a successful JSON body.
    ///
    /// `what` and `id` name the target for 404 errors.
    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        what: &'static str,
        id: &str,
    ) -> Result<T> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let body: Value = response.json().await.unwrap_or(Value::Null);
        Err(error_from_body(status, &body, what, id))
    }
}

/// Map a Notion error body to an [`Error`].
fn error_from_body(status: StatusCode, body: &Value, what: &'static str, id: &str) -> Error {
    let code = body.get("code").and_then(Value::as_str).unwrap_or("unknown").to_string();
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

    warn!(status = status.as_u16(), code = %code, resource = what, id, "Notion request failed");

    if status == StatusCode::NOT_FOUND {
        return Error::NotFound { what, id: id.to_string() };
    }
    Error::Upstream { status: status.as_u16(), code, message }
}

fn page_query(start_cursor: Option<&str>, page_size: usize) -> Vec<(&'static str, String)> {
    let mut query = vec![("page_size", page_size.min(MAX_PAGE_SIZE).to_string())];
    if let Some(cursor) = start_cursor {
        query.push(("start_cursor", cursor.to_string()));
    }
    query
}

#[async_trait]
impl NotionApi for NotionClient {
    async fn retrieve_page(&self, page_id: &str) -> Result<Page> {
        debug!(page_id, "Retrieving page");
        self.send(self.request(Method::GET, &format!("pages/{page_id}")), "page", page_id).await
    }

    async fn create_page(
        &self,
        database_id: &str,
        properties: PropertyMap,
        children: Vec<Block>,
    ) -> Result<Page> {
        debug!(database_id, children = children.len(), "Creating page");
        let body = json!({
            "parent": { "database_id": database_id },
            "properties": properties,
            "children": children,
        });
        self.send(self.request(Method::POST, "pages").json(&body), "database", database_id).await
    }

    async fn update_page(&self, page_id: &str, update: PageUpdate) -> Result<Page> {
        debug!(page_id, archived = ?update.archived, "Updating page");
        self.send(
            self.request(Method::PATCH, &format!("pages/{page_id}")).json(&update),
            "page",
            page_id,
        )
        .await
    }

    async fn query_database(
        &self,
        database_id: &str,
        query: DatabaseQuery,
    ) -> Result<Paginated<Page>> {
        let body = query.to_json();
        debug!(database_id, query = %body, "Querying database");
        self.send(
            self.request(Method::POST, &format!("databases/{database_id}/query")).json(&body),
            "database",
            database_id,
        )
        .await
    }

    async fn list_block_children(
        &self,
        block_id: &str,
        start_cursor: Option<&str>,
        page_size: usize,
    ) -> Result<Paginated<Block>> {
        debug!(block_id, start_cursor = ?start_cursor, page_size, "Listing block children");
        self.send(
            self.request(Method::GET, &format!("blocks/{block_id}/children"))
                .query(&page_query(start_cursor, page_size)),
            "block",
            block_id,
        )
        .await
    }

    async fn append_block_children(&self, block_id: &str, children: Vec<Block>) -> Result<()> {
        debug!(block_id, children = children.len(), "Appending block children");
        let _: Value = self
            .send(
                self.request(Method::PATCH, &format!("blocks/{block_id}/children"))
                    .json(&json!({ "children": children })),
                "block",
                block_id,
            )
            .await?;
        Ok(())
    }

    async fn list_users(&self, start_cursor: Option<&str>) -> Result<Paginated<User>> {
        debug!(start_cursor = ?start_cursor, "Listing users");
        self.send(
            self.request(Method::GET, "users").query(&page_query(start_cursor, MAX_PAGE_SIZE)),
            "users",
            "",
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_error_body_maps_to_upstream() {
        let body = json!({
            "object": "error",
            "status": 429,
            "code": "rate_limited",
            "message": "You have been rate limited."
        });
        let err = error_from_body(StatusCode::TOO_MANY_REQUESTS, &body, "page", "p1");
        match &err {
            Error::Upstream { status, code, .. } => {
                assert_eq!(*status, 429);
                assert_eq!(code, "rate_limited");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.is_retryable());
    }

    #[test]
    fn test_404_maps_to_not_found() {
        let body = json!({ "code": "object_not_found", "message": "Could not find page" });
        let err = error_from_body(StatusCode::NOT_FOUND, &body, "page", "p9");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("p9"));
    }

    #[test]
    fn test_missing_body_uses_reason_phrase() {
        let err = error_from_body(StatusCode::BAD_GATEWAY, &Value::Null, "page", "p1");
        assert!(err.to_string().contains("Bad Gateway"));
    }

    #[test]
    fn test_page_query_caps_size() {
        let query = page_query(Some("abc"), 500);
        assert_eq!(query[0], ("page_size", "100".to_string()));
        assert_eq!(query[1], ("start_cursor", "abc".to_string()));
    }

    #[test]
    fn test_debug_hides_token() {
        let client = NotionClient::with_base_url("secret_abc", "http://localhost:1/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:1");
        assert!(!format!("{client:?}").contains("secret_abc"));
    }
}
