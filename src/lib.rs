//! # `notion_tasks`
//!
//! A Notion-backed task board and inbox, served to agents over MCP.
//!
//! - [`notion`]: the typed Notion API client and the [`notion::NotionApi`] seam
//! - [`markdown`]: conversion between Markdown and Notion blocks
//! - [`tasks`]: task and inbox models and the [`tasks::Workspace`] operations
//! - [`mcp`]: the MCP tool server (feature `mcp`)
//! - [`cli`]: the command-line interface (feature `cli`)

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod markdown;
pub mod mcp;
pub mod notion;
pub mod paths;
pub mod tasks;
pub mod testing;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }
}
