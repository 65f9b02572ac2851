//! Inbox CLI subcommands.

use clap::Subcommand;

/// Inbox commands. Inbox items are named by Notion page id.
#[derive(Subcommand, Debug, Clone)]
pub enum InboxCommand {
    /// Capture an inbox item.
    Create {
        /// Title (required)
        #[arg(short, long)]
        title: String,

        /// Author (email, email name, display name or user id); repeatable
        #[arg(short, long = "author")]
        authors: Vec<String>,

        /// Tag; repeatable
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Page body as Markdown
        #[arg(short, long)]
        content: Option<String>,
    },

    /// Get an inbox item's properties.
    Get {
        /// Page id
        id: String,
    },

    /// Get an inbox item with its body rendered as Markdown.
    Content {
        /// Page id
        id: String,

        /// Maximum number of blocks to read
        #[arg(long)]
        max_blocks: Option<usize>,
    },

    /// Archive an inbox item.
    Archive {
        /// Page id
        id: String,
    },

    /// Restore an archived inbox item.
    Unarchive {
        /// Page id
        id: String,
    },

    /// List inbox items, newest first.
    List {
        /// Filter by tag
        #[arg(long)]
        tag: Option<String>,

        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,
    },
}
