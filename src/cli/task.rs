//! Task CLI subcommands.

use clap::Subcommand;

/// Task commands.
///
/// ## Quick Start
///
/// ```bash
/// notion-tasks task create --title "Fix login bug" --priority high --assignee kim
/// notion-tasks task status MKL-123 in-progress
/// echo "Found the cause" | notion-tasks task log MKL-123 --author kim --type blocker
/// notion-tasks task content MKL-123
/// ```
///
/// Status: not-started, paused, in-progress, done, archived, consulted.
/// Priority: urgent, high, medium, low. The Korean labels are accepted too.
#[derive(Subcommand, Debug, Clone)]
pub enum TaskCommand {
    /// Create a task.
    ///
    /// New tasks start as not-started unless --status is given.
    Create {
        /// Title (required)
        #[arg(short, long)]
        title: String,

        /// Initial status
        #[arg(short, long)]
        status: Option<String>,

        /// Priority
        #[arg(short, long)]
        priority: Option<String>,

        /// Assignee (email, email name, display name or user id); repeatable
        #[arg(short, long = "assignee")]
        assignees: Vec<String>,

        /// Tag; repeatable
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Page body as Markdown
        #[arg(short, long)]
        content: Option<String>,
    },

    /// Get a task's properties.
    Get {
        /// Task key or page id
        id: String,
    },

    /// Get a task with its body rendered as Markdown.
    Content {
        /// Task key or page id
        id: String,

        /// Maximum number of blocks to read
        #[arg(long)]
        max_blocks: Option<usize>,
    },

    /// Update a task's fields.
    ///
    /// Only specified fields are updated; others remain unchanged.
    Update {
        /// Task key or page id
        id: String,

        /// New title
        #[arg(short, long)]
        title: Option<String>,

        /// New priority
        #[arg(short, long)]
        priority: Option<String>,

        /// Replacement assignee; repeatable
        #[arg(short, long = "assignee")]
        assignees: Vec<String>,

        /// Replacement tag; repeatable
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Set a task's status.
    Status {
        /// Task key or page id
        id: String,

        /// New status
        status: String,
    },

    /// Append a work log to a task (content from --content or stdin).
    Log {
        /// Task key or page id
        id: String,

        /// Who is writing the log
        #[arg(short, long)]
        author: String,

        /// Log type: progress, blocker, decision, note
        #[arg(short = 'k', long = "type", default_value = "progress")]
        log_type: String,

        /// Log body as Markdown; read from stdin if omitted
        #[arg(short, long)]
        content: Option<String>,
    },

    /// Archive a task.
    Archive {
        /// Task key or page id
        id: String,
    },

    /// Restore an archived task (use the page id).
    Unarchive {
        /// Task page id
        id: String,
    },

    /// List tasks, newest first.
    List {
        /// Filter by status
        #[arg(short, long)]
        status: Option<String>,

        /// Filter by assignee
        #[arg(short, long)]
        assignee: Option<String>,

        /// Filter by tag
        #[arg(long)]
        tag: Option<String>,

        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,
    },
}
