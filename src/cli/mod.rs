//! Command-line interface for notion-tasks.
//!
//! The same operations the MCP server exposes, for scripts and for checking a
//! configuration by hand. Every command prints JSON on success and a one-line
//! error on stderr on failure.

mod inbox;
mod markdown;
mod run;
mod task;


pub use inbox::InboxCommand;
pub use markdown::MarkdownCommand;
pub use run::{run, run_with, CliOutput};
pub use task::TaskCommand;

use clap::{Parser, Subcommand};

/// Notion task board and inbox from the command line.
///
/// Reads the Notion token and database ids from ~/.notion-tasks/config.yaml
/// or from NOTION_TOKEN, NOTION_TASKS_DATABASE_ID and NOTION_INBOX_DATABASE_ID.
#[derive(Parser, Debug)]
#[command(name = "notion-tasks")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Task management - create, read, update, archive and log work on tasks.
    ///
    /// Tasks are named by key (MKL-123) or by Notion page id.
    #[command(subcommand)]
    Task(TaskCommand),

    /// Inbox management - capture and triage inbox items.
    #[command(subcommand)]
    Inbox(InboxCommand),

    /// Convert between Markdown and Notion block JSON (stdin to stdout).
    #[command(subcommand)]
    Markdown(MarkdownCommand),

    /// Show the configuration in effect, with the token redacted.
    Config,

    /// Show version information.
    Version,
}

impl Command {
    /// Returns true if this command reads its input from stdin.
    #[must_use]
    pub const fn needs_stdin(&self) -> bool {
        match self {
            Self::Markdown(_) => true,
            Self::Task(TaskCommand::Log { content, .. }) => content.is_none(),
            _ => false,
        }
    }

    /// Returns true if this command talks to Notion.
    #[must_use]
    pub const fn needs_workspace(&self) -> bool {
        matches!(self, Self::Task(_) | Self::Inbox(_))
    }
}
