//! Markdown conversion subcommands.

use clap::Subcommand;

/// Offline conversion between Markdown and Notion block JSON.
#[derive(Subcommand, Debug, Clone, Copy)]
pub enum MarkdownCommand {
    /// Read Markdown on stdin, print a JSON array of Notion blocks.
    #[command(name = "to-blocks")]
    ToBlocks,

    /// Read a JSON array of Notion blocks on stdin, print Markdown.
    #[command(name = "from-blocks")]
    FromBlocks,
}
