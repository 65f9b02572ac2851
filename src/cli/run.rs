//! Command execution for the CLI.
//!
//! This module handles running CLI commands and producing output.

use crate::cli::{Command, InboxCommand, MarkdownCommand, TaskCommand};
use crate::config::{self, Config};
use crate::error::{Error, Result};
use crate::markdown::{blocks_to_markdown, markdown_to_blocks};
use crate::notion::types::Block;
use crate::tasks::{InboxQuery, NewInboxItem, NewTask, TaskChanges, TaskQuery, Workspace};
use serde::Serialize;
use serde_json::Value;
use std::process::ExitCode;
use std::sync::Arc;

/// Output from running the CLI, with separate stdout and stderr messages.
#[derive(Debug)]
pub struct CliOutput {
    /// Exit code for the process.
    pub exit_code: ExitCode,
    /// Messages to print to stdout.
    pub stdout: Vec<String>,
    /// Messages to print to stderr.
    pub stderr: Vec<String>,
}

/// Run a CLI command with the given stdin input.
///
/// Task and inbox commands load the configuration and connect to Notion.
pub async fn run(command: Command, stdin: &str) -> CliOutput {
    if !command.needs_workspace() {
        return run_local(command, stdin);
    }
    match open_workspace() {
        Ok(workspace) => run_with(&workspace, command, stdin).await,
        Err(e) => error_output(&e),
    }
}

/// Run a CLI command against an existing workspace.
pub async fn run_with(workspace: &Workspace, command: Command, stdin: &str) -> CliOutput {
    match command {
        Command::Task(cmd) => run_task_cmd(workspace, cmd, stdin).await,
        Command::Inbox(cmd) => run_inbox_cmd(workspace, cmd).await,
        other => run_local(other, stdin),
    }
}

fn open_workspace() -> Result<Workspace> {
    let config = Config::load()?;
    let settings = config.workspace_settings()?;
    Ok(Workspace::new(Arc::new(config.client()?), settings))
}

// === Local Commands ===

fn run_local(command: Command, stdin: &str) -> CliOutput {
    match command {
        Command::Version => success_output(format!("notion-tasks v{}", crate::VERSION)),
        Command::Config => run_config(),
        Command::Markdown(cmd) => run_markdown_cmd(cmd, stdin),
        Command::Task(_) | Command::Inbox(_) => {
            error_output(&Error::Config("command needs a Notion workspace".to_string()))
        }
    }
}

fn run_config() -> CliOutput {
    let mut config = match Config::load() {
        Ok(config) => config,
        Err(e) => return error_output(&e),
    };
    if config.notion_token.is_some() {
        config.notion_token = Some("<redacted>".to_string());
    }
    let path = config::config_path()
        .map_or_else(|| "(no config file)".to_string(), |p| p.display().to_string());
    match serde_yaml::to_string(&config) {
        Ok(yaml) => CliOutput {
            exit_code: ExitCode::SUCCESS,
            stdout: vec![format!("# {path}"), yaml],
            stderr: vec![],
        },
        Err(e) => error_output(&Error::from(e)),
    }
}

fn run_markdown_cmd(cmd: MarkdownCommand, stdin: &str) -> CliOutput {
    match cmd {
        MarkdownCommand::ToBlocks => json_output(&markdown_to_blocks(stdin)),
        MarkdownCommand::FromBlocks => match parse_blocks(stdin) {
            Ok(blocks) => success_output(blocks_to_markdown(&blocks)),
            Err(e) => error_output(&e),
        },
    }
}

/// Parse a block array, or a block-children response holding one in `results`.
fn parse_blocks(input: &str) -> Result<Vec<Block>> {
    let value: Value = serde_json::from_str(input)
        .map_err(|e| Error::validation(format!("invalid block JSON: {e}")))?;
    let items = match &value {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("results") {
            Some(Value::Array(items)) => items,
            _ => return Err(Error::validation("expected a JSON array of blocks")),
        },
        _ => return Err(Error::validation("expected a JSON array of blocks")),
    };
    Ok(items.iter().map(Block::from_json).collect())
}

// === Task Commands ===

async fn run_task_cmd(workspace: &Workspace, cmd: TaskCommand, stdin: &str) -> CliOutput {
    match cmd {
        TaskCommand::Create { title, status, priority, assignees, tags, content } => {
            let new = NewTask { title, status, priority, assignees, tags, content };
            result_output(workspace.create_task(new).await)
        }
        TaskCommand::Get { id } => result_output(workspace.get_task(&id).await),
        TaskCommand::Content { id, max_blocks } => {
            result_output(workspace.get_task_detail(&id, max_blocks).await)
        }
        TaskCommand::Update { id, title, priority, assignees, tags } => {
            let changes = TaskChanges { title, priority, assignees, tags };
            result_output(workspace.update_task(&id, changes).await)
        }
        TaskCommand::Status { id, status } => {
            result_output(workspace.update_task_status(&id, &status).await)
        }
        TaskCommand::Log { id, author, log_type, content } => {
            let content = content.as_deref().unwrap_or(stdin);
            result_output(workspace.add_task_log(&id, content, &author, &log_type).await)
        }
        TaskCommand::Archive { id } => result_output(workspace.set_task_archived(&id, true).await),
        TaskCommand::Unarchive { id } => {
            result_output(workspace.set_task_archived(&id, false).await)
        }
        TaskCommand::List { status, assignee, tag, limit } => {
            let query = TaskQuery { status, assignee, tag, limit };
            result_output(workspace.list_tasks(query).await)
        }
    }
}

// === Inbox Commands ===

async fn run_inbox_cmd(workspace: &Workspace, cmd: InboxCommand) -> CliOutput {
    match cmd {
        InboxCommand::Create { title, authors, tags, content } => {
            let new = NewInboxItem { title, authors, tags, content };
            result_output(workspace.create_inbox(new).await)
        }
        InboxCommand::Get { id } => result_output(workspace.get_inbox(&id).await),
        InboxCommand::Content { id, max_blocks } => {
            result_output(workspace.get_inbox_detail(&id, max_blocks).await)
        }
        InboxCommand::Archive { id } => result_output(workspace.set_inbox_archived(&id, true).await),
        InboxCommand::Unarchive { id } => {
            result_output(workspace.set_inbox_archived(&id, false).await)
        }
        InboxCommand::List { tag, limit } => {
            result_output(workspace.list_inbox(InboxQuery { tag, limit }).await)
        }
    }
}

// === Output Helpers ===

fn result_output<T: Serialize>(result: Result<T>) -> CliOutput {
    match result {
        Ok(value) => json_output(&value),
        Err(e) => error_output(&e),
    }
}

fn json_output<T: Serialize>(value: &T) -> CliOutput {
    match serde_json::to_string_pretty(value) {
        Ok(json) => success_output(json),
        Err(e) => error_output(&Error::from(e)),
    }
}

fn success_output(message: String) -> CliOutput {
    CliOutput { exit_code: ExitCode::SUCCESS, stdout: vec![message], stderr: vec![] }
}

fn error_output(error: &Error) -> CliOutput {
    CliOutput {
        exit_code: ExitCode::from(1),
        stdout: vec![],
        stderr: vec![format!("Error: {}: {error}", error.kind().label())],
    }
}
