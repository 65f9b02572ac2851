//! MCP server for the Notion task board and inbox.
//!
//! Every tool returns either pretty-printed JSON or, on failure, an error
//! result carrying a message prefixed with the error class. Failures never
//! escape as protocol errors.

// The rmcp `#[tool(aggr)]` macro requires ownership of input structs,
// making pass-by-value necessary for all tool handler functions.
#![allow(clippy::needless_pass_by_value)]

use crate::logging::ToolCallGuard;
use crate::tasks::{InboxQuery, NewInboxItem, NewTask, TaskChanges, TaskQuery, Workspace};
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::tool;
use rmcp::Error as McpError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// Instructions for the MCP server, shown to agents using this server.
const INSTRUCTIONS: &str = r"Notion task board and inbox. Use these tools to create, read, update, archive and log work on tasks, and to capture and triage inbox items.

## Identifying tasks

Tasks can be named by their key (e.g. `MKL-123`) or by their Notion page id. Keys only resolve for tasks that are not archived. After archiving a task, repeat the archive or undo it with `unarchive_task` using the `page_id` returned by the first call. Inbox items have no key; always use their page id.

## Values

- Status: `not-started` (시작 전), `paused` (일시중지), `in-progress` (진행 중), `done` (완료), `archived` (보관), `consulted` (상담 완료)
- Priority: `urgent` (긴급), `high` (높음), `medium` (보통), `low` (낮음)
- Log type: `progress` (진행 상황), `blocker` (이슈), `decision` (결정 사항), `note` (메모)

Either the code or the Korean label is accepted.

## People

Assignees and authors can be given as an email address, the part of the email before `@`, a display name, or a Notion user id.

## Content

Page bodies are Markdown: headings, bullet/numbered/to-do lists, quotes, dividers, fenced code, and inline bold, italic, strikethrough, code and links. `add_task_log` appends a headed entry to the end of the task page; it never edits existing content. Reading content returns at most `max_blocks` blocks (default 100) and sets `truncated` when more remain.
";

/// MCP server for the task board.
#[derive(Clone)]
pub struct TasksServer {
    workspace: Arc<Workspace>,
}

impl TasksServer {
    /// Create a server over a workspace.
    #[must_use]
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace: Arc::new(workspace) }
    }
}

// Tool input schemas

/// Input for creating a task.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateTaskInput {
    /// Task title (required).
    pub title: String,
    /// Status code or label (default: not-started).
    pub status: Option<String>,
    /// Priority code or label (optional).
    pub priority: Option<String>,
    /// Assignees: emails, email names, display names or user ids.
    #[serde(default)]
    pub assignees: Vec<String>,
    /// Tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Page body as Markdown (optional).
    pub content: Option<String>,
}

/// Input naming a task.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct TaskIdInput {
    /// Task key (e.g. MKL-123) or page id.
    pub id: String,
}

/// Input for reading a task's content.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetTaskContentInput {
    /// Task key (e.g. MKL-123) or page id.
    pub id: String,
    /// Maximum number of blocks to read (default 100, at most 1000).
    pub max_blocks: Option<usize>,
}

/// Input for updating a task.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateTaskInput {
    /// Task key (e.g. MKL-123) or page id.
    pub id: String,
    /// New title (optional).
    pub title: Option<String>,
    /// New priority code or label (optional).
    pub priority: Option<String>,
    /// Replacement assignees (optional).
    #[serde(default)]
    pub assignees: Vec<String>,
    /// Replacement tags (optional).
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Input for changing a task's status.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateTaskStatusInput {
    /// Task key (e.g. MKL-123) or page id.
    pub id: String,
    /// New status code or label.
    pub status: String,
}

/// Input for appending a work log.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddTaskLogInput {
    /// Task key (e.g. MKL-123) or page id.
    pub id: String,
    /// Log body as Markdown.
    pub content: String,
    /// Who is writing the log.
    pub author: String,
    /// Log type: progress, blocker, decision or note (default: progress).
    #[serde(default = "default_log_type")]
    pub log_type: String,
}

fn default_log_type() -> String {
    "progress".to_string()
}

/// Input for listing tasks.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListTasksInput {
    /// Filter by status (optional).
    pub status: Option<String>,
    /// Filter by assignee (optional).
    pub assignee: Option<String>,
    /// Filter by tag (optional).
    pub tag: Option<String>,
    /// Maximum results (default 50).
    pub limit: Option<usize>,
}

/// Input for creating an inbox item.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateInboxInput {
    /// Item title (required).
    pub title: String,
    /// Authors: emails, email names, display names or user ids.
    #[serde(default)]
    pub authors: Vec<String>,
    /// Tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Page body as Markdown (optional).
    pub content: Option<String>,
}

/// Input naming an inbox item.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct InboxIdInput {
    /// Inbox item page id.
    pub id: String,
}

/// Input for reading an inbox item with content.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetInboxDetailInput {
    /// Inbox item page id.
    pub id: String,
    /// Maximum number of blocks to read (default 100, at most 1000).
    pub max_blocks: Option<usize>,
}

/// Input for listing inbox items.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListInboxInput {
    /// Filter by tag (optional).
    pub tag: Option<String>,
    /// Maximum results (default 50).
    pub limit: Option<usize>,
}

/// Render an operation's outcome as a tool result.
fn respond<T: Serialize>(mut guard: ToolCallGuard, result: crate::error::Result<T>) -> CallToolResult {
    let rendered = result.and_then(|value| Ok(serde_json::to_string_pretty(&value)?));
    match rendered {
        Ok(json) => CallToolResult::success(vec![Content::text(json)]),
        Err(e) => {
            guard.mark_error();
            warn!(error = %e, kind = e.kind().label(), retryable = e.is_retryable(), "Tool call failed");
            CallToolResult::error(vec![Content::text(format!("{}: {e}", e.kind().label()))])
        }
    }
}

// Tool implementations
// Note: rmcp macros require pass-by-value for input parameters

#[tool(tool_box)]
impl TasksServer {
    /// Create a task.
    #[tool(description = "Create a task with title, status, priority, assignees, tags and optional Markdown content")]
    async fn create_task(
        &self,
        #[tool(aggr)] input: CreateTaskInput,
    ) -> Result<CallToolResult, McpError> {
        let guard = ToolCallGuard::new("create_task");
        let new = NewTask {
            title: input.title,
            status: input.status,
            priority: input.priority,
            assignees: input.assignees,
            tags: input.tags,
            content: input.content,
        };
        Ok(respond(guard, self.workspace.create_task(new).await))
    }

    /// Get a task's properties.
    #[tool(description = "Get a task by key (e.g. MKL-123) or page id")]
    async fn get_task(
        &self,
        #[tool(aggr)] input: TaskIdInput,
    ) -> Result<CallToolResult, McpError> {
        let guard = ToolCallGuard::new("get_task");
        Ok(respond(guard, self.workspace.get_task(&input.id).await))
    }

    /// Get a task with its page content.
    #[tool(description = "Get a task with its page content rendered as Markdown")]
    async fn get_task_content(
        &self,
        #[tool(aggr)] input: GetTaskContentInput,
    ) -> Result<CallToolResult, McpError> {
        let guard = ToolCallGuard::new("get_task_content");
        Ok(respond(guard, self.workspace.get_task_detail(&input.id, input.max_blocks).await))
    }

    /// Update task fields.
    #[tool(description = "Update a task's title, priority, assignees or tags; omitted fields are unchanged")]
    async fn update_task(
        &self,
        #[tool(aggr)] input: UpdateTaskInput,
    ) -> Result<CallToolResult, McpError> {
        let guard = ToolCallGuard::new("update_task");
        let changes = TaskChanges {
            title: input.title,
            priority: input.priority,
            assignees: input.assignees,
            tags: input.tags,
        };
        Ok(respond(guard, self.workspace.update_task(&input.id, changes).await))
    }

    /// Change a task's status.
    #[tool(description = "Set a task's status (not-started, paused, in-progress, done, archived, consulted)")]
    async fn update_task_status(
        &self,
        #[tool(aggr)] input: UpdateTaskStatusInput,
    ) -> Result<CallToolResult, McpError> {
        let guard = ToolCallGuard::new("update_task_status");
        Ok(respond(guard, self.workspace.update_task_status(&input.id, &input.status).await))
    }

    /// Archive a task.
    #[tool(description = "Archive a task page. Once archived, its key no longer resolves: repeat or undo with the returned page_id")]
    async fn archive_task(
        &self,
        #[tool(aggr)] input: TaskIdInput,
    ) -> Result<CallToolResult, McpError> {
        let guard = ToolCallGuard::new("archive_task");
        Ok(respond(guard, self.workspace.set_task_archived(&input.id, true).await))
    }

    /// Restore an archived task.
    #[tool(description = "Restore an archived task page (use the page_id returned by archive_task)")]
    async fn unarchive_task(
        &self,
        #[tool(aggr)] input: TaskIdInput,
    ) -> Result<CallToolResult, McpError> {
        let guard = ToolCallGuard::new("unarchive_task");
        Ok(respond(guard, self.workspace.set_task_archived(&input.id, false).await))
    }

    /// Append a work log to a task.
    #[tool(description = "Append a work log entry (progress, blocker, decision or note) to the end of a task page")]
    async fn add_task_log(
        &self,
        #[tool(aggr)] input: AddTaskLogInput,
    ) -> Result<CallToolResult, McpError> {
        let guard = ToolCallGuard::new("add_task_log");
        let result = self
            .workspace
            .add_task_log(&input.id, &input.content, &input.author, &input.log_type)
            .await;
        Ok(respond(guard, result))
    }

    /// List tasks.
    #[tool(description = "List tasks, newest first, optionally filtered by status, assignee or tag")]
    async fn list_tasks(
        &self,
        #[tool(aggr)] input: ListTasksInput,
    ) -> Result<CallToolResult, McpError> {
        let guard = ToolCallGuard::new("list_tasks");
        let query = TaskQuery {
            status: input.status,
            assignee: input.assignee,
            tag: input.tag,
            limit: input.limit,
        };
        Ok(respond(guard, self.workspace.list_tasks(query).await))
    }

    /// Create an inbox item.
    #[tool(description = "Create an inbox item with title, authors, tags and optional Markdown content")]
    async fn create_inbox(
        &self,
        #[tool(aggr)] input: CreateInboxInput,
    ) -> Result<CallToolResult, McpError> {
        let guard = ToolCallGuard::new("create_inbox");
        let new = NewInboxItem {
            title: input.title,
            authors: input.authors,
            tags: input.tags,
            content: input.content,
        };
        Ok(respond(guard, self.workspace.create_inbox(new).await))
    }

    /// Get an inbox item's properties.
    #[tool(description = "Get an inbox item by page id")]
    async fn get_inbox(
        &self,
        #[tool(aggr)] input: InboxIdInput,
    ) -> Result<CallToolResult, McpError> {
        let guard = ToolCallGuard::new("get_inbox");
        Ok(respond(guard, self.workspace.get_inbox(&input.id).await))
    }

    /// Get an inbox item with its page content.
    #[tool(description = "Get an inbox item with its page content rendered as Markdown")]
    async fn get_inbox_detail(
        &self,
        #[tool(aggr)] input: GetInboxDetailInput,
    ) -> Result<CallToolResult, McpError> {
        let guard = ToolCallGuard::new("get_inbox_detail");
        Ok(respond(guard, self.workspace.get_inbox_detail(&input.id, input.max_blocks).await))
    }

    /// List inbox items.
    #[tool(description = "List inbox items, newest first, optionally filtered by tag")]
    async fn list_inbox(
        &self,
        #[tool(aggr)] input: ListInboxInput,
    ) -> Result<CallToolResult, McpError> {
        let guard = ToolCallGuard::new("list_inbox");
        let query = InboxQuery { tag: input.tag, limit: input.limit };
        Ok(respond(guard, self.workspace.list_inbox(query).await))
    }

    /// Archive an inbox item.
    #[tool(description = "Archive an inbox item page")]
    async fn archive_inbox(
        &self,
        #[tool(aggr)] input: InboxIdInput,
    ) -> Result<CallToolResult, McpError> {
        let guard = ToolCallGuard::new("archive_inbox");
        Ok(respond(guard, self.workspace.set_inbox_archived(&input.id, true).await))
    }

    /// Restore an archived inbox item.
    #[tool(description = "Restore an archived inbox item page")]
    async fn unarchive_inbox(
        &self,
        #[tool(aggr)] input: InboxIdInput,
    ) -> Result<CallToolResult, McpError> {
        let guard = ToolCallGuard::new("unarchive_inbox");
        Ok(respond(guard, self.workspace.set_inbox_archived(&input.id, false).await))
    }
}

#[rmcp::tool(tool_box)]
impl rmcp::ServerHandler for TasksServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "notion-tasks-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: Some(INSTRUCTIONS.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContentLimits;
    use crate::notion::types::{PropertyValue, User};
    use crate::tasks::{InboxSchema, TaskSchema, WorkspaceSettings};
    use crate::testing::{FailingNotion, FakeNotion};
    use rmcp::ServerHandler;
    use serde_json::Value;

    const TASKS_DB: &str = "1c6f2a1e8b7d4c3a9e5f0a1b2c3d4e5f";
    const INBOX_DB: &str = "2d7a3b2f9c8e4d4bafa01b2c3d4e5f60";

    fn settings() -> WorkspaceSettings {
        WorkspaceSettings {
            tasks_database_id: TASKS_DB.to_string(),
            inbox_database_id: INBOX_DB.to_string(),
            task_schema: TaskSchema::default(),
            inbox_schema: InboxSchema::default(),
            limits: ContentLimits::default(),
        }
    }

    fn server() -> (Arc<FakeNotion>, TasksServer) {
        let notion = Arc::new(FakeNotion::new());
        notion.add_user(User::person("u-kim", "Kim", "kim@example.com"));
        notion.add_page_with(TASKS_DB, "p1", |props| {
            props.insert(
                "ID".to_string(),
                PropertyValue::UniqueId { prefix: Some("MKL".to_string()), number: Some(1) },
            );
            props.insert("Status".to_string(), PropertyValue::Select(Some("진행 중".to_string())));
        });
        let server = TasksServer::new(Workspace::new(notion.clone(), settings()));
        (notion, server)
    }

    /// The text payload and error flag of a tool result.
    fn unpack(result: &CallToolResult) -> (String, bool) {
        let value = serde_json::to_value(result).unwrap();
        let text = value["content"][0]["text"].as_str().unwrap().to_string();
        (text, value["isError"].as_bool().unwrap_or(false))
    }

    #[tokio::test]
    async fn test_get_task_returns_json() {
        let (_notion, server) = server();
        let result = server.get_task(TaskIdInput { id: "MKL-1".to_string() }).await.unwrap();
        let (text, is_error) = unpack(&result);
        assert!(!is_error);
        let json: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["key"], "MKL-1");
        assert_eq!(json["status"], "in-progress");
    }

    #[tokio::test]
    async fn test_not_found_is_an_error_result() {
        let (_notion, server) = server();
        let result = server.get_task(TaskIdInput { id: "MKL-99".to_string() }).await.unwrap();
        let (text, is_error) = unpack(&result);
        assert!(is_error);
        assert!(text.starts_with("not found:"));
        assert!(text.contains("MKL-99"));
    }

    #[tokio::test]
    async fn test_invalid_status_is_an_error_result() {
        let (notion, server) = server();
        let input = UpdateTaskStatusInput { id: "MKL-1".to_string(), status: "later".to_string() };
        let result = server.update_task_status(input).await.unwrap();
        let (text, is_error) = unpack(&result);
        assert!(is_error);
        assert!(text.starts_with("invalid input:"));
        assert!(notion.calls().is_empty());
    }

    #[tokio::test]
    async fn test_add_task_log_reports_receipt() {
        let (notion, server) = server();
        let input = AddTaskLogInput {
            id: "MKL-1".to_string(),
            content: "Deployed".to_string(),
            author: "kim".to_string(),
            log_type: default_log_type(),
        };
        let (text, is_error) = unpack(&server.add_task_log(input).await.unwrap());
        assert!(!is_error, "{text}");
        let json: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["page_id"], "p1");
        assert_eq!(json["blocks_appended"], 2);
        assert_eq!(notion.blocks("p1").len(), 2);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_an_error_result() {
        let workspace = Workspace::new(Arc::new(FailingNotion::new(401, "unauthorized")), settings());
        let server = TasksServer::new(workspace);
        let result = server
            .list_tasks(ListTasksInput { status: None, assignee: None, tag: None, limit: None })
            .await
            .unwrap();
        let (text, is_error) = unpack(&result);
        assert!(is_error);
        assert!(text.starts_with("notion error:"));
        assert!(text.contains("unauthorized"));
    }

    #[test]
    fn test_server_info() {
        let (_notion, server) = server();
        let info = server.get_info();
        assert_eq!(info.server_info.name, "notion-tasks-mcp");
        assert!(info.instructions.unwrap().contains("MKL-123"));
    }

    #[test]
    fn test_tool_box_lists_every_tool() {
        let tools = TasksServer::tool_box().list();
        assert_eq!(tools.len(), 15);
        for name in ["create_task", "archive_task", "unarchive_inbox", "add_task_log"] {
            assert!(tools.iter().any(|t| t.name == name), "missing {name}");
        }
    }

    #[tokio::test]
    async fn test_archive_by_key_twice_points_at_page_id() {
        let (_notion, server) = server();
        let first = server.archive_task(TaskIdInput { id: "MKL-1".to_string() }).await.unwrap();
        let (text, is_error) = unpack(&first);
        assert!(!is_error, "{text}");
        let json: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["archived"], true);
        assert_eq!(json["page_id"], "p1");

        let second = server.archive_task(TaskIdInput { id: "MKL-1".to_string() }).await.unwrap();
        let (text, is_error) = unpack(&second);
        assert!(is_error);
        assert!(text.starts_with("not found:"));
        assert!(text.contains("page id"));
    }
}
