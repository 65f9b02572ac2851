//! Task board and inbox on top of Notion.
//!
//! This module provides:
//! - Task and inbox models with coded status, priority and log-type values
//! - The mapping between those models and Notion page properties
//! - Resolution of human task keys (`MKL-123`) and person references
//! - [`Workspace`], which implements the task and inbox operations
//!
//! # Example
//!
//! ```no_run
//! use notion_tasks::config::Config;
//! use notion_tasks::notion::NotionClient;
//! use notion_tasks::tasks::Workspace;
//! use std::sync::Arc;
//!
//! # async fn run() -> notion_tasks::error::Result<()> {
//! let config = Config::load()?;
//! let client = NotionClient::new(config.token()?)?;
//! let workspace = Workspace::new(Arc::new(client), config.workspace_settings()?);
//!
//! let task = workspace.update_task_status("MKL-123", "done").await?;
//! workspace.add_task_log("MKL-123", "Released in v2", "kim", "progress").await?;
//! println!("{:?}", task.fields.status);
//! # Ok(())
//! # }
//! ```

pub mod models;
pub mod people;
pub mod properties;
pub mod resolver;
pub mod workspace;

pub use models::{
    InboxDetail, InboxFields, InboxItem, InvalidLabel, LogReceipt, LogType, Priority, Task,
    TaskDetail, TaskFields, TaskStatus,
};
pub use properties::{InboxSchema, TaskSchema};
pub use resolver::{HumanKey, TaskRef};
pub use workspace::{
    InboxQuery, NewInboxItem, NewTask, TaskChanges, TaskQuery, Workspace, WorkspaceSettings,
};
