//! MCP (Model Context Protocol) server implementations.
//!
//! This module provides the MCP server exposing the task board and inbox as
//! tools.

#[cfg(feature = "mcp")]
pub mod tasks_server;

#[cfg(feature = "mcp")]
pub use tasks_server::TasksServer;
