//! File logging for the MCP server.
//!
//! stdout carries the MCP protocol and stderr is usually swallowed by the
//! client, so the server logs to `~/.notion-tasks/mcp.log` through a
//! `tracing` subscriber. The file is rotated to `mcp.log.old` once it grows
//! past 1 MiB. The filter comes from `NOTION_TASKS_LOG` (default `info`).

use crate::error::Result;
use std::fs::{self, File, OpenOptions};
use std::panic;
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;
use tracing::{error, info, warn, Subscriber};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directive.
pub const LOG_FILTER_ENV: &str = "NOTION_TASKS_LOG";

/// Maximum log file size before rotation (1MB).
const MAX_LOG_SIZE: u64 = 1_048_576;

/// Move `path` aside to `<path>.old` if it is larger than the limit.
///
/// Returns whether the file was rotated.
///
/// # Errors
///
/// Returns an error if the rename fails.
pub fn rotate_if_oversized(path: &Path) -> std::io::Result<bool> {
    match fs::metadata(path) {
        Ok(metadata) if metadata.len() > MAX_LOG_SIZE => {
            fs::rename(path, path.with_extension("log.old"))?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Open the log file for appending, creating directories and rotating first.
///
/// # Errors
///
/// Returns an error if the file cannot be created.
pub fn open_log(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    rotate_if_oversized(path)?;
    OpenOptions::new().create(true).append(true).open(path)
}

/// The filter from `NOTION_TASKS_LOG`, or `info` if unset or invalid.
#[must_use]
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Build a subscriber writing plain-text lines to `file`.
pub fn file_subscriber(file: File, filter: EnvFilter) -> impl Subscriber + Send + Sync {
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(filter)
        .finish()
}

/// Install the file subscriber as the global default.
///
/// This should be called once at MCP server startup.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened or a global subscriber
/// is already installed.
pub fn init(path: &Path) -> Result<()> {
    let file = open_log(path)?;
    tracing::subscriber::set_global_default(file_subscriber(file, env_filter()))
        .map_err(std::io::Error::other)?;
    info!(path = %path.display(), version = crate::VERSION, "MCP server starting");
    Ok(())
}

/// Log a panic with its location and payload.
#[allow(deprecated)] // PanicInfo is deprecated but PanicHookInfo requires Rust 1.81+
fn log_panic(info: &panic::PanicInfo<'_>) {
    let location = format_panic_location(info.location());
    let payload = info
        .payload()
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| info.payload().downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());

    error!(location = %location, "PANIC: {payload}");
}

/// Format a panic location for logging.
fn format_panic_location(location: Option<&panic::Location<'_>>) -> String {
    location.map_or_else(
        || "unknown".to_string(),
        |loc| format!("{}:{}:{}", loc.file(), loc.line(), loc.column()),
    )
}

/// Install a panic hook that logs panics before running the previous hook.
///
/// This should be called after [`init`].
pub fn install_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        log_panic(info);
        original_hook(info);
    }));
    info!("Panic hook installed");
}

/// Log MCP server shutdown.
pub fn log_shutdown(exit_code: Option<i32>) {
    match exit_code {
        Some(code) => warn!(exit_code = code, "SHUTDOWN"),
        None => info!("SHUTDOWN: normal"),
    }
}

/// A guard that logs tool call duration when dropped.
///
/// ```ignore
/// let mut guard = ToolCallGuard::new("get_task");
/// if result.is_err() {
///     guard.mark_error();
/// }
/// // guard logs duration and outcome when dropped
/// ```
pub struct ToolCallGuard {
    tool_name: &'static str,
    start: Instant,
    success: bool,
}

impl ToolCallGuard {
    /// Create a new tool call guard and log the start.
    #[must_use]
    pub fn new(tool_name: &'static str) -> Self {
        info!(tool = tool_name, "TOOL_START");
        Self { tool_name, start: Instant::now(), success: true }
    }

    /// Mark the tool call as failed.
    pub fn mark_error(&mut self) {
        self.success = false;
    }
}

impl Drop for ToolCallGuard {
    fn drop(&mut self) {
        let duration_ms = self.start.elapsed().as_millis();
        let status = if self.success { "OK" } else { "ERROR" };
        info!(tool = self.tool_name, duration_ms, status, "TOOL_END");
    }
}
