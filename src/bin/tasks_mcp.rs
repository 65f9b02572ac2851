//! MCP server binary for the Notion task board.
//!
//! This binary runs an MCP server that exposes task and inbox operations
//! through stdio transport.

use notion_tasks::config::Config;
use notion_tasks::mcp::TasksServer;
use notion_tasks::tasks::Workspace;
use notion_tasks::{logging, paths};
use rmcp::ServiceExt;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging first (writes to ~/.notion-tasks/mcp.log)
    match paths::log_file() {
        Some(path) => {
            if let Err(e) = logging::init(&path) {
                eprintln!("Warning: MCP logging init failed: {e}");
            }
        }
        None => eprintln!("Warning: no home directory, MCP logging disabled"),
    }
    logging::install_panic_hook();

    let config = Config::load()?;
    let settings = match config.workspace_settings() {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            logging::log_shutdown(Some(1));
            return Err(e.into());
        }
    };
    let workspace = Workspace::new(Arc::new(config.client()?), settings);

    let server = TasksServer::new(workspace);
    info!("MCP server created, starting stdio transport");
    let service = server.serve(rmcp::transport::stdio()).await?;
    info!("MCP server running");
    service.waiting().await?;

    logging::log_shutdown(None);
    Ok(())
}
