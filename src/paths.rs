//! Path utilities for determining where notion-tasks keeps its files.
//!
//! Configuration and logs live in `~/.notion-tasks/`.

use std::path::PathBuf;

/// The base directory name for notion-tasks data.
const DATA_DIR_NAME: &str = ".notion-tasks";

/// The configuration filename.
pub const CONFIG_FILENAME: &str = "config.yaml";

/// The MCP server log filename.
pub const LOG_FILENAME: &str = "mcp.log";

/// Get the base data directory.
///
/// Returns `~/.notion-tasks/` or `None` if the home directory cannot be
/// determined.
#[must_use]
pub fn data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(DATA_DIR_NAME))
}

/// Get the default configuration file path, `~/.notion-tasks/config.yaml`.
#[must_use]
pub fn config_file() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join(CONFIG_FILENAME))
}

/// Get the MCP server log path, `~/.notion-tasks/mcp.log`.
#[must_use]
pub fn log_file() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join(LOG_FILENAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_share_the_data_dir() {
        let Some(dir) = data_dir() else { return };
        assert!(dir.ends_with(DATA_DIR_NAME));
        assert_eq!(config_file().unwrap(), dir.join(CONFIG_FILENAME));
        assert_eq!(log_file().unwrap(), dir.join(LOG_FILENAME));
    }
}
