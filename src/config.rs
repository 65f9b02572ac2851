//! Configuration management for notion-tasks.
//!
//! Settings come from a YAML file (`$NOTION_TASKS_CONFIG`, falling back to
//! `~/.notion-tasks/config.yaml`) and are then overridden by the
//! `NOTION_TOKEN`, `NOTION_TASKS_DATABASE_ID` and `NOTION_INBOX_DATABASE_ID`
//! environment variables. A missing file is not an error; a missing token is,
//! but only when [`Config::validate`] is called.
//!
//! ```yaml
//! notion_token: secret_...
//! tasks_database_id: 1c6f2a1e8b7d4c3a9e5f0a1b2c3d4e5f
//! inbox_database_id: 2d7a3b2f9c8e4d4bafa01b2c3d4e5f60
//! task_properties:
//!   assignees: 담당자
//! content:
//!   default_max_blocks: 200
//! ```

use crate::error::{Error, Result};
use crate::notion::{is_notion_id, NotionClient};
use crate::paths;
use crate::tasks::properties::{InboxSchema, TaskSchema};
use crate::tasks::workspace::WorkspaceSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming an alternative config file.
pub const CONFIG_PATH_ENV: &str = "NOTION_TASKS_CONFIG";

/// Environment variable holding the integration token.
pub const TOKEN_ENV: &str = "NOTION_TOKEN";

/// Environment variable holding the tasks database id.
pub const TASKS_DATABASE_ENV: &str = "NOTION_TASKS_DATABASE_ID";

/// Environment variable holding the inbox database id.
pub const INBOX_DATABASE_ENV: &str = "NOTION_INBOX_DATABASE_ID";

/// Limits on how much content a single call reads.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ContentLimits {
    /// Body blocks fetched when the caller gives no maximum.
    pub default_max_blocks: usize,
    /// Upper bound on any caller-supplied maximum.
    pub max_blocks_ceiling: usize,
    /// Results returned by list operations when the caller gives no limit.
    pub default_list_limit: usize,
}

impl Default for ContentLimits {
    fn default() -> Self {
        Self { default_max_blocks: 100, max_blocks_ceiling: 1000, default_list_limit: 50 }
    }
}

/// notion-tasks configuration.
#[derive(Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Notion integration token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notion_token: Option<String>,

    /// Database holding tasks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks_database_id: Option<String>,

    /// Database holding inbox items.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inbox_database_id: Option<String>,

    /// Override for the Notion API endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,

    /// Property names of the tasks database.
    pub task_properties: TaskSchema,

    /// Property names of the inbox database.
    pub inbox_properties: InboxSchema,

    /// Content limits.
    pub content: ContentLimits,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("notion_token", &self.notion_token.as_ref().map(|_| "<redacted>"))
            .field("tasks_database_id", &self.tasks_database_id)
            .field("inbox_database_id", &self.inbox_database_id)
            .field("api_base_url", &self.api_base_url)
            .field("task_properties", &self.task_properties)
            .field("inbox_properties", &self.inbox_properties)
            .field("content", &self.content)
            .finish()
    }
}

impl Config {
    /// Load config from the default location and apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let mut config = match config_path() {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Load config from a specific file, returning defaults if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Override file settings with non-empty environment variables.
    pub fn apply_env(&mut self) {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        if let Some(token) = var(TOKEN_ENV) {
            self.notion_token = Some(token);
        }
        if let Some(id) = var(TASKS_DATABASE_ENV) {
            self.tasks_database_id = Some(id);
        }
        if let Some(id) = var(INBOX_DATABASE_ENV) {
            self.inbox_database_id = Some(id);
        }
    }

    /// Check that everything needed to serve requests is present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first problem found.
    pub fn validate(&self) -> Result<()> {
        self.token()?;
        for (name, id) in [
            ("tasks_database_id", &self.tasks_database_id),
            ("inbox_database_id", &self.inbox_database_id),
        ] {
            match id.as_deref().map(str::trim) {
                None | Some("") => return Err(Error::Config(format!("{name} is not set"))),
                Some(id) if !is_notion_id(id) => {
                    return Err(Error::Config(format!("{name} '{id}' is not a Notion database id")))
                }
                Some(_) => {}
            }
        }
        let limits = self.content;
        if limits.default_max_blocks == 0 || limits.default_list_limit == 0 {
            return Err(Error::Config("content limits must be at least 1".to_string()));
        }
        if limits.default_max_blocks > limits.max_blocks_ceiling {
            return Err(Error::Config(format!(
                "content.default_max_blocks ({}) exceeds content.max_blocks_ceiling ({})",
                limits.default_max_blocks, limits.max_blocks_ceiling
            )));
        }
        Ok(())
    }

    /// The integration token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if no token is configured.
    pub fn token(&self) -> Result<&str> {
        self.notion_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Config(format!("no Notion token: set {TOKEN_ENV} or notion_token")))
    }

    /// Validate and build the settings the task board runs with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if [`Config::validate`] fails.
    pub fn workspace_settings(&self) -> Result<WorkspaceSettings> {
        self.validate()?;
        Ok(WorkspaceSettings {
            tasks_database_id: self.tasks_database_id.clone().unwrap_or_default().trim().to_string(),
            inbox_database_id: self.inbox_database_id.clone().unwrap_or_default().trim().to_string(),
            task_schema: self.task_properties.clone(),
            inbox_schema: self.inbox_properties.clone(),
            limits: self.content,
        })
    }

    /// Build an API client from the token and optional base URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] without a token, or an error if the HTTP
    /// client cannot be built.
    pub fn client(&self) -> Result<NotionClient> {
        let token = self.token()?;
        match self.api_base_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            Some(url) => NotionClient::with_base_url(token, url),
            None => NotionClient::new(token),
        }
    }
}

/// The config file in effect: `$NOTION_TASKS_CONFIG` or the default path.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from).or_else(paths::config_file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    const TASKS_DB: &str = "1c6f2a1e8b7d4c3a9e5f0a1b2c3d4e5f";
    const INBOX_DB: &str = "2d7a3b2f-9c8e-4d4b-afa0-1b2c3d4e5f60";

    fn valid() -> Config {
        Config {
            notion_token: Some("secret_abc".to_string()),
            tasks_database_id: Some(TASKS_DB.to_string()),
            inbox_database_id: Some(INBOX_DB.to_string()),
            ..Config::default()
        }
    }

    fn clear_env() {
        for name in [CONFIG_PATH_ENV, TOKEN_ENV, TASKS_DATABASE_ENV, INBOX_DATABASE_ENV] {
            std::env::remove_var(name);
        }
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("nope.yaml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.content.default_max_blocks, 100);
        assert_eq!(config.task_properties.status, "Status");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "notion_token: secret_x\ntask_properties:\n  assignees: 담당자\ncontent:\n  default_max_blocks: 200\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.task_properties.assignees, "담당자");
        assert_eq!(config.task_properties.title, "Title");
        assert_eq!(config.content.default_max_blocks, 200);
        assert_eq!(config.content.max_blocks_ceiling, 1000);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "content: [1, 2").unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::Yaml(_))));
    }

    #[test]
    fn test_validate() {
        assert!(valid().validate().is_ok());

        let no_token = Config { notion_token: None, ..valid() };
        assert!(no_token.validate().unwrap_err().to_string().contains(TOKEN_ENV));

        let bad_db = Config { tasks_database_id: Some("tasks".to_string()), ..valid() };
        assert!(bad_db.validate().unwrap_err().to_string().contains("tasks_database_id"));

        let no_inbox = Config { inbox_database_id: None, ..valid() };
        assert!(no_inbox.validate().unwrap_err().to_string().contains("inbox_database_id"));

        let mut bad_limits = valid();
        bad_limits.content.default_max_blocks = 5000;
        assert!(bad_limits.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_token() {
        let rendered = format!("{:?}", valid());
        assert!(!rendered.contains("secret_abc"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_workspace_settings() {
        let settings = valid().workspace_settings().unwrap();
        assert_eq!(settings.tasks_database_id, TASKS_DB);
        assert_eq!(settings.inbox_database_id, INBOX_DB);
        assert_eq!(settings.limits, ContentLimits::default());
    }

    #[test]
    fn test_client_uses_base_url_override() {
        let mut config = valid();
        assert_eq!(config.client().unwrap().base_url(), "https://api.notion.com");

        config.api_base_url = Some("http://127.0.0.1:9999/".to_string());
        assert_eq!(config.client().unwrap().base_url(), "http://127.0.0.1:9999");

        config.notion_token = None;
        assert!(matches!(config.client(), Err(Error::Config(_))));
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        clear_env();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "notion_token: from_file\ntasks_database_id: file-db\n").unwrap();

        std::env::set_var(CONFIG_PATH_ENV, &path);
        std::env::set_var(TOKEN_ENV, "from_env");
        std::env::set_var(INBOX_DATABASE_ENV, INBOX_DB);

        let config = Config::load().unwrap();
        clear_env();

        assert_eq!(config.notion_token.as_deref(), Some("from_env"));
        assert_eq!(config.tasks_database_id.as_deref(), Some("file-db"));
        assert_eq!(config.inbox_database_id.as_deref(), Some(INBOX_DB));
    }

    #[test]
    #[serial]
    fn test_blank_env_is_ignored() {
        clear_env();
        let dir = TempDir::new().unwrap();
        std::env::set_var(CONFIG_PATH_ENV, dir.path().join("missing.yaml"));
        std::env::set_var(TOKEN_ENV, "  ");

        let config = Config::load().unwrap();
        clear_env();

        assert_eq!(config.notion_token, None);
    }
}
