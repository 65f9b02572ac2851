//! Error types for `notion_tasks`.

/// Broad classification of an [`Error`], used when rendering tool failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A key or page does not exist.
    NotFound,
    /// A human key matched more than one page.
    Ambiguous,
    /// Caller input or stored data failed validation.
    Validation,
    /// The Notion API (or the transport to it) failed.
    Upstream,
    /// Local configuration or I/O failed.
    Local,
}

impl ErrorKind {
    /// Short label used as a prefix in rendered error payloads.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NotFound => "not found",
            Self::Ambiguous => "ambiguous",
            Self::Validation => "invalid input",
            Self::Upstream => "notion error",
            Self::Local => "internal error",
        }
    }
}

/// Errors that can occur while talking to Notion or marshalling its data.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Nothing matched the given key, page or person.
    #[error("{what} not found: {id}")]
    NotFound {
        /// What kind of thing was looked up ("task", "page", "person").
        what: &'static str,
        /// The identifier that failed to resolve.
        id: String,
    },

    /// No live task carries the human key. Archived tasks drop out of key
    /// lookups and are only reachable by page id.
    #[error("task not found: {key} (an archived task is only reachable by its page id)")]
    KeyNotFound {
        /// The key that failed to resolve, e.g. `MKL-123`.
        key: String,
    },

    /// A lookup expected exactly one match but found several.
    #[error("{what} '{id}' is ambiguous: {count} matches")]
    Ambiguous {
        /// What kind of thing was looked up.
        what: &'static str,
        /// The identifier that matched several entries.
        id: String,
        /// How many entries matched.
        count: usize,
    },

    /// Caller input was rejected before reaching Notion.
    #[error("{0}")]
    Validation(String),

    /// A page property could not be parsed into the domain model.
    #[error("property '{property}': {reason}")]
    PropertyParse {
        /// Name of the offending property.
        property: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Notion answered with an error body.
    #[error("Notion API error {status} ({code}): {message}")]
    Upstream {
        /// HTTP status code.
        status: u16,
        /// Notion error code, e.g. `rate_limited`.
        code: String,
        /// Human-readable message from Notion.
        message: String,
    },

    /// The HTTP request itself failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A JSON parsing error occurred.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A YAML parsing error occurred.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration is missing or malformed.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Shorthand for a [`Error::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Shorthand for a [`Error::PropertyParse`].
    pub fn property(property: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PropertyParse { property: property.into(), reason: reason.into() }
    }

    /// Classify the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } | Self::KeyNotFound { .. } => ErrorKind::NotFound,
            Self::Ambiguous { .. } => ErrorKind::Ambiguous,
            Self::Validation(_) | Self::PropertyParse { .. } => ErrorKind::Validation,
            Self::Upstream { .. } | Self::Http(_) | Self::Json(_) => ErrorKind::Upstream,
            Self::Yaml(_) | Self::Io(_) | Self::Config(_) => ErrorKind::Local,
        }
    }

    /// Whether retrying the same request later could succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Upstream { status, .. } => *status == 429 || *status >= 500,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_names_the_key() {
        let err = Error::NotFound { what: "task", id: "MKL-9".to_string() };
        assert_eq!(err.to_string(), "task not found: MKL-9");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_key_not_found_points_at_page_id() {
        let err = Error::KeyNotFound { key: "MKL-9".to_string() };
        assert!(err.to_string().starts_with("task not found: MKL-9"));
        assert!(err.to_string().contains("page id"));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_property_parse_is_validation() {
        let err = Error::property("Status", "unknown label 'Later'");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("Status"));
    }

    #[test]
    fn test_retryable_statuses() {
        let upstream = |status| Error::Upstream {
            status,
            code: "x".to_string(),
            message: String::new(),
        };
        assert!(upstream(429).is_retryable());
        assert!(upstream(502).is_retryable());
        assert!(!upstream(400).is_retryable());
        assert!(!Error::validation("bad").is_retryable());
    }
}
