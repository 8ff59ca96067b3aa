//! Error types for LeadScout.
//!
//! Library crates use [`LeadScoutError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Per-item failures (a bad URL, one page that fails to load, one provider
//! lookup that exhausts its retries) are handled at the item boundary and do
//! not surface through this type; [`LeadScoutError::MissingArtifact`] is the
//! only variant that aborts a pipeline run.

use std::path::PathBuf;

/// Top-level error type for all LeadScout operations.
#[derive(Debug, thiserror::Error)]
pub enum LeadScoutError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error during discovery, harvesting, or enrichment.
    #[error("network error: {0}")]
    Network(String),

    /// HTML or JSON parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Browser engine error (launch or navigation).
    #[error("browser error: {0}")]
    Browser(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (schema mismatch, invalid format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A required external artifact (domains file, audit runner) is absent.
    /// This is the only failure that halts a pipeline run.
    #[error("missing required artifact: {path}")]
    MissingArtifact { path: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LeadScoutError>;

impl LeadScoutError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a missing-artifact error for a path.
    pub fn missing_artifact(path: impl Into<String>) -> Self {
        Self::MissingArtifact { path: path.into() }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error should abort the whole pipeline run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::MissingArtifact { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = LeadScoutError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = LeadScoutError::missing_artifact("./configs/domains.txt");
        assert!(err.to_string().contains("domains.txt"));
    }

    #[test]
    fn only_missing_artifact_is_fatal() {
        assert!(LeadScoutError::missing_artifact("x").is_fatal());
        assert!(!LeadScoutError::Network("timeout".into()).is_fatal());
        assert!(!LeadScoutError::validation("bad row").is_fatal());
    }
}
