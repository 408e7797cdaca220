//! Error types at the library seams
//!
//! Rule faults never show up here: they are captured per invocation by the
//! rule engine. `ScanError::is_missing` marks the only condition that ends
//! a scan session.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("project root not found: {0}")]
    ProjectNotFound(PathBuf),

    #[error("project root is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("scan session is {0}")]
    InvalidState(&'static str),
}

impl ScanError {
    /// The analyzed project cannot be loaded at all
    pub fn is_missing(&self) -> bool {
        matches!(self, ScanError::ProjectNotFound(_) | ScanError::NotADirectory(_))
    }
}

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("failed to read plugin {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse plugin {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("plugin {0} declares no rules")]
    Empty(PathBuf),

    #[error("rule id '{0}' must look like '<category>/<name>' with a known category")]
    InvalidId(String),

    #[error("rule id '{id}' is namespaced under '{prefix}' but declares category '{category}'")]
    CategoryMismatch {
        id: String,
        prefix: String,
        category: String,
    },

    #[error("rule id '{0}' is already registered")]
    DuplicateId(String),

    #[error("rule '{id}' has an invalid pattern: {message}")]
    InvalidPattern { id: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_classification() {
        assert!(ScanError::ProjectNotFound(PathBuf::from("/nope")).is_missing());
        assert!(ScanError::NotADirectory(PathBuf::from("/file.ts")).is_missing());
        assert!(!ScanError::Config("bad".to_string()).is_missing());
    }
}
