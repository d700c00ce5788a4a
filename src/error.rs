//! Custom error types for smartpm.
//!
//! Every fallible operation in the library returns [`SmartPmError`]. The
//! command line front end turns these into a red message and an exit code;
//! nothing in the library aborts the process.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for smartpm operations
#[derive(Error, Debug)]
pub enum SmartPmError {
    // =========================================================================
    // Lookup Errors
    // =========================================================================
    /// Referenced entity does not exist
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Missing required file
    #[error("Missing required file: {path}")]
    MissingFile { path: PathBuf },

    // =========================================================================
    // Validation Errors
    // =========================================================================
    /// Invalid user input
    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    /// Failed to load configuration
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<PathBuf>,
    },

    // =========================================================================
    // Transfer Errors
    // =========================================================================
    /// Imported document does not have the store layout
    #[error("Invalid import data format: {reason}")]
    InvalidImport { reason: String },

    /// Export failed
    #[error("Export failed: {message}")]
    Export { message: String },

    /// Backup operation failed
    #[error("Backup error: {message}")]
    Backup { message: String },

    /// Data file could not be put back after a failed import
    #[error("Failed to restore data file: {path}")]
    RestoreFailed { path: PathBuf },

    // =========================================================================
    // Wrapped Errors
    // =========================================================================
    /// IO error wrapper
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON error wrapper
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SmartPmError {
    // =========================================================================
    // Constructor helpers
    // =========================================================================

    /// Create a not-found error for an entity kind
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Create an input validation error
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            path: None,
        }
    }

    /// Create a configuration error with path
    pub fn config_with_path(message: impl Into<String>, path: PathBuf) -> Self {
        Self::Config {
            message: message.into(),
            path: Some(path),
        }
    }

    /// Create an import rejection
    pub fn invalid_import(reason: impl Into<String>) -> Self {
        Self::InvalidImport {
            reason: reason.into(),
        }
    }

    /// Create an export error
    pub fn export(message: impl Into<String>) -> Self {
        Self::Export {
            message: message.into(),
        }
    }

    /// Create a backup error
    pub fn backup(message: impl Into<String>) -> Self {
        Self::Backup {
            message: message.into(),
        }
    }

    // =========================================================================
    // Classification helpers
    // =========================================================================

    /// Check if this error is a lookup miss
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::MissingFile { .. })
    }

    /// Get error code for exit status
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound { .. } => 2,
            Self::InvalidInput { .. } => 3,
            Self::InvalidImport { .. } => 4,
            Self::MissingFile { .. } => 6,
            Self::Config { .. } => 7,
            _ => 1,
        }
    }
}

/// Type alias for smartpm results
pub type Result<T> = std::result::Result<T, SmartPmError>;

/// Extension trait for tagging foreign errors with a smartpm category
pub trait IntoSmartPmError<T> {
    fn into_export_error(self) -> Result<T>;
    fn into_backup_error(self) -> Result<T>;
}

impl<T, E: Into<anyhow::Error>> IntoSmartPmError<T> for std::result::Result<T, E> {
    fn into_export_error(self) -> Result<T> {
        self.map_err(|e| SmartPmError::export(e.into().to_string()))
    }

    fn into_backup_error(self) -> Result<T> {
        self.map_err(|e| SmartPmError::backup(e.into().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = SmartPmError::not_found("Task", "abc-123");
        assert_eq!(err.to_string(), "Task not found: abc-123");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_invalid_display() {
        let err = SmartPmError::invalid("title", "must not be empty");
        assert!(err.to_string().contains("title"));
        assert!(err.to_string().contains("must not be empty"));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(SmartPmError::not_found("Project", "x").exit_code(), 2);
        assert_eq!(SmartPmError::invalid("name", "empty").exit_code(), 3);
        assert_eq!(SmartPmError::invalid_import("no labels").exit_code(), 4);
        assert_eq!(
            SmartPmError::MissingFile {
                path: PathBuf::from("/tmp/data.json")
            }
            .exit_code(),
            6
        );
        assert_eq!(SmartPmError::config("bad").exit_code(), 7);
        assert_eq!(SmartPmError::backup("disk full").exit_code(), 1);
    }

    #[test]
    fn test_config_with_path() {
        let path = PathBuf::from("/home/user/.smart_project_manager/config.toml");
        let err = SmartPmError::config_with_path("failed to parse", path.clone());
        if let SmartPmError::Config {
            message,
            path: opt_path,
        } = err
        {
            assert_eq!(message, "failed to parse");
            assert_eq!(opt_path, Some(path));
        } else {
            panic!("Wrong error variant");
        }
    }

    #[test]
    fn test_into_smartpm_error_trait() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file not found",
        ));

        match result.into_backup_error() {
            Err(SmartPmError::Backup { message }) => assert!(message.contains("file not found")),
            other => panic!("Wrong error variant after conversion: {other:?}"),
        }
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: SmartPmError = io_err.into();
        assert!(matches!(err, SmartPmError::Io(_)));
        assert!(err.to_string().contains("access denied"));
    }
}
