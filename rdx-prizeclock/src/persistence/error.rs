//! Persistence error types.

use std::path::PathBuf;
use thiserror::Error;

/// Persistence operation error.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// File I/O error.
    #[error("Failed to {operation} file: {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The snapshot could not be encoded.
    #[error("Failed to serialize session data")]
    Serialization {
        #[source]
        source: serde_json::Error,
    },

    /// The file is not a readable session snapshot.
    #[error("Failed to deserialize session data from {path}")]
    Deserialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Temp file written but could not be moved into place.
    #[error("Failed to complete save operation")]
    AtomicWriteFailed {
        temp_path: PathBuf,
        target_path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The blocking I/O task panicked or was cancelled.
    #[error("Persistence task did not complete")]
    TaskJoin {
        #[source]
        source: tokio::task::JoinError,
    },
}

impl PersistenceError {
    /// True when the file simply does not exist yet.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }

    /// Get a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::Io {
                operation, path, ..
            } => format!("Could not {} the file at {}", operation, path.display()),
            Self::Serialization { .. } => {
                "An error occurred while saving the session data.".to_string()
            }
            Self::Deserialization { path, .. } => format!(
                "The file at {} is not a valid settings file. It may be corrupted.",
                path.display()
            ),
            Self::AtomicWriteFailed { target_path, .. } => format!(
                "Could not save the file to {}. Please check disk space and permissions.",
                target_path.display()
            ),
            Self::TaskJoin { .. } => "The save or load was interrupted.".to_string(),
        }
    }
}

/// Result type alias for persistence operations.
pub type Result<T> = std::result::Result<T, PersistenceError>;
