//! Feedback error types.

use std::path::PathBuf;

use thiserror::Error;

/// Feedback store, analysis and example pool errors.
#[derive(Debug, Error)]
pub enum FeedbackError {
    /// Rating outside the binary {1, 5} encoding.
    #[error("rating {0} is not allowed (expected 1 or 5)")]
    InvalidRating(i32),

    /// Request hash is empty or whitespace.
    #[error("request hash must not be empty")]
    EmptyRequestHash,

    /// File I/O error.
    #[error("Failed to {operation} file: {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serialization error.
    #[error("Failed to serialize {what}")]
    Serialization {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A persisted correction payload could not be decoded.
    #[error("Malformed correction payload in feedback {id}")]
    MalformedPayload {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    /// The example pool rejected an example.
    #[error("Failed to register example: {0}")]
    Pool(String),
}

impl FeedbackError {
    /// True for errors caused by caller input rather than storage.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidRating(_) | Self::EmptyRequestHash)
    }

    /// Get a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidRating(value) => {
                format!("Rating {value} is not valid. Use 1 for thumbs-down or 5 for thumbs-up.")
            }
            Self::EmptyRequestHash => {
                "Feedback must reference the mapping request it rates.".to_string()
            }
            Self::Io {
                operation, path, ..
            } => {
                format!("Could not {} the file at {}", operation, path.display())
            }
            Self::Serialization { what, .. } => format!("An error occurred while saving {what}."),
            Self::MalformedPayload { id, .. } => {
                format!("The stored corrections of feedback {id} could not be read.")
            }
            Self::Pool(reason) => format!("The learned example could not be stored: {reason}"),
        }
    }
}

/// Result type alias for feedback operations.
pub type Result<T> = std::result::Result<T, FeedbackError>;
