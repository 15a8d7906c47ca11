//! Error types for column mapping.

use std::time::Duration;

use colmap_model::ModelError;
use thiserror::Error;

use crate::backend::BackendError;

/// Broad error classes callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Missing configuration. Callers may fall back to table mode.
    Configuration,
    /// Bad caller input, rejected before any work is done.
    Validation,
    /// The AI backend failed, timed out, or answered with an invalid shape.
    Upstream,
}

/// Errors from [`ColumnMapper`](crate::ColumnMapper).
#[derive(Debug, Error)]
pub enum MappingError {
    /// Spec-format mapping was requested without an AI backend.
    #[error("no AI backend is configured for spec-format mapping")]
    AiUnavailable,

    /// The request cannot be mapped as given.
    #[error("invalid mapping request: {0}")]
    InvalidRequest(String),

    /// The backend call returned an error.
    #[error("AI backend call failed for model {model}")]
    Backend {
        model: String,
        #[source]
        source: BackendError,
    },

    /// The backend did not answer within the caller's deadline.
    #[error("AI backend call for model {model} timed out after {timeout:?}")]
    Timeout { model: String, timeout: Duration },

    /// The backend answered with a result that breaks the mapping invariants.
    #[error("AI backend returned an invalid mapping for model {model}")]
    InvalidResponse {
        model: String,
        #[source]
        source: ModelError,
    },
}

impl MappingError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::AiUnavailable => ErrorCategory::Configuration,
            Self::InvalidRequest(_) => ErrorCategory::Validation,
            Self::Backend { .. } | Self::Timeout { .. } | Self::InvalidResponse { .. } => {
                ErrorCategory::Upstream
            }
        }
    }

    /// True when falling back to table mode is a sensible reaction.
    pub fn is_recoverable(&self) -> bool {
        self.category() != ErrorCategory::Validation
    }
}

/// Result type for mapping operations.
pub type Result<T> = std::result::Result<T, MappingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_follow_taxonomy() {
        assert_eq!(
            MappingError::AiUnavailable.category(),
            ErrorCategory::Configuration
        );
        assert_eq!(
            MappingError::InvalidRequest("no headers".into()).category(),
            ErrorCategory::Validation
        );
        let timeout = MappingError::Timeout {
            model: "small".into(),
            timeout: Duration::from_secs(5),
        };
        assert_eq!(timeout.category(), ErrorCategory::Upstream);
        assert!(timeout.is_recoverable());
    }

    #[test]
    fn backend_error_preserves_source() {
        let err = MappingError::Backend {
            model: "small".into(),
            source: "connection reset".into(),
        };
        let source = std::error::Error::source(&err).expect("source");
        assert_eq!(source.to_string(), "connection reset");
    }
}
