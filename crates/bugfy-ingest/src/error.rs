//! Error types for the ingestion pipeline.

use std::time::Duration;

use bugfy_store::StoreError;

/// Result type alias using [`IngestError`].
pub type IngestResult<T> = Result<T, IngestError>;

/// Errors that can occur while ingesting or querying errors and issues.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The project identifier is not a valid UUID.
    #[error("invalid project id '{value}': {source}")]
    InvalidProjectId {
        value: String,
        source: uuid::Error,
    },

    /// A supplied fingerprint does not have the expected shape.
    #[error("invalid fingerprint '{0}'")]
    InvalidFingerprint(String),

    /// A required field is missing or empty.
    #[error("validation failed: {0}")]
    Validation(String),

    /// No issue exists for the requested grouping key.
    #[error("issue not found: {fingerprint}")]
    IssueNotFound { fingerprint: String },

    /// Storage backend failure.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// The operation exceeded its deadline.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl IngestError {
    /// Whether the caller sent a bad request, as opposed to a server failure.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidProjectId { .. }
                | Self::InvalidFingerprint(_)
                | Self::Validation(_)
                | Self::IssueNotFound { .. }
        )
    }

    /// Message safe to show to the reporter of an error.
    ///
    /// Server-side failures collapse to a generic description so storage
    /// details stay in the logs.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Storage(_) | Self::Config(_) => "internal error".to_owned(),
            Self::Timeout { .. } => "request timed out".to_owned(),
            other => other.to_string(),
        }
    }
}
