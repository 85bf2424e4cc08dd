use thiserror::Error;

/// Result type alias using [`StoreError`].
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Operation timed out")]
    Timeout,

    #[error("Record already exists: {0}")]
    Conflict(String),

    #[error("Serialisation error: {0}")]
    Serialisation(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether the failure came from reaching the store rather than from the
    /// request itself.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout)
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Unsupported backend: {0}")]
    UnsupportedBackend(String),

    #[error("Connection error: {0}")]
    Connection(String),
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => Self::Timeout,
            sqlx::Error::Io(e) => Self::Connection(e.to_string()),
            sqlx::Error::PoolClosed => Self::Connection("pool closed".to_owned()),
            sqlx::Error::Database(e) if e.is_unique_violation() => {
                Self::Conflict(e.message().to_owned())
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                Self::Serialisation(err.to_string())
            }
            other => Self::Backend(other.to_string()),
        }
    }
}
