//! Error types for docreattach operations.

use thiserror::Error;

/// Result type alias using [`ReattachError`].
pub type Result<T> = std::result::Result<T, ReattachError>;

/// Errors that can occur while talking to the vault or writing the report.
///
/// All errors implement `std::error::Error` and can be chained with `source()`.
#[derive(Debug, Error)]
pub enum ReattachError {
    /// Item was not found in the vault.
    #[error("item not found: {0}")]
    NotFound(String),

    /// The vendor CLI is not signed in.
    #[error("not authenticated")]
    NotAuthenticated,

    /// Required CLI tool is not installed.
    #[error("backend CLI not installed: {0}")]
    BackendNotInstalled(String),

    /// A file or field name could not be turned into something usable.
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// Backend operation failed with context.
    #[error("{backend}: {operation} {item}: {source}")]
    BackendOperation {
        /// Backend name
        backend: String,
        /// Operation name (get, edit, delete, etc.)
        operation: String,
        /// Item id or title
        item: String,
        /// Underlying error
        #[source]
        source: Box<ReattachError>,
    },

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Report could not be written.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Command execution failed.
    #[error("command execution failed: {0}")]
    CommandFailed(String),

    /// Other error (catch-all).
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReattachError {
    /// Creates a backend operation error with context.
    ///
    /// This wraps an underlying error with information about which backend,
    /// operation, and item caused the failure.
    ///
    /// # Example
    ///
    /// ```
    /// use docreattach::ReattachError;
    ///
    /// let err = ReattachError::NotFound("abc123".to_string());
    /// let wrapped = ReattachError::backend_op("onepassword", "get", "abc123", err);
    ///
    /// assert_eq!(
    ///     wrapped.to_string(),
    ///     "onepassword: get abc123: item not found: abc123"
    /// );
    /// ```
    pub fn backend_op(
        backend: impl Into<String>,
        operation: impl Into<String>,
        item: impl Into<String>,
        err: ReattachError,
    ) -> Self {
        Self::BackendOperation {
            backend: backend.into(),
            operation: operation.into(),
            item: item.into(),
            source: Box::new(err),
        }
    }
}
