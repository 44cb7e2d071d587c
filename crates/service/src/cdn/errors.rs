use std::path::PathBuf;
use thiserror::Error;

/// Single error type for every CDN operation.
///
/// Not-found is not an error: operations report it as `Ok(false)`, `Ok(None)`
/// or an empty list. `PermissionDenied` is fatal and never retried;
/// `RetriesExhausted` means a transient failure outlived the retry budget.
#[derive(Debug, Error)]
pub enum CdnError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("permission denied during {operation} on {}", .path.display())]
    PermissionDenied { operation: String, path: PathBuf },
    #[error("{operation} on {} failed after {attempts} attempts: {last_error}", .path.display())]
    RetriesExhausted { operation: String, path: PathBuf, attempts: u32, last_error: String },
    #[error("{context}: {source}")]
    Io { context: String, source: std::io::Error },
    #[error("metadata store error: {0}")]
    Store(String),
}

impl CdnError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io { context: context.into(), source }
    }

    pub fn store(e: impl std::fmt::Display) -> Self { Self::Store(e.to_string()) }

    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            CdnError::Validation(_) => 2001,
            CdnError::NotFound(_) => 2002,
            CdnError::Conflict(_) => 2003,
            CdnError::PermissionDenied { .. } => 2101,
            CdnError::RetriesExhausted { .. } => 2102,
            CdnError::Io { .. } => 2103,
            CdnError::Store(_) => 2200,
        }
    }

    /// Whether calling again later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CdnError::RetriesExhausted { .. } | CdnError::Io { .. } | CdnError::Store(_))
    }
}

impl From<models::errors::ModelError> for CdnError {
    fn from(e: models::errors::ModelError) -> Self {
        match e {
            models::errors::ModelError::Validation(m) => CdnError::Validation(m),
            models::errors::ModelError::Db(m) => CdnError::Store(m),
        }
    }
}
