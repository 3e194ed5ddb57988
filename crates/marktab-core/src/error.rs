//! Error types for MarkTab

use thiserror::Error;

/// Result type alias for MarkTab operations
pub type MarkTabResult<T> = Result<T, MarkTabError>;

/// Main error type for MarkTab
#[derive(Error, Debug)]
pub enum MarkTabError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Host error: {0}")]
    Host(#[from] HostError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MarkTabError {
    /// Create a new storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

/// Failure reported by a host tabs call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The tab has no earlier history entry.
    #[error("tab has no history to go back to")]
    NoHistory,

    #[error("no tab with id {0}")]
    NoSuchTab(u64),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The host refused the call, e.g. on a privileged page.
    #[error("operation not permitted: {0}")]
    Forbidden(String),
}
