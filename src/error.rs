//! Error types.

use thiserror::Error;

/// Result alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors returned by stores and the reconciliation engine.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Filesystem I/O failed (typically `PermissionDenied` on the hosts file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted registry document could not be encoded or decoded.
    #[error("registry store error: {0}")]
    Store(#[from] serde_json::Error),

    /// A host entry failed validation.
    #[error("invalid host entry: {0}")]
    InvalidEntry(String),

    /// Writing the merged entry set to one of the stores failed.
    #[error("merge failed: {0}")]
    MergeFailed(Box<SyncError>),

    /// Another tick is still running.
    #[error("a reconciliation tick is already in flight")]
    TickInFlight,
}

impl SyncError {
    /// Returns `true` if the underlying I/O error is `PermissionDenied`.
    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Self::Io(e) => e.kind() == std::io::ErrorKind::PermissionDenied,
            Self::MergeFailed(inner) => inner.is_permission_denied(),
            _ => false,
        }
    }
}
