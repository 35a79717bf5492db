//! Error types for the diff crate.

use rdb_asset::AssetError;
use rdb_store::StoreError;

/// Errors that can occur while building or diffing trees.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// Two entries with the same name in one tree.
    #[error("duplicate tree entry: {0}")]
    DuplicateEntry(String),

    /// A path is used both as a directory and as a leaf.
    #[error("path conflict at {0}")]
    PathConflict(String),

    /// A path with empty, `.` or `..` components.
    #[error("invalid tree path: {0:?}")]
    InvalidPath(String),

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// An asset record could not be read.
    #[error("asset error: {0}")]
    Asset(#[from] AssetError),
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
