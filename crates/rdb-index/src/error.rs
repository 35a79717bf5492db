//! Error types for the index crate.

use rdb_types::AssetId;

/// Errors that can occur during index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The path to stage does not exist in the working tree.
    #[error("path not found: {0}")]
    PathNotFound(String),

    /// The path cannot be expressed relative to the working tree.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// An ID override disagrees with the asset directory.
    #[error("{path} belongs to asset {directory}, not {requested}")]
    AssetIdMismatch {
        path: String,
        directory: AssetId,
        requested: AssetId,
    },

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] rdb_store::StoreError),

    /// Asset record or meta file error.
    #[error("asset error: {0}")]
    Asset(#[from] rdb_asset::AssetError),

    /// The hashing thread pool could not be created.
    #[error("thread pool error: {0}")]
    ThreadPool(String),

    /// Serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<walkdir::Error> for IndexError {
    fn from(err: walkdir::Error) -> Self {
        let path = err
            .path()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        match err.into_io_error() {
            Some(io) => Self::Io(io),
            None => Self::InvalidPath(format!("filesystem loop at {path}")),
        }
    }
}

/// Convenience alias for index results.
pub type IndexResult<T> = Result<T, IndexError>;
