use std::path::PathBuf;

use rdb_store::StoreError;
use rdb_types::AssetId;

/// Errors from asset operations.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    /// The asset record violates a structural or referential rule.
    #[error("invalid asset {id}: {reason}")]
    Validation { id: AssetId, reason: String },

    /// A `meta` file exists but cannot be parsed.
    #[error("malformed meta file {}: {reason}", path.display())]
    MalformedMeta { path: PathBuf, reason: String },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AssetError {
    pub(crate) fn validation(id: AssetId, reason: impl Into<String>) -> Self {
        Self::Validation {
            id,
            reason: reason.into(),
        }
    }

    /// Returns `true` for validation failures.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

/// Result alias for asset operations.
pub type AssetResult<T> = Result<T, AssetError>;
