use std::path::PathBuf;

use rdb_asset::AssetError;
use rdb_diff::DiffError;
use rdb_index::IndexError;
use rdb_refs::RefError;
use rdb_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("not an RDB repository: {}", .0.display())]
    NotARepository(PathBuf),

    #[error("repository already initialized at {}", .0.display())]
    AlreadyInitialized(PathBuf),

    #[error("nothing to commit: tree matches the parent commit")]
    NoOpCommit,

    #[error("nothing to amend: branch {0} has no commits")]
    NothingToAmend(String),

    #[error("no commits yet on branch {0}")]
    NoCommits(String),

    #[error("commit message is empty")]
    EmptyMessage,

    #[error("unknown revision: {0}")]
    UnknownRevision(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("asset error: {0}")]
    Asset(#[from] AssetError),

    #[error("diff error: {0}")]
    Diff(#[from] DiffError),

    #[error("ref error: {0}")]
    Ref(#[from] RefError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse error categories callers can branch on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NotARepository,
    AlreadyInitialized,
    /// Stored data does not hash to its ID or cannot be decoded.
    Integrity,
    NotFound,
    Validation,
    NoOpCommit,
    LockContention,
    DetachedHead,
    InvalidInput,
    Io,
}

impl SdkError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotARepository(_) => ErrorKind::NotARepository,
            Self::AlreadyInitialized(_) => ErrorKind::AlreadyInitialized,
            Self::NoOpCommit => ErrorKind::NoOpCommit,
            Self::NothingToAmend(_) | Self::NoCommits(_) | Self::UnknownRevision(_) => {
                ErrorKind::NotFound
            }
            Self::EmptyMessage | Self::InvalidConfig(_) => ErrorKind::InvalidInput,
            Self::Store(e) => store_kind(e),
            Self::Asset(e) => asset_kind(e),
            Self::Diff(e) => match e {
                DiffError::Store(e) => store_kind(e),
                DiffError::Asset(e) => asset_kind(e),
                _ => ErrorKind::InvalidInput,
            },
            Self::Ref(e) => match e {
                RefError::NotFound { .. } => ErrorKind::NotFound,
                RefError::DetachedHead => ErrorKind::DetachedHead,
                RefError::LockContention { .. } => ErrorKind::LockContention,
                RefError::InvalidBranchName { .. } => ErrorKind::InvalidInput,
                RefError::Corrupt { .. } => ErrorKind::Integrity,
                RefError::Poisoned(_) => ErrorKind::Io,
                RefError::Io(_) => ErrorKind::Io,
            },
            Self::Index(e) => match e {
                IndexError::Store(e) => store_kind(e),
                IndexError::Asset(e) => asset_kind(e),
                IndexError::PathNotFound(_) => ErrorKind::NotFound,
                IndexError::Io(_) => ErrorKind::Io,
                _ => ErrorKind::InvalidInput,
            },
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Returns `true` when a commit was refused because nothing changed.
    pub fn is_no_op(&self) -> bool {
        matches!(self, Self::NoOpCommit)
    }
}

fn store_kind(e: &StoreError) -> ErrorKind {
    match e {
        StoreError::NotFound(_) => ErrorKind::NotFound,
        StoreError::HashMismatch { .. } | StoreError::CorruptObject { .. } => ErrorKind::Integrity,
        StoreError::Serialization(_) => ErrorKind::Integrity,
        StoreError::Io(_) => ErrorKind::Io,
    }
}

fn asset_kind(e: &AssetError) -> ErrorKind {
    match e {
        AssetError::Validation { .. } => ErrorKind::Validation,
        AssetError::MalformedMeta { .. } => ErrorKind::InvalidInput,
        AssetError::Serialization(_) => ErrorKind::Integrity,
        AssetError::Store(e) => store_kind(e),
        AssetError::Io(_) => ErrorKind::Io,
    }
}

pub type SdkResult<T> = Result<T, SdkError>;
