//! Error types for reference operations.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during reference operations.
#[derive(Debug, Error)]
pub enum RefError {
    /// The reference was not found.
    #[error("ref not found: {name}")]
    NotFound { name: String },

    /// The branch name is invalid.
    #[error("invalid branch name: {name}: {reason}")]
    InvalidBranchName { name: String, reason: String },

    /// HEAD is in a detached state (not pointing to a branch).
    #[error("HEAD is detached")]
    DetachedHead,

    /// Another process holds the branch lock.
    #[error("branch {branch} is locked by another writer (waited {waited:?})")]
    LockContention { branch: String, waited: Duration },

    /// A ref or HEAD file has unparseable contents.
    #[error("corrupt ref {name}: {reason}")]
    Corrupt { name: String, reason: String },

    /// A thread panicked while holding an in-memory store lock.
    #[error("ref store lock poisoned: {0}")]
    Poisoned(String),

    /// I/O error during file-based ref operations.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for ref operations.
pub type RefResult<T> = std::result::Result<T, RefError>;
