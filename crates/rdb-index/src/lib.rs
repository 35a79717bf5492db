//! Staging index for RDB.
//!
//! Tracks the working tree under the asset root, detects file changes
//! against the committed tree, and assembles the asset records the next
//! commit will snapshot.
//!
//! # Key Types
//!
//! - [`Index`] -- path-keyed staging area (BTreeMap-backed)
//! - [`IndexEntry`] -- a tracked file with its asset, hash and status
//! - [`FileStatus`] -- added / modified / deleted / unchanged
//! - [`WorkdirStatus`] -- result of a status computation
//! - [`SkippedPath`] -- working-tree files that are not part of any asset
//! - [`StatCache`] -- `(size, mtime) -> hash` cache persisted between runs

pub mod baseline;
pub mod cache;
pub mod entry;
pub mod error;
mod hash;
pub mod index;
pub mod status;

pub use baseline::{committed_assets, Baseline};
pub use cache::StatCache;
pub use entry::{FileStatus, IndexEntry};
pub use error::{IndexError, IndexResult};
pub use index::{Index, IndexConfig, StageOverrides, StageReport};
pub use status::{SkipReason, SkippedPath, StatusEntry, WorkdirStatus};
