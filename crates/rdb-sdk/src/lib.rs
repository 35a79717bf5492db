//! High-level SDK for RDB.
//!
//! [`Rdb`] is the handle applications and the CLI use to drive a repository:
//! init, stage, status, commit, log and diff. It also lists the built-in
//! asset folders and serves the manifest read API that packaging consumes.

pub mod commit;
pub mod config;
pub mod error;
pub mod manifest;
pub mod repository;

pub use commit::{CommitInfo, CommitRequest, LogQuery};
pub use config::{Layout, RepoConfig};
pub use error::{ErrorKind, SdkError, SdkResult};
pub use manifest::{Manifest, ManifestAsset, ManifestCommit, MANIFEST_SCHEMA_VERSION};
pub use repository::{AssetFolder, Rdb, RDB_DIR};

// Re-export key types
pub use rdb_asset::{Asset, PathEntry};
pub use rdb_diff::{ChangeKind, TreeChange, TreeDiff};
pub use rdb_index::{
    FileStatus, SkipReason, SkippedPath, StageOverrides, StageReport, StatusEntry, WorkdirStatus,
};
pub use rdb_refs::{BranchInfo, Head};
pub use rdb_store::Commit;
pub use rdb_types::{AssetId, ObjectId};
