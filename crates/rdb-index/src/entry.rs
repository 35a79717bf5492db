//! Index entry types for tracking working directory files.

use std::time::SystemTime;

use rdb_types::{AssetId, ObjectId};
use serde::{Deserialize, Serialize};

/// How a working-tree file compares with the committed tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// Not present in the committed tree.
    Added,
    /// Present in both, content differs.
    Modified,
    /// Committed but gone from the working tree.
    Deleted,
    Unchanged,
}

impl FileStatus {
    /// Single-letter status code.
    pub fn code(&self) -> char {
        match self {
            Self::Added => 'A',
            Self::Modified => 'M',
            Self::Deleted => 'D',
            Self::Unchanged => ' ',
        }
    }

    /// Returns `true` for anything but `Unchanged`.
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
            Self::Unchanged => "unchanged",
        })
    }
}

/// An entry in the staging index, representing a tracked file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Repository-relative path, `/`-separated.
    pub path: String,
    /// Path relative to the asset directory.
    pub logical: String,
    pub asset_type: String,
    pub asset_id: AssetId,
    /// Blob ID of the file content (the committed content for deleted files).
    pub content_hash: ObjectId,
    /// File size in bytes.
    pub size: u64,
    /// Last modification time; `None` for deleted files.
    pub mtime: Option<SystemTime>,
    pub status: FileStatus,
    /// Explicitly staged in this session.
    pub staged: bool,
}
