//! Working directory status types.
//!
//! These types represent the result of comparing the working tree against
//! the committed tree, as seen through the index.

use rdb_types::AssetId;
use serde::{Deserialize, Serialize};

use crate::entry::{FileStatus, IndexEntry};

/// Why a working-tree file was left out of the index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Not inside an `<asset_root>/<numeric id>/` directory.
    NonAssetPath,
    /// Symlinks and other special files.
    NotRegularFile,
    /// The name is not valid UTF-8.
    InvalidName,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonAssetPath => f.write_str("not inside an asset directory"),
            Self::NotRegularFile => f.write_str("not a regular file"),
            Self::InvalidName => f.write_str("file name is not valid UTF-8"),
        }
    }
}

/// A working-tree file that is not tracked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedPath {
    pub path: String,
    pub reason: SkipReason,
}

/// A single status entry representing a file change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    /// The file path relative to the repository root.
    pub path: String,
    pub status: FileStatus,
    pub asset_id: AssetId,
    pub asset_type: String,
    /// Explicitly staged in this session.
    pub staged: bool,
}

impl From<&IndexEntry> for StatusEntry {
    fn from(entry: &IndexEntry) -> Self {
        Self {
            path: entry.path.clone(),
            status: entry.status,
            asset_id: entry.asset_id,
            asset_type: entry.asset_type.clone(),
            staged: entry.staged,
        }
    }
}

/// Complete status of the working directory.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkdirStatus {
    /// Changed files in path order. Unchanged files are omitted.
    pub changes: Vec<StatusEntry>,
    /// Files outside any asset directory.
    pub skipped: Vec<SkippedPath>,
}

impl WorkdirStatus {
    /// Create an empty status.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if no tracked file differs from the committed tree.
    pub fn is_clean(&self) -> bool {
        self.changes.is_empty()
    }

    /// Status of a single path, if it changed.
    pub fn get(&self, path: &str) -> Option<FileStatus> {
        self.changes.iter().find(|c| c.path == path).map(|c| c.status)
    }

    /// Changes of one kind.
    pub fn with_status(&self, status: FileStatus) -> impl Iterator<Item = &StatusEntry> {
        self.changes.iter().filter(move |c| c.status == status)
    }

    /// Number of changed files.
    pub fn total_entries(&self) -> usize {
        self.changes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(path: &str, status: FileStatus) -> StatusEntry {
        StatusEntry {
            path: path.into(),
            status,
            asset_id: AssetId(1),
            asset_type: "text".into(),
            staged: false,
        }
    }

    #[test]
    fn empty_status_is_clean() {
        let status = WorkdirStatus::new();
        assert!(status.is_clean());
        assert_eq!(status.total_entries(), 0);
    }

    #[test]
    fn skipped_paths_do_not_dirty_status() {
        let mut status = WorkdirStatus::new();
        status.skipped.push(SkippedPath {
            path: "assets/readme.txt".into(),
            reason: SkipReason::NonAssetPath,
        });
        assert!(status.is_clean());
    }

    #[test]
    fn lookup_by_path_and_kind() {
        let status = WorkdirStatus {
            changes: vec![
                change("assets/1/a", FileStatus::Added),
                change("assets/1/b", FileStatus::Modified),
            ],
            skipped: Vec::new(),
        };
        assert_eq!(status.get("assets/1/b"), Some(FileStatus::Modified));
        assert_eq!(status.get("assets/1/c"), None);
        assert_eq!(status.with_status(FileStatus::Added).count(), 1);
    }
}
