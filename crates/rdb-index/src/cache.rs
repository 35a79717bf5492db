//! Persistent stat cache.
//!
//! Maps repository paths to the content hash last computed for them along
//! with the `(size, mtime)` observed at the time. It is only ever a hint: a
//! mismatching or missing stat means the file is hashed again, and an
//! unreadable cache file is treated as empty.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;
use std::time::{Duration, SystemTime};

use rdb_types::ObjectId;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{IndexError, IndexResult};

const CACHE_VERSION: u32 = 1;

/// Files modified this close to the save time are not persisted: a later
/// write within the same mtime tick would be indistinguishable.
const RACY_WINDOW: Duration = Duration::from_secs(2);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedStat {
    pub size: u64,
    pub mtime: SystemTime,
    pub hash: ObjectId,
}

/// `(size, mtime) -> hash` cache plus the session's staged paths.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatCache {
    version: u32,
    /// HEAD commit the staged set was recorded against.
    head: Option<ObjectId>,
    entries: BTreeMap<String, CachedStat>,
    staged: BTreeSet<String>,
}

impl Default for StatCache {
    fn default() -> Self {
        Self {
            version: CACHE_VERSION,
            head: None,
            entries: BTreeMap::new(),
            staged: BTreeSet::new(),
        }
    }
}

impl StatCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the cache file. Missing or unreadable files yield an empty cache.
    ///
    /// When the file was written against a different HEAD, staged marks
    /// are dropped and only the stat/hash pairs are kept.
    pub fn load(path: &Path, head: Option<ObjectId>) -> Self {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Self::for_head(head),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable index cache");
                return Self::for_head(head);
            }
        };
        let mut cache: Self = match bincode::deserialize(&bytes) {
            Ok(cache) => cache,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring corrupt index cache");
                return Self::for_head(head);
            }
        };
        if cache.version != CACHE_VERSION {
            return Self::for_head(head);
        }
        if cache.head != head {
            debug!("HEAD moved since the index was written; clearing staged marks");
            cache.staged.clear();
            cache.head = head;
        }
        cache
    }

    fn for_head(head: Option<ObjectId>) -> Self {
        Self {
            head,
            ..Self::default()
        }
    }

    /// Persist atomically, leaving out racily-clean entries.
    pub fn save(&self, path: &Path) -> IndexResult<()> {
        let cutoff = SystemTime::now()
            .checked_sub(RACY_WINDOW)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let persisted = Self {
            version: self.version,
            head: self.head,
            entries: self
                .entries
                .iter()
                .filter(|(_, stat)| stat.mtime < cutoff)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            staged: self.staged.clone(),
        };
        let bytes =
            bincode::serialize(&persisted).map_err(|e| IndexError::Serialization(e.to_string()))?;

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        debug!(entries = persisted.entries.len(), "saved index cache");
        Ok(())
    }

    /// Cached hash for `path` if its size and mtime still match.
    pub fn lookup(&self, path: &str, size: u64, mtime: SystemTime) -> Option<ObjectId> {
        self.entries
            .get(path)
            .filter(|stat| stat.size == size && stat.mtime == mtime)
            .map(|stat| stat.hash)
    }

    pub fn insert(&mut self, path: String, size: u64, mtime: SystemTime, hash: ObjectId) {
        self.entries.insert(path, CachedStat { size, mtime, hash });
    }

    /// Keep only the given paths.
    pub fn retain_paths(&mut self, keep: &BTreeSet<String>) {
        self.entries.retain(|path, _| keep.contains(path));
        self.staged.retain(|path| keep.contains(path));
    }

    pub fn head(&self) -> Option<ObjectId> {
        self.head
    }

    /// Record a new HEAD, clearing staged marks if it moved.
    pub fn set_head(&mut self, head: Option<ObjectId>) {
        if self.head != head {
            self.staged.clear();
            self.head = head;
        }
    }

    pub fn mark_staged(&mut self, path: String) {
        self.staged.insert(path);
    }

    pub fn is_staged(&self, path: &str) -> bool {
        self.staged.contains(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn old_mtime() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000)
    }

    #[test]
    fn lookup_requires_matching_stat() {
        let mut cache = StatCache::new();
        let hash = ObjectId::from_bytes(b"h");
        cache.insert("assets/1/a".into(), 5, old_mtime(), hash);

        assert_eq!(cache.lookup("assets/1/a", 5, old_mtime()), Some(hash));
        assert_eq!(cache.lookup("assets/1/a", 6, old_mtime()), None);
        assert_eq!(
            cache.lookup("assets/1/a", 5, old_mtime() + Duration::from_secs(1)),
            None
        );
        assert_eq!(cache.lookup("assets/1/b", 5, old_mtime()), None);
    }

    #[test]
    fn save_and_load_same_head() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index");
        let head = Some(ObjectId::from_bytes(b"head"));

        let mut cache = StatCache::load(&path, head);
        cache.insert("assets/1/a".into(), 5, old_mtime(), ObjectId::from_bytes(b"h"));
        cache.mark_staged("assets/1/a".into());
        cache.save(&path).unwrap();

        let loaded = StatCache::load(&path, head);
        assert_eq!(loaded, cache);
        assert!(loaded.is_staged("assets/1/a"));
    }

    #[test]
    fn moved_head_drops_staged_marks_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index");
        let mut cache = StatCache::load(&path, None);
        cache.insert("assets/1/a".into(), 5, old_mtime(), ObjectId::from_bytes(b"h"));
        cache.mark_staged("assets/1/a".into());
        cache.save(&path).unwrap();

        let loaded = StatCache::load(&path, Some(ObjectId::from_bytes(b"new head")));
        assert!(!loaded.is_staged("assets/1/a"));
        assert_eq!(loaded.len(), 1);
    }

    #[test]
    fn racily_clean_entries_are_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index");
        let mut cache = StatCache::new();
        cache.insert("fresh".into(), 1, SystemTime::now(), ObjectId::from_bytes(b"f"));
        cache.insert("old".into(), 1, old_mtime(), ObjectId::from_bytes(b"o"));
        cache.save(&path).unwrap();

        let loaded = StatCache::load(&path, None);
        assert_eq!(loaded.len(), 1);
        assert!(loaded.lookup("old", 1, old_mtime()).is_some());
    }

    #[test]
    fn garbage_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index");
        fs::write(&path, b"\xff\xfe not bincode").unwrap();
        assert!(StatCache::load(&path, None).is_empty());
    }
}
