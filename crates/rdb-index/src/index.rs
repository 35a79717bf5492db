//! The core Index structure: a path-keyed view of the working tree.
//!
//! The working tree under the asset root is what the next commit will
//! snapshot. [`Index`] walks it, hashes whatever the [`StatCache`] cannot
//! vouch for, builds one candidate [`Asset`] per asset directory and
//! classifies every file against the committed tree in its [`Baseline`].

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use rdb_asset::{
    resolve_type, to_slash_path, Asset, AssetMeta, AssetPath, PathEntry, META_FILE,
};
use rdb_store::ObjectStore;
use rdb_types::{AssetId, ObjectId};
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::baseline::{committed_assets, Baseline};
use crate::cache::StatCache;
use crate::entry::{FileStatus, IndexEntry};
use crate::error::{IndexError, IndexResult};
use crate::hash::{hash_files, HashJob};
use crate::status::{SkipReason, SkippedPath, StatusEntry, WorkdirStatus};

/// Index settings, taken from the repository config.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexConfig {
    /// Directory holding one subdirectory per asset, relative to the
    /// working tree and `/`-separated.
    pub asset_root: String,
    /// Hashing threads. 0 lets rayon pick.
    pub hash_threads: usize,
    /// Known asset types. Empty disables the check.
    pub declared_types: Vec<String>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            asset_root: "assets".to_string(),
            hash_threads: 0,
            declared_types: Vec::new(),
        }
    }
}

/// Metadata to record while staging.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StageOverrides {
    pub asset_type: Option<String>,
    /// Must agree with the asset directory being staged.
    pub asset_id: Option<AssetId>,
    pub name: Option<String>,
}

impl StageOverrides {
    pub fn is_empty(&self) -> bool {
        self.asset_type.is_none() && self.asset_id.is_none() && self.name.is_none()
    }
}

/// Outcome of [`Index::stage`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StageReport {
    /// Repository paths whose content was stored, in path order.
    pub staged: Vec<String>,
    pub skipped: Vec<SkippedPath>,
    /// Assets whose `meta` file was created or updated.
    pub meta_written: Vec<AssetId>,
}

/// A file found under an asset directory.
struct Found {
    asset: AssetPath,
    path: String,
    abs: PathBuf,
}

struct ScannedFile {
    path: String,
    logical: String,
    hash: ObjectId,
    size: u64,
    mtime: SystemTime,
}

#[derive(Default)]
struct AssetScan {
    files: Vec<ScannedFile>,
    has_meta: bool,
}

/// The staging index.
///
/// Entries are keyed by repository path. A refresh replaces them wholesale,
/// so the index never holds anything the working tree does not back.
pub struct Index {
    store: Arc<dyn ObjectStore>,
    workdir: PathBuf,
    config: IndexConfig,
    baseline: Baseline,
    entries: BTreeMap<String, IndexEntry>,
    /// Candidate asset records for the next commit.
    assets: BTreeMap<AssetId, Asset>,
    skipped: Vec<SkippedPath>,
    cache: StatCache,
}

impl std::fmt::Debug for Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Index")
            .field("workdir", &self.workdir)
            .field("baseline", &self.baseline)
            .field("entries", &self.entries.len())
            .field("assets", &self.assets.len())
            .finish()
    }
}

impl Index {
    /// Create an empty index comparing `workdir` against `baseline`.
    pub fn new(
        store: Arc<dyn ObjectStore>,
        workdir: impl Into<PathBuf>,
        config: IndexConfig,
        baseline: Baseline,
    ) -> Self {
        Self {
            store,
            workdir: workdir.into(),
            config,
            baseline,
            entries: BTreeMap::new(),
            assets: BTreeMap::new(),
            skipped: Vec::new(),
            cache: StatCache::new(),
        }
    }

    /// Seed the stat cache from `path`, discarding staged marks recorded
    /// against another HEAD.
    pub fn load_cache(&mut self, path: &Path) {
        self.cache = StatCache::load(path, self.baseline.commit);
    }

    pub fn save_cache(&self, path: &Path) -> IndexResult<()> {
        self.cache.save(path)
    }

    pub fn cache(&self) -> &StatCache {
        &self.cache
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn baseline(&self) -> Baseline {
        self.baseline
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&IndexEntry> {
        self.entries.get(path)
    }

    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values()
    }

    /// Candidate asset records built by the last refresh.
    pub fn assets(&self) -> &BTreeMap<AssetId, Asset> {
        &self.assets
    }

    /// Files the last refresh left out.
    pub fn skipped(&self) -> &[SkippedPath] {
        &self.skipped
    }

    // ---------------------------------------------------------------
    // Refresh
    // ---------------------------------------------------------------

    /// Rescan the working tree, hashing without storing.
    pub fn refresh(&mut self) -> IndexResult<()> {
        self.scan(false)
    }

    /// Rescan the working tree and make sure every file's blob is in the
    /// store. Commit uses this so the snapshot is complete.
    pub fn refresh_and_store(&mut self) -> IndexResult<()> {
        self.scan(true)
    }

    fn scan(&mut self, store_blobs: bool) -> IndexResult<()> {
        let committed = committed_assets(
            self.store.as_ref(),
            self.baseline.tree.as_ref(),
            &self.config.asset_root,
        )?;
        let root = self.asset_root_dir();
        let (found, skipped) = self.collect(&root)?;

        let mut scans: BTreeMap<AssetId, AssetScan> = BTreeMap::new();
        let mut seen = BTreeSet::new();
        let mut owners = BTreeMap::new();
        let mut jobs = Vec::new();

        for file in found {
            seen.insert(file.path.clone());
            let scan = scans.entry(file.asset.asset_id).or_default();
            if file.asset.is_meta() {
                scan.has_meta = true;
                continue;
            }
            let meta = fs::metadata(&file.abs)?;
            let (size, mtime) = (meta.len(), meta.modified()?);
            let mut cached = self.cache.lookup(&file.path, size, mtime);
            if let Some(hash) = cached.filter(|_| store_blobs) {
                if !self.store.exists(&hash)? {
                    cached = None;
                }
            }
            match cached {
                Some(hash) => scan.files.push(ScannedFile {
                    path: file.path,
                    logical: file.asset.logical,
                    hash,
                    size,
                    mtime,
                }),
                None => {
                    jobs.push(HashJob {
                        path: file.path.clone(),
                        abs: file.abs,
                    });
                    owners.insert(file.path, file.asset);
                }
            }
        }

        let hashed_count = jobs.len();
        let store = store_blobs.then(|| self.store.as_ref());
        for hashed in hash_files(jobs, self.config.hash_threads, store)? {
            let Some(owner) = owners.remove(&hashed.path) else {
                continue;
            };
            self.cache
                .insert(hashed.path.clone(), hashed.size, hashed.mtime, hashed.hash);
            scans.entry(owner.asset_id).or_default().files.push(ScannedFile {
                path: hashed.path,
                logical: owner.logical,
                hash: hashed.hash,
                size: hashed.size,
                mtime: hashed.mtime,
            });
        }

        let mut entries = BTreeMap::new();
        let mut assets = BTreeMap::new();
        for (id, scan) in scans {
            let asset = self.candidate(id, &scan)?;
            self.classify(&asset, &scan, committed.get(&id), &mut entries)?;
            assets.insert(id, asset);
        }
        for (id, base) in &committed {
            if !assets.contains_key(id) {
                for p in &base.paths {
                    let path = self.repo_path(*id, &p.logical);
                    entries.insert(path.clone(), deleted_entry(path, base, p));
                }
            }
        }

        self.cache.retain_paths(&seen);
        for entry in entries.values_mut() {
            entry.staged = self.cache.is_staged(&entry.path);
        }

        debug!(
            files = seen.len(),
            hashed = hashed_count,
            assets = assets.len(),
            skipped = skipped.len(),
            "refreshed index"
        );
        self.entries = entries;
        self.assets = assets;
        self.skipped = skipped;
        Ok(())
    }

    /// Build the asset record for one directory from its `meta` file (if
    /// any) and its scanned files.
    fn candidate(&self, id: AssetId, scan: &AssetScan) -> IndexResult<Asset> {
        let meta = if scan.has_meta {
            AssetMeta::read(&self.meta_path(id))?
        } else {
            None
        };
        let mut asset = match meta {
            Some(meta) => {
                if let Some(declared) = meta.id.filter(|declared| *declared != id) {
                    warn!(asset = %id, %declared, "meta id disagrees with directory; using directory");
                }
                Asset::from_meta(id, &meta)
            }
            None => Asset::new(id),
        };
        asset.set_paths(
            scan.files
                .iter()
                .map(|f| PathEntry::new(f.logical.clone(), f.hash, f.size))
                .collect(),
        );

        let declared = &self.config.declared_types;
        if !declared.is_empty() && !declared.contains(&asset.asset_type) {
            warn!(asset = %id, asset_type = %asset.asset_type, "asset type is not declared in the repository config");
        }
        Ok(asset)
    }

    fn classify(
        &self,
        asset: &Asset,
        scan: &AssetScan,
        base: Option<&Asset>,
        entries: &mut BTreeMap<String, IndexEntry>,
    ) -> IndexResult<()> {
        let same_content = base.is_some_and(|b| b.etag == asset.etag);
        let base_paths: BTreeMap<&str, &PathEntry> = base
            .map(|b| b.paths.iter().map(|p| (p.logical.as_str(), p)).collect())
            .unwrap_or_default();

        for file in &scan.files {
            let status = if same_content {
                FileStatus::Unchanged
            } else {
                match base_paths.get(file.logical.as_str()) {
                    None => FileStatus::Added,
                    Some(p) if p.object != file.hash => FileStatus::Modified,
                    Some(_) => FileStatus::Unchanged,
                }
            };
            entries.insert(
                file.path.clone(),
                IndexEntry {
                    path: file.path.clone(),
                    logical: file.logical.clone(),
                    asset_type: asset.asset_type.clone(),
                    asset_id: asset.id,
                    content_hash: file.hash,
                    size: file.size,
                    mtime: Some(file.mtime),
                    status,
                    staged: false,
                },
            );
        }

        if let Some(base) = base {
            for (logical, p) in &base_paths {
                if asset.path(logical).is_none() {
                    let path = self.repo_path(asset.id, logical);
                    entries.insert(path.clone(), deleted_entry(path, base, p));
                }
            }
        }

        let meta_status = match base {
            Some(b) if metadata_differs(b, asset) => Some(FileStatus::Modified),
            None if asset.paths.is_empty() => Some(FileStatus::Added),
            _ => None,
        };
        if let Some(status) = meta_status {
            let path = self.repo_path(asset.id, META_FILE);
            entries.insert(
                path.clone(),
                IndexEntry {
                    path,
                    logical: META_FILE.to_string(),
                    asset_type: asset.asset_type.clone(),
                    asset_id: asset.id,
                    content_hash: asset.to_stored_object()?.compute_id(),
                    size: 0,
                    mtime: None,
                    status,
                    staged: false,
                },
            );
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Stage
    // ---------------------------------------------------------------

    /// Stage a file, or every file under a directory.
    ///
    /// `path` is relative to the working tree, or absolute inside it.
    /// Content is written to the store immediately. The asset's `meta` file
    /// is written when `overrides` carry anything or no `meta` exists yet.
    /// Files outside asset directories are reported in
    /// [`StageReport::skipped`], not raised.
    pub fn stage(&mut self, path: &Path, overrides: &StageOverrides) -> IndexResult<StageReport> {
        let rel = if path.is_absolute() {
            path.strip_prefix(&self.workdir)
                .map_err(|_| IndexError::InvalidPath(path.display().to_string()))?
        } else {
            path
        };
        let rel_path =
            to_slash_path(rel).ok_or_else(|| IndexError::InvalidPath(path.display().to_string()))?;
        let abs = if rel_path.is_empty() {
            self.asset_root_dir()
        } else {
            self.workdir.join(rel)
        };
        if fs::symlink_metadata(&abs).is_err() {
            return Err(IndexError::PathNotFound(rel_path));
        }

        let (found, skipped) = self.collect(&abs)?;
        for s in &skipped {
            warn!(path = %s.path, reason = %s.reason, "not staged");
        }

        let mut touched = BTreeSet::new();
        if let Some(ap) = AssetPath::parse(&rel_path, &self.config.asset_root) {
            touched.insert(ap.asset_id);
        }
        touched.extend(found.iter().map(|f| f.asset.asset_id));
        if let Some(requested) = overrides.asset_id {
            if let Some(&directory) = touched.iter().find(|id| **id != requested) {
                return Err(IndexError::AssetIdMismatch {
                    path: rel_path,
                    directory,
                    requested,
                });
            }
        }

        let jobs: Vec<HashJob> = found
            .into_iter()
            .filter(|f| !f.asset.is_meta())
            .map(|f| HashJob {
                path: f.path,
                abs: f.abs,
            })
            .collect();
        let mut staged = Vec::with_capacity(jobs.len());
        for hashed in hash_files(jobs, self.config.hash_threads, Some(self.store.as_ref()))? {
            self.cache
                .insert(hashed.path.clone(), hashed.size, hashed.mtime, hashed.hash);
            self.cache.mark_staged(hashed.path.clone());
            staged.push(hashed.path);
        }
        staged.sort();

        let mut meta_written = Vec::new();
        for id in touched {
            if self.write_meta(id, overrides)? {
                meta_written.push(id);
            }
        }

        self.refresh()?;
        info!(
            files = staged.len(),
            skipped = skipped.len(),
            metas = meta_written.len(),
            "staged"
        );
        Ok(StageReport {
            staged,
            skipped,
            meta_written,
        })
    }

    /// Create or update the `meta` file of `id`. Returns whether it was
    /// written.
    fn write_meta(&self, id: AssetId, overrides: &StageOverrides) -> IndexResult<bool> {
        let path = self.meta_path(id);
        let existing = AssetMeta::read(&path)?;
        if existing.is_some() && overrides.is_empty() {
            return Ok(false);
        }
        let mut meta = existing.unwrap_or_default();
        meta.id = Some(id);
        if let Some(t) = &overrides.asset_type {
            meta.asset_type = Some(t.clone());
        } else if meta.asset_type.as_deref().map_or(true, str::is_empty) {
            meta.asset_type = Some(resolve_type(id).to_string());
        }
        if let Some(name) = &overrides.name {
            meta.name = Some(name.clone());
        }
        meta.write(&path)?;
        Ok(true)
    }

    // ---------------------------------------------------------------
    // Status
    // ---------------------------------------------------------------

    /// Changed files and skipped paths as of the last refresh.
    pub fn status(&self) -> WorkdirStatus {
        WorkdirStatus {
            changes: self
                .entries
                .values()
                .filter(|e| e.status.is_change())
                .map(StatusEntry::from)
                .collect(),
            skipped: self.skipped.clone(),
        }
    }

    /// Rebase the index onto a commit that snapshotted the current entries.
    pub fn mark_committed(&mut self, commit: ObjectId, tree: ObjectId) {
        self.baseline = Baseline {
            commit: Some(commit),
            tree: Some(tree),
        };
        self.cache.set_head(Some(commit));
        self.entries
            .retain(|_, e| e.status != FileStatus::Deleted && e.mtime.is_some());
        for entry in self.entries.values_mut() {
            entry.status = FileStatus::Unchanged;
            entry.staged = false;
        }
    }

    // ---------------------------------------------------------------
    // Paths
    // ---------------------------------------------------------------

    fn asset_root_dir(&self) -> PathBuf {
        self.workdir.join(&self.config.asset_root)
    }

    fn meta_path(&self, id: AssetId) -> PathBuf {
        self.asset_root_dir().join(id.to_string()).join(META_FILE)
    }

    fn repo_path(&self, id: AssetId, logical: &str) -> String {
        format!("{}/{id}/{logical}", self.config.asset_root)
    }

    /// Walk `start` and split the files into asset files and skipped paths.
    fn collect(&self, start: &Path) -> IndexResult<(Vec<Found>, Vec<SkippedPath>)> {
        let mut found = Vec::new();
        let mut skipped = Vec::new();
        if !start.exists() {
            return Ok((found, skipped));
        }
        for entry in WalkDir::new(start).sort_by_file_name() {
            let entry = entry?;
            if entry.file_type().is_dir() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(&self.workdir)
                .ok()
                .and_then(to_slash_path);
            let Some(rel) = rel else {
                warn!(path = %entry.path().display(), "skipping file with unusable name");
                skipped.push(SkippedPath {
                    path: entry.path().display().to_string(),
                    reason: SkipReason::InvalidName,
                });
                continue;
            };
            if !entry.file_type().is_file() {
                debug!(path = %rel, "skipping special file");
                skipped.push(SkippedPath {
                    path: rel,
                    reason: SkipReason::NotRegularFile,
                });
                continue;
            }
            match AssetPath::parse(&rel, &self.config.asset_root) {
                Some(asset) if !asset.is_asset_dir() => found.push(Found {
                    asset,
                    path: rel,
                    abs: entry.into_path(),
                }),
                _ => {
                    warn!(path = %rel, "skipping file outside any asset directory");
                    skipped.push(SkippedPath {
                        path: rel,
                        reason: SkipReason::NonAssetPath,
                    });
                }
            }
        }
        Ok((found, skipped))
    }
}

fn deleted_entry(path: String, base: &Asset, p: &PathEntry) -> IndexEntry {
    IndexEntry {
        path,
        logical: p.logical.clone(),
        asset_type: base.asset_type.clone(),
        asset_id: base.id,
        content_hash: p.object,
        size: p.size,
        mtime: None,
        status: FileStatus::Deleted,
        staged: false,
    }
}

/// Compares everything but the file list.
fn metadata_differs(a: &Asset, b: &Asset) -> bool {
    a.asset_type != b.asset_type
        || a.name != b.name
        || a.tags != b.tags
        || a.version != b.version
        || a.attributes != b.attributes
        || a.dependencies != b.dependencies
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdb_store::{Blob, InMemoryObjectStore, Tree, TreeEntry};

    struct Fixture {
        dir: tempfile::TempDir,
        store: Arc<InMemoryObjectStore>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: tempfile::tempdir().unwrap(),
                store: Arc::new(InMemoryObjectStore::new()),
            }
        }

        fn write(&self, rel: &str, content: &str) {
            let path = self.dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }

        fn index(&self, baseline: Baseline) -> Index {
            Index::new(
                self.store.clone(),
                self.dir.path(),
                IndexConfig::default(),
                baseline,
            )
        }

        /// Store `assets` as a committed root tree.
        fn commit_tree(&self, assets: &BTreeMap<AssetId, Asset>) -> Baseline {
            let entries = assets
                .values()
                .map(|a| {
                    let id = a.store(self.store.as_ref()).unwrap();
                    TreeEntry::asset(a.id.to_string(), id, a.total_size(), a.asset_type.clone(), a.id)
                })
                .collect();
            let inner = self
                .store
                .write(&Tree::new(entries).to_stored_object().unwrap())
                .unwrap();
            let root = self
                .store
                .write(
                    &Tree::new(vec![TreeEntry::tree("assets", inner)])
                        .to_stored_object()
                        .unwrap(),
                )
                .unwrap();
            Baseline {
                commit: Some(ObjectId::from_bytes(root.as_bytes())),
                tree: Some(root),
            }
        }
    }

    #[test]
    fn new_files_are_added_with_inferred_type() {
        let fx = Fixture::new();
        fx.write("assets/1030002/en.txt", "Hello");
        fx.write("assets/1030002/de.txt", "Hallo");

        let mut index = fx.index(Baseline::unborn());
        index.refresh().unwrap();

        let status = index.status();
        assert_eq!(status.total_entries(), 2);
        assert!(status.changes.iter().all(|c| c.status == FileStatus::Added));
        assert_eq!(status.changes[0].path, "assets/1030002/de.txt");

        let asset = &index.assets()[&AssetId(1030002)];
        assert_eq!(asset.asset_type, "string");
        assert_eq!(asset.total_size(), 10);
        assert!(fx.store.is_empty(), "refresh must not store blobs");
    }

    #[test]
    fn non_asset_paths_are_skipped() {
        let fx = Fixture::new();
        fx.write("assets/readme.txt", "x");
        fx.write("assets/strings/en.txt", "x");
        fx.write("assets/7/a.bin", "x");

        let mut index = fx.index(Baseline::unborn());
        index.refresh().unwrap();

        let skipped: Vec<_> = index.skipped().iter().map(|s| s.path.as_str()).collect();
        assert_eq!(skipped, ["assets/readme.txt", "assets/strings/en.txt"]);
        assert!(index.skipped().iter().all(|s| s.reason == SkipReason::NonAssetPath));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn classifies_against_committed_tree() {
        let fx = Fixture::new();
        fx.write("assets/1/keep.txt", "same");
        fx.write("assets/1/edit.txt", "before");
        fx.write("assets/1/drop.txt", "bye");
        fx.write("assets/2/gone.txt", "whole asset removed");

        let mut index = fx.index(Baseline::unborn());
        index.refresh_and_store().unwrap();
        let baseline = fx.commit_tree(index.assets());

        fx.write("assets/1/edit.txt", "after, and longer");
        fx.write("assets/1/new.txt", "fresh");
        fs::remove_file(fx.dir.path().join("assets/1/drop.txt")).unwrap();
        fs::remove_dir_all(fx.dir.path().join("assets/2")).unwrap();

        let mut index = fx.index(baseline);
        index.refresh().unwrap();
        let status = index.status();

        assert_eq!(status.get("assets/1/keep.txt"), None);
        assert_eq!(status.get("assets/1/edit.txt"), Some(FileStatus::Modified));
        assert_eq!(status.get("assets/1/new.txt"), Some(FileStatus::Added));
        assert_eq!(status.get("assets/1/drop.txt"), Some(FileStatus::Deleted));
        assert_eq!(status.get("assets/2/gone.txt"), Some(FileStatus::Deleted));
        assert_eq!(index.get("assets/1/keep.txt").unwrap().status, FileStatus::Unchanged);
        assert!(!index.assets().contains_key(&AssetId(2)));
    }

    #[test]
    fn unchanged_tree_is_clean() {
        let fx = Fixture::new();
        fx.write("assets/1030002/en.txt", "Hello");
        let mut index = fx.index(Baseline::unborn());
        index.refresh_and_store().unwrap();
        let baseline = fx.commit_tree(index.assets());

        let mut index = fx.index(baseline);
        index.refresh().unwrap();
        assert!(index.status().is_clean());
    }

    #[test]
    fn metadata_only_change_shows_on_meta_path() {
        let fx = Fixture::new();
        fx.write("assets/1/a.txt", "a");
        let mut index = fx.index(Baseline::unborn());
        index.refresh_and_store().unwrap();
        let baseline = fx.commit_tree(index.assets());

        let mut index = fx.index(baseline);
        index
            .stage(
                Path::new("assets/1"),
                &StageOverrides {
                    name: Some("Renamed".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        let status = index.status();
        assert_eq!(status.get("assets/1/meta"), Some(FileStatus::Modified));
        assert_eq!(status.get("assets/1/a.txt"), None);
    }

    #[test]
    fn stage_stores_blobs_and_writes_meta() {
        let fx = Fixture::new();
        fx.write("assets/1030002/en.txt", "Hello");

        let mut index = fx.index(Baseline::unborn());
        let report = index
            .stage(
                Path::new("assets/1030002"),
                &StageOverrides {
                    asset_id: Some(AssetId(1030002)),
                    name: Some("DialogLine_Intro".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(report.staged, ["assets/1030002/en.txt"]);
        assert_eq!(report.meta_written, [AssetId(1030002)]);
        let entry = index.get("assets/1030002/en.txt").unwrap();
        assert!(entry.staged);
        assert!(fx.store.exists(&entry.content_hash).unwrap());

        let meta = AssetMeta::read(&fx.dir.path().join("assets/1030002/meta"))
            .unwrap()
            .unwrap();
        assert_eq!(meta.asset_type.as_deref(), Some("string"));
        assert_eq!(meta.name.as_deref(), Some("DialogLine_Intro"));
        assert_eq!(index.assets()[&AssetId(1030002)].name.as_deref(), Some("DialogLine_Intro"));
        assert!(index.get("assets/1030002/meta").is_none());
    }

    #[test]
    fn stage_twice_is_idempotent() {
        let fx = Fixture::new();
        fx.write("assets/42001/music.mp3", "la la");
        let mut index = fx.index(Baseline::unborn());
        let first = index
            .stage(Path::new("assets/42001/music.mp3"), &StageOverrides::default())
            .unwrap();
        let objects = fx.store.len();
        let second = index
            .stage(Path::new("assets/42001/music.mp3"), &StageOverrides::default())
            .unwrap();

        assert_eq!(first.meta_written, [AssetId(42001)]);
        assert!(second.meta_written.is_empty());
        assert_eq!(fx.store.len(), objects);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn restaging_edited_content_replaces_the_entry() {
        let fx = Fixture::new();
        fx.write("assets/42001/music.mp3", "la la");
        fx.write("assets/42001/cover.png", "png");
        let mut index = fx.index(Baseline::unborn());
        index.refresh_and_store().unwrap();
        let baseline = fx.commit_tree(index.assets());

        let mut index = fx.index(baseline);
        index
            .stage(Path::new("assets/42001/music.mp3"), &StageOverrides::default())
            .unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.get("assets/42001/music.mp3").unwrap().status, FileStatus::Unchanged);

        fx.write("assets/42001/music.mp3", "la la la, now remastered");
        let report = index
            .stage(Path::new("assets/42001/music.mp3"), &StageOverrides::default())
            .unwrap();

        assert_eq!(report.staged, ["assets/42001/music.mp3"]);
        assert_eq!(index.len(), 2);
        let entry = index.get("assets/42001/music.mp3").unwrap();
        assert_eq!(entry.content_hash, Blob::id_for(b"la la la, now remastered"));
        assert_eq!(entry.status, FileStatus::Modified);
        assert!(entry.staged);
        assert!(fx.store.exists(&entry.content_hash).unwrap());
        assert_eq!(index.status().get("assets/42001/music.mp3"), Some(FileStatus::Modified));
    }

    #[test]
    fn stage_accepts_absolute_paths() {
        let fx = Fixture::new();
        fx.write("assets/5/x.bin", "x");
        let mut index = fx.index(Baseline::unborn());
        let abs = fx.dir.path().join("assets/5/x.bin");
        let report = index.stage(&abs, &StageOverrides::default()).unwrap();
        assert_eq!(report.staged, ["assets/5/x.bin"]);
    }

    #[test]
    fn stage_rejects_mismatched_id() {
        let fx = Fixture::new();
        fx.write("assets/1/a.txt", "a");
        let mut index = fx.index(Baseline::unborn());
        let err = index
            .stage(
                Path::new("assets/1/a.txt"),
                &StageOverrides {
                    asset_id: Some(AssetId(2)),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(
            err,
            IndexError::AssetIdMismatch { directory: AssetId(1), requested: AssetId(2), .. }
        ));
    }

    #[test]
    fn stage_missing_path_fails() {
        let fx = Fixture::new();
        let mut index = fx.index(Baseline::unborn());
        assert!(matches!(
            index.stage(Path::new("assets/9/none"), &StageOverrides::default()),
            Err(IndexError::PathNotFound(p)) if p == "assets/9/none"
        ));
    }

    #[test]
    fn stage_reports_non_asset_paths() {
        let fx = Fixture::new();
        fx.write("assets/notes.txt", "n");
        let mut index = fx.index(Baseline::unborn());
        let report = index
            .stage(Path::new("assets/notes.txt"), &StageOverrides::default())
            .unwrap();
        assert!(report.staged.is_empty());
        assert_eq!(report.skipped[0].reason, SkipReason::NonAssetPath);
    }

    #[test]
    fn store_mode_rehashes_cached_files_missing_from_store() {
        let fx = Fixture::new();
        fx.write("assets/3/a.txt", "cached but unstored");
        let mut index = fx.index(Baseline::unborn());
        index.refresh().unwrap();
        assert_eq!(index.cache().len(), 1);
        assert!(fx.store.is_empty());

        index.refresh_and_store().unwrap();
        let hash = index.get("assets/3/a.txt").unwrap().content_hash;
        assert!(fx.store.exists(&hash).unwrap());
    }

    #[test]
    fn mark_committed_resets_statuses() {
        let fx = Fixture::new();
        fx.write("assets/1/a.txt", "a");
        let mut index = fx.index(Baseline::unborn());
        index
            .stage(Path::new("assets/1"), &StageOverrides::default())
            .unwrap();
        index.mark_committed(ObjectId::from_bytes(b"c"), ObjectId::from_bytes(b"t"));
        assert!(index.status().is_clean());
        assert!(!index.cache().is_staged("assets/1/a.txt"));
    }
}
