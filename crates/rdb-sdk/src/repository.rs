use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use rdb_asset::{builtin_types, validate, Asset};
use rdb_diff::{diff_trees, empty_tree_id, TreeBuilder, TreeDiff};
use rdb_index::{
    committed_assets, Baseline, Index, StageOverrides, StageReport, WorkdirStatus,
};
use rdb_refs::{branch_ref, BranchInfo, BranchLock, FsRefStore, Head, RefError, RefStore};
use rdb_store::{Commit, EntryKind, FsObjectStore, ObjectStore, Tree, TreeEntry};
use rdb_types::{AssetId, ObjectId};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::commit::{CommitInfo, CommitRequest, LogQuery};
use crate::config::{Layout, RepoConfig};
use crate::error::{SdkError, SdkResult};
use crate::manifest::Manifest;

/// Name of the metadata directory at the working-tree root.
pub const RDB_DIR: &str = ".rdb";
const DEFAULT_BRANCH: &str = "main";

/// A built-in asset category and whether its folder is present.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AssetFolder {
    pub id: AssetId,
    #[serde(rename = "type")]
    pub asset_type: &'static str,
    /// Repository-relative folder path.
    pub path: String,
    pub exists: bool,
}

/// Handle on an on-disk repository.
pub struct Rdb {
    workdir: PathBuf,
    rdb_dir: PathBuf,
    config: RepoConfig,
    store: Arc<FsObjectStore>,
    refs: FsRefStore,
}

impl std::fmt::Debug for Rdb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rdb")
            .field("workdir", &self.workdir)
            .field("layout", &self.config.core.layout)
            .finish()
    }
}

impl Rdb {
    /// Create a repository at `path`.
    ///
    /// HEAD names the unborn `main` branch; no commit is made. A folder is
    /// created for every built-in asset category. Empty folders are not
    /// part of any snapshot.
    pub fn init(path: impl AsRef<Path>, layout: Layout, types: Vec<String>) -> SdkResult<Self> {
        let workdir = path.as_ref().to_path_buf();
        let rdb_dir = workdir.join(RDB_DIR);
        if rdb_dir.exists() {
            return Err(SdkError::AlreadyInitialized(workdir));
        }
        for dir in ["refs/heads", "refs/tags", "objects", "locks"] {
            fs::create_dir_all(rdb_dir.join(dir))?;
        }

        let config = RepoConfig::new(layout, types);
        config.save(&rdb_dir.join("config"))?;
        let refs = FsRefStore::new(&rdb_dir);
        refs.set_head(DEFAULT_BRANCH)?;
        let asset_root = workdir.join(&config.core.asset_root);
        fs::create_dir_all(&asset_root)?;
        for (id, _) in builtin_types() {
            fs::create_dir_all(asset_root.join(id.to_string()))?;
        }

        info!(path = %workdir.display(), %layout, "initialized repository");
        Self::open(&workdir)
    }

    /// Open the repository whose working tree is `path`.
    pub fn open(path: impl AsRef<Path>) -> SdkResult<Self> {
        let path = path.as_ref();
        let rdb_dir = path.join(RDB_DIR);
        if !rdb_dir.join("HEAD").is_file() {
            return Err(SdkError::NotARepository(path.to_path_buf()));
        }
        let workdir = path.canonicalize()?;
        let rdb_dir = workdir.join(RDB_DIR);
        let config = RepoConfig::load(&rdb_dir.join("config"))?;
        let store = Arc::new(FsObjectStore::open(rdb_dir.join("objects"))?);
        let refs = FsRefStore::new(&rdb_dir);
        debug!(path = %workdir.display(), "opened repository");
        Ok(Self {
            workdir,
            rdb_dir,
            config,
            store,
            refs,
        })
    }

    /// Open the repository containing `start`, searching parent directories.
    pub fn discover(start: impl AsRef<Path>) -> SdkResult<Self> {
        let start = start.as_ref();
        let abs = start.canonicalize()?;
        for dir in abs.ancestors() {
            if dir.join(RDB_DIR).join("HEAD").is_file() {
                return Self::open(dir);
            }
        }
        Err(SdkError::NotARepository(start.to_path_buf()))
    }

    // ---- Accessors ----

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    pub fn refs(&self) -> &FsRefStore {
        &self.refs
    }

    pub fn head(&self) -> SdkResult<Head> {
        self.refs.head()?.ok_or_else(|| RefError::NotFound {
            name: "HEAD".to_string(),
        }.into())
    }

    /// Branch HEAD names. Fails when HEAD is detached.
    pub fn current_branch(&self) -> SdkResult<String> {
        match self.head()? {
            Head::Symbolic(branch) => Ok(branch),
            Head::Detached(_) => Err(RefError::DetachedHead.into()),
        }
    }

    /// Commit HEAD resolves to, `None` on an unborn branch.
    pub fn head_commit(&self) -> SdkResult<Option<ObjectId>> {
        Ok(self.refs.resolve_head()?)
    }

    pub fn branches(&self) -> SdkResult<Vec<BranchInfo>> {
        Ok(self.refs.branches()?)
    }

    pub fn read_commit(&self, id: &ObjectId) -> SdkResult<CommitInfo> {
        Ok(CommitInfo {
            id: *id,
            commit: Commit::load(self.store(), id)?,
        })
    }

    /// Resolve `HEAD`, a branch name or a full commit hash.
    pub fn resolve(&self, rev: &str) -> SdkResult<ObjectId> {
        let unknown = || SdkError::UnknownRevision(rev.to_string());
        if rev == "HEAD" {
            return self.head_commit()?.ok_or_else(unknown);
        }
        if rdb_refs::validate_branch_name(rev).is_ok() {
            if let Some(id) = self.refs.branch_tip(rev)? {
                return Ok(id);
            }
        }
        let id: ObjectId = rev.parse().map_err(|_| unknown())?;
        if !self.store.exists(&id)? {
            return Err(unknown());
        }
        Ok(id)
    }

    /// Built-in asset categories in ID order, with folder presence.
    pub fn list_types(&self) -> Vec<AssetFolder> {
        let root = &self.config.core.asset_root;
        builtin_types()
            .map(|(id, asset_type)| {
                let path = format!("{root}/{id}");
                let exists = self.workdir.join(&path).is_dir();
                AssetFolder {
                    id,
                    asset_type,
                    path,
                    exists,
                }
            })
            .collect()
    }

    // ---- Working tree ----

    fn index_at(&self, baseline: Baseline) -> Index {
        let mut index = Index::new(
            self.store.clone(),
            &self.workdir,
            self.config.index_config(),
            baseline,
        );
        index.load_cache(&self.cache_path());
        index
    }

    fn cache_path(&self) -> PathBuf {
        self.rdb_dir.join("index")
    }

    fn save_cache(&self, index: &Index) {
        if let Err(e) = index.save_cache(&self.cache_path()) {
            warn!(error = %e, "could not save index cache");
        }
    }

    fn baseline(&self, head: Option<&ObjectId>) -> SdkResult<Baseline> {
        Ok(Baseline::resolve(self.store(), head)?)
    }

    /// Store the content under `path` and record metadata overrides.
    pub fn stage(&self, path: &Path, overrides: &StageOverrides) -> SdkResult<StageReport> {
        let head = self.head_commit()?;
        let mut index = self.index_at(self.baseline(head.as_ref())?);
        let report = index.stage(path, overrides)?;
        self.save_cache(&index);
        Ok(report)
    }

    /// Compare the working tree with HEAD.
    pub fn status(&self) -> SdkResult<WorkdirStatus> {
        let head = self.head_commit()?;
        let mut index = self.index_at(self.baseline(head.as_ref())?);
        index.refresh()?;
        self.save_cache(&index);
        Ok(index.status())
    }

    // ---- History ----

    /// Snapshot the working tree onto the current branch.
    pub fn commit(&self, request: CommitRequest) -> SdkResult<CommitInfo> {
        let branch = self.current_branch()?;
        let _lock = BranchLock::acquire(
            &self.rdb_dir.join("locks"),
            &branch,
            self.config.lock_timeout(),
        )?;

        // Re-read under the lock: another writer may have moved the tip.
        let tip = self.refs.branch_tip(&branch)?;
        let tip_commit = tip
            .as_ref()
            .map(|id| Commit::load(self.store(), id))
            .transpose()?;
        if request.amend && tip_commit.is_none() {
            return Err(SdkError::NothingToAmend(branch));
        }

        let message = match (request.message.trim().is_empty(), &tip_commit) {
            (false, _) => request.message.clone(),
            (true, Some(old)) if request.amend => old.message.clone(),
            _ => return Err(SdkError::EmptyMessage),
        };

        let mut index = self.index_at(Baseline {
            commit: tip,
            tree: tip_commit.as_ref().map(|c| c.tree),
        });
        index.refresh_and_store()?;
        let tree = self.write_tree(index.assets().values())?;

        let parent_tree = match (&tip_commit, request.amend) {
            (Some(old), true) => match old.parent {
                Some(p) => Some(Commit::load(self.store(), &p)?.tree),
                None => None,
            },
            (old, _) => old.as_ref().map(|c| c.tree),
        };
        if !request.amend && tree == parent_tree.map_or_else(empty_tree_id, Ok)? {
            return Err(SdkError::NoOpCommit);
        }

        let commit = Commit {
            author: request.author.clone().unwrap_or_else(|| self.config.author()),
            timestamp: Utc::now(),
            message,
            branch: branch.clone(),
            parent: match (&tip_commit, request.amend) {
                (Some(old), true) => old.parent,
                _ => tip,
            },
            tree,
        };
        let id = self.store.write(&commit.to_stored_object()?)?;
        self.refs.write_ref(&branch_ref(&branch), &id)?;

        index.mark_committed(id, tree);
        self.save_cache(&index);
        info!(%id, %branch, amend = request.amend, assets = index.assets().len(), "committed");
        Ok(CommitInfo { id, commit })
    }

    /// Validate and store each asset, then build the root tree.
    fn write_tree<'a>(&self, assets: impl Iterator<Item = &'a Asset>) -> SdkResult<ObjectId> {
        let root = &self.config.core.asset_root;
        let mut builder = TreeBuilder::new();
        for asset in assets {
            validate(asset, self.store())?;
            let object = asset.store(self.store())?;
            builder.insert(
                &format!("{root}/{}", asset.id),
                TreeEntry::asset(
                    asset.id.to_string(),
                    object,
                    asset.total_size(),
                    asset.asset_type.clone(),
                    asset.id,
                ),
            )?;
        }
        Ok(builder.write(self.store())?)
    }

    /// Walk parent links from `query.start` (HEAD by default).
    pub fn log(&self, query: &LogQuery) -> SdkResult<Vec<CommitInfo>> {
        let mut next = match query.start {
            Some(id) => Some(id),
            None => self.head_commit()?,
        };
        let mut out = Vec::new();
        while let Some(id) = next {
            let info = self.read_commit(&id)?;
            next = info.commit.parent;
            if query.since.is_some_and(|since| info.commit.timestamp < since) {
                break;
            }
            if query.until.is_some_and(|until| info.commit.timestamp > until) {
                continue;
            }
            out.push(info);
            if query.max_count != 0 && out.len() >= query.max_count {
                break;
            }
        }
        Ok(out)
    }

    /// File-level changes between two commits. `None` stands for the empty
    /// tree.
    pub fn diff(&self, from: Option<&ObjectId>, to: Option<&ObjectId>) -> SdkResult<TreeDiff> {
        let tree_of = |id: Option<&ObjectId>| -> SdkResult<Option<ObjectId>> {
            id.map(|id| Commit::load(self.store(), id).map(|c| c.tree))
                .transpose()
                .map_err(SdkError::from)
        };
        let (old, new) = (tree_of(from)?, tree_of(to)?);
        Ok(diff_trees(self.store(), old.as_ref(), new.as_ref())?)
    }

    // ---- Packaging reads ----

    fn commit_or_head(&self, commit: Option<&ObjectId>) -> SdkResult<ObjectId> {
        match commit {
            Some(id) => Ok(*id),
            None => {
                let branch = self.head()?.branch().unwrap_or("HEAD").to_string();
                self.head_commit()?.ok_or(SdkError::NoCommits(branch))
            }
        }
    }

    /// Manifest of `commit` (HEAD by default).
    pub fn manifest(&self, commit: Option<&ObjectId>) -> SdkResult<Manifest> {
        let info = self.read_commit(&self.commit_or_head(commit)?)?;
        let assets = committed_assets(
            self.store(),
            Some(&info.commit.tree),
            &self.config.core.asset_root,
        )?;
        Ok(Manifest::new(&info, assets.values()))
    }

    /// Every object a package of `commit` must carry: the commit, its trees,
    /// asset records and blobs.
    pub fn reachable_objects(&self, commit: Option<&ObjectId>) -> SdkResult<BTreeSet<ObjectId>> {
        let id = self.commit_or_head(commit)?;
        let commit = Commit::load(self.store(), &id)?;
        let mut out = BTreeSet::from([id]);
        let mut pending = vec![commit.tree];
        while let Some(tree_id) = pending.pop() {
            if !out.insert(tree_id) {
                continue;
            }
            for entry in Tree::load(self.store(), &tree_id)?.entries {
                match entry.kind {
                    EntryKind::Tree => pending.push(entry.object_id),
                    EntryKind::Blob => {
                        out.insert(entry.object_id);
                    }
                    EntryKind::Asset => {
                        if out.insert(entry.object_id) {
                            let asset = Asset::load(self.store(), &entry.object_id)?;
                            out.extend(asset.paths.iter().map(|p| p.object));
                        }
                    }
                }
            }
        }
        Ok(out)
    }
}
