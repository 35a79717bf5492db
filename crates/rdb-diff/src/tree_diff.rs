//! Tree-level diff: compare two trees and produce a list of changes.
//!
//! A lock-step merge-join over the name-sorted entries of both trees.
//! Entries whose hashes match are skipped without being read, so comparing
//! a tree with itself costs nothing and comparing two commits costs reads
//! proportional to what changed. Asset entries are expanded into per-file
//! changes by joining the two assets' path lists the same way.

use std::cmp::Ordering;

use rdb_asset::{Asset, PathEntry, META_FILE};
use rdb_store::{EntryKind, ObjectStore, Tree, TreeEntry};
use rdb_types::ObjectId;
use serde::Serialize;
use tracing::trace;

use crate::error::DiffResult;

/// The result of comparing two trees.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TreeDiff {
    /// Changes ordered by path.
    pub changes: Vec<TreeChange>,
}

impl TreeDiff {
    /// Create an empty tree diff.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if there are no changes.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of changes.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Look up the change recorded for `path`.
    pub fn get(&self, path: &str) -> Option<&TreeChange> {
        self.changes.iter().find(|c| c.path == path)
    }
}

/// How a path differs between the two trees.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
    /// The entry kind or the asset type changed.
    TypeChanged,
}

impl ChangeKind {
    /// Single-letter status code.
    pub fn code(&self) -> char {
        match self {
            Self::Added => 'A',
            Self::Removed => 'D',
            Self::Modified => 'M',
            Self::TypeChanged => 'T',
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Modified => "modified",
            Self::TypeChanged => "type changed",
        })
    }
}

/// A single change between two trees.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TreeChange {
    /// Slash-separated path from the root tree.
    pub path: String,
    pub kind: ChangeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_id: Option<ObjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_id: Option<ObjectId>,
}

impl TreeChange {
    fn added(path: String, id: ObjectId) -> Self {
        Self {
            path,
            kind: ChangeKind::Added,
            old_id: None,
            new_id: Some(id),
        }
    }

    fn removed(path: String, id: ObjectId) -> Self {
        Self {
            path,
            kind: ChangeKind::Removed,
            old_id: Some(id),
            new_id: None,
        }
    }

    fn changed(path: String, kind: ChangeKind, old: ObjectId, new: ObjectId) -> Self {
        Self {
            path,
            kind,
            old_id: Some(old),
            new_id: Some(new),
        }
    }
}

/// Compare two trees and produce a diff.
///
/// `None` on either side stands for the empty tree, so `diff_trees(store,
/// None, Some(&root))` lists every file of a first commit as added.
pub fn diff_trees(
    store: &dyn ObjectStore,
    old_tree: Option<&ObjectId>,
    new_tree: Option<&ObjectId>,
) -> DiffResult<TreeDiff> {
    let mut diff = TreeDiff::new();
    diff_tree_ids(store, "", old_tree.copied(), new_tree.copied(), &mut diff.changes)?;
    trace!(changes = diff.len(), "diffed trees");
    Ok(diff)
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

fn load_or_empty(store: &dyn ObjectStore, id: Option<ObjectId>) -> DiffResult<Tree> {
    match id {
        Some(id) => Ok(Tree::load(store, &id)?),
        None => Ok(Tree::empty()),
    }
}

fn diff_tree_ids(
    store: &dyn ObjectStore,
    prefix: &str,
    old: Option<ObjectId>,
    new: Option<ObjectId>,
    out: &mut Vec<TreeChange>,
) -> DiffResult<()> {
    if old == new {
        return Ok(());
    }
    let old = load_or_empty(store, old)?;
    let new = load_or_empty(store, new)?;

    let (mut i, mut j) = (0, 0);
    while i < old.entries.len() || j < new.entries.len() {
        let order = match (old.entries.get(i), new.entries.get(j)) {
            (Some(a), Some(b)) => a.name.as_bytes().cmp(b.name.as_bytes()),
            (Some(_), None) => Ordering::Less,
            (None, _) => Ordering::Greater,
        };
        match order {
            Ordering::Less => {
                emit_one_side(store, prefix, &old.entries[i], ChangeKind::Removed, out)?;
                i += 1;
            }
            Ordering::Greater => {
                emit_one_side(store, prefix, &new.entries[j], ChangeKind::Added, out)?;
                j += 1;
            }
            Ordering::Equal => {
                diff_entries(store, prefix, &old.entries[i], &new.entries[j], out)?;
                i += 1;
                j += 1;
            }
        }
    }
    Ok(())
}

/// Report everything under an entry present on one side only.
fn emit_one_side(
    store: &dyn ObjectStore,
    prefix: &str,
    entry: &TreeEntry,
    kind: ChangeKind,
    out: &mut Vec<TreeChange>,
) -> DiffResult<()> {
    let path = join(prefix, &entry.name);
    let make = |path: String, id: ObjectId| match kind {
        ChangeKind::Added => TreeChange::added(path, id),
        _ => TreeChange::removed(path, id),
    };
    match entry.kind {
        EntryKind::Blob => out.push(make(path, entry.object_id)),
        EntryKind::Tree => {
            let (old, new) = match kind {
                ChangeKind::Added => (None, Some(entry.object_id)),
                _ => (Some(entry.object_id), None),
            };
            diff_tree_ids(store, &path, old, new, out)?;
        }
        EntryKind::Asset => {
            let asset = Asset::load(store, &entry.object_id)?;
            for file in &asset.paths {
                out.push(make(join(&path, &file.logical), file.object));
            }
        }
    }
    Ok(())
}

fn diff_entries(
    store: &dyn ObjectStore,
    prefix: &str,
    old: &TreeEntry,
    new: &TreeEntry,
    out: &mut Vec<TreeChange>,
) -> DiffResult<()> {
    if old.kind == new.kind && old.object_id == new.object_id {
        return Ok(());
    }
    let path = join(prefix, &new.name);
    if old.kind != new.kind {
        out.push(TreeChange::changed(
            path,
            ChangeKind::TypeChanged,
            old.object_id,
            new.object_id,
        ));
        return Ok(());
    }
    match new.kind {
        EntryKind::Blob => out.push(TreeChange::changed(
            path,
            ChangeKind::Modified,
            old.object_id,
            new.object_id,
        )),
        EntryKind::Tree => {
            diff_tree_ids(store, &path, Some(old.object_id), Some(new.object_id), out)?
        }
        EntryKind::Asset => {
            if old.asset_type != new.asset_type {
                out.push(TreeChange::changed(
                    path,
                    ChangeKind::TypeChanged,
                    old.object_id,
                    new.object_id,
                ));
                return Ok(());
            }
            let old_asset = Asset::load(store, &old.object_id)?;
            let new_asset = Asset::load(store, &new.object_id)?;
            diff_assets(&path, old, new, &old_asset, &new_asset, out);
        }
    }
    Ok(())
}

fn diff_assets(
    path: &str,
    old_entry: &TreeEntry,
    new_entry: &TreeEntry,
    old: &Asset,
    new: &Asset,
    out: &mut Vec<TreeChange>,
) {
    let mut changes = Vec::new();
    diff_paths(path, &old.paths, &new.paths, &mut changes);

    if metadata_differs(old, new) {
        changes.push(TreeChange::changed(
            join(path, META_FILE),
            ChangeKind::Modified,
            old_entry.object_id,
            new_entry.object_id,
        ));
        changes.sort_by(|a, b| a.path.as_bytes().cmp(b.path.as_bytes()));
    }
    out.extend(changes);
}

fn diff_paths(prefix: &str, old: &[PathEntry], new: &[PathEntry], out: &mut Vec<TreeChange>) {
    let (mut i, mut j) = (0, 0);
    while i < old.len() || j < new.len() {
        let order = match (old.get(i), new.get(j)) {
            (Some(a), Some(b)) => a.logical.as_bytes().cmp(b.logical.as_bytes()),
            (Some(_), None) => Ordering::Less,
            (None, _) => Ordering::Greater,
        };
        match order {
            Ordering::Less => {
                out.push(TreeChange::removed(join(prefix, &old[i].logical), old[i].object));
                i += 1;
            }
            Ordering::Greater => {
                out.push(TreeChange::added(join(prefix, &new[j].logical), new[j].object));
                j += 1;
            }
            Ordering::Equal => {
                if old[i].object != new[j].object {
                    out.push(TreeChange::changed(
                        join(prefix, &new[j].logical),
                        ChangeKind::Modified,
                        old[i].object,
                        new[j].object,
                    ));
                }
                i += 1;
                j += 1;
            }
        }
    }
}

/// Everything the `meta` file carries, ignoring the file list.
fn metadata_differs(old: &Asset, new: &Asset) -> bool {
    old.name != new.name
        || old.tags != new.tags
        || old.version != new.version
        || old.attributes != new.attributes
        || old.dependencies != new.dependencies
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{build_tree, TreeBuilder};
    use rdb_store::{Blob, InMemoryObjectStore, StoreResult, StoredObject};
    use rdb_types::AssetId;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    /// Store wrapper that counts reads.
    #[derive(Default)]
    struct CountingStore {
        inner: InMemoryObjectStore,
        reads: AtomicUsize,
    }

    impl CountingStore {
        fn reads(&self) -> usize {
            self.reads.load(AtomicOrdering::SeqCst)
        }

        fn reset(&self) {
            self.reads.store(0, AtomicOrdering::SeqCst);
        }
    }

    impl ObjectStore for CountingStore {
        fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>> {
            self.reads.fetch_add(1, AtomicOrdering::SeqCst);
            self.inner.read(id)
        }

        fn write(&self, object: &StoredObject) -> StoreResult<ObjectId> {
            self.inner.write(object)
        }

        fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
            self.inner.exists(id)
        }
    }

    fn blob(store: &dyn ObjectStore, content: &[u8]) -> ObjectId {
        store.write(&Blob::new(content.to_vec()).to_stored_object()).unwrap()
    }

    /// Build `assets/<id>` entries from `(id, type, [(logical, content)])`.
    fn commit_tree(store: &dyn ObjectStore, assets: &[(u64, &str, &[(&str, &[u8])])]) -> ObjectId {
        let mut builder = TreeBuilder::new();
        for (id, ty, files) in assets {
            let mut asset = Asset::with_type(AssetId(*id), *ty);
            asset.set_paths(
                files
                    .iter()
                    .map(|(name, content)| {
                        PathEntry::new(*name, blob(store, content), content.len() as u64)
                    })
                    .collect(),
            );
            let obj = asset.store(store).unwrap();
            builder
                .insert(
                    &format!("assets/{id}"),
                    TreeEntry::asset("", obj, asset.total_size(), *ty, AssetId(*id)),
                )
                .unwrap();
        }
        builder.write(store).unwrap()
    }

    fn summary(diff: &TreeDiff) -> Vec<(String, ChangeKind)> {
        diff.changes.iter().map(|c| (c.path.clone(), c.kind)).collect()
    }

    #[test]
    fn identical_trees_cost_zero_reads() {
        let store = CountingStore::default();
        let tree = commit_tree(&store, &[(1030002, "string", &[("en.txt", b"Hello")])]);
        store.reset();

        let diff = diff_trees(&store, Some(&tree), Some(&tree)).unwrap();
        assert!(diff.is_empty());
        assert_eq!(store.reads(), 0);
    }

    #[test]
    fn unchanged_assets_are_not_read() {
        const SAME: &[(&str, &[u8])] = &[("a.txt", b"same")];
        const DIFFERENT: &[(&str, &[u8])] = &[("a.txt", b"different")];

        let store = CountingStore::default();
        let big: Vec<(u64, &str, &[(&str, &[u8])])> =
            (1..=50).map(|i| (i, "text", SAME)).collect();
        let old = commit_tree(&store, &big);
        let mut changed = big.clone();
        changed[10] = (11, "text", DIFFERENT);
        let new = commit_tree(&store, &changed);
        store.reset();

        let diff = diff_trees(&store, Some(&old), Some(&new)).unwrap();
        assert_eq!(summary(&diff), [("assets/11/a.txt".to_string(), ChangeKind::Modified)]);
        // two roots, two `assets` subtrees, two versions of asset 11
        assert_eq!(store.reads(), 6);
    }

    #[test]
    fn first_commit_lists_all_files_as_added() {
        let store = InMemoryObjectStore::new();
        let tree = commit_tree(
            &store,
            &[(1030002, "string", &[("en.txt", b"Hello"), ("de.txt", b"Hallo")])],
        );
        let diff = diff_trees(&store, None, Some(&tree)).unwrap();
        assert_eq!(
            summary(&diff),
            [
                ("assets/1030002/de.txt".to_string(), ChangeKind::Added),
                ("assets/1030002/en.txt".to_string(), ChangeKind::Added),
            ]
        );
    }

    #[test]
    fn file_level_changes_inside_asset() {
        let store = InMemoryObjectStore::new();
        let old = commit_tree(
            &store,
            &[(7, "text", &[("keep", b"k"), ("edit", b"1"), ("drop", b"d")])],
        );
        let new = commit_tree(
            &store,
            &[(7, "text", &[("keep", b"k"), ("edit", b"2"), ("new", b"n")])],
        );
        let diff = diff_trees(&store, Some(&old), Some(&new)).unwrap();
        assert_eq!(
            summary(&diff),
            [
                ("assets/7/drop".to_string(), ChangeKind::Removed),
                ("assets/7/edit".to_string(), ChangeKind::Modified),
                ("assets/7/new".to_string(), ChangeKind::Added),
            ]
        );
        let edit = diff.get("assets/7/edit").unwrap();
        assert_eq!(edit.old_id, Some(Blob::id_for(b"1")));
        assert_eq!(edit.new_id, Some(Blob::id_for(b"2")));
    }

    #[test]
    fn removed_asset_expands_to_files() {
        let store = InMemoryObjectStore::new();
        let old = commit_tree(&store, &[(1, "text", &[("a", b"a")]), (2, "text", &[("b", b"b")])]);
        let new = commit_tree(&store, &[(1, "text", &[("a", b"a")])]);
        let diff = diff_trees(&store, Some(&old), Some(&new)).unwrap();
        assert_eq!(summary(&diff), [("assets/2/b".to_string(), ChangeKind::Removed)]);
    }

    #[test]
    fn asset_type_change_is_type_changed() {
        let store = InMemoryObjectStore::new();
        let old = commit_tree(&store, &[(9, "text", &[("a", b"a")])]);
        let new = commit_tree(&store, &[(9, "string", &[("a", b"a")])]);
        let diff = diff_trees(&store, Some(&old), Some(&new)).unwrap();
        assert_eq!(summary(&diff), [("assets/9".to_string(), ChangeKind::TypeChanged)]);
    }

    #[test]
    fn entry_kind_change_is_type_changed() {
        let store = InMemoryObjectStore::new();
        let file = blob(&store, b"x");
        let sub = build_tree(&store, vec![TreeEntry::blob("inner", file, 1)]).unwrap();
        let old = build_tree(&store, vec![TreeEntry::blob("thing", file, 1)]).unwrap();
        let new = build_tree(&store, vec![TreeEntry::tree("thing", sub)]).unwrap();
        let diff = diff_trees(&store, Some(&old), Some(&new)).unwrap();
        assert_eq!(summary(&diff), [("thing".to_string(), ChangeKind::TypeChanged)]);
    }

    #[test]
    fn metadata_only_change_reports_meta() {
        let store = InMemoryObjectStore::new();
        let content = blob(&store, b"Hello");
        let mut trees = Vec::new();
        for name in ["Intro", "Outro"] {
            let mut asset = Asset::with_type(AssetId(5), "string");
            asset.name = Some(name.to_string());
            asset.set_paths(vec![PathEntry::new("en.txt", content, 5)]);
            let obj = asset.store(&store).unwrap();
            let mut builder = TreeBuilder::new();
            builder
                .insert("assets/5", TreeEntry::asset("", obj, 5, "string", AssetId(5)))
                .unwrap();
            trees.push(builder.write(&store).unwrap());
        }
        let diff = diff_trees(&store, Some(&trees[0]), Some(&trees[1])).unwrap();
        assert_eq!(summary(&diff), [("assets/5/meta".to_string(), ChangeKind::Modified)]);
    }

    #[test]
    fn output_is_path_ordered() {
        let store = InMemoryObjectStore::new();
        let old = commit_tree(&store, &[(2, "text", &[("x", b"1")])]);
        let new = commit_tree(
            &store,
            &[(1, "text", &[("a", b"a")]), (2, "text", &[("x", b"2")]), (3, "text", &[("z", b"z")])],
        );
        let diff = diff_trees(&store, Some(&old), Some(&new)).unwrap();
        let paths: Vec<_> = diff.changes.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, ["assets/1/a", "assets/2/x", "assets/3/z"]);
    }

    #[test]
    fn missing_tree_is_an_error() {
        let store = InMemoryObjectStore::new();
        let ghost = ObjectId::from_bytes(b"ghost");
        let err = diff_trees(&store, None, Some(&ghost)).unwrap_err();
        assert!(matches!(err, crate::DiffError::Store(e) if e.is_not_found()));
    }
}
