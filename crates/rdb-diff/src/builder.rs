//! Deterministic tree construction.
//!
//! Entries may arrive in any order (directory walks, parallel hashing);
//! trees are always written sorted by name so the resulting hash depends
//! only on content.

use std::collections::BTreeMap;

use rdb_store::{ObjectStore, Tree, TreeEntry};
use rdb_types::ObjectId;
use tracing::trace;

use crate::error::{DiffError, DiffResult};

/// Sort `entries`, store them as one tree and return its ID.
///
/// Fails on duplicate names.
pub fn build_tree(store: &dyn ObjectStore, entries: Vec<TreeEntry>) -> DiffResult<ObjectId> {
    let tree = Tree::new(entries);
    if let Some(dup) = tree.entries.windows(2).find(|w| w[0].name == w[1].name) {
        return Err(DiffError::DuplicateEntry(dup[0].name.clone()));
    }
    let id = store.write(&tree.to_stored_object()?)?;
    trace!(%id, entries = tree.len(), "built tree");
    Ok(id)
}

/// ID of the tree with no entries.
pub fn empty_tree_id() -> DiffResult<ObjectId> {
    Ok(Tree::empty().to_stored_object()?.compute_id())
}

enum Node {
    Leaf(TreeEntry),
    Dir(BTreeMap<String, Node>),
}

/// Builds nested trees from slash-separated paths.
///
/// Intermediate directories are created on demand and written bottom-up,
/// children before parents.
///
/// ```ignore
/// let mut builder = TreeBuilder::new();
/// builder.insert("assets/1030002", TreeEntry::asset("", id, 5, "string", AssetId(1030002)))?;
/// let root = builder.write(&store)?;
/// ```
#[derive(Default)]
pub struct TreeBuilder {
    root: BTreeMap<String, Node>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place `entry` at `path`, renaming it to the last path component.
    pub fn insert(&mut self, path: &str, mut entry: TreeEntry) -> DiffResult<()> {
        let components: Vec<&str> = path.split('/').collect();
        if components.iter().any(|c| c.is_empty() || *c == "." || *c == "..") {
            return Err(DiffError::InvalidPath(path.to_string()));
        }
        let (leaf, dirs) = match components.split_last() {
            Some(split) => split,
            None => return Err(DiffError::InvalidPath(path.to_string())),
        };

        let mut level = &mut self.root;
        for dir in dirs {
            let node = level
                .entry((*dir).to_string())
                .or_insert_with(|| Node::Dir(BTreeMap::new()));
            level = match node {
                Node::Dir(children) => children,
                Node::Leaf(_) => return Err(DiffError::PathConflict(path.to_string())),
            };
        }
        if level.contains_key(*leaf) {
            return Err(DiffError::PathConflict(path.to_string()));
        }
        entry.name = (*leaf).to_string();
        level.insert(entry.name.clone(), Node::Leaf(entry));
        Ok(())
    }

    /// Returns `true` if nothing has been inserted.
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Write every tree to the store and return the root tree ID.
    pub fn write(self, store: &dyn ObjectStore) -> DiffResult<ObjectId> {
        write_level(store, self.root)
    }
}

fn write_level(store: &dyn ObjectStore, level: BTreeMap<String, Node>) -> DiffResult<ObjectId> {
    let mut entries = Vec::with_capacity(level.len());
    for (name, node) in level {
        match node {
            Node::Leaf(entry) => entries.push(entry),
            Node::Dir(children) => {
                let id = write_level(store, children)?;
                entries.push(TreeEntry::tree(name, id));
            }
        }
    }
    build_tree(store, entries)
}
