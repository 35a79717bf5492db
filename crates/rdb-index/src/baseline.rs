//! The committed state the working tree is compared against.

use std::collections::BTreeMap;

use rdb_asset::Asset;
use rdb_store::{Commit, EntryKind, ObjectStore, Tree};
use rdb_types::{AssetId, ObjectId};
use tracing::warn;

use crate::error::IndexResult;

/// The commit HEAD resolves to and its root tree. Both `None` on an unborn
/// branch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Baseline {
    pub commit: Option<ObjectId>,
    pub tree: Option<ObjectId>,
}

impl Baseline {
    /// No commits yet.
    pub fn unborn() -> Self {
        Self::default()
    }

    /// Baseline at `commit`, reading its tree ID from the store.
    pub fn at_commit(store: &dyn ObjectStore, commit: &ObjectId) -> IndexResult<Self> {
        let c = Commit::load(store, commit)?;
        Ok(Self {
            commit: Some(*commit),
            tree: Some(c.tree),
        })
    }

    /// Baseline for an optional HEAD.
    pub fn resolve(store: &dyn ObjectStore, head: Option<&ObjectId>) -> IndexResult<Self> {
        match head {
            Some(id) => Self::at_commit(store, id),
            None => Ok(Self::unborn()),
        }
    }
}

/// Load every asset record under `asset_root` in the tree `root`.
///
/// A missing `asset_root` subtree yields an empty map. Entries under the
/// root that are not asset entries are ignored with a warning.
pub fn committed_assets(
    store: &dyn ObjectStore,
    root: Option<&ObjectId>,
    asset_root: &str,
) -> IndexResult<BTreeMap<AssetId, Asset>> {
    let mut assets = BTreeMap::new();
    let Some(root) = root else {
        return Ok(assets);
    };

    let mut tree = Tree::load(store, root)?;
    for component in asset_root.split('/') {
        let next = match tree.get(component) {
            Some(entry) if entry.kind == EntryKind::Tree => entry.object_id,
            _ => return Ok(assets),
        };
        tree = Tree::load(store, &next)?;
    }

    for entry in &tree.entries {
        if entry.kind != EntryKind::Asset {
            warn!(name = %entry.name, kind = %entry.kind, "ignoring non-asset entry under asset root");
            continue;
        }
        let asset = Asset::load(store, &entry.object_id)?;
        assets.insert(asset.id, asset);
    }
    Ok(assets)
}
