use std::collections::{BTreeMap, BTreeSet};

use rdb_store::{ObjectKind, ObjectStore, StoredObject};
use rdb_types::{AssetId, ObjectId};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{AssetError, AssetResult};
use crate::meta::AssetMeta;
use crate::types::resolve_type;

/// Weak reference to another asset by `(type, id)`.
///
/// The target is not required to exist.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Dependency {
    #[serde(rename = "type")]
    pub asset_type: String,
    pub id: AssetId,
}

/// One file belonging to an asset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathEntry {
    /// Path relative to the asset directory, `/`-separated.
    pub logical: String,
    /// Blob holding the file content.
    pub object: ObjectId,
    pub size: u64,
}

impl PathEntry {
    pub fn new(logical: impl Into<String>, object: ObjectId, size: u64) -> Self {
        Self {
            logical: logical.into(),
            object,
            size,
        }
    }
}

/// A typed, ID-keyed asset record.
///
/// Stored as an `asset` object and referenced from the commit tree by an
/// entry named after the decimal ID.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    #[serde(rename = "type")]
    pub asset_type: String,
    pub id: AssetId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub version: u32,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,
    /// Files, sorted by logical path.
    #[serde(default)]
    pub paths: Vec<PathEntry>,
    #[serde(default)]
    pub etag: String,
}

impl Asset {
    /// A bare asset whose type is resolved from the built-in table.
    pub fn new(id: AssetId) -> Self {
        Self::with_type(id, resolve_type(id))
    }

    pub fn with_type(id: AssetId, asset_type: impl Into<String>) -> Self {
        Self {
            asset_type: asset_type.into(),
            id,
            name: None,
            tags: Vec::new(),
            version: 0,
            attributes: BTreeMap::new(),
            dependencies: Vec::new(),
            paths: Vec::new(),
            etag: String::new(),
        }
    }

    /// Build an asset from its `meta` file, falling back to the inferred
    /// type when the file leaves it empty.
    pub fn from_meta(id: AssetId, meta: &AssetMeta) -> Self {
        let asset_type = meta
            .asset_type
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| resolve_type(id).to_string());
        Self {
            asset_type,
            id,
            name: meta.name.clone(),
            tags: meta.tags.clone(),
            version: meta.version,
            attributes: meta.attributes.clone(),
            dependencies: meta.dependencies.clone(),
            paths: Vec::new(),
            etag: String::new(),
        }
    }

    /// Replace the file list, sort it and recompute the etag.
    pub fn set_paths(&mut self, mut paths: Vec<PathEntry>) {
        paths.sort_by(|a, b| a.logical.as_bytes().cmp(b.logical.as_bytes()));
        self.paths = paths;
        self.etag = compute_etag(self);
    }

    /// Sum of all file sizes.
    pub fn total_size(&self) -> u64 {
        self.paths.iter().map(|p| p.size).sum()
    }

    /// Look up a file by logical path.
    pub fn path(&self, logical: &str) -> Option<&PathEntry> {
        self.paths.iter().find(|p| p.logical == logical)
    }

    pub fn to_stored_object(&self) -> AssetResult<StoredObject> {
        Ok(StoredObject::from_json(ObjectKind::Asset, self)?)
    }

    pub fn from_stored_object(obj: &StoredObject) -> AssetResult<Self> {
        Ok(obj.decode_json::<Self>(ObjectKind::Asset)?)
    }

    /// Read an asset record from the store.
    pub fn load(store: &dyn ObjectStore, id: &ObjectId) -> AssetResult<Self> {
        let obj = store.get(id)?;
        Self::from_stored_object(&obj)
    }

    /// Write the record to the store and return its object ID.
    pub fn store(&self, store: &dyn ObjectStore) -> AssetResult<ObjectId> {
        Ok(store.write(&self.to_stored_object()?)?)
    }
}

/// Fingerprint of an asset's content and attributes.
///
/// BLAKE3 over the canonical JSON of the paths (sorted by logical path) and
/// the attribute map. Two assets with equal etags have identical files.
pub fn compute_etag(asset: &Asset) -> String {
    let mut paths: Vec<&PathEntry> = asset.paths.iter().collect();
    paths.sort_by(|a, b| a.logical.as_bytes().cmp(b.logical.as_bytes()));
    let paths: Vec<Value> = paths
        .into_iter()
        .map(|p| json!({ "logical": p.logical, "object": p.object.to_hex(), "size": p.size }))
        .collect();
    let attributes: serde_json::Map<String, Value> = asset
        .attributes
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let canonical = json!({ "attributes": attributes, "paths": paths }).to_string();
    blake3::hash(canonical.as_bytes()).to_hex().to_string()
}

/// Check an asset before it is committed.
///
/// Unresolvable dependencies are allowed; duplicate ones are not. Every
/// referenced blob must already be in `store`.
pub fn validate(asset: &Asset, store: &dyn ObjectStore) -> AssetResult<()> {
    if !asset.id.is_valid() {
        return Err(AssetError::validation(asset.id, "asset id must be positive"));
    }
    if asset.asset_type.trim().is_empty() {
        return Err(AssetError::validation(asset.id, "asset type is empty"));
    }

    let mut seen_paths = BTreeSet::new();
    for path in &asset.paths {
        if path.logical.is_empty() {
            return Err(AssetError::validation(asset.id, "empty logical path"));
        }
        if !seen_paths.insert(path.logical.as_str()) {
            return Err(AssetError::validation(
                asset.id,
                format!("duplicate logical path {:?}", path.logical),
            ));
        }
        if !store.exists(&path.object)? {
            return Err(AssetError::validation(
                asset.id,
                format!("{} references missing object {}", path.logical, path.object),
            ));
        }
    }

    let mut seen_deps = BTreeSet::new();
    for dep in &asset.dependencies {
        if !seen_deps.insert((dep.asset_type.as_str(), dep.id)) {
            return Err(AssetError::validation(
                asset.id,
                format!("duplicate dependency {}:{}", dep.asset_type, dep.id),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdb_store::InMemoryObjectStore;

    fn stored_asset(store: &InMemoryObjectStore) -> Asset {
        let id = store.put(ObjectKind::Blob, b"Hello".to_vec()).unwrap();
        let mut asset = Asset::new(AssetId(1030002));
        asset.set_paths(vec![PathEntry::new("en.txt", id, 5)]);
        asset
    }

    #[test]
    fn new_resolves_type_from_table() {
        assert_eq!(Asset::new(AssetId(1030002)).asset_type, "string");
        assert_eq!(Asset::new(AssetId(7)).asset_type, "unknown");
    }

    #[test]
    fn etag_ignores_path_order() {
        let a = ObjectId::from_bytes(b"a");
        let b = ObjectId::from_bytes(b"b");
        let mut one = Asset::new(AssetId(1));
        one.paths = vec![PathEntry::new("a", a, 1), PathEntry::new("b", b, 1)];
        let mut two = Asset::new(AssetId(1));
        two.paths = vec![PathEntry::new("b", b, 1), PathEntry::new("a", a, 1)];
        assert_eq!(compute_etag(&one), compute_etag(&two));
    }

    #[test]
    fn etag_tracks_content_and_attributes() {
        let mut asset = Asset::new(AssetId(1));
        asset.set_paths(vec![PathEntry::new("x", ObjectId::from_bytes(b"1"), 1)]);
        let base = asset.etag.clone();

        asset.set_paths(vec![PathEntry::new("x", ObjectId::from_bytes(b"2"), 1)]);
        assert_ne!(asset.etag, base);

        let content_only = asset.etag.clone();
        asset.attributes.insert("lang".into(), json!("en"));
        assert_ne!(compute_etag(&asset), content_only);
    }

    #[test]
    fn etag_ignores_name_and_tags() {
        let mut asset = Asset::new(AssetId(1));
        let before = compute_etag(&asset);
        asset.name = Some("renamed".into());
        asset.tags.push("ui".into());
        assert_eq!(compute_etag(&asset), before);
    }

    #[test]
    fn set_paths_sorts_by_logical_path() {
        let id = ObjectId::from_bytes(b"x");
        let mut asset = Asset::new(AssetId(1));
        asset.set_paths(vec![
            PathEntry::new("z.txt", id, 1),
            PathEntry::new("a/b.txt", id, 2),
        ]);
        assert_eq!(asset.paths[0].logical, "a/b.txt");
        assert_eq!(asset.total_size(), 3);
    }

    #[test]
    fn valid_asset_passes() {
        let store = InMemoryObjectStore::new();
        let asset = stored_asset(&store);
        validate(&asset, &store).unwrap();
    }

    #[test]
    fn zero_id_is_rejected() {
        let store = InMemoryObjectStore::new();
        let mut asset = stored_asset(&store);
        asset.id = AssetId(0);
        assert!(validate(&asset, &store).unwrap_err().is_validation());
    }

    #[test]
    fn empty_type_is_rejected() {
        let store = InMemoryObjectStore::new();
        let mut asset = stored_asset(&store);
        asset.asset_type = "  ".into();
        assert!(validate(&asset, &store).unwrap_err().is_validation());
    }

    #[test]
    fn dangling_path_is_rejected() {
        let store = InMemoryObjectStore::new();
        let mut asset = stored_asset(&store);
        asset.paths.push(PathEntry::new("gone.txt", ObjectId::from_bytes(b"nope"), 1));
        let err = validate(&asset, &store).unwrap_err();
        assert!(err.to_string().contains("missing object"));
    }

    #[test]
    fn duplicate_dependencies_are_rejected() {
        let store = InMemoryObjectStore::new();
        let mut asset = stored_asset(&store);
        let dep = Dependency {
            asset_type: "image".into(),
            id: AssetId(1000636),
        };
        asset.dependencies = vec![dep.clone(), dep];
        assert!(validate(&asset, &store).unwrap_err().is_validation());
    }

    #[test]
    fn unresolvable_dependency_is_allowed() {
        let store = InMemoryObjectStore::new();
        let mut asset = stored_asset(&store);
        asset.dependencies = vec![Dependency {
            asset_type: "texture".into(),
            id: AssetId(999_999_999),
        }];
        validate(&asset, &store).unwrap();
    }

    #[test]
    fn store_and_load() {
        let store = InMemoryObjectStore::new();
        let mut asset = stored_asset(&store);
        asset.attributes.insert("b".into(), json!(2));
        asset.attributes.insert("a".into(), json!(1));
        let id = asset.store(&store).unwrap();
        assert_eq!(Asset::load(&store, &id).unwrap(), asset);
    }

    #[test]
    fn encoding_is_deterministic() {
        let store = InMemoryObjectStore::new();
        let mut one = stored_asset(&store);
        one.attributes.insert("b".into(), json!(2));
        one.attributes.insert("a".into(), json!(1));
        let mut two = stored_asset(&store);
        two.attributes.insert("a".into(), json!(1));
        two.attributes.insert("b".into(), json!(2));
        assert_eq!(
            one.to_stored_object().unwrap().compute_id(),
            two.to_stored_object().unwrap().compute_id()
        );
    }

    #[test]
    fn loading_a_blob_as_asset_is_corrupt() {
        let store = InMemoryObjectStore::new();
        let id = store.put(ObjectKind::Blob, b"{}".to_vec()).unwrap();
        let err = Asset::load(&store, &id).unwrap_err();
        assert!(matches!(err, AssetError::Store(e) if e.is_integrity()));
    }
}
