use std::str::FromStr;

use chrono::{DateTime, Utc};
use rdb_types::{AssetId, ObjectId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::traits::ObjectStore;

/// The kind of object stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// Raw file content.
    Blob,
    /// Directory listing: name-sorted entries referencing other objects.
    Tree,
    /// Snapshot record linking a tree to its parent commit.
    Commit,
    /// Typed, ID-keyed asset record.
    Asset,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
            Self::Asset => "asset",
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blob" => Ok(Self::Blob),
            "tree" => Ok(Self::Tree),
            "commit" => Ok(Self::Commit),
            "asset" => Ok(Self::Asset),
            other => Err(format!("unknown object kind {other:?}")),
        }
    }
}

/// A stored object: kind tag + payload + cached size.
///
/// `StoredObject` is the unit of storage. Its identity is the BLAKE3 hash of
/// the canonical framing `"<kind> <size>\0<data>"`, which is also exactly
/// what a loose object file contains on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    /// The type of this object.
    pub kind: ObjectKind,
    /// The payload bytes.
    pub data: Vec<u8>,
    /// The size of `data` in bytes.
    pub size: u64,
}

impl StoredObject {
    /// Create a new stored object from kind and data.
    pub fn new(kind: ObjectKind, data: Vec<u8>) -> Self {
        let size = data.len() as u64;
        Self { kind, data, size }
    }

    /// Serialize a structured payload as compact JSON.
    ///
    /// Struct fields serialize in declaration order and every map in the
    /// object model is a `BTreeMap`, so the encoding is deterministic.
    pub fn from_json<T: Serialize>(kind: ObjectKind, value: &T) -> StoreResult<Self> {
        let data =
            serde_json::to_vec(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(Self::new(kind, data))
    }

    /// Decode a structured payload, checking the kind tag first.
    pub fn decode_json<T: DeserializeOwned>(&self, expected: ObjectKind) -> StoreResult<T> {
        if self.kind != expected {
            return Err(StoreError::CorruptObject {
                id: self.compute_id(),
                reason: format!("expected {expected}, got {}", self.kind),
            });
        }
        serde_json::from_slice(&self.data).map_err(|e| StoreError::CorruptObject {
            id: self.compute_id(),
            reason: format!("undecodable {expected} payload: {e}"),
        })
    }

    /// The canonical header `"<kind> <size>\0"`.
    pub fn header(&self) -> Vec<u8> {
        format!("{} {}\0", self.kind, self.size).into_bytes()
    }

    /// Compute the content-addressed ID for this object.
    pub fn compute_id(&self) -> ObjectId {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.header());
        hasher.update(&self.data);
        ObjectId::from_hash(*hasher.finalize().as_bytes())
    }

    /// Encode as header + payload, the on-disk representation.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = self.header();
        out.extend_from_slice(&self.data);
        out
    }

    /// Parse the on-disk representation of the object named `id`.
    ///
    /// Fails with [`StoreError::CorruptObject`] when the header is malformed
    /// or the declared size does not match the payload length. The hash
    /// itself is verified by the caller.
    pub fn decode(id: &ObjectId, bytes: &[u8]) -> StoreResult<Self> {
        let corrupt = |reason: String| StoreError::CorruptObject { id: *id, reason };

        let nul = bytes
            .iter()
            .position(|b| *b == 0)
            .ok_or_else(|| corrupt("missing header terminator".into()))?;
        let header = std::str::from_utf8(&bytes[..nul])
            .map_err(|_| corrupt("header is not UTF-8".into()))?;
        let (kind, size) = header
            .split_once(' ')
            .ok_or_else(|| corrupt(format!("malformed header {header:?}")))?;
        let kind = ObjectKind::from_str(kind).map_err(corrupt)?;
        if size.is_empty() || !size.bytes().all(|b| b.is_ascii_digit()) {
            return Err(corrupt(format!("malformed size {size:?}")));
        }
        let size: u64 = size
            .parse()
            .map_err(|_| corrupt(format!("malformed size {size:?}")))?;

        let data = &bytes[nul + 1..];
        if data.len() as u64 != size {
            return Err(corrupt(format!(
                "declared size {size} but payload is {} bytes",
                data.len()
            )));
        }
        Ok(Self::new(kind, data.to_vec()))
    }
}

// ---------------------------------------------------------------------------
// Blob
// ---------------------------------------------------------------------------

/// Raw content object (analogous to git blob).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    pub data: Vec<u8>,
}

impl Blob {
    /// Create a new blob from raw bytes.
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// The object ID this content would be stored under.
    pub fn id_for(data: &[u8]) -> ObjectId {
        let mut hasher = blake3::Hasher::new();
        hasher.update(format!("{} {}\0", ObjectKind::Blob, data.len()).as_bytes());
        hasher.update(data);
        ObjectId::from_hash(*hasher.finalize().as_bytes())
    }

    /// Convert into a `StoredObject` for storage.
    pub fn to_stored_object(&self) -> StoredObject {
        StoredObject::new(ObjectKind::Blob, self.data.clone())
    }

    /// Decode from a `StoredObject`.
    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        if obj.kind != ObjectKind::Blob {
            return Err(StoreError::CorruptObject {
                id: obj.compute_id(),
                reason: format!("expected blob, got {}", obj.kind),
            });
        }
        Ok(Self {
            data: obj.data.clone(),
        })
    }

    /// Read a blob from the store.
    pub fn load(store: &dyn ObjectStore, id: &ObjectId) -> StoreResult<Self> {
        Self::from_stored_object(&store.get(id)?)
    }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// What a tree entry points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Opaque file content.
    Blob,
    /// A nested directory.
    Tree,
    /// A typed asset record.
    Asset,
}

impl EntryKind {
    /// The object kind the entry's hash must resolve to.
    pub fn object_kind(&self) -> ObjectKind {
        match self {
            Self::Blob => ObjectKind::Blob,
            Self::Tree => ObjectKind::Tree,
            Self::Asset => ObjectKind::Asset,
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.object_kind().as_str())
    }
}

/// A single entry in a tree object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    /// Entry name (file name, directory name, or asset ID).
    pub name: String,
    /// What the entry refers to.
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Content-addressed ID of the referenced object.
    #[serde(rename = "object")]
    pub object_id: ObjectId,
    /// Content size in bytes (sum of path sizes for assets, 0 for trees).
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<AssetId>,
}

impl TreeEntry {
    /// Create a blob entry.
    pub fn blob(name: impl Into<String>, object_id: ObjectId, size: u64) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Blob,
            object_id,
            size,
            asset_type: None,
            asset_id: None,
        }
    }

    /// Create a subtree entry.
    pub fn tree(name: impl Into<String>, object_id: ObjectId) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Tree,
            object_id,
            size: 0,
            asset_type: None,
            asset_id: None,
        }
    }

    /// Create an asset entry.
    pub fn asset(
        name: impl Into<String>,
        object_id: ObjectId,
        size: u64,
        asset_type: impl Into<String>,
        asset_id: AssetId,
    ) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Asset,
            object_id,
            size,
            asset_type: Some(asset_type.into()),
            asset_id: Some(asset_id),
        }
    }
}

/// Directory listing object (analogous to git tree).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    /// Entries sorted by name byte order.
    pub entries: Vec<TreeEntry>,
}

impl Tree {
    /// Create a new tree with the given entries.
    ///
    /// Entries are sorted by name for deterministic hashing, whatever order
    /// the filesystem enumerated them in.
    pub fn new(mut entries: Vec<TreeEntry>) -> Self {
        entries.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));
        Self { entries }
    }

    /// Create an empty tree.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Convert into a `StoredObject` for storage.
    pub fn to_stored_object(&self) -> StoreResult<StoredObject> {
        StoredObject::from_json(ObjectKind::Tree, self)
    }

    /// Decode from a `StoredObject`.
    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        obj.decode_json(ObjectKind::Tree)
    }

    /// Read a tree from the store.
    pub fn load(store: &dyn ObjectStore, id: &ObjectId) -> StoreResult<Self> {
        Self::from_stored_object(&store.get(id)?)
    }

    /// Look up an entry by name.
    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries
            .binary_search_by(|e| e.name.as_bytes().cmp(name.as_bytes()))
            .ok()
            .map(|i| &self.entries[i])
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the tree has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

/// Immutable snapshot record.
///
/// A commit's ID is the hash of its stored payload, so it is not a field
/// here: readers receive it alongside the decoded record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub author: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    /// Branch the commit was created on.
    pub branch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ObjectId>,
    /// Root tree of the snapshot.
    pub tree: ObjectId,
}

impl Commit {
    /// Convert into a `StoredObject` for storage.
    pub fn to_stored_object(&self) -> StoreResult<StoredObject> {
        StoredObject::from_json(ObjectKind::Commit, self)
    }

    /// Decode from a `StoredObject`.
    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        obj.decode_json(ObjectKind::Commit)
    }

    /// Read a commit from the store.
    pub fn load(store: &dyn ObjectStore, id: &ObjectId) -> StoreResult<Self> {
        Self::from_stored_object(&store.get(id)?)
    }
}
