use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use rdb_types::ObjectId;
use tempfile::NamedTempFile;
use tracing::{debug, trace, warn};

use crate::error::{StoreError, StoreResult};
use crate::object::StoredObject;
use crate::traits::ObjectStore;

/// Loose-object store on the local filesystem.
///
/// Objects live at `<root>/<first 2 hex>/<remaining 62 hex>` and contain the
/// framed encoding `"<kind> <len>\0<payload>"`. A write goes to a temporary
/// file in the destination shard and is renamed into place, so a crash never
/// leaves a partially written object under a valid name.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Open (creating if needed) an object directory.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The object directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the loose file for `id`.
    pub fn object_path(&self, id: &ObjectId) -> PathBuf {
        let (dir, file) = id.shard();
        self.root.join(dir).join(file)
    }
}

impl ObjectStore for FsObjectStore {
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>> {
        let path = self.object_path(id);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let object = StoredObject::decode(id, &bytes)?;
        let computed = object.compute_id();
        if computed != *id {
            warn!(%id, %computed, path = %path.display(), "object failed hash verification");
            return Err(StoreError::HashMismatch { id: *id, computed });
        }
        trace!(%id, kind = %object.kind, size = object.size, "read object");
        Ok(Some(object))
    }

    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId> {
        let id = object.compute_id();
        let path = self.object_path(&id);
        if path.exists() {
            trace!(%id, "object already present");
            return Ok(id);
        }

        let shard = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        fs::create_dir_all(&shard)?;

        let mut tmp = NamedTempFile::new_in(&shard)?;
        tmp.write_all(&object.encode())?;
        tmp.as_file().sync_all()?;
        if let Err(e) = tmp.persist(&path) {
            // Another writer may have landed the same object first.
            if path.exists() {
                return Ok(id);
            }
            return Err(e.error.into());
        }
        debug!(%id, kind = %object.kind, size = object.size, "wrote object");
        Ok(id)
    }

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.object_path(id).is_file())
    }
}
