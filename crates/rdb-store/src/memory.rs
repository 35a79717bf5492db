use std::collections::BTreeMap;
use std::sync::RwLock;

use rdb_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::StoredObject;
use crate::traits::ObjectStore;

/// Object store held entirely in memory.
///
/// Used by the tree builder and diff tests, and by callers that want to
/// build trees without touching disk. Reads are verified like on-disk reads.
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<BTreeMap<ObjectId, StoredObject>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Stored IDs in ascending order.
    pub fn ids(&self) -> Vec<ObjectId> {
        self.objects
            .read()
            .expect("lock poisoned")
            .keys()
            .copied()
            .collect()
    }

    /// Replace the payload under `id` without rehashing.
    #[cfg(test)]
    pub(crate) fn tamper(&self, id: &ObjectId, data: Vec<u8>) {
        let mut map = self.objects.write().expect("lock poisoned");
        if let Some(obj) = map.get_mut(id) {
            obj.size = data.len() as u64;
            obj.data = data;
        }
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>> {
        let map = self.objects.read().expect("lock poisoned");
        let Some(obj) = map.get(id) else {
            return Ok(None);
        };
        let computed = obj.compute_id();
        if computed != *id {
            return Err(StoreError::HashMismatch { id: *id, computed });
        }
        Ok(Some(obj.clone()))
    }

    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId> {
        let id = object.compute_id();
        self.objects
            .write()
            .expect("lock poisoned")
            .entry(id)
            .or_insert_with(|| object.clone());
        Ok(id)
    }

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.objects.read().expect("lock poisoned").contains_key(id))
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryObjectStore")
            .field("objects", &self.len())
            .finish()
    }
}
