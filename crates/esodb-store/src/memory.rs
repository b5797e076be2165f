use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use esodb_types::{ObjectId, ObjectType, OID_LEN};
use tracing::warn;

use crate::error::{StoreError, StoreResult};
use crate::record::{ObjectHeader, ObjectRecord};
use crate::traits::{validate_prefix_len, ObjectStoreBackend};

/// In-memory, HashMap-based object store.
///
/// Intended for tests and embedding. All objects are held in memory behind a
/// `RwLock` for safe concurrent access. Objects are cloned on read/write.
/// Prefix lookups scan every key.
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<ObjectId, ObjectRecord>>,
}

impl InMemoryObjectStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStoreBackend for InMemoryObjectStore {
    async fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.contains_key(id))
    }

    async fn read_header(&self, id: &ObjectId) -> StoreResult<ObjectHeader> {
        let map = self.objects.read().expect("lock poisoned");
        map.get(id)
            .map(ObjectRecord::header)
            .ok_or(StoreError::NotFound(*id))
    }

    async fn read(&self, id: &ObjectId) -> StoreResult<ObjectRecord> {
        let map = self.objects.read().expect("lock poisoned");
        map.get(id).cloned().ok_or(StoreError::NotFound(*id))
    }

    async fn read_prefix(&self, short_id: &ObjectId, len: usize) -> StoreResult<ObjectRecord> {
        validate_prefix_len(len)?;
        if len == OID_LEN {
            return self.read(short_id).await;
        }
        let map = self.objects.read().expect("lock poisoned");
        let mut matches = map.values().filter(|rec| rec.id.shares_prefix(short_id, len));
        let first = matches
            .next()
            .ok_or_else(|| StoreError::PrefixNotFound(short_id.hex_prefix(len)))?;
        let extra = matches.count() as u64;
        if extra > 0 {
            return Err(StoreError::Ambiguous {
                prefix: short_id.hex_prefix(len),
                matches: extra + 1,
            });
        }
        Ok(first.clone())
    }

    async fn write(&self, id: &ObjectId, data: &[u8], kind: ObjectType) -> StoreResult<()> {
        let mut map = self.objects.write().expect("lock poisoned");
        if let Some(existing) = map.get(id) {
            if existing.same_content(kind, data) {
                return Ok(());
            }
            warn!(id = %id, "refusing to overwrite object with different content");
            return Err(StoreError::ConsistencyViolation(*id));
        }
        map.insert(*id, ObjectRecord::new(*id, kind, data.to_vec()));
        Ok(())
    }

    async fn delete(&self, id: &ObjectId) -> StoreResult<bool> {
        let mut map = self.objects.write().expect("lock poisoned");
        Ok(map.remove(id).is_some())
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.objects.read().expect("lock poisoned").len();
        f.debug_struct("InMemoryObjectStore")
            .field("object_count", &count)
            .finish()
    }
}
