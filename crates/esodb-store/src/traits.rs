use async_trait::async_trait;
use esodb_types::{ObjectId, ObjectType, OID_LEN};

use crate::error::{StoreError, StoreResult};
use crate::record::{ObjectHeader, ObjectRecord};

/// Content-addressed object store backend.
///
/// This is the contract the host framework invokes. All implementations must
/// satisfy these invariants:
/// - Objects are immutable once written. Writing identical content under the
///   same id succeeds silently; different content is a
///   [`StoreError::ConsistencyViolation`] and is never stored.
/// - Absence is reported as [`StoreError::NotFound`] (or `Ok(false)` from
///   `exists`). Transport failures are reported as errors, never as absence.
/// - Prefix lookups either resolve exactly one object or fail.
/// - No call depends on in-process state left by a previous call.
#[async_trait]
pub trait ObjectStoreBackend: Send + Sync {
    /// Check whether an object exists.
    async fn exists(&self, id: &ObjectId) -> StoreResult<bool>;

    /// Read only the type and size of an object.
    async fn read_header(&self, id: &ObjectId) -> StoreResult<ObjectHeader>;

    /// Read a full object by id.
    async fn read(&self, id: &ObjectId) -> StoreResult<ObjectRecord>;

    /// Resolve the unique object whose id starts with the first `len` bytes
    /// of `short_id`.
    ///
    /// Zero matches is [`StoreError::PrefixNotFound`], two or more is
    /// [`StoreError::Ambiguous`].
    async fn read_prefix(&self, short_id: &ObjectId, len: usize) -> StoreResult<ObjectRecord>;

    /// Store `data` of type `kind` under `id`.
    async fn write(&self, id: &ObjectId, data: &[u8], kind: ObjectType) -> StoreResult<()>;

    /// Delete an object by ID. Returns `true` if the object existed.
    ///
    /// This is intended for garbage collection only. Deletion of
    /// referenced objects can corrupt the store.
    async fn delete(&self, id: &ObjectId) -> StoreResult<bool>;

    /// Read multiple objects, yielding `None` for ids that are absent.
    ///
    /// Default implementation calls `read()` for each ID. Backends may
    /// override for fewer round-trips.
    async fn read_batch(&self, ids: &[ObjectId]) -> StoreResult<Vec<Option<ObjectRecord>>> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            match self.read(id).await {
                Ok(record) => out.push(Some(record)),
                Err(StoreError::NotFound(_)) => out.push(None),
                Err(e) => return Err(e),
            }
        }
        Ok(out)
    }
}

/// Reject prefix lengths outside `1..=20` bytes.
pub fn validate_prefix_len(len: usize) -> StoreResult<()> {
    if len == 0 || len > OID_LEN {
        return Err(StoreError::InvalidPrefix { len });
    }
    Ok(())
}
