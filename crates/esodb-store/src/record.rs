use esodb_types::{ObjectId, ObjectType};

/// Type and size of an object, without its content.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObjectHeader {
    /// The type of the object.
    pub kind: ObjectType,
    /// Byte length of the object's content.
    pub size: u64,
}

/// A stored object: identifier, type tag, content and cached size.
///
/// `ObjectRecord` is the unit moved across the backend contract. Records are
/// transient: backends build one per call and never keep it around. `size`
/// always equals `data.len()`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectRecord {
    /// Content-addressed identifier.
    pub id: ObjectId,
    /// The type of this object.
    pub kind: ObjectType,
    /// The size of `data` in bytes.
    pub size: u64,
    /// The raw object content.
    pub data: Vec<u8>,
}

impl ObjectRecord {
    /// Create a record, deriving `size` from `data`.
    pub fn new(id: ObjectId, kind: ObjectType, data: Vec<u8>) -> Self {
        let size = data.len() as u64;
        Self {
            id,
            kind,
            size,
            data,
        }
    }

    /// The header projection of this record.
    pub fn header(&self) -> ObjectHeader {
        ObjectHeader {
            kind: self.kind,
            size: self.size,
        }
    }

    /// Returns `true` if `kind` and `data` match this record.
    pub fn same_content(&self, kind: ObjectType, data: &[u8]) -> bool {
        self.kind == kind && self.data == data
    }
}
