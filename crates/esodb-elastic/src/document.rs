use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use esodb_store::{ObjectHeader, ObjectRecord, StoreError, StoreResult};
use esodb_types::{ObjectId, ObjectType};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The JSON projection of an object as stored in the remote index.
///
/// `data` is standard padded base64, the encoding the index's `binary`
/// field type accepts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteDocument {
    #[serde(rename = "type")]
    pub kind: ObjectType,
    pub size: u64,
    pub data: String,
}

/// The `type` and `size` fields alone, as returned by a header-only fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct DocumentHeader {
    #[serde(rename = "type")]
    pub kind: ObjectType,
    pub size: u64,
}

impl RemoteDocument {
    pub fn encode(kind: ObjectType, data: &[u8]) -> Self {
        Self {
            kind,
            size: data.len() as u64,
            data: STANDARD.encode(data),
        }
    }

    pub fn to_json(&self) -> StoreResult<Value> {
        serde_json::to_value(self).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Parse a document `_source`.
    pub fn from_source(id: &ObjectId, source: Value) -> StoreResult<Self> {
        serde_json::from_value(source)
            .map_err(|e| StoreError::MalformedResponse(format!("document {id}: {e}")))
    }

    /// Decode into a record, checking `size` against the decoded content.
    pub fn into_record(self, id: ObjectId) -> StoreResult<ObjectRecord> {
        let data = STANDARD
            .decode(self.data.as_bytes())
            .map_err(|e| StoreError::MalformedResponse(format!("document {id}: bad data: {e}")))?;
        if data.len() as u64 != self.size {
            return Err(StoreError::SizeMismatch {
                id,
                declared: self.size,
                actual: data.len() as u64,
            });
        }
        Ok(ObjectRecord::new(id, self.kind, data))
    }
}

impl DocumentHeader {
    pub fn from_source(id: &ObjectId, source: Value) -> StoreResult<Self> {
        serde_json::from_value(source)
            .map_err(|e| StoreError::MalformedResponse(format!("document {id}: {e}")))
    }
}

impl From<DocumentHeader> for ObjectHeader {
    fn from(h: DocumentHeader) -> Self {
        ObjectHeader {
            kind: h.kind,
            size: h.size,
        }
    }
}

/// Pull `_source` out of a fetched document envelope.
pub fn source_of(id: &ObjectId, mut envelope: Value) -> StoreResult<Value> {
    match envelope.get_mut("_source").map(Value::take) {
        Some(source @ Value::Object(_)) => Ok(source),
        Some(other) => Err(StoreError::MalformedResponse(format!(
            "document {id}: _source is not an object: {other}"
        ))),
        None => Err(StoreError::MalformedResponse(format!(
            "document {id}: reply has no _source"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn id() -> ObjectId {
        ObjectId::from_hash([0x42; 20])
    }

    #[test]
    fn encode_wire_shape() {
        let doc = RemoteDocument::encode(ObjectType::Blob, b"abc");
        assert_eq!(
            doc.to_json().unwrap(),
            json!({"type": 3, "size": 3, "data": "YWJj"})
        );
    }

    #[test]
    fn decode_binary_content() {
        let bytes = vec![0u8, 255, 10, 13, 0];
        let doc = RemoteDocument::encode(ObjectType::Tree, &bytes);
        let rec = doc.into_record(id()).unwrap();
        assert_eq!(rec.data, bytes);
        assert_eq!(rec.size, 5);
        assert_eq!(rec.kind, ObjectType::Tree);
    }

    #[test]
    fn declared_size_must_match() {
        let source = json!({"type": 3, "size": 4, "data": "YWJj"});
        let doc = RemoteDocument::from_source(&id(), source).unwrap();
        let err = doc.into_record(id()).unwrap_err();
        assert!(matches!(
            err,
            StoreError::SizeMismatch {
                declared: 4,
                actual: 3,
                ..
            }
        ));
    }

    #[test]
    fn missing_field_is_malformed() {
        let err = RemoteDocument::from_source(&id(), json!({"type": 3, "size": 3})).unwrap_err();
        assert!(matches!(err, StoreError::MalformedResponse(_)));
    }

    #[test]
    fn wrong_field_type_is_malformed() {
        let err = DocumentHeader::from_source(&id(), json!({"type": "blob", "size": 3})).unwrap_err();
        assert!(matches!(err, StoreError::MalformedResponse(_)));
    }

    #[test]
    fn unknown_type_ordinal_is_malformed() {
        let err = DocumentHeader::from_source(&id(), json!({"type": 9, "size": 3})).unwrap_err();
        assert!(matches!(err, StoreError::MalformedResponse(_)));
    }

    #[test]
    fn bad_base64_is_malformed() {
        let doc = RemoteDocument {
            kind: ObjectType::Blob,
            size: 1,
            data: "!!".into(),
        };
        assert!(matches!(
            doc.into_record(id()),
            Err(StoreError::MalformedResponse(_))
        ));
    }

    #[test]
    fn header_ignores_data() {
        let header =
            DocumentHeader::from_source(&id(), json!({"type": 1, "size": 7, "data": "ignored"}))
                .unwrap();
        assert_eq!(ObjectHeader::from(header).size, 7);
    }

    #[test]
    fn source_extraction() {
        let envelope = json!({"_id": "x", "found": true, "_source": {"type": 3}});
        assert_eq!(source_of(&id(), envelope).unwrap(), json!({"type": 3}));
        assert!(source_of(&id(), json!({"found": true})).is_err());
    }
}
