use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Number of raw bytes in an [`ObjectId`].
pub const OID_LEN: usize = 20;

/// Number of hex characters in the canonical string form of an [`ObjectId`].
pub const OID_HEX_LEN: usize = OID_LEN * 2;

/// Content-addressed identifier for any stored object.
///
/// An `ObjectId` is the 20-byte content hash the host framework assigns to an
/// object. It is immutable and never reused for different content. The
/// canonical string form is 40 lowercase hex characters, which is also the
/// key of the object's remote document.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId([u8; OID_LEN]);

impl ObjectId {
    /// Create an `ObjectId` from a pre-computed hash.
    pub const fn from_hash(hash: [u8; OID_LEN]) -> Self {
        Self(hash)
    }

    /// The raw 20-byte hash.
    pub fn as_bytes(&self) -> &[u8; OID_LEN] {
        &self.0
    }

    /// Hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Hex form of the first `len` bytes. `len` is clamped to [`OID_LEN`].
    pub fn hex_prefix(&self, len: usize) -> String {
        hex::encode(&self.0[..len.min(OID_LEN)])
    }

    /// Returns `true` if the first `len` bytes of `self` and `other` agree.
    pub fn shares_prefix(&self, other: &ObjectId, len: usize) -> bool {
        let len = len.min(OID_LEN);
        self.0[..len] == other.0[..len]
    }

    /// Parse from a 40-character hex string (either case).
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != OID_LEN {
            return Err(TypeError::InvalidLength {
                expected: OID_LEN,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; OID_LEN];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.short_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::str::FromStr for ObjectId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; OID_LEN]> for ObjectId {
    fn from(bytes: [u8; OID_LEN]) -> Self {
        Self(bytes)
    }
}

impl From<ObjectId> for [u8; OID_LEN] {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}
