use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The fixed enumeration of object types.
///
/// Ordinals match the object types of the host framework and are what goes
/// on the wire: a remote document stores `type` as the integer ordinal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum ObjectType {
    Commit = 1,
    Tree = 2,
    Blob = 3,
    Tag = 4,
}

impl ObjectType {
    /// Every object type, in ordinal order.
    pub const ALL: [ObjectType; 4] = [Self::Commit, Self::Tree, Self::Blob, Self::Tag];

    /// Integer ordinal used on the wire.
    pub fn ordinal(self) -> i64 {
        self as i64
    }

    /// Decode a wire ordinal.
    pub fn from_ordinal(ordinal: i64) -> Result<Self, TypeError> {
        match ordinal {
            1 => Ok(Self::Commit),
            2 => Ok(Self::Tree),
            3 => Ok(Self::Blob),
            4 => Ok(Self::Tag),
            other => Err(TypeError::UnknownObjectType(other)),
        }
    }
}

impl TryFrom<i64> for ObjectType {
    type Error = TypeError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::from_ordinal(value)
    }
}

impl From<ObjectType> for i64 {
    fn from(kind: ObjectType) -> Self {
        kind.ordinal()
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Commit => write!(f, "commit"),
            Self::Tree => write!(f, "tree"),
            Self::Blob => write!(f, "blob"),
            Self::Tag => write!(f, "tag"),
        }
    }
}
