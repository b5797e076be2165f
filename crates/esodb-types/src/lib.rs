//! Foundation types for esodb.
//!
//! This crate provides the identifier and type vocabulary shared by the
//! object-store contract and its backends. Every other esodb crate depends on
//! `esodb-types`.
//!
//! # Key Types
//!
//! - [`ObjectId`] — 20-byte content-addressed identifier (40 hex characters)
//! - [`ObjectType`] — The fixed object enumeration: commit, tree, blob, tag

pub mod error;
pub mod kind;
pub mod object;

pub use error::TypeError;
pub use kind::ObjectType;
pub use object::{ObjectId, OID_HEX_LEN, OID_LEN};
