//! Object-store backend contract for esodb.
//!
//! A backend stores immutable objects keyed by their content hash, the way
//! git keeps `.git/objects/`. The host framework holds backends as
//! [`ObjectStoreBackend`] trait objects and never depends on how a backend
//! lays out its data.
//!
//! # Storage Backends
//!
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding
//! - `esodb_elastic::ElasticBackend` -- remote document index over HTTP
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written (content-addressing guarantees this).
//! 2. Identical id implies identical content: re-writing the same object is a
//!    no-op, writing different content under a stored id is an error.
//! 3. Prefix lookups resolve a unique object or fail; ties are never broken.
//! 4. Backends hold no mutable state that a call depends on, so concurrent
//!    calls are safe.
//! 5. All I/O errors are propagated, never silently treated as absence.

pub mod error;
pub mod memory;
pub mod record;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryObjectStore;
pub use record::{ObjectHeader, ObjectRecord};
pub use traits::{validate_prefix_len, ObjectStoreBackend};
