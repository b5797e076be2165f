//! Remote document-index backend for esodb.
//!
//! [`ElasticBackend`] implements [`esodb_store::ObjectStoreBackend`] by
//! keeping every object as a JSON document in an Elasticsearch-style index.
//! Each object becomes one document keyed by its 40-character hex id:
//!
//! ```text
//! PUT http://<host>/git2_odb/_doc/<id>
//! {"type": 3, "size": 3, "data": "YWJj"}
//! ```
//!
//! # Components
//!
//! - [`uri`] -- builds index, type and document locators
//! - [`DocumentClient`] -- JSON calls over an [`esodb_http::HttpTransport`],
//!   classifying replies as found, not found, or error
//! - [`IndexProvisioner`] -- creates the index with its fixed schema when it
//!   is missing
//! - [`ElasticBackend`] -- the store operations
//!
//! The backend keeps no cache and no mutable state: every operation is one
//! round-trip (two for a write that hits an existing id), and the handle can
//! be shared across tasks.

pub mod backend;
pub mod client;
pub mod config;
pub mod document;
pub mod provision;
pub mod uri;

pub use backend::ElasticBackend;
pub use client::{DocumentClient, Fetched, Reply};
pub use config::BackendConfig;
pub use document::{DocumentHeader, RemoteDocument};
pub use provision::{IndexProvisioner, IndexSchema, Provisioned};
pub use uri::Locators;
