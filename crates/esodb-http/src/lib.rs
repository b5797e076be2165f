//! HTTP transport for esodb.
//!
//! Backends talk to the remote document store through the [`HttpTransport`]
//! trait: four JSON verbs returning a status code and a raw body. Response
//! interpretation (found / not found / error) belongs to the caller.
//!
//! - [`HyperTransport`] -- pooled `hyper` client with a per-request timeout
//! - [`MemoryDocumentServer`] -- in-process document index for tests

pub mod error;
pub mod hyper_client;
pub mod memory;
pub mod transport;

pub use error::{HttpError, HttpResult};
pub use hyper_client::HyperTransport;
pub use memory::{MemoryDocumentServer, RecordedRequest};
pub use transport::{HttpMethod, HttpResponse, HttpTransport};
