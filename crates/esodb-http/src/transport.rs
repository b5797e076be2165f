use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::HttpResult;

/// The HTTP verbs the document store is driven with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Put => write!(f, "PUT"),
            Self::Post => write!(f, "POST"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// A complete HTTP response: status code and buffered body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        Self { status, body }
    }

    /// Build a response whose body is the serialized JSON value.
    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self::new(status, value.to_string().into_bytes())
    }

    /// 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    pub fn is_conflict(&self) -> bool {
        self.status == 409
    }

    /// Body as UTF-8 text, lossily decoded. Used for diagnostics.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// JSON-over-HTTP transport used to reach the remote document store.
///
/// Implementations send `Accept` and `Content-Type` headers of
/// `application/json`, buffer the whole response body, and bound each call
/// with their own timeout. A response with any status code is `Ok`; only a
/// failure to obtain a response is `Err`.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str) -> HttpResult<HttpResponse>;
    async fn put(&self, url: &str, body: &[u8]) -> HttpResult<HttpResponse>;
    async fn post(&self, url: &str, body: &[u8]) -> HttpResult<HttpResponse>;
    async fn delete(&self, url: &str) -> HttpResult<HttpResponse>;
}

#[async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for Arc<T> {
    async fn get(&self, url: &str) -> HttpResult<HttpResponse> {
        (**self).get(url).await
    }

    async fn put(&self, url: &str, body: &[u8]) -> HttpResult<HttpResponse> {
        (**self).put(url, body).await
    }

    async fn post(&self, url: &str, body: &[u8]) -> HttpResult<HttpResponse> {
        (**self).post(url, body).await
    }

    async fn delete(&self, url: &str) -> HttpResult<HttpResponse> {
        (**self).delete(url).await
    }
}
