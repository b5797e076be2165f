use thiserror::Error;

/// Failures below the HTTP status line: the request never produced a
/// complete response.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HttpError {
    #[error("invalid URI {uri}: {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request to {url} timed out after {after_ms} ms")]
    Timeout { url: String, after_ms: u64 },

    #[error("request failed: {0}")]
    Request(String),

    #[error("request to {url} exceeded {limit} redirects")]
    TooManyRedirects { url: String, limit: usize },

    #[error("failed to read response body: {0}")]
    Body(String),
}

pub type HttpResult<T> = Result<T, HttpError>;
