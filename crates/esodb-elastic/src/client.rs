use std::sync::Arc;

use esodb_http::{HttpError, HttpMethod, HttpResponse, HttpTransport};
use esodb_store::{StoreError, StoreResult};
use serde_json::Value;
use tracing::{debug, warn};

/// Result of a GET against a locator.
#[derive(Clone, Debug, PartialEq)]
pub enum Fetched {
    /// The remote returned a body for an existing resource.
    Found(Value),
    /// The remote confirmed the resource does not exist.
    NotFound,
}

/// A decoded reply: status code plus JSON body (`Null` when empty).
#[derive(Clone, Debug, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub body: Value,
}

impl Reply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Not found at the HTTP layer, via a `status` field in the body, or via
    /// `"found": false`.
    pub fn is_not_found(&self) -> bool {
        self.status == 404
            || self.body.get("status").and_then(Value::as_u64) == Some(404)
            || self.body.get("found").and_then(Value::as_bool) == Some(false)
    }

    pub fn is_conflict(&self) -> bool {
        self.status == 409 || self.error_type() == Some("version_conflict_engine_exception")
    }

    /// `error.type` of an error body.
    pub fn error_type(&self) -> Option<&str> {
        self.body.pointer("/error/type").and_then(Value::as_str)
    }

    /// Turn an unexpected reply into an error for the caller.
    pub fn into_error(self, method: HttpMethod, uri: &str) -> StoreError {
        let reason = self
            .body
            .pointer("/error/reason")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| self.body.to_string());
        StoreError::Remote {
            status: self.status,
            reason: format!("{method} {uri}: {reason}"),
        }
    }
}

/// Map a transport failure into the store's error type.
pub fn transport_error(method: HttpMethod, uri: &str, err: HttpError) -> StoreError {
    warn!(%method, uri, error = %err, "transport failure");
    StoreError::Transport(format!("{method} {uri}: {err}"))
}

/// JSON document operations over an [`HttpTransport`].
///
/// The client never retries and never turns a transport failure into
/// "not found"; only a reply from the remote can mean absence.
#[derive(Clone)]
pub struct DocumentClient {
    transport: Arc<dyn HttpTransport>,
}

impl DocumentClient {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Fetch a resource. An empty body counts as not found only with a 2xx
    /// or 404 status; any other status is an error.
    pub async fn get(&self, uri: &str) -> StoreResult<Fetched> {
        let response = self
            .transport
            .get(uri)
            .await
            .map_err(|e| transport_error(HttpMethod::Get, uri, e))?;
        let reply = decode(HttpMethod::Get, uri, response)?;
        if reply.body.is_null() {
            if reply.is_success() || reply.status == 404 {
                debug!(uri, status = reply.status, "empty body, treating as not found");
                return Ok(Fetched::NotFound);
            }
            return Err(reply.into_error(HttpMethod::Get, uri));
        }
        if reply.is_not_found() {
            return Ok(Fetched::NotFound);
        }
        if !reply.is_success() {
            return Err(reply.into_error(HttpMethod::Get, uri));
        }
        Ok(Fetched::Found(reply.body))
    }

    /// Send a document. The reply is returned whatever its status, since
    /// the meaning of a rejection depends on the call.
    pub async fn put(&self, uri: &str, body: &Value) -> StoreResult<Reply> {
        let payload = encode(body)?;
        let response = self
            .transport
            .put(uri, &payload)
            .await
            .map_err(|e| transport_error(HttpMethod::Put, uri, e))?;
        decode(HttpMethod::Put, uri, response)
    }

    /// Run a query. Any non-2xx reply is an error.
    pub async fn post(&self, uri: &str, body: &Value) -> StoreResult<Value> {
        let payload = encode(body)?;
        let response = self
            .transport
            .post(uri, &payload)
            .await
            .map_err(|e| transport_error(HttpMethod::Post, uri, e))?;
        let reply = decode(HttpMethod::Post, uri, response)?;
        if !reply.is_success() {
            return Err(reply.into_error(HttpMethod::Post, uri));
        }
        Ok(reply.body)
    }

    /// Delete a resource. Returns `true` if it existed.
    pub async fn delete(&self, uri: &str) -> StoreResult<bool> {
        let response = self
            .transport
            .delete(uri)
            .await
            .map_err(|e| transport_error(HttpMethod::Delete, uri, e))?;
        let reply = decode(HttpMethod::Delete, uri, response)?;
        if reply.is_success() {
            return Ok(true);
        }
        if reply.status == 404 {
            return Ok(false);
        }
        Err(reply.into_error(HttpMethod::Delete, uri))
    }
}

impl std::fmt::Debug for DocumentClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentClient").finish_non_exhaustive()
    }
}

fn encode(body: &Value) -> StoreResult<Vec<u8>> {
    serde_json::to_vec(body).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn decode(method: HttpMethod, uri: &str, response: HttpResponse) -> StoreResult<Reply> {
    let body = if response.body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&response.body).map_err(|e| {
            StoreError::MalformedResponse(format!(
                "{method} {uri} returned non-JSON body (status {}): {e}",
                response.status
            ))
        })?
    };
    debug!(%method, uri, status = response.status, "document call");
    Ok(Reply {
        status: response.status,
        body,
    })
}
