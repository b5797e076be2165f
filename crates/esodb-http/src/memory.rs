use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use hyper::Uri;
use serde_json::{json, Map, Value};

use crate::error::{HttpError, HttpResult};
use crate::transport::{HttpMethod, HttpResponse, HttpTransport};

/// One request as seen by [`MemoryDocumentServer`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: HttpMethod,
    pub url: String,
}

#[derive(Debug, Default)]
struct IndexState {
    mappings: Value,
    docs: BTreeMap<String, Value>,
}

/// In-process emulation of the document index endpoints esodb drives.
///
/// Speaks the Elasticsearch dialect for the subset in use:
///
/// - `GET /{index}` and `PUT /{index}` (create, with mappings)
/// - `GET|PUT|DELETE /{index}/{type}/{id}` with `op_type=create`,
///   `_source=false` and `_source_includes=a,b`
/// - `POST /{index}/_search` with a `prefix` query on `_id`
///
/// Host and type segments are ignored, so any host string routes here.
/// Every request is recorded, and [`set_offline`](Self::set_offline) makes
/// all calls fail as if the connection were refused.
#[derive(Debug, Default)]
pub struct MemoryDocumentServer {
    indices: Mutex<HashMap<String, IndexState>>,
    requests: Mutex<Vec<RecordedRequest>>,
    offline: AtomicBool,
}

impl MemoryDocumentServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with [`HttpError::Connect`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn index_exists(&self, index: &str) -> bool {
        self.indices.lock().expect("lock poisoned").contains_key(index)
    }

    /// Mappings the index was created with.
    pub fn index_mappings(&self, index: &str) -> Option<Value> {
        let indices = self.indices.lock().expect("lock poisoned");
        indices.get(index).map(|state| state.mappings.clone())
    }

    pub fn document_count(&self, index: &str) -> usize {
        let indices = self.indices.lock().expect("lock poisoned");
        indices.get(index).map_or(0, |state| state.docs.len())
    }

    /// Raw `_source` of a stored document.
    pub fn document(&self, index: &str, id: &str) -> Option<Value> {
        let indices = self.indices.lock().expect("lock poisoned");
        indices.get(index)?.docs.get(id).cloned()
    }

    /// Store a document bypassing all checks, creating the index if needed.
    pub fn insert_raw(&self, index: &str, id: &str, source: Value) {
        let mut indices = self.indices.lock().expect("lock poisoned");
        indices
            .entry(index.to_string())
            .or_default()
            .docs
            .insert(id.to_string(), source);
    }

    /// All requests served so far, oldest first.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("lock poisoned").clone()
    }

    /// Number of recorded requests with the given method.
    pub fn count(&self, method: HttpMethod) -> usize {
        let requests = self.requests.lock().expect("lock poisoned");
        requests.iter().filter(|r| r.method == method).count()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().expect("lock poisoned").clear();
    }

    fn handle(&self, method: HttpMethod, url: &str, body: &[u8]) -> HttpResult<HttpResponse> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(HttpError::Connect(format!("{url}: connection refused")));
        }
        let uri: Uri = url.parse().map_err(|e: hyper::http::uri::InvalidUri| {
            HttpError::InvalidUri {
                uri: url.to_string(),
                reason: e.to_string(),
            }
        })?;
        self.requests
            .lock()
            .expect("lock poisoned")
            .push(RecordedRequest {
                method,
                url: url.to_string(),
            });

        let segments: Vec<&str> = uri.path().split('/').filter(|s| !s.is_empty()).collect();
        let query = parse_query(uri.query());
        let body: Value = if body.is_empty() {
            Value::Null
        } else {
            match serde_json::from_slice(body) {
                Ok(value) => value,
                Err(e) => return Ok(error_response(400, "parse_exception", &e.to_string())),
            }
        };

        let mut indices = self.indices.lock().expect("lock poisoned");
        let response = match (method, segments.as_slice()) {
            (HttpMethod::Get, [index]) => match indices.get(*index) {
                Some(state) => {
                    let mut meta = Map::new();
                    meta.insert(index.to_string(), json!({"mappings": state.mappings}));
                    HttpResponse::json(200, &Value::Object(meta))
                }
                None => index_not_found(index),
            },
            (HttpMethod::Put, [index]) => {
                if indices.contains_key(*index) {
                    error_response(
                        400,
                        "resource_already_exists_exception",
                        &format!("index [{index}] already exists"),
                    )
                } else {
                    let mappings = body.get("mappings").cloned().unwrap_or(Value::Null);
                    indices.insert(
                        index.to_string(),
                        IndexState {
                            mappings,
                            docs: BTreeMap::new(),
                        },
                    );
                    HttpResponse::json(
                        200,
                        &json!({"acknowledged": true, "shards_acknowledged": true, "index": index}),
                    )
                }
            }
            (HttpMethod::Post | HttpMethod::Get, [index, "_search"]) => match indices.get(*index) {
                Some(state) => search(index, state, &body),
                None => index_not_found(index),
            },
            (_, [index, _doc_type, id]) => match indices.get_mut(*index) {
                Some(state) => document_op(method, index, id, state, &query, body),
                None => index_not_found(index),
            },
            _ => error_response(400, "illegal_argument_exception", "unsupported request"),
        };
        Ok(response)
    }
}

fn document_op(
    method: HttpMethod,
    index: &str,
    id: &str,
    state: &mut IndexState,
    query: &HashMap<String, String>,
    body: Value,
) -> HttpResponse {
    match method {
        HttpMethod::Get => match state.docs.get(id) {
            Some(source) => {
                let mut doc = json!({"_index": index, "_id": id, "found": true});
                if query.get("_source").map(String::as_str) != Some("false") {
                    let source = match query.get("_source_includes") {
                        Some(fields) => filter_fields(source, fields),
                        None => source.clone(),
                    };
                    doc["_source"] = source;
                }
                HttpResponse::json(200, &doc)
            }
            None => HttpResponse::json(404, &json!({"_index": index, "_id": id, "found": false})),
        },
        HttpMethod::Put | HttpMethod::Post => {
            let create_only = query.get("op_type").map(String::as_str) == Some("create");
            if create_only && state.docs.contains_key(id) {
                return error_response(
                    409,
                    "version_conflict_engine_exception",
                    &format!("[{id}]: version conflict, document already exists"),
                );
            }
            let result = match state.docs.insert(id.to_string(), body) {
                Some(_) => "updated",
                None => "created",
            };
            let status = if result == "created" { 201 } else { 200 };
            HttpResponse::json(status, &json!({"_index": index, "_id": id, "result": result}))
        }
        HttpMethod::Delete => match state.docs.remove(id) {
            Some(_) => HttpResponse::json(200, &json!({"_index": index, "_id": id, "result": "deleted"})),
            None => HttpResponse::json(404, &json!({"_index": index, "_id": id, "result": "not_found"})),
        },
    }
}

fn search(index: &str, state: &IndexState, body: &Value) -> HttpResponse {
    let Some(prefix) = body
        .pointer("/query/prefix/_id")
        .and_then(|p| p.as_str().or_else(|| p.get("value").and_then(Value::as_str)))
    else {
        return error_response(400, "parsing_exception", "expected a prefix query on _id");
    };
    let size = body.get("size").and_then(Value::as_u64).unwrap_or(10) as usize;
    let matched: Vec<(&String, &Value)> = state
        .docs
        .iter()
        .filter(|(id, _)| id.starts_with(prefix))
        .collect();
    let hits: Vec<Value> = matched
        .iter()
        .take(size)
        .map(|(id, source)| json!({"_index": index, "_id": id, "_source": source}))
        .collect();
    HttpResponse::json(
        200,
        &json!({
            "hits": {
                "total": {"value": matched.len(), "relation": "eq"},
                "hits": hits,
            }
        }),
    )
}

fn filter_fields(source: &Value, fields: &str) -> Value {
    let wanted: Vec<&str> = fields.split(',').collect();
    let filtered: Map<String, Value> = source
        .as_object()
        .map(|obj| {
            obj.iter()
                .filter(|(k, _)| wanted.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        })
        .unwrap_or_default();
    Value::Object(filtered)
}

fn parse_query(query: Option<&str>) -> HashMap<String, String> {
    query
        .unwrap_or_default()
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

fn index_not_found(index: &str) -> HttpResponse {
    error_response(
        404,
        "index_not_found_exception",
        &format!("no such index [{index}]"),
    )
}

fn error_response(status: u16, kind: &str, reason: &str) -> HttpResponse {
    HttpResponse::json(
        status,
        &json!({
            "error": {"root_cause": [{"type": kind, "reason": reason}], "type": kind, "reason": reason},
            "status": status,
        }),
    )
}

#[async_trait]
impl HttpTransport for MemoryDocumentServer {
    async fn get(&self, url: &str) -> HttpResult<HttpResponse> {
        self.handle(HttpMethod::Get, url, &[])
    }

    async fn put(&self, url: &str, body: &[u8]) -> HttpResult<HttpResponse> {
        self.handle(HttpMethod::Put, url, body)
    }

    async fn post(&self, url: &str, body: &[u8]) -> HttpResult<HttpResponse> {
        self.handle(HttpMethod::Post, url, body)
    }

    async fn delete(&self, url: &str) -> HttpResult<HttpResponse> {
        self.handle(HttpMethod::Delete, url, &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://es.test:9200";

    fn body(resp: &HttpResponse) -> Value {
        serde_json::from_slice(&resp.body).unwrap()
    }

    async fn server_with_index() -> MemoryDocumentServer {
        let server = MemoryDocumentServer::new();
        let resp = server
            .put(&format!("{BASE}/odb"), br#"{"mappings":{"properties":{}}}"#)
            .await
            .unwrap();
        assert_eq!(resp.status, 200);
        server
    }

    #[tokio::test]
    async fn missing_index_is_404_with_status_field() {
        let server = MemoryDocumentServer::new();
        let resp = server.get(&format!("{BASE}/odb")).await.unwrap();
        assert!(resp.is_not_found());
        assert_eq!(body(&resp)["status"], 404);
        assert_eq!(body(&resp)["error"]["type"], "index_not_found_exception");
    }

    #[tokio::test]
    async fn duplicate_index_creation_rejected() {
        let server = server_with_index().await;
        let resp = server.put(&format!("{BASE}/odb"), b"{}").await.unwrap();
        assert_eq!(resp.status, 400);
        assert_eq!(body(&resp)["error"]["type"], "resource_already_exists_exception");
        assert!(server.index_mappings("odb").is_some());
    }

    #[tokio::test]
    async fn document_lifecycle() {
        let server = server_with_index().await;
        let url = format!("{BASE}/odb/_doc/abc");
        let resp = server.put(&url, br#"{"type":3,"size":1,"data":"eA=="}"#).await.unwrap();
        assert_eq!(resp.status, 201);

        let resp = server.get(&url).await.unwrap();
        assert_eq!(body(&resp)["_source"]["size"], 1);

        let resp = server.delete(&url).await.unwrap();
        assert_eq!(resp.status, 200);
        let resp = server.get(&url).await.unwrap();
        assert_eq!(body(&resp)["found"], false);
    }

    #[tokio::test]
    async fn create_only_put_conflicts() {
        let server = server_with_index().await;
        let url = format!("{BASE}/odb/_doc/abc?op_type=create");
        server.put(&url, br#"{"v":1}"#).await.unwrap();
        let resp = server.put(&url, br#"{"v":2}"#).await.unwrap();
        assert!(resp.is_conflict());
        assert_eq!(server.document("odb", "abc").unwrap()["v"], 1);
    }

    #[tokio::test]
    async fn source_filtering() {
        let server = server_with_index().await;
        server.insert_raw("odb", "abc", json!({"type": 3, "size": 1, "data": "eA=="}));

        let resp = server
            .get(&format!("{BASE}/odb/_doc/abc?_source_includes=type,size"))
            .await
            .unwrap();
        let source = &body(&resp)["_source"];
        assert_eq!(source["type"], 3);
        assert!(source.get("data").is_none());

        let resp = server.get(&format!("{BASE}/odb/_doc/abc?_source=false")).await.unwrap();
        assert_eq!(body(&resp)["found"], true);
        assert!(body(&resp).get("_source").is_none());
    }

    #[tokio::test]
    async fn prefix_search_counts_all_matches() {
        let server = server_with_index().await;
        for id in ["aa01", "aa02", "aa03", "bb01"] {
            server.insert_raw("odb", id, json!({}));
        }
        let query = br#"{"query":{"prefix":{"_id":"aa"}},"size":2}"#;
        let resp = server.post(&format!("{BASE}/odb/_search"), query).await.unwrap();
        let parsed = body(&resp);
        assert_eq!(parsed["hits"]["total"]["value"], 3);
        assert_eq!(parsed["hits"]["hits"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn offline_fails_every_call() {
        let server = server_with_index().await;
        server.set_offline(true);
        let err = server.get(&format!("{BASE}/odb")).await.unwrap_err();
        assert!(matches!(err, HttpError::Connect(_)));
        server.set_offline(false);
        assert!(server.get(&format!("{BASE}/odb")).await.unwrap().is_success());
    }

    #[tokio::test]
    async fn requests_are_recorded() {
        let server = server_with_index().await;
        server.get(&format!("{BASE}/odb")).await.unwrap();
        assert_eq!(server.count(HttpMethod::Put), 1);
        assert_eq!(server.count(HttpMethod::Get), 1);
        assert_eq!(server.requests()[1].url, format!("{BASE}/odb"));
        server.clear_requests();
        assert!(server.requests().is_empty());
    }
}
