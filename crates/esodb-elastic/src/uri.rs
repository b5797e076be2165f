//! Resource locators for the remote index.
//!
//! ```text
//! index     http://<host>/<index>
//! type      http://<host>/<index>/<type>
//! document  http://<host>/<index>/<type>/<40 hex id>
//! search    http://<host>/<index>/_search
//! ```

use esodb_types::ObjectId;

/// Concatenate segments with no implicit separator.
pub fn join<S: AsRef<str>>(segments: &[S]) -> String {
    let mut out = String::with_capacity(segments.iter().map(|s| s.as_ref().len()).sum());
    for segment in segments {
        out.push_str(segment.as_ref());
    }
    out
}

/// Append `?k1=v1&k2=v2` to `uri`. Values are not escaped.
pub fn with_query(uri: &str, pairs: &[(&str, &str)]) -> String {
    if pairs.is_empty() {
        return uri.to_string();
    }
    let query: Vec<String> = pairs.iter().map(|(k, v)| format!("{k}={v}")).collect();
    let query = query.join("&");
    join(&[uri, "?", query.as_str()])
}

/// The locators of one backend, derived once from its configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Locators {
    index_uri: String,
    type_uri: String,
}

impl Locators {
    /// Build locators for `index`/`doc_type` on `host`.
    ///
    /// A host that already carries `http://` or `https://` keeps its own
    /// scheme. A trailing `/` on the host is dropped.
    pub fn new(scheme: &str, host: &str, index: &str, doc_type: &str) -> Self {
        let host = host.trim_end_matches('/');
        let base = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            join(&[scheme, "://", host])
        };
        let index_uri = join(&[base.as_str(), "/", index]);
        let type_uri = join(&[index_uri.as_str(), "/", doc_type]);
        Self {
            index_uri,
            type_uri,
        }
    }

    pub fn index_uri(&self) -> &str {
        &self.index_uri
    }

    pub fn type_uri(&self) -> &str {
        &self.type_uri
    }

    pub fn document_uri(&self, id: &ObjectId) -> String {
        let hex = id.to_hex();
        join(&[self.type_uri.as_str(), "/", hex.as_str()])
    }

    pub fn search_uri(&self) -> String {
        join(&[self.index_uri.as_str(), "/_search"])
    }
}
