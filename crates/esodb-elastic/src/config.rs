use std::path::Path;
use std::time::Duration;

use esodb_store::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};

/// Index the backend stores objects in unless configured otherwise.
pub const DEFAULT_INDEX: &str = "git2_odb";

/// Document type segment of document locators.
pub const DEFAULT_DOC_TYPE: &str = "_doc";

/// Connection settings for [`ElasticBackend`](crate::ElasticBackend).
///
/// Every field has a default, so a TOML file only needs the keys it changes:
///
/// ```toml
/// host = "search.internal:9200"
/// index = "objects"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// `host[:port]`, or a full `http://host:port` base.
    pub host: String,
    pub scheme: String,
    pub index: String,
    pub doc_type: String,
    /// Bound on each HTTP call, in milliseconds.
    pub timeout_ms: u64,
    /// Ask the remote to make writes visible to search before acknowledging
    /// them, so prefix lookups see objects written just before.
    pub refresh_on_write: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            host: "localhost:9200".into(),
            scheme: "http".into(),
            index: DEFAULT_INDEX.into(),
            doc_type: DEFAULT_DOC_TYPE.into(),
            timeout_ms: 5_000,
            refresh_on_write: true,
        }
    }
}

impl BackendConfig {
    /// Default settings bound to `host`.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(s: &str) -> StoreResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| StoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> StoreResult<()> {
        if self.host.trim().is_empty() {
            return Err(StoreError::Config("host must not be empty".into()));
        }
        if !matches!(self.scheme.as_str(), "http" | "https") {
            return Err(StoreError::Config(format!(
                "unsupported scheme {:?}",
                self.scheme
            )));
        }
        for (name, segment) in [("index", &self.index), ("doc_type", &self.doc_type)] {
            if segment.is_empty() || segment.contains('/') {
                return Err(StoreError::Config(format!(
                    "{name} must be a single non-empty path segment, got {segment:?}"
                )));
            }
        }
        if self.timeout_ms == 0 {
            return Err(StoreError::Config("timeout_ms must be positive".into()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
