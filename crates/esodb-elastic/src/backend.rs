use std::sync::Arc;

use async_trait::async_trait;
use esodb_http::{HttpTransport, HyperTransport};
use esodb_store::{
    validate_prefix_len, ObjectHeader, ObjectRecord, ObjectStoreBackend, StoreError, StoreResult,
};
use esodb_types::{ObjectId, ObjectType, OID_LEN};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::client::{DocumentClient, Fetched};
use crate::config::BackendConfig;
use crate::document::{source_of, DocumentHeader, RemoteDocument};
use crate::provision::{IndexProvisioner, Provisioned};
use crate::uri::{with_query, Locators};

/// Object store backed by a remote document index.
///
/// Construction provisions the index; after that the handle is immutable and
/// every operation is an independent request. Share it with `Arc` to use it
/// from several tasks.
pub struct ElasticBackend {
    config: BackendConfig,
    locators: Locators,
    client: DocumentClient,
}

impl ElasticBackend {
    /// Connect over HTTP with the configured timeout and provision the index.
    pub async fn connect(config: BackendConfig) -> StoreResult<Self> {
        config.validate()?;
        if config.scheme != "http" {
            return Err(StoreError::Config(format!(
                "scheme {:?} needs a TLS-capable transport; use ElasticBackend::with_transport",
                config.scheme
            )));
        }
        let transport = Arc::new(HyperTransport::new(config.timeout()));
        Self::with_transport(config, transport).await
    }

    /// Bind to an existing transport and provision the index.
    pub async fn with_transport(
        config: BackendConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> StoreResult<Self> {
        Self::with_provisioner(config, transport, IndexProvisioner::default()).await
    }

    /// Bind to an existing transport, provisioning with `provisioner`.
    pub async fn with_provisioner(
        config: BackendConfig,
        transport: Arc<dyn HttpTransport>,
        provisioner: IndexProvisioner,
    ) -> StoreResult<Self> {
        config.validate()?;
        let locators = Locators::new(&config.scheme, &config.host, &config.index, &config.doc_type);
        let client = DocumentClient::new(transport);
        let outcome = provisioner
            .ensure_index(&client, locators.index_uri())
            .await?;
        info!(
            index = locators.index_uri(),
            created = outcome == Provisioned::Created,
            "object backend ready"
        );
        Ok(Self {
            config,
            locators,
            client,
        })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    pub fn locators(&self) -> &Locators {
        &self.locators
    }

    /// Release the handle. There is no remote side effect; dropping the
    /// backend is equivalent.
    pub fn close(self) {
        debug!(index = self.locators.index_uri(), "closing object backend");
    }

    fn write_uri(&self, id: &ObjectId) -> String {
        let mut params = vec![("op_type", "create")];
        if self.config.refresh_on_write {
            params.push(("refresh", "wait_for"));
        }
        with_query(&self.locators.document_uri(id), &params)
    }

    async fn fetch_source(&self, id: &ObjectId, uri: &str) -> StoreResult<Value> {
        match self.client.get(uri).await? {
            Fetched::Found(envelope) => source_of(id, envelope),
            Fetched::NotFound => Err(StoreError::NotFound(*id)),
        }
    }
}

impl std::fmt::Debug for ElasticBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticBackend")
            .field("index_uri", &self.locators.index_uri())
            .field("type_uri", &self.locators.type_uri())
            .finish()
    }
}

#[derive(Deserialize)]
struct SearchReply {
    hits: SearchHits,
}

#[derive(Deserialize)]
struct SearchHits {
    total: Option<TotalHits>,
    hits: Vec<SearchHit>,
}

/// Newer servers report `{"value": n}`, older ones a bare number.
#[derive(Deserialize)]
#[serde(untagged)]
enum TotalHits {
    Count(u64),
    Object { value: u64 },
}

impl TotalHits {
    fn value(&self) -> u64 {
        match self {
            Self::Count(n) | Self::Object { value: n } => *n,
        }
    }
}

#[derive(Deserialize)]
struct SearchHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_source")]
    source: Value,
}

#[async_trait]
impl ObjectStoreBackend for ElasticBackend {
    async fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        let uri = with_query(&self.locators.document_uri(id), &[("_source", "false")]);
        match self.client.get(&uri).await? {
            Fetched::Found(envelope) => {
                Ok(envelope.get("found").and_then(Value::as_bool).unwrap_or(true))
            }
            Fetched::NotFound => Ok(false),
        }
    }

    async fn read_header(&self, id: &ObjectId) -> StoreResult<ObjectHeader> {
        let uri = with_query(
            &self.locators.document_uri(id),
            &[("_source_includes", "type,size")],
        );
        let source = self.fetch_source(id, &uri).await?;
        Ok(DocumentHeader::from_source(id, source)?.into())
    }

    async fn read(&self, id: &ObjectId) -> StoreResult<ObjectRecord> {
        let source = self.fetch_source(id, &self.locators.document_uri(id)).await?;
        RemoteDocument::from_source(id, source)?.into_record(*id)
    }

    async fn read_prefix(&self, short_id: &ObjectId, len: usize) -> StoreResult<ObjectRecord> {
        validate_prefix_len(len)?;
        if len == OID_LEN {
            return self.read(short_id).await;
        }
        let prefix = short_id.hex_prefix(len);
        // Two hits are enough to tell unique from ambiguous.
        let query = json!({
            "query": { "prefix": { "_id": prefix } },
            "size": 2,
        });
        let body = self.client.post(&self.locators.search_uri(), &query).await?;
        let reply: SearchReply = serde_json::from_value(body)
            .map_err(|e| StoreError::MalformedResponse(format!("search for {prefix}: {e}")))?;

        let returned = reply.hits.hits.len() as u64;
        let total = reply
            .hits
            .total
            .as_ref()
            .map_or(returned, |t| t.value().max(returned));
        if total == 0 {
            return Err(StoreError::PrefixNotFound(prefix));
        }
        if total > 1 {
            debug!(%prefix, matches = total, "ambiguous prefix");
            return Err(StoreError::Ambiguous {
                prefix,
                matches: total,
            });
        }

        let Some(hit) = reply.hits.hits.into_iter().next() else {
            return Err(StoreError::MalformedResponse(format!(
                "search for {prefix} counted a match but returned none"
            )));
        };
        let id = ObjectId::from_hex(&hit.id)
            .map_err(|e| StoreError::MalformedResponse(format!("hit id {:?}: {e}", hit.id)))?;
        if !id.shares_prefix(short_id, len) {
            return Err(StoreError::MalformedResponse(format!(
                "hit {id} does not start with {prefix}"
            )));
        }
        RemoteDocument::from_source(&id, hit.source)?.into_record(id)
    }

    async fn write(&self, id: &ObjectId, data: &[u8], kind: ObjectType) -> StoreResult<()> {
        let document = RemoteDocument::encode(kind, data).to_json()?;
        let uri = self.write_uri(id);
        let reply = self.client.put(&uri, &document).await?;
        if reply.is_success() {
            debug!(%id, %kind, size = data.len(), "stored object");
            return Ok(());
        }
        if !reply.is_conflict() {
            return Err(reply.into_error(esodb_http::HttpMethod::Put, &uri));
        }

        let existing = self.read(id).await?;
        if existing.same_content(kind, data) {
            debug!(%id, "object already stored");
            return Ok(());
        }
        warn!(
            %id,
            stored_kind = %existing.kind,
            stored_size = existing.size,
            new_kind = %kind,
            new_size = data.len(),
            "id already maps to different content"
        );
        Err(StoreError::ConsistencyViolation(*id))
    }

    async fn delete(&self, id: &ObjectId) -> StoreResult<bool> {
        let mut uri = self.locators.document_uri(id);
        if self.config.refresh_on_write {
            uri = with_query(&uri, &[("refresh", "wait_for")]);
        }
        self.client.delete(&uri).await
    }
}
