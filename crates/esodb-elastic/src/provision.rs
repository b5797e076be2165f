use esodb_store::{StoreError, StoreResult};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::client::{DocumentClient, Fetched};

const ALREADY_EXISTS: &str = "resource_already_exists_exception";

/// The mapping an object index is created with.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexSchema {
    properties: Vec<(String, String)>,
}

impl IndexSchema {
    /// `type`: integer, `size`: integer, `data`: binary.
    pub fn object_store() -> Self {
        Self {
            properties: vec![
                ("type".into(), "integer".into()),
                ("size".into(), "integer".into()),
                ("data".into(), "binary".into()),
            ],
        }
    }

    /// Declared fields as `(name, field type)` pairs.
    pub fn properties(&self) -> &[(String, String)] {
        &self.properties
    }

    /// The index-creation request body.
    pub fn to_body(&self) -> Value {
        let properties: serde_json::Map<String, Value> = self
            .properties
            .iter()
            .map(|(name, ty)| (name.clone(), json!({ "type": ty })))
            .collect();
        json!({ "mappings": { "properties": properties } })
    }
}

impl Default for IndexSchema {
    fn default() -> Self {
        Self::object_store()
    }
}

/// How [`IndexProvisioner::ensure_index`] found the index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Provisioned {
    /// The index existed, or a concurrent creation won the race.
    AlreadyPresent,
    /// This call created the index.
    Created,
}

/// Makes sure the target index exists before any object operation.
#[derive(Clone, Debug, Default)]
pub struct IndexProvisioner {
    schema: IndexSchema,
}

impl IndexProvisioner {
    pub fn new(schema: IndexSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &IndexSchema {
        &self.schema
    }

    /// Confirm the index at `index_uri` exists, creating it if missing.
    ///
    /// If the existence check itself fails, creation is still attempted;
    /// the call fails only when the index can be neither confirmed nor
    /// created. A creation rejected because the index already exists counts
    /// as success.
    pub async fn ensure_index(
        &self,
        client: &DocumentClient,
        index_uri: &str,
    ) -> StoreResult<Provisioned> {
        let check_error = match client.get(index_uri).await {
            Ok(Fetched::Found(_)) => {
                debug!(index_uri, "index present");
                return Ok(Provisioned::AlreadyPresent);
            }
            Ok(Fetched::NotFound) => None,
            Err(e) => {
                warn!(index_uri, error = %e, "index check failed, attempting creation");
                Some(e)
            }
        };

        let created = self.create(client, index_uri).await;
        match (created, check_error) {
            (Ok(outcome), _) => Ok(outcome),
            (Err(create_err), Some(check_err)) => Err(StoreError::Provisioning(format!(
                "{index_uri}: check failed ({check_err}); create failed ({create_err})"
            ))),
            (Err(create_err), None) => Err(StoreError::Provisioning(format!(
                "{index_uri}: {create_err}"
            ))),
        }
    }

    async fn create(&self, client: &DocumentClient, index_uri: &str) -> StoreResult<Provisioned> {
        let reply = client.put(index_uri, &self.schema.to_body()).await?;
        if reply.is_success() {
            if reply.body.get("acknowledged").and_then(Value::as_bool) == Some(false) {
                return Err(StoreError::MalformedResponse(format!(
                    "index creation not acknowledged: {}",
                    reply.body
                )));
            }
            info!(index_uri, "created index");
            return Ok(Provisioned::Created);
        }
        if reply.error_type() == Some(ALREADY_EXISTS) {
            info!(index_uri, "index created concurrently");
            return Ok(Provisioned::AlreadyPresent);
        }
        Err(reply.into_error(esodb_http::HttpMethod::Put, index_uri))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use esodb_http::{HttpMethod, HttpTransport, MemoryDocumentServer};
    use std::sync::Arc;

    const INDEX_URI: &str = "http://es.test:9200/git2_odb";

    fn setup() -> (Arc<MemoryDocumentServer>, DocumentClient) {
        let server = Arc::new(MemoryDocumentServer::new());
        let client = DocumentClient::new(server.clone());
        (server, client)
    }

    #[test]
    fn schema_body() {
        assert_eq!(
            IndexSchema::default().to_body(),
            json!({"mappings": {"properties": {
                "type": {"type": "integer"},
                "size": {"type": "integer"},
                "data": {"type": "binary"},
            }}})
        );
    }

    #[tokio::test]
    async fn creates_missing_index_with_schema() {
        let (server, client) = setup();
        let outcome = IndexProvisioner::default()
            .ensure_index(&client, INDEX_URI)
            .await
            .unwrap();
        assert_eq!(outcome, Provisioned::Created);
        assert_eq!(
            server.index_mappings("git2_odb").unwrap(),
            IndexSchema::default().to_body()["mappings"]
        );
    }

    #[tokio::test]
    async fn second_call_is_noop() {
        let (server, client) = setup();
        let provisioner = IndexProvisioner::default();
        provisioner.ensure_index(&client, INDEX_URI).await.unwrap();
        server.clear_requests();

        let outcome = provisioner.ensure_index(&client, INDEX_URI).await.unwrap();
        assert_eq!(outcome, Provisioned::AlreadyPresent);
        assert_eq!(server.count(HttpMethod::Put), 0);
        assert_eq!(server.count(HttpMethod::Get), 1);
    }

    #[tokio::test]
    async fn racing_creation_counts_as_present() {
        let (server, client) = setup();
        // Another process created the index between our check and create.
        server
            .put(INDEX_URI, &serde_json::to_vec(&IndexSchema::default().to_body()).unwrap())
            .await
            .unwrap();
        let outcome = IndexProvisioner::default()
            .create(&client, INDEX_URI)
            .await
            .unwrap();
        assert_eq!(outcome, Provisioned::AlreadyPresent);
    }

    #[tokio::test]
    async fn concurrent_provisioning_yields_one_index() {
        let (server, client) = setup();
        let provisioner = IndexProvisioner::default();
        let (a, b) = tokio::join!(
            provisioner.ensure_index(&client, INDEX_URI),
            provisioner.ensure_index(&client, INDEX_URI),
        );
        let outcomes = [a.unwrap(), b.unwrap()];
        let created = outcomes.iter().filter(|o| **o == Provisioned::Created).count();
        assert_eq!(created, 1);
        assert!(server.index_exists("git2_odb"));
    }

    #[tokio::test]
    async fn unreachable_remote_is_provisioning_failure() {
        let (server, client) = setup();
        server.set_offline(true);
        let err = IndexProvisioner::default()
            .ensure_index(&client, INDEX_URI)
            .await
            .unwrap_err();
        match err {
            StoreError::Provisioning(msg) => {
                assert!(msg.contains("check failed"));
                assert!(msg.contains("create failed"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
