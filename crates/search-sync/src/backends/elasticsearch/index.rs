//! Elasticsearch-backed [`SearchIndex`].

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use elasticsearch::auth::Credentials;
use elasticsearch::cert::CertificateValidation;
use elasticsearch::http::request::JsonBody;
use elasticsearch::http::response::Response;
use elasticsearch::http::transport::{SingleNodeConnectionPool, TransportBuilder};
use elasticsearch::indices::{IndicesPutSettingsParts, IndicesRefreshParts};
use elasticsearch::params::Conflicts;
use elasticsearch::{
    BulkParts, DeleteByQueryParts, DeleteParts, Elasticsearch, IndexParts, SearchParts,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, error};

use crate::config::SyncOptions;
use crate::core::{Attributes, Hit, IndexSettings, OBJECT_ID, SearchIndex, SearchResponse};
use crate::error::{IndexError, IndexResult};

const BACKEND: &str = "elasticsearch";
const DEFAULT_HITS_PER_PAGE: u64 = 20;

/// Authentication configuration for Elasticsearch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ElasticsearchAuth {
    /// Basic username/password authentication.
    Basic {
        /// The username for basic auth.
        username: String,
        /// The password for basic auth.
        password: String,
    },
    /// Bearer token authentication.
    Bearer {
        /// The bearer token.
        token: String,
    },
}

/// Configuration for the Elasticsearch index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticsearchConfig {
    /// Elasticsearch node URLs (e.g., `["http://localhost:9200"]`).
    /// Currently uses the first node (single-node connection pool).
    pub nodes: Vec<String>,

    /// Request timeout in milliseconds (default: 30000).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Optional authentication.
    #[serde(default)]
    pub auth: Option<ElasticsearchAuth>,

    /// Whether to disable certificate validation (default: false).
    /// Only use for development/testing.
    #[serde(default)]
    pub disable_certificate_validation: bool,
}

fn default_request_timeout_ms() -> u64 {
    30000
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            nodes: vec!["http://localhost:9200".to_string()],
            request_timeout_ms: default_request_timeout_ms(),
            auth: None,
            disable_certificate_validation: false,
        }
    }
}

/// A search index stored in one Elasticsearch index.
pub struct ElasticsearchIndex {
    client: Elasticsearch,
    config: ElasticsearchConfig,
    index: String,
}

impl Debug for ElasticsearchIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticsearchIndex")
            .field("index", &self.index)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn transport_error(message: String) -> IndexError {
    IndexError::Transport {
        backend_name: BACKEND.to_string(),
        message,
    }
}

fn unexpected(message: impl Into<String>) -> IndexError {
    IndexError::UnexpectedResponse {
        backend_name: BACKEND.to_string(),
        message: message.into(),
    }
}

impl ElasticsearchIndex {
    /// Creates an index handle. No request is made.
    pub fn new(config: ElasticsearchConfig, index: impl Into<String>) -> IndexResult<Self> {
        let client = Self::build_client(&config)?;
        Ok(Self {
            client,
            config,
            index: index.into(),
        })
    }

    /// Creates an index handle from sync options.
    ///
    /// The index name comes from the options. Unless `config` carries its
    /// own authentication, the service credentials are used for basic auth.
    pub fn from_options(options: &SyncOptions, mut config: ElasticsearchConfig) -> IndexResult<Self> {
        if config.auth.is_none() {
            config.auth = Some(ElasticsearchAuth::Basic {
                username: options.credential_id().to_string(),
                password: options.secret_key().to_string(),
            });
        }
        Self::new(config, options.index())
    }

    fn build_client(config: &ElasticsearchConfig) -> IndexResult<Elasticsearch> {
        let url = config
            .nodes
            .first()
            .cloned()
            .unwrap_or_else(|| "http://localhost:9200".to_string());

        let parsed_url: elasticsearch::http::Url = url
            .parse()
            .map_err(|e| transport_error(format!("Invalid URL: {}", e)))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);

        let mut builder = TransportBuilder::new(conn_pool)
            .timeout(Duration::from_millis(config.request_timeout_ms));

        if config.disable_certificate_validation {
            builder = builder.cert_validation(CertificateValidation::None);
        }

        if let Some(ref auth) = config.auth {
            builder = match auth {
                ElasticsearchAuth::Basic { username, password } => {
                    builder.auth(Credentials::Basic(username.clone(), password.clone()))
                }
                ElasticsearchAuth::Bearer { token } => {
                    builder.auth(Credentials::Bearer(token.clone()))
                }
            };
        }

        let transport = builder
            .build()
            .map_err(|e| transport_error(format!("Failed to build transport: {}", e)))?;

        Ok(Elasticsearch::new(transport))
    }

    /// Returns the Elasticsearch index name.
    pub fn index_name(&self) -> &str {
        &self.index
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ElasticsearchConfig {
        &self.config
    }

    /// Refreshes the index so recent writes become searchable.
    ///
    /// Only needed for testing; in production ES refreshes automatically.
    pub async fn refresh_index(&self) -> IndexResult<()> {
        let response = self
            .client
            .indices()
            .refresh(IndicesRefreshParts::Index(&[&self.index]))
            .send()
            .await
            .map_err(|e| transport_error(format!("Failed to refresh index {}: {}", self.index, e)))?;
        ensure_success(response).await?;
        Ok(())
    }
}

/// Fails with [`IndexError::Rejected`] on a non-success status.
async fn ensure_success(response: Response) -> IndexResult<Response> {
    let status = response.status_code();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(IndexError::Rejected {
        backend_name: BACKEND.to_string(),
        status: status.as_u16(),
        message: body,
    })
}

async fn json_body(response: Response) -> IndexResult<Value> {
    response
        .json::<Value>()
        .await
        .map_err(|e| unexpected(format!("Failed to parse response: {}", e)))
}

fn document_id(body: &Value) -> IndexResult<String> {
    body.get("_id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| unexpected("response carries no _id"))
}

/// Parameters with an Elasticsearch counterpart. Others are ignored.
const MAPPED_PARAMS: &[&str] = &[
    "query",
    "hitsPerPage",
    "page",
    "attributesToRetrieve",
    "restrictSearchableAttributes",
];

fn string_list(value: Option<&Value>) -> Option<Vec<Value>> {
    let list: Vec<Value> = value?
        .as_array()?
        .iter()
        .filter(|v| v.is_string())
        .cloned()
        .collect();
    (!list.is_empty()).then_some(list)
}

/// Builds the search request body from index-style parameters.
///
/// `attributesToRetrieve` becomes a `_source` filter and
/// `restrictSearchableAttributes` limits the queried fields.
fn search_body(params: &Map<String, Value>) -> (Value, u64, u64) {
    let query = params.get("query").and_then(Value::as_str).unwrap_or_default();
    let size = params
        .get("hitsPerPage")
        .and_then(Value::as_u64)
        .unwrap_or(DEFAULT_HITS_PER_PAGE)
        .max(1);
    let page = params.get("page").and_then(Value::as_u64).unwrap_or(0);

    let query_clause = if query.is_empty() {
        json!({"match_all": {}})
    } else {
        let mut clause = json!({"query": query, "default_operator": "and"});
        if let Some(fields) = string_list(params.get("restrictSearchableAttributes")) {
            clause["fields"] = Value::Array(fields);
        }
        json!({"simple_query_string": clause})
    };

    let mut body = json!({
        "query": query_clause,
        "from": page.saturating_mul(size),
        "size": size,
        "track_total_hits": true
    });
    if let Some(attributes) = string_list(params.get("attributesToRetrieve")) {
        // "*" keeps the whole document.
        if !attributes.iter().any(|a| a == "*") {
            body["_source"] = Value::Array(attributes);
        }
    }

    let ignored: Vec<&str> = params
        .keys()
        .map(String::as_str)
        .filter(|k| !MAPPED_PARAMS.contains(k))
        .collect();
    if !ignored.is_empty() {
        debug!(?ignored, "Search parameters without an Elasticsearch mapping");
    }
    (body, size, page)
}

/// Converts a search response body into hits plus paging metadata.
fn parse_search(body: &Value, size: u64, page: u64, query: &str) -> IndexResult<SearchResponse> {
    let raw_hits = body
        .pointer("/hits/hits")
        .and_then(Value::as_array)
        .ok_or_else(|| unexpected("search response carries no hits"))?;

    let hits = raw_hits
        .iter()
        .map(|raw| {
            let mut attributes = raw
                .get("_source")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            if let Some(id) = raw.get("_id").and_then(Value::as_str) {
                attributes.insert(OBJECT_ID.to_string(), Value::String(id.to_string()));
            }
            Hit(attributes)
        })
        .collect();

    let total = body
        .pointer("/hits/total/value")
        .and_then(Value::as_u64)
        .unwrap_or(0);

    let mut response = SearchResponse::new(hits);
    response.metadata.insert("nbHits".to_string(), total.into());
    response.metadata.insert("page".to_string(), page.into());
    response
        .metadata
        .insert("nbPages".to_string(), total.div_ceil(size).into());
    response.metadata.insert("hitsPerPage".to_string(), size.into());
    response
        .metadata
        .insert("query".to_string(), Value::String(query.to_string()));
    Ok(response)
}

/// A bulk request that did not index every item.
#[derive(Debug)]
struct BulkFailure {
    error: IndexError,
    /// Ids of the items that were indexed anyway.
    indexed: Vec<String>,
}

impl From<IndexError> for BulkFailure {
    fn from(error: IndexError) -> Self {
        Self {
            error,
            indexed: Vec::new(),
        }
    }
}

/// Extracts assigned ids from a bulk response, in submission order.
fn bulk_ids(body: &Value) -> Result<Vec<String>, BulkFailure> {
    let items = body
        .get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| unexpected("bulk response carries no items"))?;

    let mut indexed = Vec::with_capacity(items.len());
    let mut first_error = None;
    for item in items {
        let outcome = item
            .get("index")
            .ok_or_else(|| unexpected("bulk item is not an index action"))
            .and_then(|action| match action.get("error") {
                Some(error) => {
                    let status = action.get("status").and_then(Value::as_u64).unwrap_or(0);
                    Err(IndexError::Rejected {
                        backend_name: BACKEND.to_string(),
                        status: u16::try_from(status).unwrap_or(0),
                        message: error.to_string(),
                    })
                }
                None => document_id(action),
            });
        match outcome {
            Ok(id) => indexed.push(id),
            Err(e) if first_error.is_none() => first_error = Some(e),
            Err(_) => {}
        }
    }

    match first_error {
        None => Ok(indexed),
        Some(error) => Err(BulkFailure { error, indexed }),
    }
}

#[async_trait]
impl SearchIndex for ElasticsearchIndex {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    async fn clear_index(&self) -> IndexResult<()> {
        // delete_by_query only sees searchable documents.
        match self.refresh_index().await {
            Err(IndexError::Rejected { status: 404, .. }) => return Ok(()),
            other => other?,
        }

        let response = self
            .client
            .delete_by_query(DeleteByQueryParts::Index(&[&self.index]))
            .conflicts(Conflicts::Proceed)
            .refresh(true)
            .body(json!({"query": {"match_all": {}}}))
            .send()
            .await
            .map_err(|e| transport_error(format!("Failed to clear index: {}", e)))?;

        // A missing index is already empty.
        if response.status_code().as_u16() == 404 {
            return Ok(());
        }
        let body = json_body(ensure_success(response).await?).await?;
        debug!(
            index = %self.index,
            deleted = body.get("deleted").and_then(serde_json::Value::as_u64).unwrap_or(0),
            "Cleared Elasticsearch index"
        );
        Ok(())
    }

    async fn add_object(&self, attributes: Attributes) -> IndexResult<String> {
        let response = self
            .client
            .index(IndexParts::Index(&self.index))
            .body(Value::Object(attributes))
            .send()
            .await
            .map_err(|e| transport_error(format!("Failed to index document: {}", e)))?;

        let body = json_body(ensure_success(response).await?).await?;
        document_id(&body)
    }

    async fn add_objects(&self, objects: Vec<Attributes>) -> IndexResult<Vec<String>> {
        if objects.is_empty() {
            return Ok(Vec::new());
        }

        let mut lines: Vec<JsonBody<Value>> = Vec::with_capacity(objects.len() * 2);
        for object in objects {
            lines.push(json!({"index": {}}).into());
            lines.push(Value::Object(object).into());
        }

        let response = self
            .client
            .bulk(BulkParts::Index(&self.index))
            .body(lines)
            .send()
            .await
            .map_err(|e| transport_error(format!("Failed to submit bulk request: {}", e)))?;

        let body = json_body(ensure_success(response).await?).await?;
        match bulk_ids(&body) {
            Ok(ids) => {
                debug!(index = %self.index, count = ids.len(), "Bulk indexed documents");
                Ok(ids)
            }
            Err(BulkFailure { error, indexed }) => {
                // These entries exist but no record will learn their ids.
                for object_id in &indexed {
                    error!(
                        target: "search_sync::orphan",
                        index = %self.index,
                        object_id = %object_id,
                        error = %error,
                        "index entry orphaned: bulk request partially failed"
                    );
                }
                Err(error)
            }
        }
    }

    async fn save_object(&self, object_id: &str, attributes: Attributes) -> IndexResult<()> {
        let response = self
            .client
            .index(IndexParts::IndexId(&self.index, object_id))
            .body(Value::Object(attributes))
            .send()
            .await
            .map_err(|e| transport_error(format!("Failed to index document: {}", e)))?;

        ensure_success(response).await?;
        Ok(())
    }

    async fn delete_object(&self, object_id: &str) -> IndexResult<()> {
        let response = self
            .client
            .delete(DeleteParts::IndexId(&self.index, object_id))
            .send()
            .await
            .map_err(|e| transport_error(format!("Failed to delete document: {}", e)))?;

        if response.status_code().as_u16() == 404 {
            debug!(index = %self.index, object_id, "Document already absent");
            return Ok(());
        }
        ensure_success(response).await?;
        Ok(())
    }

    async fn set_settings(
        &self,
        settings: IndexSettings,
        forward_to_replicas: bool,
    ) -> IndexResult<()> {
        // Replica settings are part of the index itself in Elasticsearch.
        debug!(index = %self.index, forward_to_replicas, "Updating index settings");

        let response = self
            .client
            .indices()
            .put_settings(IndicesPutSettingsParts::Index(&[&self.index]))
            .body(Value::Object(settings))
            .send()
            .await
            .map_err(|e| transport_error(format!("Failed to update settings: {}", e)))?;

        ensure_success(response).await?;
        Ok(())
    }

    async fn search(&self, params: Map<String, Value>) -> IndexResult<SearchResponse> {
        let (body, size, page) = search_body(&params);
        let response = self
            .client
            .search(SearchParts::Index(&[&self.index]))
            .body(body)
            .send()
            .await
            .map_err(|e| transport_error(format!("Failed to search: {}", e)))?;

        let body = json_body(ensure_success(response).await?).await?;
        let query = params.get("query").and_then(Value::as_str).unwrap_or_default();
        parse_search(&body, size, page, query)
    }
}
