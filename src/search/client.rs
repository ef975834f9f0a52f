//! HTTP client wrapper for the search service REST API.

use crate::config::Config;
use crate::http::{build_client, failure_parts, format_endpoint, normalize_base_url};
use crate::search::{
    schema::{CONTENT_VECTOR_FIELD, IndexSchema, SELECT_FIELDS},
    store::IndexStore,
    types::{
        IndexDocument, ItemOutcome, ListIndexesResponse, SearchError, SearchResponse, StoreQuery,
        StoredChunk, UploadAction, UploadRequest, UploadResponse,
    },
};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde_json::{Map, Value, json};

/// Lightweight HTTP client for index management, uploads and queries.
pub struct AzureSearchService {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
    pub(crate) api_version: String,
}

impl AzureSearchService {
    /// Construct a client against an explicit endpoint.
    pub fn new(
        endpoint: &str,
        api_key: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Result<Self, SearchError> {
        let base_url = normalize_base_url(endpoint).map_err(SearchError::InvalidUrl)?;
        Ok(Self {
            client: build_client("ragline/0.1")?,
            base_url,
            api_key: api_key.into(),
            api_version: api_version.into(),
        })
    }

    /// Construct a client from the loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self, SearchError> {
        let service = Self::new(
            &config.search_endpoint,
            config.search_api_key.clone(),
            config.search_api_version.clone(),
        )?;
        tracing::debug!(
            url = %service.base_url,
            has_api_key = !service.api_key.is_empty(),
            "Initialized search HTTP client"
        );
        Ok(service)
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format_endpoint(&self.base_url, path);
        let mut req = self
            .client
            .request(method, url)
            .query(&[("api-version", self.api_version.as_str())]);
        if !self.api_key.is_empty() {
            req = req.header("api-key", &self.api_key);
        }
        req
    }

    fn search_body(query: &StoreQuery, top_k: usize) -> Value {
        let mut body = Map::new();
        body.insert("top".into(), Value::from(top_k));
        body.insert("select".into(), Value::from(SELECT_FIELDS));
        match query {
            StoreQuery::Vector(vector) => {
                body.insert(
                    "vectorQueries".into(),
                    json!([{
                        "kind": "vector",
                        "vector": vector,
                        "fields": CONTENT_VECTOR_FIELD,
                        "k": top_k,
                    }]),
                );
            }
            StoreQuery::Semantic {
                text,
                configuration,
            } => {
                body.insert("search".into(), Value::from(text.as_str()));
                body.insert("queryType".into(), Value::from("semantic"));
                body.insert(
                    "semanticConfiguration".into(),
                    Value::from(configuration.as_str()),
                );
            }
        }
        Value::Object(body)
    }
}

#[async_trait]
impl IndexStore for AzureSearchService {
    async fn list_indexes(&self) -> Result<Vec<String>, SearchError> {
        let response = self
            .request(Method::GET, "indexes")
            .query(&[("$select", "name")])
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = failure_parts(response).await;
            let error = SearchError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Failed to list indexes");
            return Err(error);
        }

        let payload: ListIndexesResponse = response.json().await?;
        Ok(payload.value.into_iter().map(|index| index.name).collect())
    }

    async fn create_index(&self, schema: &IndexSchema) -> Result<(), SearchError> {
        let response = self
            .request(Method::POST, "indexes")
            .json(&schema.to_definition())
            .send()
            .await?;

        if response.status().is_success() {
            tracing::debug!(index = %schema.name, "Index created");
            Ok(())
        } else {
            let (status, body) = failure_parts(response).await;
            let error = SearchError::UnexpectedStatus { status, body };
            tracing::error!(index = %schema.name, error = %error, "Index creation failed");
            Err(error)
        }
    }

    async fn upload_documents(
        &self,
        index: &str,
        documents: Vec<IndexDocument>,
    ) -> Result<Vec<ItemOutcome>, SearchError> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let request = UploadRequest {
            value: documents
                .into_iter()
                .map(|document| UploadAction {
                    action: "upload",
                    document,
                })
                .collect(),
        };

        let response = self
            .request(Method::POST, &format!("indexes/{index}/docs/index"))
            .json(&request)
            .send()
            .await?;

        // 207 carries per-item results just like 200; only other statuses are call failures.
        let status = response.status();
        if !status.is_success() {
            let (status, body) = failure_parts(response).await;
            let error = SearchError::UnexpectedStatus { status, body };
            tracing::error!(index, error = %error, "Document upload failed");
            return Err(error);
        }
        if status == StatusCode::MULTI_STATUS {
            tracing::debug!(index, "Upload returned per-item failures");
        }

        let payload: UploadResponse = response.json().await?;
        Ok(payload
            .value
            .into_iter()
            .map(|item| ItemOutcome {
                id: item.key,
                succeeded: item.status,
                error_message: item.error_message,
            })
            .collect())
    }

    async fn search(
        &self,
        index: &str,
        query: &StoreQuery,
        top_k: usize,
    ) -> Result<Vec<StoredChunk>, SearchError> {
        let response = self
            .request(Method::POST, &format!("indexes/{index}/docs/search"))
            .json(&Self::search_body(query, top_k))
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = failure_parts(response).await;
            let error = SearchError::UnexpectedStatus { status, body };
            tracing::error!(index, error = %error, "Search request failed");
            return Err(error);
        }

        let SearchResponse { value } = response.json().await?;
        Ok(value)
    }
}
