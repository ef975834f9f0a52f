use crate::config::Config;
use crate::http::{build_client, failure_parts, format_endpoint, normalize_base_url};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// Provider was unable to produce embeddings for the supplied input.
    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),
    /// Endpoint URL failed to parse.
    #[error("Invalid embedding endpoint: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Provider responded with an unexpected status code.
    #[error("Unexpected embedding response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the provider.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
}

/// Interface implemented by embedding backends.
///
/// Implementations return exactly one vector per input text, in input order.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce an embedding vector for each supplied text.
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError>;
}

/// Embedding client for an OpenAI-compatible deployment endpoint.
pub struct AzureOpenAiEmbeddingClient {
    http: Client,
    base_url: String,
    api_key: String,
    api_version: String,
    deployment: String,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

impl AzureOpenAiEmbeddingClient {
    /// Build a client against an explicit endpoint and deployment.
    pub fn new(
        endpoint: &str,
        api_key: impl Into<String>,
        api_version: impl Into<String>,
        deployment: impl Into<String>,
    ) -> Result<Self, EmbeddingClientError> {
        let base_url = normalize_base_url(endpoint).map_err(EmbeddingClientError::InvalidUrl)?;
        Ok(Self {
            http: build_client("ragline/embed")?,
            base_url,
            api_key: api_key.into(),
            api_version: api_version.into(),
            deployment: deployment.into(),
        })
    }

    /// Build a client from the loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self, EmbeddingClientError> {
        let client = Self::new(
            &config.openai_endpoint,
            config.openai_api_key.clone(),
            config.openai_api_version.clone(),
            config.embedding_model.clone(),
        )?;
        tracing::debug!(
            url = %client.base_url,
            deployment = %client.deployment,
            "Initialized embedding client"
        );
        Ok(client)
    }

    fn endpoint(&self) -> String {
        format_endpoint(
            &self.base_url,
            &format!("openai/deployments/{}/embeddings", self.deployment),
        )
    }
}

#[async_trait]
impl EmbeddingClient for AzureOpenAiEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if texts.is_empty() {
            return Err(EmbeddingClientError::GenerationFailed(
                "no texts provided".to_string(),
            ));
        }

        let expected = texts.len();
        tracing::debug!(
            deployment = %self.deployment,
            texts = expected,
            "Generating embeddings"
        );

        let response = self
            .http
            .post(self.endpoint())
            .query(&[("api-version", self.api_version.as_str())])
            .header("api-key", &self.api_key)
            .json(&json!({ "input": texts }))
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = failure_parts(response).await;
            let error = EmbeddingClientError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Embedding request failed");
            return Err(error);
        }

        let EmbeddingResponse { mut data } = response.json().await?;
        if data.len() != expected {
            return Err(EmbeddingClientError::GenerationFailed(format!(
                "expected {expected} vectors, provider returned {}",
                data.len()
            )));
        }

        // Providers may reorder items; `index` is authoritative when present.
        if data.iter().all(|datum| datum.index.is_some()) {
            data.sort_by_key(|datum| datum.index);
        }

        Ok(data.into_iter().map(|datum| datum.embedding).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn client_for(server: &MockServer) -> AzureOpenAiEmbeddingClient {
        AzureOpenAiEmbeddingClient::new(
            &server.base_url(),
            "model-key",
            "2024-02-01",
            "text-embedding-ada-002",
        )
        .expect("client")
    }

    #[tokio::test]
    async fn returns_vectors_in_input_order() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/openai/deployments/text-embedding-ada-002/embeddings")
                    .query_param("api-version", "2024-02-01")
                    .header("api-key", "model-key")
                    .json_body(json!({ "input": ["first", "second"] }));
                then.status(200).json_body(json!({
                    "data": [
                        { "index": 1, "embedding": [0.0, 1.0] },
                        { "index": 0, "embedding": [1.0, 0.0] }
                    ]
                }));
            })
            .await;

        let vectors = client_for(&server)
            .generate_embeddings(vec!["first".into(), "second".into()])
            .await
            .expect("embeddings");

        mock.assert_async().await;
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn surfaces_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/openai/deployments/text-embedding-ada-002/embeddings");
                then.status(429).body("rate limited");
            })
            .await;

        let error = client_for(&server)
            .generate_embeddings(vec!["text".into()])
            .await
            .expect_err("error status");

        assert!(matches!(
            error,
            EmbeddingClientError::UnexpectedStatus { status, .. } if status == StatusCode::TOO_MANY_REQUESTS
        ));
    }

    #[tokio::test]
    async fn rejects_short_response() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/openai/deployments/text-embedding-ada-002/embeddings");
                then.status(200)
                    .json_body(json!({ "data": [ { "index": 0, "embedding": [0.5] } ] }));
            })
            .await;

        let error = client_for(&server)
            .generate_embeddings(vec!["a".into(), "b".into()])
            .await
            .expect_err("count mismatch");

        assert!(matches!(error, EmbeddingClientError::GenerationFailed(message) if message.contains("expected 2")));
    }

    #[tokio::test]
    async fn rejects_empty_input() {
        let server = MockServer::start_async().await;
        let error = client_for(&server)
            .generate_embeddings(Vec::new())
            .await
            .expect_err("empty input");
        assert!(matches!(error, EmbeddingClientError::GenerationFailed(_)));
    }
}
