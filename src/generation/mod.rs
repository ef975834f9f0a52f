//! Chat completion client, optionally grounded on the search index.
//!
//! Plain completions send a message list and return the model's text. Grounded completions
//! attach the index as a data source; the serving platform then performs retrieval itself and
//! returns the passages it used as citations alongside the answer.

use crate::config::Config;
use crate::http::{build_client, failure_parts, format_endpoint, normalize_base_url};
use crate::search::SearchMode;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

/// Errors surfaced by the completion provider.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Endpoint URL failed to parse.
    #[error("Invalid completion endpoint: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Provider returned an error response.
    #[error("Unexpected completion response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the provider.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Provider response did not contain a usable choice.
    #[error("Malformed completion response: {0}")]
    InvalidResponse(String),
}

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions for the model.
    System,
    /// End-user input.
    User,
    /// Prior model output.
    Assistant,
}

/// One entry of a chat transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    /// Author of the message.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// System message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// User message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Index handed to the model as a retrieval data source.
#[derive(Debug, Clone)]
pub struct GroundingSource {
    /// Search service endpoint.
    pub endpoint: String,
    /// Index holding the chunks.
    pub index_name: String,
    /// Key the platform uses to query the index.
    pub api_key: String,
    /// Retrieval mode the platform should use.
    pub mode: SearchMode,
}

impl GroundingSource {
    /// Render the `data_sources` entry for this source.
    pub fn to_data_source(&self) -> Value {
        let mut parameters = Map::new();
        parameters.insert("endpoint".into(), Value::from(self.endpoint.as_str()));
        parameters.insert("index_name".into(), Value::from(self.index_name.as_str()));
        parameters.insert(
            "authentication".into(),
            json!({ "type": "api_key", "key": self.api_key }),
        );
        parameters.insert(
            "query_type".into(),
            Value::from(self.mode.kind().as_str()),
        );
        match &self.mode {
            SearchMode::Vector {
                embedding_deployment,
            } => {
                parameters.insert(
                    "embedding_dependency".into(),
                    json!({
                        "type": "deployment_name",
                        "deployment_name": embedding_deployment,
                    }),
                );
            }
            SearchMode::Semantic { configuration } => {
                parameters.insert(
                    "semantic_configuration".into(),
                    Value::from(configuration.as_str()),
                );
            }
        }
        json!({ "type": "azure_search", "parameters": parameters })
    }
}

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    /// Prompt tokens.
    pub input_tokens: u32,
    /// Generated tokens.
    pub output_tokens: u32,
}

/// Passage the platform retrieved while grounding a completion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Passage text.
    #[serde(default)]
    pub content: String,
    /// Title of the originating document.
    #[serde(default)]
    pub title: Option<String>,
    /// File path of the originating document.
    #[serde(default)]
    pub filepath: Option<String>,
    /// Chunk identifier inside the originating document.
    #[serde(default)]
    pub chunk_id: Option<String>,
}

/// Model output for one completion call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    /// Generated text (empty when the model returned no content).
    pub text: String,
    /// Token usage.
    pub usage: TokenUsage,
    /// Retrieval context; `None` when the call was not grounded or the platform sent none.
    pub citations: Option<Vec<Citation>>,
}

/// Interface implemented by chat completion providers.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Run one completion, grounded on `grounding` when supplied.
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        grounding: Option<&GroundingSource>,
    ) -> Result<Completion, GenerationError>;
}

/// Chat client for an OpenAI-compatible deployment endpoint.
pub struct AzureOpenAiChatClient {
    http: Client,
    base_url: String,
    api_key: String,
    api_version: String,
    deployment: String,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    context: Option<ChatContext>,
}

#[derive(Deserialize)]
struct ChatContext {
    #[serde(default)]
    citations: Vec<Citation>,
}

#[derive(Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

impl AzureOpenAiChatClient {
    /// Build a client against an explicit endpoint and deployment.
    pub fn new(
        endpoint: &str,
        api_key: impl Into<String>,
        api_version: impl Into<String>,
        deployment: impl Into<String>,
        temperature: f32,
    ) -> Result<Self, GenerationError> {
        let base_url = normalize_base_url(endpoint).map_err(GenerationError::InvalidUrl)?;
        Ok(Self {
            http: build_client("ragline/chat")?,
            base_url,
            api_key: api_key.into(),
            api_version: api_version.into(),
            deployment: deployment.into(),
            temperature,
        })
    }

    /// Build a client from the loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self, GenerationError> {
        Self::new(
            &config.openai_endpoint,
            config.openai_api_key.clone(),
            config.openai_api_version.clone(),
            config.chat_model.clone(),
            config.chat_temperature,
        )
    }

    fn endpoint(&self) -> String {
        format_endpoint(
            &self.base_url,
            &format!("openai/deployments/{}/chat/completions", self.deployment),
        )
    }
}

#[async_trait]
impl CompletionClient for AzureOpenAiChatClient {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        grounding: Option<&GroundingSource>,
    ) -> Result<Completion, GenerationError> {
        let mut payload = json!({
            "messages": messages,
            "temperature": self.temperature,
        });
        if let Some(source) = grounding
            && let Some(object) = payload.as_object_mut()
        {
            object.insert(
                "data_sources".into(),
                Value::Array(vec![source.to_data_source()]),
            );
        }

        tracing::debug!(
            deployment = %self.deployment,
            grounded = grounding.is_some(),
            "Requesting chat completion"
        );

        let response = self
            .http
            .post(self.endpoint())
            .query(&[("api-version", self.api_version.as_str())])
            .header("api-key", &self.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = failure_parts(response).await;
            let error = GenerationError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Chat completion failed");
            return Err(error);
        }

        let body: ChatResponse = response.json().await?;
        let usage = body
            .usage
            .map(|usage| TokenUsage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            })
            .unwrap_or_default();
        let choice = body.choices.into_iter().next().ok_or_else(|| {
            GenerationError::InvalidResponse("response contained no choices".into())
        })?;

        Ok(Completion {
            text: choice.message.content.unwrap_or_default(),
            usage,
            citations: choice.message.context.map(|context| context.citations),
        })
    }
}
