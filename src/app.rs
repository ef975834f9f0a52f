//! Component wiring from a loaded [`Config`].
//!
//! Every long-lived client is built once here and shared through `Arc`, so the CLI and the HTTP
//! surface run against the same instances.

use crate::config::Config;
use crate::embedding::{AzureOpenAiEmbeddingClient, EmbeddingClient, EmbeddingClientError};
use crate::generation::{AzureOpenAiChatClient, CompletionClient, GenerationError};
use crate::ingest::{ChunkingError, IngestSettings, IngestionPipeline};
use crate::retrieval::{AnswerComposer, AnswerLog, Retriever, SearchTarget};
use crate::search::{AzureSearchService, IndexStore, SearchError};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// A component could not be constructed from configuration.
#[derive(Debug, Error)]
pub enum SetupError {
    /// Embedding client setup failed.
    #[error("Failed to initialize embedding client: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Chat client setup failed.
    #[error("Failed to initialize chat client: {0}")]
    Generation(#[from] GenerationError),
    /// Search client setup failed.
    #[error("Failed to initialize search client: {0}")]
    Search(#[from] SearchError),
    /// Chunking settings were rejected.
    #[error("Invalid chunking settings: {0}")]
    Chunking(#[from] ChunkingError),
}

/// Fully wired write and read paths.
pub struct App {
    /// Ingestion pipeline.
    pub pipeline: IngestionPipeline,
    /// Grounded retriever, shared with the composer.
    pub retriever: Arc<Retriever>,
    /// Top-k answer composer.
    pub composer: Arc<AnswerComposer>,
    /// Directory receiving stats, answers and comparisons.
    pub results_dir: PathBuf,
}

impl App {
    /// Build every component from `config`.
    pub fn from_config(config: &Config) -> Result<Self, SetupError> {
        let embeddings: Arc<dyn EmbeddingClient> =
            Arc::new(AzureOpenAiEmbeddingClient::from_config(config)?);
        let completion: Arc<dyn CompletionClient> =
            Arc::new(AzureOpenAiChatClient::from_config(config)?);
        let store: Arc<dyn IndexStore> = Arc::new(AzureSearchService::from_config(config)?);

        Self::with_clients(config, embeddings, completion, store).map_err(SetupError::from)
    }

    /// Build every component around the supplied capability clients.
    pub fn with_clients(
        config: &Config,
        embeddings: Arc<dyn EmbeddingClient>,
        completion: Arc<dyn CompletionClient>,
        store: Arc<dyn IndexStore>,
    ) -> Result<Self, ChunkingError> {
        let pipeline = IngestionPipeline::new(
            embeddings.clone(),
            store.clone(),
            IngestSettings::from_config(config),
        )?;
        let retriever = Arc::new(Retriever::new(
            completion.clone(),
            embeddings,
            store,
            SearchTarget::from_config(config),
        ));
        let composer = Arc::new(AnswerComposer::new(
            retriever.clone(),
            completion,
            AnswerLog::in_dir(&config.results_dir),
            config.answer_top_k,
        ));
        tracing::debug!(
            index = %config.index_name,
            results_dir = %config.results_dir.display(),
            "Components initialized"
        );

        Ok(Self {
            pipeline,
            retriever,
            composer,
            results_dir: config.results_dir.clone(),
        })
    }
}
