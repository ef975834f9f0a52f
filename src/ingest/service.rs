//! End-to-end ingestion run: load, chunk, ensure index, embed, upload, record stats.

use crate::config::Config;
use crate::embedding::EmbeddingClient;
use crate::ingest::{
    chunking::Chunker,
    embedder::Embedder,
    loader::load_documents,
    stats::{RunStats, now_rfc3339},
    types::{ChunkingError, IngestError, IngestReport},
    uploader::Uploader,
};
use crate::search::{EnsureOutcome, IndexManager, IndexSchema, IndexStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Tunables for one pipeline instance.
#[derive(Debug, Clone)]
pub struct IngestSettings {
    /// Target index.
    pub index_name: String,
    /// Embedding vector length.
    pub embedding_dimension: usize,
    /// Semantic ranking configuration declared on newly created indexes.
    pub semantic_configuration: Option<String>,
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Characters repeated between adjacent chunks.
    pub chunk_overlap: usize,
    /// Texts per embedding call.
    pub embedding_batch_size: usize,
    /// Documents per upload call.
    pub upload_batch_size: usize,
    /// Directory receiving `processing_stats.json`.
    pub results_dir: PathBuf,
}

impl IngestSettings {
    /// Derive settings from loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            index_name: config.index_name.clone(),
            embedding_dimension: config.embedding_dimension,
            semantic_configuration: Some(config.semantic_config.clone()),
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            embedding_batch_size: config.embedding_batch_size,
            upload_batch_size: config.upload_batch_size,
            results_dir: config.results_dir.clone(),
        }
    }
}

/// Coordinates the write path over injected embedding and index backends.
///
/// Stages run strictly one after another within a run. Two runs against the same index are not
/// coordinated; readers may see a partially uploaded index while a run is in progress.
pub struct IngestionPipeline {
    chunker: Chunker,
    embedder: Embedder,
    uploader: Uploader,
    index_manager: IndexManager,
    schema: IndexSchema,
    results_dir: PathBuf,
}

impl IngestionPipeline {
    /// Assemble a pipeline. Fails only when the chunking settings are unusable.
    pub fn new(
        embedding_client: Arc<dyn EmbeddingClient>,
        store: Arc<dyn IndexStore>,
        settings: IngestSettings,
    ) -> Result<Self, ChunkingError> {
        let chunker = Chunker::new(settings.chunk_size, settings.chunk_overlap)?;
        let schema = IndexSchema::for_chunks(
            settings.index_name.clone(),
            settings.embedding_dimension,
            settings.semantic_configuration,
        );
        Ok(Self {
            chunker,
            embedder: Embedder::new(
                embedding_client,
                settings.embedding_batch_size,
                settings.embedding_dimension,
            ),
            uploader: Uploader::new(
                store.clone(),
                settings.index_name,
                settings.upload_batch_size,
            ),
            index_manager: IndexManager::new(store),
            schema,
            results_dir: settings.results_dir,
        })
    }

    /// Ingest every supported file beneath `root`.
    ///
    /// A missing root fails before anything is written. When no documents are found the run
    /// logs a warning and returns an empty report without touching the index or the stats file.
    pub async fn run(&self, root: &Path) -> Result<IngestReport, IngestError> {
        let run_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!("ingest", run_id = %run_id);
        self.run_inner(root, run_id).instrument(span).await
    }

    async fn run_inner(&self, root: &Path, run_id: String) -> Result<IngestReport, IngestError> {
        if !tokio::fs::try_exists(root).await.unwrap_or(false) {
            return Err(IngestError::PathNotFound(root.to_path_buf()));
        }
        tracing::info!(root = %root.display(), index = %self.schema.name, "Starting ingestion");

        let walk_root = root.to_path_buf();
        let span = tracing::Span::current();
        let loaded =
            tokio::task::spawn_blocking(move || span.in_scope(|| load_documents(&walk_root)))
                .await?;
        let mut report = IngestReport {
            run_id: run_id.clone(),
            documents_count: loaded.documents.len(),
            extraction_failures: loaded.failures,
            ..Default::default()
        };
        if loaded.documents.is_empty() {
            tracing::warn!(root = %root.display(), "No documents found");
            return Ok(report);
        }

        let chunked = self.chunker.split(&loaded.documents);
        report.chunks_count = chunked.chunks.len();
        report.chunking_failures = chunked.failures;
        tracing::info!(
            documents = report.documents_count,
            chunks = report.chunks_count,
            "Documents chunked"
        );

        let ensured = self.index_manager.ensure_index(&self.schema).await?;
        report.index_created = ensured == EnsureOutcome::Created;

        let embedded = self.embedder.embed(chunked.chunks).await?;
        report.upload = self.uploader.upload(embedded).await?;

        let stats = RunStats {
            run_id,
            processed_at: now_rfc3339(),
            documents_count: report.documents_count,
            chunks_count: report.chunks_count,
            index_name: self.schema.name.clone(),
            uploaded: report.upload.succeeded,
            failed_ids: report.upload.failed_ids.clone(),
        };
        report.stats_path = Some(stats.persist(&self.results_dir).await?);

        tracing::info!(
            uploaded = report.upload.succeeded,
            failed = report.upload.failed_ids.len(),
            "Ingestion complete"
        );
        Ok(report)
    }
}
