//! Core data types and error definitions for the ingestion pipeline.

use crate::embedding::EmbeddingClientError;
use crate::search::{IndexCreationError, SearchError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

/// Text extracted from one page or section of a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Extracted text.
    pub content: String,
    /// File the text came from.
    pub source_path: PathBuf,
    /// File stem of `source_path`.
    pub title: String,
    /// Extractor-specific details (`format`, `page`, `total_pages`).
    pub format_metadata: BTreeMap<String, String>,
}

/// Bounded span of a document's text; the unit stored and retrieved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// `{document}_{chunk}_{running}` ordinals, unique within a run.
    pub id: String,
    /// Chunk text.
    pub content: String,
    /// Title of the originating document.
    pub title: String,
    /// Path of the originating document.
    pub source: String,
    /// Position of the chunk within its document.
    pub chunk_index: usize,
}

/// Chunk paired with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbeddedChunk {
    /// The chunk.
    #[serde(flatten)]
    pub chunk: Chunk,
    /// Embedding of `chunk.content`; length equals the configured dimension.
    pub content_vector: Vec<f32>,
}

/// Text extraction failed for one file; the file is skipped.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// File could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// Directory entry could not be visited.
    #[error("failed to walk {path}: {message}")]
    Walk {
        /// Entry that failed.
        path: PathBuf,
        /// Walker diagnostic.
        message: String,
    },
    /// Format library rejected the file.
    #[error("failed to parse {format} file {path}: {message}")]
    Format {
        /// Format being parsed.
        format: &'static str,
        /// File being parsed.
        path: PathBuf,
        /// Parser diagnostic.
        message: String,
    },
}

/// Splitting failed for one document; the document is skipped.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Splitter configured with an impossible size.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Overlap must leave room for new text in every chunk.
    #[error("chunk overlap {overlap} must be smaller than chunk size {chunk_size}")]
    OverlapTooLarge {
        /// Requested overlap.
        overlap: usize,
        /// Requested chunk size.
        chunk_size: usize,
    },
    /// Document had no text to split (for example a scanned PDF page).
    #[error("document {source_path} has no extractable text")]
    NoContent {
        /// Originating file.
        source_path: PathBuf,
    },
}

/// A batch failed to embed; the whole run stops because no chunk may be indexed without its
/// vector.
#[derive(Debug, Error)]
pub enum EmbeddingServiceError {
    /// Provider call failed.
    #[error("embedding batch {batch} failed: {source}")]
    Provider {
        /// Zero-based batch number.
        batch: usize,
        /// Provider failure.
        #[source]
        source: EmbeddingClientError,
    },
    /// Provider returned the wrong number of vectors.
    #[error("embedding batch {batch} returned {actual} vectors for {expected} texts")]
    CountMismatch {
        /// Zero-based batch number.
        batch: usize,
        /// Texts sent.
        expected: usize,
        /// Vectors received.
        actual: usize,
    },
    /// Provider returned a vector of the wrong length.
    #[error("embedding for chunk {chunk_id} has dimension {actual}, expected {expected}")]
    DimensionMismatch {
        /// Chunk whose vector was wrong.
        chunk_id: String,
        /// Configured dimension.
        expected: usize,
        /// Received dimension.
        actual: usize,
    },
}

/// An upload call failed outright; later batches are not attempted and earlier ones stay.
#[derive(Debug, Error)]
#[error("upload batch {batch} failed after {uploaded} documents were accepted: {source}")]
pub struct UploadTransportError {
    /// Zero-based batch number.
    pub batch: usize,
    /// Documents accepted by earlier batches.
    pub uploaded: usize,
    /// Service failure.
    #[source]
    pub source: SearchError,
}

/// Run statistics could not be written.
#[derive(Debug, Error)]
pub enum StatsError {
    /// Filesystem failure.
    #[error("failed to write run statistics to {path}: {source}")]
    Io {
        /// Target file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// Serialization failure.
    #[error("failed to serialize run statistics: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors that abort an ingestion run.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Root path does not exist; nothing was written.
    #[error("Document path not found: {0}")]
    PathNotFound(PathBuf),
    /// The blocking document walk panicked or was cancelled.
    #[error("Document loading task failed: {0}")]
    LoadTask(#[from] tokio::task::JoinError),
    /// Index could not be ensured.
    #[error(transparent)]
    IndexCreation(#[from] IndexCreationError),
    /// Embedding step failed.
    #[error("Failed to generate embeddings: {0}")]
    EmbeddingService(#[from] EmbeddingServiceError),
    /// Upload call failed.
    #[error("Failed to upload documents: {0}")]
    UploadTransport(#[from] UploadTransportError),
    /// Statistics file could not be written.
    #[error(transparent)]
    Stats(#[from] StatsError),
}

/// Aggregate of per-batch upload outcomes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadResult {
    /// Documents sent.
    pub attempted: usize,
    /// Documents the service accepted.
    pub succeeded: usize,
    /// Keys of rejected documents, in upload order.
    pub failed_ids: Vec<String>,
}

impl UploadResult {
    /// Fold another batch result into this one.
    pub fn absorb(&mut self, other: UploadResult) {
        self.attempted += other.attempted;
        self.succeeded += other.succeeded;
        self.failed_ids.extend(other.failed_ids);
    }
}

/// A file that produced no documents, and why.
#[derive(Debug)]
pub struct LoadFailure {
    /// File or directory entry.
    pub path: PathBuf,
    /// Cause.
    pub error: ExtractionError,
}

/// Documents extracted under a root plus the files that failed.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    /// Extracted documents in walk order.
    pub documents: Vec<Document>,
    /// Per-file failures.
    pub failures: Vec<LoadFailure>,
}

/// A document that produced no chunks, and why.
#[derive(Debug)]
pub struct ChunkFailure {
    /// Zero-based position of the document in the run.
    pub document_index: usize,
    /// Originating file.
    pub source_path: PathBuf,
    /// Cause.
    pub error: ChunkingError,
}

/// Chunks produced for a run plus the documents that failed.
#[derive(Debug, Default)]
pub struct ChunkOutcome {
    /// Chunks in document order, then chunk order.
    pub chunks: Vec<Chunk>,
    /// Per-document failures.
    pub failures: Vec<ChunkFailure>,
}

/// Summary of a completed ingestion run.
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Identifier shared by this run's log lines and statistics file.
    pub run_id: String,
    /// Documents extracted.
    pub documents_count: usize,
    /// Chunks produced.
    pub chunks_count: usize,
    /// Whether the index had to be created during this run.
    pub index_created: bool,
    /// Aggregated upload outcome.
    pub upload: UploadResult,
    /// Files skipped during extraction.
    pub extraction_failures: Vec<LoadFailure>,
    /// Documents skipped during chunking.
    pub chunking_failures: Vec<ChunkFailure>,
    /// Where the statistics file was written, when the run got that far.
    pub stats_path: Option<PathBuf>,
}
