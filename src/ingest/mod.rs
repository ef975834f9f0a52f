//! Write path: turn a directory of documents into indexed, embedded chunks.
//!
//! The stages are usable on their own (`load_documents`, [`Chunker`], [`Embedder`],
//! [`Uploader`]) and are wired together by [`IngestionPipeline`].

pub mod chunking;
pub mod embedder;
pub mod extract;
pub mod loader;
pub mod service;
pub mod stats;
pub mod types;
pub mod uploader;

pub use chunking::Chunker;
pub use embedder::Embedder;
pub use extract::DocumentFormat;
pub use loader::load_documents;
pub use service::{IngestSettings, IngestionPipeline};
pub use stats::{RunStats, STATS_FILE_NAME};
pub use types::{
    Chunk, ChunkFailure, ChunkOutcome, ChunkingError, Document, EmbeddedChunk,
    EmbeddingServiceError, ExtractionError, IngestError, IngestReport, LoadFailure, LoadOutcome,
    StatsError, UploadResult, UploadTransportError,
};
pub use uploader::Uploader;
