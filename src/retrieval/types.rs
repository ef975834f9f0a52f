//! Shared types and error definitions for the read path.

use crate::embedding::EmbeddingClientError;
use crate::generation::{Citation, GenerationError};
use crate::search::{SearchError, SearchKind, SearchMode, StoredChunk};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// A question paired with the retrieval mode to answer it with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Question text.
    pub text: String,
    /// Retrieval mode and its parameters.
    pub mode: SearchMode,
}

/// One passage used as grounding context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextExcerpt {
    /// Passage text.
    pub content: String,
    /// Title of the originating document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Path of the originating document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Chunk key in the index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_id: Option<String>,
    /// Relevance score reported by the index, when the passage came from a direct search.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl From<Citation> for ContextExcerpt {
    fn from(citation: Citation) -> Self {
        Self {
            content: citation.content,
            title: citation.title,
            source: citation.filepath,
            chunk_id: citation.chunk_id,
            score: None,
        }
    }
}

impl From<StoredChunk> for ContextExcerpt {
    fn from(chunk: StoredChunk) -> Self {
        Self {
            content: chunk.content,
            title: chunk.title,
            source: chunk.source,
            chunk_id: Some(chunk.id),
            score: Some(chunk.score),
        }
    }
}

/// Outcome of one grounded retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// Mode the retrieval ran in.
    pub mode: SearchKind,
    /// Question text.
    pub query: String,
    /// Generated answer; empty when the model produced nothing.
    pub content: String,
    /// Passages the platform grounded on, in citation order.
    pub context_chunks: Option<Vec<ContextExcerpt>>,
    /// RFC 3339 time the result was produced.
    pub timestamp: String,
}

/// One entry of the answer log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    /// RFC 3339 time the answer was produced.
    pub timestamp: String,
    /// Question as asked (trimmed).
    pub question: String,
    /// Raw model answer.
    pub answer: String,
}

/// Failures while retrieving for a single question.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Query text was blank.
    #[error("Query text is empty")]
    EmptyQuery,
    /// Query embedding failed.
    #[error("Failed to embed query: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Index search failed.
    #[error("Search request failed: {0}")]
    Search(#[from] SearchError),
    /// Grounded completion failed.
    #[error("Grounded completion failed: {0}")]
    Generation(#[from] GenerationError),
}

/// Answer log could not be read or written.
#[derive(Debug, Error)]
pub enum AnswerLogError {
    /// Filesystem failure.
    #[error("Answer log I/O failed at {path}: {source}")]
    Io {
        /// Log file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// Existing file is not a JSON array of answer records.
    #[error("Answer log {path} is not a JSON array of records: {source}")]
    Corrupt {
        /// Log file.
        path: PathBuf,
        /// Parse failure.
        #[source]
        source: serde_json::Error,
    },
    /// Records could not be serialized.
    #[error("Failed to serialize answer log: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Failures while answering a single question. None of them touch the index.
#[derive(Debug, Error)]
pub enum AnswerError {
    /// Question was blank after trimming.
    #[error("Question is required")]
    EmptyQuestion,
    /// Context retrieval failed.
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
    /// Answer generation failed.
    #[error("Failed to generate answer: {0}")]
    Generation(#[from] GenerationError),
    /// Answer was produced but could not be recorded.
    #[error(transparent)]
    Log(#[from] AnswerLogError),
}
