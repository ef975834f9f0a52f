//! Side-by-side evaluation of both retrieval modes.

use crate::ingest::stats::now_rfc3339;
use crate::retrieval::{
    retriever::Retriever,
    types::{RetrievalError, RetrievalResult},
};
use crate::search::SearchKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the comparison report inside the results directory.
pub const COMPARISON_FILE_NAME: &str = "comparison.json";

const PREVIEW_CHARS: usize = 200;

/// Both modes' answers to one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    /// Question asked.
    pub query: String,
    /// RFC 3339 time the comparison finished.
    pub timestamp: String,
    /// Vector search result.
    pub vector: RetrievalResult,
    /// Semantic search result.
    pub semantic: RetrievalResult,
    /// Character count of the vector answer.
    pub vector_length: usize,
    /// Character count of the semantic answer.
    pub semantic_length: usize,
    /// First characters of the vector answer.
    pub vector_preview: String,
    /// First characters of the semantic answer.
    pub semantic_preview: String,
}

/// Comparison could not be produced or saved.
#[derive(Debug, Error)]
pub enum ComparisonError {
    /// One of the retrievals failed.
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
    /// Report could not be written.
    #[error("Failed to write comparison to {path}: {source}")]
    Io {
        /// Target file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// Report could not be serialized.
    #[error("Failed to serialize comparison: {0}")]
    Serialize(#[from] serde_json::Error),
}

fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

impl ComparisonReport {
    /// Assemble a report from the two results.
    pub fn new(query: impl Into<String>, vector: RetrievalResult, semantic: RetrievalResult) -> Self {
        Self {
            query: query.into(),
            timestamp: now_rfc3339(),
            vector_length: vector.content.chars().count(),
            semantic_length: semantic.content.chars().count(),
            vector_preview: preview(&vector.content),
            semantic_preview: preview(&semantic.content),
            vector,
            semantic,
        }
    }

    /// Write the report as pretty JSON to `results_dir/comparison.json`, replacing the previous
    /// one.
    pub async fn persist(&self, results_dir: &Path) -> Result<PathBuf, ComparisonError> {
        let path = results_dir.join(COMPARISON_FILE_NAME);
        let io_error = |source: std::io::Error| ComparisonError::Io {
            path: path.clone(),
            source,
        };
        tokio::fs::create_dir_all(results_dir)
            .await
            .map_err(io_error)?;
        let body = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&path, body).await.map_err(io_error)?;
        Ok(path)
    }
}

/// Run `question` in vector mode, then semantic mode, and save the report under `results_dir`.
pub async fn compare(
    retriever: &Retriever,
    question: &str,
    results_dir: &Path,
) -> Result<ComparisonReport, ComparisonError> {
    let vector = retriever
        .retrieve(&retriever.query(question, SearchKind::Vector))
        .await?;
    let semantic = retriever
        .retrieve(&retriever.query(question, SearchKind::Semantic))
        .await?;

    let report = ComparisonReport::new(question.trim(), vector, semantic);
    let path = report.persist(results_dir).await?;
    tracing::info!(
        path = %path.display(),
        vector_length = report.vector_length,
        semantic_length = report.semantic_length,
        "Comparison saved"
    );
    Ok(report)
}
