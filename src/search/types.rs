//! Shared types used by the search service client and the index manager.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned while interacting with the search service.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid search service URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The service responded with an unexpected status code.
    #[error("Unexpected search service response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the service.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
}

/// How the index is queried. Each variant carries the parameters it cannot work without.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchMode {
    /// Nearest-neighbour comparison between the query embedding and stored content vectors.
    Vector {
        /// Embedding deployment used to vectorize the query.
        embedding_deployment: String,
    },
    /// Ranking through a named semantic configuration on the index.
    Semantic {
        /// Semantic configuration name.
        configuration: String,
    },
}

impl SearchMode {
    /// Discriminant without parameters, suitable for reporting.
    pub fn kind(&self) -> SearchKind {
        match self {
            Self::Vector { .. } => SearchKind::Vector,
            Self::Semantic { .. } => SearchKind::Semantic,
        }
    }
}

/// Parameterless label for a [`SearchMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    /// Vector search.
    Vector,
    /// Semantic search.
    Semantic,
}

impl SearchKind {
    /// Wire name used by the grounded-generation data source (`query_type`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vector => "vector",
            Self::Semantic => "semantic",
        }
    }
}

/// Query payload accepted by [`IndexStore::search`].
#[derive(Debug, Clone)]
pub enum StoreQuery {
    /// Pre-computed query embedding.
    Vector(Vec<f32>),
    /// Free text ranked by a semantic configuration.
    Semantic {
        /// Query text.
        text: String,
        /// Semantic configuration name.
        configuration: String,
    },
}

/// Document written to the index; field names match the chunk schema.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct IndexDocument {
    /// Key field.
    pub id: String,
    /// Chunk text.
    pub content: String,
    /// Title of the originating file.
    pub title: String,
    /// Path of the originating file.
    pub source: String,
    /// Position of the chunk within its document.
    pub chunk_index: i32,
    /// Embedding of `content`.
    pub content_vector: Vec<f32>,
}

/// Per-item outcome reported by an upload call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    /// Key of the document the outcome refers to.
    pub id: String,
    /// Whether the service accepted the document.
    pub succeeded: bool,
    /// Rejection reason reported by the service.
    pub error_message: Option<String>,
}

/// Stored chunk returned by a search, ordered by relevance.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StoredChunk {
    /// Key field.
    pub id: String,
    /// Relevance score reported by the service.
    #[serde(rename = "@search.score", default)]
    pub score: f64,
    /// Chunk text.
    #[serde(default)]
    pub content: String,
    /// Title of the originating file.
    #[serde(default)]
    pub title: Option<String>,
    /// Path of the originating file.
    #[serde(default)]
    pub source: Option<String>,
    /// Position of the chunk within its document.
    #[serde(default)]
    pub chunk_index: Option<i32>,
}

#[derive(Deserialize)]
pub(crate) struct ListIndexesResponse {
    #[serde(default)]
    pub(crate) value: Vec<IndexName>,
}

#[derive(Deserialize)]
pub(crate) struct IndexName {
    pub(crate) name: String,
}

#[derive(Serialize)]
pub(crate) struct UploadRequest {
    pub(crate) value: Vec<UploadAction>,
}

#[derive(Serialize)]
pub(crate) struct UploadAction {
    #[serde(rename = "@search.action")]
    pub(crate) action: &'static str,
    #[serde(flatten)]
    pub(crate) document: IndexDocument,
}

#[derive(Deserialize)]
pub(crate) struct UploadResponse {
    #[serde(default)]
    pub(crate) value: Vec<UploadItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UploadItem {
    pub(crate) key: String,
    pub(crate) status: bool,
    #[serde(default)]
    pub(crate) error_message: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub(crate) value: Vec<StoredChunk>,
}
