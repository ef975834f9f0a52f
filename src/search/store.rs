//! Capability interface of the search service.

use crate::search::schema::IndexSchema;
use crate::search::types::{IndexDocument, ItemOutcome, SearchError, StoreQuery, StoredChunk};
use async_trait::async_trait;

/// Operations the pipeline needs from the search service.
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Names of every index the service holds.
    async fn list_indexes(&self) -> Result<Vec<String>, SearchError>;

    /// Create an index from `schema`.
    async fn create_index(&self, schema: &IndexSchema) -> Result<(), SearchError>;

    /// Upload one batch of documents. An `Err` means the call itself failed; rejected items
    /// come back as unsuccessful [`ItemOutcome`]s.
    async fn upload_documents(
        &self,
        index: &str,
        documents: Vec<IndexDocument>,
    ) -> Result<Vec<ItemOutcome>, SearchError>;

    /// Return up to `top_k` stored chunks ranked by relevance.
    async fn search(
        &self,
        index: &str,
        query: &StoreQuery,
        top_k: usize,
    ) -> Result<Vec<StoredChunk>, SearchError>;
}
