//! Create-if-absent management of the target index.

use crate::search::{schema::IndexSchema, store::IndexStore, types::SearchError};
use std::sync::Arc;
use thiserror::Error;

/// The index could not be confirmed or created; nothing may be written.
#[derive(Debug, Error)]
#[error("Failed to ensure index '{index}': {source}")]
pub struct IndexCreationError {
    /// Index that was being ensured.
    pub index: String,
    /// Underlying service failure.
    #[source]
    pub source: SearchError,
}

/// What [`IndexManager::ensure_index`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// An index with the requested name already existed and was left untouched.
    AlreadyPresent,
    /// The index was created from the schema.
    Created,
}

/// Ensures the target index exists before any write.
///
/// Existing indexes are never diffed against the desired schema; a matching name is enough.
pub struct IndexManager {
    store: Arc<dyn IndexStore>,
}

impl IndexManager {
    /// Build a manager over the given store.
    pub fn new(store: Arc<dyn IndexStore>) -> Self {
        Self { store }
    }

    /// Create the index described by `schema` unless one with the same name exists.
    pub async fn ensure_index(
        &self,
        schema: &IndexSchema,
    ) -> Result<EnsureOutcome, IndexCreationError> {
        let wrap = |source: SearchError| IndexCreationError {
            index: schema.name.clone(),
            source,
        };

        let existing = self.store.list_indexes().await.map_err(wrap)?;
        if existing.iter().any(|name| name == &schema.name) {
            tracing::info!(index = %schema.name, "Index already exists");
            return Ok(EnsureOutcome::AlreadyPresent);
        }

        tracing::debug!(
            index = %schema.name,
            dimension = schema.vector_field.dimension,
            "Creating index"
        );
        self.store.create_index(schema).await.map_err(wrap)?;
        tracing::info!(index = %schema.name, "Index created");
        Ok(EnsureOutcome::Created)
    }
}
