//! Batched writes of embedded chunks into the index.

use crate::ingest::types::{EmbeddedChunk, UploadResult, UploadTransportError};
use crate::search::{IndexDocument, IndexStore};
use std::collections::HashSet;
use std::sync::Arc;

/// Writes embedded chunks to one index in bounded batches.
pub struct Uploader {
    store: Arc<dyn IndexStore>,
    index_name: String,
    batch_size: usize,
}

impl Uploader {
    /// Build an uploader. A zero `batch_size` is treated as one.
    pub fn new(store: Arc<dyn IndexStore>, index_name: impl Into<String>, batch_size: usize) -> Self {
        Self {
            store,
            index_name: index_name.into(),
            batch_size: batch_size.max(1),
        }
    }

    /// Upload every chunk and tally per-item outcomes.
    ///
    /// Item rejections are counted and logged; the next batch still runs. A failed upload call
    /// stops the loop and reports how many documents earlier batches got in. Nothing is rolled
    /// back.
    pub async fn upload(
        &self,
        chunks: Vec<EmbeddedChunk>,
    ) -> Result<UploadResult, UploadTransportError> {
        let batches = chunks.len().div_ceil(self.batch_size);
        let mut result = UploadResult::default();
        let mut remaining = chunks.into_iter().peekable();
        let mut batch = 0usize;

        while remaining.peek().is_some() {
            let documents: Vec<IndexDocument> = remaining
                .by_ref()
                .take(self.batch_size)
                .map(to_index_document)
                .collect();
            let ids: Vec<String> = documents.iter().map(|doc| doc.id.clone()).collect();

            let outcomes = self
                .store
                .upload_documents(&self.index_name, documents)
                .await
                .map_err(|source| UploadTransportError {
                    batch,
                    uploaded: result.succeeded,
                    source,
                })?;

            let accepted: HashSet<&str> = outcomes
                .iter()
                .filter(|outcome| outcome.succeeded)
                .map(|outcome| outcome.id.as_str())
                .collect();
            let failed_ids: Vec<String> = ids
                .iter()
                .filter(|id| !accepted.contains(id.as_str()))
                .cloned()
                .collect();

            let batch_result = UploadResult {
                attempted: ids.len(),
                succeeded: ids.len() - failed_ids.len(),
                failed_ids,
            };
            if batch_result.failed_ids.is_empty() {
                tracing::info!(
                    progress = %format!("{}/{batches}", batch + 1),
                    uploaded = batch_result.succeeded,
                    "Batch uploaded"
                );
            } else {
                for outcome in outcomes.iter().filter(|outcome| !outcome.succeeded) {
                    tracing::debug!(
                        batch,
                        id = %outcome.id,
                        error = outcome.error_message.as_deref().unwrap_or("unknown"),
                        "Document rejected"
                    );
                }
                tracing::warn!(
                    batch,
                    attempted = batch_result.attempted,
                    succeeded = batch_result.succeeded,
                    failed = batch_result.failed_ids.len(),
                    "Batch partially failed"
                );
            }

            result.absorb(batch_result);
            batch += 1;
        }

        tracing::info!(
            index = %self.index_name,
            attempted = result.attempted,
            succeeded = result.succeeded,
            failed = result.failed_ids.len(),
            "Upload finished"
        );
        Ok(result)
    }
}

fn to_index_document(embedded: EmbeddedChunk) -> IndexDocument {
    let EmbeddedChunk {
        chunk,
        content_vector,
    } = embedded;
    IndexDocument {
        id: chunk.id,
        content: chunk.content,
        title: chunk.title,
        source: chunk.source,
        chunk_index: i32::try_from(chunk.chunk_index).unwrap_or(i32::MAX),
        content_vector,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::Chunk;
    use crate::search::{IndexSchema, ItemOutcome, SearchError, StoreQuery, StoredChunk};
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ScriptedStore {
        rejected: HashSet<String>,
        fail_on_batch: Option<usize>,
        batches: Mutex<Vec<Vec<String>>>,
    }

    #[async_trait]
    impl IndexStore for ScriptedStore {
        async fn list_indexes(&self) -> Result<Vec<String>, SearchError> {
            Ok(Vec::new())
        }

        async fn create_index(&self, _schema: &IndexSchema) -> Result<(), SearchError> {
            Ok(())
        }

        async fn upload_documents(
            &self,
            _index: &str,
            documents: Vec<IndexDocument>,
        ) -> Result<Vec<ItemOutcome>, SearchError> {
            let mut batches = self.batches.lock().expect("lock");
            if self.fail_on_batch == Some(batches.len()) {
                return Err(SearchError::UnexpectedStatus {
                    status: StatusCode::SERVICE_UNAVAILABLE,
                    body: "throttled".into(),
                });
            }
            batches.push(documents.iter().map(|doc| doc.id.clone()).collect());
            Ok(documents
                .into_iter()
                .map(|doc| {
                    let rejected = self.rejected.contains(&doc.id);
                    ItemOutcome {
                        succeeded: !rejected,
                        error_message: rejected.then(|| "field too long".to_string()),
                        id: doc.id,
                    }
                })
                .collect())
        }

        async fn search(
            &self,
            _index: &str,
            _query: &StoreQuery,
            _top_k: usize,
        ) -> Result<Vec<StoredChunk>, SearchError> {
            Ok(Vec::new())
        }
    }

    fn embedded(count: usize) -> Vec<EmbeddedChunk> {
        (0..count)
            .map(|index| EmbeddedChunk {
                chunk: Chunk {
                    id: format!("0_{index}_{index}"),
                    content: format!("chunk {index}"),
                    title: "doc".into(),
                    source: "doc.txt".into(),
                    chunk_index: index,
                },
                content_vector: vec![0.1, 0.2],
            })
            .collect()
    }

    #[tokio::test]
    async fn partial_rejections_are_tallied_and_later_batches_continue() {
        let store = Arc::new(ScriptedStore {
            rejected: ["0_1_1".to_string(), "0_4_4".to_string()].into_iter().collect(),
            ..Default::default()
        });
        let uploader = Uploader::new(store.clone(), "travel", 3);

        let result = uploader.upload(embedded(5)).await.expect("upload");

        assert_eq!(result.attempted, 5);
        assert_eq!(result.succeeded, 3);
        assert_eq!(result.failed_ids, vec!["0_1_1".to_string(), "0_4_4".to_string()]);
        assert_eq!(store.batches.lock().expect("lock").len(), 2);
    }

    #[tokio::test]
    async fn items_missing_from_the_response_count_as_failed() {
        struct SilentStore;

        #[async_trait]
        impl IndexStore for SilentStore {
            async fn list_indexes(&self) -> Result<Vec<String>, SearchError> {
                Ok(Vec::new())
            }
            async fn create_index(&self, _schema: &IndexSchema) -> Result<(), SearchError> {
                Ok(())
            }
            async fn upload_documents(
                &self,
                _index: &str,
                _documents: Vec<IndexDocument>,
            ) -> Result<Vec<ItemOutcome>, SearchError> {
                Ok(Vec::new())
            }
            async fn search(
                &self,
                _index: &str,
                _query: &StoreQuery,
                _top_k: usize,
            ) -> Result<Vec<StoredChunk>, SearchError> {
                Ok(Vec::new())
            }
        }

        let uploader = Uploader::new(Arc::new(SilentStore), "travel", 10);

        let result = uploader.upload(embedded(2)).await.expect("upload");

        assert_eq!(result.succeeded, 0);
        assert_eq!(result.failed_ids.len(), 2);
    }

    #[tokio::test]
    async fn transport_failure_stops_remaining_batches() {
        let store = Arc::new(ScriptedStore {
            fail_on_batch: Some(1),
            ..Default::default()
        });
        let uploader = Uploader::new(store.clone(), "travel", 2);

        let error = uploader.upload(embedded(6)).await.expect_err("transport");

        assert_eq!(error.batch, 1);
        assert_eq!(error.uploaded, 2);
        assert_eq!(store.batches.lock().expect("lock").len(), 1);
    }
}
