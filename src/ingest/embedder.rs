//! Batched embedding of chunk text.

use crate::embedding::EmbeddingClient;
use crate::ingest::types::{Chunk, EmbeddedChunk, EmbeddingServiceError};
use std::sync::Arc;

/// Attaches a vector to every chunk, one provider call per batch.
pub struct Embedder {
    client: Arc<dyn EmbeddingClient>,
    batch_size: usize,
    dimension: usize,
}

impl Embedder {
    /// Build an embedder. A zero `batch_size` is treated as one.
    pub fn new(client: Arc<dyn EmbeddingClient>, batch_size: usize, dimension: usize) -> Self {
        Self {
            client,
            batch_size: batch_size.max(1),
            dimension,
        }
    }

    /// Embed `chunks`, preserving order and length.
    ///
    /// Batches run sequentially. Any failed batch aborts the whole call; no partial result is
    /// returned.
    pub async fn embed(
        &self,
        chunks: Vec<Chunk>,
    ) -> Result<Vec<EmbeddedChunk>, EmbeddingServiceError> {
        let total = chunks.len();
        let batches = total.div_ceil(self.batch_size);
        let mut embedded = Vec::with_capacity(total);
        let mut remaining = chunks.into_iter().peekable();
        let mut batch = 0usize;

        while remaining.peek().is_some() {
            let group: Vec<Chunk> = remaining.by_ref().take(self.batch_size).collect();
            let texts = group.iter().map(|chunk| chunk.content.clone()).collect();
            tracing::debug!(batch, size = group.len(), "Embedding batch");

            let vectors = self
                .client
                .generate_embeddings(texts)
                .await
                .map_err(|source| EmbeddingServiceError::Provider { batch, source })?;
            if vectors.len() != group.len() {
                return Err(EmbeddingServiceError::CountMismatch {
                    batch,
                    expected: group.len(),
                    actual: vectors.len(),
                });
            }

            for (chunk, content_vector) in group.into_iter().zip(vectors) {
                if content_vector.len() != self.dimension {
                    return Err(EmbeddingServiceError::DimensionMismatch {
                        chunk_id: chunk.id,
                        expected: self.dimension,
                        actual: content_vector.len(),
                    });
                }
                embedded.push(EmbeddedChunk {
                    chunk,
                    content_vector,
                });
            }
            batch += 1;
            tracing::info!(progress = %format!("{batch}/{batches}"), "Embedded batch");
        }

        tracing::info!(chunks = total, batches, "Embeddings generated");
        Ok(embedded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbeddingClientError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Encodes each text's length into a vector so order can be checked.
    struct LengthEmbedder {
        dimension: usize,
        calls: Mutex<Vec<usize>>,
        fail_on_call: Option<usize>,
    }

    impl LengthEmbedder {
        fn new(dimension: usize) -> Self {
            Self {
                dimension,
                calls: Mutex::new(Vec::new()),
                fail_on_call: None,
            }
        }
    }

    #[async_trait]
    impl EmbeddingClient for LengthEmbedder {
        async fn generate_embeddings(
            &self,
            texts: Vec<String>,
        ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
            let mut calls = self.calls.lock().expect("lock");
            if self.fail_on_call == Some(calls.len()) {
                return Err(EmbeddingClientError::GenerationFailed("quota".into()));
            }
            calls.push(texts.len());
            Ok(texts
                .iter()
                .map(|text| vec![text.len() as f32; self.dimension])
                .collect())
        }
    }

    fn chunks(count: usize) -> Vec<Chunk> {
        (0..count)
            .map(|index| Chunk {
                id: format!("0_{index}_{index}"),
                content: "x".repeat(index + 1),
                title: "doc".into(),
                source: "doc.txt".into(),
                chunk_index: index,
            })
            .collect()
    }

    #[tokio::test]
    async fn output_order_is_independent_of_batch_size() {
        for batch_size in [1, 3, 7, 50] {
            let client = Arc::new(LengthEmbedder::new(4));
            let embedder = Embedder::new(client, batch_size, 4);

            let embedded = embedder.embed(chunks(7)).await.expect("embed");

            assert_eq!(embedded.len(), 7);
            for (index, item) in embedded.iter().enumerate() {
                assert_eq!(item.chunk.chunk_index, index);
                assert_eq!(item.content_vector, vec![(index + 1) as f32; 4]);
            }
        }
    }

    #[tokio::test]
    async fn batches_are_bounded() {
        let client = Arc::new(LengthEmbedder::new(2));
        let embedder = Embedder::new(client.clone(), 3, 2);

        embedder.embed(chunks(7)).await.expect("embed");

        assert_eq!(*client.calls.lock().expect("lock"), vec![3, 3, 1]);
    }

    #[tokio::test]
    async fn failing_batch_aborts_the_run() {
        let client = Arc::new(LengthEmbedder {
            fail_on_call: Some(1),
            ..LengthEmbedder::new(2)
        });
        let embedder = Embedder::new(client, 2, 2);

        let error = embedder.embed(chunks(5)).await.expect_err("failure");

        assert!(matches!(
            error,
            EmbeddingServiceError::Provider { batch: 1, .. }
        ));
    }

    #[tokio::test]
    async fn wrong_dimension_is_rejected() {
        let client = Arc::new(LengthEmbedder::new(3));
        let embedder = Embedder::new(client, 10, 1536);

        let error = embedder.embed(chunks(2)).await.expect_err("dimension");

        assert!(matches!(
            error,
            EmbeddingServiceError::DimensionMismatch {
                expected: 1536,
                actual: 3,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn empty_input_makes_no_calls() {
        let client = Arc::new(LengthEmbedder::new(2));
        let embedder = Embedder::new(client.clone(), 5, 2);

        let embedded = embedder.embed(Vec::new()).await.expect("embed");

        assert!(embedded.is_empty());
        assert!(client.calls.lock().expect("lock").is_empty());
    }
}
