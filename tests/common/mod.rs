//! In-memory stand-ins for the embedding, completion and search services.

#![allow(dead_code)]

use async_trait::async_trait;
use ragline::embedding::{EmbeddingClient, EmbeddingClientError};
use ragline::generation::{ChatMessage, Completion, CompletionClient, GenerationError, GroundingSource};
use ragline::ingest::IngestSettings;
use ragline::search::{
    IndexDocument, IndexSchema, ItemOutcome, SearchError, StoreQuery, StoredChunk,
};
use ragline::search::IndexStore;
use reqwest::StatusCode;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

pub const DIMENSION: usize = 8;

/// Bag-of-letters embedding: similar texts get similar vectors.
pub struct LetterEmbedding;

pub fn letter_vector(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0; DIMENSION];
    for byte in text.bytes().filter(u8::is_ascii_alphabetic) {
        vector[(byte.to_ascii_lowercase() - b'a') as usize % DIMENSION] += 1.0;
    }
    vector
}

#[async_trait]
impl EmbeddingClient for LetterEmbedding {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        Ok(texts.iter().map(|text| letter_vector(text)).collect())
    }
}

/// Index store kept in memory.
#[derive(Default)]
pub struct MemoryStore {
    pub indexes: Mutex<Vec<String>>,
    pub documents: Mutex<Vec<IndexDocument>>,
    pub create_calls: Mutex<usize>,
    pub upload_calls: Mutex<usize>,
    pub rejected: HashSet<String>,
    pub fail_upload_call: Option<usize>,
}

fn dot(left: &[f32], right: &[f32]) -> f64 {
    left.iter()
        .zip(right)
        .map(|(a, b)| f64::from(*a) * f64::from(*b))
        .sum()
}

#[async_trait]
impl IndexStore for MemoryStore {
    async fn list_indexes(&self) -> Result<Vec<String>, SearchError> {
        Ok(self.indexes.lock().expect("lock").clone())
    }

    async fn create_index(&self, schema: &IndexSchema) -> Result<(), SearchError> {
        *self.create_calls.lock().expect("lock") += 1;
        self.indexes.lock().expect("lock").push(schema.name.clone());
        Ok(())
    }

    async fn upload_documents(
        &self,
        _index: &str,
        documents: Vec<IndexDocument>,
    ) -> Result<Vec<ItemOutcome>, SearchError> {
        let mut calls = self.upload_calls.lock().expect("lock");
        if self.fail_upload_call == Some(*calls) {
            return Err(SearchError::UnexpectedStatus {
                status: StatusCode::SERVICE_UNAVAILABLE,
                body: "service unavailable".into(),
            });
        }
        *calls += 1;

        let mut stored = self.documents.lock().expect("lock");
        Ok(documents
            .into_iter()
            .map(|document| {
                let id = document.id.clone();
                if self.rejected.contains(&id) {
                    ItemOutcome {
                        id,
                        succeeded: false,
                        error_message: Some("document rejected".into()),
                    }
                } else {
                    stored.push(document);
                    ItemOutcome {
                        id,
                        succeeded: true,
                        error_message: None,
                    }
                }
            })
            .collect())
    }

    async fn search(
        &self,
        _index: &str,
        query: &StoreQuery,
        top_k: usize,
    ) -> Result<Vec<StoredChunk>, SearchError> {
        let documents = self.documents.lock().expect("lock");
        let mut scored: Vec<(f64, &IndexDocument)> = documents
            .iter()
            .map(|document| {
                let score = match query {
                    StoreQuery::Vector(vector) => dot(vector, &document.content_vector),
                    StoreQuery::Semantic { text, .. } => text
                        .split_whitespace()
                        .filter(|word| document.content.contains(word))
                        .count() as f64,
                };
                (score, document)
            })
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(score, document)| StoredChunk {
                id: document.id.clone(),
                score,
                content: document.content.clone(),
                title: Some(document.title.clone()),
                source: Some(document.source.clone()),
                chunk_index: Some(document.chunk_index),
            })
            .collect())
    }
}

/// Completion fake that answers with the first context line it was given.
#[derive(Default)]
pub struct EchoCompletion {
    pub prompts: Mutex<Vec<Vec<ChatMessage>>>,
    pub grounded_modes: Mutex<Vec<String>>,
}

#[async_trait]
impl CompletionClient for EchoCompletion {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        grounding: Option<&GroundingSource>,
    ) -> Result<Completion, GenerationError> {
        if let Some(source) = grounding {
            self.grounded_modes
                .lock()
                .expect("lock")
                .push(source.mode.kind().as_str().to_string());
        }
        let answer = messages
            .last()
            .and_then(|message| {
                message
                    .content
                    .split("Context from search results:\n")
                    .nth(1)
                    .and_then(|rest| rest.lines().next())
                    .map(str::to_string)
            })
            .unwrap_or_default();
        self.prompts.lock().expect("lock").push(messages);
        Ok(Completion {
            text: answer,
            ..Default::default()
        })
    }
}

pub fn settings(results_dir: &Path) -> IngestSettings {
    IngestSettings {
        index_name: "travel".into(),
        embedding_dimension: DIMENSION,
        semantic_configuration: Some("azureml-default".into()),
        chunk_size: 1000,
        chunk_overlap: 200,
        embedding_batch_size: 50,
        upload_batch_size: 100,
        results_dir: results_dir.to_path_buf(),
    }
}
