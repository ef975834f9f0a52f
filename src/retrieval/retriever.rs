//! Mode-parameterized retrieval over the chunk index.

use crate::config::Config;
use crate::embedding::{EmbeddingClient, EmbeddingClientError};
use crate::generation::{ChatMessage, CompletionClient, GroundingSource};
use crate::ingest::stats::now_rfc3339;
use crate::retrieval::types::{ContextExcerpt, Query, RetrievalError, RetrievalResult};
use crate::search::{IndexStore, SearchKind, SearchMode, StoreQuery, StoredChunk};
use std::sync::Arc;

/// System instruction for grounded completions.
pub const GROUNDED_SYSTEM_PROMPT: &str = "You are a travel assistant. Based on the search results \
from the travel brochures, provide helpful information about travel destinations, \
accommodations, and services. Use only the retrieved documents.";

/// Where the index lives and how each mode is parameterized.
#[derive(Debug, Clone)]
pub struct SearchTarget {
    /// Search service endpoint handed to the grounded completion.
    pub endpoint: String,
    /// Index holding the chunks.
    pub index_name: String,
    /// Query key for the search service.
    pub api_key: String,
    /// Embedding deployment used by vector queries.
    pub embedding_deployment: String,
    /// Semantic configuration used by semantic queries.
    pub semantic_configuration: String,
}

impl SearchTarget {
    /// Derive the target from loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            endpoint: config.search_endpoint.clone(),
            index_name: config.index_name.clone(),
            api_key: config.search_api_key.clone(),
            embedding_deployment: config.embedding_model.clone(),
            semantic_configuration: config.semantic_config.clone(),
        }
    }

    /// Fully parameterized mode for `kind`.
    pub fn mode(&self, kind: SearchKind) -> SearchMode {
        match kind {
            SearchKind::Vector => SearchMode::Vector {
                embedding_deployment: self.embedding_deployment.clone(),
            },
            SearchKind::Semantic => SearchMode::Semantic {
                configuration: self.semantic_configuration.clone(),
            },
        }
    }
}

/// Fetches relevant context for a question, either as a grounded completion or as raw chunks.
pub struct Retriever {
    completion: Arc<dyn CompletionClient>,
    embeddings: Arc<dyn EmbeddingClient>,
    store: Arc<dyn IndexStore>,
    target: SearchTarget,
}

impl Retriever {
    /// Build a retriever over the given capabilities.
    pub fn new(
        completion: Arc<dyn CompletionClient>,
        embeddings: Arc<dyn EmbeddingClient>,
        store: Arc<dyn IndexStore>,
        target: SearchTarget,
    ) -> Self {
        Self {
            completion,
            embeddings,
            store,
            target,
        }
    }

    /// Pair `text` with the configured parameters for `kind`.
    pub fn query(&self, text: impl Into<String>, kind: SearchKind) -> Query {
        Query {
            text: text.into(),
            mode: self.target.mode(kind),
        }
    }

    /// Ask the model to answer `query` with the index attached as its data source.
    ///
    /// The platform performs the ranking and grounding; this call only relays the answer and the
    /// passages it cites. An index with nothing relevant produces an empty context list.
    pub async fn retrieve(&self, query: &Query) -> Result<RetrievalResult, RetrievalError> {
        let text = query.text.trim();
        if text.is_empty() {
            return Err(RetrievalError::EmptyQuery);
        }

        let grounding = GroundingSource {
            endpoint: self.target.endpoint.clone(),
            index_name: self.target.index_name.clone(),
            api_key: self.target.api_key.clone(),
            mode: query.mode.clone(),
        };
        let messages = vec![
            ChatMessage::system(GROUNDED_SYSTEM_PROMPT),
            ChatMessage::user(text),
        ];

        let mode = query.mode.kind();
        tracing::debug!(mode = mode.as_str(), index = %self.target.index_name, "Grounded retrieval");
        let completion = self.completion.complete(messages, Some(&grounding)).await?;
        let context_chunks: Vec<ContextExcerpt> = completion
            .citations
            .unwrap_or_default()
            .into_iter()
            .map(ContextExcerpt::from)
            .collect();
        tracing::info!(
            mode = mode.as_str(),
            citations = context_chunks.len(),
            input_tokens = completion.usage.input_tokens,
            output_tokens = completion.usage.output_tokens,
            "Retrieval complete"
        );

        Ok(RetrievalResult {
            mode,
            query: text.to_string(),
            content: completion.text,
            context_chunks: Some(context_chunks),
            timestamp: now_rfc3339(),
        })
    }

    /// Top `top_k` chunks for `query`, fetched from the index directly.
    pub async fn search(
        &self,
        query: &Query,
        top_k: usize,
    ) -> Result<Vec<StoredChunk>, RetrievalError> {
        let text = query.text.trim();
        if text.is_empty() {
            return Err(RetrievalError::EmptyQuery);
        }

        let store_query = match &query.mode {
            SearchMode::Vector { .. } => {
                let vector = self
                    .embeddings
                    .generate_embeddings(vec![text.to_string()])
                    .await?
                    .into_iter()
                    .next()
                    .filter(|vector| !vector.is_empty())
                    .ok_or_else(|| {
                        EmbeddingClientError::GenerationFailed(
                            "no embedding returned for query".into(),
                        )
                    })?;
                StoreQuery::Vector(vector)
            }
            SearchMode::Semantic { configuration } => StoreQuery::Semantic {
                text: text.to_string(),
                configuration: configuration.clone(),
            },
        };

        let chunks = self
            .store
            .search(&self.target.index_name, &store_query, top_k)
            .await?;
        tracing::debug!(
            mode = query.mode.kind().as_str(),
            top_k,
            found = chunks.len(),
            "Index search complete"
        );
        Ok(chunks)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::generation::{Citation, Completion, GenerationError, Role};
    use crate::search::{IndexDocument, IndexSchema, ItemOutcome, SearchError};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Completion fake that records every call and replies with canned output.
    #[derive(Default)]
    pub(crate) struct CannedCompletion {
        pub(crate) reply: String,
        pub(crate) citations: Option<Vec<Citation>>,
        pub(crate) calls: Mutex<Vec<(Vec<ChatMessage>, Option<SearchKind>)>>,
    }

    #[async_trait]
    impl CompletionClient for CannedCompletion {
        async fn complete(
            &self,
            messages: Vec<ChatMessage>,
            grounding: Option<&GroundingSource>,
        ) -> Result<Completion, GenerationError> {
            self.calls
                .lock()
                .expect("lock")
                .push((messages, grounding.map(|source| source.mode.kind())));
            Ok(Completion {
                text: self.reply.clone(),
                usage: Default::default(),
                citations: self.citations.clone(),
            })
        }
    }

    /// Embedding fake returning a constant vector.
    pub(crate) struct ConstantEmbedding;

    #[async_trait]
    impl EmbeddingClient for ConstantEmbedding {
        async fn generate_embeddings(
            &self,
            texts: Vec<String>,
        ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
            Ok(texts.iter().map(|_| vec![0.5, 0.5]).collect())
        }
    }

    /// Store fake serving a fixed result list and recording the queries it saw.
    #[derive(Default)]
    pub(crate) struct FixedStore {
        pub(crate) chunks: Vec<StoredChunk>,
        pub(crate) queries: Mutex<Vec<(StoreQuery, usize)>>,
    }

    #[async_trait]
    impl IndexStore for FixedStore {
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
            query: &StoreQuery,
            top_k: usize,
        ) -> Result<Vec<StoredChunk>, SearchError> {
            self.queries
                .lock()
                .expect("lock")
                .push((query.clone(), top_k));
            Ok(self.chunks.iter().take(top_k).cloned().collect())
        }
    }

    pub(crate) fn target() -> SearchTarget {
        SearchTarget {
            endpoint: "https://search.example.net".into(),
            index_name: "travel".into(),
            api_key: "search-key".into(),
            embedding_deployment: "text-embedding-ada-002".into(),
            semantic_configuration: "azureml-default".into(),
        }
    }

    pub(crate) fn stored(id: &str, content: &str) -> StoredChunk {
        StoredChunk {
            id: id.into(),
            score: 0.9,
            content: content.into(),
            title: Some("paris".into()),
            source: Some("docs/paris.pdf".into()),
            chunk_index: Some(0),
        }
    }

    #[tokio::test]
    async fn retrieve_relays_answer_and_citations() {
        let completion = Arc::new(CannedCompletion {
            reply: "The Grand Paris Hotel.".into(),
            citations: Some(vec![Citation {
                content: "The Grand Paris Hotel offers...".into(),
                title: Some("paris".into()),
                filepath: Some("docs/paris.pdf".into()),
                chunk_id: Some("0".into()),
            }]),
            ..Default::default()
        });
        let retriever = Retriever::new(
            completion.clone(),
            Arc::new(ConstantEmbedding),
            Arc::new(FixedStore::default()),
            target(),
        );

        let result = retriever
            .retrieve(&retriever.query("  Hotels in Paris? ", SearchKind::Semantic))
            .await
            .expect("retrieve");

        assert_eq!(result.mode, SearchKind::Semantic);
        assert_eq!(result.query, "Hotels in Paris?");
        assert_eq!(result.content, "The Grand Paris Hotel.");
        let context = result.context_chunks.expect("context");
        assert_eq!(context.len(), 1);
        assert_eq!(context[0].source.as_deref(), Some("docs/paris.pdf"));

        let calls = completion.calls.lock().expect("lock");
        assert_eq!(calls[0].1, Some(SearchKind::Semantic));
        assert_eq!(calls[0].0[0].role, Role::System);
    }

    #[tokio::test]
    async fn empty_index_yields_empty_context_not_error() {
        let completion = Arc::new(CannedCompletion::default());
        let retriever = Retriever::new(
            completion,
            Arc::new(ConstantEmbedding),
            Arc::new(FixedStore::default()),
            target(),
        );

        let result = retriever
            .retrieve(&retriever.query("Anything?", SearchKind::Vector))
            .await
            .expect("retrieve");

        assert_eq!(result.content, "");
        assert_eq!(result.context_chunks, Some(Vec::new()));
    }

    #[tokio::test]
    async fn blank_query_is_rejected() {
        let retriever = Retriever::new(
            Arc::new(CannedCompletion::default()),
            Arc::new(ConstantEmbedding),
            Arc::new(FixedStore::default()),
            target(),
        );

        let error = retriever
            .retrieve(&retriever.query("   ", SearchKind::Vector))
            .await
            .expect_err("blank");

        assert!(matches!(error, RetrievalError::EmptyQuery));
    }

    #[tokio::test]
    async fn vector_search_embeds_the_question() {
        let store = Arc::new(FixedStore {
            chunks: vec![stored("a", "one"), stored("b", "two"), stored("c", "three")],
            ..Default::default()
        });
        let retriever = Retriever::new(
            Arc::new(CannedCompletion::default()),
            Arc::new(ConstantEmbedding),
            store.clone(),
            target(),
        );

        let chunks = retriever
            .search(&retriever.query("Paris", SearchKind::Vector), 2)
            .await
            .expect("search");

        assert_eq!(chunks.len(), 2);
        let queries = store.queries.lock().expect("lock");
        assert!(matches!(&queries[0], (StoreQuery::Vector(v), 2) if v == &vec![0.5, 0.5]));
    }

    #[tokio::test]
    async fn empty_query_embedding_is_an_error_and_skips_the_store() {
        struct EmptyEmbedding;

        #[async_trait]
        impl EmbeddingClient for EmptyEmbedding {
            async fn generate_embeddings(
                &self,
                texts: Vec<String>,
            ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
                Ok(texts.iter().map(|_| Vec::new()).collect())
            }
        }

        let store = Arc::new(FixedStore::default());
        let retriever = Retriever::new(
            Arc::new(CannedCompletion::default()),
            Arc::new(EmptyEmbedding),
            store.clone(),
            target(),
        );

        let error = retriever
            .search(&retriever.query("Paris", SearchKind::Vector), 3)
            .await
            .expect_err("empty embedding");

        assert!(matches!(
            error,
            RetrievalError::Embedding(EmbeddingClientError::GenerationFailed(_))
        ));
        assert!(store.queries.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn semantic_search_passes_configuration() {
        let store = Arc::new(FixedStore::default());
        let retriever = Retriever::new(
            Arc::new(CannedCompletion::default()),
            Arc::new(ConstantEmbedding),
            store.clone(),
            target(),
        );

        let chunks = retriever
            .search(&retriever.query("Paris", SearchKind::Semantic), 3)
            .await
            .expect("search");

        assert!(chunks.is_empty());
        let queries = store.queries.lock().expect("lock");
        assert!(matches!(
            &queries[0],
            (StoreQuery::Semantic { configuration, .. }, 3) if configuration == "azureml-default"
        ));
    }
}
