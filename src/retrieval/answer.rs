//! Top-k grounded answers with an append-only record of every interaction.

use crate::generation::{ChatMessage, CompletionClient};
use crate::ingest::stats::now_rfc3339;
use crate::retrieval::{
    log::AnswerLog,
    retriever::Retriever,
    types::{AnswerError, AnswerRecord},
};
use crate::search::SearchKind;
use async_trait::async_trait;
use std::sync::Arc;

/// Instruction template; `{context}` and `{question}` are substituted per call.
pub const PROMPT_TEMPLATE: &str = "You are a travel assistant. Based on the provided information \
from the travel brochures, provide helpful information about travel destinations, \
accommodations, and services.

Context from search results:
{context}

User question: {question}

Answer (use only information from the context):
";

/// Retrieval mode the composer always uses.
pub const COMPOSER_MODE: SearchKind = SearchKind::Vector;

/// Fill the template with a context block and a question.
///
/// Placeholders are resolved in a single scan of the template; substituted text is never
/// rescanned, so braces inside documents or questions pass through untouched.
pub fn render_prompt(context: &str, question: &str) -> String {
    let mut rendered =
        String::with_capacity(PROMPT_TEMPLATE.len() + context.len() + question.len());
    let mut rest = PROMPT_TEMPLATE;
    while let Some(open) = rest.find('{') {
        rendered.push_str(&rest[..open]);
        let tail = &rest[open..];
        if let Some(after) = tail.strip_prefix("{context}") {
            rendered.push_str(context);
            rest = after;
        } else if let Some(after) = tail.strip_prefix("{question}") {
            rendered.push_str(question);
            rest = after;
        } else {
            rendered.push('{');
            rest = &tail[1..];
        }
    }
    rendered.push_str(rest);
    rendered
}

/// Question-answering surface used by the CLI and HTTP layers.
#[async_trait]
pub trait AnswerApi: Send + Sync {
    /// Answer `question` and record the interaction.
    async fn ask(&self, question: &str) -> Result<AnswerRecord, AnswerError>;
}

/// Answers questions from the top-k indexed chunks and logs each answer.
pub struct AnswerComposer {
    retriever: Arc<Retriever>,
    completion: Arc<dyn CompletionClient>,
    log: AnswerLog,
    top_k: usize,
}

impl AnswerComposer {
    /// Build a composer that grounds on `top_k` chunks and records answers in `log`.
    pub fn new(
        retriever: Arc<Retriever>,
        completion: Arc<dyn CompletionClient>,
        log: AnswerLog,
        top_k: usize,
    ) -> Self {
        Self {
            retriever,
            completion,
            log,
            top_k: top_k.max(1),
        }
    }

    /// Answer log backing this composer.
    pub fn log(&self) -> &AnswerLog {
        &self.log
    }
}

#[async_trait]
impl AnswerApi for AnswerComposer {
    async fn ask(&self, question: &str) -> Result<AnswerRecord, AnswerError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AnswerError::EmptyQuestion);
        }

        let query = self.retriever.query(question, COMPOSER_MODE);
        let chunks = self.retriever.search(&query, self.top_k).await?;
        let context = chunks
            .iter()
            .map(|chunk| chunk.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        if chunks.is_empty() {
            tracing::warn!(question, "No context found for question");
        }

        let prompt = render_prompt(&context, question);
        let completion = self
            .completion
            .complete(vec![ChatMessage::user(prompt)], None)
            .await?;

        let record = AnswerRecord {
            timestamp: now_rfc3339(),
            question: question.to_string(),
            answer: completion.text,
        };
        tracing::info!(
            question,
            context_chunks = chunks.len(),
            answer_chars = record.answer.chars().count(),
            "Question answered"
        );
        self.log.append(&record).await?;
        Ok(record)
    }
}
