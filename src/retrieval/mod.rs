//! Read path: grounded retrieval, top-k answers and the answer log.

pub mod answer;
pub mod compare;
pub mod log;
pub mod retriever;
pub mod types;

pub use answer::{AnswerApi, AnswerComposer, COMPOSER_MODE, PROMPT_TEMPLATE, render_prompt};
pub use compare::{COMPARISON_FILE_NAME, ComparisonError, ComparisonReport, compare};
pub use log::{ANSWER_LOG_FILE_NAME, AnswerLog};
pub use retriever::{GROUNDED_SYSTEM_PROMPT, Retriever, SearchTarget};
pub use types::{
    AnswerError, AnswerLogError, AnswerRecord, ContextExcerpt, Query, RetrievalError,
    RetrievalResult,
};
