#![deny(missing_docs)]

//! Core library for ragline, a retrieval-augmented question-answering pipeline.

/// HTTP routing and REST handlers.
pub mod api;
/// Component wiring from configuration.
pub mod app;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Chat completion client, plain and grounded.
pub mod generation;
/// Shared HTTP client helpers.
pub(crate) mod http;
/// Document ingestion pipeline.
pub mod ingest;
/// Structured logging and tracing setup.
pub mod logging;
/// Retrieval and answer composition.
pub mod retrieval;
/// Search index integration.
pub mod search;
