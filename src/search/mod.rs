//! Search service integration: index schema, management, uploads and queries.

pub mod client;
pub mod manager;
pub mod schema;
pub mod store;
pub mod types;

pub use client::AzureSearchService;
pub use manager::{EnsureOutcome, IndexCreationError, IndexManager};
pub use schema::IndexSchema;
pub use store::IndexStore;
pub use types::{
    IndexDocument, ItemOutcome, SearchError, SearchKind, SearchMode, StoreQuery, StoredChunk,
};
