//! Storage port consumed by the HTTP handlers.
//!
//! This module handles:
//! - The [`Storage`] trait the API depends on
//! - The normalized [`SearchQuery`] handed to implementations
//! - An in-memory implementation serving a JSON snapshot
//! - A mock implementation for testing

pub mod memory;
pub mod mock;

use axum::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::StorageError;

pub use memory::MemoryStorage;
pub use mock::{MockConfig, MockStorage};

/// Metadata key holding the date the registry snapshot was published.
pub const UPDATED_AT: &str = "updated-at";

/// A search as seen by storage: pagination already normalized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchQuery {
    /// Page number, starting at 1.
    pub page: u64,
    /// Page size, at least 1.
    pub results: u64,
    /// Number of items to skip: `(page - 1) * results`.
    pub offset: u64,
    /// Free-form filters sent by the client.
    pub filters: Map<String, Value>,
}

/// Data access the API needs from the registry store.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Fetch one company, already serialized as JSON, by unmasked CNPJ.
    async fn get_company(&self, cnpj: &str) -> Result<String, StorageError>;

    /// Read a metadata value by key.
    async fn meta_read(&self, key: &str) -> Result<String, StorageError>;

    /// Run a paginated search.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Value>, StorageError>;

    /// Check the store is reachable.
    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
