//! Mock storage for unit testing.
//!
//! This module provides a mock store that can be used in tests
//! without a real database, with configurable failures and latency.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::async_trait;
use serde_json::Value;

use crate::error::StorageError;

use super::{SearchQuery, Storage};

/// Configuration for mock storage behavior.
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Whether company lookups fail.
    pub fail_get: bool,
    /// Whether metadata reads fail.
    pub fail_meta: bool,
    /// Whether searches fail.
    pub fail_search: bool,
    /// Whether the reachability check fails.
    pub fail_ping: bool,
    /// Simulated latency in milliseconds.
    pub latency_ms: u64,
}

/// Mock storage for testing.
#[derive(Debug, Clone, Default)]
pub struct MockStorage {
    /// Mock configuration.
    config: MockConfig,
    /// Serialized companies by CNPJ.
    companies: Arc<Mutex<HashMap<String, String>>>,
    /// Metadata values.
    metadata: Arc<Mutex<HashMap<String, String>>>,
    /// Items every search returns.
    search_results: Arc<Mutex<Vec<Value>>>,
    /// Queries received by `search`.
    queries: Arc<Mutex<Vec<SearchQuery>>>,
    /// Number of calls made to any method.
    calls: Arc<AtomicUsize>,
}

impl MockStorage {
    /// Create a new mock store with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock store with custom configuration.
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Store a serialized company.
    pub fn set_company(&self, cnpj: &str, json: &str) {
        lock(&self.companies).insert(cnpj.to_string(), json.to_string());
    }

    /// Store a metadata value.
    pub fn set_metadata(&self, key: &str, value: &str) {
        lock(&self.metadata).insert(key.to_string(), value.to_string());
    }

    /// Set the items returned by every search.
    pub fn set_search_results(&self, items: Vec<Value>) {
        *lock(&self.search_results) = items;
    }

    /// Number of storage calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The most recent search query, if any.
    pub fn last_query(&self) -> Option<SearchQuery> {
        lock(&self.queries).last().cloned()
    }

    async fn enter(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.config.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.latency_ms)).await;
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl Storage for MockStorage {
    async fn get_company(&self, cnpj: &str) -> Result<String, StorageError> {
        self.enter().await;
        if self.config.fail_get {
            return Err(StorageError::Unavailable("mock lookup failure".to_string()));
        }
        lock(&self.companies)
            .get(cnpj)
            .cloned()
            .ok_or_else(|| StorageError::not_found(cnpj))
    }

    async fn meta_read(&self, key: &str) -> Result<String, StorageError> {
        self.enter().await;
        if self.config.fail_meta {
            return Err(StorageError::Query("mock metadata failure".to_string()));
        }
        lock(&self.metadata)
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::not_found(key))
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Value>, StorageError> {
        self.enter().await;
        lock(&self.queries).push(query.clone());
        if self.config.fail_search {
            return Err(StorageError::Query("mock search failure".to_string()));
        }
        Ok(lock(&self.search_results).clone())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        self.enter().await;
        if self.config.fail_ping {
            return Err(StorageError::Unavailable("mock ping failure".to_string()));
        }
        Ok(())
    }
}
