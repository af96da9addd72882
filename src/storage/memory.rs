//! In-memory storage backed by a JSON snapshot file.
//!
//! The snapshot looks like:
//!
//! ```json
//! {
//!   "metadata": { "updated-at": "2024-05-10" },
//!   "companies": [ { "cnpj": "33683111000280", "razao_social": "..." } ]
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use axum::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::cnpj;
use crate::error::StorageError;

use super::{SearchQuery, Storage};

#[derive(Debug, Default, Deserialize)]
struct Snapshot {
    #[serde(default)]
    metadata: HashMap<String, String>,
    #[serde(default)]
    companies: Vec<Value>,
}

/// A company kept both as a value (for filtering) and as the JSON served
/// by lookups.
#[derive(Debug, Clone)]
struct Record {
    value: Value,
    serialized: String,
}

/// Storage serving an immutable snapshot from memory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    /// Companies keyed by unmasked CNPJ, in CNPJ order.
    companies: BTreeMap<String, Record>,
    /// Metadata values.
    metadata: HashMap<String, String>,
}

impl MemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot file from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let storage = Self::from_json(&raw)?;
        info!(
            path = %path.display(),
            companies = storage.len(),
            "Loaded registry snapshot"
        );
        Ok(storage)
    }

    /// Build a store from snapshot JSON text.
    pub fn from_json(raw: &str) -> Result<Self, StorageError> {
        let snapshot: Snapshot = serde_json::from_str(raw)?;
        let mut storage = Self {
            companies: BTreeMap::new(),
            metadata: snapshot.metadata,
        };
        for company in snapshot.companies {
            storage.insert(company)?;
        }
        Ok(storage)
    }

    /// Add a company. It must carry a valid `cnpj` field.
    pub fn insert(&mut self, company: Value) -> Result<(), StorageError> {
        let key = company
            .get("cnpj")
            .and_then(Value::as_str)
            .map(cnpj::unmask)
            .ok_or_else(|| StorageError::InvalidDataset("company without a cnpj field".into()))?;
        if !cnpj::is_valid(&key) {
            return Err(StorageError::InvalidDataset(format!("invalid CNPJ {key}")));
        }
        let serialized = serde_json::to_string(&company)?;
        self.companies.insert(
            key,
            Record {
                value: company,
                serialized,
            },
        );
        Ok(())
    }

    /// Set a metadata value.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    /// Number of companies held.
    pub fn len(&self) -> usize {
        self.companies.len()
    }

    /// Whether the store holds no companies.
    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
    }
}

/// A scalar filter matches by equality, an array filter by membership and
/// a null filter matches everything.
fn matches(company: &Value, filters: &Map<String, Value>) -> bool {
    filters.iter().all(|(field, wanted)| {
        let actual = company.get(field);
        match wanted {
            Value::Null => true,
            Value::Array(options) => actual.is_some_and(|a| options.contains(a)),
            other => actual == Some(other),
        }
    })
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get_company(&self, cnpj: &str) -> Result<String, StorageError> {
        self.companies
            .get(cnpj)
            .map(|r| r.serialized.clone())
            .ok_or_else(|| StorageError::not_found(cnpj))
    }

    async fn meta_read(&self, key: &str) -> Result<String, StorageError> {
        self.metadata
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::not_found(key))
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Value>, StorageError> {
        let skip = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let take = usize::try_from(query.results).unwrap_or(usize::MAX);

        let page: Vec<Value> = self
            .companies
            .values()
            .filter(|r| matches(&r.value, &query.filters))
            .skip(skip)
            .take(take)
            .map(|r| r.value.clone())
            .collect();

        debug!(offset = query.offset, returned = page.len(), "Searched snapshot");
        Ok(page)
    }
}
