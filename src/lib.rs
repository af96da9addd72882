//! Read-only JSON HTTP API over the Brazilian CNPJ company registry.
//!
//! Callers look up a company by CNPJ, read the date the registry snapshot
//! was last updated, run a paginated search and check liveness.
//!
//! # Endpoints
//!
//! ```text
//! GET  /{cnpj}    company JSON, cacheable for a day
//! GET  /updated   snapshot update date
//! GET  /healthz   liveness, 503 when storage does not answer
//! POST /search    {"page": 1, "results": 100, ...filters}
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`cnpj`]: Identifier unmasking and validation
//! - [`storage`]: Storage port, in-memory and mock stores
//! - [`api`]: Router, handlers, envelope and host guard
//! - [`metrics`]: Request metrics
//! - [`utils`]: Utility functions

pub mod api;
pub mod cnpj;
pub mod config;
pub mod error;
pub mod metrics;
pub mod storage;
pub mod utils;

pub use config::Config;
pub use error::{ApiError, Result, StorageError};
