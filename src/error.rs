//! Unified error types for the registry API.

use axum::extract::rejection::BytesRejection;
use axum::http::{Method, StatusCode};
use thiserror::Error;

/// Errors raised by a storage implementation.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The requested record does not exist.
    #[error("record {key} not found")]
    NotFound {
        /// The key that was looked up.
        key: String,
    },

    /// The backing store could not be reached.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// The store was reached but the query failed.
    #[error("query failed: {0}")]
    Query(String),

    /// A dataset file had an unexpected shape.
    #[error("invalid dataset: {0}")]
    InvalidDataset(String),

    /// IO error while reading a dataset.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error while reading a dataset.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StorageError {
    /// Build a not-found error for `key`.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Whether this error means the record is absent rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Errors converted into HTTP responses by the envelope.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request used a method the route does not serve.
    #[error("method {method} not allowed, expected {allowed}")]
    MethodNotAllowed {
        /// Method that was used.
        method: Method,
        /// Human-readable list of accepted methods.
        allowed: &'static str,
    },

    /// The path does not hold a valid CNPJ.
    #[error("invalid CNPJ {0}")]
    InvalidIdentifier(String),

    /// The search body is not a valid search request.
    #[error("malformed search request: {0}")]
    MalformedBody(#[source] serde_json::Error),

    /// The request body could not be read (too large, or the client went away).
    #[error("could not read request body: {reason}")]
    BodyRead {
        /// Status the framework assigned to the failure.
        status: StatusCode,
        /// Framework-provided reason.
        reason: String,
    },

    /// No company with this CNPJ.
    #[error("CNPJ {0} not found")]
    NotFound(String),

    /// The request host does not match the allowed host.
    #[error("host {0:?} is not allowed")]
    HostNotAllowed(String),

    /// A metadata key the API depends on is missing.
    #[error("metadata {0} is missing")]
    MissingMetadata(&'static str),

    /// Storage failed while serving a request.
    #[error("{context}: {source}")]
    Storage {
        /// What the handler was doing.
        context: &'static str,
        /// Underlying failure.
        #[source]
        source: StorageError,
    },

    /// A dependency is down or too slow.
    #[error("dependency unavailable: {0}")]
    Unavailable(String),

    /// A response body could not be encoded.
    #[error("could not encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ApiError {
    /// Wrap a storage failure with the message clients will see.
    pub fn storage(context: &'static str, source: StorageError) -> Self {
        Self::Storage { context, source }
    }

    /// Status code this error is answered with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::InvalidIdentifier(_) | Self::MalformedBody(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::HostNotAllowed(_) => StatusCode::FORBIDDEN,
            Self::BodyRead { status, .. } => *status,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::MissingMetadata(_) | Self::Storage { .. } | Self::Encode(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message written in the response body. Never includes internal detail.
    pub fn public_message(&self) -> String {
        match self {
            Self::MethodNotAllowed { allowed, .. } => {
                format!("this endpoint only accepts {allowed}")
            }
            Self::InvalidIdentifier(id) => format!("CNPJ {id} is invalid."),
            Self::MalformedBody(_) => "could not decode the search request JSON".to_string(),
            Self::NotFound(id) => format!("CNPJ {id} not found."),
            Self::HostNotAllowed(host) => format!("host {host} is not allowed"),
            Self::MissingMetadata(_) => "no update marker available".to_string(),
            Self::Storage { context, .. } => (*context).to_string(),
            Self::BodyRead { .. } => "could not read the request body".to_string(),
            Self::Unavailable(_) => "storage is unavailable".to_string(),
            Self::Encode(_) => "could not encode the response".to_string(),
        }
    }

    /// Operator-facing detail, when it differs from the public message.
    pub fn detail(&self) -> Option<String> {
        match self {
            Self::MalformedBody(e) | Self::Encode(e) => Some(e.to_string()),
            Self::BodyRead { reason, .. } => Some(reason.clone()),
            Self::Storage { source, .. } => Some(source.to_string()),
            Self::Unavailable(reason) => Some(reason.clone()),
            Self::MissingMetadata(key) => Some(format!("metadata key {key} not found")),
            _ => None,
        }
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        Self::BodyRead {
            status: rejection.status(),
            reason: rejection.body_text(),
        }
    }
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, ApiError>;
