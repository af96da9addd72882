//! HTTP API handlers.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::http::{header, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use percent_encoding::percent_decode_str;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::cnpj;
use crate::config::Config;
use crate::error::{self, ApiError, StorageError};
use crate::storage::{Storage, UPDATED_AT};

use super::envelope::{Envelope, ErrorSink};
use super::pagination::{SearchRequest, SearchResponse};

/// Company lookups may be cached for a day: the snapshot only changes
/// between publication cycles.
pub const CACHE_CONTROL: &str = "max-age=86400";

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Registry store.
    pub storage: Arc<dyn Storage>,
    /// Response builder writing to the operational error channel.
    pub envelope: Envelope,
    /// Host requests must be addressed to, if any.
    pub allowed_host: Option<String>,
    /// Where `GET /` redirects to.
    pub docs_url: String,
    /// Upper bound for the health check's storage ping.
    pub health_timeout: Duration,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("allowed_host", &self.allowed_host)
            .field("docs_url", &self.docs_url)
            .field("health_timeout", &self.health_timeout)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Create state with the default settings and no host restriction.
    pub fn new(storage: Arc<dyn Storage>, errors: Arc<dyn ErrorSink>) -> Self {
        let config = Config::default();
        Self {
            storage,
            envelope: Envelope::new(errors),
            allowed_host: None,
            docs_url: config.docs_url.clone(),
            health_timeout: config.health_timeout(),
        }
    }

    /// Create state from loaded configuration.
    pub fn from_config(
        config: &Config,
        storage: Arc<dyn Storage>,
        errors: Arc<dyn ErrorSink>,
    ) -> Self {
        Self {
            allowed_host: config.allowed_host().map(str::to_string),
            docs_url: config.docs_url.clone(),
            health_timeout: config.health_timeout(),
            ..Self::new(storage, errors)
        }
    }

    /// Restrict requests to `host`. An empty value disables the check.
    pub fn with_allowed_host(mut self, host: impl Into<String>) -> Self {
        let host = host.into();
        self.allowed_host = (!host.is_empty()).then_some(host);
        self
    }

    /// Set the health check timeout.
    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

fn read_only(method: &Method) -> error::Result<()> {
    if method == Method::GET || method == Method::HEAD {
        Ok(())
    } else {
        Err(ApiError::MethodNotAllowed {
            method: method.clone(),
            allowed: "GET",
        })
    }
}

/// Company lookup handler - serves `/{cnpj}` and redirects `/` to the docs.
#[instrument(skip_all, fields(method = %method, path = %uri.path()))]
pub async fn company(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    if let Err(e) = read_only(&method) {
        return state.envelope.error(&e);
    }

    // Masked CNPJs may arrive with an encoded slash
    let path = percent_decode_str(uri.path()).decode_utf8_lossy();
    let id = path.trim_start_matches('/');
    if id.is_empty() {
        return match HeaderValue::from_str(&state.docs_url) {
            Ok(location) => (StatusCode::FOUND, [(header::LOCATION, location)]).into_response(),
            Err(_) => state
                .envelope
                .message(StatusCode::INTERNAL_SERVER_ERROR, "documentation URL is invalid"),
        };
    }
    if !cnpj::is_valid(id) {
        return state
            .envelope
            .error(&ApiError::InvalidIdentifier(id.to_string()));
    }

    match state.storage.get_company(&cnpj::unmask(id)).await {
        Ok(body) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, HeaderValue::from_static("application/json")),
                (header::CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL)),
            ],
            body,
        )
            .into_response(),
        Err(e) if e.is_not_found() => state.envelope.error(&ApiError::NotFound(id.to_string())),
        Err(e) => state
            .envelope
            .error(&ApiError::storage("could not fetch this CNPJ", e)),
    }
}

/// Metadata handler - returns the date the snapshot was last updated.
#[instrument(skip_all)]
pub async fn updated(State(state): State<AppState>, method: Method) -> Response {
    if let Err(e) = read_only(&method) {
        return state.envelope.error(&e);
    }

    match state.storage.meta_read(UPDATED_AT).await {
        Ok(value) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            )],
            value,
        )
            .into_response(),
        Err(e) if e.is_not_found() => state.envelope.error(&ApiError::MissingMetadata(UPDATED_AT)),
        Err(e) => state
            .envelope
            .error(&ApiError::storage("could not read the update date", e)),
    }
}

/// Health check handler - returns 200 when storage answers in time, 503
/// otherwise.
#[instrument(skip_all)]
pub async fn health(State(state): State<AppState>, method: Method) -> Response {
    if let Err(e) = read_only(&method) {
        return state.envelope.error(&e);
    }

    let outcome = tokio::time::timeout(state.health_timeout, state.storage.ping())
        .await
        .unwrap_or_else(|_| {
            Err(StorageError::Unavailable(format!(
                "no answer within {:?}",
                state.health_timeout
            )))
        });

    match outcome {
        Ok(()) => state
            .envelope
            .json(StatusCode::OK, &HealthResponse { status: "ok" }),
        Err(e) => state.envelope.error(&ApiError::Unavailable(e.to_string())),
    }
}

/// Search handler - paginated free-form search over the registry.
#[instrument(skip_all, fields(method = %method))]
pub async fn search(
    State(state): State<AppState>,
    method: Method,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    if method != Method::POST {
        return state.envelope.error(&ApiError::MethodNotAllowed {
            method,
            allowed: "POST",
        });
    }

    let body = match body {
        Ok(b) => b,
        Err(rejection) => return state.envelope.error(&ApiError::from(rejection)),
    };

    let request: SearchRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => return state.envelope.error(&ApiError::MalformedBody(e)),
    };

    let query = request.into_query();
    debug!(
        page = query.page,
        results = query.results,
        offset = query.offset,
        filters = query.filters.len(),
        "Running search"
    );

    match state.storage.search(&query).await {
        Ok(results) => state
            .envelope
            .json(StatusCode::OK, &SearchResponse::new(results, query.page)),
        Err(e) => state.envelope.error(&ApiError::storage("search failed", e)),
    }
}
