//! Host-based access guard.
//!
//! When an allowed host is configured, requests declaring any other host are
//! rejected before routing reaches a handler.

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use tracing::warn;

use crate::error::ApiError;

use super::handlers::AppState;

/// Host the request was addressed to: the `Host` header, or the URI
/// authority for absolute-form requests.
fn declared_host(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| request.uri().authority().map(|a| a.as_str()))
}

/// Whether `declared` satisfies the `allowed` host setting.
pub fn is_allowed(allowed: Option<&str>, declared: Option<&str>) -> bool {
    match allowed {
        None => true,
        Some(allowed) => declared.is_some_and(|host| host.eq_ignore_ascii_case(allowed)),
    }
}

/// Middleware rejecting requests whose host does not match the allowed host.
pub async fn allowed_host(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let allowed = state.allowed_host.as_deref();
    let declared = declared_host(&request);

    if is_allowed(allowed, declared) {
        return next.run(request).await;
    }

    let host = declared.unwrap_or_default().to_string();
    warn!(host = %host, path = %request.uri().path(), "Rejected request for disallowed host");
    state.envelope.error(&ApiError::HostNotAllowed(host))
}
