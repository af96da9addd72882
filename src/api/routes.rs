//! HTTP API route definitions.

use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::any;
use axum::Router;
use strum::{Display, EnumString, IntoStaticStr};
use tower_http::trace::TraceLayer;

use crate::metrics;

use super::guard::allowed_host;
use super::handlers::{company, health, search, updated, AppState};

/// Routes served by the API, as reported in metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
pub enum Route {
    /// Company lookup (the fallback).
    #[strum(serialize = "/company")]
    Company,
    /// Update marker.
    #[strum(serialize = "/updated")]
    Updated,
    /// Liveness check.
    #[strum(serialize = "/healthz")]
    Health,
    /// Paginated search.
    #[strum(serialize = "/search")]
    Search,
}

impl Route {
    fn of(request: &Request) -> Self {
        request
            .extensions()
            .get::<MatchedPath>()
            .and_then(|p| p.as_str().parse().ok())
            .unwrap_or(Route::Company)
    }
}

async fn track_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let route = Route::of(&request);

    let response = next.run(request).await;

    metrics::record_http_request(start, route.into(), response.status().as_u16());
    response
}

/// Create the API router.
///
/// Every route, the fallback included, sits behind the host guard.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/updated", any(updated))
        .route("/healthz", any(health))
        .route("/search", any(search))
        // Anything else is a CNPJ lookup, masked ones included
        .fallback(company)
        .layer(middleware::from_fn_with_state(state.clone(), allowed_host))
        .layer(middleware::from_fn(track_requests))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
