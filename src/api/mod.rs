//! HTTP API module: company lookup, update marker, health and search.

pub mod envelope;
pub mod guard;
pub mod handlers;
pub mod pagination;
pub mod routes;

pub use envelope::{Envelope, ErrorSink, RecordingSink, TracingErrorSink};
pub use handlers::AppState;
pub use routes::create_router;
