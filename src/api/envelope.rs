//! Response envelope and the operational error channel.
//!
//! Every handler builds its responses through [`Envelope`] so that error
//! bodies share one shape and every 500 reaches operators exactly once.

use std::sync::{Arc, Mutex, PoisonError};

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::error::ApiError;
use crate::metrics;

/// Diagnostic written when a 500 is answered without a message.
pub const NO_MESSAGE: &str = "no error message supplied";

/// Append-only sink for operational errors.
pub trait ErrorSink: Send + Sync {
    /// Record one error line.
    fn write(&self, line: &str);
}

/// Production sink: emits on a dedicated tracing target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn write(&self, line: &str) {
        metrics::inc_operational_errors();
        error!(target: "cnpj_api::operational", "{}", line);
    }
}

/// Sink keeping every line in memory, for tests and diagnostics.
#[derive(Debug, Default)]
pub struct RecordingSink {
    lines: Mutex<Vec<String>>,
}

impl RecordingSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines written so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ErrorSink for RecordingSink {
    fn write(&self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_string());
    }
}

/// Body of every non-empty error response.
#[derive(Debug, Serialize)]
pub struct ErrorMessage<'a> {
    /// Human-readable description.
    pub message: &'a str,
}

/// Builds responses and mirrors server errors to the error channel.
#[derive(Clone)]
pub struct Envelope {
    errors: Arc<dyn ErrorSink>,
}

impl std::fmt::Debug for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Envelope").finish_non_exhaustive()
    }
}

impl Envelope {
    /// Create an envelope writing to `errors`.
    pub fn new(errors: Arc<dyn ErrorSink>) -> Self {
        Self { errors }
    }

    /// Respond with `status` and `{"message": message}`, or no body at all
    /// when `message` is empty.
    pub fn message(&self, status: StatusCode, message: &str) -> Response {
        self.wrap(status, &ErrorMessage { message }, message, None)
    }

    /// Respond with an error, logging its detail once.
    pub fn error(&self, err: &ApiError) -> Response {
        let status = err.status();
        let detail = err.detail();
        match (status, &detail) {
            (StatusCode::INTERNAL_SERVER_ERROR, _) => {}
            (s, Some(d)) if s.is_server_error() => warn!(status = s.as_u16(), detail = %d, "{}", err),
            (s, _) => debug!(status = s.as_u16(), "{}", err),
        }
        let message = err.public_message();
        self.wrap(status, &ErrorMessage { message: &message }, &message, detail.as_deref())
    }

    /// Respond with a JSON-encoded success payload.
    pub fn json<T: Serialize>(&self, status: StatusCode, value: &T) -> Response {
        match serde_json::to_vec(value) {
            Ok(body) => json_response(status, body),
            Err(e) => self.error(&ApiError::Encode(e)),
        }
    }

    fn wrap<T: Serialize>(
        &self,
        status: StatusCode,
        body: &T,
        message: &str,
        detail: Option<&str>,
    ) -> Response {
        if message.is_empty() {
            if status == StatusCode::INTERNAL_SERVER_ERROR {
                self.errors.write(NO_MESSAGE);
            }
            return status.into_response();
        }

        let body = match serde_json::to_vec(body) {
            Ok(b) => b,
            Err(e) => {
                self.errors
                    .write(&format!("could not wrap message in JSON: {message} ({e})"));
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            let text = String::from_utf8_lossy(&body);
            match detail {
                Some(d) => self.errors.write(&format!("{text}: {d}")),
                None => self.errors.write(&text),
            }
        }

        json_response(status, body)
    }
}

fn json_response(status: StatusCode, body: Vec<u8>) -> Response {
    (
        status,
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        )],
        body,
    )
        .into_response()
}
