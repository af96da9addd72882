//! Integration tests for the CNPJ registry API.
//!
//! Requests go through the full router built by `create_router`, backed by
//! `MockStorage` and a `RecordingSink` standing in for the operational
//! error channel.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

use cnpj_api::api::{create_router, AppState, RecordingSink};
use cnpj_api::storage::{MemoryStorage, MockConfig, MockStorage};

const VALID: &str = "33683111000280";
const COMPANY: &str = r#"{"cnpj":"33683111000280","razao_social":"SERVICO FEDERAL DE PROCESSAMENTO DE DADOS (SERPRO)"}"#;

struct Harness {
    storage: MockStorage,
    sink: Arc<RecordingSink>,
    router: Router,
}

fn harness_with(storage: MockStorage, allowed_host: &str) -> Harness {
    let sink = Arc::new(RecordingSink::new());
    let state = AppState::new(Arc::new(storage.clone()), sink.clone()).with_allowed_host(allowed_host);
    Harness {
        storage,
        sink,
        router: create_router(state),
    }
}

fn harness(storage: MockStorage) -> Harness {
    harness_with(storage, "")
}

fn failing(config: MockConfig) -> Harness {
    harness(MockStorage::with_config(config))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(h: &Harness, request: Request<Body>) -> Response {
    h.router.clone().oneshot(request).await.unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

// === Company lookup ===

#[tokio::test]
async fn company_found_returns_stored_payload_verbatim() {
    let h = harness(MockStorage::new());
    h.storage.set_company(VALID, COMPANY);

    let response = send(&h, get(&format!("/{VALID}"))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CACHE_CONTROL], "max-age=86400");
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    assert_eq!(body_text(response).await, COMPANY);
}

#[tokio::test]
async fn masked_cnpj_is_unmasked_before_lookup() {
    let h = harness(MockStorage::new());
    h.storage.set_company(VALID, COMPANY);

    let response = send(&h, get("/33.683.111/0002-80")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, COMPANY);
}

#[tokio::test]
async fn encoded_slash_in_masked_cnpj_is_decoded() {
    let h = harness(MockStorage::new());
    h.storage.set_company(VALID, COMPANY);

    let response = send(&h, get("/33.683.111%2F0002-80")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, COMPANY);
}

#[tokio::test]
async fn company_not_found_is_404() {
    let h = harness(MockStorage::new());

    let response = send(&h, get(&format!("/{VALID}"))).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await,
        json!({"message": "CNPJ 33683111000280 not found."})
    );
    assert!(h.sink.lines().is_empty());
}

#[tokio::test]
async fn invalid_cnpj_is_400_without_touching_storage() {
    let h = harness(MockStorage::new());

    for uri in ["/123", "/33683111000281", "/favicon.ico", "/00000000000000"] {
        let response = send(&h, get(uri)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        assert!(body_json(response).await["message"].as_str().unwrap().contains("invalid"));
    }
    assert_eq!(h.storage.calls(), 0);
}

#[tokio::test]
async fn company_storage_failure_is_generic_500() {
    let h = failing(MockConfig {
        fail_get: true,
        ..MockConfig::default()
    });

    let response = send(&h, get(&format!("/{VALID}"))).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_text(response).await;
    assert!(!body.contains("mock lookup failure"), "detail leaked: {body}");

    let lines = h.sink.lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("mock lookup failure"));
}

#[tokio::test]
async fn company_rejects_writes() {
    let h = harness(MockStorage::new());

    let response = send(&h, post(&format!("/{VALID}"), "{}")).await;

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(h.storage.calls(), 0);
}

// === Update marker ===

#[tokio::test]
async fn updated_returns_raw_marker() {
    let h = harness(MockStorage::new());
    h.storage.set_metadata("updated-at", "2024-05-10");

    let response = send(&h, get("/updated")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "2024-05-10");
}

#[tokio::test]
async fn missing_marker_is_500() {
    let h = harness(MockStorage::new());

    let response = send(&h, get("/updated")).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({"message": "no update marker available"})
    );
    assert_eq!(h.sink.lines().len(), 1);
}

#[tokio::test]
async fn marker_read_failure_is_500() {
    let h = failing(MockConfig {
        fail_meta: true,
        ..MockConfig::default()
    });

    let response = send(&h, get("/updated")).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(h.sink.lines().len(), 1);
}

// === Health ===

#[tokio::test]
async fn health_is_ok_when_storage_answers() {
    let h = harness(MockStorage::new());

    let response = send(&h, get("/healthz")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"status": "ok"}));
}

#[tokio::test]
async fn health_degrades_to_503() {
    let h = failing(MockConfig {
        fail_ping: true,
        ..MockConfig::default()
    });

    let response = send(&h, get("/healthz")).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        body_json(response).await,
        json!({"message": "storage is unavailable"})
    );
    assert!(h.sink.lines().is_empty());
}

// === Search ===

#[tokio::test]
async fn search_wraps_results_in_a_page() {
    let h = harness(MockStorage::new());
    h.storage
        .set_search_results(vec![json!({"cnpj": VALID}), json!({"cnpj": "19131014000172"})]);

    let response = send(&h, post("/search", r#"{"page": 3, "results": 50, "uf": "SP"}"#)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    assert_eq!(
        body_json(response).await,
        json!({
            "results": [{"cnpj": VALID}, {"cnpj": "19131014000172"}],
            "page": 3,
            "total": 2
        })
    );

    let query = h.storage.last_query().unwrap();
    assert_eq!(query.offset, 100);
    assert_eq!(query.filters.get("uf"), Some(&json!("SP")));
}

#[tokio::test]
async fn search_defaults_pagination() {
    let h = harness(MockStorage::new());

    let response = send(&h, post("/search", r#"{"page": -2, "results": 0}"#)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"results": [], "page": 1, "total": 0}));

    let query = h.storage.last_query().unwrap();
    assert_eq!((query.page, query.results, query.offset), (1, 100, 0));
}

#[tokio::test]
async fn search_rejects_non_json_body() {
    let h = harness(MockStorage::new());

    for body in ["not json", "", "[1, 2]", r#"{"page": "two"}"#] {
        let response = send(&h, post("/search", body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body:?}");
        let message = body_json(response).await["message"].as_str().unwrap().to_string();
        assert!(!message.is_empty());
    }
    assert_eq!(h.storage.calls(), 0);
}

#[tokio::test]
async fn search_body_over_the_limit_gets_a_json_message() {
    let h = harness(MockStorage::new());
    let filler = "x".repeat(3 * 1024 * 1024);
    let body = format!(r#"{{"page": 1, "razao_social": "{filler}"}}"#);

    let response = send(&h, post("/search", &body)).await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    assert_eq!(
        body_json(response).await,
        json!({"message": "could not read the request body"})
    );
    assert_eq!(h.storage.calls(), 0);
}

#[tokio::test]
async fn search_requires_post() {
    let h = harness(MockStorage::new());

    for method in [Method::GET, Method::PUT, Method::DELETE] {
        let request = Request::builder()
            .method(method.clone())
            .uri("/search")
            .body(Body::empty())
            .unwrap();
        let response = send(&h, request).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{method}");
    }
    assert_eq!(h.storage.calls(), 0);
}

#[tokio::test]
async fn search_storage_failure_is_500() {
    let h = failing(MockConfig {
        fail_search: true,
        ..MockConfig::default()
    });

    let response = send(&h, post("/search", "{}")).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await, json!({"message": "search failed"}));
    let lines = h.sink.lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("mock search failure"));
}

#[tokio::test]
async fn search_over_memory_storage_pages_without_overlap() {
    let mut storage = MemoryStorage::new();
    for cnpj in ["12345678000195", "19131014000172", VALID] {
        storage.insert(json!({"cnpj": cnpj})).unwrap();
    }
    let sink = Arc::new(RecordingSink::new());
    let router = create_router(AppState::new(Arc::new(storage), sink));

    let mut seen = Vec::new();
    for page in 1..=3 {
        let body = format!(r#"{{"page": {page}, "results": 2}}"#);
        let response = router.clone().oneshot(post("/search", &body)).await.unwrap();
        let body = body_json(response).await;
        assert_eq!(body["total"], body["results"].as_array().unwrap().len());
        seen.extend(body["results"].as_array().unwrap().clone());
    }

    assert_eq!(
        seen,
        vec![
            json!({"cnpj": "12345678000195"}),
            json!({"cnpj": "19131014000172"}),
            json!({"cnpj": VALID}),
        ]
    );
}

// === Access guard ===

#[tokio::test]
async fn guard_rejects_other_hosts_on_every_route() {
    let h = harness_with(MockStorage::new(), "api.example.org");

    let requests = [
        get(&format!("/{VALID}")),
        get("/updated"),
        get("/healthz"),
        get("/"),
        post("/search", "{}"),
    ];
    for mut request in requests {
        request
            .headers_mut()
            .insert(header::HOST, "evil.example".parse().unwrap());
        let response = send(&h, request).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.status().is_client_error());
    }

    assert_eq!(h.storage.calls(), 0);
    assert!(h.sink.lines().is_empty());
}

#[tokio::test]
async fn guard_rejects_requests_without_host() {
    let h = harness_with(MockStorage::new(), "api.example.org");

    let response = send(&h, get("/healthz")).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(h.storage.calls(), 0);
}

#[tokio::test]
async fn guard_admits_the_allowed_host() {
    let h = harness_with(MockStorage::new(), "api.example.org");
    h.storage.set_company(VALID, COMPANY);

    let mut request = get(&format!("/{VALID}"));
    request
        .headers_mut()
        .insert(header::HOST, "api.example.org".parse().unwrap());
    let response = send(&h, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.storage.calls(), 1);
}

// === Operational error channel ===

#[tokio::test]
async fn every_500_writes_exactly_once() {
    let h = failing(MockConfig {
        fail_get: true,
        fail_meta: true,
        fail_search: true,
        ..MockConfig::default()
    });

    let requests = [get(&format!("/{VALID}")), get("/updated"), post("/search", "{}")];
    let count = requests.len();
    for request in requests {
        let response = send(&h, request).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    assert_eq!(h.sink.lines().len(), count);
}
