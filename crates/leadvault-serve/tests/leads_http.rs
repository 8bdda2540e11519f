//! Router-level tests against an in-memory DuckDB store.

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use leadvault_core::{NewLead, NewRawCapture, NormalizedLead};
use leadvault_serve::{AppState, Config, router};
use leadvault_store::{DuckStore, LeadGateway, StoreError};
use serde_json::{Value, json};
use tower::ServiceExt;

fn app_with(config: Config) -> (DuckStore, Router) {
    let store = DuckStore::open().unwrap();
    store.ensure_schema().unwrap();
    let state = AppState::new(config, Arc::new(store.clone()));
    (store, router(state))
}

fn app() -> (DuckStore, Router) {
    app_with(Config::default())
}

fn post_lead(body: &str, headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder()
        .uri("/api/leads")
        .method("POST")
        .header(header::CONTENT_TYPE, "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder
        .body(Body::from(body.to_string()))
        .unwrap_or_else(|err| panic!("failed to build request: {err}"))
}

async fn send(router: &Router, request: Request<Body>) -> Response {
    router
        .clone()
        .oneshot(request)
        .await
        .unwrap_or_else(|err| panic!("router request failed: {err}"))
}

async fn response_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap_or_else(|err| panic!("failed to read response body: {err}"));
    serde_json::from_slice(&bytes).unwrap_or_else(|err| panic!("response is not JSON: {err}"))
}

#[tokio::test]
async fn resubmitted_key_returns_conflict_with_original_id() {
    let (store, router) = app();
    let body = json!({"email": "a@x.com", "idempotencyKey": "k1"}).to_string();

    let first = send(&router, post_lead(&body, &[])).await;
    assert_eq!(first.status(), StatusCode::CREATED);
    let first = response_json(first).await;
    assert_eq!(first["deduplicated"], false);
    let lead_id = first["leadId"].as_str().unwrap().to_string();

    let second = send(&router, post_lead(&body, &[])).await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let second = response_json(second).await;
    assert_eq!(second["deduplicated"], true);
    assert_eq!(second["leadId"], lead_id.as_str());

    assert_eq!(store.lead_count().unwrap(), 1);
    assert_eq!(store.raw_capture_count().unwrap(), 1);
}

#[tokio::test]
async fn keyless_submissions_create_distinct_leads() {
    let (store, router) = app();
    let body = json!({"email": "a@x.com"}).to_string();

    let first = send(&router, post_lead(&body, &[])).await;
    let second = send(&router, post_lead(&body, &[])).await;
    assert_eq!(first.status(), StatusCode::CREATED);
    assert_eq!(second.status(), StatusCode::CREATED);

    let first = response_json(first).await;
    let second = response_json(second).await;
    assert_ne!(first["leadId"], second["leadId"]);
    assert_eq!(store.lead_count().unwrap(), 2);
}

#[tokio::test]
async fn header_key_is_used_and_wins_over_body() {
    let (store, router) = app();
    let with_header = |body_key: &str| {
        post_lead(
            &json!({"email": "a@x.com", "idempotencyKey": body_key}).to_string(),
            &[("Idempotency-Key", "from-header"), ("X-Request-Id", "req-42")],
        )
    };

    let first = response_json(send(&router, with_header("body-1")).await).await;
    let second = send(&router, with_header("body-2")).await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert_eq!(response_json(second).await["leadId"], first["leadId"]);

    let id = first["leadId"].as_str().unwrap().parse().unwrap();
    let lead = store.lead(id).unwrap().unwrap();
    assert_eq!(lead.idempotency_key.as_deref(), Some("from-header"));
    assert_eq!(lead.request_id.as_deref(), Some("req-42"));
}

#[tokio::test]
async fn stored_payload_is_verbatim() {
    let (store, router) = app();
    let body = json!({"email": 12, "nested": {"tags": ["a", "b"]}, "phone": null});

    let response = send(&router, post_lead(&body.to_string(), &[])).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let id = response_json(response).await["leadId"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();

    assert_eq!(store.raw_capture(id).unwrap().unwrap().payload, body);
    let lead = store.lead(id).unwrap().unwrap();
    assert!(lead.fields.email.is_none());
    assert!(lead.fields.phone.is_none());
}

#[tokio::test]
async fn non_object_bodies_are_rejected_without_writes() {
    let (store, router) = app();
    for body in ["[1, 2, 3]", "\"lead\"", "42", "null", "{not json"] {
        let response = send(&router, post_lead(body, &[])).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {body}");
        assert_eq!(response_json(response).await["error"], "bad_request");
    }
    assert_eq!(store.raw_capture_count().unwrap(), 0);
    assert_eq!(store.lead_count().unwrap(), 0);
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let (store, router) = app_with(Config {
        max_body_bytes: 16,
        ..Default::default()
    });
    let body = json!({"description": "x".repeat(64)}).to_string();

    let response = send(&router, post_lead(&body, &[])).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(store.raw_capture_count().unwrap(), 0);
}

#[tokio::test]
async fn storage_failure_returns_generic_error() {
    let (store, router) = app();
    store.execute_batch("DROP TABLE leads").unwrap();

    let response = send(&router, post_lead(r#"{"email": "a@x.com"}"#, &[])).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response_json(response).await;
    assert_eq!(
        body,
        json!({"error": "internal_error", "message": "An internal error occurred"})
    );

    // The submission still reached the raw capture table.
    assert_eq!(store.raw_capture_count().unwrap(), 1);
}

#[tokio::test]
async fn health_reports_ok() {
    let (_store, router) = app();
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = send(&router, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

/// Gateway whose every call fails, for exercising degraded paths.
struct DownGateway;

#[async_trait]
impl LeadGateway for DownGateway {
    async fn insert_raw_capture(&self, _: NewRawCapture) -> Result<(), StoreError> {
        Err(StoreError::Other("database unreachable at 10.0.0.5".into()))
    }

    async fn insert_lead(&self, _: NewLead) -> Result<(), StoreError> {
        Err(StoreError::Other("database unreachable at 10.0.0.5".into()))
    }

    async fn find_lead_by_idempotency_key(
        &self,
        _: &str,
    ) -> Result<Option<NormalizedLead>, StoreError> {
        Err(StoreError::Other("database unreachable at 10.0.0.5".into()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::Other("database unreachable at 10.0.0.5".into()))
    }
}

#[tokio::test]
async fn health_reports_unavailable_store() {
    let router = router(AppState::new(Config::default(), Arc::new(DownGateway)));
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = send(&router, request).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = response_json(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["database"], "unavailable");
}

#[tokio::test]
async fn unreachable_store_never_leaks_details() {
    let router = router(AppState::new(Config::default(), Arc::new(DownGateway)));

    let response = send(&router, post_lead(r#"{"email": "a@x.com"}"#, &[])).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(!text.contains("10.0.0.5"), "leaked: {text}");
    assert!(!text.contains("raw capture"), "leaked: {text}");
}

#[tokio::test]
async fn cors_preflight_allows_configured_origin() {
    let config = Config {
        cors_origins: vec!["https://example.com".into()],
        ..Default::default()
    };
    let cors = config.cors_layer().unwrap();
    let (_store, router) = app_with(config);
    let router = router.layer(cors);

    let request = Request::builder()
        .uri("/api/leads")
        .method("OPTIONS")
        .header(header::ORIGIN, "https://example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "idempotency-key")
        .body(Body::empty())
        .unwrap();

    let response = send(&router, request).await;
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://example.com"
    );
}
