//! Integration tests for the index endpoint and general HTTP behaviour.

mod common;

use axum::http::StatusCode;
use common::{body_json, get, header};

const UNUSED_GEF: &str = "http://127.0.0.1:9";

// ---------------------------------------------------------------------------
// Test: GET / returns the service metadata
// ---------------------------------------------------------------------------

#[tokio::test]
async fn index_returns_metadata() {
    let app = common::build_test_app(UNUSED_GEF);
    let response = get(app, "/").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        header(&response, "content-type"),
        "application/json; charset=utf-8"
    );

    let json = body_json(response).await;
    assert_eq!(json["name"], "BridgIt");
    assert_eq!(json["version"], "0.1");
    assert!(json["Description"].as_str().unwrap().contains("GEF"));
}

// ---------------------------------------------------------------------------
// Test: repeated GET / calls are identical
// ---------------------------------------------------------------------------

#[tokio::test]
async fn index_is_idempotent() {
    let first = body_json(get(common::build_test_app(UNUSED_GEF), "/").await).await;
    let second = body_json(get(common::build_test_app(UNUSED_GEF), "/").await).await;

    assert_eq!(first, second);
}

// ---------------------------------------------------------------------------
// Test: unknown route returns 404
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_route_returns_404() {
    let app = common::build_test_app(UNUSED_GEF);
    let response = get(app, "/this-route-does-not-exist").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: GET /jobs is not allowed
// ---------------------------------------------------------------------------

#[tokio::test]
async fn jobs_only_accepts_post() {
    let app = common::build_test_app(UNUSED_GEF);
    let response = get(app, "/jobs?service=echo&token=t&input=i").await;

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

// ---------------------------------------------------------------------------
// Test: x-request-id header is present in response
// ---------------------------------------------------------------------------

#[tokio::test]
async fn response_contains_x_request_id_header() {
    let app = common::build_test_app(UNUSED_GEF);
    let response = get(app, "/").await;

    let id = header(&response, "x-request-id");
    assert_eq!(id.len(), 36, "x-request-id should be a UUID string");
}
