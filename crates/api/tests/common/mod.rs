#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use bridgit_api::config::ServerConfig;
use bridgit_api::router::build_app_router;
use bridgit_api::state::AppState;
use bridgit_core::config::BridgeConfig;
use bridgit_core::job::ServiceId;
use bridgit_gef::api::GefApi;
use http_body_util::BodyExt;
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        config_path: "unused".to_string(),
        cors_origins: vec!["http://localhost:8080".to_string()],
        request_timeout_secs: 30,
        stage_timeout_secs: 5,
        output_poll_attempts: 1,
        output_poll_interval_ms: 10,
    }
}

/// Service map used by every test: `echo -> svc-1`.
pub fn test_bridge(gef_url: &str) -> BridgeConfig {
    let apps = HashMap::from([("echo".to_string(), ServiceId::new("svc-1"))]);
    BridgeConfig::new("8080", gef_url, apps)
}

/// Build the full application router pointed at a (mock) GEF.
pub fn build_test_app(gef_url: &str) -> Router {
    build_test_app_with(test_config(), gef_url)
}

pub fn build_test_app_with(config: ServerConfig, gef_url: &str) -> Router {
    let gef = GefApi::new(gef_url).expect("mock GEF URL is valid");
    let state = AppState::new(config, test_bridge(gef_url), Arc::new(gef));
    build_app_router(state)
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri).await
}

pub async fn post(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::POST, uri).await
}

async fn send(app: Router, method: Method, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn header<'a>(response: &'a Response<Body>, name: &str) -> &'a str {
    response
        .headers()
        .get(name)
        .unwrap_or_else(|| panic!("missing header {name}"))
        .to_str()
        .unwrap()
}
