use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;

use compliance_core::policy::PolicyStore;
use compliance_core::Orchestrator;
use compliance_server::config::ServerConfig;
use compliance_server::routes::{build_router, AppState};

/// Build a test app with an empty, on-disk-but-nonexistent policy config
/// directory (so every repository resolves to policy defaults) and no AI
/// adapter configured.
pub fn test_app() -> (Router, TempDir) {
    let tmp = TempDir::new().expect("failed to create temp dir");
    let config_dir = tmp.path().join("compliance-config");

    let config = ServerConfig {
        host: "127.0.0.1".into(),
        port: 0,
        debug: false,
        gemini_api_key: None,
        database_url: None,
        redis_url: None,
        github_app_id: None,
        github_app_private_key_path: None,
        github_webhook_secret: None,
        secret_key: None,
        allowed_origins: vec!["*".into()],
        data_residency_region: "us".into(),
        enable_code_retention: false,
        log_level: "info".into(),
        log_file: None,
        audit_log_file: None,
        config_dir: config_dir.clone(),
    };

    let policy_store = Arc::new(PolicyStore::new(config_dir));
    let orchestrator = Arc::new(Orchestrator::new(policy_store.clone(), None, false));

    let state = AppState { orchestrator, policy_store, config };
    (build_router(state), tmp)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().method(Method::GET).uri(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

pub fn put_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(Method::PUT)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
