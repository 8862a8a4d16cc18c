mod common;

use axum::http::StatusCode;
use tower::ServiceExt;

#[tokio::test]
async fn health_returns_ok() {
    let (app, _tmp) = common::test_app();
    let response = app.oneshot(common::get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["status"], "healthy");
}
