mod common;

use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn get_repo_policy_falls_back_to_defaults() {
    let (app, _tmp) = common::test_app();

    let response = app.oneshot(common::get("/api/v1/policies/acme/widgets")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = common::body_json(response).await;
    assert_eq!(body["enforcement_mode"], "warning");
    assert_eq!(body["severity_threshold"], "medium");
    assert_eq!(body["allow_blocking_override"], true);
}

#[tokio::test]
async fn put_then_get_repo_policy_round_trips() {
    let (app, _tmp) = common::test_app();

    let policy = json!({
        "enforcement_mode": "blocking",
        "enabled_rules": [],
        "disabled_rules": [],
        "severity_threshold": "high",
        "custom_rules": [],
        "rule_packs": [],
        "allow_blocking_override": false
    });

    let response = app
        .clone()
        .oneshot(common::put_json("/api/v1/policies/acme/widgets", &policy))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(common::get("/api/v1/policies/acme/widgets")).await.unwrap();
    let body = common::body_json(response).await;
    assert_eq!(body["enforcement_mode"], "blocking");
    assert_eq!(body["severity_threshold"], "high");
    assert_eq!(body["allow_blocking_override"], false);
}

#[tokio::test]
async fn organization_policy_is_independent_of_repo_policy() {
    let (app, _tmp) = common::test_app();

    let org_policy = json!({
        "enforcement_mode": "advisory",
        "enabled_rules": [],
        "disabled_rules": [],
        "severity_threshold": "low",
        "custom_rules": [],
        "rule_packs": [],
        "allow_blocking_override": true
    });

    app.clone()
        .oneshot(common::put_json("/api/v1/policies/organizations/acme", &org_policy))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(common::get("/api/v1/policies/organizations/acme"))
        .await
        .unwrap();
    let body = common::body_json(response).await;
    assert_eq!(body["enforcement_mode"], "advisory");

    let response = app.oneshot(common::get("/api/v1/policies/acme/widgets")).await.unwrap();
    let body = common::body_json(response).await;
    assert_eq!(body["enforcement_mode"], "warning");
}

#[tokio::test]
async fn rule_packs_list_is_empty_by_default() {
    let (app, _tmp) = common::test_app();
    let response = app.oneshot(common::get("/api/v1/policies/rule-packs")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn rule_pack_upload_then_list() {
    let (app, _tmp) = common::test_app();

    let pack_yaml = "name: custom-pack\ndescription: test pack\nversion: \"1\"\nrules:\n  - id: RP001\n    name: Forbidden token\n    pattern: forbidden\n    category: compliance\n    severity: medium\n";
    let upload = json!({"pack_name": "custom-pack", "pack_data": pack_yaml});

    let response = app
        .clone()
        .oneshot(common::post_json("/api/v1/policies/rule-packs/upload", &upload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["status"], "installed");
    assert_eq!(body["rules_count"], 1);

    let response = app.oneshot(common::get("/api/v1/policies/rule-packs")).await.unwrap();
    let body = common::body_json(response).await;
    let packs = body.as_array().unwrap();
    assert_eq!(packs.len(), 1);
    assert_eq!(packs[0]["name"], "custom-pack");
}

#[tokio::test]
async fn rule_pack_upload_with_invalid_yaml_is_rejected() {
    let (app, _tmp) = common::test_app();
    let upload = json!({"pack_name": "broken", "pack_data": "not: [valid yaml"});

    let response = app
        .oneshot(common::post_json("/api/v1/policies/rule-packs/upload", &upload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
