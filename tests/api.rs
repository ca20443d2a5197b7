//! API endpoint integration tests

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use portal_plugins::api::ApiServer;
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::MockPortal;

/// Build a test API router around a host for `portal`
async fn build_test_router(portal: &MockPortal) -> (Arc<portal_plugins::PluginHost>, axum::Router) {
    let host = Arc::new(portal.host().await);
    let router = ApiServer::new(Arc::clone(&host), 0).router();
    (host, router)
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let portal = MockPortal::start().await;
    let (_host, app) = build_test_router(&portal).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_plugins_before_any_cycle() {
    let portal = MockPortal::start().await;
    let (_host, app) = build_test_router(&portal).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/plugins")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["cycle"], 0);
    assert_eq!(json["phase"], "empty");
    assert_eq!(json["loaded"], false);
    assert!(json.get("expected").is_none());
    assert_eq!(json["plugins"], json!([]));
}

#[tokio::test]
async fn test_plugins_after_load() {
    let portal = MockPortal::start().await;
    portal.set_descriptors(json!([{"name": "reports", "paths": ["/bundles/reports.json"]}]));
    portal.add_plugin_bundle("reports.json", "reports", json!({"GET": ["/reports"]}));

    let (host, app) = build_test_router(&portal).await;
    host.load_cycle().await;
    tokio::time::timeout(Duration::from_secs(5), host.wait_until_loaded())
        .await
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/plugins")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let json = json_body(response).await;
    assert_eq!(json["cycle"], 1);
    assert_eq!(json["phase"], "loaded");
    assert_eq!(json["expected"], 1);
    assert_eq!(json["plugins"][0]["name"], "reports");
    assert_eq!(json["plugins"][0]["title"], "REPORTS");
    assert_eq!(json["plugins"][0]["requirements"], json!({"GET": ["/reports"]}));
    assert!(json["plugins"][0]["registered_at"].is_string());
}

#[tokio::test]
async fn test_reload_endpoint_runs_a_cycle() {
    let portal = MockPortal::start().await;
    portal.set_descriptors(json!([
        {"name": "reports", "paths": ["/bundles/reports.json"]},
        {"name": "broken", "paths": ["/bundles/missing.json"]},
    ]));
    portal.add_plugin_bundle("reports.json", "reports", json!({}));

    let (_host, app) = build_test_router(&portal).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/plugins/reload")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["cycle"], 1);
    assert_eq!(json["descriptors"].as_array().unwrap().len(), 2);
    assert!(json.get("fetch_error").is_none());
    assert_eq!(json["superseded"], false);
    assert_eq!(json["load"]["executed"], 1);
    assert_eq!(json["load"]["failed_plugins"], json!(["broken"]));
}

#[tokio::test]
async fn test_reload_reports_fetch_failure() {
    let portal = MockPortal::start().await;
    portal.fail_descriptors(StatusCode::SERVICE_UNAVAILABLE);

    let (_host, app) = build_test_router(&portal).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/plugins/reload")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let json = json_body(response).await;
    assert!(json["fetch_error"].is_string());
    assert_eq!(json["load"]["attempted"], 0);
}
