//! Console API through the axum router: envelope codes, HTTP statuses and the
//! access check seeing committed changes.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use iplimit_admin::app_state::AppState;
use iplimit_admin::notify::GatewayNotifier;
use iplimit_admin::{config, router};

use common::FailingNotifier;

const CONFIG: &str = r#"
version: 1
notifier:
  mode: none
catalog:
  apis:
    - apiId: api-1
      apiName: list orders
      path: /orders
      serviceId: order-service
"#;

fn app(external: Vec<Arc<dyn GatewayNotifier>>) -> Router {
    let cfg = config::load_from_str(CONFIG).expect("config");
    router::build_router(AppState::with_notifiers(cfg, external))
}

async fn call(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if body.is_some() {
        builder = builder.header("content-type", "application/json");
    }
    let req = builder
        .body(match body {
            Some(v) => Body::from(v.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    (status, json)
}

#[tokio::test]
async fn whitelist_lifecycle_over_http() {
    let r = app(vec![]);

    let (status, v) = call(
        &r,
        "POST",
        "/gateway/limit/ip/add",
        Some(json!({"name": "office", "kind": "WHITELIST", "ipRanges": "10.0.0.0/8;192.168.1.0/24"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["code"], "OK");
    assert!(v.get("extra").is_none());
    let id = v["data"].as_u64().unwrap();

    let (status, v) = call(
        &r,
        "POST",
        "/gateway/limit/ip/apis/add",
        Some(json!({"policyId": id, "apiIds": ["api-1"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{v}");

    let (_, v) = call(&r, "GET", "/gateway/access/check?apiId=api-1&ip=10.1.2.3", None).await;
    assert_eq!(v["data"]["decision"], "pass");
    assert_eq!(v["data"]["policyId"], id);
    let (_, v) = call(&r, "GET", "/gateway/access/check?apiId=api-1&ip=8.8.8.8", None).await;
    assert_eq!(v["data"]["decision"], "deny");

    let (_, v) = call(&r, "GET", "/gateway/limit/ip/whitelist", None).await;
    assert_eq!(v["data"]["total"], 1);
    let api = &v["data"]["records"][0]["apis"][0];
    assert_eq!(api["apiId"], "api-1");
    assert_eq!(api["api"]["path"], "/orders");

    let (status, v) = call(&r, "POST", "/gateway/limit/ip/remove", Some(json!({"policyId": id}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(v["code"], "CONFLICT");

    let (_, v) = call(&r, "POST", "/gateway/limit/ip/apis/clear", Some(json!({"apiId": "api-1"}))).await;
    assert_eq!(v["data"]["removed"], 1);
    let (_, v) = call(&r, "POST", "/gateway/limit/ip/apis/clear", Some(json!({"apiId": "api-1"}))).await;
    assert_eq!(v["data"]["removed"], 0);

    let (_, v) = call(&r, "GET", "/gateway/access/check?apiId=api-1&ip=8.8.8.8", None).await;
    assert_eq!(v["data"]["decision"], "pass");
    assert!(v["data"]["policyId"].is_null());

    let (status, _) = call(&r, "POST", "/gateway/limit/ip/remove", Some(json!({"policyId": id}))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, v) = call(&r, "GET", &format!("/gateway/limit/ip/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(v["code"], "NOT_FOUND");
}

#[tokio::test]
async fn invalid_input_maps_to_client_errors() {
    let r = app(vec![]);

    let (status, v) = call(
        &r,
        "POST",
        "/gateway/limit/ip/add",
        Some(json!({"name": "bad", "kind": "BLACKLIST", "ipRanges": ["10.0.0.0/99"]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["code"], "VALIDATION_FAILED");

    let (status, v) = call(
        &r,
        "POST",
        "/gateway/limit/ip/add",
        Some(json!({"name": "x", "kind": "BLACKLIST", "ipRanges": ["1.2.3.4"], "owner": "me"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["code"], "BAD_REQUEST");

    let (status, v) = call(
        &r,
        "POST",
        "/gateway/limit/ip/apis/clear",
        Some(json!({"policyId": 1, "apiId": "api-1"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["code"], "BAD_REQUEST");

    let (status, v) = call(
        &r,
        "POST",
        "/gateway/limit/ip/apis/add",
        Some(json!({"policyId": 404, "apiIds": ["api-1"]})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(v["code"], "NOT_FOUND");

    let (status, _) = call(&r, "GET", "/gateway/access/check?apiId=api-1&ip=not-an-ip", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_changes_ranges_seen_by_access_check() {
    let r = app(vec![]);
    let (_, v) = call(
        &r,
        "POST",
        "/gateway/limit/ip/add",
        Some(json!({"name": "scrapers", "kind": "BLACKLIST", "ipRanges": ["203.0.113.0/24"]})),
    )
    .await;
    let id = v["data"].as_u64().unwrap();
    call(&r, "POST", "/gateway/limit/ip/apis/add", Some(json!({"policyId": id, "apiIds": ["api-9"]}))).await;

    let (_, v) = call(&r, "GET", "/gateway/access/check?apiId=api-9&ip=203.0.113.7", None).await;
    assert_eq!(v["data"]["decision"], "deny");

    let (status, v) = call(
        &r,
        "POST",
        "/gateway/limit/ip/update",
        Some(json!({"policyId": id, "name": "scrapers", "kind": "BLACKLIST", "ipRanges": ["198.51.100.0/24"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{v}");

    let (_, v) = call(&r, "GET", "/gateway/access/check?apiId=api-9&ip=203.0.113.7", None).await;
    assert_eq!(v["data"]["decision"], "pass");
    let (_, v) = call(&r, "GET", "/gateway/access/check?apiId=api-9&ip=198.51.100.1", None).await;
    assert_eq!(v["data"]["decision"], "deny");

    let (status, v) = call(
        &r,
        "POST",
        "/gateway/limit/ip/update",
        Some(json!({"policyId": id, "name": "scrapers", "kind": "WHITELIST", "ipRanges": ["198.51.100.0/24"]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["code"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn gateway_failure_surfaces_as_warning_not_error() {
    let r = app(vec![Arc::new(FailingNotifier)]);

    let (status, v) = call(
        &r,
        "POST",
        "/gateway/limit/ip/add",
        Some(json!({"name": "office", "kind": "WHITELIST", "ipRanges": ["10.0.0.0/8"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["code"], "OK");
    let warning = &v["extra"]["propagationWarning"];
    assert_eq!(warning["change"], "policy_added");
    assert_eq!(warning["seq"], 1);

    let id = v["data"].as_u64().unwrap();
    let (status, _) = call(&r, "GET", &format!("/gateway/limit/ip/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn listing_pages_and_filters() {
    let r = app(vec![]);
    for name in ["office-a", "office-b", "crawler"] {
        call(
            &r,
            "POST",
            "/gateway/limit/ip/add",
            Some(json!({"name": name, "kind": "WHITELIST", "ipRanges": ["10.0.0.0/8"]})),
        )
        .await;
    }

    let (_, v) = call(&r, "GET", "/gateway/limit/ip?keyword=OFFICE&page=1&limit=1", None).await;
    assert_eq!(v["data"]["total"], 2);
    assert_eq!(v["data"]["limit"], 1);
    assert_eq!(v["data"]["records"][0]["name"], "office-a");
    assert_eq!(v["data"]["records"][0]["ipRanges"][0], "10.0.0.0/8");

    let (_, v) = call(&r, "GET", "/gateway/limit/ip/blacklist", None).await;
    assert_eq!(v["data"]["total"], 0);
}

#[tokio::test]
async fn ops_endpoints() {
    let r = app(vec![]);
    let (status, _) = call(&r, "GET", "/healthz", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&r, "GET", "/readyz", None).await;
    assert_eq!(status, StatusCode::OK);

    call(
        &r,
        "POST",
        "/gateway/limit/ip/add",
        Some(json!({"name": "office", "kind": "WHITELIST", "ipRanges": ["10.0.0.0/8"]})),
    )
    .await;
    let (status, v) = call(&r, "GET", "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    let text = v.as_str().unwrap();
    assert!(text.contains("iplimit_mutations_total{op=\"add_policy\",result=\"ok\"} 1"));
    assert!(text.contains("iplimit_change_seq 1"));
}

#[tokio::test]
async fn malformed_path_and_query_use_the_envelope() {
    let r = app(vec![]);

    for uri in [
        "/gateway/limit/ip/abc",
        "/gateway/limit/ip/abc/apis",
        "/gateway/limit/ip?page=x",
        "/gateway/limit/ip/whitelist?limit=-1",
        "/gateway/access/check?apiId=api-1",
    ] {
        let (status, v) = call(&r, "GET", uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(v["code"], "BAD_REQUEST", "{uri}: {v}");
        assert!(v["message"].as_str().is_some_and(|m| !m.is_empty()), "{uri}");
    }
}
