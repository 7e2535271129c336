//! Router tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bundlecast_core::{baseline_field, ModuleName, UpdateService};
use bundlecast_state::fakes::{MemoryBlobStore, MemoryManifestStore};
use bundlecast_state::ManifestStore;
use bundlecastd::{create_router, AppState};
use serde_json::Value;
use tower::ServiceExt;

const TOKEN: &str = "test-token";
const BOUNDARY: &str = "bundlecast-test-boundary";

struct Harness {
    app: Router,
    manifests: Arc<MemoryManifestStore>,
}

fn harness() -> Harness {
    let manifests = Arc::new(MemoryManifestStore::new());
    let blobs = Arc::new(MemoryBlobStore::new());
    let service = UpdateService::new(manifests.clone(), blobs);
    Harness {
        app: create_router(AppState::new(service, TOKEN), 1024 * 1024),
        manifests,
    }
}

fn metadata(commit: &str, update_type: &str) -> Vec<u8> {
    serde_json::json!({
        "commitHash": commit,
        "coreHash": "X",
        "darwinCdnUrl": format!("https://cdn.test/core/{commit}.zip"),
        "updateType": update_type,
    })
    .to_string()
    .into_bytes()
}

fn release_parts(commit: &str, version: &str) -> Vec<(String, Vec<u8>)> {
    let mut parts = Vec::new();
    for m in ModuleName::ALL {
        parts.push((m.script_part(), format!("{m}-{version}").into_bytes()));
        parts.push((m.map_part(), format!("{m}-{version}-map").into_bytes()));
    }
    parts.push(("metadata".to_string(), metadata(commit, "stable")));
    parts
}

fn multipart_body(parts: &[(String, Vec<u8>)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, data) in parts {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn push_request(parts: &[(String, Vec<u8>)], token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/v1/updates/push")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(multipart_body(parts))).unwrap()
}

fn delete_request(commit: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("DELETE")
        .uri(format!("/v1/updates/delete/{commit}"));
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn poll_uri(platform: &str, baseline: &str, bits: &str) -> String {
    let mut query = format!("platform={platform}&core_commit={baseline}&update_bits={bits}");
    for m in ModuleName::ALL {
        query.push_str(&format!("&{}={baseline}", baseline_field(m)));
    }
    format!("/v1/updates/poll?{query}")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn push_then_poll_returns_bundles() {
    let h = harness();

    let (status, body) = send(&h.app, push_request(&release_parts("c1", "v1"), Some(TOKEN))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());
    let (status, _) = send(&h.app, push_request(&release_parts("c2", "v2"), Some(TOKEN))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, json) = send_json(&h.app, get(&poll_uri("darwin", "c1", "1"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["main"]["commitHash"], "c2");
    let script = STANDARD
        .decode(json["main"]["encodedBlob"].as_str().unwrap())
        .unwrap();
    assert_eq!(script, b"main-v2");
    let map = STANDARD
        .decode(json["editors"]["encodedMapBlob"].as_str().unwrap())
        .unwrap();
    assert_eq!(map, b"editors-v2-map");
    assert_eq!(json["core"]["commitHash"], "c2");
    assert_eq!(json["core"]["cdnUrl"], "https://cdn.test/core/c2.zip");
}

#[tokio::test]
async fn poll_with_unknown_baseline_is_all_null() {
    let h = harness();
    send(&h.app, push_request(&release_parts("c1", "v1"), Some(TOKEN))).await;

    let (status, json) = send_json(&h.app, get(&poll_uri("linux", "custom", "7"))).await;
    assert_eq!(status, StatusCode::OK);
    for key in ["uploaders", "editors", "main", "config", "selector", "core"] {
        assert!(json[key].is_null(), "{key} should be null");
    }
}

#[tokio::test]
async fn poll_validation_errors() {
    let h = harness();

    let (status, json) = send_json(&h.app, get("/v1/updates/poll?platform=darwin")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["type"], "VALIDATOR_ERROR");

    let (status, json) = send_json(&h.app, get(&poll_uri("win32", "c1", "1"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["type"], "VALIDATOR_ERROR");

    let (status, json) = send_json(&h.app, get(&poll_uri("darwin", "c1", "lots"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["type"], "UPDATE_BITS_ERROR");
    assert!(json["message"].as_str().unwrap().contains("lots"));
}

#[tokio::test]
async fn push_requires_bearer_token() {
    let h = harness();

    for token in [None, Some("wrong")] {
        let (status, json) =
            send_json(&h.app, push_request(&release_parts("c1", "v1"), token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["type"], "UNAUTHORIZED");
    }
    assert!(h.manifests.get().await.unwrap().is_empty());
}

#[tokio::test]
async fn push_rejects_incomplete_part_set() {
    let h = harness();
    let parts: Vec<_> = release_parts("c1", "v1")
        .into_iter()
        .filter(|(name, _)| name != "selector.js")
        .collect();

    let (status, json) = send_json(&h.app, push_request(&parts, Some(TOKEN))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["type"], "BAD_REQUEST");
    assert!(json["message"].as_str().unwrap().contains("selector.js"));
    assert!(h.manifests.get().await.unwrap().is_empty());
}

#[tokio::test]
async fn push_rejects_non_multipart_body() {
    let h = harness();
    let request = Request::builder()
        .method("POST")
        .uri("/v1/updates/push")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .body(Body::from("{}"))
        .unwrap();

    let (status, json) = send_json(&h.app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["type"], "BAD_REQUEST");
}

#[tokio::test]
async fn push_of_existing_commit_conflicts() {
    let h = harness();
    send(&h.app, push_request(&release_parts("c1", "v1"), Some(TOKEN))).await;

    let (status, json) =
        send_json(&h.app, push_request(&release_parts("c1", "v2"), Some(TOKEN))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["type"], "CONFLICT");
    assert_eq!(h.manifests.get().await.unwrap().len(), 1);
}

#[tokio::test]
async fn delete_is_authenticated_and_idempotent() {
    let h = harness();
    send(&h.app, push_request(&release_parts("c1", "v1"), Some(TOKEN))).await;

    let (status, _) = send(&h.app, delete_request("c1", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(h.manifests.get().await.unwrap().len(), 1);

    let (status, body) = send(&h.app, delete_request("c1", Some(TOKEN))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());
    assert!(h.manifests.get().await.unwrap().is_empty());

    let (status, _) = send(&h.app, delete_request("c1", Some(TOKEN))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn store_failure_is_upstream_error() {
    let h = harness();
    h.manifests.fail_writes(true);

    let (status, json) = send_json(&h.app, delete_request("c1", Some(TOKEN))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["type"], "UPSTREAM_ERROR");
}

#[tokio::test]
async fn everything_else_is_not_found() {
    let h = harness();

    for request in [
        get("/"),
        get("/v1/updates"),
        get("/v1/updates/push"),
        Request::builder()
            .method("POST")
            .uri("/v1/updates/poll")
            .body(Body::empty())
            .unwrap(),
    ] {
        let (status, body) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, b"Not Found.");
    }
}
