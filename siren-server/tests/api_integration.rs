//! API integration tests for siren-server.
//!
//! These tests verify the HTTP API behavior with realistic multipart
//! requests, exercising the full upload/triage/route flow through the REST
//! endpoints. Stores run in-memory and the analysis collaborators are
//! deterministic mocks, so everything below runs without external services.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use siren_core::{
    AnalysisPipeline, Emotion, KeywordEntityExtractor, MockEmotionClassifier, MockGeocoder,
    MockTranscriber,
};
use siren_server::dispatch::{AlertDispatcher, MockPushDelivery, PushDelivery};
use siren_server::store::{AlertHistory, CenterRegistry, FingerprintStore, HashLocks};
use siren_server::{create_router, AppState};

const MAX_FILE_SIZE: usize = 25 * 1024 * 1024;

/// Build a test app whose transcriber always returns `transcript`.
fn app_with_transcript(transcript: &str, emotion: Emotion) -> (Router, Arc<MockPushDelivery>) {
    app_with(
        Arc::new(MockTranscriber::new(transcript)),
        emotion,
        MockPushDelivery::new(),
    )
}

fn app_with(
    transcriber: Arc<MockTranscriber>,
    emotion: Emotion,
    push: MockPushDelivery,
) -> (Router, Arc<MockPushDelivery>) {
    let registry = Arc::new(CenterRegistry::memory());
    let history = Arc::new(AlertHistory::memory());
    let push = Arc::new(push);
    let dispatcher = Arc::new(AlertDispatcher::new(
        registry.clone(),
        history.clone(),
        Some(push.clone() as Arc<dyn PushDelivery>),
    ));

    let pipeline = Arc::new(AnalysisPipeline::new(
        transcriber,
        Arc::new(MockEmotionClassifier::new(emotion)),
        Arc::new(KeywordEntityExtractor::new()),
    ));

    let state = AppState {
        fingerprints: Arc::new(FingerprintStore::memory()),
        registry,
        history,
        dispatcher,
        pipeline,
        geocoder: Arc::new(MockGeocoder::at(39.78, -89.65, "Springfield, Illinois")),
        hash_locks: Arc::new(HashLocks::new()),
        max_file_size: MAX_FILE_SIZE,
    };

    (create_router(state), push)
}

/// Build a multipart body with the given (field_name, filename, bytes) files.
fn multipart_files(files: &[(&str, &str, &[u8])]) -> (String, Vec<u8>) {
    let boundary = "----TestBoundary7MA4YWxkTrZu0gW";
    let mut body = Vec::new();

    for (name, filename, data) in files {
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                name, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: audio/wav\r\n\r\n");
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
    (format!("multipart/form-data; boundary={}", boundary), body)
}

async fn post_multipart(app: &Router, uri: &str, content_type: &str, body: Vec<u8>) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("Content-Type", content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn register_center(app: &Router, name: &str, location: &str, state: &str) -> (StatusCode, Value) {
    post_json(
        app,
        "/centers",
        json!({ "name": name, "location": location, "state": state }),
    )
    .await
}

async fn subscribe(app: &Router, center: &str, endpoint: &str) -> (StatusCode, Value) {
    post_json(
        app,
        "/subscribe",
        json!({ "center_name": center, "subscription": { "endpoint": endpoint } }),
    )
    .await
}

// ============================================================================
// Health & Readiness Tests
// ============================================================================

#[tokio::test]
async fn test_health_endpoint_returns_ok() {
    let (app, _) = app_with_transcript("hello", Emotion::Calm);
    let (status, json) = get(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "siren-server");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_ready_endpoint_returns_ok() {
    let (app, _) = app_with_transcript("hello", Emotion::Calm);
    let (status, json) = get(&app, "/ready").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ready"], true);
}

// ============================================================================
// Center Registration Tests
// ============================================================================

#[tokio::test]
async fn test_register_and_list_centers() {
    let (app, _) = app_with_transcript("hello", Emotion::Calm);

    let (status, center) = register_center(&app, "Central Dispatch", "Springfield", "Illinois").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(center["name"], "Central Dispatch");
    assert_eq!(center["center_type"], "General");

    let (status, json) = get(&app, "/centers").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 1);
    assert_eq!(json["centers"][0]["name"], "Central Dispatch");
}

#[tokio::test]
async fn test_register_duplicate_name_conflicts() {
    let (app, _) = app_with_transcript("hello", Emotion::Calm);

    register_center(&app, "Central", "Springfield", "Illinois").await;
    let (status, json) = register_center(&app, "CENTRAL", "Elsewhere", "Ohio").await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "DUPLICATE_NAME");

    // The original registration is untouched.
    let (_, centers) = get(&app, "/centers").await;
    assert_eq!(centers["count"], 1);
    assert_eq!(centers["centers"][0]["location"], "Springfield");
}

#[tokio::test]
async fn test_register_blank_fields_rejected() {
    let (app, _) = app_with_transcript("hello", Emotion::Calm);

    let (status, json) = post_json(
        &app,
        "/centers",
        json!({ "name": "  ", "location": "Springfield", "state": "Illinois" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_subscribe_before_center_registration() {
    // Subscribing is permissive: the center need not be registered yet.
    let (app, push) = app_with_transcript("fire at Springfield", Emotion::Panic);

    let (status, json) = subscribe(&app, "Central", "https://push.example/early").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["center_name"], "Central");

    // Once the center registers, the early subscription is live.
    register_center(&app, "Central", "Springfield", "Illinois").await;
    let (ct, body) = multipart_files(&[("files", "call.wav", b"bytes")]);
    let (_, json) = post_multipart(&app, "/upload", &ct, body).await;
    assert_eq!(json["results"][0]["notifications_sent"], 1);
    assert_eq!(push.delivery_count(), 1);
}

#[tokio::test]
async fn test_subscribe_requires_endpoint() {
    let (app, _) = app_with_transcript("hello", Emotion::Calm);
    register_center(&app, "Central", "Springfield", "Illinois").await;

    let (status, _) = post_json(
        &app,
        "/subscribe",
        json!({ "center_name": "Central", "subscription": {} }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Upload / Dedup / Routing Tests
// ============================================================================

#[tokio::test]
async fn test_upload_analyzes_and_routes() {
    let (app, push) = app_with_transcript(
        "There is a fire at Springfield, everything is burning",
        Emotion::Panic,
    );
    register_center(&app, "Central", "Springfield", "Illinois").await;
    subscribe(&app, "Central", "https://push.example/central").await;

    let (content_type, body) = multipart_files(&[("files", "call1.wav", b"audio-bytes-1")]);
    let (status, json) = post_multipart(&app, "/upload", &content_type, body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 1);

    let result = &json["results"][0];
    assert_eq!(result["duplicate"], false);
    assert_eq!(result["priority"], 1);
    assert_eq!(result["priority_text"], "CRITICAL");
    assert_eq!(result["emotion"], "PANIC");
    assert_eq!(result["alert_sent"], true);
    assert_eq!(result["matched_centers"][0], "Central");
    assert_eq!(result["notifications_sent"], 1);

    assert_eq!(push.delivery_count(), 1);
}

#[tokio::test]
async fn test_duplicate_upload_served_from_cache() {
    let (app, push) = app_with_transcript(
        "There is a fire at Springfield",
        Emotion::Panic,
    );
    register_center(&app, "Central", "Springfield", "Illinois").await;
    subscribe(&app, "Central", "https://push.example/central").await;

    let (ct, body) = multipart_files(&[("files", "call1.wav", b"identical-bytes")]);
    let (_, first) = post_multipart(&app, "/upload", &ct, body).await;
    assert_eq!(first["results"][0]["duplicate"], false);

    // Same bytes under a different filename: same fingerprint.
    let (ct, body) = multipart_files(&[("files", "renamed.wav", b"identical-bytes")]);
    let (status, second) = post_multipart(&app, "/upload", &ct, body).await;

    assert_eq!(status, StatusCode::OK);
    let result = &second["results"][0];
    assert_eq!(result["duplicate"], true);
    // The cached record keeps the first-seen filename.
    assert_eq!(result["filename"], "call1.wav");
    assert_eq!(
        result["content_hash"], first["results"][0]["content_hash"],
    );

    // Routing re-ran for the duplicate, so the center was alerted twice.
    assert_eq!(push.delivery_count(), 2);
}

#[tokio::test]
async fn test_duplicate_reaches_centers_registered_later() {
    let (app, push) = app_with_transcript("Fire at Springfield", Emotion::Panic);

    // First upload: no centers registered yet, nothing matches.
    let (ct, body) = multipart_files(&[("files", "call.wav", b"bytes")]);
    let (_, first) = post_multipart(&app, "/upload", &ct, body).await;
    assert_eq!(first["results"][0]["alert_sent"], false);

    // A center comes online, then the same bytes arrive again.
    register_center(&app, "Central", "Springfield", "Illinois").await;
    subscribe(&app, "Central", "https://push.example/central").await;

    let (ct, body) = multipart_files(&[("files", "call.wav", b"bytes")]);
    let (_, second) = post_multipart(&app, "/upload", &ct, body).await;

    let result = &second["results"][0];
    assert_eq!(result["duplicate"], true);
    assert_eq!(result["alert_sent"], true);
    assert_eq!(result["matched_centers"][0], "Central");
    assert_eq!(push.delivery_count(), 1);
}

#[tokio::test]
async fn test_upload_batch_sorted_by_priority() {
    // One transcriber serves every file, so both land on the same priority;
    // the sort must keep submission order for equal priorities.
    let (app, _) = app_with_transcript("there was a disturbance outside", Emotion::Calm);

    let (ct, body) = multipart_files(&[
        ("files", "a.wav", b"bytes-a"),
        ("files", "b.wav", b"bytes-b"),
    ]);
    let (status, json) = post_multipart(&app, "/upload", &ct, body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 2);
    // Equal priority: submission order preserved.
    assert_eq!(json["results"][0]["filename"], "a.wav");
    assert_eq!(json["results"][1]["filename"], "b.wav");
    assert_eq!(json["results"][0]["priority"], 3);
}

#[tokio::test]
async fn test_upload_failed_analysis_sorts_last_and_is_not_cached() {
    let (app, _) = app_with(
        Arc::new(MockTranscriber::failing("unreadable stream")),
        Emotion::Calm,
        MockPushDelivery::new(),
    );

    let (ct, body) = multipart_files(&[("files", "broken.wav", b"junk")]);
    let (status, json) = post_multipart(&app, "/upload", &ct, body).await;

    assert_eq!(status, StatusCode::OK);
    let result = &json["results"][0];
    assert_eq!(result["filename"], "broken.wav");
    assert!(result["error"].as_str().unwrap().contains("unreadable"));
    assert!(result.get("priority").is_none());
}

#[tokio::test]
async fn test_upload_without_files_is_bad_request() {
    let (app, _) = app_with_transcript("hello", Emotion::Calm);

    let boundary = "----TestBoundary7MA4YWxkTrZu0gW";
    let body = format!("--{}--\r\n", boundary).into_bytes();
    let ct = format!("multipart/form-data; boundary={}", boundary);

    let (status, json) = post_multipart(&app, "/upload", &ct, body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_upload_rejects_unsupported_content_type() {
    let (app, _) = app_with_transcript("hello", Emotion::Calm);

    let boundary = "----TestBoundary7MA4YWxkTrZu0gW";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"files\"; filename=\"page.html\"\r\n",
    );
    body.extend_from_slice(b"Content-Type: text/html\r\n\r\n");
    body.extend_from_slice(b"<html></html>\r\n");
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

    let ct = format!("multipart/form-data; boundary={}", boundary);
    let (status, _) = post_multipart(&app, "/upload", &ct, body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Single Recording Tests
// ============================================================================

#[tokio::test]
async fn test_record_single_file() {
    let (app, _) = app_with_transcript("I lost my wallet somewhere", Emotion::Calm);

    let (ct, body) = multipart_files(&[("file", "live.webm", b"live-bytes")]);
    let (status, json) = post_multipart(&app, "/record", &ct, body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["priority"], 4);
    assert_eq!(json["priority_text"], "LOW");
    assert_eq!(json["duplicate"], false);
}

#[tokio::test]
async fn test_record_analysis_failure_is_unprocessable() {
    let (app, _) = app_with(
        Arc::new(MockTranscriber::failing("corrupt stream")),
        Emotion::Calm,
        MockPushDelivery::new(),
    );

    let (ct, body) = multipart_files(&[("file", "live.webm", b"junk")]);
    let (status, json) = post_multipart(&app, "/record", &ct, body).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["code"], "ANALYSIS_FAILED");
}

// ============================================================================
// Subscription Pruning Tests
// ============================================================================

#[tokio::test]
async fn test_gone_endpoint_pruned_transient_kept() {
    let push = MockPushDelivery::new()
        .with_gone("https://push.example/dead")
        .with_transient("https://push.example/flaky");
    let (app, push) = app_with(
        Arc::new(MockTranscriber::new("fire at Springfield")),
        Emotion::Panic,
        push,
    );

    register_center(&app, "Central", "Springfield", "Illinois").await;
    subscribe(&app, "Central", "https://push.example/dead").await;
    subscribe(&app, "Central", "https://push.example/flaky").await;
    subscribe(&app, "Central", "https://push.example/ok").await;

    let (ct, body) = multipart_files(&[("files", "call.wav", b"bytes")]);
    let (_, json) = post_multipart(&app, "/upload", &ct, body).await;
    assert_eq!(json["results"][0]["notifications_sent"], 1);
    assert_eq!(push.delivered_endpoints(), vec!["https://push.example/ok"]);

    // Second distinct upload: the dead endpoint is gone, the flaky one is
    // still registered and tried again.
    let (ct, body) = multipart_files(&[("files", "call2.wav", b"other-bytes")]);
    let (_, json) = post_multipart(&app, "/upload", &ct, body).await;
    assert_eq!(json["results"][0]["notifications_sent"], 1);
    assert_eq!(push.delivery_count(), 2);
}

// ============================================================================
// Alert History Tests
// ============================================================================

#[tokio::test]
async fn test_alerts_history_session_scoped() {
    let (app, _) = app_with_transcript("fire at Springfield", Emotion::Panic);
    register_center(&app, "Central", "Springfield", "Illinois").await;

    let (status, json) = get(&app, "/alerts").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 0);

    let (ct, body) = multipart_files(&[("files", "call.wav", b"bytes")]);
    post_multipart(&app, "/upload", &ct, body).await;

    let (_, json) = get(&app, "/alerts").await;
    assert_eq!(json["count"], 1);
    let alert = &json["alerts"][0];
    assert_eq!(alert["matched_centers"][0], "Central");
    assert_eq!(alert["report"]["priority"], 1);
}

#[tokio::test]
async fn test_alerts_history_center_filter() {
    let (app, _) = app_with_transcript("fire at Springfield", Emotion::Panic);
    register_center(&app, "Central", "Springfield", "Illinois").await;
    register_center(&app, "Coastal", "Portland", "Oregon").await;

    let (ct, body) = multipart_files(&[("files", "call.wav", b"bytes")]);
    post_multipart(&app, "/upload", &ct, body).await;

    let (status, json) = get(&app, "/alerts?center=Central").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 1);

    let (_, json) = get(&app, "/alerts?center=Coastal").await;
    assert_eq!(json["count"], 0);
}

#[tokio::test]
async fn test_unrouted_upload_logged_with_empty_matches() {
    // No center matches Tokyo; the incident is still logged, undelivered.
    let (app, push) = app_with_transcript("fire at Tokyo", Emotion::Panic);
    register_center(&app, "Central", "Springfield", "Illinois").await;
    subscribe(&app, "Central", "https://push.example/central").await;

    let (ct, body) = multipart_files(&[("files", "call.wav", b"bytes")]);
    let (_, json) = post_multipart(&app, "/upload", &ct, body).await;
    assert_eq!(json["results"][0]["alert_sent"], false);
    assert_eq!(json["results"][0]["notifications_sent"], 0);
    assert_eq!(push.delivery_count(), 0);

    let (_, json) = get(&app, "/alerts").await;
    assert_eq!(json["count"], 1);
    assert_eq!(json["alerts"][0]["matched_centers"], json!([]));
}

#[tokio::test]
async fn test_ingest_external_alert() {
    let (app, push) = app_with_transcript("unused", Emotion::Calm);
    register_center(&app, "Central", "Springfield", "Illinois").await;
    subscribe(&app, "Central", "https://push.example/central").await;

    let (status, json) = post_json(
        &app,
        "/alerts",
        json!({
            "transcript": "building collapse downtown",
            "emotion": "PANIC",
            "emergency_type": "accident",
            "location": "Springfield",
            "priority": 1
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["alert_sent"], true);
    assert_eq!(json["matched_centers"][0], "Central");
    assert_eq!(json["notifications_sent"], 1);
    assert_eq!(push.delivery_count(), 1);

    let (_, alerts) = get(&app, "/alerts").await;
    assert_eq!(alerts["count"], 1);
}

#[tokio::test]
async fn test_ingest_alert_validates_priority() {
    let (app, _) = app_with_transcript("unused", Emotion::Calm);

    let (status, _) = post_json(
        &app,
        "/alerts",
        json!({ "transcript": "something", "priority": 9 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Geocode Tests
// ============================================================================

#[tokio::test]
async fn test_geocode_resolves_location() {
    let (app, _) = app_with_transcript("unused", Emotion::Calm);

    let (status, json) = get(&app, "/geocode?location=Springfield").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["found"], true);
    assert_eq!(json["location"]["display_name"], "Springfield, Illinois");
}

#[tokio::test]
async fn test_geocode_requires_location() {
    let (app, _) = app_with_transcript("unused", Emotion::Calm);

    let (status, json) = get(&app, "/geocode").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_INPUT");
}
