//! HTTP Server Integration Tests
//!
//! Requests go through the full router with `tower::ServiceExt::oneshot`;
//! streamed bodies are read back with the same `FrameDecoder` clients use.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use serde_json::{json, Value};
use tower::ServiceExt;
use visa_advisor::services::PassthroughTranslator;
use visa_advisor::storage::CorridorStore;
use visa_advisor::{build_router, AppConfig, AppState};
use visa_advisor_core::{AdvisorEvent, CompletionResult, Frame, FrameDecoder};

use super::support::fast_config;

fn app(config: AppConfig) -> axum::Router {
    let corridors = CorridorStore::builtin().unwrap();
    let state = AppState::with_parts(
        config,
        None,
        Arc::new(corridors),
        Arc::new(PassthroughTranslator),
    )
    .unwrap();
    build_router(state)
}

fn post(path: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

fn research_body() -> Value {
    json!({
        "travelDetails": {
            "passports": ["India"],
            "destination": "Germany",
            "purpose": "business",
            "dates": {"depart": "2026-05-01", "return": "2026-05-20"},
            "travelers": 1
        }
    })
}

async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn json_body(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

async fn frames(response: Response) -> Vec<Frame> {
    let bytes = body_bytes(response).await;
    let text = String::from_utf8(bytes).unwrap();
    let mut decoder = FrameDecoder::new();
    let frames = decoder.push(&text);
    assert!(!decoder.has_partial());
    assert_eq!(decoder.skipped(), 0);
    frames
}

fn events(frames: &[Frame]) -> Vec<&AdvisorEvent> {
    frames
        .iter()
        .filter_map(|f| match f {
            Frame::Event(e) => Some(e),
            Frame::Done => None,
        })
        .collect()
}

#[tokio::test]
async fn test_health_reports_backend_and_corridors() {
    let response = app(fast_config())
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["backend"], false);
    assert!(body["corridors"].as_u64().unwrap() >= 3);
}

#[tokio::test]
async fn test_invalid_json_is_rejected_before_streaming() {
    let response = app(fast_config())
        .oneshot(post("/api/research", "{not json"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Invalid JSON body");
    assert!(body["details"].as_array().is_some());
}

#[tokio::test]
async fn test_validation_lists_every_violation() {
    let body = json!({
        "travelDetails": {
            "passports": [],
            "destination": "",
            "purpose": "sightseeing",
            "dates": {"depart": "2026-05-20", "return": "2026-05-01"}
        }
    });
    let response = app(fast_config())
        .oneshot(post("/api/research", body.to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Validation failed");
    let details: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(details.len(), 4, "{:?}", details);
    assert!(details.iter().any(|d| d.contains("passports")));
    assert!(details.iter().any(|d| d.contains("purpose")));
    assert!(details.iter().any(|d| d.contains("dates.return")));
}

#[tokio::test]
async fn test_missing_fields_are_a_validation_error() {
    let response = app(fast_config())
        .oneshot(post("/api/advisory", json!({"compliance": []}).to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Validation failed");
}

#[tokio::test]
async fn test_test_mode_streams_scripted_events() {
    let response = app(fast_config())
        .oneshot(post("/api/analyze", json!({"testMode": true}).to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "text/event-stream");
    assert_eq!(headers[header::CACHE_CONTROL], "no-cache");
    assert_eq!(headers["x-accel-buffering"], "no");

    let frames = frames(response).await;
    assert_eq!(frames.last(), Some(&Frame::Done));
    assert_eq!(frames.iter().filter(|f| **f == Frame::Done).count(), 1);

    let events = events(&frames);
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    match events.last() {
        Some(AdvisorEvent::Complete(c)) => match &c.result {
            CompletionResult::Scripted(value) => assert_eq!(value["endpoint"], "analyze"),
            other => panic!("unexpected result {:?}", other),
        },
        other => panic!("expected complete, got {:?}", other),
    }
}

#[tokio::test]
async fn test_research_stream_ends_with_done() {
    let response = app(fast_config())
        .oneshot(post("/api/research", research_body().to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let frames = frames(response).await;
    assert_eq!(frames.last(), Some(&Frame::Done));

    let events = events(&frames);
    assert!(matches!(
        events.last(),
        Some(AdvisorEvent::Complete(c)) if matches!(c.result, CompletionResult::Checklist(_))
    ));
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
}

#[tokio::test]
async fn test_rate_limit_rejects_burst_from_one_client() {
    let mut config = fast_config();
    config.rate_limit.requests_per_minute = 1;
    config.rate_limit.burst = 1;
    let app = app(config);
    let client: SocketAddr = "203.0.113.7:40000".parse().unwrap();

    let request = |body: String| {
        let mut request = post("/api/research", body);
        request.extensions_mut().insert(ConnectInfo(client));
        request
    };

    let first = app
        .clone()
        .oneshot(request(research_body().to_string()))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .clone()
        .oneshot(request(research_body().to_string()))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = json_body(second).await;
    assert!(body["error"].as_str().unwrap().starts_with("Rate limit exceeded"));
}
