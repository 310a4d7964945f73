//! HTTP Routes
//!
//! `POST /api/research`, `POST /api/analyze`, `POST /api/advisory` answer
//! with an event stream; `GET /health` with a JSON summary. Request bodies
//! are read as raw bytes so malformed JSON gets the same 400 body as a
//! schema violation.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, DefaultBodyLimit, State};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use futures_util::stream;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::sse::sse_response;
use crate::models::request::{
    AdvisoryRequest, AnalyzeRequest, ResearchRequest, MAX_DOCUMENTS, MAX_DOCUMENT_BYTES,
};
use crate::services::scripted::scripted_events;
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};

/// Largest accepted request body: every document at full size, base64
/// encoded, plus room for the JSON around them.
pub const MAX_BODY_BYTES: usize =
    (MAX_DOCUMENTS as u64 * MAX_DOCUMENT_BYTES * 4 / 3) as usize + 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let cors = if state.config().server.cors_permissive {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    };

    Router::new()
        .route("/health", get(health))
        .route("/api/research", post(research))
        .route("/api/analyze", post(analyze))
        .route("/api/advisory", post(advisory))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "backend": state.orchestrator().has_backend(),
        "corridors": state.corridors().len(),
    }))
}

async fn research(
    State(state): State<AppState>,
    client: Option<ConnectInfo<SocketAddr>>,
    body: Bytes,
) -> AppResult<Response> {
    let value = parse_body(&body)?;
    if is_test_mode(&value) {
        return scripted_response("research");
    }
    let request: ResearchRequest = decode(value)?;
    reject_invalid(request.validate())?;
    admit(&state, client)?;

    tracing::info!("[Server] research {}", request.travel_details.corridor_label());
    sse_response(state.orchestrator().run_research(request.travel_details))
}

async fn analyze(
    State(state): State<AppState>,
    client: Option<ConnectInfo<SocketAddr>>,
    body: Bytes,
) -> AppResult<Response> {
    let value = parse_body(&body)?;
    if is_test_mode(&value) {
        return scripted_response("analyze");
    }
    let request: AnalyzeRequest = decode(value)?;
    reject_invalid(request.validate())?;
    admit(&state, client)?;

    tracing::info!(
        "[Server] analyze {} with {} documents",
        request.travel_details.corridor_label(),
        request.documents.len()
    );
    sse_response(state.orchestrator().run_analysis(request))
}

async fn advisory(
    State(state): State<AppState>,
    client: Option<ConnectInfo<SocketAddr>>,
    body: Bytes,
) -> AppResult<Response> {
    let value = parse_body(&body)?;
    if is_test_mode(&value) {
        return scripted_response("advisory");
    }
    let request: AdvisoryRequest = decode(value)?;
    reject_invalid(request.validate())?;
    admit(&state, client)?;

    tracing::info!(
        "[Server] advisory with {} compliance results",
        request.compliance.len()
    );
    sse_response(state.orchestrator().run_advisory(request))
}

// ── Helpers ────────────────────────────────────────────────────────────

fn parse_body(body: &[u8]) -> AppResult<Value> {
    serde_json::from_slice(body).map_err(|e| AppError::BadRequest {
        message: "Invalid JSON body".to_string(),
        details: vec![e.to_string()],
    })
}

fn is_test_mode(value: &Value) -> bool {
    value.get("testMode").and_then(Value::as_bool).unwrap_or(false)
}

fn decode<T: DeserializeOwned>(value: Value) -> AppResult<T> {
    serde_json::from_value(value).map_err(|e| AppError::validation(vec![e.to_string()]))
}

fn reject_invalid(errors: Vec<String>) -> AppResult<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::validation(errors))
    }
}

fn admit(state: &AppState, client: Option<ConnectInfo<SocketAddr>>) -> AppResult<()> {
    match client {
        Some(ConnectInfo(addr)) => state.rate_limiter().check(addr.ip()),
        None => Ok(()),
    }
}

fn scripted_response(endpoint: &str) -> AppResult<Response> {
    tracing::info!("[Server] test mode playback for {}", endpoint);
    sse_response(stream::iter(scripted_events(endpoint)))
}
