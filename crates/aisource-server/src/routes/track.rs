use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};

use aisource_core::event::{Event, TrackPayload};

use crate::state::AppState;

/// `POST /api/track` — ingest one collector event.
///
/// ## Auth
/// None. The collector runs on arbitrary third-party origins; the CORS
/// layer answers the preflight with a wildcard origin.
///
/// ## Wire contract
/// The body status flag is explicit so the collector's tolerant error
/// handling can distinguish outcomes without relying on HTTP status alone:
/// - `200 {"status": 1, "error": null}` — stored.
/// - `400 {"status": 0, "error": "Invalid request"}` — body is not JSON.
/// - `400 {"status": 0, "error": "Missing required fields"}` — JSON but
///   lacking `event`, `properties.token`, `distinct_id`, or `session_id`.
/// - `500 {"error": "Failed to save event"}` — store failure.
///
/// ## Enrichment
/// Client IP from the first `x-forwarded-for` entry, else `x-real-ip`,
/// else the "unknown" sentinel — a missing IP never fails the request.
#[tracing::instrument(skip(state, headers, body))]
pub async fn track(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    // Two-stage parse: syntax errors and missing fields are distinct
    // caller errors.
    let raw: Value = match serde_json::from_str(&body) {
        Ok(v) => v,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "status": 0, "error": "Invalid request" })),
            )
                .into_response();
        }
    };
    let payload = match TrackPayload::from_json(&raw) {
        Ok(p) => p,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "status": 0, "error": e.to_string() })),
            )
                .into_response();
        }
    };

    let client_ip = extract_client_ip(&headers);
    let event = Event::from_track(payload, client_ip, Utc::now());

    match state.db.insert_event(&event).await {
        Ok(()) => Json(json!({ "status": 1, "error": null })).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to save event");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to save event" })),
            )
                .into_response()
        }
    }
}

/// Extract the real client IP from proxy headers.
///
/// First of: `x-forwarded-for` (first entry), `x-real-ip`. Falls back to
/// `"unknown"` — analytics enrichment, not an access-control input.
fn extract_client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
        .unwrap_or_else(|| "unknown".to_string())
}
