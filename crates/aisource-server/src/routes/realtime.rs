use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::{error::AppError, state::AppState};

/// Feed size cap.
const RECENT_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct RealtimeQuery {
    #[serde(rename = "siteId")]
    pub site_id: Option<String>,
}

/// `GET /api/realtime?siteId=...` — the 50 most recent events from the
/// last 24 hours, newest first, plus a response timestamp.
pub async fn get_realtime(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RealtimeQuery>,
) -> Result<impl IntoResponse, AppError> {
    let site_id = query
        .site_id
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("siteId is required".to_string()))?;

    let now = Utc::now();
    let events = state
        .db
        .recent_events(&site_id, now - Duration::days(1), RECENT_LIMIT)
        .await
        .map_err(AppError::Internal)?;

    Ok(Json(json!({
        "events": events,
        "timestamp": now.to_rfc3339(),
    })))
}
