use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use aisource_core::{analytics::aggregate_with_previous, window::LookbackWindow};

use crate::{auth::Caller, error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    #[serde(rename = "siteId")]
    pub site_id: Option<String>,
    pub days: Option<i64>,
}

/// `GET /api/analytics?siteId=...&days=N` — the dashboard summary for one
/// site over a trailing window (`days` defaults to 7).
///
/// Ownership failures answer 404, not 403, so callers cannot probe which
/// site ids exist. Any sub-query failure aborts the whole aggregate —
/// no partial results.
pub async fn get_analytics(
    State(state): State<Arc<AppState>>,
    Caller(owner_id): Caller,
    Query(query): Query<AnalyticsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let site_id = query
        .site_id
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("siteId is required".to_string()))?;

    let site = state
        .db
        .get_site(&site_id)
        .await
        .map_err(AppError::Internal)?
        .filter(|s| s.owner_id == owner_id)
        .ok_or_else(|| AppError::NotFound("Site not found".to_string()))?;

    let window = LookbackWindow::from_days(query.days.unwrap_or(7));
    let now = Utc::now();

    let current = state
        .db
        .events_between(&site.id, window.start(now), now)
        .await
        .map_err(AppError::Internal)?;
    let previous = state
        .db
        .events_between(&site.id, window.previous_start(now), window.start(now))
        .await
        .map_err(AppError::Internal)?;

    let summary = aggregate_with_previous(&current, &previous, window, now);

    Ok(Json(json!({
        "totalViews": summary.total_views,
        "aiViews": summary.ai_views,
        "topAiSources": summary.top_ai_sources,
        "topPages": summary.top_pages,
    })))
}
