use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;

use aisource_core::site::{embed_snippet, CreateSiteParams};

use crate::{auth::Caller, error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct CreateSiteRequest {
    pub domain: Option<String>,
    pub name: Option<String>,
}

/// `GET /api/sites` — all sites owned by the caller, newest first.
pub async fn list_sites(
    State(state): State<Arc<AppState>>,
    Caller(owner_id): Caller,
) -> Result<impl IntoResponse, AppError> {
    let sites = state
        .db
        .list_sites(&owner_id)
        .await
        .map_err(AppError::Internal)?;
    Ok(Json(json!({ "sites": sites })))
}

/// `POST /api/sites` — register a tracked site and issue its embed snippet.
pub async fn create_site(
    State(state): State<Arc<AppState>>,
    Caller(owner_id): Caller,
    Json(req): Json<CreateSiteRequest>,
) -> Result<impl IntoResponse, AppError> {
    let domain = req.domain.unwrap_or_default();
    let name = req.name.unwrap_or_default();
    if domain.is_empty() || name.is_empty() {
        return Err(AppError::BadRequest(
            "Domain and name are required".to_string(),
        ));
    }

    let site = state
        .db
        .create_site(CreateSiteParams {
            domain,
            name,
            owner_id,
        })
        .await
        .map_err(AppError::Internal)?;

    let snippet = embed_snippet(&state.config.public_url, &site.id);

    Ok(Json(json!({ "site": site, "snippet": snippet })))
}
