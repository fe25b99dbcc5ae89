// handlers/protected/links.rs - POST /api/links and GET /api/links

use axum::{
    extract::{Query, State},
    response::Json,
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;
use crate::store::models::NewLink;
use crate::types::Principal;

#[derive(Debug, Deserialize)]
pub struct LinkQuery {
    pub doctor_id: String,
}

/// POST /api/links - Mint a short link for a doctor
pub async fn create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<NewLink>,
) -> Result<Json<Value>, ApiError> {
    let link = state.links.create(&principal, body).await?;

    Ok(Json(json!({ "success": true, "data": link })))
}

/// GET /api/links?doctor_id=... - List a doctor's short links with click counts
pub async fn list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<LinkQuery>,
) -> Result<Json<Value>, ApiError> {
    let links = state
        .links
        .list_for_doctor(&principal, &query.doctor_id)
        .await?;

    Ok(Json(json!({ "success": true, "data": links })))
}
