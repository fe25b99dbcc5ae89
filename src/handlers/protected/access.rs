// handlers/protected/access.rs - access gate and access_control endpoints

use axum::{
    extract::{Path, State},
    response::Json,
    Extension,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::types::Principal;

/// GET /api/access/check - Evaluate the access gate for the caller.
///
/// Denial is a decision, not an error: this endpoint always answers 200
/// with `granted`, an optional `reason`, and the caller's profile flags.
pub async fn check(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Json<Value> {
    let status = state.gate.check(&principal).await;

    Json(json!({ "success": true, "data": status }))
}

/// POST /api/profiles/:profile_id/access/grant - Set access_control on a profile
pub async fn grant(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(profile_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let profile = state.team.grant_access(&principal, profile_id).await?;

    Ok(Json(json!({ "success": true, "data": profile })))
}

/// POST /api/profiles/:profile_id/access/revoke - Clear access_control on a profile
pub async fn revoke(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(profile_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let profile = state.team.revoke_access(&principal, profile_id).await?;

    Ok(Json(json!({ "success": true, "data": profile })))
}
