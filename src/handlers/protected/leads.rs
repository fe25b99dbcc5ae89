// handlers/protected/leads.rs - GET /api/leads handler

use axum::{
    extract::{Query, State},
    response::Json,
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;
use crate::types::Principal;

#[derive(Debug, Deserialize)]
pub struct LeadQuery {
    pub doctor_id: String,
}

/// GET /api/leads?doctor_id=... - List stored leads for a doctor.
///
/// Requires a granted access gate on top of the per-doctor leads
/// permission; a revoked caller cannot read leads even for their own
/// profile.
pub async fn list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<LeadQuery>,
) -> Result<Json<Value>, ApiError> {
    let status = state.gate.check(&principal).await;
    if !status.granted {
        return Err(ApiError::permission_denied(
            "portal access is not granted for this account",
        ));
    }

    let leads = state
        .intake
        .leads_for(&principal, &query.doctor_id)
        .await?;

    Ok(Json(json!({ "success": true, "data": leads })))
}
