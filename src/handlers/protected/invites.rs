// handlers/protected/invites.rs - POST /api/invites/accept handler

use axum::{extract::State, response::Json, Extension};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;
use crate::types::Principal;

#[derive(Debug, Deserialize)]
pub struct AcceptBody {
    /// Raw invite token exactly as it appeared in the invite response
    pub token: String,
}

/// POST /api/invites/accept - Consume an invite token for the caller.
///
/// Expired tokens answer 410, already-used tokens 409; a successful accept
/// links the caller's principal to the membership and grants portal access.
pub async fn accept(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<AcceptBody>,
) -> Result<Json<Value>, ApiError> {
    let membership = state.team.accept_invite(&principal, &body.token).await?;

    Ok(Json(json!({ "success": true, "data": membership })))
}
