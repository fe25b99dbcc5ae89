// handlers/public/intake.rs - POST /api/webhook/lead handler

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::app::AppState;
use crate::services::intake::{IntakeError, LeadSubmission};

/// POST /api/webhook/lead - Accept one completed assessment.
///
/// Unauthenticated: assessment clients post here directly, so the payload
/// is validated regardless of where it came from. Validation and storage
/// failures both answer 400 on this endpoint; `n8n_triggered` reports
/// whether an outbound delivery was attempted at all.
pub async fn post(
    State(state): State<AppState>,
    Json(submission): Json<LeadSubmission>,
) -> Response {
    match state.intake.submit(submission).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": outcome.envelope,
                "message": "Lead captured",
                "webhook_id": outcome.lead.id,
                "n8n_triggered": outcome.dispatch.attempted()
            })),
        )
            .into_response(),
        Err(err) => {
            let (error, details) = match &err {
                IntakeError::MissingField(field) => (
                    format!("Missing required field: {}", field),
                    json!({ "field": field }),
                ),
                IntakeError::PermissionDenied(msg) => (msg.clone(), json!(null)),
                IntakeError::Storage(_) => (
                    "Lead could not be stored".to_string(),
                    json!({ "operation": "insert_lead" }),
                ),
            };

            (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "success": false,
                    "error": error,
                    "details": details
                })),
            )
                .into_response()
        }
    }
}
