// handlers/public/links.rs - GET /s/:code short link redirect

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::app::AppState;
use crate::error::ApiError;
use crate::services::links::LinkError;

/// GET /s/:code - Resolve a short link and answer 302 to its target.
///
/// Unknown codes answer 404 with a `fallback` destination so the client can
/// show a "link not found" state before navigating away.
pub async fn get(State(state): State<AppState>, Path(code): Path<String>) -> Response {
    match state.links.resolve(&code).await {
        Ok(target) => {
            (StatusCode::FOUND, [(header::LOCATION, target.location())]).into_response()
        }
        Err(LinkError::NotFound(_)) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "success": false,
                "error": format!("Short link '{}' was not found", code),
                "fallback": "/"
            })),
        )
            .into_response(),
        Err(err) => ApiError::from(err).into_response(),
    }
}
