// handlers/protected/team.rs - /api/team/:clinic_id/* membership management

use axum::{
    extract::{Path, State},
    response::Json,
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::services::team::InviteRequest;
use crate::store::models::{MemberRole, NewPhysician, PermissionSet};
use crate::types::Principal;

#[derive(Debug, Deserialize)]
pub struct InviteBody {
    pub email: String,
    pub name: Option<String>,
    /// Defaults to staff; owner invites are rejected by the service
    pub role: Option<MemberRole>,
    #[serde(default)]
    pub permissions: PermissionSet,
    #[serde(default)]
    pub location_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleBody {
    pub role: MemberRole,
    pub permissions: Option<PermissionSet>,
}

#[derive(Debug, Deserialize)]
pub struct PhysicianBody {
    pub name: String,
    pub credentials: Option<String>,
    pub bio: Option<String>,
    pub headshot_url: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// GET /api/team/:clinic_id/members - Roster: member views plus physicians
pub async fn members(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(clinic_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    // Any live member of the clinic may read the roster
    state.team.actor_role(clinic_id, &principal.id).await?;

    let roster = state.directory.roster(clinic_id).await?;

    Ok(Json(json!({ "success": true, "data": roster })))
}

/// POST /api/team/:clinic_id/invites - Invite a member by email.
///
/// The response carries the raw invite token; it is shown exactly once and
/// only its hash is stored.
pub async fn invite(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(clinic_id): Path<Uuid>,
    Json(body): Json<InviteBody>,
) -> Result<Json<Value>, ApiError> {
    let issued = state
        .team
        .invite(
            &principal,
            InviteRequest {
                clinic_id,
                email: body.email,
                name: body.name,
                role: body.role.unwrap_or(MemberRole::Staff),
                permissions: body.permissions,
                location_ids: body.location_ids,
            },
        )
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "membership": issued.membership,
            "invite_token": issued.invite_token
        }
    })))
}

/// PUT /api/team/:clinic_id/members/:member_id/role - Change a staff row's role
pub async fn update_role(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((clinic_id, member_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdateRoleBody>,
) -> Result<Json<Value>, ApiError> {
    let membership = state
        .team
        .update_role(&principal, clinic_id, member_id, body.role, body.permissions)
        .await?;

    Ok(Json(json!({ "success": true, "data": membership })))
}

/// DELETE /api/team/:clinic_id/members/:member_id - Remove a staff row
pub async fn remove(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((clinic_id, member_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, ApiError> {
    state.team.remove(&principal, clinic_id, member_id).await?;

    Ok(Json(json!({ "success": true, "data": { "removed": member_id } })))
}

/// POST /api/team/:clinic_id/members/:member_id/suspend
pub async fn suspend(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((clinic_id, member_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, ApiError> {
    let membership = state
        .team
        .suspend(&principal, clinic_id, member_id)
        .await?;

    Ok(Json(json!({ "success": true, "data": membership })))
}

/// POST /api/team/:clinic_id/members/:member_id/reactivate
pub async fn reactivate(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((clinic_id, member_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, ApiError> {
    let membership = state
        .team
        .reactivate(&principal, clinic_id, member_id)
        .await?;

    Ok(Json(json!({ "success": true, "data": membership })))
}

/// POST /api/team/:clinic_id/physicians - Add a display-roster physician
pub async fn add_physician(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(clinic_id): Path<Uuid>,
    Json(body): Json<PhysicianBody>,
) -> Result<Json<Value>, ApiError> {
    let physician = state
        .team
        .add_physician(
            &principal,
            NewPhysician {
                clinic_id,
                name: body.name,
                credentials: body.credentials,
                bio: body.bio,
                headshot_url: body.headshot_url,
                email: body.email,
                phone: body.phone,
            },
        )
        .await?;

    Ok(Json(json!({ "success": true, "data": physician })))
}
