use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::config;
use crate::store::models::{
    AuditEntry, ClinicMembership, DoctorProfile, MemberRole, MemberStatus, NewDoctorProfile,
    NewInvite, NewPhysician, PermissionSet, Physician,
};
use crate::store::{DynStore, InviteTokenOutcome, StoreError};
use crate::types::Principal;

#[derive(Debug, Error)]
pub enum TeamError {
    #[error("Validation failed on {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invite token has expired")]
    InviteExpired,

    #[error("Invite token was already used")]
    InviteConsumed,

    #[error("Unsupported by this deployment: {0}")]
    Unsupported(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Capability view of a membership row. Closed set: there is no way to hold
/// an unnamed combination of rights.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Owner,
    Staff(PermissionSet),
    Physician,
}

impl Role {
    pub fn of(membership: &ClinicMembership) -> Self {
        match membership.role {
            MemberRole::Owner => Role::Owner,
            MemberRole::Staff => Role::Staff(membership.permissions),
            MemberRole::Physician => Role::Physician,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    InviteMember,
    GrantTeamPermission,
    UpdateMemberRole,
    RemoveMember,
    SuspendMember,
    ManagePhysicians,
    ManageLinks,
    ViewLeads,
    ManageAccess,
}

/// The one place where role and permissions turn into a yes/no.
pub fn can(role: &Role, action: Action) -> bool {
    match role {
        Role::Owner => true,
        Role::Staff(perms) => match action {
            Action::InviteMember
            | Action::UpdateMemberRole
            | Action::RemoveMember
            | Action::SuspendMember => perms.team,
            Action::ManageLinks => perms.content,
            Action::ViewLeads => perms.leads,
            Action::GrantTeamPermission | Action::ManagePhysicians | Action::ManageAccess => false,
        },
        Role::Physician => false,
    }
}

#[derive(Debug, Clone)]
pub struct InviteRequest {
    pub clinic_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: MemberRole,
    pub permissions: PermissionSet,
    pub location_ids: Vec<Uuid>,
}

/// The raw token appears here once and is never stored or shown again.
#[derive(Debug, Clone)]
pub struct IssuedInvite {
    pub membership: ClinicMembership,
    pub invite_token: String,
}

/// Clinic-scoped membership management. Every operation resolves the acting
/// principal's own membership first; capability checks are all routed
/// through [`can`].
#[derive(Clone)]
pub struct TeamService {
    store: DynStore,
}

impl TeamService {
    pub fn new(store: DynStore) -> Self {
        Self { store }
    }

    pub async fn invite(
        &self,
        actor: &Principal,
        request: InviteRequest,
    ) -> Result<IssuedInvite, TeamError> {
        let actor_role = self.actor_role(request.clinic_id, &actor.id).await?;
        if !can(&actor_role, Action::InviteMember) {
            return Err(TeamError::PermissionDenied(
                "inviting members requires the team permission".to_string(),
            ));
        }
        if request.permissions.team && !can(&actor_role, Action::GrantTeamPermission) {
            return Err(TeamError::PermissionDenied(
                "only the clinic owner may grant the team permission".to_string(),
            ));
        }
        if request.role == MemberRole::Owner {
            return Err(TeamError::Validation {
                field: "role",
                message: "owner memberships cannot be created by invite".to_string(),
            });
        }
        let email = request.email.trim().to_ascii_lowercase();
        if !valid_email(&email) {
            return Err(TeamError::Validation {
                field: "email",
                message: format!("'{}' is not a valid email address", request.email),
            });
        }

        let raw_token = Uuid::new_v4().to_string();
        let invite = NewInvite {
            clinic_id: request.clinic_id,
            email: email.clone(),
            name: request.name,
            role: request.role,
            permissions: request.permissions,
            invite_token_hash: hash_token(&raw_token),
            invite_expires_at: Utc::now() + Duration::days(config().team.invite_expiry_days),
            invited_by: actor.id.clone(),
            location_ids: request.location_ids,
        };
        let membership = match self.store.upsert_invite(invite).await {
            Ok(membership) => membership,
            Err(StoreError::Conflict(msg)) => return Err(TeamError::Conflict(msg)),
            Err(other) => return Err(other.into()),
        };

        info!(
            "Invited {} to clinic {} as {}",
            email,
            request.clinic_id,
            membership.role.as_str()
        );
        self.audit(
            &actor.id,
            "team.invite",
            format!("membership:{}", membership.id),
            Some(email),
        )
        .await;

        Ok(IssuedInvite {
            membership,
            invite_token: raw_token,
        })
    }

    /// Atomically consumes the token and links the membership to the
    /// authenticating principal. Acceptance also makes sure a clinic-linked
    /// profile exists with access granted for the invited role; it grants
    /// nothing beyond that.
    pub async fn accept_invite(
        &self,
        principal: &Principal,
        token: &str,
    ) -> Result<ClinicMembership, TeamError> {
        let membership = match self
            .store
            .consume_invite_token(&hash_token(token), &principal.id)
            .await?
        {
            InviteTokenOutcome::Accepted(membership) => membership,
            InviteTokenOutcome::Expired => return Err(TeamError::InviteExpired),
            InviteTokenOutcome::AlreadyUsed => return Err(TeamError::InviteConsumed),
            InviteTokenOutcome::Unknown => {
                return Err(TeamError::NotFound("invite token".to_string()))
            }
        };

        let profiles = self
            .store
            .doctor_profiles_for_principal(&principal.id)
            .await?;
        match profiles
            .iter()
            .find(|p| p.clinic_id == Some(membership.clinic_id))
        {
            Some(profile) if profile.access_control => {}
            Some(profile) => {
                self.store.set_access_control(profile.id, true).await?;
            }
            None => {
                let clinic_name = self
                    .store
                    .clinic(membership.clinic_id)
                    .await?
                    .map(|c| c.name);
                self.store
                    .create_doctor_profile(NewDoctorProfile {
                        principal_id: principal.id.clone(),
                        email: membership.email.clone(),
                        clinic_id: Some(membership.clinic_id),
                        clinic_name,
                        full_name: membership.name.clone(),
                        specialty: None,
                        access_control: true,
                        is_staff: membership.role == MemberRole::Staff,
                    })
                    .await?;
            }
        }

        info!(
            "Invite accepted: {} joined clinic {} as {}",
            principal.id,
            membership.clinic_id,
            membership.role.as_str()
        );
        self.audit(
            &principal.id,
            "team.invite_accept",
            format!("membership:{}", membership.id),
            None,
        )
        .await;

        Ok(membership)
    }

    pub async fn update_role(
        &self,
        actor: &Principal,
        clinic_id: Uuid,
        membership_id: Uuid,
        new_role: MemberRole,
        permissions: Option<PermissionSet>,
    ) -> Result<ClinicMembership, TeamError> {
        let actor_role = self.actor_role(clinic_id, &actor.id).await?;
        if !can(&actor_role, Action::UpdateMemberRole) {
            return Err(TeamError::PermissionDenied(
                "updating roles requires the team permission".to_string(),
            ));
        }
        if new_role == MemberRole::Owner {
            return Err(TeamError::PermissionDenied(
                "ownership cannot be assigned through role updates".to_string(),
            ));
        }
        let target = self.staff_target(clinic_id, membership_id).await?;

        let permissions = match (new_role, permissions) {
            (MemberRole::Staff, Some(perms)) => {
                if perms.team
                    && !target.permissions.team
                    && !can(&actor_role, Action::GrantTeamPermission)
                {
                    return Err(TeamError::PermissionDenied(
                        "only the clinic owner may grant the team permission".to_string(),
                    ));
                }
                perms
            }
            (MemberRole::Staff, None) => target.permissions,
            _ => PermissionSet::default(),
        };

        let updated = self
            .store
            .update_membership_role(membership_id, new_role, permissions)
            .await?;
        self.audit(
            &actor.id,
            "team.role_update",
            format!("membership:{}", membership_id),
            Some(new_role.as_str().to_string()),
        )
        .await;
        Ok(updated)
    }

    pub async fn remove(
        &self,
        actor: &Principal,
        clinic_id: Uuid,
        membership_id: Uuid,
    ) -> Result<(), TeamError> {
        let actor_role = self.actor_role(clinic_id, &actor.id).await?;
        if !can(&actor_role, Action::RemoveMember) {
            return Err(TeamError::PermissionDenied(
                "removing members requires the team permission".to_string(),
            ));
        }
        self.staff_target(clinic_id, membership_id).await?;
        self.store.remove_membership(membership_id).await?;
        self.audit(
            &actor.id,
            "team.remove",
            format!("membership:{}", membership_id),
            None,
        )
        .await;
        Ok(())
    }

    pub async fn suspend(
        &self,
        actor: &Principal,
        clinic_id: Uuid,
        membership_id: Uuid,
    ) -> Result<ClinicMembership, TeamError> {
        self.set_status(actor, clinic_id, membership_id, MemberStatus::Inactive)
            .await
    }

    pub async fn reactivate(
        &self,
        actor: &Principal,
        clinic_id: Uuid,
        membership_id: Uuid,
    ) -> Result<ClinicMembership, TeamError> {
        self.set_status(actor, clinic_id, membership_id, MemberStatus::Active)
            .await
    }

    async fn set_status(
        &self,
        actor: &Principal,
        clinic_id: Uuid,
        membership_id: Uuid,
        status: MemberStatus,
    ) -> Result<ClinicMembership, TeamError> {
        if !self.store.capabilities().member_suspension {
            return Err(TeamError::Unsupported(
                "member suspension is not available on this store".to_string(),
            ));
        }
        let actor_role = self.actor_role(clinic_id, &actor.id).await?;
        if !can(&actor_role, Action::SuspendMember) {
            return Err(TeamError::PermissionDenied(
                "suspending members requires the team permission".to_string(),
            ));
        }
        self.staff_target(clinic_id, membership_id).await?;

        let updated = match self.store.set_membership_status(membership_id, status).await {
            Ok(updated) => updated,
            Err(StoreError::Unavailable(msg)) => return Err(TeamError::Unsupported(msg)),
            Err(other) => return Err(other.into()),
        };
        let action = match status {
            MemberStatus::Inactive => "team.suspend",
            _ => "team.reactivate",
        };
        self.audit(&actor.id, action, format!("membership:{}", membership_id), None)
            .await;
        Ok(updated)
    }

    pub async fn grant_access(
        &self,
        actor: &Principal,
        profile_id: Uuid,
    ) -> Result<DoctorProfile, TeamError> {
        self.set_profile_access(actor, profile_id, true).await
    }

    pub async fn revoke_access(
        &self,
        actor: &Principal,
        profile_id: Uuid,
    ) -> Result<DoctorProfile, TeamError> {
        self.set_profile_access(actor, profile_id, false).await
    }

    async fn set_profile_access(
        &self,
        actor: &Principal,
        profile_id: Uuid,
        granted: bool,
    ) -> Result<DoctorProfile, TeamError> {
        let profile = self
            .store
            .doctor_profile(profile_id)
            .await?
            .ok_or_else(|| TeamError::NotFound(format!("doctor profile {}", profile_id)))?;

        if !self.may_manage_access(actor, &profile).await? {
            return Err(TeamError::PermissionDenied(
                "managing access requires clinic ownership or platform admin".to_string(),
            ));
        }

        let updated = self.store.set_access_control(profile_id, granted).await?;
        let action = if granted { "access.grant" } else { "access.revoke" };
        info!("{} for profile {} by {}", action, profile_id, actor.id);
        self.audit(&actor.id, action, format!("profile:{}", profile_id), None)
            .await;
        Ok(updated)
    }

    /// Platform admins may manage any profile; otherwise the actor must own
    /// the clinic the profile is linked to. Unlinked profiles are admin-only.
    async fn may_manage_access(
        &self,
        actor: &Principal,
        profile: &DoctorProfile,
    ) -> Result<bool, TeamError> {
        let actor_profiles = self
            .store
            .doctor_profiles_for_principal(&actor.id)
            .await?;
        if actor_profiles.iter().any(|p| p.is_admin) {
            return Ok(true);
        }
        if let Some(clinic_id) = profile.clinic_id {
            if let Some(membership) = self
                .store
                .membership_for_principal(clinic_id, &actor.id)
                .await?
            {
                return Ok(membership.status == MemberStatus::Active
                    && membership.role == MemberRole::Owner);
            }
        }
        Ok(false)
    }

    pub async fn add_physician(
        &self,
        actor: &Principal,
        physician: NewPhysician,
    ) -> Result<Physician, TeamError> {
        let actor_role = self.actor_role(physician.clinic_id, &actor.id).await?;
        if !can(&actor_role, Action::ManagePhysicians) {
            return Err(TeamError::PermissionDenied(
                "managing the physician roster requires clinic ownership".to_string(),
            ));
        }
        if physician.name.trim().is_empty() {
            return Err(TeamError::Validation {
                field: "name",
                message: "physician name is required".to_string(),
            });
        }
        let created = self.store.create_physician(physician).await?;
        self.audit(
            &actor.id,
            "team.physician_add",
            format!("physician:{}", created.id),
            None,
        )
        .await;
        Ok(created)
    }

    /// Resolves the acting principal's live membership in the clinic.
    pub async fn actor_role(&self, clinic_id: Uuid, principal_id: &str) -> Result<Role, TeamError> {
        let membership = self
            .store
            .membership_for_principal(clinic_id, principal_id)
            .await?
            .ok_or_else(|| {
                TeamError::PermissionDenied("not a member of this clinic".to_string())
            })?;
        if membership.status != MemberStatus::Active {
            return Err(TeamError::PermissionDenied(
                "membership is not active".to_string(),
            ));
        }
        Ok(Role::of(&membership))
    }

    /// Only staff rows are managed through the generic operations; owner and
    /// physician targets are rejected, never silently skipped.
    async fn staff_target(
        &self,
        clinic_id: Uuid,
        membership_id: Uuid,
    ) -> Result<ClinicMembership, TeamError> {
        let target = self
            .store
            .membership(membership_id)
            .await?
            .filter(|m| m.clinic_id == clinic_id)
            .ok_or_else(|| TeamError::NotFound(format!("membership {}", membership_id)))?;
        if target.role != MemberRole::Staff {
            return Err(TeamError::PermissionDenied(format!(
                "{} memberships cannot be managed through this operation",
                target.role.as_str()
            )));
        }
        Ok(target)
    }

    /// Best-effort: the mutation has already happened, so a failed audit
    /// write is logged, not raised.
    async fn audit(&self, actor: &str, action: &str, entity: String, detail: Option<String>) {
        let entry = AuditEntry::new(actor, action, entity, detail);
        if let Err(err) = self.store.record_audit(entry).await {
            warn!("Failed to record audit entry for {}: {}", action, err);
        }
    }
}

/// Whether the actor may act on data attributed to `doctor_id`: their own
/// profile, a platform admin, or the named capability in the clinic the
/// target profile is linked to. Unresolvable attribution targets are a no.
pub async fn attribution_allowed(
    store: &DynStore,
    actor: &Principal,
    doctor_id: &str,
    action: Action,
) -> Result<bool, StoreError> {
    let actor_profiles = store.doctor_profiles_for_principal(&actor.id).await?;
    if actor_profiles.iter().any(|p| p.is_admin) {
        return Ok(true);
    }
    if actor_profiles.iter().any(|p| p.id.to_string() == doctor_id) {
        return Ok(true);
    }

    let Ok(target_id) = Uuid::parse_str(doctor_id) else {
        return Ok(false);
    };
    let Some(target) = store.doctor_profile(target_id).await? else {
        return Ok(false);
    };
    let Some(clinic_id) = target.clinic_id else {
        return Ok(false);
    };
    let Some(membership) = store.membership_for_principal(clinic_id, &actor.id).await? else {
        return Ok(false);
    };
    if membership.status != MemberStatus::Active {
        return Ok(false);
    }
    Ok(can(&Role::of(&membership), action))
}

fn hash_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !email.contains(' ')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}
