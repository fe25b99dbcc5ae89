pub mod memory;
pub mod models;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use models::{
    AuditEntry, Clinic, ClinicMembership, DoctorProfile, LinkMapping, MemberRole, MemberStatus,
    NewClinic, NewDoctorProfile, NewInvite, NewLead, NewLink, NewPhysician, PermissionSet,
    Physician, QuizLead,
};

/// Errors from the backing store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// What the backing schema supports, probed once at startup. Operations
/// depending on an absent capability fail loudly instead of falling back to
/// process-local state.
#[derive(Debug, Clone, Copy)]
pub struct StoreCapabilities {
    /// Whether membership rows carry a mutable status column (suspension)
    pub member_suspension: bool,
}

impl Default for StoreCapabilities {
    fn default() -> Self {
        Self {
            member_suspension: true,
        }
    }
}

/// Result of attempting to consume an invite token. Only `Accepted` mutates
/// anything; the other outcomes let the team service report a precise
/// reason without a second lookup racing the first.
#[derive(Debug)]
pub enum InviteTokenOutcome {
    Accepted(ClinicMembership),
    Expired,
    AlreadyUsed,
    Unknown,
}

pub type DynStore = Arc<dyn Store>;

/// Port to the relational store. The server never talks to a database
/// directly; everything flows through this trait so the same services run
/// over PostgreSQL in deployment and the in-memory backend in development
/// and tests.
#[async_trait]
pub trait Store: Send + Sync {
    async fn health_check(&self) -> Result<(), StoreError>;

    fn capabilities(&self) -> StoreCapabilities;

    // --- Clinics ---

    async fn clinic(&self, id: Uuid) -> Result<Option<Clinic>, StoreError>;

    /// Creates the clinic and seeds its owner membership (active, linked to
    /// the owning principal).
    async fn create_clinic(&self, clinic: NewClinic) -> Result<Clinic, StoreError>;

    // --- Doctor profiles ---

    async fn doctor_profile(&self, id: Uuid) -> Result<Option<DoctorProfile>, StoreError>;

    async fn doctor_profiles_for_principal(
        &self,
        principal_id: &str,
    ) -> Result<Vec<DoctorProfile>, StoreError>;

    async fn create_doctor_profile(
        &self,
        profile: NewDoctorProfile,
    ) -> Result<DoctorProfile, StoreError>;

    /// Idempotent get-or-create of the lazily provisioned profile for a
    /// first-time principal. Concurrent callers get the same row; the bool
    /// reports whether this call created it.
    async fn provision_doctor_profile(
        &self,
        principal_id: &str,
        email: &str,
    ) -> Result<(DoctorProfile, bool), StoreError>;

    async fn set_access_control(
        &self,
        profile_id: Uuid,
        granted: bool,
    ) -> Result<DoctorProfile, StoreError>;

    // --- Memberships ---

    async fn membership(&self, id: Uuid) -> Result<Option<ClinicMembership>, StoreError>;

    async fn memberships_for_clinic(
        &self,
        clinic_id: Uuid,
    ) -> Result<Vec<ClinicMembership>, StoreError>;

    async fn membership_for_principal(
        &self,
        clinic_id: Uuid,
        principal_id: &str,
    ) -> Result<Option<ClinicMembership>, StoreError>;

    /// Pending or active membership for (clinic, email); suspended and
    /// expired-pending rows do not count as live.
    async fn live_membership_by_email(
        &self,
        clinic_id: Uuid,
        email: &str,
    ) -> Result<Option<ClinicMembership>, StoreError>;

    /// Upsert-or-reject keyed on (clinic, email): a live row conflicts, a
    /// dead row (expired pending / inactive) is replaced in place with the
    /// fresh invite.
    async fn upsert_invite(&self, invite: NewInvite) -> Result<ClinicMembership, StoreError>;

    /// Single guarded transition (pending, unexpired, hash match) ->
    /// (active, principal linked). A second consume of the same token loses.
    async fn consume_invite_token(
        &self,
        token_hash: &str,
        principal_id: &str,
    ) -> Result<InviteTokenOutcome, StoreError>;

    async fn update_membership_role(
        &self,
        id: Uuid,
        role: MemberRole,
        permissions: PermissionSet,
    ) -> Result<ClinicMembership, StoreError>;

    async fn remove_membership(&self, id: Uuid) -> Result<(), StoreError>;

    async fn set_membership_status(
        &self,
        id: Uuid,
        status: MemberStatus,
    ) -> Result<ClinicMembership, StoreError>;

    // --- Physicians ---

    async fn physicians_for_clinic(&self, clinic_id: Uuid) -> Result<Vec<Physician>, StoreError>;

    async fn create_physician(&self, physician: NewPhysician) -> Result<Physician, StoreError>;

    // --- Short links ---

    async fn link_by_code(&self, code: &str) -> Result<Option<LinkMapping>, StoreError>;

    /// Inserts a mapping under a caller-generated code; `Conflict` when the
    /// code is already taken so the caller can re-roll.
    async fn create_link(&self, code: String, link: NewLink) -> Result<LinkMapping, StoreError>;

    /// Atomic `clicks = clicks + 1`; never read-modify-write.
    async fn increment_clicks(&self, code: &str) -> Result<(), StoreError>;

    async fn links_for_doctor(&self, doctor_id: &str) -> Result<Vec<LinkMapping>, StoreError>;

    // --- Leads ---

    async fn insert_lead(&self, lead: NewLead) -> Result<QuizLead, StoreError>;

    async fn leads_for_doctor(&self, doctor_id: &str) -> Result<Vec<QuizLead>, StoreError>;

    // --- Audit ---

    async fn record_audit(&self, entry: AuditEntry) -> Result<(), StoreError>;

    async fn audit_entries(&self, entity: &str) -> Result<Vec<AuditEntry>, StoreError>;
}
