use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{
    AuditEntry, Clinic, ClinicMembership, DoctorProfile, LinkMapping, MemberRole, MemberStatus,
    NewClinic, NewDoctorProfile, NewInvite, NewLead, NewLink, NewPhysician, PermissionSet,
    Physician, QuizLead,
};
use super::{InviteTokenOutcome, Store, StoreCapabilities, StoreError};

#[derive(Default)]
struct Inner {
    clinics: HashMap<Uuid, Clinic>,
    profiles: HashMap<Uuid, DoctorProfile>,
    memberships: HashMap<Uuid, ClinicMembership>,
    physicians: HashMap<Uuid, Physician>,
    links: HashMap<String, LinkMapping>,
    leads: Vec<QuizLead>,
    audit: Vec<AuditEntry>,
}

/// In-process backend used when no DATABASE_URL is configured, and by the
/// test suite. Every mutation takes the single write lock, which is what
/// makes compound operations (provision, invite consume) atomic here.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    caps: StoreCapabilities,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend with an explicit capability set, mirroring what a probed
    /// PostgreSQL deployment might report.
    pub fn with_capabilities(caps: StoreCapabilities) -> Self {
        Self {
            inner: RwLock::default(),
            caps,
        }
    }
}

fn membership_is_live(m: &ClinicMembership) -> bool {
    match m.status {
        MemberStatus::Active => true,
        MemberStatus::Pending => m
            .invite_expires_at
            .map(|exp| exp > Utc::now())
            .unwrap_or(false),
        MemberStatus::Inactive => false,
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn capabilities(&self) -> StoreCapabilities {
        self.caps
    }

    async fn clinic(&self, id: Uuid) -> Result<Option<Clinic>, StoreError> {
        Ok(self.inner.read().await.clinics.get(&id).cloned())
    }

    async fn create_clinic(&self, clinic: NewClinic) -> Result<Clinic, StoreError> {
        let now = Utc::now();
        let row = Clinic {
            id: Uuid::new_v4(),
            name: clinic.name,
            email: clinic.email,
            phone: clinic.phone,
            address: clinic.address,
            primary_color: None,
            secondary_color: None,
            font: None,
            logo_url: None,
            tagline: None,
            owner_principal_id: clinic.owner_principal_id.clone(),
            created_at: now,
            updated_at: now,
        };
        let owner = ClinicMembership {
            id: Uuid::new_v4(),
            clinic_id: row.id,
            email: clinic.owner_email,
            name: None,
            role: MemberRole::Owner,
            permissions: PermissionSet::all(),
            status: MemberStatus::Active,
            principal_id: Some(clinic.owner_principal_id),
            invite_token_hash: None,
            invite_expires_at: None,
            invited_by: None,
            accepted_at: Some(now),
            location_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        let mut inner = self.inner.write().await;
        inner.clinics.insert(row.id, row.clone());
        inner.memberships.insert(owner.id, owner);
        Ok(row)
    }

    async fn doctor_profile(&self, id: Uuid) -> Result<Option<DoctorProfile>, StoreError> {
        Ok(self.inner.read().await.profiles.get(&id).cloned())
    }

    async fn doctor_profiles_for_principal(
        &self,
        principal_id: &str,
    ) -> Result<Vec<DoctorProfile>, StoreError> {
        let inner = self.inner.read().await;
        let mut rows: Vec<DoctorProfile> = inner
            .profiles
            .values()
            .filter(|p| p.principal_id == principal_id)
            .cloned()
            .collect();
        rows.sort_by_key(|p| p.created_at);
        Ok(rows)
    }

    async fn create_doctor_profile(
        &self,
        profile: NewDoctorProfile,
    ) -> Result<DoctorProfile, StoreError> {
        let now = Utc::now();
        let row = DoctorProfile {
            id: Uuid::new_v4(),
            principal_id: profile.principal_id,
            clinic_id: profile.clinic_id,
            clinic_name: profile.clinic_name,
            email: profile.email,
            full_name: profile.full_name,
            phone: None,
            specialty: profile.specialty,
            access_control: profile.access_control,
            is_staff: profile.is_staff,
            is_manager: false,
            is_admin: false,
            twilio_phone: None,
            twilio_account_sid: None,
            twilio_auth_token: None,
            created_at: now,
            updated_at: now,
        };
        self.inner.write().await.profiles.insert(row.id, row.clone());
        Ok(row)
    }

    async fn provision_doctor_profile(
        &self,
        principal_id: &str,
        email: &str,
    ) -> Result<(DoctorProfile, bool), StoreError> {
        let mut inner = self.inner.write().await;
        let mut existing: Vec<&DoctorProfile> = inner
            .profiles
            .values()
            .filter(|p| p.principal_id == principal_id)
            .collect();
        existing.sort_by_key(|p| p.created_at);
        if let Some(first) = existing.first() {
            return Ok(((*first).clone(), false));
        }
        let now = Utc::now();
        let row = DoctorProfile {
            id: Uuid::new_v4(),
            principal_id: principal_id.to_string(),
            clinic_id: None,
            clinic_name: None,
            email: email.to_string(),
            full_name: None,
            phone: None,
            specialty: None,
            access_control: false,
            is_staff: false,
            is_manager: false,
            is_admin: false,
            twilio_phone: None,
            twilio_account_sid: None,
            twilio_auth_token: None,
            created_at: now,
            updated_at: now,
        };
        inner.profiles.insert(row.id, row.clone());
        Ok((row, true))
    }

    async fn set_access_control(
        &self,
        profile_id: Uuid,
        granted: bool,
    ) -> Result<DoctorProfile, StoreError> {
        let mut inner = self.inner.write().await;
        let row = inner
            .profiles
            .get_mut(&profile_id)
            .ok_or_else(|| StoreError::NotFound(format!("doctor profile {}", profile_id)))?;
        row.access_control = granted;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn membership(&self, id: Uuid) -> Result<Option<ClinicMembership>, StoreError> {
        Ok(self.inner.read().await.memberships.get(&id).cloned())
    }

    async fn memberships_for_clinic(
        &self,
        clinic_id: Uuid,
    ) -> Result<Vec<ClinicMembership>, StoreError> {
        let inner = self.inner.read().await;
        let mut rows: Vec<ClinicMembership> = inner
            .memberships
            .values()
            .filter(|m| m.clinic_id == clinic_id)
            .cloned()
            .collect();
        rows.sort_by_key(|m| m.created_at);
        Ok(rows)
    }

    async fn membership_for_principal(
        &self,
        clinic_id: Uuid,
        principal_id: &str,
    ) -> Result<Option<ClinicMembership>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .memberships
            .values()
            .find(|m| {
                m.clinic_id == clinic_id && m.principal_id.as_deref() == Some(principal_id)
            })
            .cloned())
    }

    async fn live_membership_by_email(
        &self,
        clinic_id: Uuid,
        email: &str,
    ) -> Result<Option<ClinicMembership>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .memberships
            .values()
            .find(|m| {
                m.clinic_id == clinic_id
                    && m.email.eq_ignore_ascii_case(email)
                    && membership_is_live(m)
            })
            .cloned())
    }

    async fn upsert_invite(&self, invite: NewInvite) -> Result<ClinicMembership, StoreError> {
        let mut inner = self.inner.write().await;
        let existing_id = inner
            .memberships
            .values()
            .find(|m| m.clinic_id == invite.clinic_id && m.email.eq_ignore_ascii_case(&invite.email))
            .map(|m| m.id);

        if let Some(id) = existing_id {
            let row = inner.memberships.get_mut(&id).ok_or_else(|| {
                StoreError::Query("membership vanished during upsert".to_string())
            })?;
            if membership_is_live(row) {
                return Err(StoreError::Conflict(format!(
                    "{} already has a live membership in this clinic",
                    invite.email
                )));
            }
            // Dead row (expired pending or inactive): reissue in place
            row.name = invite.name;
            row.role = invite.role;
            row.permissions = invite.permissions;
            row.status = MemberStatus::Pending;
            row.principal_id = None;
            row.invite_token_hash = Some(invite.invite_token_hash);
            row.invite_expires_at = Some(invite.invite_expires_at);
            row.invited_by = Some(invite.invited_by);
            row.accepted_at = None;
            row.location_ids = invite.location_ids;
            row.updated_at = Utc::now();
            return Ok(row.clone());
        }

        let now = Utc::now();
        let row = ClinicMembership {
            id: Uuid::new_v4(),
            clinic_id: invite.clinic_id,
            email: invite.email,
            name: invite.name,
            role: invite.role,
            permissions: invite.permissions,
            status: MemberStatus::Pending,
            principal_id: None,
            invite_token_hash: Some(invite.invite_token_hash),
            invite_expires_at: Some(invite.invite_expires_at),
            invited_by: Some(invite.invited_by),
            accepted_at: None,
            location_ids: invite.location_ids,
            created_at: now,
            updated_at: now,
        };
        inner.memberships.insert(row.id, row.clone());
        Ok(row)
    }

    async fn consume_invite_token(
        &self,
        token_hash: &str,
        principal_id: &str,
    ) -> Result<InviteTokenOutcome, StoreError> {
        let mut inner = self.inner.write().await;
        let id = match inner
            .memberships
            .values()
            .find(|m| m.invite_token_hash.as_deref() == Some(token_hash))
            .map(|m| m.id)
        {
            Some(id) => id,
            None => return Ok(InviteTokenOutcome::Unknown),
        };
        let row = inner
            .memberships
            .get_mut(&id)
            .ok_or_else(|| StoreError::Query("membership vanished during consume".to_string()))?;
        match row.status {
            MemberStatus::Active => Ok(InviteTokenOutcome::AlreadyUsed),
            MemberStatus::Inactive => Ok(InviteTokenOutcome::Unknown),
            MemberStatus::Pending => {
                let expired = row
                    .invite_expires_at
                    .map(|exp| exp <= Utc::now())
                    .unwrap_or(true);
                if expired {
                    return Ok(InviteTokenOutcome::Expired);
                }
                row.status = MemberStatus::Active;
                row.principal_id = Some(principal_id.to_string());
                row.accepted_at = Some(Utc::now());
                row.updated_at = Utc::now();
                Ok(InviteTokenOutcome::Accepted(row.clone()))
            }
        }
    }

    async fn update_membership_role(
        &self,
        id: Uuid,
        role: MemberRole,
        permissions: PermissionSet,
    ) -> Result<ClinicMembership, StoreError> {
        let mut inner = self.inner.write().await;
        let row = inner
            .memberships
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("membership {}", id)))?;
        row.role = role;
        row.permissions = permissions;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn remove_membership(&self, id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner
            .memberships
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("membership {}", id)))
    }

    async fn set_membership_status(
        &self,
        id: Uuid,
        status: MemberStatus,
    ) -> Result<ClinicMembership, StoreError> {
        if !self.caps.member_suspension {
            return Err(StoreError::Unavailable(
                "members schema has no status column".to_string(),
            ));
        }
        let mut inner = self.inner.write().await;
        let row = inner
            .memberships
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("membership {}", id)))?;
        row.status = status;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn physicians_for_clinic(&self, clinic_id: Uuid) -> Result<Vec<Physician>, StoreError> {
        let inner = self.inner.read().await;
        let mut rows: Vec<Physician> = inner
            .physicians
            .values()
            .filter(|p| p.clinic_id == clinic_id)
            .cloned()
            .collect();
        rows.sort_by_key(|p| p.created_at);
        Ok(rows)
    }

    async fn create_physician(&self, physician: NewPhysician) -> Result<Physician, StoreError> {
        let now = Utc::now();
        let row = Physician {
            id: Uuid::new_v4(),
            clinic_id: physician.clinic_id,
            name: physician.name,
            credentials: physician.credentials,
            bio: physician.bio,
            headshot_url: physician.headshot_url,
            email: physician.email,
            phone: physician.phone,
            created_at: now,
            updated_at: now,
        };
        self.inner
            .write()
            .await
            .physicians
            .insert(row.id, row.clone());
        Ok(row)
    }

    async fn link_by_code(&self, code: &str) -> Result<Option<LinkMapping>, StoreError> {
        Ok(self.inner.read().await.links.get(code).cloned())
    }

    async fn create_link(&self, code: String, link: NewLink) -> Result<LinkMapping, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.links.contains_key(&code) {
            return Err(StoreError::Conflict(format!("code {} already in use", code)));
        }
        let row = LinkMapping {
            id: Uuid::new_v4(),
            code: code.clone(),
            doctor_id: link.doctor_id,
            quiz_type: link.quiz_type,
            custom_quiz_id: link.custom_quiz_id,
            lead_source: link.lead_source,
            clicks: 0,
            created_at: Utc::now(),
        };
        inner.links.insert(code, row.clone());
        Ok(row)
    }

    async fn increment_clicks(&self, code: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let row = inner
            .links
            .get_mut(code)
            .ok_or_else(|| StoreError::NotFound(format!("link {}", code)))?;
        row.clicks += 1;
        Ok(())
    }

    async fn links_for_doctor(&self, doctor_id: &str) -> Result<Vec<LinkMapping>, StoreError> {
        let inner = self.inner.read().await;
        let mut rows: Vec<LinkMapping> = inner
            .links
            .values()
            .filter(|l| l.doctor_id == doctor_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn insert_lead(&self, lead: NewLead) -> Result<QuizLead, StoreError> {
        let row = QuizLead {
            id: Uuid::new_v4(),
            name: lead.name,
            email: lead.email,
            phone: lead.phone,
            quiz_type: lead.quiz_type,
            score: lead.score,
            doctor_id: lead.doctor_id,
            lead_status: None,
            lead_source: lead.lead_source,
            share_key: lead.share_key,
            answers: lead.answers,
            max_score: lead.max_score,
            quiz_title: lead.quiz_title,
            quiz_description: lead.quiz_description,
            scheduled_date: None,
            submitted_at: Utc::now(),
        };
        self.inner.write().await.leads.push(row.clone());
        Ok(row)
    }

    async fn leads_for_doctor(&self, doctor_id: &str) -> Result<Vec<QuizLead>, StoreError> {
        let inner = self.inner.read().await;
        let mut rows: Vec<QuizLead> = inner
            .leads
            .iter()
            .filter(|l| l.doctor_id == doctor_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(rows)
    }

    async fn record_audit(&self, entry: AuditEntry) -> Result<(), StoreError> {
        self.inner.write().await.audit.push(entry);
        Ok(())
    }

    async fn audit_entries(&self, entity: &str) -> Result<Vec<AuditEntry>, StoreError> {
        let inner = self.inner.read().await;
        let mut rows: Vec<AuditEntry> = inner
            .audit
            .iter()
            .filter(|a| a.entity == entity)
            .cloned()
            .collect();
        rows.sort_by_key(|a| a.at);
        Ok(rows)
    }
}
