use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::DatabaseConfig;

use super::models::{
    AuditEntry, Clinic, ClinicMembership, DoctorProfile, LinkMapping, MemberRole, MemberStatus,
    NewClinic, NewDoctorProfile, NewInvite, NewLead, NewLink, NewPhysician, PermissionSet,
    Physician, QuizLead,
};
use super::{InviteTokenOutcome, Store, StoreCapabilities, StoreError};

const SCHEMA: &str = include_str!("schema.sql");

const PROFILE_COLS: &str = "id, principal_id, clinic_id, clinic_name, email, full_name, phone, \
     specialty, access_control, is_staff, is_manager, is_admin, twilio_phone, \
     twilio_account_sid, twilio_auth_token, created_at, updated_at";

const MEMBER_COLS: &str = "id, clinic_id, email, name, role, perm_leads, perm_content, \
     perm_payments, perm_team, status, principal_id, invite_token_hash, invite_expires_at, \
     invited_by, accepted_at, location_ids, created_at, updated_at";

const LEAD_COLS: &str = "id, name, email, phone, quiz_type, score, doctor_id, lead_status, \
     lead_source, share_key, answers, max_score, quiz_title, quiz_description, scheduled_date, \
     submitted_at";

/// PostgreSQL backend. Applies the base schema idempotently on connect and
/// probes what an existing deployment supports before claiming capabilities.
pub struct PgStore {
    pool: PgPool,
    caps: StoreCapabilities,
}

impl PgStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| StoreError::Unavailable("DATABASE_URL is not configured".to_string()))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .connect(url)
            .await?;

        Self::migrate(&pool).await?;
        let caps = Self::probe_capabilities(&pool).await?;
        info!(
            "Connected to PostgreSQL store (member suspension: {})",
            caps.member_suspension
        );

        Ok(Self { pool, caps })
    }

    async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
        for statement in SCHEMA.split(';') {
            let statement = statement.trim();
            if statement.is_empty() {
                continue;
            }
            sqlx::query(statement).execute(pool).await?;
        }
        Ok(())
    }

    /// Suspension needs the members status column; deployments predating it
    /// keep working with suspension reported as unsupported.
    async fn probe_capabilities(pool: &PgPool) -> Result<StoreCapabilities, StoreError> {
        let member_suspension: bool = sqlx::query_scalar(
            "SELECT EXISTS (
                 SELECT 1 FROM information_schema.columns
                 WHERE table_name = 'clinic_members' AND column_name = 'status'
             )",
        )
        .fetch_one(pool)
        .await?;

        if !member_suspension {
            warn!("clinic_members.status column missing; member suspension disabled");
        }

        Ok(StoreCapabilities { member_suspension })
    }
}

fn membership_from_row(row: &PgRow) -> Result<ClinicMembership, StoreError> {
    let role_raw: String = row.try_get("role")?;
    let role = MemberRole::parse(&role_raw)
        .ok_or_else(|| StoreError::Query(format!("unknown member role: {}", role_raw)))?;
    let status_raw: String = row.try_get("status")?;
    let status = MemberStatus::parse(&status_raw)
        .ok_or_else(|| StoreError::Query(format!("unknown member status: {}", status_raw)))?;

    Ok(ClinicMembership {
        id: row.try_get("id")?,
        clinic_id: row.try_get("clinic_id")?,
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        role,
        permissions: PermissionSet {
            leads: row.try_get("perm_leads")?,
            content: row.try_get("perm_content")?,
            payments: row.try_get("perm_payments")?,
            team: row.try_get("perm_team")?,
        },
        status,
        principal_id: row.try_get("principal_id")?,
        invite_token_hash: row.try_get("invite_token_hash")?,
        invite_expires_at: row.try_get("invite_expires_at")?,
        invited_by: row.try_get("invited_by")?,
        accepted_at: row.try_get("accepted_at")?,
        location_ids: row.try_get("location_ids")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some("23505"),
        _ => false,
    }
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn capabilities(&self) -> StoreCapabilities {
        self.caps
    }

    async fn clinic(&self, id: Uuid) -> Result<Option<Clinic>, StoreError> {
        let clinic = sqlx::query_as::<_, Clinic>(
            "SELECT id, name, email, phone, address, primary_color, secondary_color, font,
             logo_url, tagline, owner_principal_id, created_at, updated_at
             FROM clinics
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(clinic)
    }

    async fn create_clinic(&self, clinic: NewClinic) -> Result<Clinic, StoreError> {
        let now = Utc::now();
        let clinic_id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, Clinic>(
            "INSERT INTO clinics (id, name, email, phone, address, owner_principal_id,
             created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
             RETURNING id, name, email, phone, address, primary_color, secondary_color, font,
             logo_url, tagline, owner_principal_id, created_at, updated_at",
        )
        .bind(clinic_id)
        .bind(&clinic.name)
        .bind(&clinic.email)
        .bind(&clinic.phone)
        .bind(&clinic.address)
        .bind(&clinic.owner_principal_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO clinic_members (id, clinic_id, email, role, perm_leads, perm_content,
             perm_payments, perm_team, status, principal_id, accepted_at, location_ids,
             created_at, updated_at)
             VALUES ($1, $2, $3, 'owner', TRUE, TRUE, TRUE, TRUE, 'active', $4, $5, '{}', $5, $5)",
        )
        .bind(Uuid::new_v4())
        .bind(clinic_id)
        .bind(&clinic.owner_email)
        .bind(&clinic.owner_principal_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row)
    }

    async fn doctor_profile(&self, id: Uuid) -> Result<Option<DoctorProfile>, StoreError> {
        let sql = format!("SELECT {} FROM doctor_profiles WHERE id = $1", PROFILE_COLS);
        let profile = sqlx::query_as::<_, DoctorProfile>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }

    async fn doctor_profiles_for_principal(
        &self,
        principal_id: &str,
    ) -> Result<Vec<DoctorProfile>, StoreError> {
        let sql = format!(
            "SELECT {} FROM doctor_profiles WHERE principal_id = $1 ORDER BY created_at",
            PROFILE_COLS
        );
        let profiles = sqlx::query_as::<_, DoctorProfile>(&sql)
            .bind(principal_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(profiles)
    }

    async fn create_doctor_profile(
        &self,
        profile: NewDoctorProfile,
    ) -> Result<DoctorProfile, StoreError> {
        let sql = format!(
            "INSERT INTO doctor_profiles (id, principal_id, clinic_id, clinic_name, email,
             full_name, specialty, access_control, is_staff, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
             RETURNING {}",
            PROFILE_COLS
        );
        let row = sqlx::query_as::<_, DoctorProfile>(&sql)
            .bind(Uuid::new_v4())
            .bind(&profile.principal_id)
            .bind(profile.clinic_id)
            .bind(&profile.clinic_name)
            .bind(&profile.email)
            .bind(&profile.full_name)
            .bind(&profile.specialty)
            .bind(profile.access_control)
            .bind(profile.is_staff)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn provision_doctor_profile(
        &self,
        principal_id: &str,
        email: &str,
    ) -> Result<(DoctorProfile, bool), StoreError> {
        let select = format!(
            "SELECT {} FROM doctor_profiles WHERE principal_id = $1 ORDER BY created_at LIMIT 1",
            PROFILE_COLS
        );
        if let Some(existing) = sqlx::query_as::<_, DoctorProfile>(&select)
            .bind(principal_id)
            .fetch_optional(&self.pool)
            .await?
        {
            return Ok((existing, false));
        }

        // The partial unique index on (principal_id) WHERE clinic_id IS NULL
        // arbitrates concurrent first requests; the loser re-reads the winner's row.
        let insert = format!(
            "INSERT INTO doctor_profiles (id, principal_id, email, access_control, is_staff,
             created_at, updated_at)
             VALUES ($1, $2, $3, FALSE, FALSE, $4, $4)
             ON CONFLICT (principal_id) WHERE clinic_id IS NULL DO NOTHING
             RETURNING {}",
            PROFILE_COLS
        );
        let inserted = sqlx::query_as::<_, DoctorProfile>(&insert)
            .bind(Uuid::new_v4())
            .bind(principal_id)
            .bind(email)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = inserted {
            return Ok((row, true));
        }

        let raced = sqlx::query_as::<_, DoctorProfile>(&select)
            .bind(principal_id)
            .fetch_optional(&self.pool)
            .await?;
        raced.map(|p| (p, false)).ok_or_else(|| {
            StoreError::Query(format!("profile for {} vanished during provisioning", principal_id))
        })
    }

    async fn set_access_control(
        &self,
        profile_id: Uuid,
        granted: bool,
    ) -> Result<DoctorProfile, StoreError> {
        let sql = format!(
            "UPDATE doctor_profiles SET access_control = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {}",
            PROFILE_COLS
        );
        sqlx::query_as::<_, DoctorProfile>(&sql)
            .bind(profile_id)
            .bind(granted)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("doctor profile {}", profile_id)))
    }

    async fn membership(&self, id: Uuid) -> Result<Option<ClinicMembership>, StoreError> {
        let sql = format!("SELECT {} FROM clinic_members WHERE id = $1", MEMBER_COLS);
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.map(|r| membership_from_row(&r)).transpose()
    }

    async fn memberships_for_clinic(
        &self,
        clinic_id: Uuid,
    ) -> Result<Vec<ClinicMembership>, StoreError> {
        let sql = format!(
            "SELECT {} FROM clinic_members WHERE clinic_id = $1 ORDER BY created_at",
            MEMBER_COLS
        );
        let rows = sqlx::query(&sql)
            .bind(clinic_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(membership_from_row).collect()
    }

    async fn membership_for_principal(
        &self,
        clinic_id: Uuid,
        principal_id: &str,
    ) -> Result<Option<ClinicMembership>, StoreError> {
        let sql = format!(
            "SELECT {} FROM clinic_members WHERE clinic_id = $1 AND principal_id = $2 LIMIT 1",
            MEMBER_COLS
        );
        let row = sqlx::query(&sql)
            .bind(clinic_id)
            .bind(principal_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| membership_from_row(&r)).transpose()
    }

    async fn live_membership_by_email(
        &self,
        clinic_id: Uuid,
        email: &str,
    ) -> Result<Option<ClinicMembership>, StoreError> {
        let sql = format!(
            "SELECT {} FROM clinic_members
             WHERE clinic_id = $1 AND lower(email) = lower($2)
               AND (status = 'active'
                    OR (status = 'pending' AND invite_expires_at > NOW()))
             LIMIT 1",
            MEMBER_COLS
        );
        let row = sqlx::query(&sql)
            .bind(clinic_id)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| membership_from_row(&r)).transpose()
    }

    async fn upsert_invite(&self, invite: NewInvite) -> Result<ClinicMembership, StoreError> {
        // A live row wins the conflict (no update, no returned row); a dead row
        // is reissued in place, keeping its id.
        let sql = format!(
            "INSERT INTO clinic_members (id, clinic_id, email, name, role, perm_leads,
             perm_content, perm_payments, perm_team, status, principal_id, invite_token_hash,
             invite_expires_at, invited_by, accepted_at, location_ids, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'pending', NULL, $10, $11, $12, NULL,
                     $13, $14, $14)
             ON CONFLICT (clinic_id, lower(email)) DO UPDATE SET
                 name = EXCLUDED.name,
                 role = EXCLUDED.role,
                 perm_leads = EXCLUDED.perm_leads,
                 perm_content = EXCLUDED.perm_content,
                 perm_payments = EXCLUDED.perm_payments,
                 perm_team = EXCLUDED.perm_team,
                 status = 'pending',
                 principal_id = NULL,
                 invite_token_hash = EXCLUDED.invite_token_hash,
                 invite_expires_at = EXCLUDED.invite_expires_at,
                 invited_by = EXCLUDED.invited_by,
                 accepted_at = NULL,
                 location_ids = EXCLUDED.location_ids,
                 updated_at = EXCLUDED.updated_at
             WHERE NOT (clinic_members.status = 'active'
                        OR (clinic_members.status = 'pending'
                            AND clinic_members.invite_expires_at > NOW()))
             RETURNING {}",
            MEMBER_COLS
        );
        let row = sqlx::query(&sql)
            .bind(Uuid::new_v4())
            .bind(invite.clinic_id)
            .bind(&invite.email)
            .bind(&invite.name)
            .bind(invite.role.as_str())
            .bind(invite.permissions.leads)
            .bind(invite.permissions.content)
            .bind(invite.permissions.payments)
            .bind(invite.permissions.team)
            .bind(&invite.invite_token_hash)
            .bind(invite.invite_expires_at)
            .bind(&invite.invited_by)
            .bind(&invite.location_ids)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(r) => membership_from_row(&r),
            None => Err(StoreError::Conflict(format!(
                "{} already has a live membership in this clinic",
                invite.email
            ))),
        }
    }

    async fn consume_invite_token(
        &self,
        token_hash: &str,
        principal_id: &str,
    ) -> Result<InviteTokenOutcome, StoreError> {
        // Single guarded UPDATE is the atomic accept; at most one caller
        // matches the pending row.
        let update = format!(
            "UPDATE clinic_members
             SET status = 'active', principal_id = $2, accepted_at = NOW(), updated_at = NOW()
             WHERE invite_token_hash = $1 AND status = 'pending' AND invite_expires_at > NOW()
             RETURNING {}",
            MEMBER_COLS
        );
        let accepted = sqlx::query(&update)
            .bind(token_hash)
            .bind(principal_id)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = accepted {
            return Ok(InviteTokenOutcome::Accepted(membership_from_row(&row)?));
        }

        // No transition happened; classify why for the caller
        let sql = format!(
            "SELECT {} FROM clinic_members WHERE invite_token_hash = $1 LIMIT 1",
            MEMBER_COLS
        );
        let row = sqlx::query(&sql)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(InviteTokenOutcome::Unknown);
        };
        let membership = membership_from_row(&row)?;
        let outcome = match membership.status {
            MemberStatus::Active => InviteTokenOutcome::AlreadyUsed,
            MemberStatus::Pending => InviteTokenOutcome::Expired,
            MemberStatus::Inactive => InviteTokenOutcome::Unknown,
        };
        Ok(outcome)
    }

    async fn update_membership_role(
        &self,
        id: Uuid,
        role: MemberRole,
        permissions: PermissionSet,
    ) -> Result<ClinicMembership, StoreError> {
        let sql = format!(
            "UPDATE clinic_members
             SET role = $2, perm_leads = $3, perm_content = $4, perm_payments = $5,
                 perm_team = $6, updated_at = NOW()
             WHERE id = $1
             RETURNING {}",
            MEMBER_COLS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(role.as_str())
            .bind(permissions.leads)
            .bind(permissions.content)
            .bind(permissions.payments)
            .bind(permissions.team)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(r) => membership_from_row(&r),
            None => Err(StoreError::NotFound(format!("membership {}", id))),
        }
    }

    async fn remove_membership(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM clinic_members WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("membership {}", id)));
        }
        Ok(())
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
        let sql = format!(
            "UPDATE clinic_members SET status = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {}",
            MEMBER_COLS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(r) => membership_from_row(&r),
            None => Err(StoreError::NotFound(format!("membership {}", id))),
        }
    }

    async fn physicians_for_clinic(&self, clinic_id: Uuid) -> Result<Vec<Physician>, StoreError> {
        let rows = sqlx::query_as::<_, Physician>(
            "SELECT id, clinic_id, name, credentials, bio, headshot_url, email, phone,
             created_at, updated_at
             FROM physicians
             WHERE clinic_id = $1
             ORDER BY created_at",
        )
        .bind(clinic_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn create_physician(&self, physician: NewPhysician) -> Result<Physician, StoreError> {
        let row = sqlx::query_as::<_, Physician>(
            "INSERT INTO physicians (id, clinic_id, name, credentials, bio, headshot_url, email,
             phone, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
             RETURNING id, clinic_id, name, credentials, bio, headshot_url, email, phone,
             created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(physician.clinic_id)
        .bind(&physician.name)
        .bind(&physician.credentials)
        .bind(&physician.bio)
        .bind(&physician.headshot_url)
        .bind(&physician.email)
        .bind(&physician.phone)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn link_by_code(&self, code: &str) -> Result<Option<LinkMapping>, StoreError> {
        let link = sqlx::query_as::<_, LinkMapping>(
            "SELECT id, code, doctor_id, quiz_type, custom_quiz_id, lead_source, clicks,
             created_at
             FROM short_links
             WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(link)
    }

    async fn create_link(&self, code: String, link: NewLink) -> Result<LinkMapping, StoreError> {
        let result = sqlx::query_as::<_, LinkMapping>(
            "INSERT INTO short_links (id, code, doctor_id, quiz_type, custom_quiz_id,
             lead_source, clicks, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, 0, $7)
             RETURNING id, code, doctor_id, quiz_type, custom_quiz_id, lead_source, clicks,
             created_at",
        )
        .bind(Uuid::new_v4())
        .bind(&code)
        .bind(&link.doctor_id)
        .bind(&link.quiz_type)
        .bind(&link.custom_quiz_id)
        .bind(&link.lead_source)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(row),
            Err(err) if is_unique_violation(&err) => {
                Err(StoreError::Conflict(format!("code {} already in use", code)))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn increment_clicks(&self, code: &str) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE short_links SET clicks = clicks + 1 WHERE code = $1")
            .bind(code)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("link {}", code)));
        }
        Ok(())
    }

    async fn links_for_doctor(&self, doctor_id: &str) -> Result<Vec<LinkMapping>, StoreError> {
        let rows = sqlx::query_as::<_, LinkMapping>(
            "SELECT id, code, doctor_id, quiz_type, custom_quiz_id, lead_source, clicks,
             created_at
             FROM short_links
             WHERE doctor_id = $1
             ORDER BY created_at DESC",
        )
        .bind(doctor_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn insert_lead(&self, lead: NewLead) -> Result<QuizLead, StoreError> {
        let sql = format!(
            "INSERT INTO quiz_leads (id, name, email, phone, quiz_type, score, doctor_id,
             lead_source, share_key, answers, max_score, quiz_title, quiz_description,
             submitted_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
             RETURNING {}",
            LEAD_COLS
        );
        let row = sqlx::query_as::<_, QuizLead>(&sql)
            .bind(Uuid::new_v4())
            .bind(&lead.name)
            .bind(&lead.email)
            .bind(&lead.phone)
            .bind(&lead.quiz_type)
            .bind(lead.score)
            .bind(&lead.doctor_id)
            .bind(&lead.lead_source)
            .bind(&lead.share_key)
            .bind(&lead.answers)
            .bind(lead.max_score)
            .bind(&lead.quiz_title)
            .bind(&lead.quiz_description)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn leads_for_doctor(&self, doctor_id: &str) -> Result<Vec<QuizLead>, StoreError> {
        let sql = format!(
            "SELECT {} FROM quiz_leads WHERE doctor_id = $1 ORDER BY submitted_at DESC",
            LEAD_COLS
        );
        let rows = sqlx::query_as::<_, QuizLead>(&sql)
            .bind(doctor_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn record_audit(&self, entry: AuditEntry) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO audit_log (id, actor, action, entity, detail, at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(entry.id)
        .bind(&entry.actor)
        .bind(&entry.action)
        .bind(&entry.entity)
        .bind(&entry.detail)
        .bind(entry.at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn audit_entries(&self, entity: &str) -> Result<Vec<AuditEntry>, StoreError> {
        let rows = sqlx::query_as::<_, AuditEntry>(
            "SELECT id, actor, action, entity, detail, at
             FROM audit_log
             WHERE entity = $1
             ORDER BY at",
        )
        .bind(entity)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
