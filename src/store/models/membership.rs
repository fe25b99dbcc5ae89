use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Capability flags attached to a membership. Independent booleans in the
/// store; the closed role set in the team service decides what they mean.
/// Absent flags deserialize as false, so callers send only what they grant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionSet {
    pub leads: bool,
    pub content: bool,
    pub payments: bool,
    pub team: bool,
}

impl PermissionSet {
    pub fn all() -> Self {
        Self {
            leads: true,
            content: true,
            payments: true,
            team: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Owner,
    Staff,
    Physician,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Owner => "owner",
            MemberRole::Staff => "staff",
            MemberRole::Physician => "physician",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "owner" => Some(MemberRole::Owner),
            "staff" => Some(MemberRole::Staff),
            "physician" => Some(MemberRole::Physician),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    Pending,
    Active,
    Inactive,
}

impl MemberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberStatus::Pending => "pending",
            MemberStatus::Active => "active",
            MemberStatus::Inactive => "inactive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(MemberStatus::Pending),
            // accepted is the legacy spelling for an active membership
            "active" | "accepted" => Some(MemberStatus::Active),
            "inactive" => Some(MemberStatus::Inactive),
            _ => None,
        }
    }
}

/// Named invitation-based relationship between an email address and a
/// clinic. Exists before (and independent of) the invitee ever logging in;
/// `principal_id` is linked when the invite token is consumed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicMembership {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: MemberRole,
    pub permissions: PermissionSet,
    pub status: MemberStatus,
    pub principal_id: Option<String>,
    /// sha-256 of the raw invite token; the raw token is only ever returned
    /// once, in the invite response
    #[serde(skip_serializing, default)]
    pub invite_token_hash: Option<String>,
    pub invite_expires_at: Option<DateTime<Utc>>,
    pub invited_by: Option<String>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub location_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Invite parameters as the team service hands them to the store. Token
/// hashing and expiry stamping happen before this reaches the store.
#[derive(Debug, Clone)]
pub struct NewInvite {
    pub clinic_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: MemberRole,
    pub permissions: PermissionSet,
    pub invite_token_hash: String,
    pub invite_expires_at: DateTime<Utc>,
    pub invited_by: String,
    pub location_ids: Vec<Uuid>,
}
