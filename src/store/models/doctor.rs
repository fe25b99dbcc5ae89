use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Portal identity row: one per authenticated user per tenant context.
/// `access_control` is the single gate the portal honors - absent/false
/// means no access, whatever other flags say.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DoctorProfile {
    pub id: Uuid,
    /// Principal id as the auth provider knows it
    pub principal_id: String,
    /// Nullable: a profile can exist before it is linked to a clinic,
    /// in which case clinic_name may be denormalized onto the row
    pub clinic_id: Option<Uuid>,
    pub clinic_name: Option<String>,
    pub email: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub specialty: Option<String>,
    pub access_control: bool,
    pub is_staff: bool,
    pub is_manager: bool,
    pub is_admin: bool,
    pub twilio_phone: Option<String>,
    pub twilio_account_sid: Option<String>,
    /// Secret; never serialized into API responses. The outbound lead
    /// envelope copies it explicitly when telephony forwarding is enabled.
    #[serde(skip_serializing, default)]
    pub twilio_auth_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewDoctorProfile {
    pub principal_id: String,
    pub email: String,
    pub clinic_id: Option<Uuid>,
    pub clinic_name: Option<String>,
    pub full_name: Option<String>,
    pub specialty: Option<String>,
    pub access_control: bool,
    pub is_staff: bool,
}
