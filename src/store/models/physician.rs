use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Public-facing provider profile shown on patient pages. Clinic-scoped and
/// never authenticates; distinct from DoctorProfile on purpose.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Physician {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub name: String,
    pub credentials: Option<String>,
    pub bio: Option<String>,
    pub headshot_url: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPhysician {
    pub clinic_id: Uuid,
    pub name: String,
    pub credentials: Option<String>,
    pub bio: Option<String>,
    pub headshot_url: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}
