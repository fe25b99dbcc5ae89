use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// One completed assessment. Contact fields are what the patient submitted;
/// `lead_status` stays unset at intake ("New" is a dashboard default, not a
/// stored value).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuizLead {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub quiz_type: String,
    pub score: f64,
    /// Tenant attribution; kept as submitted even when it resolves to no
    /// known profile
    pub doctor_id: String,
    pub lead_status: Option<String>,
    pub lead_source: Option<String>,
    pub share_key: Option<String>,
    pub answers: Option<Value>,
    pub max_score: Option<f64>,
    pub quiz_title: Option<String>,
    pub quiz_description: Option<String>,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub submitted_at: DateTime<Utc>,
}

/// Validated submission ready to persist; `submitted_at` is assigned by the
/// store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewLead {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub quiz_type: String,
    pub score: f64,
    pub doctor_id: String,
    pub lead_source: Option<String>,
    pub share_key: Option<String>,
    pub answers: Option<Value>,
    pub max_score: Option<f64>,
    pub quiz_title: Option<String>,
    pub quiz_description: Option<String>,
}
