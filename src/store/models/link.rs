use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Short-link row. Immutable once created except for the click counter,
/// which the store increments atomically. Exactly one of quiz_type /
/// custom_quiz_id may be set; with neither, resolution falls back to the
/// platform default quiz.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LinkMapping {
    pub id: Uuid,
    pub code: String,
    /// Attribution target; travels as an opaque string on the wire
    pub doctor_id: String,
    pub quiz_type: Option<String>,
    pub custom_quiz_id: Option<String>,
    pub lead_source: Option<String>,
    pub clicks: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewLink {
    pub doctor_id: String,
    pub quiz_type: Option<String>,
    pub custom_quiz_id: Option<String>,
    pub lead_source: Option<String>,
}
