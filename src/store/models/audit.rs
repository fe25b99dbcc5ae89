use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Who changed what, when. Written for every access/role mutation so flag
/// flips stay attributable even though the flows themselves are
/// last-write-wins.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditEntry {
    pub id: Uuid,
    /// Principal id, or "cli" for operator actions
    pub actor: String,
    pub action: String,
    pub entity: String,
    pub detail: Option<String>,
    pub at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        actor: impl Into<String>,
        action: impl Into<String>,
        entity: impl Into<String>,
        detail: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor: actor.into(),
            action: action.into(),
            entity: entity.into(),
            detail,
            at: Utc::now(),
        }
    }
}
