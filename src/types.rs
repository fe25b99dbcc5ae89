/// Shared types used across the codebase

use serde::{Deserialize, Serialize};

/// The authenticated caller as the auth provider reports it: an opaque
/// principal id plus the email it authenticated with. Everything else
/// (profiles, memberships, flags) lives in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub email: String,
}

impl Principal {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
        }
    }
}
