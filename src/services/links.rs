use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::config::config;
use crate::services::team::{attribution_allowed, Action};
use crate::store::models::{LinkMapping, NewLink};
use crate::store::{DynStore, StoreError};
use crate::types::Principal;

/// Unambiguous alphabet (no 0/O, 1/l/I) for short codes.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghjkmnpqrstuvwxyz23456789";
const CODE_LEN: usize = 7;
const CODE_RETRIES: usize = 5;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Short link not found: {0}")]
    NotFound(String),

    #[error("Validation failed on {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Could not allocate a unique code")]
    CodeAllocation,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Where a resolved short link points. The HTTP layer turns this into a 302;
/// the CLI just prints it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectTarget {
    CustomQuiz {
        quiz_id: String,
        doctor_id: String,
        source: String,
    },
    Share {
        quiz_type: String,
        doctor_id: String,
        source: String,
    },
}

impl RedirectTarget {
    pub fn location(&self) -> String {
        match self {
            RedirectTarget::CustomQuiz {
                quiz_id,
                doctor_id,
                source,
            } => format!(
                "/quiz/custom/{}?{}",
                quiz_id,
                encode_query(&[("doctor", doctor_id), ("source", source)])
            ),
            RedirectTarget::Share {
                quiz_type,
                doctor_id,
                source,
            } => format!(
                "/share/{}/{}?{}",
                quiz_type,
                doctor_id,
                encode_query(&[("source", source)])
            ),
        }
    }
}

fn encode_query(pairs: &[(&str, &str)]) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

/// Short-link resolution and management. Resolution mutates nothing but the
/// click counter, and that from a spawned task the redirect never waits on.
#[derive(Clone)]
pub struct LinkService {
    store: DynStore,
}

impl LinkService {
    pub fn new(store: DynStore) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, code: &str) -> Result<RedirectTarget, LinkError> {
        let link = self
            .store
            .link_by_code(code)
            .await?
            .ok_or_else(|| LinkError::NotFound(code.to_string()))?;

        // Analytics only: never blocks and never fails the redirect
        let store = self.store.clone();
        let clicked = link.code.clone();
        tokio::spawn(async move {
            if let Err(err) = store.increment_clicks(&clicked).await {
                warn!("Click increment failed for {}: {}", clicked, err);
            }
        });

        let source = link
            .lead_source
            .unwrap_or_else(|| "shortlink".to_string());
        let target = match link.custom_quiz_id {
            Some(quiz_id) => RedirectTarget::CustomQuiz {
                quiz_id,
                doctor_id: link.doctor_id,
                source,
            },
            None => RedirectTarget::Share {
                quiz_type: link
                    .quiz_type
                    .unwrap_or_else(|| config().links.default_quiz_type.clone())
                    .to_lowercase(),
                doctor_id: link.doctor_id,
                source,
            },
        };
        Ok(target)
    }

    pub async fn create(
        &self,
        actor: &Principal,
        link: NewLink,
    ) -> Result<LinkMapping, LinkError> {
        if link.doctor_id.trim().is_empty() {
            return Err(LinkError::Validation {
                field: "doctor_id",
                message: "attribution target is required".to_string(),
            });
        }
        if !attribution_allowed(&self.store, actor, &link.doctor_id, Action::ManageLinks).await? {
            return Err(LinkError::PermissionDenied(
                "creating links for this doctor requires the content permission".to_string(),
            ));
        }
        self.mint(link).await
    }

    /// Validate and persist a link under a freshly allocated code. Operator
    /// path: dashboard callers go through [`create`](Self::create), which
    /// adds the attribution check.
    pub async fn mint(&self, link: NewLink) -> Result<LinkMapping, LinkError> {
        if link.doctor_id.trim().is_empty() {
            return Err(LinkError::Validation {
                field: "doctor_id",
                message: "attribution target is required".to_string(),
            });
        }
        if link.quiz_type.is_some() && link.custom_quiz_id.is_some() {
            return Err(LinkError::Validation {
                field: "quiz_type",
                message: "a link targets a quiz type or a custom quiz, not both".to_string(),
            });
        }

        for _ in 0..CODE_RETRIES {
            match self
                .store
                .create_link(generate_code(), link.clone())
                .await
            {
                Ok(created) => return Ok(created),
                Err(StoreError::Conflict(_)) => continue,
                Err(other) => return Err(other.into()),
            }
        }
        Err(LinkError::CodeAllocation)
    }

    pub async fn list_for_doctor(
        &self,
        actor: &Principal,
        doctor_id: &str,
    ) -> Result<Vec<LinkMapping>, LinkError> {
        if !attribution_allowed(&self.store, actor, doctor_id, Action::ManageLinks).await? {
            return Err(LinkError::PermissionDenied(
                "viewing links for this doctor requires the content permission".to_string(),
            ));
        }
        Ok(self.store.links_for_doctor(doctor_id).await?)
    }
}

fn generate_code() -> String {
    // Trailing bytes only: bytes 6 and 8 carry the UUID version and variant
    // bits, which would pin their positions to a slice of the alphabet.
    Uuid::new_v4()
        .as_bytes()
        .iter()
        .rev()
        .take(CODE_LEN)
        .map(|b| CODE_ALPHABET[*b as usize % CODE_ALPHABET.len()] as char)
        .collect()
}
