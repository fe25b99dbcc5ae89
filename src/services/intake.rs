use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::services::team::{attribution_allowed, Action};
use crate::services::webhook::{lead_envelope, DeliveryOutcome, LeadDispatcher};
use crate::store::models::{NewLead, QuizLead};
use crate::store::{DynStore, StoreError};
use crate::types::Principal;

/// Raw intake body. Everything optional so validation can name the first
/// missing field instead of failing deserialization wholesale.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadSubmission {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub quiz_type: Option<String>,
    pub doctor_id: Option<String>,
    pub score: Option<f64>,
    pub answers: Option<Value>,
    pub lead_source: Option<String>,
    pub share_key: Option<String>,
    #[serde(rename = "maxScore")]
    pub max_score: Option<f64>,
    pub quiz_title: Option<String>,
    pub quiz_description: Option<String>,
}

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Lead could not be stored: {0}")]
    Storage(#[from] StoreError),
}

/// What one accepted submission produced: the stored row, the envelope that
/// was (or would have been) dispatched, and what delivery did.
#[derive(Debug)]
pub struct IntakeOutcome {
    pub lead: QuizLead,
    pub envelope: Value,
    pub dispatch: DeliveryOutcome,
}

/// The lead funnel: validate, persist, enrich, dispatch, in that order.
/// Persistence failure is fatal; everything after persistence is
/// best-effort because losing a stored lead to enrichment or delivery
/// trouble is the one unacceptable outcome.
#[derive(Clone)]
pub struct LeadIntake {
    store: DynStore,
    dispatcher: Arc<dyn LeadDispatcher>,
    forward_telephony: bool,
}

impl LeadIntake {
    pub fn new(
        store: DynStore,
        dispatcher: Arc<dyn LeadDispatcher>,
        forward_telephony: bool,
    ) -> Self {
        Self {
            store,
            dispatcher,
            forward_telephony,
        }
    }

    pub async fn submit(&self, submission: LeadSubmission) -> Result<IntakeOutcome, IntakeError> {
        let new_lead = validate(submission)?;

        let lead = match self.store.insert_lead(new_lead).await {
            Ok(lead) => lead,
            Err(err) => {
                error!("Lead persistence failed: {}", err);
                return Err(err.into());
            }
        };

        let doctor = match Uuid::parse_str(&lead.doctor_id) {
            Ok(profile_id) => match self.store.doctor_profile(profile_id).await {
                Ok(Some(profile)) => Some(profile),
                Ok(None) => {
                    warn!(
                        "Lead {} attributed to unknown doctor '{}'",
                        lead.id, lead.doctor_id
                    );
                    None
                }
                Err(err) => {
                    warn!("Doctor lookup failed for lead {}: {}", lead.id, err);
                    None
                }
            },
            Err(_) => {
                warn!(
                    "Lead {} doctor id '{}' is not a profile id",
                    lead.id, lead.doctor_id
                );
                None
            }
        };

        let envelope = lead_envelope(&lead, doctor.as_ref(), self.forward_telephony);
        let dispatch = self.dispatcher.dispatch(&envelope).await;
        info!(
            "Lead {} stored for doctor '{}' (dispatch: {:?})",
            lead.id, lead.doctor_id, dispatch
        );

        Ok(IntakeOutcome {
            lead,
            envelope,
            dispatch,
        })
    }

    pub async fn leads_for(
        &self,
        actor: &Principal,
        doctor_id: &str,
    ) -> Result<Vec<QuizLead>, IntakeError> {
        if !attribution_allowed(&self.store, actor, doctor_id, Action::ViewLeads).await? {
            return Err(IntakeError::PermissionDenied(
                "viewing leads for this doctor requires the leads permission".to_string(),
            ));
        }
        Ok(self.store.leads_for_doctor(doctor_id).await?)
    }
}

fn validate(submission: LeadSubmission) -> Result<NewLead, IntakeError> {
    fn required(value: Option<String>, field: &'static str) -> Result<String, IntakeError> {
        match value {
            Some(v) if !v.trim().is_empty() => Ok(v),
            _ => Err(IntakeError::MissingField(field)),
        }
    }

    let name = required(submission.name, "name")?;
    let email = required(submission.email, "email")?;
    let phone = required(submission.phone, "phone")?;
    let quiz_type = required(submission.quiz_type, "quiz_type")?;
    let doctor_id = required(submission.doctor_id, "doctor_id")?;
    let score = submission
        .score
        .ok_or(IntakeError::MissingField("score"))?;

    Ok(NewLead {
        name,
        email,
        phone,
        quiz_type,
        score,
        doctor_id,
        lead_source: submission.lead_source,
        share_key: submission.share_key,
        answers: submission.answers,
        max_score: submission.max_score,
        quiz_title: submission.quiz_title,
        quiz_description: submission.quiz_description,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::store::models::NewDoctorProfile;
    use crate::store::Store;
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::Mutex;

    struct CapturingDispatcher {
        sent: Mutex<Vec<Value>>,
        outcome: DeliveryOutcome,
    }

    impl CapturingDispatcher {
        fn delivering() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                outcome: DeliveryOutcome::Delivered { status: 200 },
            }
        }

        fn failing() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                outcome: DeliveryOutcome::Failed {
                    reason: "endpoint returned 500".to_string(),
                },
            }
        }
    }

    #[async_trait]
    impl LeadDispatcher for CapturingDispatcher {
        fn configured(&self) -> bool {
            true
        }

        async fn dispatch(&self, envelope: &Value) -> DeliveryOutcome {
            self.sent.lock().await.push(envelope.clone());
            self.outcome.clone()
        }
    }

    fn full_submission(doctor_id: &str) -> LeadSubmission {
        LeadSubmission {
            name: Some("Jane".to_string()),
            email: Some("j@x.com".to_string()),
            phone: Some("555-1212".to_string()),
            quiz_type: Some("NOSE".to_string()),
            doctor_id: Some(doctor_id.to_string()),
            score: Some(42.0),
            answers: Some(json!([1, 0, 2])),
            lead_source: Some("flyer".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn first_missing_field_is_named_in_order() {
        let intake = LeadIntake::new(
            Arc::new(MemoryStore::new()),
            Arc::new(CapturingDispatcher::delivering()),
            false,
        );

        let err = intake.submit(LeadSubmission::default()).await.unwrap_err();
        assert!(matches!(err, IntakeError::MissingField("name")));

        let err = intake
            .submit(LeadSubmission {
                name: Some("Jane".to_string()),
                email: Some("   ".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, IntakeError::MissingField("email")));

        let err = intake
            .submit(LeadSubmission {
                score: None,
                ..full_submission("D1")
            })
            .await
            .unwrap_err();
        assert!(matches!(err, IntakeError::MissingField("score")));
    }

    #[tokio::test]
    async fn unknown_doctor_still_stores_and_dispatches() {
        let store = Arc::new(MemoryStore::new());
        let dispatcher = Arc::new(CapturingDispatcher::delivering());
        let intake = LeadIntake::new(store.clone(), dispatcher.clone(), false);

        let outcome = intake.submit(full_submission("D1")).await.unwrap();
        assert!(outcome.envelope["doctor"].is_null());
        assert_eq!(outcome.lead.lead_status, None);

        let stored = store.leads_for_doctor("D1").await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, outcome.lead.id);

        let sent = dispatcher.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0], outcome.envelope);
    }

    #[tokio::test]
    async fn delivery_failure_does_not_fail_submit() {
        let store = Arc::new(MemoryStore::new());
        let intake = LeadIntake::new(
            store.clone(),
            Arc::new(CapturingDispatcher::failing()),
            false,
        );

        let outcome = intake.submit(full_submission("D1")).await.unwrap();
        assert!(matches!(outcome.dispatch, DeliveryOutcome::Failed { .. }));
        assert!(outcome.dispatch.attempted());
        assert_eq!(store.leads_for_doctor("D1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn resolved_doctor_enriches_envelope() {
        let store = Arc::new(MemoryStore::new());
        let profile = store
            .create_doctor_profile(NewDoctorProfile {
                principal_id: "auth0|d1".to_string(),
                email: "d1@clinic.test".to_string(),
                full_name: Some("Dr. One".to_string()),
                access_control: true,
                ..Default::default()
            })
            .await
            .unwrap();
        let intake = LeadIntake::new(
            store,
            Arc::new(CapturingDispatcher::delivering()),
            false,
        );

        let outcome = intake
            .submit(full_submission(&profile.id.to_string()))
            .await
            .unwrap();
        assert_eq!(outcome.envelope["doctor"]["name"], "Dr. One");
        assert_eq!(
            outcome.envelope["webhook_id"],
            json!(outcome.lead.id)
        );
    }
}
