use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::config::WebhookConfig;
use crate::store::models::{DoctorProfile, QuizLead};

/// What happened to a single delivery attempt. `Skipped` means no endpoint
/// is configured, which is a valid deployment, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Skipped,
    Delivered { status: u16 },
    Failed { reason: String },
}

impl DeliveryOutcome {
    pub fn attempted(&self) -> bool {
        !matches!(self, DeliveryOutcome::Skipped)
    }
}

/// Delivery strategy seam. The default is a single at-most-once POST with no
/// retry; anything stronger (outbox, redelivery) slots in behind this trait
/// without touching lead intake.
#[async_trait]
pub trait LeadDispatcher: Send + Sync {
    /// Whether dispatch will attempt delivery at all.
    fn configured(&self) -> bool;

    async fn dispatch(&self, envelope: &Value) -> DeliveryOutcome;
}

/// One JSON POST to the configured automation endpoint. Failures are logged
/// and reported in the outcome, never raised; the caller has already
/// persisted the lead by the time this runs.
pub struct HttpDispatcher {
    client: reqwest::Client,
    endpoint: Option<String>,
    secret: Option<String>,
    timeout: Duration,
}

impl HttpDispatcher {
    pub fn from_config(config: &WebhookConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
            secret: config.secret.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

#[async_trait]
impl LeadDispatcher for HttpDispatcher {
    fn configured(&self) -> bool {
        self.endpoint.is_some()
    }

    async fn dispatch(&self, envelope: &Value) -> DeliveryOutcome {
        let endpoint = match &self.endpoint {
            Some(endpoint) => endpoint,
            None => return DeliveryOutcome::Skipped,
        };

        let mut request = self
            .client
            .post(endpoint)
            .timeout(self.timeout)
            .json(envelope);
        if let Some(secret) = &self.secret {
            request = request.header("X-Webhook-Token", secret);
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                info!("Lead webhook delivered ({})", response.status());
                DeliveryOutcome::Delivered {
                    status: response.status().as_u16(),
                }
            }
            Ok(response) => {
                warn!("Lead webhook rejected by endpoint: {}", response.status());
                DeliveryOutcome::Failed {
                    reason: format!("endpoint returned {}", response.status()),
                }
            }
            Err(err) => {
                warn!("Lead webhook delivery failed: {}", err);
                DeliveryOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }
}

/// Stand-in for deployments (and tests) that want no outbound traffic.
pub struct NullDispatcher;

#[async_trait]
impl LeadDispatcher for NullDispatcher {
    fn configured(&self) -> bool {
        false
    }

    async fn dispatch(&self, _envelope: &Value) -> DeliveryOutcome {
        DeliveryOutcome::Skipped
    }
}

/// Normalized payload sent to the automation endpoint and echoed back to the
/// submitter. Telephony credentials ride along only when the deployment has
/// opted in; they are secrets and the endpoint may be third-party.
pub fn lead_envelope(
    lead: &QuizLead,
    doctor: Option<&DoctorProfile>,
    forward_telephony: bool,
) -> Value {
    let doctor_value = match doctor {
        None => Value::Null,
        Some(profile) => {
            let mut doctor = json!({
                "id": profile.id,
                "name": profile.full_name,
                "email": profile.email,
                "phone": profile.phone,
                "specialty": profile.specialty,
                "clinic_id": profile.clinic_id,
                "clinic_name": profile.clinic_name,
            });
            if forward_telephony {
                doctor["twilio_phone"] = json!(profile.twilio_phone);
                doctor["twilio_account_sid"] = json!(profile.twilio_account_sid);
                doctor["twilio_auth_token"] = json!(profile.twilio_auth_token);
            }
            doctor
        }
    };

    json!({
        "lead": {
            "id": lead.id,
            "name": lead.name,
            "email": lead.email,
            "phone": lead.phone,
            "quiz_type": lead.quiz_type,
            "score": lead.score,
            "doctor_id": lead.doctor_id,
            "lead_source": lead.lead_source,
            "share_key": lead.share_key,
            "answers": lead.answers,
            "submitted_at": lead.submitted_at,
        },
        "doctor": doctor_value,
        "quiz_data": {
            "questions": lead.answers,
            "maxScore": lead.max_score,
            "title": lead.quiz_title,
            "description": lead.quiz_description,
        },
        "webhook_timestamp": Utc::now(),
        "webhook_id": lead.id,
    })
}
