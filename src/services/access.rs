use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::config;
use crate::store::DynStore;
use crate::store::models::DoctorProfile;
use crate::types::Principal;

/// Why the gate said no. `AccessRevoked` means an administrator must act;
/// `SetupFailed` and `CheckFailed` mean try again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeniedReason {
    AccessRevoked,
    SetupFailed,
    CheckFailed,
}

/// Per-profile flags surfaced for support diagnostics alongside the decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileFlags {
    pub id: Uuid,
    pub clinic_id: Option<Uuid>,
    pub clinic_name: Option<String>,
    pub access_control: bool,
    pub is_staff: bool,
    pub is_manager: bool,
    pub is_admin: bool,
}

impl From<&DoctorProfile> for ProfileFlags {
    fn from(profile: &DoctorProfile) -> Self {
        Self {
            id: profile.id,
            clinic_id: profile.clinic_id,
            clinic_name: profile.clinic_name.clone(),
            access_control: profile.access_control,
            is_staff: profile.is_staff,
            is_manager: profile.is_manager,
            is_admin: profile.is_admin,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessStatus {
    pub granted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DeniedReason>,
    pub checked_at: DateTime<Utc>,
    pub profiles: Vec<ProfileFlags>,
}

impl AccessStatus {
    fn granted(profiles: &[DoctorProfile]) -> Self {
        Self {
            granted: true,
            reason: None,
            checked_at: Utc::now(),
            profiles: profiles.iter().map(ProfileFlags::from).collect(),
        }
    }

    fn denied(reason: DeniedReason, profiles: &[DoctorProfile]) -> Self {
        Self {
            granted: false,
            reason: Some(reason),
            checked_at: Utc::now(),
            profiles: profiles.iter().map(ProfileFlags::from).collect(),
        }
    }
}

/// Session-visible gate states published by an [`AccessWatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum GateState {
    Unchecked,
    Checking,
    Granted(AccessStatus),
    Denied(AccessStatus),
}

/// The single authority on portal access. Access is granted iff any of the
/// principal's profiles carries `access_control`; everything else is a
/// denial with a reason. `check` never returns an error: a store that cannot
/// answer is a denial, not a 500.
#[derive(Clone)]
pub struct AccessGate {
    store: DynStore,
}

impl AccessGate {
    pub fn new(store: DynStore) -> Self {
        Self { store }
    }

    pub async fn check(&self, principal: &Principal) -> AccessStatus {
        let profiles = match self
            .store
            .doctor_profiles_for_principal(&principal.id)
            .await
        {
            Ok(profiles) => profiles,
            Err(err) => {
                warn!("Access check failed for {}: {}", principal.id, err);
                return AccessStatus::denied(DeniedReason::CheckFailed, &[]);
            }
        };

        if profiles.is_empty() {
            // First-time principal: provision exactly one profile, then
            // evaluate it. The store guarantees concurrent checks converge
            // on a single row.
            return match self
                .store
                .provision_doctor_profile(&principal.id, &principal.email)
                .await
            {
                Ok((profile, created)) => {
                    if created {
                        info!("Provisioned doctor profile for new principal {}", principal.id);
                    }
                    self.evaluate(std::slice::from_ref(&profile))
                }
                Err(err) => {
                    warn!("Profile provisioning failed for {}: {}", principal.id, err);
                    AccessStatus::denied(DeniedReason::SetupFailed, &[])
                }
            };
        }

        self.evaluate(&profiles)
    }

    fn evaluate(&self, profiles: &[DoctorProfile]) -> AccessStatus {
        if profiles.iter().any(|p| p.access_control) {
            AccessStatus::granted(profiles)
        } else {
            AccessStatus::denied(DeniedReason::AccessRevoked, profiles)
        }
    }

    /// Spawns the periodic re-check for an open session, using the
    /// configured interval.
    pub fn watch(&self, principal: Principal) -> AccessWatch {
        self.watch_with_interval(
            principal,
            Duration::from_secs(config().access.recheck_interval_secs),
        )
    }

    pub fn watch_with_interval(&self, principal: Principal, period: Duration) -> AccessWatch {
        let (tx, rx) = watch::channel(GateState::Unchecked);
        let gate = self.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                if tx.send(GateState::Checking).is_err() {
                    break;
                }
                let status = gate.check(&principal).await;
                let revoked =
                    !status.granted && status.reason == Some(DeniedReason::AccessRevoked);
                let next = if status.granted {
                    GateState::Granted(status)
                } else {
                    GateState::Denied(status)
                };
                if tx.send(next).is_err() {
                    break;
                }
                // An explicit revocation is sticky: stop polling, a fresh
                // check (or new watch) is the re-entry path. Transient
                // failures keep polling.
                if revoked {
                    break;
                }
            }
        });
        AccessWatch { rx, handle }
    }
}

/// Handle to the periodic re-check task. Dropping it (or calling `cancel`)
/// aborts the task; session teardown needs no other cleanup.
pub struct AccessWatch {
    rx: watch::Receiver<GateState>,
    handle: JoinHandle<()>,
}

impl AccessWatch {
    pub fn state(&self) -> GateState {
        self.rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<GateState> {
        self.rx.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl Drop for AccessWatch {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
