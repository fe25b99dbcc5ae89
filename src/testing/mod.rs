use std::sync::Arc;

use crate::store::memory::MemoryStore;
use crate::store::models::{Clinic, DoctorProfile, NewClinic, NewDoctorProfile};
use crate::store::Store;
use crate::types::Principal;

/// Test utilities: an in-memory store seeded with one clinic and its owner,
/// the fixture most service tests start from.
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub clinic: Clinic,
}

impl TestContext {
    pub async fn with_clinic() -> anyhow::Result<Self> {
        let store = Arc::new(MemoryStore::new());
        let clinic = store
            .create_clinic(NewClinic {
                name: "Lakeside ENT".to_string(),
                owner_principal_id: "auth0|owner".to_string(),
                owner_email: "owner@lakeside.test".to_string(),
                ..Default::default()
            })
            .await?;

        Ok(Self { store, clinic })
    }

    /// The principal the seeded clinic's owner membership is linked to
    pub fn owner(&self) -> Principal {
        Principal::new("auth0|owner", "owner@lakeside.test")
    }

    /// Add a profile linked to the seeded clinic
    pub async fn seed_profile(
        &self,
        principal_id: &str,
        email: &str,
        access: bool,
    ) -> anyhow::Result<DoctorProfile> {
        let profile = self
            .store
            .create_doctor_profile(NewDoctorProfile {
                principal_id: principal_id.to_string(),
                email: email.to_string(),
                clinic_id: Some(self.clinic.id),
                clinic_name: Some(self.clinic.name.clone()),
                access_control: access,
                ..Default::default()
            })
            .await?;

        Ok(profile)
    }
}
