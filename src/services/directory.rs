use serde::Serialize;
use uuid::Uuid;

use crate::store::models::{Clinic, ClinicMembership, DoctorProfile, Physician};
use crate::store::{DynStore, StoreError};

/// Membership row flattened with the access flag of its linked profile, the
/// shape the dashboard renders directly.
#[derive(Debug, Clone, Serialize)]
pub struct MemberView {
    #[serde(flatten)]
    pub membership: ClinicMembership,
    /// Granted iff the linked principal currently passes the access gate
    pub has_access: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClinicRoster {
    pub members: Vec<MemberView>,
    pub physicians: Vec<Physician>,
}

/// Read-only projection over the store: who belongs where. Rows are never
/// merged across clinics; empty results are empty, not errors.
#[derive(Clone)]
pub struct TenantDirectory {
    store: DynStore,
}

impl TenantDirectory {
    pub fn new(store: DynStore) -> Self {
        Self { store }
    }

    pub async fn clinic(&self, clinic_id: Uuid) -> Result<Option<Clinic>, StoreError> {
        self.store.clinic(clinic_id).await
    }

    pub async fn profiles_for_principal(
        &self,
        principal_id: &str,
    ) -> Result<Vec<DoctorProfile>, StoreError> {
        self.store.doctor_profiles_for_principal(principal_id).await
    }

    pub async fn roster(&self, clinic_id: Uuid) -> Result<ClinicRoster, StoreError> {
        let memberships = self.store.memberships_for_clinic(clinic_id).await?;
        let physicians = self.store.physicians_for_clinic(clinic_id).await?;

        let mut members = Vec::with_capacity(memberships.len());
        for membership in memberships {
            let has_access = match &membership.principal_id {
                Some(principal_id) => self
                    .store
                    .doctor_profiles_for_principal(principal_id)
                    .await?
                    .iter()
                    .any(|p| p.access_control),
                None => false,
            };
            members.push(MemberView {
                membership,
                has_access,
            });
        }

        Ok(ClinicRoster {
            members,
            physicians,
        })
    }
}
