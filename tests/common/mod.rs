use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;

use leadpulse_api::app::{app, AppState};
use leadpulse_api::auth::{generate_jwt, Claims};
use leadpulse_api::services::webhook::{LeadDispatcher, NullDispatcher};
use leadpulse_api::store::memory::MemoryStore;
use leadpulse_api::store::models::{Clinic, DoctorProfile, NewClinic, NewDoctorProfile};
use leadpulse_api::store::Store;

pub const OWNER_PRINCIPAL: &str = "auth0|owner";
pub const OWNER_EMAIL: &str = "owner@lakeside.test";

/// One server per test: the router runs in-process on an ephemeral port and
/// shares its `MemoryStore` with the test, so fixtures are seeded directly
/// instead of through HTTP.
pub struct TestServer {
    pub base_url: String,
    pub store: Arc<MemoryStore>,
    pub client: reqwest::Client,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with(Arc::new(MemoryStore::new()), Arc::new(NullDispatcher)).await
    }

    pub async fn spawn_with(
        store: Arc<MemoryStore>,
        dispatcher: Arc<dyn LeadDispatcher>,
    ) -> Result<Self> {
        let state = AppState::new(store.clone(), dispatcher);
        let router = app(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind test listener")?;
        let base_url = format!("http://{}", listener.local_addr()?);
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        // No redirect following: the short link tests assert on the 302 itself
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("failed to build test client")?;

        let server = Self {
            base_url,
            store,
            client,
        };
        server.wait_ready(Duration::from_secs(5)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = self.client.get(&url).send().await {
                if resp.status() == StatusCode::OK
                    || resp.status() == StatusCode::SERVICE_UNAVAILABLE
                {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        anyhow::bail!(
            "server did not become ready on {} within {:?}",
            self.base_url,
            timeout
        )
    }

    /// Bearer token for an arbitrary principal, signed with the same secret
    /// the in-process server validates against.
    pub fn token_for(&self, principal_id: &str, email: &str) -> Result<String> {
        let claims = Claims::new(principal_id.to_string(), email.to_string());
        Ok(generate_jwt(claims)?)
    }

    /// Seed a clinic whose owner membership is created by the store.
    pub async fn seed_clinic(&self) -> Result<Clinic> {
        let clinic = self
            .store
            .create_clinic(NewClinic {
                name: "Lakeside ENT".to_string(),
                owner_principal_id: OWNER_PRINCIPAL.to_string(),
                owner_email: OWNER_EMAIL.to_string(),
                ..Default::default()
            })
            .await?;
        Ok(clinic)
    }

    /// Seed a standalone doctor profile with the given access flag.
    pub async fn seed_doctor(
        &self,
        principal_id: &str,
        email: &str,
        access: bool,
    ) -> Result<DoctorProfile> {
        let profile = self
            .store
            .create_doctor_profile(NewDoctorProfile {
                principal_id: principal_id.to_string(),
                email: email.to_string(),
                full_name: Some("Dr. Alex Rivera".to_string()),
                specialty: Some("Otolaryngology".to_string()),
                access_control: access,
                ..Default::default()
            })
            .await?;
        Ok(profile)
    }
}
