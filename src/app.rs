use std::sync::Arc;

use axum::{
    http::HeaderValue,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config;
use crate::handlers;
use crate::services::access::AccessGate;
use crate::services::directory::TenantDirectory;
use crate::services::intake::LeadIntake;
use crate::services::links::LinkService;
use crate::services::team::TeamService;
use crate::services::webhook::LeadDispatcher;
use crate::store::DynStore;

/// Shared application state: the store plus every service built on it.
/// Cheap to clone; services hold `Arc`s internally.
#[derive(Clone)]
pub struct AppState {
    pub store: DynStore,
    pub directory: TenantDirectory,
    pub gate: AccessGate,
    pub team: TeamService,
    pub links: LinkService,
    pub intake: LeadIntake,
}

impl AppState {
    pub fn new(store: DynStore, dispatcher: Arc<dyn LeadDispatcher>) -> Self {
        let forward_telephony = config::config().webhook.forward_telephony;

        Self {
            directory: TenantDirectory::new(store.clone()),
            gate: AccessGate::new(store.clone()),
            team: TeamService::new(store.clone()),
            links: LinkService::new(store.clone()),
            intake: LeadIntake::new(store.clone(), dispatcher, forward_telephony),
            store,
        }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(public_routes())
        // Protected API (JWT required)
        .merge(protected_routes())
        // Global middleware
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    use handlers::public;

    Router::new()
        // Short link redirects
        .route("/s/:code", get(public::short_link_get))
        // Lead intake; public because assessment clients post directly
        .route("/api/webhook/lead", post(public::lead_intake_post))
}

fn protected_routes() -> Router<AppState> {
    use handlers::protected;

    Router::new()
        // Access gate
        .route("/api/access/check", get(protected::access_check))
        .route(
            "/api/profiles/:profile_id/access/grant",
            post(protected::access_grant),
        )
        .route(
            "/api/profiles/:profile_id/access/revoke",
            post(protected::access_revoke),
        )
        // Invitations
        .route("/api/invites/accept", post(protected::invite_accept))
        // Team management
        .route(
            "/api/team/:clinic_id/members",
            get(protected::team_members),
        )
        .route(
            "/api/team/:clinic_id/invites",
            post(protected::team_invite),
        )
        .route(
            "/api/team/:clinic_id/members/:member_id/role",
            put(protected::team_update_role),
        )
        .route(
            "/api/team/:clinic_id/members/:member_id",
            delete(protected::team_remove),
        )
        .route(
            "/api/team/:clinic_id/members/:member_id/suspend",
            post(protected::team_suspend),
        )
        .route(
            "/api/team/:clinic_id/members/:member_id/reactivate",
            post(protected::team_reactivate),
        )
        .route(
            "/api/team/:clinic_id/physicians",
            post(protected::team_add_physician),
        )
        // Short links
        .route(
            "/api/links",
            post(protected::link_create).get(protected::link_list),
        )
        // Leads
        .route("/api/leads", get(protected::lead_list))
        .route_layer(middleware::from_fn(crate::middleware::jwt_auth_middleware))
}

fn cors_layer() -> CorsLayer {
    let server = &config::config().server;
    if !server.enable_cors {
        return CorsLayer::new();
    }

    let origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "LeadPulse API",
            "version": version,
            "description": "Lead intake and attribution backend for patient symptom assessments",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "short_links": "/s/:code (public - 302 redirect)",
                "lead_intake": "/api/webhook/lead (public - assessment clients)",
                "access": "/api/access/check (protected)",
                "invites": "/api/invites/accept (protected)",
                "team": "/api/team/:clinic_id/* (protected)",
                "profiles": "/api/profiles/:profile_id/access/* (protected)",
                "links": "/api/links (protected)",
                "leads": "/api/leads (protected)",
            }
        }
    }))
}

async fn health(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "store": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "store unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "store_error": e.to_string()
                }
            })),
        ),
    }
}
