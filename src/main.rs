use std::sync::Arc;

use leadpulse_api::app::{app, AppState};
use leadpulse_api::config;
use leadpulse_api::services::webhook::HttpDispatcher;
use leadpulse_api::store::memory::MemoryStore;
use leadpulse_api::store::postgres::PgStore;
use leadpulse_api::store::DynStore;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, N8N_WEBHOOK_URL, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();
    tracing::info!("Starting LeadPulse API in {:?} mode", config.environment);

    let store: DynStore = match &config.database.url {
        Some(_) => {
            let pg = PgStore::connect(&config.database)
                .await
                .unwrap_or_else(|e| panic!("failed to connect to database: {}", e));
            Arc::new(pg)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store (data is not persisted)");
            Arc::new(MemoryStore::new())
        }
    };

    if config.webhook.endpoint.is_none() {
        tracing::warn!("No webhook endpoint configured; lead dispatch will be skipped");
    }
    let dispatcher = Arc::new(HttpDispatcher::from_config(&config.webhook));

    let state = AppState::new(store, dispatcher);
    let app = app(state);

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    println!("🚀 LeadPulse API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}
