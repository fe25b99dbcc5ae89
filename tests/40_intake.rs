mod common;

use std::sync::{Arc, Mutex};

use anyhow::Result;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use reqwest::StatusCode;
use serde_json::json;

use leadpulse_api::config::WebhookConfig;
use leadpulse_api::services::webhook::HttpDispatcher;
use leadpulse_api::store::memory::MemoryStore;
use leadpulse_api::store::Store;

// Public lead intake: validation, enrichment, and one-shot webhook delivery
// against a local capture endpoint standing in for the automation pipeline.

type Received = Arc<Mutex<Vec<(Option<String>, serde_json::Value)>>>;

struct CaptureServer {
    url: String,
    received: Received,
}

/// Local endpoint that records every delivery and answers with `status`.
async fn capture_server(status: u16) -> Result<CaptureServer> {
    let reply = axum::http::StatusCode::from_u16(status)?;
    let received: Received = Arc::default();
    let sink = received.clone();

    let app = Router::new().route(
        "/hooks/lead",
        post(move |headers: HeaderMap, Json(body): Json<serde_json::Value>| {
            let sink = sink.clone();
            async move {
                let token = headers
                    .get("x-webhook-token")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                sink.lock().unwrap().push((token, body));
                reply
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let url = format!("http://{}/hooks/lead", listener.local_addr()?);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(CaptureServer { url, received })
}

async fn server_with_endpoint(capture: &CaptureServer) -> Result<common::TestServer> {
    let dispatcher = Arc::new(HttpDispatcher::from_config(&WebhookConfig {
        endpoint: Some(capture.url.clone()),
        timeout_secs: 2,
        secret: Some("hook-secret".to_string()),
        forward_telephony: false,
    }));
    common::TestServer::spawn_with(Arc::new(MemoryStore::new()), dispatcher).await
}

#[tokio::test]
async fn accepted_lead_is_stored_enriched_and_delivered() -> Result<()> {
    let capture = capture_server(200).await?;
    let server = server_with_endpoint(&capture).await?;
    let profile = server.seed_doctor("auth0|dr-intake", "intake@clinic.test", true).await?;

    let res = server
        .client
        .post(format!("{}/api/webhook/lead", server.base_url))
        .json(&json!({
            "name": "Jordan Fisher",
            "email": "jordan@patient.test",
            "phone": "555-0104",
            "quiz_type": "NOSE",
            "doctor_id": profile.id.to_string(),
            "score": 42.5,
            "maxScore": 100.0,
            "quiz_title": "Nasal Obstruction",
            "answers": [1, 3, 2],
            "lead_source": "facebook"
        }))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::OK, "unexpected status: {}", res.status());
    let body = res.json::<serde_json::Value>().await?;
    assert!(body["success"].as_bool().unwrap_or(false), "success=false: {}", body);
    assert_eq!(body["message"], "Lead captured");
    assert_eq!(body["n8n_triggered"], true);

    // The response body is the delivered envelope
    assert_eq!(body["webhook_id"], body["data"]["webhook_id"]);
    assert_eq!(body["data"]["lead"]["email"], "jordan@patient.test");
    assert_eq!(body["data"]["doctor"]["name"], "Dr. Alex Rivera");
    assert_eq!(body["data"]["quiz_data"]["maxScore"], 100.0);
    // Telephony forwarding is off, and credentials never serialize anyway
    assert!(body["data"]["doctor"].get("twilio_auth_token").is_none());

    let received = capture.received.lock().unwrap().clone();
    assert_eq!(received.len(), 1, "expected exactly one delivery");
    let (token, delivered) = &received[0];
    assert_eq!(token.as_deref(), Some("hook-secret"));
    assert_eq!(delivered, &body["data"]);

    let leads = server.store.leads_for_doctor(&profile.id.to_string()).await?;
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0].name, "Jordan Fisher");
    Ok(())
}

#[tokio::test]
async fn missing_fields_are_named_first_to_last() -> Result<()> {
    let server = common::TestServer::spawn().await?;

    let res = server
        .client
        .post(format!("{}/api/webhook/lead", server.base_url))
        .json(&json!({}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Missing required field: name");
    assert_eq!(body["details"]["field"], "name");

    // Whitespace does not count as a value
    let res = server
        .client
        .post(format!("{}/api/webhook/lead", server.base_url))
        .json(&json!({
            "name": "Jordan Fisher",
            "email": "jordan@patient.test",
            "phone": "   "
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["details"]["field"], "phone");

    // Nothing was stored along the way
    let leads = server.store.leads_for_doctor("").await?;
    assert!(leads.is_empty());
    Ok(())
}

#[tokio::test]
async fn unknown_doctor_is_not_fatal() -> Result<()> {
    let server = common::TestServer::spawn().await?;

    let res = server
        .client
        .post(format!("{}/api/webhook/lead", server.base_url))
        .json(&json!({
            "name": "Casey Morgan",
            "email": "casey@patient.test",
            "phone": "555-0105",
            "quiz_type": "SNOT22",
            "doctor_id": "mystery-doc",
            "score": 12.0
        }))
        .send()
        .await?;

    // Attribution is an opaque string; enrichment just comes back empty
    assert_eq!(res.status(), StatusCode::OK, "unexpected status: {}", res.status());
    let body = res.json::<serde_json::Value>().await?;
    assert!(body["data"]["doctor"].is_null(), "expected null doctor: {}", body);

    let leads = server.store.leads_for_doctor("mystery-doc").await?;
    assert_eq!(leads.len(), 1);
    Ok(())
}

#[tokio::test]
async fn rejected_delivery_does_not_lose_the_lead() -> Result<()> {
    let capture = capture_server(500).await?;
    let server = server_with_endpoint(&capture).await?;

    let res = server
        .client
        .post(format!("{}/api/webhook/lead", server.base_url))
        .json(&json!({
            "name": "Robin Ellis",
            "email": "robin@patient.test",
            "phone": "555-0106",
            "quiz_type": "NOSE",
            "doctor_id": "dr-offline",
            "score": 77.0
        }))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::OK, "unexpected status: {}", res.status());
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["n8n_triggered"], true, "delivery was attempted: {}", body);

    assert_eq!(capture.received.lock().unwrap().len(), 1);
    let leads = server.store.leads_for_doctor("dr-offline").await?;
    assert_eq!(leads.len(), 1);
    Ok(())
}

#[tokio::test]
async fn unconfigured_dispatch_is_skipped() -> Result<()> {
    let server = common::TestServer::spawn().await?;

    let res = server
        .client
        .post(format!("{}/api/webhook/lead", server.base_url))
        .json(&json!({
            "name": "Dana Brooks",
            "email": "dana@patient.test",
            "phone": "555-0107",
            "quiz_type": "NOSE",
            "doctor_id": "dr-quiet",
            "score": 5.0
        }))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["n8n_triggered"], false);

    let leads = server.store.leads_for_doctor("dr-quiet").await?;
    assert_eq!(leads.len(), 1);
    Ok(())
}

#[tokio::test]
async fn leads_listing_requires_a_granted_gate() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    let profile = server.seed_doctor("auth0|dr-leads", "leads@clinic.test", true).await?;
    let token = server.token_for("auth0|dr-leads", "leads@clinic.test")?;

    for n in 0..2 {
        server
            .client
            .post(format!("{}/api/webhook/lead", server.base_url))
            .json(&json!({
                "name": format!("Patient {}", n),
                "email": format!("p{}@patient.test", n),
                "phone": "555-0200",
                "quiz_type": "NOSE",
                "doctor_id": profile.id.to_string(),
                "score": 10.0 * f64::from(n)
            }))
            .send()
            .await?
            .error_for_status()?;
    }

    let res = server
        .client
        .get(format!(
            "{}/api/leads?doctor_id={}",
            server.base_url, profile.id
        ))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK, "unexpected status: {}", res.status());
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));

    // Revocation blocks reads even of the caller's own leads
    server.store.set_access_control(profile.id, false).await?;
    let res = server
        .client
        .get(format!(
            "{}/api/leads?doctor_id={}",
            server.base_url, profile.id
        ))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["code"], "PERMISSION_DENIED");

    // A granted caller still needs attribution over the target doctor
    server.seed_doctor("auth0|nosy", "nosy@elsewhere.test", true).await?;
    let nosy = server.token_for("auth0|nosy", "nosy@elsewhere.test")?;
    let res = server
        .client
        .get(format!(
            "{}/api/leads?doctor_id={}",
            server.base_url, profile.id
        ))
        .bearer_auth(&nosy)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    Ok(())
}
