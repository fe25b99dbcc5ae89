mod common;

use anyhow::Result;
use chrono::{Duration, Utc};
use reqwest::StatusCode;
use serde_json::json;
use sha2::{Digest, Sha256};

use leadpulse_api::store::models::{MemberRole, NewInvite, PermissionSet};
use leadpulse_api::store::{Store, StoreCapabilities};

// Invite lifecycle, role management, and the roster. Each test runs against
// its own server and seeds through the shared store handle.

fn hash_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Seed a pending invite row directly, bypassing the service, so expiry can
/// be set in the past.
async fn seed_invite(
    server: &common::TestServer,
    clinic_id: uuid::Uuid,
    email: &str,
    raw_token: &str,
    expires_in: Duration,
) -> Result<uuid::Uuid> {
    let membership = server
        .store
        .upsert_invite(NewInvite {
            clinic_id,
            email: email.to_string(),
            name: None,
            role: MemberRole::Staff,
            permissions: PermissionSet::default(),
            invite_token_hash: hash_token(raw_token),
            invite_expires_at: Utc::now() + expires_in,
            invited_by: common::OWNER_PRINCIPAL.to_string(),
            location_ids: Vec::new(),
        })
        .await?;
    Ok(membership.id)
}

#[tokio::test]
async fn owner_invites_staff_and_acceptance_grants_access() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    let clinic = server.seed_clinic().await?;
    let owner = server.token_for(common::OWNER_PRINCIPAL, common::OWNER_EMAIL)?;

    let res = server
        .client
        .post(format!("{}/api/team/{}/invites", server.base_url, clinic.id))
        .bearer_auth(&owner)
        .json(&json!({
            "email": "staff@lakeside.test",
            "name": "Sam Ortiz",
            "permissions": { "leads": true }
        }))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::OK, "unexpected status: {}", res.status());
    let body = res.json::<serde_json::Value>().await?;
    assert!(body["success"].as_bool().unwrap_or(false), "success=false: {}", body);
    assert_eq!(body["data"]["membership"]["status"], "pending");
    assert_eq!(body["data"]["membership"]["role"], "staff");
    // The raw token appears exactly once; its hash never leaves the store
    let token = body["data"]["invite_token"]
        .as_str()
        .expect("invite_token in response")
        .to_string();
    assert!(body["data"]["membership"].get("invite_token_hash").is_none());

    let staff = server.token_for("auth0|staff-sam", "staff@lakeside.test")?;
    let res = server
        .client
        .post(format!("{}/api/invites/accept", server.base_url))
        .bearer_auth(&staff)
        .json(&json!({ "token": token }))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::OK, "unexpected status: {}", res.status());
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["data"]["status"], "active");
    assert_eq!(body["data"]["principal_id"], "auth0|staff-sam");

    // Acceptance provisions a granted, clinic-linked profile
    let res = server
        .client
        .get(format!("{}/api/access/check", server.base_url))
        .bearer_auth(&staff)
        .send()
        .await?;
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["data"]["granted"], true, "accepted staff should pass the gate: {}", body);
    Ok(())
}

#[tokio::test]
async fn invite_token_is_single_use() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    let clinic = server.seed_clinic().await?;
    let id = seed_invite(&server, clinic.id, "once@lakeside.test", "tok-once", Duration::days(7))
        .await?;

    let first = server.token_for("auth0|first", "once@lakeside.test")?;
    let res = server
        .client
        .post(format!("{}/api/invites/accept", server.base_url))
        .bearer_auth(&first)
        .json(&json!({ "token": "tok-once" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let second = server.token_for("auth0|second", "other@lakeside.test")?;
    let res = server
        .client
        .post(format!("{}/api/invites/accept", server.base_url))
        .bearer_auth(&second)
        .json(&json!({ "token": "tok-once" }))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["code"], "INVITE_CONSUMED");

    // The membership still belongs to the first accepter
    let membership = server.store.membership(id).await?.expect("membership");
    assert_eq!(membership.principal_id.as_deref(), Some("auth0|first"));
    Ok(())
}

#[tokio::test]
async fn expired_invite_answers_gone() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    let clinic = server.seed_clinic().await?;
    seed_invite(&server, clinic.id, "late@lakeside.test", "tok-late", -Duration::hours(1)).await?;

    let late = server.token_for("auth0|late", "late@lakeside.test")?;
    let res = server
        .client
        .post(format!("{}/api/invites/accept", server.base_url))
        .bearer_auth(&late)
        .json(&json!({ "token": "tok-late" }))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::GONE);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["code"], "INVITE_EXPIRED");
    Ok(())
}

#[tokio::test]
async fn reinvite_after_expiry_rotates_the_token() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    let clinic = server.seed_clinic().await?;
    let seeded =
        seed_invite(&server, clinic.id, "back@lakeside.test", "tok-old", -Duration::hours(1))
            .await?;

    // Re-inviting over the dead row reissues it in place
    let owner = server.token_for(common::OWNER_PRINCIPAL, common::OWNER_EMAIL)?;
    let res = server
        .client
        .post(format!("{}/api/team/{}/invites", server.base_url, clinic.id))
        .bearer_auth(&owner)
        .json(&json!({ "email": "back@lakeside.test" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK, "unexpected status: {}", res.status());
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["data"]["membership"]["id"], seeded.to_string());
    let fresh = body["data"]["invite_token"].as_str().expect("token").to_string();

    // The rotated-out token no longer matches anything
    let invitee = server.token_for("auth0|back", "back@lakeside.test")?;
    let res = server
        .client
        .post(format!("{}/api/invites/accept", server.base_url))
        .bearer_auth(&invitee)
        .json(&json!({ "token": "tok-old" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = server
        .client
        .post(format!("{}/api/invites/accept", server.base_url))
        .bearer_auth(&invitee)
        .json(&json!({ "token": fresh }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn live_invite_is_not_reissued() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    let clinic = server.seed_clinic().await?;
    let owner = server.token_for(common::OWNER_PRINCIPAL, common::OWNER_EMAIL)?;

    let invite = json!({ "email": "dup@lakeside.test" });
    let res = server
        .client
        .post(format!("{}/api/team/{}/invites", server.base_url, clinic.id))
        .bearer_auth(&owner)
        .json(&invite)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = server
        .client
        .post(format!("{}/api/team/{}/invites", server.base_url, clinic.id))
        .bearer_auth(&owner)
        .json(&invite)
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["code"], "CONFLICT");
    Ok(())
}

#[tokio::test]
async fn inviting_requires_the_team_permission() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    let clinic = server.seed_clinic().await?;
    seed_invite(&server, clinic.id, "plain@lakeside.test", "tok-plain", Duration::days(7)).await?;

    let staff = server.token_for("auth0|plain", "plain@lakeside.test")?;
    server
        .client
        .post(format!("{}/api/invites/accept", server.base_url))
        .bearer_auth(&staff)
        .json(&json!({ "token": "tok-plain" }))
        .send()
        .await?
        .error_for_status()?;

    // Default permissions carry no team flag
    let res = server
        .client
        .post(format!("{}/api/team/{}/invites", server.base_url, clinic.id))
        .bearer_auth(&staff)
        .json(&json!({ "email": "friend@lakeside.test" }))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["code"], "PERMISSION_DENIED");
    Ok(())
}

#[tokio::test]
async fn only_the_owner_grants_the_team_permission() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    let clinic = server.seed_clinic().await?;
    let owner = server.token_for(common::OWNER_PRINCIPAL, common::OWNER_EMAIL)?;

    // Owner may hand out the team flag
    let res = server
        .client
        .post(format!("{}/api/team/{}/invites", server.base_url, clinic.id))
        .bearer_auth(&owner)
        .json(&json!({
            "email": "manager@lakeside.test",
            "permissions": { "leads": true, "team": true }
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    let token = body["data"]["invite_token"].as_str().expect("token").to_string();

    let manager = server.token_for("auth0|manager", "manager@lakeside.test")?;
    server
        .client
        .post(format!("{}/api/invites/accept", server.base_url))
        .bearer_auth(&manager)
        .json(&json!({ "token": token }))
        .send()
        .await?
        .error_for_status()?;

    // A staff member with the team flag may invite, but not propagate the flag
    let res = server
        .client
        .post(format!("{}/api/team/{}/invites", server.base_url, clinic.id))
        .bearer_auth(&manager)
        .json(&json!({
            "email": "peer@lakeside.test",
            "permissions": { "team": true }
        }))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = server
        .client
        .post(format!("{}/api/team/{}/invites", server.base_url, clinic.id))
        .bearer_auth(&manager)
        .json(&json!({ "email": "peer@lakeside.test" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK, "unexpected status: {}", res.status());
    Ok(())
}

#[tokio::test]
async fn owner_membership_is_not_managed_through_staff_operations() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    let clinic = server.seed_clinic().await?;
    let owner = server.token_for(common::OWNER_PRINCIPAL, common::OWNER_EMAIL)?;

    let members = server.store.memberships_for_clinic(clinic.id).await?;
    let owner_row = members
        .iter()
        .find(|m| m.role == MemberRole::Owner)
        .expect("owner membership");

    let res = server
        .client
        .put(format!(
            "{}/api/team/{}/members/{}/role",
            server.base_url, clinic.id, owner_row.id
        ))
        .bearer_auth(&owner)
        .json(&json!({ "role": "physician" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = server
        .client
        .delete(format!(
            "{}/api/team/{}/members/{}",
            server.base_url, clinic.id, owner_row.id
        ))
        .bearer_auth(&owner)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn role_update_and_removal() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    let clinic = server.seed_clinic().await?;
    let owner = server.token_for(common::OWNER_PRINCIPAL, common::OWNER_EMAIL)?;
    let member_id =
        seed_invite(&server, clinic.id, "rw@lakeside.test", "tok-rw", Duration::days(7)).await?;

    // Moving off staff resets permissions
    let res = server
        .client
        .put(format!(
            "{}/api/team/{}/members/{}/role",
            server.base_url, clinic.id, member_id
        ))
        .bearer_auth(&owner)
        .json(&json!({ "role": "physician" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK, "unexpected status: {}", res.status());
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["data"]["role"], "physician");
    assert_eq!(body["data"]["permissions"]["leads"], false);

    let res = server
        .client
        .delete(format!(
            "{}/api/team/{}/members/{}",
            server.base_url, clinic.id, member_id
        ))
        .bearer_auth(&owner)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN, "physician rows are not staff");

    // Once converted, the row is out of reach for role updates too
    let res = server
        .client
        .put(format!(
            "{}/api/team/{}/members/{}/role",
            server.base_url, clinic.id, member_id
        ))
        .bearer_auth(&owner)
        .json(&json!({ "role": "staff", "permissions": { "leads": true } }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Removal still works against a row that stayed staff
    let staff_id =
        seed_invite(&server, clinic.id, "gone@lakeside.test", "tok-gone", Duration::days(7))
            .await?;
    let res = server
        .client
        .delete(format!(
            "{}/api/team/{}/members/{}",
            server.base_url, clinic.id, staff_id
        ))
        .bearer_auth(&owner)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["data"]["removed"], staff_id.to_string());
    assert!(server.store.membership(staff_id).await?.is_none());
    assert!(server.store.membership(member_id).await?.is_some());
    Ok(())
}

#[tokio::test]
async fn suspension_follows_the_store_capability() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    let clinic = server.seed_clinic().await?;
    let owner = server.token_for(common::OWNER_PRINCIPAL, common::OWNER_EMAIL)?;
    let member_id =
        seed_invite(&server, clinic.id, "sus@lakeside.test", "tok-sus", Duration::days(7)).await?;

    let staff = server.token_for("auth0|sus", "sus@lakeside.test")?;
    server
        .client
        .post(format!("{}/api/invites/accept", server.base_url))
        .bearer_auth(&staff)
        .json(&json!({ "token": "tok-sus" }))
        .send()
        .await?
        .error_for_status()?;

    let res = server
        .client
        .post(format!(
            "{}/api/team/{}/members/{}/suspend",
            server.base_url, clinic.id, member_id
        ))
        .bearer_auth(&owner)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK, "unexpected status: {}", res.status());
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["data"]["status"], "inactive");

    // A suspended membership stops acting for the clinic
    let res = server
        .client
        .get(format!("{}/api/team/{}/members", server.base_url, clinic.id))
        .bearer_auth(&staff)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = server
        .client
        .post(format!(
            "{}/api/team/{}/members/{}/reactivate",
            server.base_url, clinic.id, member_id
        ))
        .bearer_auth(&owner)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["data"]["status"], "active");
    Ok(())
}

#[tokio::test]
async fn suspension_without_the_capability_is_unsupported() -> Result<()> {
    use leadpulse_api::services::webhook::NullDispatcher;
    use leadpulse_api::store::memory::MemoryStore;
    use std::sync::Arc;

    let store = Arc::new(MemoryStore::with_capabilities(StoreCapabilities {
        member_suspension: false,
    }));
    let server = common::TestServer::spawn_with(store, Arc::new(NullDispatcher)).await?;
    let clinic = server.seed_clinic().await?;
    let owner = server.token_for(common::OWNER_PRINCIPAL, common::OWNER_EMAIL)?;
    let member_id =
        seed_invite(&server, clinic.id, "cap@lakeside.test", "tok-cap", Duration::days(7)).await?;

    let res = server
        .client
        .post(format!(
            "{}/api/team/{}/members/{}/suspend",
            server.base_url, clinic.id, member_id
        ))
        .bearer_auth(&owner)
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::NOT_IMPLEMENTED);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["code"], "UNSUPPORTED");
    Ok(())
}

#[tokio::test]
async fn roster_lists_members_and_physicians() -> Result<()> {
    let server = common::TestServer::spawn().await?;
    let clinic = server.seed_clinic().await?;
    let owner = server.token_for(common::OWNER_PRINCIPAL, common::OWNER_EMAIL)?;

    server
        .client
        .post(format!("{}/api/team/{}/physicians", server.base_url, clinic.id))
        .bearer_auth(&owner)
        .json(&json!({
            "name": "Dr. Priya Nair",
            "credentials": "MD, FACS",
            "email": "nair@lakeside.test"
        }))
        .send()
        .await?
        .error_for_status()?;

    let res = server
        .client
        .get(format!("{}/api/team/{}/members", server.base_url, clinic.id))
        .bearer_auth(&owner)
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::OK, "unexpected status: {}", res.status());
    let body = res.json::<serde_json::Value>().await?;
    let members = body["data"]["members"].as_array().cloned().unwrap_or_default();
    assert_eq!(members.len(), 1, "expected only the owner row: {}", body);
    assert_eq!(members[0]["role"], "owner");
    // No profile was ever seeded for the owner, so the flattened flag is off
    assert_eq!(members[0]["has_access"], false);

    let physicians = body["data"]["physicians"].as_array().cloned().unwrap_or_default();
    assert_eq!(physicians.len(), 1);
    assert_eq!(physicians[0]["name"], "Dr. Priya Nair");

    // Roster reads are members-only
    let outsider = server.token_for("auth0|outsider", "out@elsewhere.test")?;
    let res = server
        .client
        .get(format!("{}/api/team/{}/members", server.base_url, clinic.id))
        .bearer_auth(&outsider)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    Ok(())
}
