mod common;

use axum::http::StatusCode;
use commission_desk::services::KeyGenerator;
use common::{TestApp, request_payload, test_config};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[tokio::test]
async fn test_submit_and_track_round_trip() {
    let app = TestApp::spawn().await;
    let user = app.user_token("lucy_fan").await;

    let receipt = app.submit(&user, "Lucy").await;
    let key = receipt["access_key"].as_str().unwrap();
    assert_eq!(key.len(), 14);
    assert!(key.chars().all(|c| c.is_ascii_alphanumeric()));
    assert!(receipt["id"].as_i64().unwrap() > 0);

    let (status, view) = app.get(&format!("/api/tracking/{key}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["character_name"], "Lucy");
    assert_eq!(view["status"], "pending");
    assert!(view["rejection_reason"].is_null());
}

#[tokio::test]
async fn test_tracking_view_is_masked() {
    let app = TestApp::spawn().await;
    let user = app.user_token("masked").await;
    let admin = app.admin_token().await;

    let receipt = app.submit(&user, "David").await;
    let key = receipt["access_key"].as_str().unwrap();
    let id = receipt["id"].as_i64().unwrap();

    for status in ["reviewing", "on_hold", "completed"] {
        let (code, _) = app
            .put(
                &format!("/api/admin/requests/{id}/status"),
                Some(&admin),
                json!({ "status": status }),
            )
            .await;
        assert_eq!(code, StatusCode::OK);

        let (_, view) = app.get(&format!("/api/tracking/{key}"), None).await;
        let fields = view.as_object().unwrap();
        for hidden in ["id", "contact_handle", "contact_method", "notes", "access_key", "owner_id"] {
            assert!(!fields.contains_key(hidden), "{hidden} leaked");
        }
        assert!(!view.to_string().contains("reina@example.com"));
        assert_eq!(view["status"], status);
    }
}

#[tokio::test]
async fn test_tracking_unknown_key() {
    let app = TestApp::spawn().await;

    let (status, body) = app.get("/api/tracking/AAAAAAAAAAAAAA", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");

    let (status, _) = app.get("/api/tracking/has%20space", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ownership_scoping() {
    let app = TestApp::spawn().await;
    let alice = app.user_token("alice").await;
    let bob = app.user_token("bob").await;
    let admin = app.admin_token().await;

    let receipt = app.submit(&alice, "Rebecca").await;
    let id = receipt["id"].clone();

    let (status, mine) = app.get("/api/requests/mine", Some(&alice)).await;
    assert_eq!(status, StatusCode::OK);
    let mine = mine.as_array().unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["id"], id);
    assert_eq!(mine[0]["contact_handle"], "reina@example.com");

    let (_, theirs) = app.get("/api/requests/mine", Some(&bob)).await;
    assert!(theirs.as_array().unwrap().iter().all(|r| r["id"] != id));

    let (status, all) = app.get("/api/admin/requests", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(all.as_array().unwrap().iter().any(|r| r["id"] == id));
}

#[tokio::test]
async fn test_submission_validation() {
    let app = TestApp::spawn().await;
    let user = app.user_token("validator").await;

    let mut missing = request_payload("Lucy");
    missing["series_source"] = json!("   ");
    let (status, body) = app.post("/api/requests", Some(&user), missing).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");

    let mut fax = request_payload("Lucy");
    fax["contact_method"] = json!("fax");
    let (status, _) = app.post("/api/requests", Some(&user), fax).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send(
            axum::http::Method::POST,
            "/api/requests",
            Some(&user),
            Some(json!("not an object")),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");

    let (_, mine) = app.get("/api/requests/mine", Some(&user)).await;
    assert!(mine.as_array().unwrap().is_empty());

    let (status, _) = app
        .post("/api/requests", None, request_payload("Lucy"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

/// Hands out a fixed sequence of keys, then repeats the last one.
struct ScriptedKeys(Mutex<VecDeque<String>>);

impl ScriptedKeys {
    fn new(keys: &[&str]) -> Arc<Self> {
        Arc::new(Self(Mutex::new(
            keys.iter().map(|k| (*k).to_string()).collect(),
        )))
    }
}

impl KeyGenerator for ScriptedKeys {
    fn generate(&self) -> String {
        let mut keys = self.0.lock().unwrap();
        if keys.len() > 1 {
            keys.pop_front().unwrap()
        } else {
            keys.front().cloned().unwrap()
        }
    }
}

#[tokio::test]
async fn test_key_collision_is_retried() {
    let keys = ScriptedKeys::new(&["DUPLICATEKEY01", "DUPLICATEKEY01", "FRESHKEY000002"]);
    let app = TestApp::with_keys(test_config(), keys).await;
    let user = app.user_token("collider").await;

    let first = app.submit(&user, "Lucy").await;
    assert_eq!(first["access_key"], "DUPLICATEKEY01");

    let second = app.submit(&user, "Maine").await;
    assert_eq!(second["access_key"], "FRESHKEY000002");

    let (_, view) = app.get("/api/tracking/FRESHKEY000002", None).await;
    assert_eq!(view["character_name"], "Maine");
}

#[tokio::test]
async fn test_key_exhaustion_is_conflict() {
    let keys = ScriptedKeys::new(&["SAMEKEYEVERY01"]);
    let app = TestApp::with_keys(test_config(), keys).await;
    let user = app.user_token("unlucky").await;

    app.submit(&user, "Lucy").await;
    let (status, body) = app
        .post("/api/requests", Some(&user), request_payload("Kiwi"))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");
}
