mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use commission_desk::domain::{Identity, Role, UserId};
use commission_desk::services::TokenService;
use common::{ADMIN_USERNAME, TOKEN_SECRET, TestApp, test_config};
use serde_json::json;

#[tokio::test]
async fn test_referral_exhaustion() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    app.create_referral(&admin, "VIP", Some(1)).await;

    let (status, body) = app.signup("alice", "correct-horse", "VIP").await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["userId"].as_i64().unwrap() > 0);

    let (status, body) = app.signup("bob", "correct-horse", "VIP").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "invalid_referral");
    assert_eq!(body["success"], false);

    // The refused signup left no account behind.
    let (status, _) = app
        .post(
            "/api/auth/login",
            None,
            json!({ "username": "bob", "password": "correct-horse" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, referrals) = app.get("/api/admin/referrals", Some(&admin)).await;
    let vip = referrals
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["code"] == "VIP")
        .unwrap();
    assert_eq!(vip["usage_count"], 1);
}

#[tokio::test]
async fn test_signup_rejections() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    app.create_referral(&admin, "OPEN", None).await;

    let (status, body) = app.signup("carol", "correct-horse", "NOPE").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "invalid_referral");

    let (status, body) = app.signup("carol", "correct-horse", "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");

    let (status, body) = app.signup("carol", "short", "OPEN").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");

    let (status, _) = app.signup("carol", "correct-horse", "OPEN").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.signup("carol", "another-horse", "OPEN").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "duplicate_username");

    let (status, body) = app.signup(ADMIN_USERNAME, "another-horse", "OPEN").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "duplicate_username");
}

#[tokio::test]
async fn test_expired_referral_is_refused() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;

    let (status, _) = app
        .post(
            "/api/admin/referrals",
            Some(&admin),
            json!({ "code": "OLD", "expiration_date": "2020-01-01T00:00:00Z" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.signup("dave", "correct-horse", "OLD").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "invalid_referral");
}

#[tokio::test]
async fn test_login_failures_are_uniform() {
    let app = TestApp::spawn().await;
    app.user_token("erin").await;

    for _ in 0..2 {
        let (status, body) = app
            .post(
                "/api/auth/login",
                None,
                json!({ "username": "erin", "password": "wrong-password" }),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "invalid_credentials");
    }

    let (status, unknown) = app
        .post(
            "/api/auth/login",
            None,
            json!({ "username": "nobody", "password": "wrong-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown["code"], "invalid_credentials");

    // No lockout after failures.
    app.login("erin", "correct-horse").await;
}

#[tokio::test]
async fn test_login_and_me() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    app.create_referral(&admin, "WELCOME", None).await;
    app.signup("frank", "correct-horse", "WELCOME").await;

    let (status, body) = app
        .post(
            "/api/auth/login",
            None,
            json!({ "username": "frank", "password": "correct-horse" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "frank");
    assert_eq!(body["user"]["role"], "user");
    assert!(body["expires_at"].is_string());
    assert!(body.get("password_hash").is_none());

    let token = body["token"].as_str().unwrap();
    let (status, me) = app.get("/api/auth/me", Some(token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "frank");
    assert_eq!(me["referral_code_used"], "WELCOME");

    let (status, body) = app
        .post("/api/auth/login", None, json!({ "username": "frank" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn test_bad_tokens_are_unauthorized() {
    let app = TestApp::spawn().await;

    let (status, body) = app.get("/api/requests/mine", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthorized");

    let (status, _) = app.get("/api/requests/mine", Some("not-a-token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let foreign = TokenService::new(b"some-other-secret-that-is-long-enough", Duration::hours(24));
    let identity = Identity {
        user_id: UserId::new(1),
        username: ADMIN_USERNAME.to_string(),
        role: Role::Admin,
    };
    let forged = foreign.issue(&identity).unwrap();
    let (status, _) = app.get("/api/admin/requests", Some(&forged.token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let ours = TokenService::new(TOKEN_SECRET.as_bytes(), Duration::hours(24));
    let expired = ours
        .issue_at(&identity, Utc::now() - Duration::hours(25))
        .unwrap();
    let (status, body) = app.get("/api/admin/requests", Some(&expired.token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthorized");

    let fresh = ours.issue(&identity).unwrap();
    let (status, _) = app.get("/api/admin/requests", Some(&fresh.token)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_non_admin_is_forbidden() {
    let app = TestApp::spawn().await;
    let user = app.user_token("grace").await;

    for uri in [
        "/api/admin/requests",
        "/api/admin/referrals",
        "/api/admin/users",
        "/api/admin/stats",
        "/api/admin/feedback",
        "/api/metrics",
    ] {
        let (status, body) = app.get(uri, Some(&user)).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
        assert_eq!(body["code"], "forbidden");
    }

    let (status, _) = app
        .post("/api/admin/referrals", Some(&user), json!({ "code": "SNEAKY" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_concurrent_signups_respect_limit() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config();
    config.general.database_path = format!("sqlite:{}", dir.path().join("desk.db").display());

    let app = TestApp::with_config(config).await;
    let admin = app.admin_token().await;
    app.create_referral(&admin, "LAST", Some(1)).await;

    let mut handles = Vec::new();
    for i in 0..8 {
        let auth = app.state.shared.auth_service.clone();
        handles.push(tokio::spawn(async move {
            auth.register(&format!("racer{i}"), "correct-horse", "LAST")
                .await
                .is_ok()
        }));
    }

    let mut admitted = 0;
    for handle in handles {
        if handle.await.unwrap() {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 1);

    let (_, users) = app.get("/api/admin/users", Some(&admin)).await;
    let with_code = users
        .as_array()
        .unwrap()
        .iter()
        .filter(|u| u["referral_code_used"] == "LAST")
        .count();
    assert_eq!(with_code, 1);
}
