#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use commission_desk::api::{self, AppState};
use commission_desk::config::Config;
use commission_desk::services::KeyGenerator;
use commission_desk::state::SharedState;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

pub const TOKEN_SECRET: &str = "integration-test-secret-0123456789abcdef";
pub const ADMIN_USERNAME: &str = "root";
pub const ADMIN_PASSWORD: &str = "root-password-1";

/// In-memory config with a cheap Argon2 cost and a bootstrap admin.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config.security.argon2_parallelism = 1;
    config.security.token_secret = Some(TOKEN_SECRET.to_string());
    config.bootstrap.admin_username = Some(ADMIN_USERNAME.to_string());
    config.bootstrap.admin_password = Some(ADMIN_PASSWORD.to_string());
    config.observability.metrics_enabled = false;
    config
}

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let state = api::create_app_state_from_config(config, None)
            .await
            .expect("Failed to create app state");
        Self {
            router: api::router(state.clone()),
            state,
        }
    }

    pub async fn with_keys(config: Config, keys: Arc<dyn KeyGenerator>) -> Self {
        let shared = SharedState::with_key_generator(config, keys)
            .await
            .expect("Failed to create shared state");
        shared.bootstrap_admin().await.expect("bootstrap admin");
        let state = api::create_app_state(Arc::new(shared), None);
        Self {
            router: api::router(state.clone()),
            state,
        }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, token, None).await
    }

    pub async fn login(&self, username: &str, password: &str) -> String {
        let (status, body) = self
            .post(
                "/api/auth/login",
                None,
                json!({ "username": username, "password": password }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["token"].as_str().unwrap().to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.login(ADMIN_USERNAME, ADMIN_PASSWORD).await
    }

    pub async fn create_referral(&self, admin: &str, code: &str, limit: Option<i64>) -> Value {
        let (status, body) = self
            .post(
                "/api/admin/referrals",
                Some(admin),
                json!({ "code": code, "usage_limit": limit }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "referral create failed: {body}");
        body
    }

    pub async fn signup(&self, username: &str, password: &str, code: &str) -> (StatusCode, Value) {
        self.post(
            "/api/auth/signup",
            None,
            json!({ "username": username, "password": password, "referral_code": code }),
        )
        .await
    }

    /// Signs up through a fresh unlimited code and returns a session token.
    pub async fn user_token(&self, username: &str) -> String {
        let admin = self.admin_token().await;
        let code = format!("INV-{username}");
        self.create_referral(&admin, &code, None).await;
        let (status, body) = self.signup(username, "correct-horse", &code).await;
        assert_eq!(status, StatusCode::CREATED, "signup failed: {body}");
        self.login(username, "correct-horse").await
    }

    pub async fn submit(&self, token: &str, character_name: &str) -> Value {
        let (status, body) = self
            .post("/api/requests", Some(token), request_payload(character_name))
            .await;
        assert_eq!(status, StatusCode::CREATED, "submit failed: {body}");
        body
    }
}

pub fn request_payload(character_name: &str) -> Value {
    json!({
        "operator_name": "Reina",
        "character_name": character_name,
        "series_source": "Cyberpunk: Edgerunners",
        "sourcing_vibe": ["screen-accurate", "weathered"],
        "contact_method": "email",
        "contact_handle": "reina@example.com",
        "notes": "Jacket only, size M"
    })
}
