use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::state::SharedState;

mod admin;
pub mod auth;
mod error;
mod feedback;
mod observability;
mod requests;
mod system;
mod tracking;
mod types;
mod validation;

pub use error::ApiError;
pub use types::*;

use crate::services::{
    AuthService, FeedbackService, ReferralService, RequestService, SystemService,
};
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn auth(&self) -> &Arc<dyn AuthService> {
        &self.shared.auth_service
    }

    #[must_use]
    pub fn referrals(&self) -> &Arc<dyn ReferralService> {
        &self.shared.referral_service
    }

    #[must_use]
    pub fn requests(&self) -> &Arc<dyn RequestService> {
        &self.shared.request_service
    }

    #[must_use]
    pub fn feedback(&self) -> &Arc<dyn FeedbackService> {
        &self.shared.feedback_service
    }

    #[must_use]
    pub fn system(&self) -> &Arc<dyn SystemService> {
        &self.shared.system_service
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    shared.bootstrap_admin().await?;
    Ok(create_app_state(shared, prometheus_handle))
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config().server.cors_allowed_origins.clone();

    let api_router = Router::new()
        .merge(public_routes())
        .merge(user_routes(state.clone()))
        .merge(admin_routes(state.clone()))
        .route_layer(middleware::from_fn(observability::logging_middleware))
        .with_state(state);

    let cors_layer = if cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .layer(middleware::from_fn(observability::security_headers_middleware))
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/status", get(system::get_status))
        .route("/system/health/live", get(system::health_live))
        .route("/system/health/ready", get(system::health_ready))
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/tracking/{access_key}", get(tracking::track_request))
        .route("/feedback", post(feedback::submit_feedback))
}

fn user_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/me", get(auth::me))
        .route("/requests", post(requests::submit_request))
        .route("/requests/mine", get(requests::list_my_requests))
        .route_layer(middleware::from_fn_with_state(state, auth::require_user))
}

fn admin_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/requests", get(admin::list_requests))
        .route(
            "/admin/requests/{id}/status",
            put(admin::update_request_status),
        )
        .route("/admin/requests/{id}/history", get(admin::request_history))
        .route("/admin/referrals", get(admin::list_referrals))
        .route("/admin/referrals", post(admin::create_referral))
        .route("/admin/referrals/{id}", delete(admin::delete_referral))
        .route("/admin/users", get(admin::list_users))
        .route("/admin/stats", get(admin::stats))
        .route("/admin/feedback", get(feedback::list_feedback))
        .route("/metrics", get(observability::get_metrics))
        .route_layer(middleware::from_fn_with_state(state, auth::require_admin))
}
