use axum::{
    Extension, Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::types::{LoginRequest, LoginResponse, SessionUser, SignupRequest, SignupResponse};
use super::{ApiError, ApiJson, AppState, validation};
use crate::db::format_timestamp;
use crate::domain::{Identity, Role};
use crate::services::{AuthError, UserInfo, authorize};

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::InvalidCredentials,
            AuthError::DuplicateUsername => Self::DuplicateUsername,
            AuthError::InvalidReferral(denial) => Self::InvalidReferral(denial.to_string()),
            AuthError::MissingToken
            | AuthError::InvalidToken
            | AuthError::ExpiredToken
            | AuthError::UserNotFound => Self::Unauthorized,
            AuthError::Forbidden => Self::Forbidden,
            AuthError::Validation(msg) => Self::validation(msg),
            AuthError::Database(msg) => Self::DatabaseError(msg),
            AuthError::Internal(msg) => Self::internal(msg),
        }
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Requires a valid `Authorization: Bearer <token>` header and exposes the
/// caller as an `Extension<Identity>`.
pub async fn require_user(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = authenticate(&state, request.headers())?;
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// As [`require_user`], and the caller must be an admin.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = authenticate(&state, request.headers())?;
    if let Err(e) = authorize(&identity, Role::Admin) {
        tracing::info!(
            username = %identity.username,
            path = %request.uri().path(),
            "Admin route refused"
        );
        return Err(e.into());
    }
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Identity, ApiError> {
    let identity = state.auth().authenticate(bearer_token(headers))?;
    tracing::Span::current().record("user_id", identity.user_id.value());
    Ok(identity)
}

/// Token from `Authorization: Bearer <token>`; other schemes count as absent.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then_some(token.trim())
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/signup
pub async fn signup(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.referral_code.trim().is_empty() {
        return Err(ApiError::validation("Referral code is required"));
    }

    let user = state
        .auth()
        .register(
            &payload.username,
            &payload.password,
            payload.referral_code.trim(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(SignupResponse { user_id: user.id })))
}

/// POST /auth/login
/// Unknown usernames and wrong passwords produce the same response.
pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    validation::validate_login(&payload.username, &payload.password)?;

    let result = state
        .auth()
        .login(&payload.username, &payload.password)
        .await?;

    Ok(Json(LoginResponse {
        token: result.token,
        expires_at: format_timestamp(result.expires_at),
        user: SessionUser {
            id: result.user.id,
            username: result.user.username,
            role: result.user.role,
        },
    }))
}

/// GET /auth/me
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<UserInfo>, ApiError> {
    Ok(Json(state.auth().me(&identity).await?))
}
