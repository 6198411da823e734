//! Admin-only endpoints. The router guards every route here with
//! [`super::auth::require_admin`]; the services re-check the role.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;

use super::types::{CreateReferralRequest, DeletedResponse, StatusUpdateRequest};
use super::{ApiError, ApiJson, AppState, validation};
use crate::domain::{Identity, ReferralId, RequestId};
use crate::services::{
    CreateReferral, DeskStats, ReferralError, ReferralSummary, RequestView, StatusChange,
    StatusChangeResult, StatusEventView, SystemError, UserInfo,
};

impl From<ReferralError> for ApiError {
    fn from(err: ReferralError) -> Self {
        match err {
            ReferralError::Denied(denial) => Self::InvalidReferral(denial.to_string()),
            ReferralError::DuplicateCode => Self::DuplicateCode,
            ReferralError::NotFound => Self::NotFound("Referral code not found".to_string()),
            ReferralError::Validation(msg) => Self::validation(msg),
            ReferralError::Database(msg) => Self::DatabaseError(msg),
            ReferralError::Internal(msg) => Self::internal(msg),
        }
    }
}

impl From<SystemError> for ApiError {
    fn from(err: SystemError) -> Self {
        match err {
            SystemError::Database(msg) => Self::DatabaseError(msg),
        }
    }
}

// Requests

/// GET /admin/requests
pub async fn list_requests(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<RequestView>>, ApiError> {
    Ok(Json(state.requests().list_all(&identity).await?))
}

/// PUT /admin/requests/{id}/status
pub async fn update_request_status(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<StatusUpdateRequest>,
) -> Result<Json<StatusChangeResult>, ApiError> {
    let id = RequestId::new(validation::parse_id("request", &id)?);
    let status = validation::parse_status(&payload.status)?;

    let result = state
        .requests()
        .set_status(
            &identity,
            id,
            StatusChange {
                status,
                reason: payload.reason,
                expected_version: payload.expected_version,
            },
        )
        .await?;

    Ok(Json(result))
}

/// GET /admin/requests/{id}/history
pub async fn request_history(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Json<Vec<StatusEventView>>, ApiError> {
    let id = RequestId::new(validation::parse_id("request", &id)?);
    Ok(Json(state.requests().history(&identity, id).await?))
}

// Referral codes

/// GET /admin/referrals
pub async fn list_referrals(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ReferralSummary>>, ApiError> {
    Ok(Json(state.referrals().list().await?))
}

/// POST /admin/referrals
pub async fn create_referral(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    ApiJson(payload): ApiJson<CreateReferralRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let created = state
        .referrals()
        .create(
            CreateReferral {
                code: payload.code,
                description: payload.description,
                usage_limit: payload.usage_limit,
                expiration_date: payload.expiration_date,
            },
            &identity.username,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// DELETE /admin/referrals/{id}
pub async fn delete_referral(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let id = validation::parse_id("referral", &id)?;
    state.referrals().delete(ReferralId::new(id)).await?;
    Ok(Json(DeletedResponse { id, deleted: true }))
}

// Accounts & stats

/// GET /admin/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UserInfo>>, ApiError> {
    Ok(Json(state.auth().list_users().await?))
}

/// GET /admin/stats
pub async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<DeskStats>, ApiError> {
    Ok(Json(state.system().stats().await?))
}
