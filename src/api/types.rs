use axum::{
    Json,
    extract::{FromRequest, Request},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use super::ApiError;
use crate::domain::{Role, UserId};

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: &'static str,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>, code: &'static str) -> Self {
        Self {
            success: false,
            error: message.into(),
            code,
        }
    }
}

/// `Json` whose rejections render as `validation_error`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::validation(rejection.body_text())),
        }
    }
}

// Auth

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub referral_code: String,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    #[serde(rename = "userId")]
    pub user_id: UserId,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionUser {
    pub id: UserId,
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: String,
    pub user: SessionUser,
}

// Requests

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateRequestPayload {
    pub operator_name: String,
    pub character_name: String,
    pub series_source: String,
    pub sourcing_vibe: Vec<String>,
    pub contact_method: String,
    pub contact_handle: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    #[serde(default)]
    pub status: String,
    pub reason: Option<String>,
    pub expected_version: Option<i32>,
}

// Admin

#[derive(Debug, Deserialize)]
pub struct CreateReferralRequest {
    #[serde(default)]
    pub code: String,
    pub description: Option<String>,
    pub usage_limit: Option<i64>,
    pub expiration_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub id: i32,
    pub deleted: bool,
}

// Feedback

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct FeedbackReceipt {
    pub id: i32,
}

// System

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub version: &'static str,
    pub uptime_secs: u64,
}
