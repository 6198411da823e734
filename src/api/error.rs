use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use super::ErrorResponse;

#[derive(Debug)]
pub enum ApiError {
    ValidationError(String),

    InvalidReason(String),

    Unauthorized,

    InvalidCredentials,

    Forbidden,

    InvalidReferral(String),

    NotFound(String),

    DuplicateUsername,

    DuplicateCode,

    InvalidTransition(String),

    StaleVersion(String),

    Conflict(String),

    DatabaseError(String),

    InternalError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationError(msg) => write!(f, "Validation error: {msg}"),
            Self::InvalidReason(msg) => write!(f, "Invalid reason: {msg}"),
            Self::Unauthorized => write!(f, "Unauthorized"),
            Self::InvalidCredentials => write!(f, "Invalid credentials"),
            Self::Forbidden => write!(f, "Forbidden"),
            Self::InvalidReferral(msg) => write!(f, "Invalid referral: {msg}"),
            Self::NotFound(msg) => write!(f, "Not found: {msg}"),
            Self::DuplicateUsername => write!(f, "Duplicate username"),
            Self::DuplicateCode => write!(f, "Duplicate referral code"),
            Self::InvalidTransition(msg) => write!(f, "Invalid transition: {msg}"),
            Self::StaleVersion(msg) => write!(f, "Stale version: {msg}"),
            Self::Conflict(msg) => write!(f, "Conflict: {msg}"),
            Self::DatabaseError(msg) => write!(f, "Database error: {msg}"),
            Self::InternalError(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    /// Stable machine-readable kind sent as `code`.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ValidationError(_) => "validation_error",
            Self::InvalidReason(_) => "invalid_reason",
            Self::Unauthorized => "unauthorized",
            Self::InvalidCredentials => "invalid_credentials",
            Self::Forbidden => "forbidden",
            Self::InvalidReferral(_) => "invalid_referral",
            Self::NotFound(_) => "not_found",
            Self::DuplicateUsername => "duplicate_username",
            Self::DuplicateCode => "duplicate_code",
            Self::InvalidTransition(_) => "invalid_transition",
            Self::StaleVersion(_) => "stale_version",
            Self::Conflict(_) => "conflict",
            Self::DatabaseError(_) => "database_error",
            Self::InternalError(_) => "internal_error",
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) | Self::InvalidReason(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden | Self::InvalidReferral(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::DuplicateUsername
            | Self::DuplicateCode
            | Self::InvalidTransition(_)
            | Self::StaleVersion(_)
            | Self::Conflict(_) => StatusCode::CONFLICT,
            Self::DatabaseError(_) | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    pub fn not_found(resource: &str, id: impl fmt::Display) -> Self {
        Self::NotFound(format!("{resource} {id} not found"))
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::ValidationError(msg)
            | Self::InvalidReason(msg)
            | Self::InvalidReferral(msg)
            | Self::NotFound(msg)
            | Self::InvalidTransition(msg)
            | Self::StaleVersion(msg)
            | Self::Conflict(msg) => msg.clone(),
            Self::Unauthorized => "Authentication required".to_string(),
            Self::InvalidCredentials => "Invalid username or password".to_string(),
            Self::Forbidden => "Forbidden".to_string(),
            Self::DuplicateUsername => "Username is already taken".to_string(),
            Self::DuplicateCode => "Referral code already exists".to_string(),
            Self::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                "A database error occurred".to_string()
            }
            Self::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }
        };

        let body = ErrorResponse::new(message, self.code());
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_statuses() {
        let cases = [
            (ApiError::validation("x"), 400, "validation_error"),
            (ApiError::InvalidReason("x".into()), 400, "invalid_reason"),
            (ApiError::Unauthorized, 401, "unauthorized"),
            (ApiError::InvalidCredentials, 401, "invalid_credentials"),
            (ApiError::Forbidden, 403, "forbidden"),
            (ApiError::InvalidReferral("x".into()), 403, "invalid_referral"),
            (ApiError::not_found("Request", 1), 404, "not_found"),
            (ApiError::DuplicateUsername, 409, "duplicate_username"),
            (ApiError::DuplicateCode, 409, "duplicate_code"),
            (ApiError::StaleVersion("x".into()), 409, "stale_version"),
            (ApiError::internal("boom"), 500, "internal_error"),
        ];

        for (err, status, code) in cases {
            assert_eq!(err.status().as_u16(), status, "{err}");
            assert_eq!(err.code(), code);
        }
    }

    #[test]
    fn internal_details_are_not_returned() {
        let response = ApiError::DatabaseError("UNIQUE constraint failed".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
