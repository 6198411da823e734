//! Domain service for accounts and session authentication.
//!
//! Handles referral-gated signup, login, bearer token verification and
//! role checks.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::db::User;
use crate::domain::{Identity, ReferralDenial, Role, UserId};
use crate::services::token::TokenError;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Username is already taken")]
    DuplicateUsername,

    #[error("{0}")]
    InvalidReferral(ReferralDenial),

    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid bearer token")]
    InvalidToken,

    #[error("Bearer token has expired")]
    ExpiredToken,

    #[error("Forbidden")]
    Forbidden,

    #[error("User not found")]
    UserNotFound,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid => Self::InvalidToken,
            TokenError::Expired => Self::ExpiredToken,
            TokenError::Signing(msg) => Self::Internal(msg),
        }
    }
}

/// Public account view, never carrying the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    pub id: UserId,
    pub username: String,
    pub role: Role,
    pub referral_code_used: Option<String>,
    pub created_at: String,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
            referral_code_used: user.referral_code_used,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoginResult {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserInfo,
}

/// Role check used in front of every privileged operation.
///
/// # Errors
///
/// Returns [`AuthError::Forbidden`] unless `identity` holds `required`.
pub fn authorize(identity: &Identity, required: Role) -> Result<(), AuthError> {
    match (required, identity.role) {
        (Role::User, _) | (Role::Admin, Role::Admin) => Ok(()),
        (Role::Admin, Role::User) => Err(AuthError::Forbidden),
    }
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates a `user` account admitted by `referral_code`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidReferral`] when the code is refused, in
    /// which case no account is created, and [`AuthError::DuplicateUsername`]
    /// when the name is taken.
    async fn register(
        &self,
        username: &str,
        password: &str,
        referral_code: &str,
    ) -> Result<UserInfo, AuthError>;

    /// Verifies credentials and issues a session token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for an unknown user and for
    /// a wrong password alike.
    async fn login(&self, username: &str, password: &str) -> Result<LoginResult, AuthError>;

    /// Verifies a bearer token's signature and expiry.
    fn authenticate(&self, token: Option<&str>) -> Result<Identity, AuthError>;

    /// Current account for a verified identity.
    async fn me(&self, identity: &Identity) -> Result<UserInfo, AuthError>;

    /// Provisions an admin account outside the referral gate.
    async fn create_admin(&self, username: &str, password: &str) -> Result<UserInfo, AuthError>;

    /// Creates the configured bootstrap admin unless that username exists.
    async fn ensure_admin(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<UserInfo>, AuthError>;

    /// All accounts, newest first.
    async fn list_users(&self) -> Result<Vec<UserInfo>, AuthError>;
}
