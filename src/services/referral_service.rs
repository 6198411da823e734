//! Domain service for referral codes.
//!
//! Admits or refuses signups against a code and lets admins manage codes.

use serde::Serialize;
use thiserror::Error;

use crate::db::ReferralCode;
use crate::domain::{ReferralDenial, ReferralId};

#[derive(Debug, Error)]
pub enum ReferralError {
    #[error("{0}")]
    Denied(ReferralDenial),

    #[error("Referral code already exists")]
    DuplicateCode,

    #[error("Referral code not found")]
    NotFound,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for ReferralError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for ReferralError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Admin input for a new code. `expiration_date` is RFC 3339.
#[derive(Debug, Clone, Default)]
pub struct CreateReferral {
    pub code: String,
    pub description: Option<String>,
    pub usage_limit: Option<i64>,
    pub expiration_date: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReferralSummary {
    pub id: ReferralId,
    pub code: String,
    pub description: Option<String>,
    pub usage_limit: Option<u64>,
    pub expiration_date: Option<String>,
    pub created_by: String,
    pub created_at: String,
    pub usage_count: u64,
}

impl ReferralSummary {
    #[must_use]
    pub fn new(code: ReferralCode, usage_count: u64) -> Self {
        Self {
            id: code.id,
            code: code.code,
            description: code.description,
            usage_limit: code.usage_limit,
            expiration_date: code.expiration_date.map(crate::db::format_timestamp),
            created_by: code.created_by,
            created_at: code.created_at,
            usage_count,
        }
    }
}

#[async_trait::async_trait]
pub trait ReferralService: Send + Sync {
    /// Read-only admission check for `code` at the current time.
    ///
    /// # Errors
    ///
    /// Returns [`ReferralError::Denied`] when the code is unknown, expired
    /// or used up.
    async fn admit(&self, code: &str) -> Result<(), ReferralError>;

    /// # Errors
    ///
    /// Returns [`ReferralError::DuplicateCode`] if the code string is taken.
    async fn create(
        &self,
        input: CreateReferral,
        created_by: &str,
    ) -> Result<ReferralSummary, ReferralError>;

    /// All codes with their usage counts, newest first.
    async fn list(&self) -> Result<Vec<ReferralSummary>, ReferralError>;

    /// Existing accounts that used the code keep it on their record.
    async fn delete(&self, id: ReferralId) -> Result<(), ReferralError>;
}
