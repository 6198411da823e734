//! Domain service for health checks and aggregate statistics.

use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SystemError {
    #[error("Database error: {0}")]
    Database(String),
}

impl From<sea_orm::DbErr> for SystemError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for SystemError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeskStats {
    pub requests: u64,
    pub users: u64,
    pub referral_codes: u64,
    /// Every status is present, zero when unused.
    pub requests_by_status: BTreeMap<String, u64>,
}

#[async_trait::async_trait]
pub trait SystemService: Send + Sync {
    /// True when the database answers a trivial query.
    async fn database_ready(&self) -> bool;

    /// Totals for the admin dashboard.
    async fn stats(&self) -> Result<DeskStats, SystemError>;
}
