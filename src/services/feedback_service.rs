//! Domain service for beta feedback messages.

use thiserror::Error;

use crate::db::Feedback;

#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sea_orm::DbErr> for FeedbackError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for FeedbackError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

#[async_trait::async_trait]
pub trait FeedbackService: Send + Sync {
    /// Stores an anonymous message.
    ///
    /// # Errors
    ///
    /// Returns [`FeedbackError::Validation`] for empty or oversized messages.
    async fn submit(&self, message: &str) -> Result<Feedback, FeedbackError>;

    /// Newest first
    async fn list(&self) -> Result<Vec<Feedback>, FeedbackError>;
}
