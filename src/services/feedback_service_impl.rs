//! `SeaORM` implementation of the `FeedbackService` trait.

use async_trait::async_trait;
use tracing::info;

use crate::db::{Feedback, Store};
use crate::services::feedback_service::{FeedbackError, FeedbackService};

const MAX_MESSAGE_LENGTH: usize = 2000;

pub struct SeaOrmFeedbackService {
    store: Store,
}

impl SeaOrmFeedbackService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl FeedbackService for SeaOrmFeedbackService {
    async fn submit(&self, message: &str) -> Result<Feedback, FeedbackError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(FeedbackError::Validation(
                "Message cannot be empty".to_string(),
            ));
        }
        if message.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(FeedbackError::Validation(format!(
                "Message must be {MAX_MESSAGE_LENGTH} characters or less"
            )));
        }

        let feedback = self.store.insert_feedback(message).await?;
        info!(event = "feedback_received", feedback_id = feedback.id, "Feedback received");
        Ok(feedback)
    }

    async fn list(&self) -> Result<Vec<Feedback>, FeedbackError> {
        Ok(self.store.list_feedback().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn submit_trims_and_lists_newest_first() {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let service = SeaOrmFeedbackService::new(store);

        service.submit("first").await.unwrap();
        let second = service.submit("  second  ").await.unwrap();
        assert_eq!(second.message, "second");

        let all = service.list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].message, "second");

        assert!(matches!(
            service.submit("   ").await,
            Err(FeedbackError::Validation(_))
        ));
        assert!(matches!(
            service.submit(&"x".repeat(2001)).await,
            Err(FeedbackError::Validation(_))
        ));
    }
}
