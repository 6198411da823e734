use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};
use serde::Serialize;

use crate::db::format_timestamp;
use crate::entities::beta_feedback;

#[derive(Debug, Clone, Serialize)]
pub struct Feedback {
    pub id: i32,
    pub message: String,
    pub created_at: String,
}

impl From<beta_feedback::Model> for Feedback {
    fn from(model: beta_feedback::Model) -> Self {
        Self {
            id: model.id,
            message: model.message,
            created_at: model.created_at,
        }
    }
}

pub struct FeedbackRepository {
    conn: DatabaseConnection,
}

impl FeedbackRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn insert(&self, message: &str) -> Result<Feedback> {
        let model = beta_feedback::ActiveModel {
            message: Set(message.to_string()),
            created_at: Set(format_timestamp(Utc::now())),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to store feedback")?;

        Ok(Feedback::from(model))
    }

    /// Newest first
    pub async fn list(&self) -> Result<Vec<Feedback>> {
        let rows = beta_feedback::Entity::find()
            .order_by_desc(beta_feedback::Column::CreatedAt)
            .order_by_desc(beta_feedback::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list feedback")?;

        Ok(rows.into_iter().map(Feedback::from).collect())
    }
}
