use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use std::sync::Arc;

use super::types::{FeedbackReceipt, FeedbackRequest};
use super::{ApiError, ApiJson, AppState};
use crate::db::Feedback;
use crate::services::FeedbackError;

impl From<FeedbackError> for ApiError {
    fn from(err: FeedbackError) -> Self {
        match err {
            FeedbackError::Validation(msg) => Self::validation(msg),
            FeedbackError::Database(msg) => Self::DatabaseError(msg),
        }
    }
}

/// POST /feedback
pub async fn submit_feedback(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<FeedbackRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let feedback = state.feedback().submit(&payload.message).await?;
    Ok((StatusCode::CREATED, Json(FeedbackReceipt { id: feedback.id })))
}

/// GET /admin/feedback
pub async fn list_feedback(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Feedback>>, ApiError> {
    Ok(Json(state.feedback().list().await?))
}
