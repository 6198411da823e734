use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use std::sync::Arc;

use super::types::CreateRequestPayload;
use super::{ApiError, ApiJson, AppState, validation};
use crate::domain::Identity;
use crate::services::{RequestError, RequestView};

impl From<RequestError> for ApiError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::Validation(msg) => Self::validation(msg),
            RequestError::InvalidReason => {
                Self::InvalidReason("A non-empty reason is required to reject a request".into())
            }
            RequestError::NotFound => Self::NotFound("Request not found".to_string()),
            RequestError::Forbidden => Self::Forbidden,
            err @ RequestError::InvalidTransition { .. } => Self::InvalidTransition(err.to_string()),
            err @ RequestError::StaleVersion { .. } => Self::StaleVersion(err.to_string()),
            err @ RequestError::KeyExhausted(_) => {
                tracing::error!("{err}");
                Self::Conflict("Could not allocate an access key, please retry".to_string())
            }
            RequestError::Database(msg) => Self::DatabaseError(msg),
            RequestError::Internal(msg) => Self::internal(msg),
        }
    }
}

/// POST /requests
pub async fn submit_request(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    ApiJson(payload): ApiJson<CreateRequestPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let submission = validation::validate_submission(payload)?;
    let receipt = state.requests().submit(&identity, submission).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// GET /requests/mine
pub async fn list_my_requests(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<RequestView>>, ApiError> {
    Ok(Json(state.requests().list_mine(&identity).await?))
}
