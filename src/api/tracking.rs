use axum::{
    Json,
    extract::{Path, State},
};
use std::sync::Arc;

use super::{ApiError, AppState};
use crate::services::{PublicRequestView, RequestError};

const MAX_KEY_LENGTH: usize = 128;

/// GET /tracking/{access_key}
///
/// Unauthenticated. Only the masked view is ever returned here.
pub async fn track_request(
    State(state): State<Arc<AppState>>,
    Path(access_key): Path<String>,
) -> Result<Json<PublicRequestView>, ApiError> {
    if access_key.is_empty()
        || access_key.len() > MAX_KEY_LENGTH
        || !access_key.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return Err(ApiError::NotFound("Request not found".to_string()));
    }

    match state.requests().resolve_by_key(&access_key).await {
        Ok(view) => Ok(Json(view)),
        Err(RequestError::NotFound) => Err(ApiError::NotFound("Request not found".to_string())),
        Err(e) => Err(e.into()),
    }
}
