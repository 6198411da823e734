//! Domain service for commission requests.
//!
//! Covers submission with access-key generation, the owner, admin and
//! public views, and admin status changes through the workflow.

use serde::Serialize;
use thiserror::Error;

use crate::db::{RequestRecord, StatusEvent};
use crate::domain::{Identity, RequestId, RequestStatus, UserId};

/// Errors specific to request operations.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("A reason is required when rejecting a request")]
    InvalidReason,

    #[error("Request not found")]
    NotFound,

    #[error("Forbidden")]
    Forbidden,

    #[error("Cannot move a request from {from} to {to}")]
    InvalidTransition {
        from: RequestStatus,
        to: RequestStatus,
    },

    #[error("Request was modified concurrently (current version {current})")]
    StaleVersion { current: i32 },

    #[error("Could not allocate a unique access key after {0} attempts")]
    KeyExhausted(u32),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for RequestError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for RequestError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// A submission that already passed input validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSubmission {
    pub operator_name: String,
    pub character_name: String,
    pub series_source: String,
    pub sourcing_vibe: Vec<String>,
    pub contact_method: String,
    pub contact_handle: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestReceipt {
    pub id: RequestId,
    pub access_key: String,
}

/// Full request detail for its owner and for admins.
#[derive(Debug, Clone, Serialize)]
pub struct RequestView {
    pub id: RequestId,
    pub access_key: String,
    pub owner_id: Option<UserId>,
    pub operator_name: String,
    pub character_name: String,
    pub series_source: String,
    pub sourcing_vibe: Vec<String>,
    pub contact_method: String,
    pub contact_handle: String,
    pub notes: Option<String>,
    pub status: RequestStatus,
    pub rejection_reason: Option<String>,
    pub version: i32,
    pub created_at: String,
    pub updated_at: String,
}

impl From<RequestRecord> for RequestView {
    fn from(record: RequestRecord) -> Self {
        Self {
            id: record.id,
            access_key: record.access_key,
            owner_id: record.owner_id,
            operator_name: record.operator_name,
            character_name: record.character_name,
            series_source: record.series_source,
            sourcing_vibe: record.sourcing_vibe,
            contact_method: record.contact_method,
            contact_handle: record.contact_handle,
            notes: record.notes,
            status: record.status,
            rejection_reason: record.rejection_reason,
            version: record.version,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// What anyone holding the access key may see.
///
/// Owner, contact details, notes and the internal id are left out.
#[derive(Debug, Clone, Serialize)]
pub struct PublicRequestView {
    pub operator_name: String,
    pub character_name: String,
    pub series_source: String,
    pub status: RequestStatus,
    pub rejection_reason: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<RequestRecord> for PublicRequestView {
    fn from(record: RequestRecord) -> Self {
        Self {
            operator_name: record.operator_name,
            character_name: record.character_name,
            series_source: record.series_source,
            status: record.status,
            rejection_reason: record.rejection_reason,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StatusChange {
    pub status: RequestStatus,
    pub reason: Option<String>,
    pub expected_version: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusChangeResult {
    /// Whether the stored status differs from the one before the write.
    pub changed: bool,
    pub previous_status: RequestStatus,
    pub status: RequestStatus,
    pub rejection_reason: Option<String>,
    pub version: i32,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusEventView {
    pub from_status: RequestStatus,
    pub to_status: RequestStatus,
    pub reason: Option<String>,
    pub actor: String,
    pub created_at: String,
}

impl From<StatusEvent> for StatusEventView {
    fn from(event: StatusEvent) -> Self {
        Self {
            from_status: event.from_status,
            to_status: event.to_status,
            reason: event.reason,
            actor: event.actor_username,
            created_at: event.created_at,
        }
    }
}

#[async_trait::async_trait]
pub trait RequestService: Send + Sync {
    /// Stores a new `pending` request owned by `owner` under a fresh access key.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::KeyExhausted`] only if every attempt collided.
    async fn submit(
        &self,
        owner: &Identity,
        submission: RequestSubmission,
    ) -> Result<RequestReceipt, RequestError>;

    /// Requests owned by `owner`, newest first.
    async fn list_mine(&self, owner: &Identity) -> Result<Vec<RequestView>, RequestError>;

    /// Every request, newest first. Admin only.
    async fn list_all(&self, actor: &Identity) -> Result<Vec<RequestView>, RequestError>;

    /// Masked view for anonymous tracking.
    async fn resolve_by_key(&self, access_key: &str) -> Result<PublicRequestView, RequestError>;

    /// Moves a request to a new status. Admin only.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::InvalidReason`] when rejecting without a
    /// reason, [`RequestError::StaleVersion`] when `expected_version` is
    /// stale and [`RequestError::InvalidTransition`] when the workflow
    /// policy refuses the move.
    async fn set_status(
        &self,
        actor: &Identity,
        id: RequestId,
        change: StatusChange,
    ) -> Result<StatusChangeResult, RequestError>;

    /// Audit trail of status changes, oldest first. Admin only.
    async fn history(
        &self,
        actor: &Identity,
        id: RequestId,
    ) -> Result<Vec<StatusEventView>, RequestError>;
}
