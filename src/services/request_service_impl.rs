//! `SeaORM` implementation of the `RequestService` trait.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

use crate::db::{NewRequest, RequestInsert, StatusWrite, StatusWriteOutcome, Store};
use crate::domain::{Identity, RequestId, RequestStatus, Role, TransitionPolicy};
use crate::services::access_key::KeyGenerator;
use crate::services::auth_service::authorize;
use crate::services::request_service::{
    PublicRequestView, RequestError, RequestReceipt, RequestService, RequestSubmission,
    RequestView, StatusChange, StatusChangeResult, StatusEventView,
};

const MAX_REASON_LENGTH: usize = 1000;

pub struct SeaOrmRequestService {
    store: Store,
    keys: Arc<dyn KeyGenerator>,
    max_key_attempts: u32,
    policy: TransitionPolicy,
}

impl SeaOrmRequestService {
    #[must_use]
    pub fn new(
        store: Store,
        keys: Arc<dyn KeyGenerator>,
        max_key_attempts: u32,
        policy: TransitionPolicy,
    ) -> Self {
        Self {
            store,
            keys,
            max_key_attempts,
            policy,
        }
    }

    fn require_admin(actor: &Identity) -> Result<(), RequestError> {
        authorize(actor, Role::Admin).map_err(|_| RequestError::Forbidden)
    }
}

/// Trimmed reason, required and non-empty when rejecting.
fn normalize_reason(
    status: RequestStatus,
    reason: Option<&str>,
) -> Result<Option<String>, RequestError> {
    let reason = reason.map(str::trim).filter(|r| !r.is_empty());

    if status == RequestStatus::Rejected && reason.is_none() {
        return Err(RequestError::InvalidReason);
    }

    if reason.is_some_and(|r| r.chars().count() > MAX_REASON_LENGTH) {
        return Err(RequestError::Validation(format!(
            "Reason must be {MAX_REASON_LENGTH} characters or less"
        )));
    }

    Ok(reason.map(str::to_string))
}

#[async_trait]
impl RequestService for SeaOrmRequestService {
    async fn submit(
        &self,
        owner: &Identity,
        submission: RequestSubmission,
    ) -> Result<RequestReceipt, RequestError> {
        let mut request = NewRequest {
            access_key: String::new(),
            owner_id: Some(owner.user_id),
            operator_name: submission.operator_name,
            character_name: submission.character_name,
            series_source: submission.series_source,
            sourcing_vibe: submission.sourcing_vibe,
            contact_method: submission.contact_method,
            contact_handle: submission.contact_handle,
            notes: submission.notes,
            created_at: Utc::now(),
        };

        for attempt in 1..=self.max_key_attempts {
            request.access_key = self.keys.generate();

            match self.store.insert_request(&request).await? {
                RequestInsert::Inserted(record) => {
                    info!(
                        event = "request_submitted",
                        request_id = %record.id,
                        owner = %owner.username,
                        "Commission request submitted"
                    );
                    metrics::counter!("commission_requests_submitted_total").increment(1);
                    return Ok(RequestReceipt {
                        id: record.id,
                        access_key: record.access_key,
                    });
                }
                RequestInsert::KeyCollision => {
                    debug!(attempt, "Access key collision, regenerating");
                    metrics::counter!("access_key_collisions_total").increment(1);
                }
            }
        }

        Err(RequestError::KeyExhausted(self.max_key_attempts))
    }

    async fn list_mine(&self, owner: &Identity) -> Result<Vec<RequestView>, RequestError> {
        let records = self.store.list_requests_by_owner(owner.user_id).await?;
        Ok(records.into_iter().map(RequestView::from).collect())
    }

    async fn list_all(&self, actor: &Identity) -> Result<Vec<RequestView>, RequestError> {
        Self::require_admin(actor)?;
        let records = self.store.list_all_requests().await?;
        Ok(records.into_iter().map(RequestView::from).collect())
    }

    async fn resolve_by_key(&self, access_key: &str) -> Result<PublicRequestView, RequestError> {
        self.store
            .get_request_by_key(access_key)
            .await?
            .map(PublicRequestView::from)
            .ok_or(RequestError::NotFound)
    }

    async fn set_status(
        &self,
        actor: &Identity,
        id: RequestId,
        change: StatusChange,
    ) -> Result<StatusChangeResult, RequestError> {
        Self::require_admin(actor)?;
        let reason = normalize_reason(change.status, change.reason.as_deref())?;

        let outcome = self
            .store
            .write_request_status(
                StatusWrite {
                    id,
                    status: change.status,
                    reason: reason.as_deref(),
                    expected_version: change.expected_version,
                    policy: self.policy,
                    at: Utc::now(),
                },
                actor,
            )
            .await?;

        match outcome {
            StatusWriteOutcome::Written { previous, record } => {
                let changed = previous != record.status;
                info!(
                    event = "request_status_changed",
                    request_id = %id,
                    from = %previous,
                    to = %record.status,
                    actor = %actor.username,
                    changed,
                    "Request status updated"
                );
                Ok(StatusChangeResult {
                    changed,
                    previous_status: previous,
                    status: record.status,
                    rejection_reason: record.rejection_reason,
                    version: record.version,
                    updated_at: record.updated_at,
                })
            }
            StatusWriteOutcome::NotFound => Err(RequestError::NotFound),
            StatusWriteOutcome::StaleVersion { current } => {
                Err(RequestError::StaleVersion { current })
            }
            StatusWriteOutcome::Disallowed { from } => Err(RequestError::InvalidTransition {
                from,
                to: change.status,
            }),
        }
    }

    async fn history(
        &self,
        actor: &Identity,
        id: RequestId,
    ) -> Result<Vec<StatusEventView>, RequestError> {
        Self::require_admin(actor)?;
        if self.store.get_request(id).await?.is_none() {
            return Err(RequestError::NotFound);
        }
        let events = self.store.list_status_events(id).await?;
        Ok(events.into_iter().map(StatusEventView::from).collect())
    }
}
