use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::collections::HashMap;

use crate::db::{format_timestamp, is_unique_violation};
use crate::domain::{Identity, RequestId, RequestStatus, TransitionPolicy, UserId};
use crate::entities::{request_status_events, requests};

/// A stored request with its columns decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
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

impl TryFrom<requests::Model> for RequestRecord {
    type Error = anyhow::Error;

    fn try_from(model: requests::Model) -> Result<Self> {
        let status = model
            .status
            .parse()
            .with_context(|| format!("Request {} has invalid status", model.id))?;
        let sourcing_vibe = serde_json::from_str(&model.sourcing_vibe)
            .with_context(|| format!("Request {} has malformed sourcing_vibe", model.id))?;

        Ok(Self {
            id: RequestId::new(model.id),
            access_key: model.access_key,
            owner_id: model.owner_id.map(UserId::new),
            operator_name: model.operator_name,
            character_name: model.character_name,
            series_source: model.series_source,
            sourcing_vibe,
            contact_method: model.contact_method,
            contact_handle: model.contact_handle,
            notes: model.notes,
            status,
            rejection_reason: model.rejection_reason,
            version: model.version,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

/// Validated submission ready for insertion.
#[derive(Debug, Clone)]
pub struct NewRequest {
    pub access_key: String,
    pub owner_id: Option<UserId>,
    pub operator_name: String,
    pub character_name: String,
    pub series_source: String,
    pub sourcing_vibe: Vec<String>,
    pub contact_method: String,
    pub contact_handle: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub enum RequestInsert {
    Inserted(RequestRecord),
    KeyCollision,
}

#[derive(Debug, Clone)]
pub struct StatusWrite<'a> {
    pub id: RequestId,
    pub status: RequestStatus,
    pub reason: Option<&'a str>,
    pub expected_version: Option<i32>,
    pub policy: TransitionPolicy,
    pub at: DateTime<Utc>,
}

#[derive(Debug)]
pub enum StatusWriteOutcome {
    Written {
        previous: RequestStatus,
        record: RequestRecord,
    },
    NotFound,
    StaleVersion {
        current: i32,
    },
    Disallowed {
        from: RequestStatus,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEvent {
    pub from_status: RequestStatus,
    pub to_status: RequestStatus,
    pub reason: Option<String>,
    pub actor_username: String,
    pub created_at: String,
}

pub struct RequestRepository {
    conn: DatabaseConnection,
}

impl RequestRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Inserts a new `pending` request. A clash on `access_key` is reported
    /// as [`RequestInsert::KeyCollision`] so the caller can pick a new key.
    pub async fn insert(&self, request: &NewRequest) -> Result<RequestInsert> {
        let created_at = format_timestamp(request.created_at);
        let sourcing_vibe =
            serde_json::to_string(&request.sourcing_vibe).context("Failed to encode tags")?;

        let active = requests::ActiveModel {
            access_key: Set(request.access_key.clone()),
            owner_id: Set(request.owner_id.map(|id| id.value())),
            operator_name: Set(request.operator_name.clone()),
            character_name: Set(request.character_name.clone()),
            series_source: Set(request.series_source.clone()),
            sourcing_vibe: Set(sourcing_vibe),
            contact_method: Set(request.contact_method.clone()),
            contact_handle: Set(request.contact_handle.clone()),
            notes: Set(request.notes.clone()),
            status: Set(RequestStatus::Pending.as_str().to_string()),
            rejection_reason: Set(None),
            version: Set(0),
            created_at: Set(created_at.clone()),
            updated_at: Set(created_at),
            ..Default::default()
        };

        match active.insert(&self.conn).await {
            Ok(model) => Ok(RequestInsert::Inserted(RequestRecord::try_from(model)?)),
            Err(e) if is_unique_violation(&e, "access_key") => Ok(RequestInsert::KeyCollision),
            Err(e) => Err(anyhow::Error::new(e).context("Failed to insert request")),
        }
    }

    pub async fn get(&self, id: RequestId) -> Result<Option<RequestRecord>> {
        requests::Entity::find_by_id(id.value())
            .one(&self.conn)
            .await
            .context("Failed to query request")?
            .map(RequestRecord::try_from)
            .transpose()
    }

    pub async fn get_by_access_key(&self, access_key: &str) -> Result<Option<RequestRecord>> {
        requests::Entity::find()
            .filter(requests::Column::AccessKey.eq(access_key))
            .one(&self.conn)
            .await
            .context("Failed to query request by access key")?
            .map(RequestRecord::try_from)
            .transpose()
    }

    pub async fn list_by_owner(&self, owner: UserId) -> Result<Vec<RequestRecord>> {
        let rows = requests::Entity::find()
            .filter(requests::Column::OwnerId.eq(owner.value()))
            .order_by_desc(requests::Column::CreatedAt)
            .order_by_desc(requests::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list requests by owner")?;

        rows.into_iter().map(RequestRecord::try_from).collect()
    }

    pub async fn list_all(&self) -> Result<Vec<RequestRecord>> {
        let rows = requests::Entity::find()
            .order_by_desc(requests::Column::CreatedAt)
            .order_by_desc(requests::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list requests")?;

        rows.into_iter().map(RequestRecord::try_from).collect()
    }

    /// Applies a status change and appends its audit event in one transaction.
    ///
    /// The first statement is a conditional version bump, so the
    /// transaction takes the write lock before it reads anything and
    /// concurrent writers queue instead of failing to upgrade a read lock.
    pub async fn write_status(
        &self,
        write: StatusWrite<'_>,
        actor: &Identity,
    ) -> Result<StatusWriteOutcome> {
        let txn = self.conn.begin().await?;
        let at = format_timestamp(write.at);

        let mut claim = requests::Entity::update_many()
            .col_expr(
                requests::Column::Version,
                Expr::col(requests::Column::Version).add(1),
            )
            .col_expr(requests::Column::UpdatedAt, Expr::value(at.clone()))
            .filter(requests::Column::Id.eq(write.id.value()));
        if let Some(expected) = write.expected_version {
            claim = claim.filter(requests::Column::Version.eq(expected));
        }
        let claimed = claim
            .exec(&txn)
            .await
            .context("Failed to update request status")?;

        if claimed.rows_affected == 0 {
            let existing = requests::Entity::find_by_id(write.id.value())
                .one(&txn)
                .await
                .context("Failed to load request for status update")?;
            txn.rollback().await?;
            return Ok(match existing {
                None => StatusWriteOutcome::NotFound,
                Some(model) => StatusWriteOutcome::StaleVersion {
                    current: model.version,
                },
            });
        }

        let Some(model) = requests::Entity::find_by_id(write.id.value())
            .one(&txn)
            .await
            .context("Failed to load request for status update")?
        else {
            txn.rollback().await?;
            return Ok(StatusWriteOutcome::NotFound);
        };

        let previous: RequestStatus = model
            .status
            .parse()
            .with_context(|| format!("Request {} has invalid status", model.id))?;

        if !write.policy.allows(previous, write.status) {
            txn.rollback().await?;
            return Ok(StatusWriteOutcome::Disallowed { from: previous });
        }

        let rejection_reason = (write.status == RequestStatus::Rejected)
            .then(|| write.reason.map(str::to_string))
            .flatten();

        let mut active = model.into_active_model();
        active.status = Set(write.status.as_str().to_string());
        active.rejection_reason = Set(rejection_reason);
        let updated = active
            .update(&txn)
            .await
            .context("Failed to update request status")?;

        request_status_events::ActiveModel {
            request_id: Set(write.id.value()),
            from_status: Set(previous.as_str().to_string()),
            to_status: Set(write.status.as_str().to_string()),
            reason: Set(write.reason.map(str::to_string)),
            actor_username: Set(actor.username.clone()),
            created_at: Set(at),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to record status event")?;

        txn.commit().await?;

        Ok(StatusWriteOutcome::Written {
            previous,
            record: RequestRecord::try_from(updated)?,
        })
    }

    /// Oldest first
    pub async fn list_status_events(&self, id: RequestId) -> Result<Vec<StatusEvent>> {
        let rows = request_status_events::Entity::find()
            .filter(request_status_events::Column::RequestId.eq(id.value()))
            .order_by_asc(request_status_events::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list status events")?;

        rows.into_iter()
            .map(|row| {
                Ok(StatusEvent {
                    from_status: row.from_status.parse()?,
                    to_status: row.to_status.parse()?,
                    reason: row.reason,
                    actor_username: row.actor_username,
                    created_at: row.created_at,
                })
            })
            .collect()
    }

    pub async fn count(&self) -> Result<u64> {
        requests::Entity::find()
            .count(&self.conn)
            .await
            .context("Failed to count requests")
    }

    pub async fn count_by_status(&self) -> Result<HashMap<RequestStatus, u64>> {
        let rows: Vec<(String, i64)> = requests::Entity::find()
            .select_only()
            .column(requests::Column::Status)
            .column_as(requests::Column::Id.count(), "total")
            .group_by(requests::Column::Status)
            .into_tuple()
            .all(&self.conn)
            .await
            .context("Failed to count requests by status")?;

        let mut counts: HashMap<RequestStatus, u64> =
            RequestStatus::ALL.into_iter().map(|s| (s, 0)).collect();
        for (status, total) in rows {
            let status: RequestStatus = status.parse()?;
            counts.insert(status, u64::try_from(total).unwrap_or(0));
        }
        Ok(counts)
    }
}
