use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use std::collections::HashMap;

use crate::db::{format_timestamp, is_unique_violation, parse_timestamp};
use crate::domain::{ReferralId, ReferralRule};
use crate::entities::{referral_codes, users};

#[derive(Debug, Clone)]
pub struct ReferralCode {
    pub id: ReferralId,
    pub code: String,
    pub description: Option<String>,
    pub usage_limit: Option<u64>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub created_by: String,
    pub created_at: String,
}

impl ReferralCode {
    #[must_use]
    pub const fn rule(&self) -> ReferralRule {
        ReferralRule {
            usage_limit: self.usage_limit,
            expires_at: self.expiration_date,
        }
    }
}

impl TryFrom<referral_codes::Model> for ReferralCode {
    type Error = anyhow::Error;

    fn try_from(model: referral_codes::Model) -> Result<Self> {
        let expiration_date = model
            .expiration_date
            .as_deref()
            .map(parse_timestamp)
            .transpose()?;

        Ok(Self {
            id: ReferralId::new(model.id),
            code: model.code,
            description: model.description,
            // A non-positive stored limit admits nobody.
            usage_limit: model.usage_limit.map(|l| u64::try_from(l).unwrap_or(0)),
            expiration_date,
            created_by: model.created_by,
            created_at: model.created_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewReferral<'a> {
    pub code: &'a str,
    pub description: Option<&'a str>,
    pub usage_limit: Option<u64>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub created_by: &'a str,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub enum ReferralInsert {
    Inserted(ReferralCode),
    DuplicateCode,
}

pub struct ReferralRepository {
    conn: DatabaseConnection,
}

impl ReferralRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Admission rule for an exact code string, on any connection or transaction.
    pub async fn find_rule<C: ConnectionTrait>(db: &C, code: &str) -> Result<Option<ReferralRule>> {
        let model = referral_codes::Entity::find()
            .filter(referral_codes::Column::Code.eq(code))
            .one(db)
            .await
            .context("Failed to query referral code")?;

        Ok(model
            .map(ReferralCode::try_from)
            .transpose()?
            .map(|c| c.rule()))
    }

    /// Number of accounts created with `code`.
    pub async fn count_usage<C: ConnectionTrait>(db: &C, code: &str) -> Result<u64> {
        users::Entity::find()
            .filter(users::Column::ReferralCodeUsed.eq(code))
            .count(db)
            .await
            .context("Failed to count referral usage")
    }

    pub async fn get_by_code(&self, code: &str) -> Result<Option<ReferralCode>> {
        referral_codes::Entity::find()
            .filter(referral_codes::Column::Code.eq(code))
            .one(&self.conn)
            .await
            .context("Failed to query referral code")?
            .map(ReferralCode::try_from)
            .transpose()
    }

    pub async fn usage_count(&self, code: &str) -> Result<u64> {
        Self::count_usage(&self.conn, code).await
    }

    pub async fn create(&self, referral: NewReferral<'_>) -> Result<ReferralInsert> {
        let usage_limit = referral
            .usage_limit
            .map(i64::try_from)
            .transpose()
            .context("Usage limit out of range")?;

        let active = referral_codes::ActiveModel {
            code: Set(referral.code.to_string()),
            description: Set(referral.description.map(str::to_string)),
            usage_limit: Set(usage_limit),
            expiration_date: Set(referral.expiration_date.map(format_timestamp)),
            created_by: Set(referral.created_by.to_string()),
            created_at: Set(format_timestamp(referral.created_at)),
            ..Default::default()
        };

        match active.insert(&self.conn).await {
            Ok(model) => Ok(ReferralInsert::Inserted(ReferralCode::try_from(model)?)),
            Err(e) if is_unique_violation(&e, "code") => Ok(ReferralInsert::DuplicateCode),
            Err(e) => Err(anyhow::Error::new(e).context("Failed to insert referral code")),
        }
    }

    /// All codes, newest first, each with its derived usage count.
    pub async fn list_with_usage(&self) -> Result<Vec<(ReferralCode, u64)>> {
        let codes = referral_codes::Entity::find()
            .order_by_desc(referral_codes::Column::CreatedAt)
            .order_by_desc(referral_codes::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list referral codes")?;

        let usage: HashMap<String, i64> = users::Entity::find()
            .select_only()
            .column(users::Column::ReferralCodeUsed)
            .column_as(users::Column::Id.count(), "usage")
            .filter(users::Column::ReferralCodeUsed.is_not_null())
            .group_by(users::Column::ReferralCodeUsed)
            .into_tuple::<(String, i64)>()
            .all(&self.conn)
            .await
            .context("Failed to aggregate referral usage")?
            .into_iter()
            .collect();

        codes
            .into_iter()
            .map(|model| {
                let count = usage.get(&model.code).copied().unwrap_or(0);
                let count = u64::try_from(count).unwrap_or(0);
                Ok((ReferralCode::try_from(model)?, count))
            })
            .collect()
    }

    /// Returns whether a row was deleted. Accounts that used the code are untouched.
    pub async fn delete(&self, id: ReferralId) -> Result<bool> {
        let result = referral_codes::Entity::delete_by_id(id.value())
            .exec(&self.conn)
            .await
            .context("Failed to delete referral code")?;

        Ok(result.rows_affected > 0)
    }

    pub async fn count(&self) -> Result<u64> {
        referral_codes::Entity::find()
            .count(&self.conn)
            .await
            .context("Failed to count referral codes")
    }
}
