//! `SeaORM` implementation of the `ReferralService` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::db::{NewReferral, ReferralInsert, Store};
use crate::domain::{ReferralId, check_admission};
use crate::services::referral_service::{
    CreateReferral, ReferralError, ReferralService, ReferralSummary,
};

const MAX_CODE_LENGTH: usize = 64;
const MAX_DESCRIPTION_LENGTH: usize = 500;

pub struct SeaOrmReferralService {
    store: Store,
}

impl SeaOrmReferralService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

/// Normalized form of [`CreateReferral`].
#[derive(Debug, PartialEq, Eq)]
struct ValidReferral {
    code: String,
    description: Option<String>,
    usage_limit: Option<u64>,
    expiration_date: Option<DateTime<Utc>>,
}

fn validate_referral(input: CreateReferral) -> Result<ValidReferral, ReferralError> {
    let code = input.code.trim().to_string();
    if code.is_empty() {
        return Err(ReferralError::Validation("Code cannot be empty".to_string()));
    }
    if code.chars().count() > MAX_CODE_LENGTH {
        return Err(ReferralError::Validation(format!(
            "Code must be {MAX_CODE_LENGTH} characters or less"
        )));
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ReferralError::Validation(
            "Code can only contain letters, numbers, hyphens, and underscores".to_string(),
        ));
    }

    let description = input
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());
    if description
        .as_ref()
        .is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_LENGTH)
    {
        return Err(ReferralError::Validation(format!(
            "Description must be {MAX_DESCRIPTION_LENGTH} characters or less"
        )));
    }

    let usage_limit = match input.usage_limit {
        None => None,
        Some(limit) if limit >= 1 => Some(limit.unsigned_abs()),
        Some(_) => {
            return Err(ReferralError::Validation(
                "Usage limit must be a positive integer".to_string(),
            ));
        }
    };

    let expiration_date = input
        .expiration_date
        .as_deref()
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map(|raw| {
            DateTime::parse_from_rfc3339(raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|_| {
                    ReferralError::Validation(format!(
                        "Expiration date '{raw}' is not an RFC 3339 timestamp"
                    ))
                })
        })
        .transpose()?;

    Ok(ValidReferral {
        code,
        description,
        usage_limit,
        expiration_date,
    })
}

#[async_trait]
impl ReferralService for SeaOrmReferralService {
    async fn admit(&self, code: &str) -> Result<(), ReferralError> {
        let referral = self.store.get_referral_by_code(code).await?;
        let usage = match &referral {
            Some(r) if r.usage_limit.is_some() => self.store.count_referral_usage(code).await?,
            _ => 0,
        };

        check_admission(referral.map(|r| r.rule()).as_ref(), usage, Utc::now())
            .map_err(ReferralError::Denied)
    }

    async fn create(
        &self,
        input: CreateReferral,
        created_by: &str,
    ) -> Result<ReferralSummary, ReferralError> {
        let valid = validate_referral(input)?;

        let insert = self
            .store
            .create_referral(NewReferral {
                code: &valid.code,
                description: valid.description.as_deref(),
                usage_limit: valid.usage_limit,
                expiration_date: valid.expiration_date,
                created_by,
                created_at: Utc::now(),
            })
            .await?;

        match insert {
            ReferralInsert::Inserted(code) => {
                info!(
                    event = "referral_created",
                    code = %code.code,
                    usage_limit = ?code.usage_limit,
                    created_by = %created_by,
                    "Referral code created"
                );
                Ok(ReferralSummary::new(code, 0))
            }
            ReferralInsert::DuplicateCode => Err(ReferralError::DuplicateCode),
        }
    }

    async fn list(&self) -> Result<Vec<ReferralSummary>, ReferralError> {
        let codes = self.store.list_referrals().await?;
        Ok(codes
            .into_iter()
            .map(|(code, usage)| ReferralSummary::new(code, usage))
            .collect())
    }

    async fn delete(&self, id: ReferralId) -> Result<(), ReferralError> {
        if !self.store.delete_referral(id).await? {
            return Err(ReferralError::NotFound);
        }
        info!(event = "referral_deleted", referral_id = %id, "Referral code deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ReferralDenial;

    fn input(code: &str) -> CreateReferral {
        CreateReferral {
            code: code.to_string(),
            ..CreateReferral::default()
        }
    }

    #[test]
    fn validate_normalizes_fields() {
        let valid = validate_referral(CreateReferral {
            code: "  VIP-2026 ".to_string(),
            description: Some("   ".to_string()),
            usage_limit: Some(3),
            expiration_date: Some("2026-12-31T23:59:59+02:00".to_string()),
        })
        .unwrap();

        assert_eq!(valid.code, "VIP-2026");
        assert_eq!(valid.description, None);
        assert_eq!(valid.usage_limit, Some(3));
        assert_eq!(
            valid.expiration_date.unwrap().to_rfc3339(),
            "2026-12-31T21:59:59+00:00"
        );
    }

    #[test]
    fn validate_rejects_bad_input() {
        assert!(validate_referral(input("")).is_err());
        assert!(validate_referral(input("has space")).is_err());
        assert!(validate_referral(input(&"x".repeat(65))).is_err());
        assert!(
            validate_referral(CreateReferral {
                usage_limit: Some(0),
                ..input("VIP")
            })
            .is_err()
        );
        assert!(
            validate_referral(CreateReferral {
                expiration_date: Some("next tuesday".to_string()),
                ..input("VIP")
            })
            .is_err()
        );
    }

    #[tokio::test]
    async fn admit_and_manage_codes() {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let service = SeaOrmReferralService::new(store);

        assert!(matches!(
            service.admit("NOPE").await,
            Err(ReferralError::Denied(ReferralDenial::NotFound))
        ));

        let created = service
            .create(
                CreateReferral {
                    usage_limit: Some(2),
                    ..input("VIP")
                },
                "admin",
            )
            .await
            .unwrap();
        assert_eq!(created.usage_count, 0);
        service.admit("VIP").await.unwrap();

        assert!(matches!(
            service.create(input("VIP"), "admin").await,
            Err(ReferralError::DuplicateCode)
        ));

        service
            .create(
                CreateReferral {
                    expiration_date: Some("2001-01-01T00:00:00Z".to_string()),
                    ..input("OLD")
                },
                "admin",
            )
            .await
            .unwrap();
        assert!(matches!(
            service.admit("OLD").await,
            Err(ReferralError::Denied(ReferralDenial::Expired))
        ));

        let listed = service.list().await.unwrap();
        assert_eq!(listed.len(), 2);

        service.delete(created.id).await.unwrap();
        assert!(matches!(
            service.delete(created.id).await,
            Err(ReferralError::NotFound)
        ));
        assert!(matches!(
            service.admit("VIP").await,
            Err(ReferralError::Denied(ReferralDenial::NotFound))
        ));
    }
}
