//! `SeaORM` implementation of the `SystemService` trait.

use async_trait::async_trait;
use tracing::warn;

use crate::db::Store;
use crate::services::system_service::{DeskStats, SystemError, SystemService};

pub struct SeaOrmSystemService {
    store: Store,
}

impl SeaOrmSystemService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SystemService for SeaOrmSystemService {
    async fn database_ready(&self) -> bool {
        match self.store.ping().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Database readiness check failed");
                false
            }
        }
    }

    async fn stats(&self) -> Result<DeskStats, SystemError> {
        let requests_by_status = self
            .store
            .count_requests_by_status()
            .await?
            .into_iter()
            .map(|(status, count)| (status.as_str().to_string(), count))
            .collect();

        Ok(DeskStats {
            requests: self.store.count_requests().await?,
            users: self.store.count_users().await?,
            referral_codes: self.store.count_referrals().await?,
            requests_by_status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stats_on_empty_store() {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let service = SeaOrmSystemService::new(store);

        assert!(service.database_ready().await);
        let stats = service.stats().await.unwrap();
        assert_eq!(stats.requests, 0);
        assert_eq!(stats.users, 0);
        assert_eq!(stats.requests_by_status.len(), 8);
        assert_eq!(stats.requests_by_status["on_hold"], 0);
    }
}
