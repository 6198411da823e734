use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, SqlErr, Statement};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::domain::{Identity, ReferralId, RequestId, RequestStatus, UserId};

pub mod migrator;
pub mod repositories;

pub use repositories::feedback::Feedback;
pub use repositories::referral::{NewReferral, ReferralCode, ReferralInsert};
pub use repositories::request::{
    NewRequest, RequestInsert, RequestRecord, StatusEvent, StatusWrite, StatusWriteOutcome,
};
pub use repositories::user::{NewUser, SignupOutcome, User, UserInsert};

/// Formats an instant the way every timestamp column stores it.
///
/// Fixed microsecond precision and a `Z` suffix keep lexical order equal to
/// chronological order.
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .map_err(|e| anyhow::anyhow!("Invalid stored timestamp '{raw}': {e}"))?
        .with_timezone(&Utc))
}

/// True when `err` is a unique-constraint violation mentioning `column`.
pub(crate) fn is_unique_violation(err: &DbErr, column: &str) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(msg)) if msg.contains(column))
}

const IN_MEMORY_CONNECTION_LIFETIME: Duration = Duration::from_secs(60 * 60 * 24 * 365);

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let in_memory = db_url.contains(":memory:");
        if !in_memory {
            let path_str = db_url.trim_start_matches("sqlite://").trim_start_matches("sqlite:");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        // Each in-memory SQLite connection is its own database.
        let (max_connections, min_connections) = if in_memory {
            (1, 1)
        } else {
            (max_connections, min_connections)
        };

        // Recycling the only in-memory connection would drop the database.
        let (idle_timeout, max_lifetime) = if in_memory {
            (IN_MEMORY_CONNECTION_LIFETIME, IN_MEMORY_CONNECTION_LIFETIME)
        } else {
            (Duration::from_secs(300), Duration::from_secs(600))
        };

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(idle_timeout)
            .max_lifetime(max_lifetime)
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn referral_repo(&self) -> repositories::referral::ReferralRepository {
        repositories::referral::ReferralRepository::new(self.conn.clone())
    }

    fn request_repo(&self) -> repositories::request::RequestRepository {
        repositories::request::RequestRepository::new(self.conn.clone())
    }

    fn feedback_repo(&self) -> repositories::feedback::FeedbackRepository {
        repositories::feedback::FeedbackRepository::new(self.conn.clone())
    }

    // Users

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn get_user_by_id(&self, id: UserId) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_credentials(&self, username: &str) -> Result<Option<(User, String)>> {
        self.user_repo().get_with_password_hash(username).await
    }

    pub async fn insert_user(&self, user: NewUser<'_>) -> Result<UserInsert> {
        self.user_repo().insert(user).await
    }

    pub async fn create_user_with_referral(
        &self,
        user: NewUser<'_>,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<SignupOutcome> {
        self.user_repo().create_with_referral(user, code, now).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.user_repo().list().await
    }

    pub async fn count_users(&self) -> Result<u64> {
        self.user_repo().count().await
    }

    // Referral codes

    pub async fn get_referral_by_code(&self, code: &str) -> Result<Option<ReferralCode>> {
        self.referral_repo().get_by_code(code).await
    }

    pub async fn count_referral_usage(&self, code: &str) -> Result<u64> {
        self.referral_repo().usage_count(code).await
    }

    pub async fn create_referral(&self, referral: NewReferral<'_>) -> Result<ReferralInsert> {
        self.referral_repo().create(referral).await
    }

    pub async fn list_referrals(&self) -> Result<Vec<(ReferralCode, u64)>> {
        self.referral_repo().list_with_usage().await
    }

    pub async fn delete_referral(&self, id: ReferralId) -> Result<bool> {
        self.referral_repo().delete(id).await
    }

    pub async fn count_referrals(&self) -> Result<u64> {
        self.referral_repo().count().await
    }

    // Requests

    pub async fn insert_request(&self, request: &NewRequest) -> Result<RequestInsert> {
        self.request_repo().insert(request).await
    }

    pub async fn get_request(&self, id: RequestId) -> Result<Option<RequestRecord>> {
        self.request_repo().get(id).await
    }

    pub async fn get_request_by_key(&self, access_key: &str) -> Result<Option<RequestRecord>> {
        self.request_repo().get_by_access_key(access_key).await
    }

    pub async fn list_requests_by_owner(&self, owner: UserId) -> Result<Vec<RequestRecord>> {
        self.request_repo().list_by_owner(owner).await
    }

    pub async fn list_all_requests(&self) -> Result<Vec<RequestRecord>> {
        self.request_repo().list_all().await
    }

    pub async fn write_request_status(
        &self,
        write: StatusWrite<'_>,
        actor: &Identity,
    ) -> Result<StatusWriteOutcome> {
        self.request_repo().write_status(write, actor).await
    }

    pub async fn list_status_events(&self, id: RequestId) -> Result<Vec<StatusEvent>> {
        self.request_repo().list_status_events(id).await
    }

    pub async fn count_requests(&self) -> Result<u64> {
        self.request_repo().count().await
    }

    pub async fn count_requests_by_status(&self) -> Result<HashMap<RequestStatus, u64>> {
        self.request_repo().count_by_status().await
    }

    // Feedback

    pub async fn insert_feedback(&self, message: &str) -> Result<Feedback> {
        self.feedback_repo().insert(message).await
    }

    pub async fn list_feedback(&self) -> Result<Vec<Feedback>> {
        self.feedback_repo().list().await
    }
}
