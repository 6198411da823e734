use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tokio::task;

use super::referral::ReferralRepository;
use crate::config::SecurityConfig;
use crate::db::{format_timestamp, is_unique_violation};
use crate::domain::{ReferralDenial, Role, UserId, check_admission};
use crate::entities::users;

/// User data returned from repository (without sensitive password hash)
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub role: Role,
    pub referral_code_used: Option<String>,
    pub created_at: String,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        let role = model.role.parse().unwrap_or_else(|_| {
            tracing::warn!(user_id = model.id, role = %model.role, "Unknown stored role, treating as user");
            Role::User
        });

        Self {
            id: UserId::new(model.id),
            username: model.username,
            role,
            referral_code_used: model.referral_code_used,
            created_at: model.created_at,
        }
    }
}

/// Account to be inserted. `password_hash` must already be hashed.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub password_hash: &'a str,
    pub role: Role,
    pub referral_code_used: Option<&'a str>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub enum UserInsert {
    Inserted(User),
    DuplicateUsername,
}

#[derive(Debug)]
pub enum SignupOutcome {
    Created(User),
    Denied(ReferralDenial),
    DuplicateUsername,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Get user by username
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")?;

        Ok(user.map(User::from))
    }

    /// Get user by username together with the stored password hash
    pub async fn get_with_password_hash(&self, username: &str) -> Result<Option<(User, String)>> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query user by username")?;

        Ok(user.map(|u| {
            let password_hash = u.password_hash.clone();
            (User::from(u), password_hash)
        }))
    }

    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>> {
        let user = users::Entity::find_by_id(id.value())
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        Ok(user.map(User::from))
    }

    /// Newest accounts first
    pub async fn list(&self) -> Result<Vec<User>> {
        let rows = users::Entity::find()
            .order_by_desc(users::Column::CreatedAt)
            .order_by_desc(users::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list users")?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    pub async fn count(&self) -> Result<u64> {
        users::Entity::find()
            .count(&self.conn)
            .await
            .context("Failed to count users")
    }

    pub async fn insert(&self, user: NewUser<'_>) -> Result<UserInsert> {
        insert_user(&self.conn, user).await
    }

    /// Admits `code` and inserts the account in one transaction.
    ///
    /// The insert runs first so the transaction holds the write lock before
    /// the referral row is re-read and its usage re-counted; the count then
    /// includes the new account.
    pub async fn create_with_referral(
        &self,
        user: NewUser<'_>,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<SignupOutcome> {
        let txn = self
            .conn
            .begin()
            .await
            .context("Failed to open signup transaction")?;

        let created = match insert_user(&txn, user).await? {
            UserInsert::Inserted(created) => created,
            UserInsert::DuplicateUsername => {
                txn.rollback().await?;
                return Ok(SignupOutcome::DuplicateUsername);
            }
        };

        let rule = ReferralRepository::find_rule(&txn, code).await?;
        let others = ReferralRepository::count_usage(&txn, code)
            .await?
            .saturating_sub(1);

        if let Err(denial) = check_admission(rule.as_ref(), others, now) {
            txn.rollback().await?;
            return Ok(SignupOutcome::Denied(denial));
        }

        txn.commit()
            .await
            .context("Failed to commit signup transaction")?;
        Ok(SignupOutcome::Created(created))
    }
}

async fn insert_user<C: ConnectionTrait>(db: &C, user: NewUser<'_>) -> Result<UserInsert> {
    let active = users::ActiveModel {
        username: Set(user.username.to_string()),
        password_hash: Set(user.password_hash.to_string()),
        role: Set(user.role.as_str().to_string()),
        referral_code_used: Set(user.referral_code_used.map(str::to_string)),
        created_at: Set(format_timestamp(user.created_at)),
        ..Default::default()
    };

    match active.insert(db).await {
        Ok(model) => Ok(UserInsert::Inserted(User::from(model))),
        Err(e) if is_unique_violation(&e, "username") => Ok(UserInsert::DuplicateUsername),
        Err(e) => Err(anyhow::Error::new(e).context("Failed to insert user")),
    }
}

/// Hash a password using Argon2id with the configured cost parameters.
pub fn hash_password(password: &str, config: &SecurityConfig) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let params = Params::new(
        config.argon2_memory_cost_kib,
        config.argon2_time_cost,
        config.argon2_parallelism,
        None,
    )
    .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Hashes off the async runtime; Argon2 is CPU-bound.
pub async fn hash_password_blocking(password: &str, config: &SecurityConfig) -> Result<String> {
    let password = password.to_string();
    let config = config.clone();
    task::spawn_blocking(move || hash_password(&password, &config))
        .await
        .context("Password hashing task panicked")?
}

/// Verifies against a PHC-format hash; the parameters are read from the hash itself.
pub async fn verify_password_blocking(password: &str, password_hash: &str) -> Result<bool> {
    let password = password.to_string();
    let password_hash = password_hash.to_string();

    task::spawn_blocking(move || {
        let parsed_hash = PasswordHash::new(&password_hash)
            .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

        Ok::<bool, anyhow::Error>(
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed_hash)
                .is_ok(),
        )
    })
    .await
    .context("Password verification task panicked")?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap_config() -> SecurityConfig {
        SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            ..SecurityConfig::default()
        }
    }

    #[test]
    fn hash_is_salted_and_not_plaintext() {
        let config = cheap_config();
        let a = hash_password("correct-horse", &config).unwrap();
        let b = hash_password("correct-horse", &config).unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("$argon2id$"));
        assert!(!a.contains("correct-horse"));
    }

    #[tokio::test]
    async fn verify_round_trip() {
        let config = cheap_config();
        let hash = hash_password_blocking("correct-horse", &config)
            .await
            .unwrap();
        assert!(verify_password_blocking("correct-horse", &hash).await.unwrap());
        assert!(!verify_password_blocking("wrong-horse", &hash).await.unwrap());
        assert!(verify_password_blocking("x", "not-a-hash").await.is_err());
    }
}
