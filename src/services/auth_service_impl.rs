//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

use crate::config::SecurityConfig;
use crate::db::repositories::user::{hash_password_blocking, verify_password_blocking};
use crate::db::{NewUser, SignupOutcome, Store, UserInsert};
use crate::domain::{Identity, Role};
use crate::services::auth_service::{AuthError, AuthService, LoginResult, UserInfo};
use crate::services::referral_service::{ReferralError, ReferralService};
use crate::services::token::TokenService;

/// Upper bound on password bytes fed to Argon2.
const MAX_PASSWORD_BYTES: usize = 1024;

const DECOY_PASSWORD: &str = "commission-desk-decoy-password";

pub struct SeaOrmAuthService {
    store: Store,
    referrals: Arc<dyn ReferralService>,
    tokens: Arc<TokenService>,
    security: SecurityConfig,
    /// Serializes the admit-and-insert step of signups.
    admission: Mutex<()>,
    /// Hashed with the configured cost; unknown usernames are verified
    /// against it so both login failures spend the same Argon2 time.
    decoy_hash: OnceCell<String>,
}

impl SeaOrmAuthService {
    #[must_use]
    pub fn new(
        store: Store,
        referrals: Arc<dyn ReferralService>,
        tokens: Arc<TokenService>,
        security: SecurityConfig,
    ) -> Self {
        Self {
            store,
            referrals,
            tokens,
            security,
            admission: Mutex::new(()),
            decoy_hash: OnceCell::new(),
        }
    }

    async fn decoy_hash(&self) -> Result<&str, AuthError> {
        let hash = self
            .decoy_hash
            .get_or_try_init(|| hash_password_blocking(DECOY_PASSWORD, &self.security))
            .await?;
        Ok(hash.as_str())
    }

    fn validate_credentials(&self, username: &str, password: &str) -> Result<(), AuthError> {
        validate_credentials(username, password, &self.security)
    }

    async fn insert_admin(&self, username: &str, password: &str) -> Result<UserInfo, AuthError> {
        self.validate_credentials(username, password)?;
        let password_hash = hash_password_blocking(password, &self.security).await?;

        let inserted = self
            .store
            .insert_user(NewUser {
                username,
                password_hash: &password_hash,
                role: Role::Admin,
                referral_code_used: None,
                created_at: Utc::now(),
            })
            .await?;

        match inserted {
            UserInsert::Inserted(user) => {
                info!(event = "admin_created", username = %user.username, "Admin account created");
                Ok(UserInfo::from(user))
            }
            UserInsert::DuplicateUsername => Err(AuthError::DuplicateUsername),
        }
    }
}

pub(crate) fn validate_credentials(
    username: &str,
    password: &str,
    policy: &SecurityConfig,
) -> Result<(), AuthError> {
    let username_len = username.chars().count();
    if username_len < policy.min_username_length || username_len > policy.max_username_length {
        return Err(AuthError::Validation(format!(
            "Username must be between {} and {} characters",
            policy.min_username_length, policy.max_username_length
        )));
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(AuthError::Validation(
            "Username can only contain letters, numbers, '.', '_' and '-'".to_string(),
        ));
    }

    if password.chars().count() < policy.min_password_length {
        return Err(AuthError::Validation(format!(
            "Password must be at least {} characters",
            policy.min_password_length
        )));
    }

    if password.len() > MAX_PASSWORD_BYTES {
        return Err(AuthError::Validation("Password is too long".to_string()));
    }

    Ok(())
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(
        &self,
        username: &str,
        password: &str,
        referral_code: &str,
    ) -> Result<UserInfo, AuthError> {
        self.validate_credentials(username, password)?;

        // Refuse bad codes before paying for a hash.
        self.referrals
            .admit(referral_code)
            .await
            .map_err(|e| match e {
                ReferralError::Denied(denial) => AuthError::InvalidReferral(denial),
                other => AuthError::Internal(other.to_string()),
            })?;

        let password_hash = hash_password_blocking(password, &self.security).await?;

        let outcome = {
            let _guard = self.admission.lock().await;
            self.store
                .create_user_with_referral(
                    NewUser {
                        username,
                        password_hash: &password_hash,
                        role: Role::User,
                        referral_code_used: Some(referral_code),
                        created_at: Utc::now(),
                    },
                    referral_code,
                    Utc::now(),
                )
                .await?
        };

        match outcome {
            SignupOutcome::Created(user) => {
                info!(
                    event = "user_signed_up",
                    username = %user.username,
                    referral_code = %referral_code,
                    "User signed up"
                );
                Ok(UserInfo::from(user))
            }
            SignupOutcome::Denied(denial) => {
                info!(
                    referral_code = %referral_code,
                    reason = %denial,
                    "Signup refused at admission"
                );
                Err(AuthError::InvalidReferral(denial))
            }
            SignupOutcome::DuplicateUsername => Err(AuthError::DuplicateUsername),
        }
    }

    async fn login(&self, username: &str, password: &str) -> Result<LoginResult, AuthError> {
        let Some((user, password_hash)) = self.store.get_user_credentials(username).await? else {
            verify_password_blocking(password, self.decoy_hash().await?).await?;
            warn!(event = "login_failed", username = %username, "Login failed");
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password_blocking(password, &password_hash).await? {
            warn!(event = "login_failed", username = %username, "Login failed");
            return Err(AuthError::InvalidCredentials);
        }

        let identity = Identity {
            user_id: user.id,
            username: user.username.clone(),
            role: user.role,
        };
        let issued = self.tokens.issue(&identity)?;

        info!(event = "login", username = %user.username, role = %user.role, "User logged in");

        Ok(LoginResult {
            token: issued.token,
            expires_at: issued.expires_at,
            user: UserInfo::from(user),
        })
    }

    fn authenticate(&self, token: Option<&str>) -> Result<Identity, AuthError> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;

        self.tokens.verify(token).map_err(|e| {
            debug!(error = %e, "Bearer token rejected");
            AuthError::from(e)
        })
    }

    async fn me(&self, identity: &Identity) -> Result<UserInfo, AuthError> {
        self.store
            .get_user_by_id(identity.user_id)
            .await?
            .map(UserInfo::from)
            .ok_or(AuthError::UserNotFound)
    }

    async fn create_admin(&self, username: &str, password: &str) -> Result<UserInfo, AuthError> {
        self.insert_admin(username, password).await
    }

    async fn ensure_admin(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<UserInfo>, AuthError> {
        if let Some(existing) = self.store.get_user_by_username(username).await? {
            if existing.role != Role::Admin {
                warn!(
                    username = %username,
                    "Bootstrap admin name belongs to a non-admin account; leaving it unchanged"
                );
            }
            return Ok(None);
        }

        self.insert_admin(username, password).await.map(Some)
    }

    async fn list_users(&self) -> Result<Vec<UserInfo>, AuthError> {
        Ok(self
            .store
            .list_users()
            .await?
            .into_iter()
            .map(UserInfo::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::referral_service::CreateReferral;
    use crate::services::referral_service_impl::SeaOrmReferralService;
    use chrono::Duration;

    fn cheap_security() -> SecurityConfig {
        SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            ..SecurityConfig::default()
        }
    }

    async fn service() -> (SeaOrmAuthService, Arc<SeaOrmReferralService>) {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let referrals = Arc::new(SeaOrmReferralService::new(store.clone()));
        let tokens = Arc::new(TokenService::new(
            b"unit-test-secret-unit-test-secret",
            Duration::hours(24),
        ));
        let auth = SeaOrmAuthService::new(store, referrals.clone(), tokens, cheap_security());
        (auth, referrals)
    }

    #[test]
    fn credential_policy() {
        let policy = cheap_security();
        assert!(validate_credentials("mika", "longenough", &policy).is_ok());
        assert!(validate_credentials("mi", "longenough", &policy).is_err());
        assert!(validate_credentials(&"m".repeat(33), "longenough", &policy).is_err());
        assert!(validate_credentials("mi ka", "longenough", &policy).is_err());
        assert!(validate_credentials("mika", "short", &policy).is_err());
    }

    #[tokio::test]
    async fn unknown_username_pays_for_a_verify() {
        let (auth, _) = service().await;
        assert!(auth.decoy_hash.get().is_none());

        let err = auth.login("ghost", "whatever-password").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        let decoy = auth.decoy_hash.get().unwrap();
        assert!(decoy.starts_with("$argon2id$"));
        assert!(decoy.contains("m=1024,t=1"));
        assert!(!verify_password_blocking("whatever-password", decoy).await.unwrap());
    }

    #[tokio::test]
    async fn register_login_authenticate() {
        let (auth, referrals) = service().await;
        referrals
            .create(
                CreateReferral {
                    code: "WELCOME".to_string(),
                    ..CreateReferral::default()
                },
                "admin",
            )
            .await
            .unwrap();

        let user = auth
            .register("mika", "correct-horse", "WELCOME")
            .await
            .unwrap();
        assert_eq!(user.role, Role::User);
        assert_eq!(user.referral_code_used.as_deref(), Some("WELCOME"));

        assert!(matches!(
            auth.register("mika", "correct-horse", "WELCOME").await,
            Err(AuthError::DuplicateUsername)
        ));

        let login = auth.login("mika", "correct-horse").await.unwrap();
        let identity = auth.authenticate(Some(&login.token)).unwrap();
        assert_eq!(identity.user_id, user.id);
        assert_eq!(identity.role, Role::User);
        assert_eq!(auth.me(&identity).await.unwrap().username, "mika");

        assert!(matches!(
            auth.login("mika", "wrong-horse").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("nobody", "correct-horse").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.authenticate(None),
            Err(AuthError::MissingToken)
        ));
        assert!(matches!(
            auth.authenticate(Some("garbage")),
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn refused_referral_creates_no_account() {
        let (auth, _) = service().await;
        assert!(matches!(
            auth.register("mika", "correct-horse", "MISSING").await,
            Err(AuthError::InvalidReferral(_))
        ));
        assert!(auth.list_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn bootstrap_admin_is_idempotent() {
        let (auth, _) = service().await;
        let created = auth.ensure_admin("root", "correct-horse").await.unwrap();
        assert_eq!(created.unwrap().role, Role::Admin);
        assert!(
            auth.ensure_admin("root", "correct-horse")
                .await
                .unwrap()
                .is_none()
        );
        assert!(matches!(
            auth.create_admin("root", "correct-horse").await,
            Err(AuthError::DuplicateUsername)
        ));
    }
}
