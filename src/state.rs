use std::sync::Arc;

use crate::config::Config;
use crate::db::Store;
use crate::domain::TransitionPolicy;
use crate::services::{
    AlphanumericKeyGenerator, AuthService, FeedbackService, KeyGenerator, ReferralService,
    RequestService, SeaOrmAuthService, SeaOrmFeedbackService, SeaOrmReferralService,
    SeaOrmRequestService, SeaOrmSystemService, SystemService, TokenService,
};

/// Services shared by the HTTP layer and the CLI, built once per process.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub auth_service: Arc<dyn AuthService>,

    pub referral_service: Arc<dyn ReferralService>,

    pub request_service: Arc<dyn RequestService>,

    pub feedback_service: Arc<dyn FeedbackService>,

    pub system_service: Arc<dyn SystemService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let keys = Arc::new(AlphanumericKeyGenerator::new(config.access_keys.length));
        Self::with_key_generator(config, keys).await
    }

    /// Same as [`SharedState::new`] with a caller-supplied key source.
    pub async fn with_key_generator(
        config: Config,
        keys: Arc<dyn KeyGenerator>,
    ) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let tokens = Arc::new(TokenService::from_config(&config.security));

        let referral_service = Arc::new(SeaOrmReferralService::new(store.clone()))
            as Arc<dyn ReferralService>;

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            referral_service.clone(),
            tokens,
            config.security.clone(),
        )) as Arc<dyn AuthService>;

        let request_service = Arc::new(SeaOrmRequestService::new(
            store.clone(),
            keys,
            config.access_keys.max_attempts,
            TransitionPolicy::from_enforced(config.workflow.enforce_transitions),
        )) as Arc<dyn RequestService>;

        let feedback_service = Arc::new(SeaOrmFeedbackService::new(store.clone()))
            as Arc<dyn FeedbackService>;

        let system_service = Arc::new(SeaOrmSystemService::new(store.clone()))
            as Arc<dyn SystemService>;

        Ok(Self {
            config: Arc::new(config),
            store,
            auth_service,
            referral_service,
            request_service,
            feedback_service,
            system_service,
        })
    }

    /// Creates the configured bootstrap admin, if any, when it is missing.
    pub async fn bootstrap_admin(&self) -> anyhow::Result<()> {
        let bootstrap = &self.config.bootstrap;
        let (Some(username), Some(password)) = (
            bootstrap.admin_username.as_deref(),
            bootstrap.admin_password.as_deref(),
        ) else {
            if bootstrap.admin_username.is_some() {
                tracing::warn!("Bootstrap admin username set without a password; skipping");
            }
            return Ok(());
        };

        if let Some(admin) = self
            .auth_service
            .ensure_admin(username, password)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to provision bootstrap admin: {e}"))?
        {
            tracing::info!(username = %admin.username, "Bootstrap admin created");
        }
        Ok(())
    }
}
