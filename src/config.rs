use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

pub const ENV_TOKEN_SECRET: &str = "COMMISSION_DESK_TOKEN_SECRET";
pub const ENV_ADMIN_USERNAME: &str = "COMMISSION_DESK_ADMIN_USERNAME";
pub const ENV_ADMIN_PASSWORD: &str = "COMMISSION_DESK_ADMIN_PASSWORD";
pub const ENV_DATABASE: &str = "COMMISSION_DESK_DATABASE";

/// Longest session lifetime accepted (one year).
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365;

/// Shortest access key accepted; 62^14 is above 10^24.
pub const MIN_ACCESS_KEY_LENGTH: usize = 14;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub security: SecurityConfig,

    pub access_keys: AccessKeyConfig,

    pub workflow: WorkflowConfig,

    pub bootstrap: BootstrapConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    pub argon2_parallelism: u32,

    /// HMAC secret for session tokens. Generated per process when empty.
    #[serde(skip_serializing)]
    pub token_secret: Option<String>,

    pub token_ttl_hours: i64,

    pub min_username_length: usize,

    pub max_username_length: usize,

    pub min_password_length: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
            token_secret: None,
            token_ttl_hours: 24,
            min_username_length: 3,
            max_username_length: 32,
            min_password_length: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessKeyConfig {
    /// Characters per generated key.
    pub length: usize,

    /// Attempts before a run of unique-constraint collisions is reported.
    pub max_attempts: u32,
}

impl Default for AccessKeyConfig {
    fn default() -> Self {
        Self {
            length: MIN_ACCESS_KEY_LENGTH,
            max_attempts: 5,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Reject status changes outside the forward transition table.
    pub enforce_transitions: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    pub admin_username: Option<String>,

    #[serde(skip_serializing)]
    pub admin_password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,

    pub loki_labels: std::collections::HashMap<String, String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        let mut labels = std::collections::HashMap::new();
        labels.insert("app".to_string(), "commission-desk".to_string());

        Self {
            metrics_enabled: true,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
            loki_labels: labels,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 3001,
            cors_allowed_origins: vec![
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    pub max_db_connections: u32,

    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/commission-desk.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        let mut config = None;
        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                config = Some(Self::load_from_path(path)?);
                break;
            }
        }

        let mut config = config.unwrap_or_else(|| {
            info!("No config file found, using defaults");
            Self::default()
        });
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    /// Overlays values from the environment (or any lookup) onto the file config.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(secret) = non_empty(ENV_TOKEN_SECRET) {
            self.security.token_secret = Some(secret);
        }
        if let Some(username) = non_empty(ENV_ADMIN_USERNAME) {
            self.bootstrap.admin_username = Some(username);
        }
        if let Some(password) = non_empty(ENV_ADMIN_PASSWORD) {
            self.bootstrap.admin_password = Some(password);
        }
        if let Some(db) = non_empty(ENV_DATABASE) {
            self.general.database_path = db;
        }
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("commission-desk").join("config.toml"));
        }

        paths
    }

    pub fn validate(&self) -> Result<()> {
        if self.access_keys.length < MIN_ACCESS_KEY_LENGTH {
            anyhow::bail!(
                "access_keys.length must be at least {MIN_ACCESS_KEY_LENGTH} (got {})",
                self.access_keys.length
            );
        }

        if self.access_keys.max_attempts == 0 {
            anyhow::bail!("access_keys.max_attempts must be > 0");
        }

        if !(1..=MAX_TOKEN_TTL_HOURS).contains(&self.security.token_ttl_hours) {
            anyhow::bail!(
                "security.token_ttl_hours must be between 1 and {MAX_TOKEN_TTL_HOURS} (got {})",
                self.security.token_ttl_hours
            );
        }

        if self.security.min_password_length < 8 {
            anyhow::bail!("security.min_password_length cannot be below 8");
        }

        if self.security.min_username_length == 0
            || self.security.min_username_length > self.security.max_username_length
        {
            anyhow::bail!("security username length bounds are inconsistent");
        }

        if let Some(secret) = &self.security.token_secret
            && secret.len() < 32
        {
            anyhow::bail!("security.token_secret must be at least 32 bytes");
        }

        Ok(())
    }
}
