//! Store configuration: defaults, TOML file, environment.

use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, instrument};

use crate::ReferentialPolicy;

/// Environment variable overriding [`StoreConfig::database_url`].
pub const ENV_DATABASE_URL: &str = "GAME_STORE_DATABASE_URL";
/// Environment variable overriding [`StoreConfig::host`].
pub const ENV_HOST: &str = "GAME_STORE_HOST";
/// Environment variable overriding [`StoreConfig::port`].
pub const ENV_PORT: &str = "GAME_STORE_PORT";

/// Lowest work factor bcrypt accepts.
const MIN_BCRYPT_COST: u32 = 4;
/// Highest work factor bcrypt accepts.
const MAX_BCRYPT_COST: u32 = 31;

/// Runtime configuration for the store server.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path of the SQLite database file.
    database_url: String,

    /// Address the HTTP listener binds to.
    host: String,

    /// Port the HTTP listener binds to.
    port: u16,

    /// Insert the starter catalog when the games table is empty.
    seed_catalog: bool,

    /// How purchases and deletes treat unknown or referenced rows.
    referential_policy: ReferentialPolicy,

    /// bcrypt work factor for new password hashes.
    bcrypt_cost: u32,

    /// How long a connection waits on a locked database.
    busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: "store.db".to_string(),
            host: "127.0.0.1".to_string(),
            port: 8000,
            seed_catalog: true,
            referential_policy: ReferentialPolicy::default(),
            bcrypt_cost: bcrypt::DEFAULT_COST,
            busy_timeout_ms: 5_000,
        }
    }
}

impl StoreConfig {
    /// Loads configuration from a TOML file. Missing keys take defaults.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config = Self::from_toml_str(&content)?;
        info!(database_url = %config.database_url, "Config loaded successfully");
        Ok(config)
    }

    /// Parses configuration from TOML text.
    #[instrument(skip(content))]
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Builds the effective configuration: the file when given, then
    /// environment overrides.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    #[instrument]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from a variable lookup (normally the process environment).
    #[instrument(skip(self, lookup))]
    pub fn with_env_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(url) = lookup(ENV_DATABASE_URL) {
            debug!(var = ENV_DATABASE_URL, "Overriding database url");
            self.database_url = url;
        }
        if let Some(host) = lookup(ENV_HOST) {
            debug!(var = ENV_HOST, "Overriding host");
            self.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.port = port
                .parse()
                .map_err(|_| {
                    ConfigError::new(format!("{} is not a valid port: '{}'", ENV_PORT, port))
                })?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Overrides the database path.
    pub fn set_database_url(&mut self, database_url: String) {
        self.database_url = database_url;
    }

    /// Overrides the listen host.
    pub fn set_host(&mut self, host: String) {
        self.host = host;
    }

    /// Overrides the listen port.
    pub fn set_port(&mut self, port: u16) {
        self.port = port;
    }

    /// Overrides the referential policy.
    pub fn set_referential_policy(&mut self, policy: ReferentialPolicy) {
        self.referential_policy = policy;
    }

    /// Overrides the catalog seeding flag.
    pub fn set_seed_catalog(&mut self, seed_catalog: bool) {
        self.seed_catalog = seed_catalog;
    }

    /// Overrides the bcrypt work factor.
    pub fn set_bcrypt_cost(&mut self, bcrypt_cost: u32) {
        self.bcrypt_cost = bcrypt_cost;
    }

    /// Returns `host:port` for binding.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database_url.trim().is_empty() {
            return Err(ConfigError::new("database_url must not be empty".to_string()));
        }
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&self.bcrypt_cost) {
            return Err(ConfigError::new(format!(
                "bcrypt_cost must be between {} and {}",
                MIN_BCRYPT_COST,
                MAX_BCRYPT_COST
            )));
        }
        Ok(())
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
