//! Process configuration read from `BUNNY_*` environment variables.
//!
//! # Invariants
//! - Unset and blank variables fall back to defaults.
//! - Invalid values are reported, never silently replaced by defaults.

use crate::db::StoreConfig;
use crate::logging::{default_log_level, normalize_level, LogTarget};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DB_PATH: &str = "BUNNY_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "BUNNY_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "BUNNY_LOG_DIR";
pub const ENV_BUSY_TIMEOUT_MS: &str = "BUNNY_BUSY_TIMEOUT_MS";

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue {
                name,
                value,
                reason,
            } => write!(f, "invalid {name}=`{value}`: {reason}"),
        }
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Database file; `None` keeps the store in memory.
    pub db_path: Option<PathBuf>,
    pub log_level: &'static str,
    pub log_target: LogTarget,
    pub store: StoreConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: default_log_level(),
            log_target: LogTarget::Stderr,
            store: StoreConfig::default(),
        }
    }
}

impl AppConfig {
    /// Reads the process environment.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a configuration from `lookup`, which maps variable names to values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        if let Some(path) = read(ENV_DB_PATH) {
            config.db_path = Some(PathBuf::from(path));
        }
        if let Some(level) = read(ENV_LOG_LEVEL) {
            config.log_level =
                normalize_level(&level).map_err(|reason| invalid(ENV_LOG_LEVEL, &level, reason))?;
        }
        if let Some(dir) = read(ENV_LOG_DIR) {
            config.log_target =
                LogTarget::directory(&dir).map_err(|reason| invalid(ENV_LOG_DIR, &dir, reason))?;
        }
        if let Some(raw) = read(ENV_BUSY_TIMEOUT_MS) {
            let millis: u64 = raw
                .parse()
                .map_err(|err| invalid(ENV_BUSY_TIMEOUT_MS, &raw, format!("{err}")))?;
            config.store.busy_timeout = Duration::from_millis(millis);
        }
        Ok(config)
    }
}

fn invalid(name: &'static str, value: &str, reason: String) -> ConfigError {
    ConfigError::InvalidValue {
        name,
        value: value.to_string(),
        reason,
    }
}
