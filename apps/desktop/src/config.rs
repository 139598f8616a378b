//! Environment-driven configuration.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::presentation::GateConfig;
use crate::sync::DEFAULT_MIRROR_ATTEMPTS;

const APP_DIR: &str = "loanbook";
const REMINDERS_DB: &str = "reminders.db";
const PREFERENCES_DB: &str = "preferences.db";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be a positive integer, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },

    #[error("no data directory available; set LOANBOOK_DATA_DIR")]
    NoDataDir,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub auto_hide: Duration,
    pub snooze_minutes: u64,
    pub sweep_interval: Duration,
    pub mirror_retries: usize,
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`, falling back to defaults for
    /// missing keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = match lookup("LOANBOOK_DATA_DIR") {
            Some(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => dirs::data_local_dir()
                .ok_or(ConfigError::NoDataDir)?
                .join(APP_DIR),
        };

        let number = |key: &'static str, default: u64| -> Result<u64, ConfigError> {
            match lookup(key) {
                None => Ok(default),
                Some(raw) => match raw.trim().parse::<u64>() {
                    Ok(value) if value > 0 => Ok(value),
                    _ => Err(ConfigError::InvalidNumber { key, value: raw }),
                },
            }
        };

        Ok(Self {
            data_dir,
            auto_hide: Duration::from_secs(number("LOANBOOK_AUTO_HIDE_SECS", 30)?),
            snooze_minutes: number("LOANBOOK_SNOOZE_MINUTES", 10)?,
            sweep_interval: Duration::from_secs(
                number("LOANBOOK_SWEEP_INTERVAL_MINS", 60)? * 60,
            ),
            mirror_retries: number("LOANBOOK_MIRROR_RETRIES", DEFAULT_MIRROR_ATTEMPTS as u64)?
                as usize,
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(REMINDERS_DB)
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.data_dir.join(PREFERENCES_DB)
    }

    pub fn gate_config(&self) -> GateConfig {
        GateConfig {
            auto_hide: self.auto_hide,
            default_snooze: chrono::Duration::minutes(self.snooze_minutes as i64),
        }
    }
}
