use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Default presence-wait timeout, which is also the cancellation granularity
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 200;

/// Reader name fragments preferred when several readers are attached
pub const DEFAULT_PREFERRED_READERS: &[&str] = &["Sony", "PaSoRi", "RC-S3"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// PCSC context scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeSetting {
    #[default]
    User,
    System,
}

impl From<ScopeSetting> for pcsc::Scope {
    fn from(scope: ScopeSetting) -> Self {
        match scope {
            ScopeSetting::User => pcsc::Scope::User,
            ScopeSetting::System => pcsc::Scope::System,
        }
    }
}

/// Scanner configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub poll_interval_ms: u64,
    pub preferred_readers: Vec<String>,
    pub scope: ScopeSetting,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            preferred_readers: DEFAULT_PREFERRED_READERS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            scope: ScopeSetting::default(),
        }
    }
}

impl ScanConfig {
    /// Load a JSON config file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;

        let config: ScanConfig = serde_json::from_str(&content).map_err(|source| {
            ConfigError::Parse {
                path: display,
                source,
            }
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
