//! Config loading, validation, and utility operations.

use super::model::Config;
use crate::error::{LockError, Result};
use std::path::Path;
use std::time::Duration;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            LockError::Config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load config from a YAML file, falling back to defaults when it is absent.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // serde_yaml rejects an empty document; treat it as "all defaults".
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| LockError::Config(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| LockError::Config(format!("failed to serialize config to YAML: {}", e)))
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `lock_timeout_secs` must be finite, not negative, and representable
    ///   as a `Duration`
    /// - `poll_interval_ms` must be positive
    pub fn validate(&self) -> Result<()> {
        if !self.lock_timeout_secs.is_finite() || self.lock_timeout_secs < 0.0 {
            return Err(LockError::Config(format!(
                "config validation failed: lock_timeout_secs must be a non-negative number (found {})",
                self.lock_timeout_secs
            )));
        }
        self.default_timeout()?;

        if self.poll_interval_ms == 0 {
            return Err(LockError::Config(
                "config validation failed: poll_interval_ms must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Default acquisition timeout as a `Duration`.
    pub fn default_timeout(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.lock_timeout_secs).map_err(|e| {
            LockError::Config(format!(
                "config validation failed: lock_timeout_secs {} is not a usable timeout: {}",
                self.lock_timeout_secs, e
            ))
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
