//! Configuration for one chain and its in-memory host queue.
//!
//! ```toml
//! dedup_key = "chain_bootstrap"
//! fallback_delay_secs = 86400
//! workers = 1
//! history_limit = 1024   # finished tasks kept by the in-memory queue
//!
//! [retry]
//! base_delay_secs = 30
//! multiplier = 2.0
//! max_delay_secs = 18000
//! max_attempts = 10      # omit for unlimited
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::chain::ChainPolicy;
use crate::domain::{DEFAULT_DEDUP_KEY, DedupKey, DelaySeconds, FALLBACK_DELAY};
use crate::queue::{DEFAULT_HISTORY_LIMIT, RetryPolicy};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChainConfig {
    pub dedup_key: String,
    pub fallback_delay_secs: u64,
    pub workers: usize,
    pub history_limit: usize,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    pub base_delay_secs: u64,
    pub multiplier: f64,
    pub max_delay_secs: u64,
    pub max_attempts: Option<u32>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            dedup_key: DEFAULT_DEDUP_KEY.to_string(),
            fallback_delay_secs: FALLBACK_DELAY.as_secs(),
            workers: 1,
            history_limit: DEFAULT_HISTORY_LIMIT,
            retry: RetryConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            base_delay_secs: policy.base_delay.as_secs(),
            multiplier: policy.multiplier,
            max_delay_secs: policy.max_delay.as_secs(),
            max_attempts: policy.max_attempts,
        }
    }
}

impl ChainConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: ChainConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dedup_key.trim().is_empty() {
            return Err(ConfigError::Invalid("dedup_key must not be empty".into()));
        }
        if self.fallback_delay_secs == 0 {
            return Err(ConfigError::Invalid("fallback_delay_secs must be positive".into()));
        }
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".into()));
        }
        if self.retry.multiplier.is_nan() || self.retry.multiplier < 1.0 {
            return Err(ConfigError::Invalid("retry.multiplier must be >= 1.0".into()));
        }
        if self.retry.max_attempts == Some(0) {
            return Err(ConfigError::Invalid("retry.max_attempts must be at least 1".into()));
        }
        Ok(())
    }

    pub fn chain_policy(&self) -> ChainPolicy {
        ChainPolicy {
            dedup_key: DedupKey::new(self.dedup_key.clone()),
            fallback_delay: DelaySeconds::from_secs(self.fallback_delay_secs),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            base_delay: Duration::from_secs(self.retry.base_delay_secs),
            multiplier: self.retry.multiplier,
            max_delay: Duration::from_secs(self.retry.max_delay_secs),
            max_attempts: self.retry.max_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = ChainConfig::from_toml_str("").unwrap();
        assert_eq!(config, ChainConfig::default());
        assert_eq!(config.chain_policy(), ChainPolicy::default());
        assert_eq!(config.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn parses_full_config() {
        let config = ChainConfig::from_toml_str(
            r#"
            dedup_key = "nightly"
            fallback_delay_secs = 3600
            workers = 2
            history_limit = 16

            [retry]
            base_delay_secs = 10
            multiplier = 3.0
            max_delay_secs = 600
            max_attempts = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.chain_policy().dedup_key.as_str(), "nightly");
        assert_eq!(config.chain_policy().fallback_delay.as_secs(), 3600);
        assert_eq!(config.workers, 2);
        assert_eq!(config.history_limit, 16);

        let retry = config.retry_policy();
        assert_eq!(retry.base_delay, Duration::from_secs(10));
        assert_eq!(retry.max_attempts, Some(4));
        assert_eq!(retry.next_delay(2), Duration::from_secs(30));
    }

    #[test]
    fn legacy_dedup_key_is_kept_verbatim() {
        let config = ChainConfig::from_toml_str(r#"dedup_key = "system_cache_init""#).unwrap();
        assert_ne!(config.dedup_key, DEFAULT_DEDUP_KEY);
        assert_eq!(
            config.chain_policy().dedup_key.as_str(),
            "system_cache_init"
        );
    }

    #[test]
    fn rejects_zero_fallback() {
        let err = ChainConfig::from_toml_str("fallback_delay_secs = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("fallback")));
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = ChainConfig::from_toml_str("interval = 5").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = ChainConfig::from_file(Path::new("/nonexistent/cadence.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
