use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::probe::user_agents::DEFAULT_USER_AGENT;

pub const ENV_BIND: &str = "STOREFRONT_PROBE_BIND";
pub const ENV_TIMEOUT_SECS: &str = "STOREFRONT_PROBE_TIMEOUT_SECS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported config format for {0:?} (expected .toml or .json)")]
    UnsupportedFormat(PathBuf),
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Runtime settings shared by the CLI and the batch server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Maximum number of requests issued per store before giving up on redirects.
    pub max_redirects: usize,
    /// Number of stores probed together in one batch group.
    pub concurrency: usize,
    /// URLs accepted per batch request; the rest are dropped.
    pub max_batch_urls: usize,
    /// Whole-request timeout, body included.
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
    /// Listen address for `store-check-server`.
    pub bind_address: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            max_redirects: 6,
            concurrency: 5,
            max_batch_urls: 100,
            request_timeout_secs: 15,
            connect_timeout_secs: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            bind_address: "127.0.0.1:3000".to_string(),
        }
    }
}

impl ProbeConfig {
    pub fn builder() -> ProbeConfigBuilder {
        ProbeConfigBuilder::new()
    }

    pub fn from_toml_str(data: &str) -> Result<Self, ConfigError> {
        let cfg: ProbeConfig = toml::from_str(data)?;
        cfg.validate()
    }

    pub fn from_json_str(data: &str) -> Result<Self, ConfigError> {
        let cfg: ProbeConfig = serde_json::from_str(data)?;
        cfg.validate()
    }

    /// Load from a `.toml` or `.json` file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::from_toml_str(&data),
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::from_json_str(&data),
            _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    /// Apply `STOREFRONT_PROBE_*` environment overrides.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup(ENV_BIND).filter(|value| !value.trim().is_empty()) {
            self.bind_address = bind.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            self.request_timeout_secs = raw.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{ENV_TIMEOUT_SECS} must be an integer, got '{raw}'"))
            })?;
        }
        self.validate()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.max_redirects == 0 {
            return Err(ConfigError::Invalid("max_redirects must be at least 1".into()));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be at least 1".into()));
        }
        if self.max_batch_urls == 0 {
            return Err(ConfigError::Invalid("max_batch_urls must be at least 1".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be at least 1".into(),
            ));
        }
        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "connect_timeout_secs must be at least 1".into(),
            ));
        }
        Ok(self)
    }
}

/// Fluent builder for [`ProbeConfig`].
#[derive(Debug, Default)]
pub struct ProbeConfigBuilder {
    config: ProbeConfig,
}

impl ProbeConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_redirects(mut self, hops: usize) -> Self {
        self.config.max_redirects = hops;
        self
    }

    pub fn concurrency(mut self, group_size: usize) -> Self {
        self.config.concurrency = group_size;
        self
    }

    pub fn max_batch_urls(mut self, limit: usize) -> Self {
        self.config.max_batch_urls = limit;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn bind_address(mut self, address: impl Into<String>) -> Self {
        self.config.bind_address = address.into();
        self
    }

    pub fn build(self) -> Result<ProbeConfig, ConfigError> {
        self.config.validate()
    }
}
