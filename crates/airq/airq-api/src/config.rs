//! Process configuration.
//!
//! [`AppConfig`] is built once at startup and passed down explicitly. Values
//! come from `AIRQ_*` variables, optionally overridden through
//! [`AppConfigBuilder`] (the CLI layers its flags this way).

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use airq_core::recorder::DEFAULT_RESULTS_FILE;
use airq_core::source::{DEFAULT_PATH, DEFAULT_TIMEOUT};
use airq_spi::{ForecastParams, ForestParams, SeedPolicy};

use crate::error::ConfigError;

pub const ENV_SOURCE_HOST: &str = "AIRQ_SOURCE_HOST";
pub const ENV_SOURCE_PATH: &str = "AIRQ_SOURCE_PATH";
pub const ENV_SOURCE_AUTH: &str = "AIRQ_SOURCE_AUTH";
pub const ENV_SOURCE_TIMEOUT_SECS: &str = "AIRQ_SOURCE_TIMEOUT_SECS";
pub const ENV_HISTORY_PATH: &str = "AIRQ_HISTORY_PATH";
pub const ENV_MODEL_PATH: &str = "AIRQ_MODEL_PATH";
pub const ENV_RESULTS_PATH: &str = "AIRQ_RESULTS_PATH";
pub const ENV_TREES: &str = "AIRQ_TREES";
pub const ENV_MODEL_SEED: &str = "AIRQ_MODEL_SEED";
pub const ENV_SEED_POLICY: &str = "AIRQ_SEED_POLICY";

/// Remote reading table settings.
#[derive(Clone, PartialEq)]
pub struct SourceConfig {
    /// Database host, or a full base URL
    pub host: Option<String>,
    pub path: String,
    /// Database secret; redacted from `Debug`
    pub auth: Option<String>,
    pub timeout: Duration,
}

impl fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceConfig")
            .field("host", &self.host)
            .field("path", &self.path)
            .field("auth", &self.auth.as_ref().map(|_| "***"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            host: None,
            path: DEFAULT_PATH.to_string(),
            auth: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Immutable process configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub source: SourceConfig,
    /// Lag-feature history used to train the forest
    pub history_path: Option<PathBuf>,
    /// Saved forest artifact
    pub model_path: Option<PathBuf>,
    pub results_path: PathBuf,
    pub forest: ForestParams,
    pub forecast: ForecastParams,
    pub seed_policy: SeedPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            history_path: None,
            model_path: None,
            results_path: PathBuf::from(DEFAULT_RESULTS_FILE),
            forest: ForestParams::default(),
            forecast: ForecastParams::default(),
            seed_policy: SeedPolicy::default(),
        }
    }
}

fn parse<T: FromStr>(key: &'static str, value: &str, reason: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    })
}

impl AppConfig {
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Read settings through `lookup`; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut builder = AppConfigBuilder::default();

        if let Some(host) = get(ENV_SOURCE_HOST) {
            builder = builder.source_host(host);
        }
        if let Some(path) = get(ENV_SOURCE_PATH) {
            builder = builder.source_path(path);
        }
        if let Some(auth) = get(ENV_SOURCE_AUTH) {
            builder = builder.source_auth(auth);
        }
        if let Some(raw) = get(ENV_SOURCE_TIMEOUT_SECS) {
            let secs: u64 = parse(ENV_SOURCE_TIMEOUT_SECS, &raw, "expected whole seconds")?;
            builder = builder.source_timeout(Duration::from_secs(secs));
        }
        if let Some(path) = get(ENV_HISTORY_PATH) {
            builder = builder.history_path(path);
        }
        if let Some(path) = get(ENV_MODEL_PATH) {
            builder = builder.model_path(path);
        }
        if let Some(path) = get(ENV_RESULTS_PATH) {
            builder = builder.results_path(path);
        }
        if let Some(raw) = get(ENV_TREES) {
            builder = builder.n_estimators(parse(ENV_TREES, &raw, "expected a positive integer")?);
        }
        if let Some(raw) = get(ENV_MODEL_SEED) {
            builder = builder.model_seed(parse(ENV_MODEL_SEED, &raw, "expected an unsigned integer")?);
        }
        if let Some(raw) = get(ENV_SEED_POLICY) {
            builder = builder.seed_policy(parse(
                ENV_SEED_POLICY,
                &raw,
                "expected 'minute' or an unsigned integer",
            )?);
        }

        builder.build()
    }

    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Source host, required for remote runs.
    pub fn require_source_host(&self) -> Result<&str, ConfigError> {
        self.source
            .host
            .as_deref()
            .ok_or(ConfigError::Missing(ENV_SOURCE_HOST))
    }
}

/// Builder for [`AppConfig`].
#[derive(Debug, Clone, Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl From<AppConfig> for AppConfigBuilder {
    fn from(config: AppConfig) -> Self {
        Self { config }
    }
}

impl AppConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source_host(mut self, host: impl Into<String>) -> Self {
        self.config.source.host = Some(host.into());
        self
    }

    pub fn source_path(mut self, path: impl Into<String>) -> Self {
        self.config.source.path = path.into();
        self
    }

    pub fn source_auth(mut self, auth: impl Into<String>) -> Self {
        self.config.source.auth = Some(auth.into());
        self
    }

    pub fn source_timeout(mut self, timeout: Duration) -> Self {
        self.config.source.timeout = timeout;
        self
    }

    pub fn history_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.history_path = Some(path.into());
        self
    }

    pub fn model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.model_path = Some(path.into());
        self
    }

    pub fn results_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.results_path = path.into();
        self
    }

    /// Number of trees in the forest.
    pub fn n_estimators(mut self, n: usize) -> Self {
        self.config.forest.n_estimators = n;
        self
    }

    /// Base seed for forest training.
    pub fn model_seed(mut self, seed: u64) -> Self {
        self.config.forest.seed = seed;
        self
    }

    pub fn forest(mut self, forest: ForestParams) -> Self {
        self.config.forest = forest;
        self
    }

    pub fn forecast(mut self, forecast: ForecastParams) -> Self {
        self.config.forecast = forecast;
        self
    }

    pub fn seed_policy(mut self, policy: SeedPolicy) -> Self {
        self.config.seed_policy = policy;
        self
    }

    /// Validate and build.
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        let config = self.config;

        if config.source.timeout.is_zero() {
            return Err(ConfigError::Invalid {
                key: ENV_SOURCE_TIMEOUT_SECS,
                value: "0".to_string(),
                reason: "timeout must be positive".to_string(),
            });
        }
        config.forest.validate().map_err(|e| ConfigError::Invalid {
            key: ENV_TREES,
            value: config.forest.n_estimators.to_string(),
            reason: e.to_string(),
        })?;
        config.forecast.validate().map_err(|e| ConfigError::Invalid {
            key: "forecast",
            value: String::new(),
            reason: e.to_string(),
        })?;

        Ok(config)
    }
}
