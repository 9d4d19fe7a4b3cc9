//! Centralized worker configuration.
//!
//! Loaded via the `config` crate from environment variables, with `__`
//! separating nested keys (for example `LEXOFFICE__API_KEY`).

use paperbridge_integration::{LexofficeConfig, PaperlessConfig};
use serde::Deserialize;
use std::time::Duration;

/// Worker configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct WorkerConfig {
    /// PostgreSQL database connection URL.
    pub database_url: String,

    /// Paperless-ngx connection.
    #[serde(default)]
    pub paperless: PaperlessConfig,

    /// Lexoffice connection.
    #[serde(default)]
    pub lexoffice: LexofficeConfig,

    /// Outbound HTTP settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Scheduled sweep settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// Outbound HTTP settings shared by both connectors.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl HttpConfig {
    /// The per-request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Scheduled sweep settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Interval between sweeps, in seconds.
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,

    /// Maximum workflows executed at once during a sweep.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

fn default_interval_seconds() -> u64 {
    900
}

fn default_max_concurrency() -> usize {
    4
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval_seconds(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

impl WorkerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
