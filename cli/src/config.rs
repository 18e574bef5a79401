use std::env;
use std::path::Path;
use std::time::Duration;

use agent_core::PollPolicy;
use agent_http::ClientSettings;
use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    pub api: ApiConfig,
    pub polling: PollingConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ApiConfig {
    /// Backend root including the API prefix
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Retries for job listing and agent lookups
    pub max_retries: usize,
    /// Bearer token of an existing session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PollingConfig {
    pub interval_ms: u64,
    pub max_attempts: u32,
    /// Wall-clock budget per job in seconds
    pub timeout_secs: u64,
    pub backoff_min_ms: u64,
    pub backoff_max_ms: u64,
    pub max_consecutive_errors: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (pretty, json, compact)
    pub format: LogFormat,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
    Compact,
}

impl Config {
    /// Load the embedded defaults, then `config_file`, then `AGENTS_*` and
    /// the standard environment variables.
    ///
    /// Nested keys use a double underscore: `AGENTS_API__BASE_URL`.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder().add_source(File::from_str(
            include_str!("../config/default.toml"),
            FileFormat::Toml,
        ));

        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix("AGENTS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .context("Failed to build configuration")?;

        let mut result: Config = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        result.apply_overrides(|key| env::var(key).ok());

        Ok(result)
    }

    /// Apply API_URL, API_TOKEN and LOG_LEVEL from `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup("API_URL") {
            self.api.base_url = base_url;
        }

        if let Some(token) = lookup("API_TOKEN").filter(|t| !t.trim().is_empty()) {
            self.api.token = Some(token);
        }

        if let Some(log_level) = lookup("LOG_LEVEL") {
            self.logging.level = log_level;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(anyhow::anyhow!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                ));
            }
        }

        let base_url = self.api.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(anyhow::anyhow!(
                "API base URL must start with 'http://' or 'https://'. Got: {}",
                self.api.base_url
            ));
        }

        if self.api.timeout_secs == 0 {
            return Err(anyhow::anyhow!("API timeout must be greater than 0"));
        }

        if self.polling.interval_ms == 0 {
            return Err(anyhow::anyhow!("Polling interval must be greater than 0"));
        }

        if self.polling.max_attempts == 0 {
            return Err(anyhow::anyhow!("Polling max_attempts must be greater than 0"));
        }

        if self.polling.timeout_secs == 0 {
            return Err(anyhow::anyhow!("Polling timeout must be greater than 0"));
        }

        if self.polling.backoff_min_ms > self.polling.backoff_max_ms {
            return Err(anyhow::anyhow!(
                "Polling backoff_min_ms ({}) exceeds backoff_max_ms ({})",
                self.polling.backoff_min_ms,
                self.polling.backoff_max_ms
            ));
        }

        Ok(())
    }

    pub fn to_poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(self.polling.interval_ms),
            max_attempts: self.polling.max_attempts,
            timeout: Duration::from_secs(self.polling.timeout_secs),
            backoff_min: Duration::from_millis(self.polling.backoff_min_ms),
            backoff_max: Duration::from_millis(self.polling.backoff_max_ms),
            max_consecutive_errors: self.polling.max_consecutive_errors,
            ..PollPolicy::default()
        }
    }

    pub fn to_client_settings(&self) -> ClientSettings {
        ClientSettings {
            timeout: Duration::from_secs(self.api.timeout_secs),
            max_retries: self.api.max_retries,
            ..ClientSettings::new(self.api.base_url.clone())
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://localhost:8000/api/v1".to_string(),
                timeout_secs: 30,
                max_retries: 3,
                token: None,
            },
            polling: PollingConfig {
                interval_ms: 1500,
                max_attempts: 400,
                timeout_secs: 600,
                backoff_min_ms: 1000,
                backoff_max_ms: 30000,
                max_consecutive_errors: 5,
            },
            logging: LoggingConfig {
                level: "warn".to_string(),
                format: LogFormat::Compact,
            },
        }
    }
}
