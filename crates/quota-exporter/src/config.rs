// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use quota_watcher::clients::AccountConfig;
use serde::Deserialize;
use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Environment fallback for accounts configured without credentials.
const ROLE_ARN_ENV: &str = "AWS_ROLE_ARN";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse configuration file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Exporter process settings (`service:` section of the YAML file).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceSection {
    /// Poll interval in minutes.
    pub interval: u64,
    /// Listen port for the metrics endpoint.
    pub port: u16,
    /// Credential refresh interval in minutes.
    pub refresh_interval: u64,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ServiceSection {
    fn default() -> Self {
        ServiceSection {
            interval: 5,
            port: 2112,
            refresh_interval: 45,
            log_level: "info".to_string(),
        }
    }
}

/// One monitored account (`accounts:` list entry).
#[derive(Debug, Clone, Deserialize)]
pub struct AccountEntry {
    pub label: String,
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    #[serde(default)]
    pub role_arn: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExporterConfig {
    #[serde(default)]
    pub service: ServiceSection,
    pub accounts: Vec<AccountEntry>,
}

impl ExporterConfig {
    /// Load and validate the configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        let mut config: ExporterConfig = serde_yaml::from_str(&raw)?;
        config.apply_env_fallback();
        config.validate()?;
        Ok(config)
    }

    /// Accounts that carry no credentials at all fall back to the role ARN
    /// from the environment, so a single-role deployment needs no secrets
    /// in the file.
    fn apply_env_fallback(&mut self) {
        let Ok(role_arn) = env::var(ROLE_ARN_ENV) else {
            return;
        };
        for account in &mut self.accounts {
            if account.role_arn.is_none()
                && account.access_key.is_none()
                && account.secret_key.is_none()
            {
                account.role_arn = Some(role_arn.clone());
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service.interval == 0 {
            return Err(ConfigError::Invalid(
                "service.interval must be at least 1 minute".to_string(),
            ));
        }
        if self.service.port == 0 {
            return Err(ConfigError::Invalid(
                "service.port must be greater than 0".to_string(),
            ));
        }
        if self.service.refresh_interval == 0 {
            return Err(ConfigError::Invalid(
                "service.refresh_interval must be at least 1 minute".to_string(),
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.service.log_level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "invalid log level '{}', must be one of: trace, debug, info, warn, error",
                self.service.log_level
            )));
        }

        if self.accounts.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one account must be configured".to_string(),
            ));
        }

        let mut labels = HashSet::new();
        for account in &self.accounts {
            if account.label.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "account labels cannot be empty".to_string(),
                ));
            }
            if !labels.insert(account.label.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate account label '{}'",
                    account.label
                )));
            }
            let has_key_pair = account.access_key.is_some() && account.secret_key.is_some();
            if !has_key_pair && account.role_arn.is_none() {
                return Err(ConfigError::Invalid(format!(
                    "account '{}' needs either access_key/secret_key or role_arn (or {ROLE_ARN_ENV})",
                    account.label
                )));
            }
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.service.interval * 60)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.service.refresh_interval * 60)
    }

    pub fn account_configs(&self) -> Vec<AccountConfig> {
        self.accounts
            .iter()
            .map(|account| AccountConfig {
                label: account.label.clone(),
                access_key: account.access_key.clone(),
                secret_key: account.secret_key.clone(),
                role_arn: account.role_arn.clone(),
            })
            .collect()
    }
}
