// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Suite configuration.
//!
//! Values are layered: built-in defaults, then an optional YAML file named by
//! `RAN_CONFIG_FILE`, then individual environment overrides.
//!
//! | Variable | Field |
//! |----------|-------|
//! | `RAN_HUB_KUBECONFIG` | `hub_kubeconfig` |
//! | `RAN_SPOKE1_KUBECONFIG` (falls back to `KUBECONFIG`) | `spoke1_kubeconfig` |
//! | `RAN_SPOKE2_KUBECONFIG` | `spoke2_kubeconfig` |
//! | `RAN_POLL_INTERVAL_SECS` | `poll_interval_secs` |
//! | `RAN_DEFAULT_TIMEOUT_SECS` | `default_timeout_secs` |
//! | `RAN_RETRY_ATTEMPTS` | `retry_attempts` |
//! | `RAN_RETRY_INTERVAL_SECS` | `retry_interval_secs` |

use crate::constants::{
    DEFAULT_POLL_INTERVAL_SECS, DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_INTERVAL_SECS,
    DEFAULT_WAIT_TIMEOUT_SECS, ENV_CONFIG_FILE, ENV_DEFAULT_TIMEOUT_SECS, ENV_HUB_KUBECONFIG,
    ENV_KUBECONFIG, ENV_POLL_INTERVAL_SECS, ENV_RETRY_ATTEMPTS, ENV_RETRY_INTERVAL_SECS,
    ENV_SPOKE1_KUBECONFIG, ENV_SPOKE2_KUBECONFIG,
};
use crate::errors::ConfigError;
use crate::poll::PollConfig;
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// Configuration shared by the RAN test suites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct RanConfig {
    /// Kubeconfig for the hub cluster, if the suite needs one
    pub hub_kubeconfig: Option<PathBuf>,
    /// Kubeconfig for the first spoke; `None` means the ambient client configuration
    pub spoke1_kubeconfig: Option<PathBuf>,
    /// Kubeconfig for the second spoke, if any
    pub spoke2_kubeconfig: Option<PathBuf>,
    pub poll_interval_secs: u64,
    pub default_timeout_secs: u64,
    pub retry_attempts: u32,
    pub retry_interval_secs: u64,
}

impl Default for RanConfig {
    fn default() -> Self {
        Self {
            hub_kubeconfig: None,
            spoke1_kubeconfig: None,
            spoke2_kubeconfig: None,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            default_timeout_secs: DEFAULT_WAIT_TIMEOUT_SECS,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_interval_secs: DEFAULT_RETRY_INTERVAL_SECS,
        }
    }
}

impl RanConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed, an override
    /// is malformed, or the result fails [`RanConfig::validate`].
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|var| std::env::var(var).ok())
    }

    /// Load configuration using `lookup` in place of the process environment.
    ///
    /// # Errors
    ///
    /// As [`RanConfig::load`].
    pub fn load_with<L>(lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(ENV_CONFIG_FILE).filter(|path| !path.is_empty()) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        config.apply_env(&lookup)?;
        config.validate()?;

        info!(
            hub = config.hub_kubeconfig.is_some(),
            spoke2 = config.spoke2_kubeconfig.is_some(),
            poll_interval_secs = config.poll_interval_secs,
            default_timeout_secs = config.default_timeout_secs,
            "Loaded suite configuration"
        );
        Ok(config)
    }

    /// Read a YAML configuration file. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Reading config file");

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Apply environment overrides on top of the current values.
    ///
    /// Empty variables are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] if a numeric override does not parse.
    pub fn apply_env<L>(&mut self, lookup: L) -> Result<(), ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|value| !value.is_empty());

        if let Some(path) = get(ENV_HUB_KUBECONFIG) {
            self.hub_kubeconfig = Some(PathBuf::from(path));
        }
        if let Some(path) = get(ENV_SPOKE1_KUBECONFIG).or_else(|| get(ENV_KUBECONFIG)) {
            self.spoke1_kubeconfig = Some(PathBuf::from(path));
        }
        if let Some(path) = get(ENV_SPOKE2_KUBECONFIG) {
            self.spoke2_kubeconfig = Some(PathBuf::from(path));
        }

        if let Some(value) = parse_env(&get, ENV_POLL_INTERVAL_SECS)? {
            self.poll_interval_secs = value;
        }
        if let Some(value) = parse_env(&get, ENV_DEFAULT_TIMEOUT_SECS)? {
            self.default_timeout_secs = value;
        }
        if let Some(value) = parse_env(&get, ENV_RETRY_ATTEMPTS)? {
            self.retry_attempts = value;
        }
        if let Some(value) = parse_env(&get, ENV_RETRY_INTERVAL_SECS)? {
            self.retry_interval_secs = value;
        }
        Ok(())
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero poll interval or zero retry attempts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "pollIntervalSecs must be greater than zero".to_string(),
            ));
        }
        if self.retry_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retryAttempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Poll settings for a wait using the configured default timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the poll interval is zero.
    pub fn poll_config(&self) -> Result<PollConfig, ConfigError> {
        PollConfig::new(
            Duration::from_secs(self.poll_interval_secs),
            Duration::from_secs(self.default_timeout_secs),
        )
    }

    /// Retry policy for operations that fail on infrastructure noise.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if retry attempts is zero.
    pub fn retry_policy(&self) -> Result<RetryPolicy, ConfigError> {
        RetryPolicy::new(
            self.retry_attempts,
            Duration::from_secs(self.retry_interval_secs),
        )
    }
}

fn parse_env<T, L>(lookup: L, var: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    L: Fn(&str) -> Option<String>,
{
    lookup(var)
        .map(|value| {
            value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: var.to_string(),
                value,
            })
        })
        .transpose()
}
