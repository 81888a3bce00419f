// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::core::backoff::BackoffPolicy;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 6333;
pub const DEFAULT_DIMENSION: usize = 768;
pub const DEFAULT_TIMEOUT_SECS: u64 = 14400;
pub const DEFAULT_SNAPSHOT_ROOT: &str = "/qdrant/snapshots";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },

    #[error("Configuration error: {0}")]
    Invalid(String),
}

/// Connection settings for the remote vector store.
#[derive(Clone, PartialEq)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub https: bool,
    pub api_key: Option<String>,
    /// Transport timeout applied to every request.
    pub timeout: Duration,
    pub default_dimension: usize,
    /// Directory on the store host holding per-collection snapshot files.
    pub snapshot_root: String,
    pub backoff: BackoffPolicy,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("https", &self.https)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("default_dimension", &self.default_dimension)
            .field("snapshot_root", &self.snapshot_root)
            .field("backoff", &self.backoff)
            .finish()
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            https: false,
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            default_dimension: DEFAULT_DIMENSION,
            snapshot_root: DEFAULT_SNAPSHOT_ROOT.to_string(),
            backoff: BackoffPolicy::default(),
        }
    }
}

impl StoreConfig {
    pub fn base_url(&self) -> String {
        let scheme = if self.https { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    /// Location the store restores `snapshot` of `collection` from.
    pub fn snapshot_location(&self, collection: &str, snapshot: &str) -> String {
        format!(
            "file://{}/{}/{}",
            self.snapshot_root.trim_end_matches('/'),
            collection,
            snapshot
        )
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self::from_lookup(|name| env::var(name).ok())?;
        config.log_summary();
        Ok(config)
    }

    /// Builds a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let host = lookup("QDRANT_HOST")
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .unwrap_or(defaults.host);
        if host.contains("://") {
            return Err(ConfigError::Invalid(
                "QDRANT_HOST must be a bare host name; use QDRANT_HTTPS for the scheme".to_string(),
            ));
        }

        let port = parse_var(&lookup, "QDRANT_PORT")?.unwrap_or(defaults.port);
        let https = match lookup("QDRANT_HTTPS") {
            Some(value) => parse_flag("QDRANT_HTTPS", &value)?,
            None => defaults.https,
        };
        let api_key = lookup("QDRANT_ACCESS_KEY").filter(|k| !k.is_empty());

        let default_dimension: usize =
            parse_var(&lookup, "QDRANT_VECTOR_DIMENSION")?.unwrap_or(defaults.default_dimension);
        if default_dimension == 0 {
            return Err(ConfigError::InvalidValue {
                name: "QDRANT_VECTOR_DIMENSION".to_string(),
                value: "0".to_string(),
            });
        }

        let timeout = parse_var::<u64, _>(&lookup, "QDRANT_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);
        let snapshot_root = lookup("QDRANT_SNAPSHOT_ROOT").unwrap_or(defaults.snapshot_root);

        let mut backoff = defaults.backoff;
        backoff.max_attempts = parse_var(&lookup, "QDRANT_RETRY_LIMIT")?;
        if let Some(max) = parse_var::<u64, _>(&lookup, "QDRANT_BACKOFF_MAX_SECS")? {
            backoff.max = Duration::from_secs(max);
        }

        Ok(Self {
            host,
            port,
            https,
            api_key,
            timeout,
            default_dimension,
            snapshot_root,
            backoff,
        })
    }

    fn log_summary(&self) {
        info!(
            url = %self.base_url(),
            api_key = if self.api_key.is_some() { "configured" } else { "not configured" },
            dimension = self.default_dimension,
            retry_limit = ?self.backoff.max_attempts,
            "Vector store configuration loaded"
        );
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                name: name.to_string(),
                value,
            }),
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}
