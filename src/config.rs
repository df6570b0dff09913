//! Client configuration
//!
//! Resolved from built-in defaults, then an optional JSON document, then
//! `TOUCHPRINT_*` environment variables.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::error::TouchprintError;

const STORE_ADDR_ENV: &str = "TOUCHPRINT_STORE_ADDR";
const AUTH_ADDR_ENV: &str = "TOUCHPRINT_AUTH_ADDR";
const AUTH_PATH_ENV: &str = "TOUCHPRINT_AUTH_PATH";
const TIMEOUT_ENV: &str = "TOUCHPRINT_TIMEOUT_MS";

/// Percentile reported as `pairwiseVeloPercent` unless configured otherwise
pub const DEFAULT_VELOCITY_PERCENTILE: f64 = 50.0;

/// Connection settings for the store/matcher and feature extraction knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// `host:port` of the raw-socket feature store (FSTORE / FCOUNT)
    pub store_addr: String,
    /// `host:port` of the HTTP authentication endpoint
    pub auth_addr: String,
    /// Path prefix for authentication; the user id is appended as the last segment
    pub auth_path: String,
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
    pub write_timeout_ms: u64,
    /// Percentile (0-100) of the pairwise velocity series
    pub velocity_percentile: f64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            store_addr: "127.0.0.1:5000".to_string(),
            auth_addr: "127.0.0.1:8080".to_string(),
            auth_path: "/authenticate".to_string(),
            connect_timeout_ms: 5_000,
            read_timeout_ms: 10_000,
            write_timeout_ms: 10_000,
            velocity_percentile: DEFAULT_VELOCITY_PERCENTILE,
        }
    }
}

impl ClientConfig {
    /// Parse a (possibly partial) JSON config; missing keys keep their defaults
    pub fn from_json(json: &str) -> Result<Self, TouchprintError> {
        let config: ClientConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with environment variables
    pub fn from_env() -> Result<Self, TouchprintError> {
        Self::default().with_env_overrides()
    }

    /// Apply `TOUCHPRINT_*` environment overrides on top of this config
    pub fn with_env_overrides(mut self) -> Result<Self, TouchprintError> {
        if let Ok(addr) = env::var(STORE_ADDR_ENV) {
            self.store_addr = addr;
        }
        if let Ok(addr) = env::var(AUTH_ADDR_ENV) {
            self.auth_addr = addr;
        }
        if let Ok(path) = env::var(AUTH_PATH_ENV) {
            self.auth_path = path;
        }
        if let Ok(raw) = env::var(TIMEOUT_ENV) {
            let ms: u64 = raw.trim().parse().map_err(|_| {
                TouchprintError::ConfigError(format!(
                    "{TIMEOUT_ENV} must be an integer, got {raw:?}"
                ))
            })?;
            self.connect_timeout_ms = ms;
            self.read_timeout_ms = ms;
            self.write_timeout_ms = ms;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), TouchprintError> {
        if self.store_addr.trim().is_empty() {
            return Err(TouchprintError::ConfigError("store_addr is empty".to_string()));
        }
        if self.auth_addr.trim().is_empty() {
            return Err(TouchprintError::ConfigError("auth_addr is empty".to_string()));
        }
        if !self.auth_path.starts_with('/') {
            return Err(TouchprintError::ConfigError(format!(
                "auth_path must start with '/', got {:?}",
                self.auth_path
            )));
        }
        if !(0.0..=100.0).contains(&self.velocity_percentile) {
            return Err(TouchprintError::ConfigError(format!(
                "velocity_percentile must be within 0-100, got {}",
                self.velocity_percentile
            )));
        }
        if self.connect_timeout_ms == 0 || self.read_timeout_ms == 0 || self.write_timeout_ms == 0 {
            return Err(TouchprintError::ConfigError(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}
