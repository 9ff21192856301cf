// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Gateway configuration.
//!
//! Loaded from a TOML file, then overridden by command-line flags.

use homehub::{DispatchConfig, ForwardMode, StoreConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Listen address.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Listen port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// SQLite database file.
    #[serde(default = "default_database")]
    pub database: PathBuf,

    /// Shared secret devices present when registering.
    #[serde(default)]
    pub hub_code: String,

    /// Public prefix of the device routes, used in summary links.
    #[serde(default = "default_url_path")]
    pub url_path: String,

    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub dispatch: DispatchSettings,

    #[serde(default)]
    pub store: StoreSettings,
}

/// Outbound call settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchSettings {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_true")]
    pub retry_on_connect_failure: bool,

    /// Pause before the connect retry
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// `query` or `json`.
    #[serde(default)]
    pub mode: ForwardMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_database() -> PathBuf {
    PathBuf::from("homehub.db")
}

fn default_url_path() -> String {
    "/device".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_connect_timeout_ms() -> u64 {
    3_000
}

fn default_retry_delay_ms() -> u64 {
    250
}

fn default_true() -> bool {
    true
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            retry_on_connect_failure: true,
            retry_delay_ms: default_retry_delay_ms(),
            mode: ForwardMode::Query,
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            database: default_database(),
            hub_code: String::new(),
            url_path: default_url_path(),
            log_level: default_log_level(),
            dispatch: DispatchSettings::default(),
            store: StoreSettings::default(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from a TOML file.
    ///
    /// Not validated yet: flags may still fill in the hub code.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hub_code.trim().is_empty() {
            return Err(ConfigError::Invalid("hub_code must be set".into()));
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid("port must be non-zero".into()));
        }
        if self.dispatch.timeout_ms == 0 || self.dispatch.connect_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "dispatch timeouts must be non-zero".into(),
            ));
        }
        if !self.url_path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "url_path '{}' must start with '/'",
                self.url_path
            )));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::new(&self.database)
            .with_busy_timeout(Duration::from_millis(self.store.busy_timeout_ms))
    }

    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            timeout: Duration::from_millis(self.dispatch.timeout_ms),
            connect_timeout: Duration::from_millis(self.dispatch.connect_timeout_ms),
            retry_on_connect_failure: self.dispatch.retry_on_connect_failure,
            retry_delay: Duration::from_millis(self.dispatch.retry_delay_ms),
            mode: self.dispatch.mode,
        }
    }
}
