//! Application configuration.
//!
//! Loaded from YAML, then overridden from the environment:
//!
//! - `WEBDISPATCH_TICKET_KEY`: hex-encoded AES key (16, 24 or 32 bytes)
//! - `WEBDISPATCH_TICKET_EXPIRY_MINUTES`: default ticket lifetime
//! - `WEBDISPATCH_TICKET_MODE`: `key-derived-iv` or `random-iv`
//! - `WEBDISPATCH_BCRYPT_COST`: bcrypt work factor
//!
//! ```yaml
//! log_level: debug
//! ticket:
//!   key: 000102030405060708090a0b0c0d0e0f
//!   expiry_minutes: 60
//!   mode: random-iv
//! ```

use std::env;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::auth::{TicketConfig, TicketMode, DEFAULT_BCRYPT_COST, DEFAULT_EXPIRY_MINUTES};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no ticket key configured (set ticket.key or WEBDISPATCH_TICKET_KEY)")]
    MissingTicketKey,

    #[error("invalid ticket key: {0}")]
    InvalidKey(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TicketSettings {
    /// Hex-encoded key
    pub key: Option<String>,
    pub expiry_minutes: i64,
    pub mode: TicketMode,
    pub bcrypt_cost: u32,
    /// Dedicated ticket header, in addition to `Authorization`
    pub header: Option<String>,
}

impl Default for TicketSettings {
    fn default() -> Self {
        Self {
            key: None,
            expiry_minutes: DEFAULT_EXPIRY_MINUTES,
            mode: TicketMode::default(),
            bcrypt_cost: DEFAULT_BCRYPT_COST,
            header: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ticket: TicketSettings,
    /// Overrides `WEBDISPATCH_LOG_LEVEL` when set
    pub log_level: Option<String>,
}

impl AppConfig {
    /// # Errors
    ///
    /// Unreadable file or invalid YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// # Errors
    ///
    /// Invalid YAML or fields of the wrong type.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).context("Invalid configuration")
    }

    /// Apply `WEBDISPATCH_*` overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| env::var(name).ok());
    }

    /// Apply overrides from `lookup`. An unparseable value is logged and the
    /// previous setting kept.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("WEBDISPATCH_TICKET_KEY") {
            self.ticket.key = Some(key.trim().to_string());
        }
        if let Some(raw) = lookup("WEBDISPATCH_TICKET_EXPIRY_MINUTES") {
            match raw.trim().parse::<i64>() {
                Ok(minutes) if minutes > 0 => self.ticket.expiry_minutes = minutes,
                _ => warn!(value = %raw, "Ignoring invalid WEBDISPATCH_TICKET_EXPIRY_MINUTES"),
            }
        }
        if let Some(raw) = lookup("WEBDISPATCH_TICKET_MODE") {
            match raw.trim().to_ascii_lowercase().as_str() {
                "key-derived-iv" => self.ticket.mode = TicketMode::KeyDerivedIv,
                "random-iv" => self.ticket.mode = TicketMode::RandomIv,
                _ => warn!(value = %raw, "Ignoring invalid WEBDISPATCH_TICKET_MODE"),
            }
        }
        if let Some(raw) = lookup("WEBDISPATCH_BCRYPT_COST") {
            match raw.trim().parse::<u32>() {
                Ok(cost) => self.ticket.bcrypt_cost = cost,
                Err(_) => warn!(value = %raw, "Ignoring invalid WEBDISPATCH_BCRYPT_COST"),
            }
        }
    }

    /// Emit the `Configuration loaded` summary. Call once a subscriber is
    /// installed.
    pub fn log_loaded(&self, path: Option<&Path>) {
        info!(
            config_file = ?path,
            ticket_mode = ?self.ticket.mode,
            expiry_minutes = self.ticket.expiry_minutes,
            key_configured = self.ticket.key.is_some(),
            "Configuration loaded"
        );
    }

    /// Codec settings with the key decoded.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingTicketKey`] without a key and
    /// [`ConfigError::InvalidKey`] for non-hex keys or keys of the wrong length.
    pub fn ticket_config(&self) -> Result<TicketConfig, ConfigError> {
        let hex_key = self
            .ticket
            .key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingTicketKey)?;
        let key = hex::decode(hex_key).map_err(|e| ConfigError::InvalidKey(e.to_string()))?;
        if !matches!(key.len(), 16 | 24 | 32) {
            return Err(ConfigError::InvalidKey(format!(
                "expected 16, 24 or 32 bytes, got {}",
                key.len()
            )));
        }

        let mut config = TicketConfig::new(key)
            .with_mode(self.ticket.mode)
            .with_expiry_minutes(self.ticket.expiry_minutes)
            .with_bcrypt_cost(self.ticket.bcrypt_cost);
        if let Some(header) = &self.ticket.header {
            config = config.with_header(header.clone());
        }
        Ok(config)
    }
}

/// Load `path` when given (defaults otherwise) and apply environment overrides.
///
/// # Errors
///
/// See [`AppConfig::from_file`].
pub fn load(path: Option<&Path>) -> Result<AppConfig> {
    let mut config = match path {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    config.apply_env();
    config.log_loaded(path);
    Ok(config)
}
