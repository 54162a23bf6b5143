//! Configuration system for AsyncE clients.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $ASYNCE_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/asynce/config.toml
//!   3. ~/.config/asynce/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::chunk::CHUNK_SIZE;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AsynceConfig {
    pub backend: BackendConfig,
    pub identity: IdentityConfig,
    pub transfer: TransferConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the remote-call gateway.
    pub url: String,
    /// Realtime socket endpoint.
    pub gateway_url: String,
    /// Per-request timeout of the HTTP transport. 0 = none.
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Principal handed out by the identity provider. Empty = anonymous.
    pub principal: String,
    /// Bearer token for the remote-call gateway and the socket.
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Bytes per chunk. Must not exceed what the backend accepts per call.
    pub chunk_size: usize,
    /// Max chunk queries in flight per download. 0 = unlimited.
    pub max_in_flight: usize,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:4943".to_string(),
            gateway_url: "ws://127.0.0.1:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            max_in_flight: 0,
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("asynce")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
    #[error("invalid value for {0}: {1:?}")]
    InvalidValue(&'static str, String),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl AsynceConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            AsynceConfig::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("ASYNCE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&AsynceConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply ASYNCE_* overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("ASYNCE_BACKEND__URL") {
            self.backend.url = v;
        }
        if let Some(v) = lookup("ASYNCE_BACKEND__GATEWAY_URL") {
            self.backend.gateway_url = v;
        }
        if let Some(v) = lookup("ASYNCE_BACKEND__REQUEST_TIMEOUT_SECS") {
            self.backend.request_timeout_secs = parse("ASYNCE_BACKEND__REQUEST_TIMEOUT_SECS", v)?;
        }
        if let Some(v) = lookup("ASYNCE_IDENTITY__PRINCIPAL") {
            self.identity.principal = v;
        }
        if let Some(v) = lookup("ASYNCE_IDENTITY__TOKEN") {
            self.identity.token = v;
        }
        if let Some(v) = lookup("ASYNCE_TRANSFER__CHUNK_SIZE") {
            self.transfer.chunk_size = parse("ASYNCE_TRANSFER__CHUNK_SIZE", v)?;
        }
        if let Some(v) = lookup("ASYNCE_TRANSFER__MAX_IN_FLIGHT") {
            self.transfer.max_in_flight = parse("ASYNCE_TRANSFER__MAX_IN_FLIGHT", v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.transfer.chunk_size == 0 {
            return Err(ConfigError::InvalidValue("transfer.chunk_size", "0".into()));
        }
        Ok(())
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, v: String) -> Result<T, ConfigError> {
    v.trim().parse().map_err(|_| ConfigError::InvalidValue(key, v))
}
