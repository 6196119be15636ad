//! # Service Configuration
//!
//! Everything the API reads from the environment, resolved once at startup.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `PORT` | `8080` | Listen port |
//! | `ZATCA_LOG_FORMAT` | `text` | `text` or `json` log lines |
//! | `ZATCA_GENESIS_PIH` | ZATCA constant | Previous hash for a seller's first invoice |
//! | `ZATCA_SDK_BIN` | unset | Compliance backend executable; unset disables the pipeline |
//!
//! The backend variables (`ZATCA_SDK_CONFIG`, `ZATCA_SDK_WORKDIR`,
//! `ZATCA_SDK_TIMEOUT_SECS`) are parsed by
//! [`zatca_pipeline::BackendConfig::from_lookup`].

use thiserror::Error;
use zatca_core::digest::is_base64;
use zatca_core::GENESIS_PREVIOUS_HASH;
use zatca_pipeline::BackendConfig;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 8080;

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::InvalidLogFormat(other.to_string())),
        }
    }
}

/// Errors raised while reading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// `PORT` is not a valid port number.
    #[error("PORT must be a port number, got \"{0}\"")]
    InvalidPort(String),

    /// `ZATCA_LOG_FORMAT` is neither `text` nor `json`.
    #[error("ZATCA_LOG_FORMAT must be \"text\" or \"json\", got \"{0}\"")]
    InvalidLogFormat(String),

    /// `ZATCA_GENESIS_PIH` is not Base64.
    #[error("ZATCA_GENESIS_PIH must be Base64, got \"{0}\"")]
    InvalidGenesisHash(String),

    /// The backend settings are inconsistent.
    #[error(transparent)]
    Backend(#[from] zatca_pipeline::ConfigError),
}

/// Resolved service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Listen port.
    pub port: u16,
    /// Log line format.
    pub log_format: LogFormat,
    /// Previous-invoice hash used for a seller's first invoice.
    pub genesis_hash: String,
    /// Compliance backend, when one is configured.
    pub backend: Option<BackendConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            log_format: LogFormat::Text,
            genesis_hash: GENESIS_PREVIOUS_HASH.to_string(),
            backend: None,
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(port) = lookup("PORT").filter(|v| !v.trim().is_empty()) {
            config.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(port.clone()))?;
        }
        if let Some(format) = lookup("ZATCA_LOG_FORMAT").filter(|v| !v.trim().is_empty()) {
            config.log_format = format.parse()?;
        }
        if let Some(genesis) = lookup("ZATCA_GENESIS_PIH").filter(|v| !v.trim().is_empty()) {
            let genesis = genesis.trim().to_string();
            if !is_base64(&genesis) {
                return Err(ConfigError::InvalidGenesisHash(genesis));
            }
            config.genesis_hash = genesis;
        }
        config.backend = BackendConfig::from_lookup(&lookup)?;

        Ok(config)
    }
}
