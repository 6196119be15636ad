//! Signing backend configuration.
//!
//! Read from the environment. An unset `ZATCA_SDK_BIN` means no backend is
//! configured; that is not an error, the API reports 503 for the stages
//! that need one.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// Per-stage timeout used when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Where and how to launch the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// Backend executable.
    pub binary: PathBuf,
    /// Backend configuration file, exported to the child as `SDK_CONFIG`.
    pub config_file: Option<PathBuf>,
    /// Child working directory; also where temporary invoice files go.
    pub work_dir: Option<PathBuf>,
    /// Per-stage timeout.
    pub timeout: Duration,
}

impl BackendConfig {
    /// Configuration for `binary` with defaults for everything else.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            config_file: None,
            work_dir: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Set the config file.
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Set the working directory.
    pub fn with_work_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(path.into());
        self
    }

    /// Set the per-stage timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `ZATCA_SDK_BIN` (unset: returns `Ok(None)`)
    /// - `ZATCA_SDK_CONFIG` (optional, must exist)
    /// - `ZATCA_SDK_WORKDIR` (optional, must be a directory)
    /// - `ZATCA_SDK_TIMEOUT_SECS` (default: 60)
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Option<Self>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some(binary) = non_empty(lookup("ZATCA_SDK_BIN")) else {
            return Ok(None);
        };
        let mut config = Self::new(binary);

        if let Some(raw) = non_empty(lookup("ZATCA_SDK_TIMEOUT_SECS")) {
            let secs: u64 = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidTimeout(raw.clone()))?;
            if secs == 0 {
                return Err(ConfigError::ZeroTimeout);
            }
            config.timeout = Duration::from_secs(secs);
        }

        if let Some(path) = non_empty(lookup("ZATCA_SDK_CONFIG")) {
            let path = PathBuf::from(path);
            if !path.is_file() {
                return Err(ConfigError::MissingConfigFile(path));
            }
            config.config_file = Some(path);
        }

        if let Some(dir) = non_empty(lookup("ZATCA_SDK_WORKDIR")) {
            let dir = PathBuf::from(dir);
            if !Path::new(&dir).is_dir() {
                return Err(ConfigError::MissingWorkDir(dir));
            }
            config.work_dir = Some(dir);
        }

        Ok(Some(config))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn unset_binary_means_no_backend() {
        assert_eq!(BackendConfig::from_lookup(lookup(&[])).unwrap(), None);
        assert_eq!(
            BackendConfig::from_lookup(lookup(&[("ZATCA_SDK_BIN", "  ")])).unwrap(),
            None
        );
    }

    #[test]
    fn defaults_to_sixty_seconds() {
        let config = BackendConfig::from_lookup(lookup(&[("ZATCA_SDK_BIN", "/opt/sdk/fatoora")]))
            .unwrap()
            .unwrap();
        assert_eq!(config.binary, PathBuf::from("/opt/sdk/fatoora"));
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert!(config.config_file.is_none());
    }

    #[test]
    fn timeout_must_be_positive_integer() {
        let err = BackendConfig::from_lookup(lookup(&[
            ("ZATCA_SDK_BIN", "fatoora"),
            ("ZATCA_SDK_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::InvalidTimeout("soon".into()));

        let err = BackendConfig::from_lookup(lookup(&[
            ("ZATCA_SDK_BIN", "fatoora"),
            ("ZATCA_SDK_TIMEOUT_SECS", "0"),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::ZeroTimeout);

        let config = BackendConfig::from_lookup(lookup(&[
            ("ZATCA_SDK_BIN", "fatoora"),
            ("ZATCA_SDK_TIMEOUT_SECS", "5"),
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn config_file_must_exist() {
        let err = BackendConfig::from_lookup(lookup(&[
            ("ZATCA_SDK_BIN", "fatoora"),
            ("ZATCA_SDK_CONFIG", "/nonexistent/zatca/config.json"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingConfigFile(_)));
    }

    #[test]
    fn work_dir_must_be_directory() {
        let dir = std::env::temp_dir();
        let config = BackendConfig::from_lookup(lookup(&[
            ("ZATCA_SDK_BIN", "fatoora"),
            ("ZATCA_SDK_WORKDIR", dir.to_str().unwrap()),
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(config.work_dir, Some(dir));

        let err = BackendConfig::from_lookup(lookup(&[
            ("ZATCA_SDK_BIN", "fatoora"),
            ("ZATCA_SDK_WORKDIR", "/nonexistent/zatca"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingWorkDir(_)));
    }
}
