// Exec configuration
#![allow(dead_code)]

use crate::exec::error::ConfigError;
use crate::sink::DEFAULT_OUTPUT_LIMIT;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Exec configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecConfig {
    /// Per-stream output cap in bytes (default: 10240)
    pub output_limit_bytes: u64,
    /// Kill the process after this long; zero disables the deadline (default: 0)
    pub timeout: Duration,
    /// How long to keep draining output after the process is reaped (default: 1s)
    pub drain_grace: Duration,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            output_limit_bytes: DEFAULT_OUTPUT_LIMIT,
            timeout: Duration::ZERO,
            drain_grace: Duration::from_secs(1),
        }
    }
}

/// On-disk form, every key optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    output_limit_bytes: Option<u64>,
    timeout_ms: Option<u64>,
    drain_grace_ms: Option<u64>,
}

/// Parse an environment variable, logging a warning if the value is present but invalid.
fn parse_env_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(v) => match v.parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(var = name, value = %v, "Invalid env var value, using default");
                default
            }
        },
        Err(_) => default,
    }
}

/// `~/.sango/config.toml`
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .map(|p| p.join(".sango").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from(".sango/config.toml"))
}

impl ExecConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_output_limit(mut self, bytes: u64) -> Self {
        self.output_limit_bytes = bytes;
        self
    }

    /// Parse a TOML document on top of the defaults
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content)?;
        let mut config = Self::default();
        config.apply_file(file);
        Ok(config)
    }

    fn apply_file(&mut self, file: ConfigFile) {
        if let Some(bytes) = file.output_limit_bytes {
            self.output_limit_bytes = bytes;
        }
        if let Some(ms) = file.timeout_ms {
            self.timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = file.drain_grace_ms {
            self.drain_grace = Duration::from_millis(ms);
        }
    }

    /// Apply `SANGO_*` environment overrides
    pub fn apply_env(&mut self) {
        self.output_limit_bytes = parse_env_var("SANGO_OUTPUT_LIMIT_BYTES", self.output_limit_bytes);

        let timeout_ms = parse_env_var("SANGO_TIMEOUT_MS", self.timeout.as_millis() as u64);
        self.timeout = Duration::from_millis(timeout_ms);

        let grace_ms = parse_env_var("SANGO_DRAIN_GRACE_MS", self.drain_grace.as_millis() as u64);
        self.drain_grace = Duration::from_millis(grace_ms);
    }

    /// Load defaults, then the TOML file (if present), then the environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
        let mut config = Self::default();

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            config.apply_file(toml::from_str(&content)?);
            debug!(path = %path.display(), "loaded exec config file");
        } else {
            debug!(path = %path.display(), "config file not found, using defaults");
        }

        config.apply_env();
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExecConfig::default();
        assert_eq!(config.output_limit_bytes, 10240);
        assert!(config.timeout.is_zero());
    }

    #[test]
    fn test_from_toml_partial() {
        let config = ExecConfig::from_toml_str("timeout_ms = 1500\n").unwrap();
        assert_eq!(config.timeout, Duration::from_millis(1500));
        assert_eq!(config.output_limit_bytes, 10240);
    }

    #[test]
    fn test_from_toml_rejects_unknown_keys() {
        let err = ExecConfig::from_toml_str("timeout = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse(_)));
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        assert!(ExecConfig::load(Some(Path::new("/nonexistent/sango.toml"))).is_ok());
    }

    #[test]
    fn test_env_overrides_file() {
        // SAFETY: only this test sets SANGO_* variables; the one other test that
        // reads them through load() asserts nothing about their values
        unsafe {
            std::env::set_var("SANGO_TIMEOUT_MS", "250");
            std::env::set_var("SANGO_DRAIN_GRACE_MS", "soon");
        }

        let mut config = ExecConfig::from_toml_str("timeout_ms = 1500\ndrain_grace_ms = 300\n").unwrap();
        config.apply_env();

        unsafe {
            std::env::remove_var("SANGO_TIMEOUT_MS");
            std::env::remove_var("SANGO_DRAIN_GRACE_MS");
        }

        assert_eq!(config.timeout, Duration::from_millis(250));
        // Invalid value keeps what the file set
        assert_eq!(config.drain_grace, Duration::from_millis(300));
        assert_eq!(config.output_limit_bytes, 10240);
    }
}
