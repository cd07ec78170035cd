//! TrackerConfig - `vks.toml` による設定
//!
//! # 学習ポイント
//! - `#[serde(default)]` で省略されたキーにデフォルト値を入れる
//! - 読み込み直後に検証し、不正な値は起動時に弾く（Fail-fast）

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default unit-of-work deadline in milliseconds.
pub const DEFAULT_UNIT_OF_WORK_TIMEOUT_MS: u64 = 5000;

/// Tracker configuration.
///
/// # Example
///
/// ```toml
/// # Deadline of one unit of work (append, typed-enum write, document write)
/// unit_of_work_timeout_ms = 5000
///
/// [logging]
/// # Used when RUST_LOG is not set
/// level = "info"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub unit_of_work_timeout_ms: u64,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `"info"` or `"vks_core=debug"`.
    pub level: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            unit_of_work_timeout_ms: DEFAULT_UNIT_OF_WORK_TIMEOUT_MS,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// ConfigError は設定読み込み時のエラー
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unit_of_work_timeout_ms must be greater than zero")]
    ZeroTimeout,
}

impl TrackerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.unit_of_work_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    pub fn unit_of_work_timeout(&self) -> Duration {
        Duration::from_millis(self.unit_of_work_timeout_ms)
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# vks configuration
#
# Deadline of one unit of work in milliseconds (default: 5000).
# A timed-out operation leaves no partial history behind.
unit_of_work_timeout_ms = 5000

[logging]
# Filter used when RUST_LOG is not set (default: "info")
level = "info"
"#
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn empty_file_uses_defaults() {
        let config = TrackerConfig::from_toml_str("").unwrap();
        assert_eq!(config, TrackerConfig::default());
        assert_eq!(config.unit_of_work_timeout(), Duration::from_secs(5));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn default_toml_parses_to_default() {
        let config = TrackerConfig::from_toml_str(TrackerConfig::default_toml()).unwrap();
        assert_eq!(config, TrackerConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = TrackerConfig::from_toml_str("[logging]\nlevel = \"vks_core=debug\"\n").unwrap();
        assert_eq!(config.logging.level, "vks_core=debug");
        assert_eq!(config.unit_of_work_timeout_ms, DEFAULT_UNIT_OF_WORK_TIMEOUT_MS);
    }

    #[rstest]
    #[case::zero("unit_of_work_timeout_ms = 0")]
    #[case::wrong_type("unit_of_work_timeout_ms = \"fast\"")]
    #[case::broken("unit_of_work_timeout_ms = ")]
    fn invalid_files_are_rejected(#[case] text: &str) {
        assert!(TrackerConfig::from_toml_str(text).is_err());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = TrackerConfig::load("/definitely/not/here/vks.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/definitely/not/here/vks.toml"));
    }
}
