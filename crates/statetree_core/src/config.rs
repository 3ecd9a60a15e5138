//! Host configuration for the core: logging and storage locations.

use crate::logging::{default_log_level, normalize_level, LogConfig};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid config json: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Core settings, usually read from a JSON file next to the host binary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
    /// SQLite file; `None` keeps documents in memory.
    pub database_path: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level().to_string(),
            log_dir: None,
            database_path: None,
        }
    }
}

impl CoreConfig {
    /// Parses and checks a JSON config; missing keys take their defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        normalize_level(&config.log_level).map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            level: self.log_level.clone(),
            log_dir: self.log_dir.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig};
    use std::path::PathBuf;

    #[test]
    fn missing_keys_take_defaults() {
        let config = CoreConfig::from_json_str("{}").expect("empty object parses");
        assert_eq!(config, CoreConfig::default());
        assert!(config.log_config().log_dir.is_none());
    }

    #[test]
    fn parses_all_fields() {
        let config = CoreConfig::from_json_str(
            r#"{"log_level": "warn", "log_dir": "/var/log/st", "database_path": "/tmp/st.db"}"#,
        )
        .expect("parses");
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/st.db")));
        assert_eq!(
            config.log_config().log_dir,
            Some(PathBuf::from("/var/log/st"))
        );
    }

    #[test]
    fn rejects_unknown_keys_and_levels() {
        assert!(matches!(
            CoreConfig::from_json_str(r#"{"colour": true}"#),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            CoreConfig::from_json_str(r#"{"log_level": "loud"}"#),
            Err(ConfigError::Invalid(_))
        ));
    }
}
