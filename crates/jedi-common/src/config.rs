//! Configuration loading
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! environment variables such as `JEDI_LOGGING__LEVEL=debug`.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::logging::LogLevel;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct JediConfig {
    pub logging: LoggingConfig,
    pub resolver: ResolverSettings,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Maximum level: trace, debug, info, warn or error
    pub level: String,
    /// Include the event target in formatted output
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            with_target: false,
        }
    }
}

/// Resolver behaviour
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ResolverSettings {
    /// Resolve every registered type when the container is built
    pub validate_on_startup: bool,
}

/// Loads, validates and saves [`JediConfig`]
pub struct ConfigLoader {
    /// Configuration file path
    config_path: PathBuf,
    /// Environment prefix
    env_prefix: String,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
            env_prefix: "JEDI".to_string(),
        }
    }

    /// Create with custom config path
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            env_prefix: "JEDI".to_string(),
        }
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// `<config dir>/jedi/config.toml`
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("jedi")
            .join("config.toml")
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Load the file (if present) and the environment, then validate
    pub fn load(&self) -> Result<JediConfig> {
        let builder = Config::builder()
            .add_source(File::from(self.config_path.clone()).required(false))
            .add_source(
                Environment::with_prefix(&self.env_prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        let jedi_config: JediConfig = config.try_deserialize()?;
        self.validate(&jedi_config)?;
        Ok(jedi_config)
    }

    pub fn validate(&self, config: &JediConfig) -> Result<()> {
        if LogLevel::from_str(&config.logging.level).is_none() {
            return Err(ConfigError::Validation(format!(
                "Unknown log level '{}'; expected trace, debug, info, warn or error",
                config.logging.level
            )));
        }
        Ok(())
    }

    /// Write `config` as TOML, creating parent directories
    pub fn save(&self, config: &JediConfig) -> Result<()> {
        let toml = toml::to_string_pretty(config)?;
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.config_path, toml)?;
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = JediConfig::default();
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.with_target);
        assert!(!config.resolver.validate_on_startup);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_path(dir.path().join("absent.toml")).with_env_prefix("JEDI_TEST_MISSING");
        assert_eq!(loader.load().unwrap(), JediConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_path(dir.path().join("nested").join("config.toml"))
            .with_env_prefix("JEDI_TEST_SAVE");

        let mut config = JediConfig::default();
        config.logging.level = "debug".to_string();
        config.resolver.validate_on_startup = true;
        loader.save(&config).unwrap();

        assert!(loader.path().exists());
        assert_eq!(loader.load().unwrap(), config);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[resolver]\nvalidate_on_startup = true\n").unwrap();

        let config = ConfigLoader::with_path(path).with_env_prefix("JEDI_TEST_PARTIAL").load().unwrap();
        assert!(config.resolver.validate_on_startup);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_invalid_level_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[logging]\nlevel = \"loud\"\n").unwrap();

        let err = ConfigLoader::with_path(path).with_env_prefix("JEDI_TEST_INVALID").load().unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("loud"));
    }

    #[test]
    fn test_environment_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[logging]\nlevel = \"warn\"\n").unwrap();

        std::env::set_var("JEDI_TEST_ENV_LOGGING__LEVEL", "trace");
        let config = ConfigLoader::with_path(path).with_env_prefix("JEDI_TEST_ENV").load();
        std::env::remove_var("JEDI_TEST_ENV_LOGGING__LEVEL");

        assert_eq!(config.unwrap().logging.level, "trace");
    }

    #[test]
    fn test_malformed_file_is_load_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[logging\nlevel = ").unwrap();

        let err = ConfigLoader::with_path(path).with_env_prefix("JEDI_TEST_MALFORMED").load().unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }
}
