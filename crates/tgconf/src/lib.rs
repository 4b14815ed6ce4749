//! Configuration loading for telegram-mcp.
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/telegram-mcp/config.toml` (system)
//! 2. `~/.config/telegram-mcp/config.toml` (user)
//! 3. `./telegram-mcp.toml` or the `--config` path (local override)
//! 4. Environment variables (`API_ID`, `API_HASH`, `TELEGRAM_*`, `TELEGRAM_MCP_*`)
//!
//! # Example Config
//!
//! ```toml
//! [telegram]
//! api_id = 123456
//! api_hash = "0123456789abcdef0123456789abcdef"
//! session_path = "~/.local/share/telegram-mcp/session"
//!
//! [telemetry]
//! otlp_endpoint = "127.0.0.1:4317"
//! log_level = "info"
//!
//! [wait]
//! default_timeout_secs = 60
//! max_timeout_secs = 300
//! ```

pub mod loader;
pub mod settings;

pub use loader::{discover_config_files_with_override, expand_path, ConfigSources};
pub use settings::{TelegramConfig, TelemetryConfig, WaitConfig, MAX_WAIT_TIMEOUT_SECS};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: String, message: String },

    #[error("Missing required setting {0} (set it in config.toml or the environment)")]
    Missing(&'static str),
}

/// Complete telegram-mcp configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TgConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub wait: WaitConfig,
}

impl TgConfig {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration from a specific file path, then apply env overrides.
    ///
    /// If `config_path` is provided, it takes precedence over the local
    /// `./telegram-mcp.toml` override. System and user configs still load first.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration from optional path and return information about sources.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = TgConfig::default();

        for path in loader::discover_config_files_with_override(config_path) {
            loader::load_file_into(&mut config, &path)?;
            sources.files.push(path);
        }

        loader::apply_env_overrides(&mut config, &mut sources)?;

        Ok((config, sources))
    }

    /// Check that the settings needed to talk to Telegram are present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.telegram.api_id == 0 {
            return Err(ConfigError::Missing("telegram.api_id (API_ID)"));
        }
        if self.telegram.api_hash.trim().is_empty() {
            return Err(ConfigError::Missing("telegram.api_hash (API_HASH)"));
        }
        if !(1..=MAX_WAIT_TIMEOUT_SECS).contains(&self.wait.max_timeout_secs) {
            return Err(ConfigError::Invalid {
                key: "wait.max_timeout_secs".to_string(),
                message: format!("must be between 1 and {}", MAX_WAIT_TIMEOUT_SECS),
            });
        }
        Ok(())
    }

    /// Serialize config to TOML string. The API hash is redacted.
    pub fn to_toml(&self) -> String {
        let mut output = String::new();

        output.push_str("# telegram-mcp Configuration\n\n");

        output.push_str("[telegram]\n");
        output.push_str(&format!("api_id = {}\n", self.telegram.api_id));
        let hash = if self.telegram.api_hash.is_empty() {
            ""
        } else {
            "<redacted>"
        };
        output.push_str(&format!("api_hash = \"{}\"\n", hash));
        output.push_str(&format!(
            "session_path = \"{}\"\n",
            self.telegram.session_path.display()
        ));
        if let Some(ref phone) = self.telegram.phone {
            output.push_str(&format!("phone = \"{}\"\n", phone));
        }

        output.push_str("\n[telemetry]\n");
        if let Some(ref endpoint) = self.telemetry.otlp_endpoint {
            output.push_str(&format!("otlp_endpoint = \"{}\"\n", endpoint));
        }
        output.push_str(&format!("log_level = \"{}\"\n", self.telemetry.log_level));

        output.push_str("\n[wait]\n");
        output.push_str(&format!(
            "default_timeout_secs = {}\n",
            self.wait.default_timeout_secs
        ));
        output.push_str(&format!(
            "max_timeout_secs = {}\n",
            self.wait.max_timeout_secs
        ));

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TgConfig::default();
        assert_eq!(config.telegram.session_path, PathBuf::from("bot-data/session"));
        assert_eq!(config.wait.default_timeout_secs, 60);
        assert_eq!(config.wait.max_timeout_secs, 300);
        assert!(config.telemetry.otlp_endpoint.is_none());
    }

    #[test]
    fn test_validate_requires_credentials() {
        let mut config = TgConfig::default();
        assert!(matches!(config.validate(), Err(ConfigError::Missing(_))));

        config.telegram.api_id = 42;
        assert!(matches!(config.validate(), Err(ConfigError::Missing(_))));

        config.telegram.api_hash = "abc".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_wait_above_ceiling() {
        let mut config = TgConfig::default();
        config.telegram.api_id = 42;
        config.telegram.api_hash = "abc".to_string();

        config.wait.max_timeout_secs = 10_000;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { ref key, .. }) if key == "wait.max_timeout_secs"
        ));

        config.wait.max_timeout_secs = MAX_WAIT_TIMEOUT_SECS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_to_toml_redacts_hash() {
        let mut config = TgConfig::default();
        config.telegram.api_id = 42;
        config.telegram.api_hash = "supersecret".to_string();
        let toml = config.to_toml();
        assert!(toml.contains("[telegram]"));
        assert!(toml.contains("[wait]"));
        assert!(toml.contains("api_id = 42"));
        assert!(toml.contains("<redacted>"));
        assert!(!toml.contains("supersecret"));
    }

    #[test]
    fn test_to_toml_parses_back() {
        let mut config = TgConfig::default();
        config.telegram.api_id = 7;
        let parsed: toml::Table = config.to_toml().parse().unwrap();
        assert_eq!(
            parsed["telegram"]["api_id"].as_integer(),
            Some(7),
        );
    }
}
