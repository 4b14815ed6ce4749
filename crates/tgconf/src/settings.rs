//! Configuration sections.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Telegram API credentials and session storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Application id from my.telegram.org.
    /// Default: 0 (unset, rejected by `validate`)
    #[serde(default)]
    pub api_id: i32,

    /// Application hash from my.telegram.org.
    #[serde(default)]
    pub api_hash: String,

    /// Where the MTProto session is persisted between runs.
    /// Default: bot-data/session
    #[serde(default = "TelegramConfig::default_session_path")]
    pub session_path: PathBuf,

    /// Phone number used by `telegram-mcp login` when none is given.
    #[serde(default)]
    pub phone: Option<String>,
}

impl TelegramConfig {
    fn default_session_path() -> PathBuf {
        PathBuf::from("bot-data/session")
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_id: 0,
            api_hash: String::new(),
            session_path: Self::default_session_path(),
            phone: None,
        }
    }
}

/// Telemetry and observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// OTLP gRPC endpoint for OpenTelemetry. When unset, logs only go to stderr.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,

    /// Log level (trace, debug, info, warn, error) or a full EnvFilter directive.
    /// Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            otlp_endpoint: None,
            log_level: Self::default_log_level(),
        }
    }
}

/// Hard ceiling on any reply wait, whatever the config says.
pub const MAX_WAIT_TIMEOUT_SECS: u64 = 300;

/// Limits for `wait_for_reply`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitConfig {
    /// Used when the caller does not pass `timeoutSeconds`.
    /// Default: 60
    #[serde(default = "WaitConfig::default_timeout_secs")]
    pub default_timeout_secs: u64,

    /// Upper clamp for any requested timeout. At most 300.
    /// Default: 300
    #[serde(default = "WaitConfig::default_max_timeout_secs")]
    pub max_timeout_secs: u64,
}

impl WaitConfig {
    fn default_timeout_secs() -> u64 {
        60
    }

    fn default_max_timeout_secs() -> u64 {
        MAX_WAIT_TIMEOUT_SECS
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: Self::default_timeout_secs(),
            max_timeout_secs: Self::default_max_timeout_secs(),
        }
    }
}
