//! Config file discovery, loading, and environment variable overlay.

use crate::{ConfigError, TgConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
/// Returns paths in load order (system, user, local/cli). Only returns files that exist.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/telegram-mcp/config.toml");
    if system.exists() {
        files.push(system);
    }

    // XDG_CONFIG_HOME or ~/.config
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("telegram-mcp/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("telegram-mcp.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Read a TOML file and overlay the keys it sets onto `config`.
pub fn load_file_into(config: &mut TgConfig, path: &Path) -> Result<(), ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    apply_toml(config, &contents, path)
}

/// Overlay a TOML document onto `config`. Keys absent from the document keep
/// their current value, so earlier files survive unless overridden.
fn apply_toml(config: &mut TgConfig, contents: &str, path: &Path) -> Result<(), ConfigError> {
    let table: toml::Table = contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    if let Some(telegram) = table.get("telegram").and_then(|v| v.as_table()) {
        if let Some(v) = telegram.get("api_id") {
            config.telegram.api_id = match v {
                toml::Value::Integer(i) => i32::try_from(*i).map_err(|_| ConfigError::Parse {
                    path: path.to_path_buf(),
                    message: format!("telegram.api_id out of range: {}", i),
                })?,
                toml::Value::String(s) => parse_api_id(s)?,
                other => {
                    return Err(ConfigError::Parse {
                        path: path.to_path_buf(),
                        message: format!("telegram.api_id must be an integer, got {}", other),
                    })
                }
            };
        }
        if let Some(v) = telegram.get("api_hash").and_then(|v| v.as_str()) {
            config.telegram.api_hash = v.to_string();
        }
        if let Some(v) = telegram.get("session_path").and_then(|v| v.as_str()) {
            config.telegram.session_path = expand_path(v);
        }
        if let Some(v) = telegram.get("phone").and_then(|v| v.as_str()) {
            config.telegram.phone = Some(v.to_string());
        }
    }

    if let Some(telemetry) = table.get("telemetry").and_then(|v| v.as_table()) {
        if let Some(v) = telemetry.get("otlp_endpoint").and_then(|v| v.as_str()) {
            config.telemetry.otlp_endpoint = non_empty(v);
        }
        if let Some(v) = telemetry.get("log_level").and_then(|v| v.as_str()) {
            config.telemetry.log_level = v.to_string();
        }
    }

    if let Some(wait) = table.get("wait").and_then(|v| v.as_table()) {
        if let Some(v) = wait.get("default_timeout_secs").and_then(|v| v.as_integer()) {
            config.wait.default_timeout_secs = v.max(0) as u64;
        }
        if let Some(v) = wait.get("max_timeout_secs").and_then(|v| v.as_integer()) {
            config.wait.max_timeout_secs = v.max(0) as u64;
        }
    }

    Ok(())
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(
    config: &mut TgConfig,
    sources: &mut ConfigSources,
) -> Result<(), ConfigError> {
    apply_overrides_from(config, sources, |key| env::var(key).ok())
}

/// Apply overrides from any key lookup. `apply_env_overrides` passes the process environment.
pub fn apply_overrides_from<F>(
    config: &mut TgConfig,
    sources: &mut ConfigSources,
    lookup: F,
) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("API_ID") {
        config.telegram.api_id = parse_api_id(&v)?;
        sources.env_overrides.push("API_ID".to_string());
    }
    if let Some(v) = lookup("API_HASH") {
        config.telegram.api_hash = v;
        sources.env_overrides.push("API_HASH".to_string());
    }
    if let Some(v) = lookup("TELEGRAM_STORAGE_PATH") {
        config.telegram.session_path = expand_path(&v);
        sources.env_overrides.push("TELEGRAM_STORAGE_PATH".to_string());
    }
    if let Some(v) = lookup("TELEGRAM_PHONE") {
        config.telegram.phone = non_empty(&v);
        sources.env_overrides.push("TELEGRAM_PHONE".to_string());
    }

    // Telemetry
    if let Some(v) = lookup("TELEGRAM_MCP_OTLP_ENDPOINT") {
        config.telemetry.otlp_endpoint = non_empty(&v);
        sources.env_overrides.push("TELEGRAM_MCP_OTLP_ENDPOINT".to_string());
    }
    // Also support standard OTEL env var
    if let Some(v) = lookup("OTEL_EXPORTER_OTLP_ENDPOINT") {
        config.telemetry.otlp_endpoint = non_empty(&v);
        sources.env_overrides.push("OTEL_EXPORTER_OTLP_ENDPOINT".to_string());
    }
    if let Some(v) = lookup("TELEGRAM_MCP_LOG_LEVEL") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("TELEGRAM_MCP_LOG_LEVEL".to_string());
    }

    Ok(())
}

fn parse_api_id(value: &str) -> Result<i32, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key: "API_ID".to_string(),
        message: format!("expected an integer, got {:?}", value),
    })
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Expand ~ and environment variables in a path.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            home.join(stripped)
        } else {
            PathBuf::from(path)
        }
    } else if let Some(stripped) = path.strip_prefix('$') {
        // Handle $VAR/rest/of/path
        if let Some(slash_pos) = stripped.find('/') {
            let var_name = &stripped[..slash_pos];
            if let Ok(var_value) = env::var(var_name) {
                PathBuf::from(var_value).join(&stripped[slash_pos + 1..])
            } else {
                PathBuf::from(path)
            }
        } else {
            env::var(stripped)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(path))
        }
    } else {
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_expand_path_tilde() {
        let expanded = expand_path("~/test/path");
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().contains("test/path"));
    }

    #[test]
    fn test_expand_path_relative() {
        assert_eq!(expand_path("bot-data/session"), PathBuf::from("bot-data/session"));
    }

    #[test]
    fn test_parse_minimal_toml() {
        let mut config = TgConfig::default();
        let toml = r#"
[telegram]
api_id = 12345
"#;
        apply_toml(&mut config, toml, Path::new("test.toml")).unwrap();
        assert_eq!(config.telegram.api_id, 12345);
        // Other values should be defaults
        assert_eq!(config.telegram.session_path, PathBuf::from("bot-data/session"));
        assert_eq!(config.wait.max_timeout_secs, 300);
    }

    #[test]
    fn test_parse_full_toml() {
        let mut config = TgConfig::default();
        let toml = r#"
[telegram]
api_id = "777"
api_hash = "deadbeef"
session_path = "/var/lib/telegram-mcp/session"
phone = "+15550100"

[telemetry]
otlp_endpoint = "127.0.0.1:4317"
log_level = "debug"

[wait]
default_timeout_secs = 30
max_timeout_secs = 120
"#;
        apply_toml(&mut config, toml, Path::new("test.toml")).unwrap();

        assert_eq!(config.telegram.api_id, 777);
        assert_eq!(config.telegram.api_hash, "deadbeef");
        assert_eq!(
            config.telegram.session_path,
            PathBuf::from("/var/lib/telegram-mcp/session")
        );
        assert_eq!(config.telegram.phone.as_deref(), Some("+15550100"));
        assert_eq!(config.telemetry.otlp_endpoint.as_deref(), Some("127.0.0.1:4317"));
        assert_eq!(config.telemetry.log_level, "debug");
        assert_eq!(config.wait.default_timeout_secs, 30);
        assert_eq!(config.wait.max_timeout_secs, 120);
    }

    #[test]
    fn test_later_file_overlays_earlier() {
        let mut config = TgConfig::default();
        apply_toml(
            &mut config,
            "[telegram]\napi_id = 1\napi_hash = \"first\"\n",
            Path::new("a.toml"),
        )
        .unwrap();
        apply_toml(&mut config, "[telegram]\napi_hash = \"second\"\n", Path::new("b.toml")).unwrap();

        assert_eq!(config.telegram.api_id, 1);
        assert_eq!(config.telegram.api_hash, "second");
    }

    #[test]
    fn test_parse_error_names_file() {
        let mut config = TgConfig::default();
        let err = apply_toml(&mut config, "[telegram\n", Path::new("broken.toml")).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_load_file_into() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[wait]\nmax_timeout_secs = 90").unwrap();

        let mut config = TgConfig::default();
        load_file_into(&mut config, file.path()).unwrap();
        assert_eq!(config.wait.max_timeout_secs, 90);
    }

    #[test]
    fn test_load_missing_file() {
        let mut config = TgConfig::default();
        let err = load_file_into(&mut config, Path::new("/nonexistent/telegram-mcp.toml"));
        assert!(matches!(err, Err(ConfigError::FileRead { .. })));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = TgConfig::default();
        let mut sources = ConfigSources::default();
        let lookup = lookup_from(&[
            ("API_ID", "4242"),
            ("API_HASH", "cafe"),
            ("TELEGRAM_STORAGE_PATH", "/tmp/session"),
            ("TELEGRAM_MCP_LOG_LEVEL", "trace"),
        ]);

        apply_overrides_from(&mut config, &mut sources, lookup).unwrap();

        assert_eq!(config.telegram.api_id, 4242);
        assert_eq!(config.telegram.api_hash, "cafe");
        assert_eq!(config.telegram.session_path, PathBuf::from("/tmp/session"));
        assert_eq!(config.telemetry.log_level, "trace");
        assert_eq!(sources.env_overrides.len(), 4);
        assert!(sources.env_overrides.contains(&"API_ID".to_string()));
    }

    #[test]
    fn test_env_bad_api_id() {
        let mut config = TgConfig::default();
        let mut sources = ConfigSources::default();
        let err = apply_overrides_from(&mut config, &mut sources, lookup_from(&[("API_ID", "abc")]));
        assert!(matches!(err, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_empty_otlp_endpoint_disables_export() {
        let mut config = TgConfig::default();
        config.telemetry.otlp_endpoint = Some("127.0.0.1:4317".to_string());
        let mut sources = ConfigSources::default();
        apply_overrides_from(
            &mut config,
            &mut sources,
            lookup_from(&[("TELEGRAM_MCP_OTLP_ENDPOINT", "")]),
        )
        .unwrap();
        assert!(config.telemetry.otlp_endpoint.is_none());
    }
}
