//! Global configuration loader for Nirvania.
//!
//! Reads `config.toml` from the data directory (`~/.nirvania/` in production)
//! and deserializes it into [`GlobalConfig`]. Falls back to sensible defaults
//! when the file is missing or malformed.

use std::path::{Path, PathBuf};

use secrecy::SecretString;

use nirvania_types::config::GlobalConfig;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "NIRVANIA_DATA_DIR";

/// Environment variable holding the Anthropic API key.
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Load global configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`GlobalConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - Parsed budgets are clamped: at least one iteration and one second.
pub async fn load_global_config(data_dir: &Path) -> GlobalConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
    };

    match toml::from_str::<GlobalConfig>(&content) {
        Ok(config) => clamp(config),
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            GlobalConfig::default()
        }
    }
}

fn clamp(mut config: GlobalConfig) -> GlobalConfig {
    if config.max_iterations == 0 {
        tracing::warn!("max_iterations = 0 in config.toml, using 1");
        config.max_iterations = 1;
    }
    if config.timeout_secs == 0 {
        tracing::warn!("timeout_secs = 0 in config.toml, using 1");
        config.timeout_secs = 1;
    }
    config
}

/// Resolve the data directory.
///
/// `NIRVANIA_DATA_DIR` wins; otherwise `~/.nirvania`, or `./.nirvania` when
/// no home directory is known.
pub fn resolve_data_dir() -> PathBuf {
    match std::env::var_os(DATA_DIR_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".nirvania"),
    }
}

/// The Anthropic API key from the environment, if set and non-empty.
pub fn anthropic_api_key() -> Option<SecretString> {
    std::env::var(API_KEY_ENV)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .map(SecretString::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nirvania_types::execution::UnknownToolPolicy;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_global_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_global_config(tmp.path()).await;
        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.model, "claude-sonnet-4-20250514");
    }

    #[tokio::test]
    async fn load_global_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
model = "claude-opus-4-20250514"
max_iterations = 4
timeout_secs = 15
unknown_tool_policy = "reject"
parallel_tool_calls = true
"#,
        )
        .await
        .unwrap();

        let config = load_global_config(tmp.path()).await;
        assert_eq!(config.model, "claude-opus-4-20250514");
        assert_eq!(config.max_iterations, 4);
        assert_eq!(config.timeout_secs, 15);
        assert_eq!(config.unknown_tool_policy, UnknownToolPolicy::Reject);
        assert!(config.parallel_tool_calls);
        assert_eq!(config.max_tokens, 4096);
    }

    #[tokio::test]
    async fn load_global_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_global_config(tmp.path()).await;
        assert_eq!(config.max_iterations, 10);
    }

    #[tokio::test]
    async fn load_global_config_clamps_zero_budgets() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            "max_iterations = 0\ntimeout_secs = 0\n",
        )
        .await
        .unwrap();

        let config = load_global_config(tmp.path()).await;
        assert_eq!(config.max_iterations, 1);
        assert_eq!(config.timeout_secs, 1);
    }

    #[test]
    fn resolve_data_dir_ends_with_nirvania_by_default() {
        if std::env::var_os(DATA_DIR_ENV).is_none() {
            assert!(resolve_data_dir().ends_with(".nirvania"));
        }
    }
}
