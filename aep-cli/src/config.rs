//! CLI configuration: defaults, an optional `aep.toml`, and `AEP_*`
//! environment overrides.
//!
//! Grounded on rig-cli's `ClientConfig` (a plain struct with a `Default`
//! impl holding every knob a client needs), extended with a file-plus-env
//! loader since this binary, unlike the library crates it wires together, is
//! the one place in the workspace that owns a user-facing configuration
//! surface.

use crate::error::{CliError, CliResult};
use serde::Deserialize;
use std::path::PathBuf;

/// Env var overriding the config store root (`C` in the data model).
pub const CONFIG_ROOT_ENV: &str = "AEP_CONFIG_ROOT";
/// Env var overriding the workspace binder's protocol directory name.
pub const PROTOCOL_DIR_ENV: &str = "AEP_PROTOCOL_DIR";
/// Env var overriding the resolved `uv` binary (forwarded to `aep-runtime`).
pub const UV_BIN_ENV: &str = "AEP_UV_BIN";
/// Env var overriding the `tracing-subscriber` filter directive.
pub const LOG_FILTER_ENV: &str = "AEP_LOG";
/// Env var switching the log formatter to newline-delimited JSON.
pub const LOG_JSON_ENV: &str = "AEP_LOG_JSON";

/// Resolved CLI configuration, after merging defaults, `aep.toml`, and
/// environment overrides (in that ascending order of precedence).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Root of the capability config store (`C`).
    pub config_root: PathBuf,
    /// Protocol directory name a workspace attach creates (default `.agent`).
    pub protocol_dir: String,
    /// Explicit `uv` binary path; `None` defers to `PATH` discovery.
    pub uv_bin: Option<PathBuf>,
    /// `tracing-subscriber` `EnvFilter` directive string.
    pub log_filter: String,
    /// Emit newline-delimited JSON logs instead of the compact human format.
    pub log_json: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            config_root: default_config_root(),
            protocol_dir: aep_core::binder::DEFAULT_PROTOCOL_DIR.to_string(),
            uv_bin: None,
            log_filter: "info".to_string(),
            log_json: false,
        }
    }
}

fn default_config_root() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("aep")
}

impl CliConfig {
    /// Loads configuration from `path` (if it exists) layered over
    /// defaults, then applies `AEP_*` environment overrides.
    ///
    /// # Errors
    /// Returns [`CliError::ConfigParse`] if `path` exists but is not valid
    /// TOML, or [`CliError::Io`] if it exists but cannot be read.
    pub fn load(path: &std::path::Path) -> CliResult<Self> {
        let mut config = if path.is_file() {
            let raw = std::fs::read_to_string(path).map_err(|e| CliError::io(path, e))?;
            toml::from_str(&raw).map_err(|e| CliError::ConfigParse {
                path: path.to_path_buf(),
                source: e,
            })?
        } else {
            Self::default()
        };

        if let Ok(root) = std::env::var(CONFIG_ROOT_ENV) {
            config.config_root = PathBuf::from(root);
        }
        if let Ok(dir) = std::env::var(PROTOCOL_DIR_ENV) {
            config.protocol_dir = dir;
        }
        if let Ok(uv_bin) = std::env::var(UV_BIN_ENV) {
            config.uv_bin = Some(PathBuf::from(uv_bin));
        }
        if let Ok(filter) = std::env::var(LOG_FILTER_ENV) {
            config.log_filter = filter;
        }
        if let Ok(flag) = std::env::var(LOG_JSON_ENV) {
            config.log_json = flag == "1" || flag.eq_ignore_ascii_case("true");
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let config = CliConfig::default();
        assert_eq!(config.protocol_dir, ".agent");
        assert!(config.uv_bin.is_none());
        assert!(!config.log_json);
    }

    #[test]
    fn load_without_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn load_parses_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aep.toml");
        std::fs::write(&path, "protocol_dir = \".custom-agent\"\nlog_json = true\n").unwrap();
        let config = CliConfig::load(&path).unwrap();
        assert_eq!(config.protocol_dir, ".custom-agent");
        assert!(config.log_json);
    }

    #[test]
    fn malformed_toml_is_config_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aep.toml");
        std::fs::write(&path, "not valid toml {{{").unwrap();
        let result = CliConfig::load(&path);
        assert!(matches!(result, Err(CliError::ConfigParse { .. })));
    }
}
