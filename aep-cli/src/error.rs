//! Top-level CLI error type: wraps every lower-crate error the binary can
//! surface, plus the few failure modes that belong to the CLI layer itself
//! (config loading, MCP binding).

use thiserror::Error;
use std::path::PathBuf;

/// Errors surfaced by the `aep` binary.
#[derive(Debug, Error)]
pub enum CliError {
    /// Propagated from the capability broker core.
    #[error(transparent)]
    Core(#[from] aep_core::AepError),

    /// Propagated from the MCP discovery/stub bridge.
    #[error(transparent)]
    Mcp(#[from] aep_mcp::McpBridgeError),

    /// The `uv` binary could not be resolved.
    #[error("failed to resolve the 'uv' package installer: {0}")]
    InstallerUnavailable(aep_core::AepError),

    /// `aep.toml` exists but failed to parse.
    #[error("failed to parse configuration file {path}: {source}")]
    ConfigParse {
        /// Path to the offending configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        #[source]
        source: toml::de::Error,
    },

    /// Generic I/O failure reading configuration or CLI-supplied paths.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path the I/O operation concerned.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl CliError {
    /// Wraps a raw I/O error with the path that triggered it.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

/// Convenience alias used throughout the binary.
pub type CliResult<T> = Result<T, CliError>;
