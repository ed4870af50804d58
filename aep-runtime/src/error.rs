//! Internal error type for the default subprocess-based collaborators.
//!
//! These are converted into `aep_core::AepError` at the trait boundary
//! ([`crate::installer::UvInstaller`], [`crate::interpreter::PythonInterpreter`])
//! so callers in `aep-core` only ever see the core's own error taxonomy,
//! matching the conversion pattern `aep_mcp::McpBridgeError` uses at its
//! own handler boundary.

use thiserror::Error;
use std::path::PathBuf;

/// Errors raised while resolving, spawning, or waiting on the `uv`/`python`
/// subprocesses that back the default collaborators.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Neither an explicit override nor `PATH` resolution found the binary.
    #[error("could not resolve '{binary}' executable: {cause}")]
    BinaryNotFound {
        /// Logical binary name (`uv`, `python`).
        binary: String,
        /// Underlying resolution failure.
        cause: String,
    },

    /// The subprocess could not be spawned or waited on.
    #[error("failed to spawn '{program}' at stage '{stage}': {source}")]
    SpawnFailed {
        /// Program that failed to spawn.
        program: String,
        /// Lifecycle stage where the I/O error occurred.
        stage: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// `uv venv` or `uv pip install` exited non-zero.
    #[error("'{program}' exited with status {code}: {stderr}")]
    CommandFailed {
        /// Program invoked.
        program: String,
        /// Exit code, or -1 if the process was killed by a signal.
        code: i32,
        /// Captured stderr.
        stderr: String,
    },

    /// A path that should exist after a supposedly successful operation did
    /// not (e.g. the venv's python binary after `uv venv`).
    #[error("expected path to exist after provisioning: {0}")]
    MissingAfterProvision(PathBuf),

    /// A background reader task failed to join.
    #[error("output reader task failed: {0}")]
    JoinFailed(#[from] tokio::task::JoinError),
}

/// Convenience alias for this crate's internal, pre-conversion results.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
