//! External collaborator contracts (§6).
//!
//! The core never installs a package or interprets a code snippet itself —
//! it calls out to these two traits. Default, subprocess-based
//! implementations live in the sibling `aep-runtime` crate; the core only
//! depends on the contract.

use crate::error::AepResult;
use crate::model::ExecResult;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// Materializes package specifiers into an isolated environment directory.
///
/// The core passes specifier strings through unchanged (`name`, `name>=x`,
/// `name==x`, …) and does not interpret version operators itself.
#[async_trait]
pub trait PackageInstaller: Send + Sync {
    /// Idempotently creates a fresh environment at `env_dir` if one does not
    /// already exist there.
    ///
    /// # Errors
    /// Returns [`crate::error::AepError::EnvCreationFailed`] if the
    /// installer binary cannot be resolved or invoked.
    async fn ensure_environment(&self, env_dir: &Path) -> AepResult<()>;

    /// Installs `specifiers` into the environment at `env_dir`.
    ///
    /// # Errors
    /// Returns [`crate::error::AepError::InstallFailed`] carrying the
    /// installer's stderr on non-zero exit.
    async fn install(&self, env_dir: &Path, specifiers: &[String]) -> AepResult<()>;
}

/// Runs user-supplied code (a snippet or a file) inside an isolated
/// environment previously created by a [`PackageInstaller`].
#[async_trait]
pub trait CodeInterpreter: Send + Sync {
    /// Runs `source` as a snippet inside `env_dir`, with `cwd` as the working
    /// directory and `globals` bound into the top-level namespace before
    /// execution (at minimum `cwd`, `workspace`, `tools_dir` per §4.7).
    ///
    /// Always returns an [`ExecResult`] — timeouts and non-zero exits are
    /// reported through it, never as an `Err`. Only environment/transport
    /// failures (the environment does not exist, the interpreter binary is
    /// missing) are returned as `Err`.
    async fn run_snippet(
        &self,
        env_dir: &Path,
        cwd: &Path,
        source: &str,
        globals: &[(&str, &Path)],
        timeout: Duration,
    ) -> AepResult<ExecResult>;

    /// Runs the file at `path` inside `env_dir`, with `cwd` as the working
    /// directory and `args` as its positional arguments (`argv[1..]`).
    async fn run_file(
        &self,
        env_dir: &Path,
        cwd: &Path,
        path: &Path,
        args: &[String],
        timeout: Duration,
    ) -> AepResult<ExecResult>;
}
