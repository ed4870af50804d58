//! Default [`PackageInstaller`] collaborator: shells out to `uv`.
//!
//! Grounded on the original's `BaseHandler`, which drove `uv venv` /
//! `uv pip install` as its isolated-environment backend, and on
//! `claudecode-adapter::discovery`'s binary-resolution order (explicit
//! override, then environment variable, then `PATH`).

use crate::process;
use aep_core::collab::PackageInstaller;
use aep_core::error::{AepError, AepResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the resolved `uv` binary path.
pub const UV_BIN_ENV_VAR: &str = "AEP_UV_BIN";

/// `uv`-backed package installer. One instance is shared by every tool and
/// skill environment the provisioner creates.
#[derive(Debug, Clone)]
pub struct UvInstaller {
    uv_bin: PathBuf,
}

impl UvInstaller {
    /// Builds an installer using an explicit `uv` binary path, bypassing
    /// discovery entirely.
    #[must_use]
    pub fn with_binary(uv_bin: impl Into<PathBuf>) -> Self {
        Self { uv_bin: uv_bin.into() }
    }

    /// Resolves the `uv` binary: `AEP_UV_BIN` if set, otherwise `uv` on
    /// `PATH`.
    ///
    /// # Errors
    /// Returns [`AepError::EnvCreationFailed`] if `uv` cannot be resolved —
    /// every subsequent environment operation would fail the same way, so
    /// discovery itself is reported through the same variant rather than a
    /// distinct one.
    pub fn discover() -> AepResult<Self> {
        if let Ok(path) = std::env::var(UV_BIN_ENV_VAR) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Ok(Self::with_binary(path));
            }
        }
        which::which("uv")
            .map(Self::with_binary)
            .map_err(|e| AepError::EnvCreationFailed {
                path: PathBuf::from("uv"),
                cause: format!("could not resolve 'uv' on PATH: {e}"),
            })
    }

    fn python_exe(env_dir: &Path) -> PathBuf {
        #[cfg(windows)]
        {
            env_dir.join("Scripts").join("python.exe")
        }
        #[cfg(not(windows))]
        {
            env_dir.join("bin").join("python")
        }
    }
}

#[async_trait]
impl PackageInstaller for UvInstaller {
    async fn ensure_environment(&self, env_dir: &Path) -> AepResult<()> {
        if Self::python_exe(env_dir).is_file() {
            return Ok(());
        }
        if let Some(parent) = env_dir.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AepError::io(parent, e))?;
        }
        let cwd = env_dir.parent().unwrap_or(env_dir);
        let (_, stderr, code) = process::run_to_completion(
            &self.uv_bin,
            ["venv", &env_dir.to_string_lossy()],
            cwd,
        )
        .await
        .map_err(|e| AepError::EnvCreationFailed {
            path: env_dir.to_path_buf(),
            cause: e.to_string(),
        })?;
        if code != 0 {
            return Err(AepError::EnvCreationFailed {
                path: env_dir.to_path_buf(),
                cause: stderr,
            });
        }
        if !Self::python_exe(env_dir).is_file() {
            return Err(AepError::EnvCreationFailed {
                path: env_dir.to_path_buf(),
                cause: "uv venv succeeded but no python interpreter was produced".to_string(),
            });
        }
        tracing::info!(installer = %self.uv_bin.display(), env = %env_dir.display(), "uv venv created");
        Ok(())
    }

    async fn install(&self, env_dir: &Path, specifiers: &[String]) -> AepResult<()> {
        if specifiers.is_empty() {
            return Ok(());
        }
        let python = Self::python_exe(env_dir);
        if !python.is_file() {
            return Err(AepError::EnvCreationFailed {
                path: env_dir.to_path_buf(),
                cause: "environment has no python interpreter; call ensure_environment first".to_string(),
            });
        }
        let mut args = vec!["pip".to_string(), "install".to_string(), "--python".to_string(), python.to_string_lossy().into_owned()];
        args.extend(specifiers.iter().cloned());
        let cwd = env_dir.parent().unwrap_or(env_dir);
        let (_, stderr, code) = process::run_to_completion(&self.uv_bin, &args, cwd)
            .await
            .map_err(|e| AepError::InstallFailed { stderr: e.to_string() })?;
        if code != 0 {
            return Err(AepError::InstallFailed { stderr });
        }
        tracing::info!(env = %env_dir.display(), count = specifiers.len(), "dependencies installed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn python_exe_path_is_platform_specific() {
        let dir = Path::new("/tmp/env");
        let exe = UvInstaller::python_exe(dir);
        #[cfg(windows)]
        assert!(exe.ends_with("Scripts/python.exe") || exe.ends_with("Scripts\\python.exe"));
        #[cfg(not(windows))]
        assert!(exe.ends_with("bin/python"));
    }

    #[tokio::test]
    async fn install_with_no_specifiers_is_a_noop() {
        let installer = UvInstaller::with_binary("/nonexistent/uv");
        let dir = tempfile::tempdir().unwrap();
        installer.install(dir.path(), &[]).await.unwrap();
    }

    #[test]
    #[allow(unsafe_code)]
    fn discover_honors_env_var_override() {
        let dir = tempfile::tempdir().unwrap();
        let fake_uv = dir.path().join("uv");
        std::fs::write(&fake_uv, "#!/bin/sh\n").unwrap();
        // SAFETY: test runs single-threaded w.r.t. this env var; no other
        // test in this crate reads AEP_UV_BIN.
        unsafe { std::env::set_var(UV_BIN_ENV_VAR, &fake_uv) };
        let installer = UvInstaller::discover().unwrap();
        unsafe { std::env::remove_var(UV_BIN_ENV_VAR) };
        assert_eq!(installer.uv_bin, fake_uv);
    }
}
