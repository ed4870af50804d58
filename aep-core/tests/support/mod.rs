//! Fake collaborators shared across the integration tests in this crate.
//!
//! `aep-core` never depends on `aep-runtime`, so these fakes stand in for
//! the real `uv`/Python-backed collaborators the way the corresponding unit
//! tests already do inside `src/`: an instant, in-memory
//! [`PackageInstaller`] and a [`CodeInterpreter`] that emulates just enough
//! of the real wrapper's behavior (argument echoing, a toy last-expression
//! rule) to exercise the session-level wiring.

use aep_core::collab::{CodeInterpreter, PackageInstaller};
use aep_core::error::{AepError, AepResult};
use aep_core::model::ExecResult;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// Always succeeds; records every environment it was asked to prepare.
#[derive(Default)]
pub struct FakeInstaller {
    pub ensured: Mutex<Vec<std::path::PathBuf>>,
    pub installed: Mutex<Vec<(std::path::PathBuf, Vec<String>)>>,
    pub fail: bool,
}

#[async_trait]
impl PackageInstaller for FakeInstaller {
    async fn ensure_environment(&self, env_dir: &Path) -> AepResult<()> {
        if self.fail {
            return Err(AepError::EnvCreationFailed {
                path: env_dir.to_path_buf(),
                cause: "fake installer configured to fail".to_string(),
            });
        }
        std::fs::create_dir_all(env_dir).map_err(|e| AepError::io(env_dir, e))?;
        self.ensured.lock().unwrap().push(env_dir.to_path_buf());
        Ok(())
    }

    async fn install(&self, env_dir: &Path, specifiers: &[String]) -> AepResult<()> {
        if self.fail {
            return Err(AepError::InstallFailed {
                stderr: "fake installer configured to fail".to_string(),
            });
        }
        self.installed
            .lock()
            .unwrap()
            .push((env_dir.to_path_buf(), specifiers.to_vec()));
        Ok(())
    }
}

/// Emulates just enough of [`aep_runtime::PythonInterpreter`] to exercise
/// session wiring: `run_snippet` performs a toy "last non-empty line is the
/// echoed value" rule instead of parsing real Python, and `run_file` reports
/// the path and arguments it was invoked with.
pub struct FakeInterpreter;

#[async_trait]
impl CodeInterpreter for FakeInterpreter {
    async fn run_snippet(
        &self,
        _env_dir: &Path,
        _cwd: &Path,
        source: &str,
        globals: &[(&str, &Path)],
        _timeout: Duration,
    ) -> AepResult<ExecResult> {
        let last_line = source.lines().next_back().unwrap_or_default().trim();
        let cwd_echo = globals
            .iter()
            .find(|(name, _)| *name == "cwd")
            .map(|(_, path)| path.display().to_string())
            .unwrap_or_default();
        Ok(ExecResult::ok(format!("{last_line} [cwd={cwd_echo}]")))
    }

    async fn run_file(
        &self,
        _env_dir: &Path,
        cwd: &Path,
        path: &Path,
        args: &[String],
        _timeout: Duration,
    ) -> AepResult<ExecResult> {
        Ok(ExecResult::ok(format!(
            "ran {} in {} with {:?}",
            path.display(),
            cwd.display(),
            args
        )))
    }
}
