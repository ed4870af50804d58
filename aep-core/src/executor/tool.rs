//! Tool executor (§4.7).

use crate::collab::CodeInterpreter;
use crate::model::ExecResult;
use crate::store::{ConfigStore, Kind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Timeout applied to every `tools run` snippet.
pub const TOOL_TIMEOUT: Duration = Duration::from_secs(60);

/// Runs agent-supplied code snippets against the shared tool environment.
///
/// Resolution of individual tool modules (building the `tools.<name>`
/// namespace) and the REPL-style last-expression echo both happen inside the
/// [`CodeInterpreter`] collaborator, which alone knows the target language's
/// module-loading and parsing rules. This executor is only responsible for
/// locating the shared environment and the three standard globals (`cwd`,
/// `workspace`, `tools_dir`).
pub struct ToolExecutor<'a> {
    store: &'a ConfigStore,
    interpreter: Arc<dyn CodeInterpreter>,
}

impl<'a> ToolExecutor<'a> {
    /// Builds an executor bound to the given store and interpreter
    /// collaborator.
    #[must_use]
    pub fn new(store: &'a ConfigStore, interpreter: Arc<dyn CodeInterpreter>) -> Self {
        Self { store, interpreter }
    }

    fn env_dir(&self) -> PathBuf {
        self.store.kind_dir(Kind::Tool).join(".env")
    }

    /// Runs `code` inside the shared tool environment, with `cwd` and
    /// `workspace` bound per §4.7. Never fails: an unprovisioned environment
    /// is reported as a failed [`ExecResult`], matching the propagation
    /// policy that runtime-phase faults never escape past the executor.
    pub async fn run(&self, code: &str, cwd: &Path, workspace: &Path) -> ExecResult {
        let env_dir = self.env_dir();
        if !env_dir.is_dir() {
            return ExecResult::failure(format!(
                "tool environment not provisioned at {} (add a tool with dependencies first)",
                env_dir.display()
            ));
        }

        let tools_dir = self.store.kind_dir(Kind::Tool);
        let globals: [(&str, &Path); 3] =
            [("cwd", cwd), ("workspace", workspace), ("tools_dir", &tools_dir)];

        match self
            .interpreter
            .run_snippet(&env_dir, cwd, code, &globals, TOOL_TIMEOUT)
            .await
        {
            Ok(result) => result,
            Err(e) => ExecResult::failure(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AepResult;
    use async_trait::async_trait;

    struct FakeInterpreter;

    #[async_trait]
    impl CodeInterpreter for FakeInterpreter {
        async fn run_snippet(
            &self,
            _env_dir: &Path,
            _cwd: &Path,
            source: &str,
            _globals: &[(&str, &Path)],
            _timeout: Duration,
        ) -> AepResult<ExecResult> {
            Ok(ExecResult::ok(format!("ran: {source}")))
        }

        async fn run_file(
            &self,
            _env_dir: &Path,
            _cwd: &Path,
            _path: &Path,
            _args: &[String],
            _timeout: Duration,
        ) -> AepResult<ExecResult> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn missing_environment_reports_failure_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ConfigStore::open(dir.path());
        store.ensure_directories().unwrap();
        let executor = ToolExecutor::new(&store, Arc::new(FakeInterpreter));
        let result = executor.run("1 + 1", dir.path(), dir.path()).await;
        assert_eq!(result.return_code, 1);
        assert!(result.stderr.contains("not provisioned"));
    }

    #[tokio::test]
    async fn provisioned_environment_delegates_to_interpreter() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ConfigStore::open(dir.path());
        store.ensure_directories().unwrap();
        std::fs::create_dir_all(store.kind_dir(Kind::Tool).join(".env")).unwrap();
        let executor = ToolExecutor::new(&store, Arc::new(FakeInterpreter));
        let result = executor.run("1 + 1", dir.path(), dir.path()).await;
        assert!(result.succeeded());
        assert!(result.stdout.contains("1 + 1"));
    }
}
