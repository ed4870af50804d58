//! Skill executor (§4.8).

use crate::collab::CodeInterpreter;
use crate::error::{AepError, AepResult, CapabilityKind};
use crate::model::ExecResult;
use crate::store::{ConfigStore, Kind};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Timeout applied to a `skills run` invocation. Skills are expected to do
/// more substantial work than a tool snippet, so the budget is five times
/// that of [`crate::executor::tool::TOOL_TIMEOUT`].
pub const SKILL_TIMEOUT: Duration = Duration::from_secs(300);

/// Runs a skill's entry-point script inside that skill's own dependency
/// environment.
pub struct SkillExecutor<'a> {
    store: &'a ConfigStore,
    interpreter: Arc<dyn CodeInterpreter>,
}

impl<'a> SkillExecutor<'a> {
    /// Builds an executor bound to the given store and interpreter
    /// collaborator.
    #[must_use]
    pub fn new(store: &'a ConfigStore, interpreter: Arc<dyn CodeInterpreter>) -> Self {
        Self { store, interpreter }
    }

    fn skill_dir(&self, name: &str) -> PathBuf {
        self.store.kind_dir(Kind::Skill).join(name)
    }

    /// Runs `<skill>/<relative>` with `args`, inside the skill's own `.env`.
    /// `cwd` is the skill's own directory, per §4.8 — a skill is not run from
    /// the caller's working directory.
    ///
    /// `relative` is the file path component following the skill name in a
    /// `skills run <skill>/<relative/file>` command (e.g. `main.py` for
    /// `skills run greeter/main.py`); the file must exist under the skill
    /// directory.
    ///
    /// # Errors
    /// Returns [`AepError::NotFound`] if no such skill is registered, or if
    /// `relative` does not resolve to an existing file under the skill
    /// directory, or [`AepError::EnvMissing`] if the skill has no dependency
    /// environment provisioned yet. These are setup faults, not runtime
    /// faults, so unlike [`crate::executor::tool::ToolExecutor::run`] they
    /// surface as `Err` rather than being folded into a failed
    /// [`ExecResult`].
    pub async fn run(&self, name: &str, relative: &str, args: &[String]) -> AepResult<ExecResult> {
        let skill_dir = self.skill_dir(name);
        if !skill_dir.is_dir() {
            return Err(AepError::NotFound {
                kind: CapabilityKind::Skill,
                name: name.to_string(),
            });
        }

        let entry_point = skill_dir.join(relative);
        if !entry_point.is_file() {
            return Err(AepError::NotFound {
                kind: CapabilityKind::Skill,
                name: format!("{name}/{relative}"),
            });
        }

        let env_dir = skill_dir.join(".env");
        if !env_dir.is_dir() {
            return Err(AepError::EnvMissing {
                kind: CapabilityKind::Skill,
                path: env_dir,
            });
        }

        self.interpreter
            .run_file(&env_dir, &skill_dir, &entry_point, args, SKILL_TIMEOUT)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::Path;

    struct FakeInterpreter;

    #[async_trait]
    impl CodeInterpreter for FakeInterpreter {
        async fn run_snippet(
            &self,
            _env_dir: &Path,
            _cwd: &Path,
            _source: &str,
            _globals: &[(&str, &Path)],
            _timeout: Duration,
        ) -> AepResult<ExecResult> {
            unreachable!()
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
                "{} in {} with {:?}",
                path.display(),
                cwd.display(),
                args
            )))
        }
    }

    fn setup() -> (tempfile::TempDir, ConfigStore) {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ConfigStore::open(dir.path());
        store.ensure_directories().unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn missing_skill_is_not_found() {
        let (_tmp, store) = setup();
        let executor = SkillExecutor::new(&store, Arc::new(FakeInterpreter));
        let err = executor.run("absent", "main.py", &[]).await.unwrap_err();
        assert!(matches!(err, AepError::NotFound { kind: CapabilityKind::Skill, .. }));
    }

    #[tokio::test]
    async fn missing_relative_file_is_not_found() {
        let (_tmp, store) = setup();
        let skill_dir = store.kind_dir(Kind::Skill).join("greeter");
        std::fs::create_dir_all(&skill_dir).unwrap();
        std::fs::write(skill_dir.join("main.py"), "print('hi')\n").unwrap();
        let executor = SkillExecutor::new(&store, Arc::new(FakeInterpreter));
        let err = executor.run("greeter", "nope.py", &[]).await.unwrap_err();
        assert!(matches!(err, AepError::NotFound { kind: CapabilityKind::Skill, .. }));
    }

    #[tokio::test]
    async fn missing_env_is_env_missing() {
        let (_tmp, store) = setup();
        let skill_dir = store.kind_dir(Kind::Skill).join("greeter");
        std::fs::create_dir_all(&skill_dir).unwrap();
        std::fs::write(skill_dir.join("main.py"), "print('hi')\n").unwrap();
        let executor = SkillExecutor::new(&store, Arc::new(FakeInterpreter));
        let err = executor.run("greeter", "main.py", &[]).await.unwrap_err();
        assert!(matches!(err, AepError::EnvMissing { kind: CapabilityKind::Skill, .. }));
    }

    #[tokio::test]
    async fn provisioned_skill_delegates_to_interpreter() {
        let (_tmp, store) = setup();
        let skill_dir = store.kind_dir(Kind::Skill).join("greeter");
        std::fs::create_dir_all(skill_dir.join(".env")).unwrap();
        std::fs::write(skill_dir.join("main.py"), "print('hi')\n").unwrap();
        let executor = SkillExecutor::new(&store, Arc::new(FakeInterpreter));
        let result = executor
            .run("greeter", "main.py", &["world".to_string()])
            .await
            .unwrap();
        assert!(result.stdout.contains("main.py"));
        assert!(result.stdout.contains("world"));
    }
}
