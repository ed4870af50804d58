//! Environment provisioner (§4.2): isolated dependency spaces, driven by the
//! [`crate::collab::PackageInstaller`] collaborator.

use crate::collab::PackageInstaller;
use crate::error::{AepError, AepResult};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

/// Orchestrates environment creation and dependency installation for tools
/// and skills. Pure coordination — all process work happens behind the
/// [`PackageInstaller`] collaborator.
pub struct Provisioner {
    installer: Arc<dyn PackageInstaller>,
}

impl Provisioner {
    /// Builds a provisioner driven by the given installer collaborator.
    #[must_use]
    pub fn new(installer: Arc<dyn PackageInstaller>) -> Self {
        Self { installer }
    }

    /// Idempotently ensures `env_dir` exists as a usable environment.
    pub async fn ensure_environment(&self, env_dir: &Path) -> AepResult<()> {
        self.installer.ensure_environment(env_dir).await?;
        tracing::info!(env = %env_dir.display(), "environment ensured");
        Ok(())
    }

    /// Installs `specifiers` into `env_dir`. Assumes the environment already
    /// exists (callers invoke [`Provisioner::ensure_environment`] first, per
    /// the calling order in §4.2).
    pub async fn install(&self, env_dir: &Path, specifiers: &[String]) -> AepResult<()> {
        if specifiers.is_empty() {
            return Ok(());
        }
        self.installer.install(env_dir, specifiers).await
    }

    /// Installs from a manifest file, same semantics as
    /// [`Provisioner::install`] but the specifiers are first read back from
    /// `manifest_path` (one specifier per non-empty, non-comment line).
    pub fn read_manifest(manifest_path: &Path) -> AepResult<Vec<String>> {
        if !manifest_path.exists() {
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(manifest_path).map_err(|e| AepError::io(manifest_path, e))?;
        Ok(raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect())
    }

    /// Installs every specifier currently recorded in `manifest_path`.
    pub async fn install_from_manifest(&self, env_dir: &Path, manifest_path: &Path) -> AepResult<()> {
        let specifiers = Self::read_manifest(manifest_path)?;
        self.install(env_dir, &specifiers).await
    }

    /// Union-merges `new_specifiers` into the manifest at `manifest_path`,
    /// writing a deterministic, order-independent, sorted result with a
    /// trailing newline. Creates the manifest if absent.
    ///
    /// Merge is set-based on the exact specifier string — `"foo"` and
    /// `"foo>=1"` are treated as distinct entries, matching the contract
    /// that the core passes specifiers through without interpreting version
    /// operators.
    pub fn save_manifest(manifest_path: &Path, new_specifiers: &[String]) -> AepResult<()> {
        let mut merged: BTreeSet<String> = Self::read_manifest(manifest_path)?.into_iter().collect();
        for spec in new_specifiers {
            if !spec.trim().is_empty() {
                merged.insert(spec.trim().to_string());
            }
        }
        let mut out = String::new();
        for spec in &merged {
            out.push_str(spec);
            out.push('\n');
        }
        if let Some(parent) = manifest_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AepError::io(parent, e))?;
        }
        std::fs::write(manifest_path, out).map_err(|e| AepError::io(manifest_path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::CodeInterpreter;
    use crate::model::ExecResult;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeInstaller {
        ensured: Mutex<Vec<std::path::PathBuf>>,
        installed: Mutex<Vec<(std::path::PathBuf, Vec<String>)>>,
        fail_install: bool,
    }

    #[async_trait]
    impl PackageInstaller for FakeInstaller {
        async fn ensure_environment(&self, env_dir: &Path) -> AepResult<()> {
            self.ensured.lock().unwrap().push(env_dir.to_path_buf());
            Ok(())
        }

        async fn install(&self, env_dir: &Path, specifiers: &[String]) -> AepResult<()> {
            if self.fail_install {
                return Err(AepError::InstallFailed {
                    stderr: "boom".to_string(),
                });
            }
            self.installed
                .lock()
                .unwrap()
                .push((env_dir.to_path_buf(), specifiers.to_vec()));
            Ok(())
        }
    }

    #[async_trait]
    impl CodeInterpreter for FakeInstaller {
        async fn run_snippet(
            &self,
            _env_dir: &Path,
            _cwd: &Path,
            _source: &str,
            _globals: &[(&str, &Path)],
            _timeout: std::time::Duration,
        ) -> AepResult<ExecResult> {
            unreachable!("not exercised in these tests")
        }

        async fn run_file(
            &self,
            _env_dir: &Path,
            _cwd: &Path,
            _path: &Path,
            _args: &[String],
            _timeout: std::time::Duration,
        ) -> AepResult<ExecResult> {
            unreachable!("not exercised in these tests")
        }
    }

    #[tokio::test]
    async fn ensure_and_install_delegate_to_collaborator() {
        let installer = Arc::new(FakeInstaller::default());
        let provisioner = Provisioner::new(installer.clone());
        let dir = tempfile::tempdir().unwrap();
        let env_dir = dir.path().join(".env");
        provisioner.ensure_environment(&env_dir).await.unwrap();
        provisioner
            .install(&env_dir, &["requests".to_string()])
            .await
            .unwrap();
        assert_eq!(installer.ensured.lock().unwrap().len(), 1);
        assert_eq!(installer.installed.lock().unwrap().len(), 1);
    }

    #[test]
    fn save_manifest_merges_and_sorts_deterministically() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("requirements.txt");
        Provisioner::save_manifest(&manifest, &["numpy".to_string(), "requests>=2".to_string()]).unwrap();
        Provisioner::save_manifest(&manifest, &["requests>=2".to_string(), "pandas".to_string()]).unwrap();
        let contents = std::fs::read_to_string(&manifest).unwrap();
        assert_eq!(contents, "numpy\npandas\nrequests>=2\n");
    }

    #[test]
    fn install_failure_leaves_manifest_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("requirements.txt");
        Provisioner::save_manifest(&manifest, &["numpy".to_string()]).unwrap();
        assert!(manifest.exists());
        assert_eq!(Provisioner::read_manifest(&manifest).unwrap(), vec!["numpy".to_string()]);
    }
}
