//! Tools handler (§4.3): add / list / remove / index plain tool modules and
//! their shared dependency environment.

use crate::error::{AepError, AepResult, CapabilityKind};
use crate::provisioner::Provisioner;
use crate::store::{ConfigStore, Kind};
use std::path::{Path, PathBuf};

/// Thin orchestrator over the config store and provisioner for plain tools.
pub struct ToolsHandler<'a> {
    store: &'a ConfigStore,
    provisioner: &'a Provisioner,
}

impl<'a> ToolsHandler<'a> {
    /// Builds a handler bound to the given store and provisioner.
    #[must_use]
    pub fn new(store: &'a ConfigStore, provisioner: &'a Provisioner) -> Self {
        Self { store, provisioner }
    }

    fn env_dir(&self) -> PathBuf {
        self.store.kind_dir(Kind::Tool).join(".env")
    }

    fn manifest_path(&self) -> PathBuf {
        self.store.kind_dir(Kind::Tool).join("requirements.txt")
    }

    /// Copies `source` into `C/tools/<name>.<ext>`, optionally provisioning
    /// `dependencies` into the shared tool environment. Returns the
    /// installed path.
    ///
    /// `name` defaults to `source`'s file stem. Names starting with `_` are
    /// rejected, matching the reserved-prefix convention used to hide
    /// generated/internal files from `list()`.
    pub async fn add(
        &self,
        source: &Path,
        name: Option<&str>,
        dependencies: &[String],
    ) -> AepResult<PathBuf> {
        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| AepError::BadRunSyntax(format!("cannot derive tool name from {}", source.display())))?;
        let name = name.unwrap_or(stem);
        if name.starts_with('_') {
            return Err(AepError::BadRunSyntax(format!(
                "tool name '{name}' must not start with '_'"
            )));
        }

        let ext = source.extension().and_then(|s| s.to_str()).unwrap_or("py");
        let tools_dir = self.store.kind_dir(Kind::Tool);
        std::fs::create_dir_all(&tools_dir).map_err(|e| AepError::io(&tools_dir, e))?;
        let dest = tools_dir.join(format!("{name}.{ext}"));
        std::fs::copy(source, &dest).map_err(|e| AepError::io(&dest, e))?;
        tracing::info!(tool = %name, dest = %dest.display(), "tool added");

        // The shared tool environment is provisioned on every add, not only
        // when dependencies are supplied — a dependency-less tool must still
        // be runnable through `tools run`. When dependencies are supplied,
        // `add_dependencies` keeps the §4.2 order (merge manifest, then
        // ensure environment, then install) so a failure here still leaves
        // the manifest write behind it in place.
        if dependencies.is_empty() {
            self.provisioner.ensure_environment(&self.env_dir()).await?;
        } else {
            self.add_dependencies(dependencies).await?;
        }

        Ok(dest)
    }

    /// Merges `specifiers` into the shared manifest and installs them into
    /// the shared tool environment, creating the environment first if
    /// absent.
    pub async fn add_dependencies(&self, specifiers: &[String]) -> AepResult<()> {
        let manifest = self.manifest_path();
        Provisioner::save_manifest(&manifest, specifiers)?;
        let env_dir = self.env_dir();
        self.provisioner.ensure_environment(&env_dir).await?;
        self.provisioner.install(&env_dir, specifiers).await
    }

    /// Removes the tool module (and its `.md` sidecar, if any) and the
    /// matching MCP record, if one exists.
    pub fn remove(&self, name: &str) -> AepResult<()> {
        self.store.remove(Kind::Tool, name)?;
        let _ = self.store.remove_mcp_record(name);
        Ok(())
    }

    /// Lists tool names, excluding generated indexes and files starting with
    /// `_`.
    pub fn list(&self) -> AepResult<Vec<String>> {
        self.store.list(Kind::Tool)
    }

    /// Writes `C/tools/index.md`, marking each tool `(MCP)` when a matching
    /// `_mcp/<name>/` record exists.
    pub fn generate_index(&self) -> AepResult<PathBuf> {
        let names = self.list()?;
        let mut out = String::from("# Tools\n\n");
        if names.is_empty() {
            out.push_str("(no tools registered)\n");
        }
        for name in &names {
            let is_mcp = self.store.mcp_server_dir(name).is_dir();
            if is_mcp {
                out.push_str(&format!("- `{name}` (MCP)\n"));
            } else {
                out.push_str(&format!("- `{name}`\n"));
            }
        }
        let path = self.store.kind_dir(Kind::Tool).join("index.md");
        std::fs::write(&path, out).map_err(|e| AepError::io(&path, e))?;
        Ok(path)
    }

    /// Returns the path to a tool's `<name>.md` doc sidecar, if present, or
    /// [`AepError::NotFound`] if there is neither a sidecar nor a module.
    pub fn doc_sidecar(&self, name: &str) -> AepResult<Option<PathBuf>> {
        let sidecar = self.store.kind_dir(Kind::Tool).join(format!("{name}.md"));
        if sidecar.is_file() {
            return Ok(Some(sidecar));
        }
        if self.list()?.contains(&name.to_string()) {
            return Ok(None);
        }
        Err(AepError::NotFound {
            kind: CapabilityKind::Tool,
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::PackageInstaller;
    use async_trait::async_trait;

    struct NoopInstaller;

    #[async_trait]
    impl PackageInstaller for NoopInstaller {
        async fn ensure_environment(&self, env_dir: &Path) -> AepResult<()> {
            std::fs::create_dir_all(env_dir).map_err(|e| AepError::io(env_dir, e))
        }
        async fn install(&self, _env_dir: &Path, _specifiers: &[String]) -> AepResult<()> {
            Ok(())
        }
    }

    fn setup() -> (tempfile::TempDir, ConfigStore) {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ConfigStore::open(dir.path());
        store.ensure_directories().unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn add_rejects_underscore_prefixed_names() {
        let (tmp, store) = setup();
        let provisioner = Provisioner::new(std::sync::Arc::new(NoopInstaller));
        let handler = ToolsHandler::new(&store, &provisioner);
        let src = tmp.path().join("_private.py");
        std::fs::write(&src, "x = 1\n").unwrap();
        let result = handler.add(&src, None, &[]).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn add_then_list_then_index() {
        let (tmp, store) = setup();
        let provisioner = Provisioner::new(std::sync::Arc::new(NoopInstaller));
        let handler = ToolsHandler::new(&store, &provisioner);
        let src = tmp.path().join("calc.py");
        std::fs::write(&src, "def add(a, b):\n    return a + b\n").unwrap();
        handler.add(&src, None, &[]).await.unwrap();
        assert_eq!(handler.list().unwrap(), vec!["calc".to_string()]);
        let index_path = handler.generate_index().unwrap();
        let contents = std::fs::read_to_string(index_path).unwrap();
        assert!(contents.contains("calc"));
    }

    #[tokio::test]
    async fn remove_unlinks_module() {
        let (tmp, store) = setup();
        let provisioner = Provisioner::new(std::sync::Arc::new(NoopInstaller));
        let handler = ToolsHandler::new(&store, &provisioner);
        let src = tmp.path().join("calc.py");
        std::fs::write(&src, "def add(a, b):\n    return a + b\n").unwrap();
        handler.add(&src, None, &[]).await.unwrap();
        handler.remove("calc").unwrap();
        assert!(handler.list().unwrap().is_empty());
    }
}
