//! Workspace binder (§4.5): attaches a config store to a workspace via
//! symbolic links under a protocol directory, and detaches it again without
//! disturbing anything the binder did not itself create.

use crate::collab::CodeInterpreter;
use crate::error::{AepError, AepResult};
use crate::store::{ConfigStore, Kind};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default protocol directory name, per Open Question (b) in the design
/// notes: most of the original implementation's call sites used `.agent`.
pub const DEFAULT_PROTOCOL_DIR: &str = ".agent";

/// The three capability links a binder creates under the protocol directory.
const LINK_NAMES: [(&str, Kind); 3] = [
    ("tools", Kind::Tool),
    ("skills", Kind::Skill),
    ("library", Kind::Library),
];

/// A config store attached to a workspace.
///
/// Created by [`WorkspaceBinder::attach`]. Carries enough state to build a
/// [`crate::session::Session`] and to [`WorkspaceHandle::detach`] cleanly.
#[derive(Debug, Clone)]
pub struct WorkspaceHandle {
    workspace: PathBuf,
    config: ConfigStore,
    protocol_dir_name: String,
}

/// Stateless entry point for attaching a [`ConfigStore`] to a workspace
/// directory.
pub struct WorkspaceBinder;

impl WorkspaceBinder {
    /// Attaches `config` to `workspace` by creating
    /// `workspace/<protocol_dir_name>/{tools,skills,library}` as symbolic
    /// links pointing into `config`'s directories.
    ///
    /// If a link target already exists and is itself a symlink, it is
    /// replaced. If it exists and is **not** a symlink, the attach aborts
    /// with [`AepError::WorkspaceConflict`] and nothing on disk is changed
    /// (the conflict is detected before any link is created or removed).
    pub fn attach(
        workspace: &Path,
        config: ConfigStore,
        protocol_dir_name: &str,
    ) -> AepResult<WorkspaceHandle> {
        let workspace = canonicalize_or_create(workspace)?;
        let protocol_dir = workspace.join(protocol_dir_name);

        for (link_name, kind) in LINK_NAMES {
            let target = protocol_dir.join(link_name);
            if target.exists() && !target.is_symlink() {
                return Err(AepError::WorkspaceConflict { path: target });
            }
            let _ = kind;
        }

        std::fs::create_dir_all(&protocol_dir).map_err(|e| AepError::io(&protocol_dir, e))?;

        for (link_name, kind) in LINK_NAMES {
            let link_path = protocol_dir.join(link_name);
            if link_path.is_symlink() {
                remove_link(&link_path)?;
            }
            create_symlink(&config.kind_dir(kind), &link_path)?;
        }

        tracing::info!(
            workspace = %workspace.display(),
            config = %config.root().display(),
            protocol_dir = %protocol_dir_name,
            "workspace attached"
        );

        Ok(WorkspaceHandle {
            workspace,
            config,
            protocol_dir_name: protocol_dir_name.to_string(),
        })
    }
}

impl WorkspaceHandle {
    /// The workspace directory this handle is bound to.
    #[must_use]
    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// The config store this handle is bound to.
    #[must_use]
    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    /// Builds a new [`crate::session::Session`] rooted at this workspace,
    /// with `cwd` initialized to the workspace directory. `interpreter` is
    /// the [`CodeInterpreter`] collaborator the session's tool and skill
    /// executors will delegate to.
    #[must_use]
    pub fn create_session(&self, interpreter: Arc<dyn CodeInterpreter>) -> crate::session::Session {
        crate::session::Session::new(self.workspace.clone(), self.config.clone(), interpreter)
    }

    /// Removes only the three links this binder created. If the protocol
    /// directory is empty afterward, removes it too.
    pub fn detach(&self) -> AepResult<()> {
        let protocol_dir = self.workspace.join(&self.protocol_dir_name);
        for (link_name, _) in LINK_NAMES {
            let link_path = protocol_dir.join(link_name);
            if link_path.is_symlink() {
                remove_link(&link_path)?;
            }
        }
        if protocol_dir.is_dir() {
            let is_empty = std::fs::read_dir(&protocol_dir)
                .map_err(|e| AepError::io(&protocol_dir, e))?
                .next()
                .is_none();
            if is_empty {
                std::fs::remove_dir(&protocol_dir).map_err(|e| AepError::io(&protocol_dir, e))?;
            }
        }
        tracing::info!(workspace = %self.workspace.display(), "workspace detached");
        Ok(())
    }
}

fn canonicalize_or_create(workspace: &Path) -> AepResult<PathBuf> {
    std::fs::create_dir_all(workspace).map_err(|e| AepError::io(workspace, e))?;
    workspace
        .canonicalize()
        .map_err(|e| AepError::io(workspace, e))
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> AepResult<()> {
    std::os::unix::fs::symlink(target, link).map_err(|e| AepError::io(link, e))
}

#[cfg(windows)]
fn create_symlink(target: &Path, link: &Path) -> AepResult<()> {
    std::os::windows::fs::symlink_dir(target, link).map_err(|e| AepError::io(link, e))
}

fn remove_link(link: &Path) -> AepResult<()> {
    #[cfg(windows)]
    {
        std::fs::remove_dir(link)
            .or_else(|_| std::fs::remove_file(link))
            .map_err(|e| AepError::io(link, e))
    }
    #[cfg(not(windows))]
    {
        std::fs::remove_file(link).map_err(|e| AepError::io(link, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_store() -> (tempfile::TempDir, ConfigStore) {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ConfigStore::open(dir.path());
        store.ensure_directories().unwrap();
        (dir, store)
    }

    #[test]
    fn attach_creates_three_links() {
        let (_config_tmp, store) = setup_store();
        let ws_tmp = tempfile::tempdir().unwrap();
        let handle = WorkspaceBinder::attach(ws_tmp.path(), store, DEFAULT_PROTOCOL_DIR).unwrap();
        let protocol_dir = handle.workspace().join(DEFAULT_PROTOCOL_DIR);
        assert!(protocol_dir.join("tools").is_symlink());
        assert!(protocol_dir.join("skills").is_symlink());
        assert!(protocol_dir.join("library").is_symlink());
    }

    #[test]
    fn attach_then_detach_leaves_no_created_children() {
        let (_config_tmp, store) = setup_store();
        let ws_tmp = tempfile::tempdir().unwrap();
        let handle = WorkspaceBinder::attach(ws_tmp.path(), store, DEFAULT_PROTOCOL_DIR).unwrap();
        handle.detach().unwrap();
        assert!(!handle.workspace().join(DEFAULT_PROTOCOL_DIR).exists());
    }

    #[test]
    fn attach_aborts_on_non_symlink_conflict() {
        let (_config_tmp, store) = setup_store();
        let ws_tmp = tempfile::tempdir().unwrap();
        let protocol_dir = ws_tmp.path().join(DEFAULT_PROTOCOL_DIR);
        std::fs::create_dir_all(&protocol_dir).unwrap();
        let conflict = protocol_dir.join("tools");
        std::fs::write(&conflict, "not a link").unwrap();

        let result = WorkspaceBinder::attach(ws_tmp.path(), store, DEFAULT_PROTOCOL_DIR);
        assert!(matches!(result, Err(AepError::WorkspaceConflict { .. })));
        assert!(conflict.is_file());
        assert_eq!(std::fs::read_to_string(&conflict).unwrap(), "not a link");
    }

    #[test]
    fn attach_is_idempotent_over_existing_symlinks() {
        let (_config_tmp, store) = setup_store();
        let ws_tmp = tempfile::tempdir().unwrap();
        WorkspaceBinder::attach(ws_tmp.path(), store.clone(), DEFAULT_PROTOCOL_DIR).unwrap();
        let handle = WorkspaceBinder::attach(ws_tmp.path(), store, DEFAULT_PROTOCOL_DIR).unwrap();
        assert!(handle.workspace().join(DEFAULT_PROTOCOL_DIR).join("tools").is_symlink());
    }
}
