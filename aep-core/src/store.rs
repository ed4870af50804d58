//! Config store (§4.1): on-disk layout, paths, and manifest serialization.
//!
//! Pure layout plus manifest (de)serialization — no subprocess spawning and
//! no environment provisioning. That lives one layer up, in
//! [`crate::provisioner`] and the capability handlers.

use crate::error::{AepError, AepResult, CapabilityKind};
use crate::model::McpServerRecord;
use std::path::{Path, PathBuf};

/// Which top-level capability directory a path belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// `C/tools/`
    Tool,
    /// `C/skills/`
    Skill,
    /// `C/library/`
    Library,
}

impl Kind {
    const fn dir_name(self) -> &'static str {
        match self {
            Self::Tool => "tools",
            Self::Skill => "skills",
            Self::Library => "library",
        }
    }
}

impl From<Kind> for CapabilityKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Tool => Self::Tool,
            Kind::Skill => Self::Skill,
            Kind::Library => Self::Library,
        }
    }
}

/// A capability configuration store rooted at a single directory `C`.
///
/// All paths handed out by this type are resolvable relative to `root()`,
/// per the `ConfigRoot` invariant in the data model. The directory is
/// canonicalized the first time [`ConfigStore::open`] or
/// [`ConfigStore::ensure_directories`] runs.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    root: PathBuf,
}

impl ConfigStore {
    /// Opens (without yet creating) a config store rooted at `root`.
    ///
    /// The root is canonicalized if it already exists; otherwise the given
    /// path is kept as-is until [`ConfigStore::ensure_directories`]
    /// creates it.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = root.canonicalize().unwrap_or(root);
        Self { root }
    }

    /// The config root directory `C`.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `C/tools`, `C/skills`, `C/library`, or `C/_mcp` depending on `kind`.
    #[must_use]
    pub fn kind_dir(&self, kind: Kind) -> PathBuf {
        self.root.join(kind.dir_name())
    }

    /// `C/_mcp`.
    #[must_use]
    pub fn mcp_dir(&self) -> PathBuf {
        self.root.join("_mcp")
    }

    /// Resolves the on-disk path for a named capability, without checking
    /// existence. For tools, the `<name>` stem is returned without an
    /// extension — callers that need a concrete file locate the matching
    /// extension themselves (§4.3 tools handler rejects ambiguity at add
    /// time by keeping exactly one file per tool name).
    #[must_use]
    pub fn path_of(&self, kind: Kind, name: &str) -> PathBuf {
        self.kind_dir(kind).join(name)
    }

    /// `C/_mcp/<name>`.
    #[must_use]
    pub fn mcp_server_dir(&self, name: &str) -> PathBuf {
        self.mcp_dir().join(name)
    }

    /// `C/_mcp/<name>/config.json`.
    #[must_use]
    pub fn mcp_config_path(&self, name: &str) -> PathBuf {
        self.mcp_server_dir(name).join("config.json")
    }

    /// Creates `tools/`, `skills/`, `library/`, and `_mcp/` under the root if
    /// absent. Idempotent: repeated calls on an existing layout are no-ops.
    ///
    /// Also canonicalizes `root` once the directory is known to exist, so
    /// later calls to [`ConfigStore::root`] return an absolute path.
    pub fn ensure_directories(&mut self) -> AepResult<()> {
        std::fs::create_dir_all(&self.root).map_err(|e| AepError::io(&self.root, e))?;
        for dir in [
            self.kind_dir(Kind::Tool),
            self.kind_dir(Kind::Skill),
            self.kind_dir(Kind::Library),
            self.mcp_dir(),
        ] {
            std::fs::create_dir_all(&dir).map_err(|e| AepError::io(&dir, e))?;
        }
        if let Ok(canon) = self.root.canonicalize() {
            self.root = canon;
        }
        tracing::debug!(root = %self.root.display(), "config store layout ensured");
        Ok(())
    }

    /// Lists capability names under `kind`, excluding generated index files,
    /// manifests, environment directories, and anything starting with `_`.
    pub fn list(&self, kind: Kind) -> AepResult<Vec<String>> {
        let dir = self.kind_dir(kind);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&dir).map_err(|e| AepError::io(&dir, e))? {
            let entry = entry.map_err(|e| AepError::io(&dir, e))?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if file_name.starts_with('_') || file_name == ".env" {
                continue;
            }
            if file_name == "index.md" || file_name == "requirements.txt" {
                continue;
            }
            let name = match kind {
                Kind::Skill | Kind::Library => file_name.to_string(),
                Kind::Tool => {
                    if file_name.ends_with(".md") {
                        continue;
                    }
                    Path::new(file_name)
                        .file_stem()
                        .and_then(|s| s.to_str())
                        .unwrap_or(file_name)
                        .to_string()
                }
            };
            names.push(name);
        }
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Removes a capability. For tools, removes every file whose stem
    /// matches `name` (the module plus its optional `.md` sidecar). For
    /// skills, removes the whole directory. For libraries, removes the
    /// single file.
    pub fn remove(&self, kind: Kind, name: &str) -> AepResult<()> {
        match kind {
            Kind::Tool => {
                let dir = self.kind_dir(Kind::Tool);
                let mut removed = false;
                if dir.exists() {
                    for entry in std::fs::read_dir(&dir).map_err(|e| AepError::io(&dir, e))? {
                        let entry = entry.map_err(|e| AepError::io(&dir, e))?;
                        let path = entry.path();
                        if path.file_stem().and_then(|s| s.to_str()) == Some(name) {
                            std::fs::remove_file(&path).map_err(|e| AepError::io(&path, e))?;
                            removed = true;
                        }
                    }
                }
                if !removed {
                    return Err(AepError::NotFound {
                        kind: CapabilityKind::Tool,
                        name: name.to_string(),
                    });
                }
            }
            Kind::Skill => {
                let path = self.path_of(Kind::Skill, name);
                if !path.is_dir() {
                    return Err(AepError::NotFound {
                        kind: CapabilityKind::Skill,
                        name: name.to_string(),
                    });
                }
                std::fs::remove_dir_all(&path).map_err(|e| AepError::io(&path, e))?;
            }
            Kind::Library => {
                let path = self.path_of(Kind::Library, name);
                if !path.is_file() {
                    return Err(AepError::NotFound {
                        kind: CapabilityKind::Library,
                        name: name.to_string(),
                    });
                }
                std::fs::remove_file(&path).map_err(|e| AepError::io(&path, e))?;
            }
        }
        Ok(())
    }

    /// Loads an MCP server record, if present.
    pub fn load_mcp_record(&self, name: &str) -> AepResult<Option<McpServerRecord>> {
        let path = self.mcp_config_path(name);
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path).map_err(|e| AepError::io(&path, e))?;
        let record: McpServerRecord = serde_json::from_str(&raw).map_err(|e| AepError::MalformedRecord {
            path: path.clone(),
            message: e.to_string(),
        })?;
        Ok(Some(record))
    }

    /// Persists an MCP server record, creating `_mcp/<name>/` if needed.
    /// Unknown fields are not a concern here since the record type is fully
    /// modeled; this preserves every field the type defines on write-back.
    pub fn save_mcp_record(&self, record: &McpServerRecord) -> AepResult<()> {
        let dir = self.mcp_server_dir(&record.name);
        std::fs::create_dir_all(&dir).map_err(|e| AepError::io(&dir, e))?;
        let path = dir.join("config.json");
        let json = serde_json::to_string_pretty(record).map_err(|e| AepError::MalformedRecord {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, json).map_err(|e| AepError::io(&path, e))?;
        Ok(())
    }

    /// Removes an MCP server's record directory entirely.
    pub fn remove_mcp_record(&self, name: &str) -> AepResult<()> {
        let dir = self.mcp_server_dir(name);
        if !dir.exists() {
            return Err(AepError::NotFound {
                kind: CapabilityKind::McpServer,
                name: name.to_string(),
            });
        }
        std::fs::remove_dir_all(&dir).map_err(|e| AepError::io(&dir, e))
    }

    /// Lists every configured MCP server name.
    pub fn list_mcp_servers(&self) -> AepResult<Vec<String>> {
        let dir = self.mcp_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&dir).map_err(|e| AepError::io(&dir, e))? {
            let entry = entry.map_err(|e| AepError::io(&dir, e))?;
            if entry.path().is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_directories_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ConfigStore::open(dir.path());
        store.ensure_directories().unwrap();
        let snapshot_one = std::fs::read_dir(store.root()).unwrap().count();
        store.ensure_directories().unwrap();
        let snapshot_two = std::fs::read_dir(store.root()).unwrap().count();
        assert_eq!(snapshot_one, snapshot_two);
        assert!(store.kind_dir(Kind::Tool).is_dir());
        assert!(store.kind_dir(Kind::Skill).is_dir());
        assert!(store.kind_dir(Kind::Library).is_dir());
        assert!(store.mcp_dir().is_dir());
    }

    #[test]
    fn list_excludes_generated_and_hidden_entries() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ConfigStore::open(dir.path());
        store.ensure_directories().unwrap();
        let tools = store.kind_dir(Kind::Tool);
        std::fs::write(tools.join("calc.py"), "def add(a, b): return a + b\n").unwrap();
        std::fs::write(tools.join("calc.md"), "# calc\n").unwrap();
        std::fs::write(tools.join("index.md"), "generated\n").unwrap();
        std::fs::write(tools.join("requirements.txt"), "\n").unwrap();
        std::fs::create_dir_all(tools.join(".env")).unwrap();
        std::fs::write(tools.join("_private.py"), "\n").unwrap();

        let names = store.list(Kind::Tool).unwrap();
        assert_eq!(names, vec!["calc".to_string()]);
    }

    #[test]
    fn mcp_record_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ConfigStore::open(dir.path());
        store.ensure_directories().unwrap();
        let record = McpServerRecord {
            name: "echo_stdio".to_string(),
            transport: crate::model::Transport::Stdio,
            command: Some(vec!["python3".to_string(), "server.py".to_string()]),
            env: None,
            url: None,
            headers: None,
            tools: vec![],
        };
        store.save_mcp_record(&record).unwrap();
        let loaded = store.load_mcp_record("echo_stdio").unwrap().unwrap();
        assert_eq!(loaded.name, "echo_stdio");
        assert_eq!(loaded.command, record.command);
    }
}
