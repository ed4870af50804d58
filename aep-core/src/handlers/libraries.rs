//! Libraries handler (§4.3): copy-and-rename reference documents, with a
//! generated index. The simplest of the three capability handlers — a
//! library item has no dependency environment and no validation step.

use crate::error::AepResult;
use crate::store::{ConfigStore, Kind};
use std::path::{Path, PathBuf};

/// Thin orchestrator over the config store for library items.
pub struct LibrariesHandler<'a> {
    store: &'a ConfigStore,
}

impl<'a> LibrariesHandler<'a> {
    /// Builds a handler bound to the given store.
    #[must_use]
    pub fn new(store: &'a ConfigStore) -> Self {
        Self { store }
    }

    /// Copies `source` into `C/library/<name>`, where `name` defaults to
    /// `source`'s file name. Returns the installed path.
    pub fn add(&self, source: &Path, name: Option<&str>) -> AepResult<PathBuf> {
        let file_name = source
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                crate::error::AepError::BadRunSyntax(format!(
                    "cannot derive library name from {}",
                    source.display()
                ))
            })?;
        let name = name.unwrap_or(file_name);
        let dir = self.store.kind_dir(Kind::Library);
        std::fs::create_dir_all(&dir).map_err(|e| crate::error::AepError::io(&dir, e))?;
        let dest = dir.join(name);
        std::fs::copy(source, &dest).map_err(|e| crate::error::AepError::io(&dest, e))?;
        tracing::info!(library = %name, dest = %dest.display(), "library item added");
        Ok(dest)
    }

    /// Removes a library item.
    pub fn remove(&self, name: &str) -> AepResult<()> {
        self.store.remove(Kind::Library, name)
    }

    /// Lists library item names.
    pub fn list(&self) -> AepResult<Vec<String>> {
        self.store.list(Kind::Library)
    }

    /// Writes `C/library/index.md` enumerating every library item. Ordering
    /// within the index is irrelevant per the data model, so the config
    /// store's sorted listing is used as-is.
    pub fn generate_index(&self) -> AepResult<PathBuf> {
        let names = self.list()?;
        let mut out = String::from("# Library\n\n");
        if names.is_empty() {
            out.push_str("(no library items registered)\n");
        }
        for name in &names {
            out.push_str(&format!("- `{name}`\n"));
        }
        let path = self.store.kind_dir(Kind::Library).join("index.md");
        std::fs::write(&path, out).map_err(|e| crate::error::AepError::io(&path, e))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, ConfigStore) {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ConfigStore::open(dir.path());
        store.ensure_directories().unwrap();
        (dir, store)
    }

    #[test]
    fn add_then_list_then_index() {
        let (tmp, store) = setup();
        let handler = LibrariesHandler::new(&store);
        let src = tmp.path().join("notes.md");
        std::fs::write(&src, "# Notes\n").unwrap();
        let dest = handler.add(&src, None).unwrap();
        assert!(dest.is_file());
        assert_eq!(handler.list().unwrap(), vec!["notes.md".to_string()]);
        let index_path = handler.generate_index().unwrap();
        assert!(std::fs::read_to_string(index_path).unwrap().contains("notes.md"));
    }

    #[test]
    fn add_with_explicit_rename() {
        let (tmp, store) = setup();
        let handler = LibrariesHandler::new(&store);
        let src = tmp.path().join("draft.txt");
        std::fs::write(&src, "draft\n").unwrap();
        let dest = handler.add(&src, Some("final.txt")).unwrap();
        assert_eq!(dest.file_name().unwrap().to_str().unwrap(), "final.txt");
    }

    #[test]
    fn remove_unlinks_file() {
        let (tmp, store) = setup();
        let handler = LibrariesHandler::new(&store);
        let src = tmp.path().join("notes.md");
        std::fs::write(&src, "x\n").unwrap();
        handler.add(&src, None).unwrap();
        handler.remove("notes.md").unwrap();
        assert!(handler.list().unwrap().is_empty());
    }
}
