//! Skills handler (§4.3): add / list / remove / index skill directories,
//! including frontmatter validation and rollback on failure.

use super::frontmatter;
use super::validator::validate_skill_dir;
use crate::error::{AepError, AepResult};
use crate::model::SkillIndexEntry;
use crate::provisioner::Provisioner;
use crate::store::{ConfigStore, Kind};
use std::path::{Path, PathBuf};

/// Thin orchestrator over the config store, validator, and provisioner for
/// skills.
pub struct SkillsHandler<'a> {
    store: &'a ConfigStore,
    provisioner: &'a Provisioner,
}

impl<'a> SkillsHandler<'a> {
    /// Builds a handler bound to the given store and provisioner.
    #[must_use]
    pub fn new(store: &'a ConfigStore, provisioner: &'a Provisioner) -> Self {
        Self { store, provisioner }
    }

    fn skill_env_dir(&self, name: &str) -> PathBuf {
        self.store.path_of(Kind::Skill, name).join(".env")
    }

    fn skill_manifest_path(&self, name: &str) -> PathBuf {
        self.store.path_of(Kind::Skill, name).join("requirements.txt")
    }

    /// Adds a skill from either a directory (copied recursively, name
    /// defaults to the directory's basename) or a single `SKILL.md` file
    /// (name derived from its frontmatter `name`).
    ///
    /// After copying, the result is validated; any failure rolls the
    /// just-copied directory back and returns
    /// [`AepError::SkillValidationFailed`].
    pub async fn add(
        &self,
        source: &Path,
        name: Option<&str>,
        dependencies: &[String],
    ) -> AepResult<PathBuf> {
        let dest = if source.is_dir() {
            self.add_from_directory(source, name)?
        } else {
            self.add_from_skill_md(source, name)?
        };

        let errors = validate_skill_dir(&dest);
        if !errors.is_empty() {
            let _ = std::fs::remove_dir_all(&dest);
            return Err(AepError::SkillValidationFailed { errors });
        }

        let skill_name = dest
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();

        if !dependencies.is_empty() {
            self.add_dependencies(&skill_name, dependencies).await?;
        }

        tracing::info!(skill = %skill_name, dest = %dest.display(), "skill added");
        Ok(dest)
    }

    fn add_from_directory(&self, source: &Path, name: Option<&str>) -> AepResult<PathBuf> {
        let basename = source
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| AepError::BadRunSyntax(format!("cannot derive skill name from {}", source.display())))?;
        let name = name.unwrap_or(basename);
        let dest = self.store.path_of(Kind::Skill, name);
        if dest.exists() {
            std::fs::remove_dir_all(&dest).map_err(|e| AepError::io(&dest, e))?;
        }
        copy_dir_recursive(source, &dest)?;
        Ok(dest)
    }

    fn add_from_skill_md(&self, source: &Path, name: Option<&str>) -> AepResult<PathBuf> {
        let raw = std::fs::read_to_string(source).map_err(|e| AepError::io(source, e))?;
        let parsed = frontmatter::parse(&raw).map_err(|e| AepError::MalformedRecord {
            path: source.to_path_buf(),
            message: e.to_string(),
        })?;
        let derived_name = parsed.get_str("name").ok_or_else(|| AepError::MalformedRecord {
            path: source.to_path_buf(),
            message: "frontmatter is missing required key: name".to_string(),
        })?;
        if let Some(requested) = name {
            if requested != derived_name {
                return Err(AepError::MalformedRecord {
                    path: source.to_path_buf(),
                    message: format!(
                        "requested name '{requested}' disagrees with frontmatter name '{derived_name}'"
                    ),
                });
            }
        }
        let dest = self.store.path_of(Kind::Skill, derived_name);
        if dest.exists() {
            std::fs::remove_dir_all(&dest).map_err(|e| AepError::io(&dest, e))?;
        }
        std::fs::create_dir_all(&dest).map_err(|e| AepError::io(&dest, e))?;
        std::fs::write(dest.join("SKILL.md"), raw).map_err(|e| AepError::io(&dest, e))?;
        Ok(dest)
    }

    /// Merges `specifiers` into the named skill's manifest and installs
    /// them into its own environment.
    pub async fn add_dependencies(&self, name: &str, specifiers: &[String]) -> AepResult<()> {
        let manifest = self.skill_manifest_path(name);
        Provisioner::save_manifest(&manifest, specifiers)?;
        let env_dir = self.skill_env_dir(name);
        self.provisioner.ensure_environment(&env_dir).await?;
        self.provisioner.install(&env_dir, specifiers).await
    }

    /// Removes a skill directory entirely.
    pub fn remove(&self, name: &str) -> AepResult<()> {
        self.store.remove(Kind::Skill, name)
    }

    /// Lists skill directory names.
    pub fn list(&self) -> AepResult<Vec<String>> {
        self.store.list(Kind::Skill)
    }

    /// Reads each skill's `SKILL.md` frontmatter and writes
    /// `C/skills/index.md`.
    pub fn generate_index(&self) -> AepResult<PathBuf> {
        let names = self.list()?;
        let mut entries = Vec::new();
        for name in &names {
            let skill_md = self.store.path_of(Kind::Skill, name).join("SKILL.md");
            let Ok(raw) = std::fs::read_to_string(&skill_md) else {
                continue;
            };
            let Ok(parsed) = frontmatter::parse(&raw) else {
                continue;
            };
            entries.push(SkillIndexEntry {
                name: name.clone(),
                description: parsed.get_str("description").unwrap_or_default().to_string(),
                path: format!("skills/{name}/SKILL.md"),
            });
        }

        let mut out = String::from("# Skills\n\n");
        if entries.is_empty() {
            out.push_str("(no skills registered)\n");
        }
        for entry in &entries {
            out.push_str(&format!("- `{}` — {} ({})\n", entry.name, entry.description, entry.path));
        }
        let path = self.store.kind_dir(Kind::Skill).join("index.md");
        std::fs::write(&path, out).map_err(|e| AepError::io(&path, e))?;
        Ok(path)
    }
}

fn copy_dir_recursive(src: &Path, dest: &Path) -> AepResult<()> {
    std::fs::create_dir_all(dest).map_err(|e| AepError::io(dest, e))?;
    for entry in std::fs::read_dir(src).map_err(|e| AepError::io(src, e))? {
        let entry = entry.map_err(|e| AepError::io(src, e))?;
        let src_path = entry.path();
        let dest_path = dest.join(entry.file_name());
        if src_path.is_dir() {
            copy_dir_recursive(&src_path, &dest_path)?;
        } else {
            std::fs::copy(&src_path, &dest_path).map_err(|e| AepError::io(&dest_path, e))?;
        }
    }
    Ok(())
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
    async fn add_directory_skill_succeeds() {
        let (tmp, store) = setup();
        let provisioner = Provisioner::new(std::sync::Arc::new(NoopInstaller));
        let handler = SkillsHandler::new(&store, &provisioner);
        let src_dir = tmp.path().join("greeter");
        std::fs::create_dir_all(&src_dir).unwrap();
        std::fs::write(
            src_dir.join("SKILL.md"),
            "---\nname: greeter\ndescription: Says hello.\n---\nbody\n",
        )
        .unwrap();
        std::fs::write(src_dir.join("main.py"), "print('hi')\n").unwrap();

        let dest = handler.add(&src_dir, None, &[]).await.unwrap();
        assert!(dest.join("SKILL.md").is_file());
        assert!(dest.join("main.py").is_file());
        assert_eq!(handler.list().unwrap(), vec!["greeter".to_string()]);
    }

    #[tokio::test]
    async fn invalid_skill_is_rolled_back() {
        let (tmp, store) = setup();
        let provisioner = Provisioner::new(std::sync::Arc::new(NoopInstaller));
        let handler = SkillsHandler::new(&store, &provisioner);
        let src_dir = tmp.path().join("Bad Dir");
        std::fs::create_dir_all(&src_dir).unwrap();
        std::fs::write(
            src_dir.join("SKILL.md"),
            "---\nname: \"Bad Name\"\ndescription: d\n---\nbody\n",
        )
        .unwrap();

        let result = handler.add(&src_dir, None, &[]).await;
        assert!(matches!(result, Err(AepError::SkillValidationFailed { .. })));
        assert!(handler.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn add_single_file_skill_md_derives_name() {
        let (tmp, store) = setup();
        let provisioner = Provisioner::new(std::sync::Arc::new(NoopInstaller));
        let handler = SkillsHandler::new(&store, &provisioner);
        let src = tmp.path().join("standalone.md");
        std::fs::write(&src, "---\nname: solo\ndescription: A lone skill.\n---\nbody\n").unwrap();

        let dest = handler.add(&src, None, &[]).await.unwrap();
        assert_eq!(dest.file_name().unwrap().to_str().unwrap(), "solo");
    }
}
