//! `SKILL.md` validator (§4.3.1).
//!
//! Enforces the only domain-specific invariants the core checks on skill
//! metadata: a reserved-field whitelist, Unicode NFKC name normalization, a
//! strict lowercase-hyphen character class, and length caps. Every violation
//! found is collected — validation never short-circuits after the first
//! structural check passes.

use super::frontmatter::{self, ALLOWED_KEYS};
use std::path::Path;
use unicode_normalization::UnicodeNormalization;

const MAX_NAME_LEN: usize = 64;
const MAX_DESCRIPTION_LEN: usize = 1024;
const MAX_COMPATIBILITY_LEN: usize = 500;

/// Normalizes `s` under Unicode NFKC (compatibility decomposition followed
/// by canonical composition), matching the original's
/// `unicodedata.normalize("NFKC", ...)` call.
#[must_use]
pub fn nfkc(s: &str) -> String {
    s.nfkc().collect()
}

/// Validates the skill directory `dir`, returning every violation found.
/// An empty vector means the skill is valid (§8 "Skill validity").
pub fn validate_skill_dir(dir: &Path) -> Vec<String> {
    let mut errors = Vec::new();

    if !dir.is_dir() {
        errors.push(format!("{} does not exist or is not a directory", dir.display()));
        return errors;
    }

    let skill_md_path = dir.join("SKILL.md");
    if !skill_md_path.is_file() {
        errors.push("missing SKILL.md".to_string());
        return errors;
    }

    let raw = match std::fs::read_to_string(&skill_md_path) {
        Ok(raw) => raw,
        Err(e) => {
            errors.push(format!("failed to read SKILL.md: {e}"));
            return errors;
        }
    };

    let parsed = match frontmatter::parse(&raw) {
        Ok(parsed) => parsed,
        Err(e) => {
            errors.push(format!("failed to parse SKILL.md frontmatter: {e}"));
            return errors;
        }
    };

    // Step 4: frontmatter keys are a subset of the whitelist.
    for key in parsed.frontmatter.keys() {
        if !ALLOWED_KEYS.contains(&key.as_str()) {
            errors.push(format!("unrecognized frontmatter key: {key}"));
        }
    }

    // Step 5: name.
    let dir_basename = dir
        .file_name()
        .and_then(|s| s.to_str())
        .map(nfkc)
        .unwrap_or_default();
    match parsed.get_str("name") {
        None => errors.push("frontmatter is missing required key: name".to_string()),
        Some(raw_name) => {
            let name = nfkc(raw_name);
            if name.is_empty() {
                errors.push("name must not be empty".to_string());
            }
            if name.chars().count() > MAX_NAME_LEN {
                errors.push(format!("name exceeds {MAX_NAME_LEN} characters"));
            }
            if name.chars().any(char::is_uppercase) {
                errors.push("name must be lowercase".to_string());
            }
            if !name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            {
                errors.push("name must match [a-z0-9-]+".to_string());
            }
            if name.starts_with('-') || name.ends_with('-') {
                errors.push("name must not have a leading or trailing hyphen".to_string());
            }
            if name.contains("--") {
                errors.push("name must not contain consecutive hyphens".to_string());
            }
            if name != dir_basename {
                errors.push(format!(
                    "name '{name}' does not match directory name '{dir_basename}'"
                ));
            }
        }
    }

    // Step 6: description.
    match parsed.get_str("description") {
        None => errors.push("frontmatter is missing required key: description".to_string()),
        Some(description) => {
            if description.is_empty() {
                errors.push("description must not be empty".to_string());
            }
            if description.chars().count() > MAX_DESCRIPTION_LEN {
                errors.push(format!("description exceeds {MAX_DESCRIPTION_LEN} characters"));
            }
        }
    }

    // Step 7: compatibility, if present.
    if let Some(value) = parsed.frontmatter.get("compatibility") {
        match value.as_str() {
            None => errors.push("compatibility must be a string".to_string()),
            Some(compat) => {
                if compat.chars().count() > MAX_COMPATIBILITY_LEN {
                    errors.push(format!("compatibility exceeds {MAX_COMPATIBILITY_LEN} characters"));
                }
            }
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_skill(dir: &Path, name: &str, contents: &str) {
        let skill_dir = dir.join(name);
        std::fs::create_dir_all(&skill_dir).unwrap();
        std::fs::write(skill_dir.join("SKILL.md"), contents).unwrap();
    }

    #[test]
    fn accepts_valid_skill() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(
            tmp.path(),
            "greeter",
            "---\nname: greeter\ndescription: Says hello.\n---\nbody\n",
        );
        let errors = validate_skill_dir(&tmp.path().join("greeter"));
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn rejects_uppercase_and_space_in_name_without_short_circuit() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(
            tmp.path(),
            "bad-name",
            "---\nname: \"Bad Name\"\ndescription: d\n---\nbody\n",
        );
        let errors = validate_skill_dir(&tmp.path().join("bad-name"));
        assert!(errors.iter().any(|e| e.contains("lowercase")));
        assert!(errors.iter().any(|e| e.contains("[a-z0-9-]+")));
        assert!(errors.iter().any(|e| e.contains("does not match directory name")));
    }

    #[test]
    fn rejects_unknown_frontmatter_key() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(
            tmp.path(),
            "greeter",
            "---\nname: greeter\ndescription: d\nextra: nope\n---\nbody\n",
        );
        let errors = validate_skill_dir(&tmp.path().join("greeter"));
        assert!(errors.iter().any(|e| e.contains("unrecognized frontmatter key")));
    }

    #[test]
    fn rejects_missing_skill_md() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("empty")).unwrap();
        let errors = validate_skill_dir(&tmp.path().join("empty"));
        assert_eq!(errors, vec!["missing SKILL.md".to_string()]);
    }

    #[test]
    fn rejects_consecutive_and_trailing_hyphens() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(
            tmp.path(),
            "bad--name-",
            "---\nname: bad--name-\ndescription: d\n---\nbody\n",
        );
        let errors = validate_skill_dir(&tmp.path().join("bad--name-"));
        assert!(errors.iter().any(|e| e.contains("consecutive hyphens")));
        assert!(errors.iter().any(|e| e.contains("trailing hyphen")));
    }
}
