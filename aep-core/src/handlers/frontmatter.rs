//! Parsing of `SKILL.md`'s triple-dash-delimited YAML frontmatter (§6).

use std::collections::BTreeMap;

/// The whitelist of frontmatter keys the validator recognizes (§4.3.1 step 4,
/// §6).
pub const ALLOWED_KEYS: &[&str] = &[
    "name",
    "description",
    "license",
    "allowed-tools",
    "metadata",
    "compatibility",
];

/// A parsed `SKILL.md`: the frontmatter mapping plus the markdown body that
/// follows it.
#[derive(Debug, Clone)]
pub struct ParsedSkillMd {
    /// Frontmatter keys in source order, each paired with its raw YAML
    /// value. Kept as `serde_yaml::Value` so the validator can distinguish
    /// "present but empty" from "absent" and so `metadata`'s nested mapping
    /// survives untouched.
    pub frontmatter: BTreeMap<String, serde_yaml::Value>,
    /// Everything after the closing `---` delimiter.
    pub body: String,
}

/// Errors that can occur while splitting/parsing `SKILL.md`, distinct from
/// the semantic validation errors in §4.3.1 (those are collected, not
/// short-circuited; a parse error here means there is no frontmatter
/// structure to validate at all).
#[derive(Debug, thiserror::Error)]
pub enum FrontmatterError {
    /// The file does not start with a `---` delimited block.
    #[error("SKILL.md does not start with a '---' frontmatter block")]
    MissingDelimiter,
    /// The opening `---` was never closed.
    #[error("SKILL.md frontmatter block is not closed with a second '---'")]
    UnclosedBlock,
    /// The frontmatter body did not parse as a YAML mapping.
    #[error("SKILL.md frontmatter is not a valid YAML mapping: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),
    /// The frontmatter parsed but was not a mapping (e.g. a scalar or list).
    #[error("SKILL.md frontmatter must be a mapping")]
    NotAMapping,
}

/// Splits `raw` into its frontmatter block and body, then parses the block
/// as a YAML mapping.
pub fn parse(raw: &str) -> Result<ParsedSkillMd, FrontmatterError> {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let rest = raw
        .strip_prefix("---\r\n")
        .or_else(|| raw.strip_prefix("---\n"))
        .ok_or(FrontmatterError::MissingDelimiter)?;

    let end = find_closing_delimiter(rest).ok_or(FrontmatterError::UnclosedBlock)?;
    let (block, body) = rest.split_at(end.0);
    let body = &body[end.1..];

    let value: serde_yaml::Value = serde_yaml::from_str(block)?;
    let serde_yaml::Value::Mapping(mapping) = value else {
        return Err(FrontmatterError::NotAMapping);
    };

    let mut frontmatter = BTreeMap::new();
    for (key, val) in mapping {
        if let serde_yaml::Value::String(key) = key {
            frontmatter.insert(key, val);
        }
    }

    Ok(ParsedSkillMd {
        frontmatter,
        body: body.trim_start_matches(['\r', '\n']).to_string(),
    })
}

/// Finds the line-start offset of the closing `---` and the offset just past
/// its trailing newline, returned as `(block_end, body_start)` relative to
/// `rest`.
fn find_closing_delimiter(rest: &str) -> Option<(usize, usize)> {
    let mut offset = 0usize;
    for line in rest.split_inclusive('\n') {
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if trimmed == "---" {
            return Some((offset, offset + line.len()));
        }
        offset += line.len();
    }
    None
}

impl ParsedSkillMd {
    /// Returns the string value of `key`, if present and a YAML string.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.frontmatter.get(key).and_then(serde_yaml::Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_frontmatter() {
        let raw = "---\nname: greeter\ndescription: Says hello.\n---\n# Greeter\n\nBody text.\n";
        let parsed = parse(raw).unwrap();
        assert_eq!(parsed.get_str("name"), Some("greeter"));
        assert_eq!(parsed.get_str("description"), Some("Says hello."));
        assert!(parsed.body.starts_with("# Greeter"));
    }

    #[test]
    fn rejects_missing_delimiter() {
        let raw = "name: greeter\n";
        assert!(matches!(parse(raw), Err(FrontmatterError::MissingDelimiter)));
    }

    #[test]
    fn rejects_unclosed_block() {
        let raw = "---\nname: greeter\n";
        assert!(matches!(parse(raw), Err(FrontmatterError::UnclosedBlock)));
    }

    #[test]
    fn preserves_nested_metadata_mapping() {
        let raw = "---\nname: greeter\ndescription: d\nmetadata:\n  author: a\n  version: 2\n---\nbody\n";
        let parsed = parse(raw).unwrap();
        let metadata = parsed.frontmatter.get("metadata").unwrap();
        assert!(metadata.is_mapping());
    }
}
