//! Error taxonomy for the capability broker core.

use std::path::PathBuf;
use thiserror::Error;

/// Which kind of capability a [`AepError::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityKind {
    /// A plain tool module or MCP-generated stub.
    Tool,
    /// A skill directory.
    Skill,
    /// A library item.
    Library,
    /// An MCP server record.
    McpServer,
}

impl std::fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Tool => "tool",
            Self::Skill => "skill",
            Self::Library => "library",
            Self::McpServer => "mcp server",
        };
        f.write_str(s)
    }
}

/// Errors surfaced synchronously during the configuration and attach phases.
///
/// Runtime-phase errors (those raised while a [`crate::session::Session`] is
/// executing an agent command) are normalized into [`crate::model::ExecResult`]
/// rather than propagated as this type — see `session.rs` for that boundary.
#[derive(Debug, Error)]
pub enum AepError {
    /// No capability of the given kind and name exists in the config store.
    #[error("{kind} not found: {name}")]
    NotFound {
        /// Capability kind.
        kind: CapabilityKind,
        /// Capability name.
        name: String,
    },

    /// An `add` operation targeted a name that already exists and the
    /// operation does not overwrite.
    #[error("{kind} already exists: {name}")]
    AlreadyExists {
        /// Capability kind.
        kind: CapabilityKind,
        /// Capability name.
        name: String,
    },

    /// A skill's `SKILL.md` failed validation; the partially-copied directory
    /// has already been rolled back by the time this is returned.
    #[error("skill validation failed with {} error(s): {}", .errors.len(), .errors.join("; "))]
    SkillValidationFailed {
        /// All validation errors collected (validation does not short-circuit).
        errors: Vec<String>,
    },

    /// A required external command (e.g. an MCP server launcher) could not be
    /// resolved on `PATH`.
    #[error("prerequisite command not found: {command} ({hint})")]
    PrerequisiteMissing {
        /// The command that could not be resolved.
        command: String,
        /// A human-readable installation hint.
        hint: String,
    },

    /// MCP `initialize`/`list_tools` failed against a configured server.
    #[error("MCP discovery failed: {cause}")]
    DiscoveryFailed {
        /// Underlying cause, as reported by the MCP client collaborator.
        cause: String,
    },

    /// The environment provisioner could not find or invoke the package
    /// installer collaborator.
    #[error("failed to create isolated environment at {path}: {cause}")]
    EnvCreationFailed {
        /// Environment directory that could not be created.
        path: PathBuf,
        /// Underlying cause.
        cause: String,
    },

    /// The package installer collaborator ran but exited non-zero.
    #[error("dependency installation failed: {stderr}")]
    InstallFailed {
        /// Captured stderr from the installer invocation.
        stderr: String,
    },

    /// A tool/skill environment was referenced before it was provisioned.
    #[error("{kind} environment not provisioned at {path}")]
    EnvMissing {
        /// Capability kind the environment belongs to.
        kind: CapabilityKind,
        /// Expected environment directory.
        path: PathBuf,
    },

    /// `tools run` was given a command that does not parse as opaque code.
    #[error("malformed `tools run` syntax: {0}")]
    BadRunSyntax(String),

    /// `attach` found a non-symlink child already occupying a binder slot.
    #[error("workspace conflict: {path} already exists and is not a symbolic link")]
    WorkspaceConflict {
        /// The conflicting path.
        path: PathBuf,
    },

    /// A session method that requires an attached binder was called before
    /// `attach` completed. This is a programmer error, not a runtime fault.
    #[error("session used before workspace attach")]
    NotAttached,

    /// Generic I/O failure from the config store or handlers.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path the I/O operation concerned.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A manifest or record file contained malformed JSON/frontmatter.
    #[error("failed to parse {path}: {message}")]
    MalformedRecord {
        /// Path to the offending file.
        path: PathBuf,
        /// Parse failure description.
        message: String,
    },
}

impl AepError {
    /// Wraps a raw I/O error with the path that triggered it.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias used throughout the core for configuration-phase results.
pub type AepResult<T> = Result<T, AepError>;
