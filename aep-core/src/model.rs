//! Shared data model: on-disk record shapes and the runtime result value.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The literal stderr sentinel written on a timed-out execution.
///
/// Preserved verbatim from the original implementation — treated as a wire
/// format constant, not user-facing prose to be localized.
pub const TIMEOUT_SENTINEL: &str = "执行超时";

/// Return code used when a child process is killed after exceeding its
/// deadline.
pub const TIMEOUT_RETURN_CODE: i32 = 124;

/// Result of running a command through a [`crate::session::Session`], or of
/// invoking a tool/skill executor directly.
///
/// `return_code` is `0` on success, `124` on timeout, and otherwise whatever
/// the child process exited with (or `1` for errors the core itself raises,
/// e.g. a malformed `tools run` snippet).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecResult {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Process exit code (0 success, 124 timeout, other nonzero otherwise).
    pub return_code: i32,
}

impl ExecResult {
    /// Builds a successful result from captured stdout with empty stderr.
    #[must_use]
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            return_code: 0,
        }
    }

    /// Builds a general-failure result (`return_code = 1`) carrying a
    /// message on stderr.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: message.into(),
            return_code: 1,
        }
    }

    /// Builds the canonical timeout result: `return_code = 124` and the
    /// literal timeout sentinel on stderr, with whatever output was captured
    /// before the deadline preserved.
    #[must_use]
    pub fn timed_out(partial_stdout: impl Into<String>, partial_stderr: impl Into<String>) -> Self {
        let mut stderr = partial_stderr.into();
        if !stderr.is_empty() {
            stderr.push('\n');
        }
        stderr.push_str(TIMEOUT_SENTINEL);
        Self {
            stdout: partial_stdout.into(),
            stderr,
            return_code: TIMEOUT_RETURN_CODE,
        }
    }

    /// Returns `true` when `return_code == 0`.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.return_code == 0
    }

    /// Returns `true` when `return_code == 124`.
    #[must_use]
    pub const fn timed_out_flag(&self) -> bool {
        self.return_code == TIMEOUT_RETURN_CODE
    }
}

/// Transport used to reach an MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Child-process stdio transport.
    Stdio,
    /// Streamable HTTP transport.
    Http,
}

/// A single tool descriptor as returned by an MCP server's `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolDescriptor {
    /// Tool name as exposed by the server.
    pub name: String,
    /// Human-readable description, embedded into the generated stub's doc
    /// comment.
    pub description: String,
    /// JSON-schema-shaped input schema (kept as a raw JSON value; the stub
    /// compiler interprets `type`/`properties`/`required`/`default`).
    pub input_schema: serde_json::Value,
}

/// The persisted record for one configured MCP server, stored at
/// `C/_mcp/<name>/config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpServerRecord {
    /// Server name; also the generated stub's tool name.
    pub name: String,
    /// Transport kind.
    pub transport: Transport,
    /// Command (argv) for the stdio transport. Non-empty iff
    /// `transport == Stdio`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
    /// Environment overlay applied to the stdio child process.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<HashMap<String, String>>,
    /// URL for the http transport. Non-empty iff `transport == Http`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Extra headers for the http transport.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
    /// Tools discovered on the server. Empty until the first successful
    /// discovery; may remain empty if `list_tools` failed but `initialize`
    /// succeeded.
    #[serde(default)]
    pub tools: Vec<ToolDescriptor>,
}

impl McpServerRecord {
    /// Validates the transport-specific argument invariant from §4.4 step 1:
    /// `stdio ⇒ command non-empty`, `http ⇒ url non-empty`.
    pub fn validate_transport_args(&self) -> Result<(), String> {
        match self.transport {
            Transport::Stdio => {
                if self.command.as_ref().is_none_or(Vec::is_empty) {
                    return Err("stdio transport requires a non-empty command".to_string());
                }
            }
            Transport::Http => {
                if self.url.as_ref().is_none_or(String::is_empty) {
                    return Err("http transport requires a non-empty url".to_string());
                }
            }
        }
        Ok(())
    }
}

/// Row emitted into `skills/index.md`.
#[derive(Debug, Clone)]
pub struct SkillIndexEntry {
    /// Skill directory name.
    pub name: String,
    /// `description` from the skill's frontmatter.
    pub description: String,
    /// Path relative to the config root.
    pub path: String,
}
