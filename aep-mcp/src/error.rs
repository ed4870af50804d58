//! Error taxonomy for the MCP discovery-and-stub-compiler bridge.

use thiserror::Error;

/// Errors raised while connecting to, discovering, or calling an MCP server.
///
/// These are internal to the discovery/call plumbing; [`crate::handler::McpHandler`]
/// converts them into `aep_core::AepError` variants at the crate boundary,
/// matching the rest of the broker's configuration-phase error surface.
#[derive(Debug, Error)]
pub enum McpBridgeError {
    /// Launching the stdio transport's child process, or opening the HTTP
    /// transport's stream, failed.
    #[error("failed to connect to MCP server '{server}': {cause}")]
    Connect {
        /// Server name as configured.
        server: String,
        /// Underlying transport/connection error.
        cause: String,
    },

    /// `initialize` or `tools/list` failed once the session was open.
    #[error("MCP discovery failed for '{server}': {cause}")]
    Discovery {
        /// Server name as configured.
        server: String,
        /// Underlying protocol error.
        cause: String,
    },

    /// A `tools/call` invocation failed.
    #[error("MCP call '{tool}' on '{server}' failed: {cause}")]
    Call {
        /// Server name as configured.
        server: String,
        /// Tool name being called.
        tool: String,
        /// Underlying protocol error.
        cause: String,
    },

    /// A stdio launcher's command could not be resolved on `PATH`.
    #[error("prerequisite command not found: {command} ({hint})")]
    PrerequisiteMissing {
        /// The command that could not be resolved.
        command: String,
        /// A human-readable installation hint.
        hint: String,
    },

    /// The record's transport-specific arguments failed validation
    /// (`stdio` without a command, `http` without a url).
    #[error("invalid MCP server record: {0}")]
    InvalidRecord(String),
}

/// Convenience alias for the bridge's internal, pre-conversion results.
pub type McpBridgeResult<T> = Result<T, McpBridgeError>;
