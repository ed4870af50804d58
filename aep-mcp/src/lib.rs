//! MCP discovery-and-stub-compiler bridge for the Agent Environment
//! Protocol.
//!
//! Connects to MCP servers over stdio or streamable HTTP transports via
//! [`rmcp`], enumerates their tools, and code-generates self-contained
//! Python call stubs that the `aep-runtime` interpreter collaborator loads
//! like any other tool module. See [`handler::McpHandler`] for the public
//! entry point.

#![forbid(unsafe_code)]

pub mod discovery;
pub mod error;
pub mod handler;
pub mod stub;

pub use error::{McpBridgeError, McpBridgeResult};
pub use handler::McpHandler;
