//! Capability broker core for the Agent Environment Protocol.
//!
//! This crate implements the four tightly coupled subsystems described in
//! the protocol specification: the capability configuration store
//! ([`store`]), the environment provisioner ([`provisioner`]) and capability
//! handlers ([`handlers`]), the workspace binder ([`binder`]), and the
//! command-interpreter session ([`session`]). MCP discovery and stub
//! compilation live one layer up in the sibling `aep-mcp` crate; default
//! subprocess-based collaborators live in `aep-runtime`. This crate only
//! defines the [`collab`] trait seam they implement.

#![forbid(unsafe_code)]

pub mod binder;
pub mod collab;
pub mod error;
pub mod executor;
pub mod handlers;
pub mod model;
pub mod provisioner;
pub mod session;
pub mod store;

pub use binder::{WorkspaceBinder, WorkspaceHandle};
pub use error::{AepError, AepResult, CapabilityKind};
pub use executor::{SkillExecutor, ToolExecutor};
pub use model::{ExecResult, McpServerRecord, ToolDescriptor, Transport};
pub use provisioner::Provisioner;
pub use session::Session;
pub use store::{ConfigStore, Kind};
