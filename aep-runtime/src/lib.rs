//! Default, subprocess-based collaborators for the Agent Environment
//! Protocol core.
//!
//! `aep-core` only defines the [`aep_core::collab::PackageInstaller`] and
//! [`aep_core::collab::CodeInterpreter`] trait seams; this crate supplies
//! the implementations a standalone binary actually wires up — `uv` for
//! environment management ([`UvInstaller`]) and the venv's own `python` for
//! execution ([`PythonInterpreter`]) — grounded on the CLI adapters'
//! subprocess-handling conventions in the teacher repository.

#![deny(unsafe_code)]

pub mod error;
pub mod installer;
pub mod interpreter;
mod process;

pub use error::{RuntimeError, RuntimeResult};
pub use installer::{UvInstaller, UV_BIN_ENV_VAR};
pub use interpreter::PythonInterpreter;
