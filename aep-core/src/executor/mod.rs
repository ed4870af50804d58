//! Tool (§4.7) and skill (§4.8) executors: the two places a
//! [`crate::session::Session`] hands user-supplied code to the
//! [`crate::collab::CodeInterpreter`] collaborator.
//!
//! Both executors are thin: they resolve paths and environments, then
//! delegate the actual run to the collaborator. Everything
//! interpreter-language-specific (loading tool modules into a `tools`
//! namespace, REPL-style last-expression echo) is the collaborator's
//! responsibility — these executors only know about files and directories.

pub mod skill;
pub mod tool;

pub use skill::SkillExecutor;
pub use tool::ToolExecutor;
