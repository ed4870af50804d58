//! Interpreter session (§4.6): tokenizes agent-issued command text and
//! routes it to the capability handlers, the tool/skill executors, or a
//! shell passthrough.

use crate::collab::CodeInterpreter;
use crate::executor::{SkillExecutor, ToolExecutor};
use crate::model::ExecResult;
use crate::store::{ConfigStore, Kind};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

/// Timeout applied to shell passthrough commands.
pub const SHELL_TIMEOUT: Duration = Duration::from_secs(60);

/// A single-threaded, stateful command interpreter bound to one workspace
/// and config store.
///
/// Built via [`crate::binder::WorkspaceHandle::create_session`]. Holds
/// `cwd` (initialized to the workspace root) and a session-local
/// environment overlay, both mutated in place as commands execute.
pub struct Session {
    workspace: PathBuf,
    config: ConfigStore,
    interpreter: Arc<dyn CodeInterpreter>,
    cwd: PathBuf,
    env: HashMap<String, String>,
}

impl Session {
    /// Builds a session rooted at `workspace`, backed by `config` and
    /// delegating tool/skill runs to `interpreter`.
    #[must_use]
    pub fn new(workspace: PathBuf, config: ConfigStore, interpreter: Arc<dyn CodeInterpreter>) -> Self {
        let cwd = workspace.clone();
        Self {
            workspace,
            config,
            interpreter,
            cwd,
            env: HashMap::new(),
        }
    }

    /// The session's current working directory.
    #[must_use]
    pub fn cwd(&self) -> &std::path::Path {
        &self.cwd
    }

    /// The session-local environment overlay (`export`-set variables).
    #[must_use]
    pub fn env(&self) -> &HashMap<String, String> {
        &self.env
    }

    /// Executes one line of agent-issued command text and returns its
    /// result. Never returns `Err`: every failure mode this method can
    /// produce is normalized into a non-zero [`ExecResult`], per the §7
    /// runtime-phase propagation policy.
    pub async fn exec(&mut self, command: &str) -> ExecResult {
        let trimmed = command.trim();
        if trimmed.is_empty() {
            return ExecResult::ok(String::new());
        }

        if trimmed == "tools run" {
            return self.run_tools_run("").await;
        }
        if let Some(rest) = trimmed.strip_prefix("tools run ") {
            return self.run_tools_run(rest).await;
        }

        match trimmed {
            "tools list" => return self.tools_list(),
            "skills list" => return self.skills_list(),
            _ => {}
        }
        if let Some(name) = trimmed.strip_prefix("tools info ") {
            return self.tools_info(name.trim());
        }
        if let Some(name) = trimmed.strip_prefix("skills info ") {
            return self.skills_info(name.trim());
        }
        if let Some(rest) = trimmed.strip_prefix("skills run ") {
            return self.run_skills_run(rest).await;
        }
        if trimmed == "cd" || trimmed.starts_with("cd ") {
            return self.run_cd(trimmed);
        }
        if trimmed == "export" || trimmed.starts_with("export ") {
            return self.run_export(trimmed);
        }

        self.shell_passthrough(trimmed).await
    }

    /// Concatenates `tools/index.md`, `skills/index.md`, and
    /// `library/index.md` (whichever exist) separated by blank lines, for
    /// use as system-prompt seed material.
    #[must_use]
    pub fn get_context(&self) -> String {
        let mut parts = Vec::new();
        for kind in [Kind::Tool, Kind::Skill, Kind::Library] {
            let path = self.config.kind_dir(kind).join("index.md");
            if let Ok(contents) = std::fs::read_to_string(&path) {
                parts.push(contents);
            }
        }
        parts.join("\n\n")
    }

    fn tools_list(&self) -> ExecResult {
        let path = self.config.kind_dir(Kind::Tool).join("index.md");
        match std::fs::read_to_string(&path) {
            Ok(contents) => ExecResult::ok(contents),
            Err(_) => ExecResult::ok("no tools"),
        }
    }

    fn skills_list(&self) -> ExecResult {
        let path = self.config.kind_dir(Kind::Skill).join("index.md");
        match std::fs::read_to_string(&path) {
            Ok(contents) => ExecResult::ok(contents),
            Err(_) => ExecResult::ok("no skills"),
        }
    }

    fn tools_info(&self, name: &str) -> ExecResult {
        if name.is_empty() {
            return ExecResult::failure("usage: tools info <name>");
        }
        let sidecar = self.config.kind_dir(Kind::Tool).join(format!("{name}.md"));
        if let Ok(contents) = std::fs::read_to_string(&sidecar) {
            return ExecResult::ok(contents);
        }
        match find_module_docstring(&self.config, name) {
            Some(doc) => ExecResult::ok(doc),
            None => ExecResult::failure(format!("tool not found: {name}")),
        }
    }

    fn skills_info(&self, name: &str) -> ExecResult {
        if name.is_empty() {
            return ExecResult::failure("usage: skills info <name>");
        }
        let dir = self.config.kind_dir(Kind::Skill).join(name);
        for candidate in ["SKILL.md", "README.md"] {
            let path = dir.join(candidate);
            if let Ok(contents) = std::fs::read_to_string(&path) {
                return ExecResult::ok(contents);
            }
        }
        ExecResult::failure(format!("skill not found: {name}"))
    }

    fn run_cd(&mut self, trimmed: &str) -> ExecResult {
        let arg = trimmed.strip_prefix("cd").unwrap_or("").trim();
        let target = if arg.is_empty() {
            self.workspace.clone()
        } else if std::path::Path::new(arg).is_absolute() {
            PathBuf::from(arg)
        } else {
            self.cwd.join(arg)
        };
        if !target.is_dir() {
            return ExecResult::failure(format!("cd: not a directory: {}", target.display()));
        }
        self.cwd = target.canonicalize().unwrap_or(target);
        ExecResult::ok(String::new())
    }

    fn run_export(&mut self, trimmed: &str) -> ExecResult {
        let rest = trimmed.strip_prefix("export").unwrap_or("").trim();
        if rest.is_empty() {
            let mut lines: Vec<String> =
                self.env.iter().map(|(k, v)| format!("{k}={v}")).collect();
            lines.sort();
            return ExecResult::ok(lines.join("\n"));
        }
        let Ok(tokens) = shell_words::split(rest) else {
            return ExecResult::failure("export: malformed argument list");
        };
        for token in &tokens {
            match token.split_once('=') {
                Some((key, value)) if !key.is_empty() => {
                    self.env.insert(key.to_string(), value.to_string());
                }
                _ => return ExecResult::failure(format!("export: malformed assignment: {token}")),
            }
        }
        ExecResult::ok(String::new())
    }

    async fn run_tools_run(&self, rest: &str) -> ExecResult {
        match extract_code_argument(rest) {
            Ok(code) => {
                let executor = ToolExecutor::new(&self.config, Arc::clone(&self.interpreter));
                executor.run(&code, &self.cwd, &self.workspace).await
            }
            Err(message) => ExecResult::failure(message),
        }
    }

    async fn run_skills_run(&self, rest: &str) -> ExecResult {
        let Ok(tokens) = shell_words::split(rest) else {
            return ExecResult::failure("malformed `skills run` syntax");
        };
        let Some((path, args)) = tokens.split_first() else {
            return ExecResult::failure("usage: skills run <skill>/<path> [args...]");
        };
        let Some((skill, relative)) = path.split_once('/') else {
            return ExecResult::failure(format!("malformed skill path: {path}"));
        };
        let executor = SkillExecutor::new(&self.config, Arc::clone(&self.interpreter));
        match executor.run(skill, relative, args).await {
            Ok(result) => result,
            Err(e) => ExecResult::failure(e.to_string()),
        }
    }

    async fn shell_passthrough(&self, command: &str) -> ExecResult {
        let mut cmd = build_shell_command(command);
        cmd.current_dir(&self.cwd);
        cmd.envs(&self.env);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => return ExecResult::failure(format!("failed to spawn shell: {e}")),
        };

        let mut stdout_pipe = child.stdout.take();
        let mut stderr_pipe = child.stderr.take();

        let run = async {
            let mut stdout = String::new();
            let mut stderr = String::new();
            if let Some(pipe) = stdout_pipe.as_mut() {
                let _ = pipe.read_to_string(&mut stdout).await;
            }
            if let Some(pipe) = stderr_pipe.as_mut() {
                let _ = pipe.read_to_string(&mut stderr).await;
            }
            let status = child.wait().await;
            (stdout, stderr, status)
        };

        match tokio::time::timeout(SHELL_TIMEOUT, run).await {
            Ok((stdout, stderr, Ok(status))) => ExecResult {
                stdout,
                stderr,
                return_code: status.code().unwrap_or(1),
            },
            Ok((stdout, stderr, Err(e))) => {
                let mut stderr = stderr;
                if !stderr.is_empty() {
                    stderr.push('\n');
                }
                stderr.push_str(&e.to_string());
                ExecResult {
                    stdout,
                    stderr,
                    return_code: 1,
                }
            }
            Err(_) => {
                let _ = child.start_kill();
                ExecResult::timed_out(String::new(), String::new())
            }
        }
    }
}

#[cfg(unix)]
fn build_shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn build_shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

/// Extracts the opaque code argument from the text following `tools run`.
///
/// Accepts a triple-quoted block (`"""…"""` or `'''…'''`, inner contents
/// verbatim) or a single- or double-quoted string (inner contents). Anything
/// else is a [`crate::error::AepError::BadRunSyntax`]-shaped failure,
/// reported as the message string rather than the error type itself since
/// this is a runtime-phase fault folded into an [`ExecResult`].
fn extract_code_argument(rest: &str) -> Result<String, String> {
    let trimmed = rest.trim();
    for triple in ["\"\"\"", "'''"] {
        if let Some(inner) = trimmed.strip_prefix(triple) {
            if let Some(code) = inner.strip_suffix(triple) {
                return Ok(code.to_string());
            }
        }
    }
    for quote in ['"', '\''] {
        if trimmed.len() >= 2 && trimmed.starts_with(quote) && trimmed.ends_with(quote) {
            return Ok(trimmed[1..trimmed.len() - 1].to_string());
        }
    }
    Err(format!("malformed `tools run` syntax: {trimmed}"))
}

/// Best-effort docstring extraction from a tool module's top comment block,
/// used by `tools info` when no `.md` sidecar exists. Supports Python
/// triple-quoted module docstrings; any other leading comment style is
/// returned as-is up to the first blank line.
fn find_module_docstring(config: &ConfigStore, name: &str) -> Option<String> {
    let dir = config.kind_dir(Kind::Tool);
    let entries = std::fs::read_dir(&dir).ok()?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.file_stem().and_then(|s| s.to_str()) != Some(name) {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) == Some("md") {
            continue;
        }
        let contents = std::fs::read_to_string(&path).ok()?;
        return Some(extract_leading_docstring(&contents));
    }
    None
}

fn extract_leading_docstring(contents: &str) -> String {
    let trimmed = contents.trim_start();
    for triple in ["\"\"\"", "'''"] {
        if let Some(rest) = trimmed.strip_prefix(triple) {
            if let Some(end) = rest.find(triple) {
                return rest[..end].trim().to_string();
            }
        }
    }
    let mut lines = Vec::new();
    for line in trimmed.lines() {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if let Some(comment) = line.strip_prefix('#') {
            lines.push(comment.trim().to_string());
        } else {
            break;
        }
    }
    if lines.is_empty() {
        "(no documentation available)".to_string()
    } else {
        lines.join("\n")
    }
}
