//! Default [`CodeInterpreter`] collaborator: shells out to the venv's own
//! `python`, running a small embedded wrapper script that builds the
//! `tools.<name>` namespace and implements the REPL-style last-expression
//! echo (§4.7).
//!
//! The wrapper is generated source, not a vendored asset, for the same
//! reason `aep_mcp::stub` embeds its runtime prelude as a string literal
//! rather than a file: a single source of truth that ships inside the
//! binary, with no separate file to go stale relative to the crate version
//! that emitted it.

use crate::process;
use aep_core::collab::CodeInterpreter;
use aep_core::error::{AepError, AepResult};
use aep_core::model::ExecResult;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Wrapper script run for every `tools run` snippet. Takes four positional
/// arguments: `tools_dir`, `cwd`, `workspace`, `snippet_path`.
///
/// Implements:
/// - loading every `*.py` module directly under `tools_dir` (skipping
///   `index.md`'s sibling files and anything prefixed `_`) into a
///   `SimpleNamespace` bound to the global `tools`, per-module load
///   failures reported on stderr without aborting the run;
/// - the REPL echo law: if the snippet's last top-level statement is a bare
///   expression, the prior statements run as a block and the final
///   expression's value is printed only when it is not `None`;
/// - the `<ErrorKind>: <message>` stderr convention on any uncaught
///   exception, carried over from the original implementation's executor.
const WRAPPER_SOURCE: &str = r#"
import ast
import importlib.util
import sys
import types
from pathlib import Path


def _load_tools(tools_dir):
    namespace = types.SimpleNamespace()
    if not tools_dir.is_dir():
        return namespace
    for path in sorted(tools_dir.iterdir()):
        if path.suffix != ".py" or path.stem.startswith("_"):
            continue
        name = path.stem
        try:
            spec = importlib.util.spec_from_file_location(name, path)
            module = importlib.util.module_from_spec(spec)
            spec.loader.exec_module(module)
            setattr(namespace, name, module)
        except Exception as exc:  # reported, not re-raised: one bad tool must not block the rest
            print(f"{type(exc).__name__}: failed to load tool '{name}': {exc}", file=sys.stderr)
    return namespace


def main():
    tools_dir = Path(sys.argv[1])
    cwd = Path(sys.argv[2])
    workspace = Path(sys.argv[3])
    snippet_path = Path(sys.argv[4])
    source = snippet_path.read_text()

    global_ns = {
        "__name__": "__aep_tools_run__",
        "cwd": cwd,
        "workspace": workspace,
        "tools_dir": tools_dir,
        "tools": _load_tools(tools_dir),
    }

    try:
        tree = ast.parse(source, filename=str(snippet_path))
    except SyntaxError as exc:
        print(f"SyntaxError: {exc}", file=sys.stderr)
        sys.exit(1)

    try:
        if tree.body and isinstance(tree.body[-1], ast.Expr):
            *body, last = tree.body
            if body:
                exec(compile(ast.Module(body=body, type_ignores=[]), str(snippet_path), "exec"), global_ns)
            value = eval(compile(ast.Expression(body=last.value), str(snippet_path), "eval"), global_ns)
            if value is not None:
                print(value)
        else:
            exec(compile(tree, str(snippet_path), "exec"), global_ns)
    except Exception as exc:
        print(f"{type(exc).__name__}: {exc}", file=sys.stderr)
        sys.exit(1)


if __name__ == "__main__":
    main()
"#;

/// Python-backed code interpreter. Shells out to the `python` executable
/// inside whichever environment directory the caller resolves (shared
/// `tools/.env` or a per-skill `.env`).
#[derive(Debug, Clone, Default)]
pub struct PythonInterpreter;

impl PythonInterpreter {
    /// Builds an interpreter. Stateless: the venv's own `python` binary is
    /// resolved fresh from `env_dir` on every call, so there is nothing to
    /// discover up front.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn python_exe(env_dir: &Path) -> PathBuf {
        #[cfg(windows)]
        {
            env_dir.join("Scripts").join("python.exe")
        }
        #[cfg(not(windows))]
        {
            env_dir.join("bin").join("python")
        }
    }
}

#[async_trait]
impl CodeInterpreter for PythonInterpreter {
    async fn run_snippet(
        &self,
        env_dir: &Path,
        cwd: &Path,
        source: &str,
        globals: &[(&str, &Path)],
        timeout: Duration,
    ) -> AepResult<ExecResult> {
        let python = Self::python_exe(env_dir);
        if !python.is_file() {
            return Err(AepError::EnvMissing {
                kind: aep_core::error::CapabilityKind::Tool,
                path: env_dir.to_path_buf(),
            });
        }

        let tools_dir = globals
            .iter()
            .find(|(name, _)| *name == "tools_dir")
            .map(|(_, path)| *path)
            .unwrap_or(env_dir);
        let workspace = globals
            .iter()
            .find(|(name, _)| *name == "workspace")
            .map(|(_, path)| *path)
            .unwrap_or(cwd);

        let wrapper_dir = tempfile::tempdir().map_err(|e| AepError::io(cwd, e))?;
        let wrapper_path = wrapper_dir.path().join("_aep_wrapper.py");
        std::fs::write(&wrapper_path, WRAPPER_SOURCE).map_err(|e| AepError::io(&wrapper_path, e))?;
        let snippet_path = wrapper_dir.path().join("_aep_snippet.py");
        std::fs::write(&snippet_path, source).map_err(|e| AepError::io(&snippet_path, e))?;

        let args = [
            wrapper_path.as_os_str(),
            tools_dir.as_os_str(),
            cwd.as_os_str(),
            workspace.as_os_str(),
            snippet_path.as_os_str(),
        ];

        process::run_with_deadline(&python, args, cwd, &[], timeout)
            .await
            .map_err(|e| AepError::Io { path: python, source: std::io::Error::other(e.to_string()) })
    }

    async fn run_file(
        &self,
        env_dir: &Path,
        cwd: &Path,
        path: &Path,
        args: &[String],
        timeout: Duration,
    ) -> AepResult<ExecResult> {
        let python = Self::python_exe(env_dir);
        if !python.is_file() {
            return Err(AepError::EnvMissing {
                kind: aep_core::error::CapabilityKind::Skill,
                path: env_dir.to_path_buf(),
            });
        }

        let mut run_args: Vec<std::ffi::OsString> = vec![path.as_os_str().to_os_string()];
        run_args.extend(args.iter().map(std::ffi::OsString::from));

        process::run_with_deadline(&python, run_args, cwd, &[], timeout)
            .await
            .map_err(|e| AepError::Io { path: python, source: std::io::Error::other(e.to_string()) })
    }
}
