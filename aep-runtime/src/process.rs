//! Shared subprocess plumbing for the default collaborators: spawn, capture
//! stdout/stderr, enforce a deadline, and escalate to `SIGKILL` after a
//! grace period when a child outlives it.
//!
//! Grounded on the CLI adapters' own `process.rs` modules — stdout/stderr
//! drained concurrently via a `JoinSet`, `SIGTERM` then `SIGKILL` on
//! timeout (`graceful_shutdown`) — trimmed to the two shapes the
//! collaborators need: a fire-and-collect run the installer always awaits
//! fully, and a deadline-aware run the interpreter uses that folds a
//! timeout into an [`ExecResult`] instead of an error.

use crate::error::{RuntimeError, RuntimeResult};
use aep_core::model::ExecResult;
use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::timeout;

/// Time to wait for a graceful `SIGTERM` exit before sending `SIGKILL`.
const GRACE_PERIOD: Duration = Duration::from_secs(5);
/// Bounded channel capacity for the stdout/stderr drain tasks.
const CHANNEL_CAPACITY: usize = 256;

fn build_command<I, S>(program: &Path, args: I, cwd: &Path, env: &[(&str, &OsStr)]) -> Command
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    for (key, value) in env {
        cmd.env(key, value);
    }
    cmd
}

/// Runs `program` to completion with no deadline, for provisioning steps
/// (`uv venv`, `uv pip install`) that the installer always awaits fully.
/// Returns captured stdout/stderr and the exit code.
pub async fn run_to_completion<I, S>(
    program: &Path,
    args: I,
    cwd: &Path,
) -> RuntimeResult<(String, String, i32)>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let program_name = program.display().to_string();
    let output = build_command(program, args, cwd, &[])
        .output()
        .await
        .map_err(|e| RuntimeError::SpawnFailed {
            program: program_name,
            stage: "spawn".to_string(),
            source: e,
        })?;
    Ok((
        String::from_utf8_lossy(&output.stdout).into_owned(),
        String::from_utf8_lossy(&output.stderr).into_owned(),
        output.status.code().unwrap_or(-1),
    ))
}

/// Runs `program` under `cwd` with an environment overlay and a deadline,
/// folding both a non-zero exit and a timeout into an [`ExecResult`] rather
/// than an error — matching the [`aep_core::collab::CodeInterpreter`]
/// contract that only transport/spawn failures are `Err`.
pub async fn run_with_deadline<I, S>(
    program: &Path,
    args: I,
    cwd: &Path,
    env: &[(&str, &OsStr)],
    deadline: Duration,
) -> RuntimeResult<ExecResult>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let program_name = program.display().to_string();
    let mut child = build_command(program, args, cwd, env)
        .spawn()
        .map_err(|e| RuntimeError::SpawnFailed {
            program: program_name.clone(),
            stage: "spawn".to_string(),
            source: e,
        })?;

    let stdout = child.stdout.take().ok_or_else(|| RuntimeError::SpawnFailed {
        program: program_name.clone(),
        stage: "stdout pipe".to_string(),
        source: std::io::Error::other("child.stdout.take() returned None"),
    })?;
    let stderr = child.stderr.take().ok_or_else(|| RuntimeError::SpawnFailed {
        program: program_name.clone(),
        stage: "stderr pipe".to_string(),
        source: std::io::Error::other("child.stderr.take() returned None"),
    })?;

    let (stdout_tx, mut stdout_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);
    let (stderr_tx, mut stderr_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);

    let mut tasks = JoinSet::new();
    tasks.spawn(drain_lines(stdout, stdout_tx));
    tasks.spawn(drain_lines(stderr, stderr_tx));

    let execution = collect(&mut child, &mut stdout_rx, &mut stderr_rx, &mut tasks);

    match timeout(deadline, execution).await {
        Ok(result) => result,
        Err(_elapsed) => {
            let partial_stdout = drain_remaining(&mut stdout_rx);
            let partial_stderr = drain_remaining(&mut stderr_rx);
            graceful_shutdown(&mut child).await;
            tasks.abort_all();
            Ok(ExecResult::timed_out(partial_stdout, partial_stderr))
        }
    }
}

async fn collect(
    child: &mut Child,
    stdout_rx: &mut mpsc::Receiver<String>,
    stderr_rx: &mut mpsc::Receiver<String>,
    tasks: &mut JoinSet<RuntimeResult<()>>,
) -> RuntimeResult<ExecResult> {
    let mut stdout_lines = Vec::new();
    let mut stderr_lines = Vec::new();
    let mut stdout_done = false;
    let mut stderr_done = false;
    while !stdout_done || !stderr_done {
        tokio::select! {
            line = stdout_rx.recv(), if !stdout_done => {
                match line {
                    Some(line) => stdout_lines.push(line),
                    None => stdout_done = true,
                }
            }
            line = stderr_rx.recv(), if !stderr_done => {
                match line {
                    Some(line) => stderr_lines.push(line),
                    None => stderr_done = true,
                }
            }
        }
    }

    let status = child.wait().await.map_err(|e| RuntimeError::SpawnFailed {
        program: "<child>".to_string(),
        stage: "wait".to_string(),
        source: e,
    })?;

    while let Some(result) = tasks.join_next().await {
        result??;
    }

    Ok(ExecResult {
        stdout: stdout_lines.join("\n"),
        stderr: stderr_lines.join("\n"),
        return_code: status.code().unwrap_or(-1),
    })
}

fn drain_remaining(rx: &mut mpsc::Receiver<String>) -> String {
    let mut lines = Vec::new();
    while let Ok(line) = rx.try_recv() {
        lines.push(line);
    }
    lines.join("\n")
}

async fn drain_lines(
    pipe: impl tokio::io::AsyncRead + Unpin,
    tx: mpsc::Sender<String>,
) -> RuntimeResult<()> {
    let mut reader = BufReader::new(pipe).lines();
    while let Some(line) = reader.next_line().await.map_err(|e| RuntimeError::SpawnFailed {
        program: "<pipe>".to_string(),
        stage: "read".to_string(),
        source: e,
    })? {
        if tx.send(line).await.is_err() {
            break;
        }
    }
    Ok(())
}

/// Sends `SIGTERM`, waits up to [`GRACE_PERIOD`], then force-kills with
/// `SIGKILL`. On Windows there is no graceful signal for console processes,
/// so this terminates immediately.
#[cfg(unix)]
async fn graceful_shutdown(child: &mut Child) {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    if let Some(pid) = child.id() {
        let _ = signal::kill(Pid::from_raw(pid.cast_signed()), Signal::SIGTERM);
        if timeout(GRACE_PERIOD, child.wait()).await.is_ok() {
            return;
        }
    }
    let _ = child.kill().await;
    let _ = child.wait().await;
}

#[cfg(windows)]
async fn graceful_shutdown(child: &mut Child) {
    let _ = child.kill().await;
    let _ = child.wait().await;
}
