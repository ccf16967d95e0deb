//! External process invocation primitives for canopy.
//!
//! Every call into git, docker/podman, the devcontainer CLI, tmux, or a
//! picker tool goes through this crate, so the invocation mechanics stay in
//! one place and the business logic above can be exercised against captured
//! outputs. A non-zero exit status is data (`Output::code`), not an error;
//! `ExecError` covers only failures to launch the process or decode its
//! streams.

use std::io::Write;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("non-UTF-8 output from {0}")]
    Utf8(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ExecResult<T> = Result<T, ExecError>;

/// Captured result of an external command.
#[derive(Debug, Clone)]
pub struct Output {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl Output {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

fn command(program: &str, args: &[&str], cwd: Option<&Path>) -> Command {
    tracing::debug!(cmd = %format!("{} {}", program, args.join(" ")), "exec");
    let mut cmd = Command::new(program);
    cmd.args(args);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    cmd
}

fn spawn_err(program: &str) -> impl FnOnce(std::io::Error) -> ExecError + '_ {
    move |source| ExecError::Spawn {
        program: program.to_string(),
        source,
    }
}

fn decode(program: &str, bytes: Vec<u8>) -> ExecResult<String> {
    String::from_utf8(bytes).map_err(|_| ExecError::Utf8(program.to_string()))
}

/// Run a command, capturing both streams. Stdin is closed.
pub fn run_capture(program: &str, args: &[&str], cwd: Option<&Path>) -> ExecResult<Output> {
    let out = command(program, args, cwd)
        .stdin(Stdio::null())
        .output()
        .map_err(spawn_err(program))?;

    Ok(Output {
        code: out.status.code().unwrap_or(-1),
        stdout: decode(program, out.stdout)?,
        stderr: decode(program, out.stderr)?,
    })
}

/// Run a command with inherited stdio, returning its exit code.
///
/// Used for interactive paths (`devcontainer up`, tmux attach) where the
/// child owns the terminal.
pub fn run_interactive(program: &str, args: &[&str], cwd: Option<&Path>) -> ExecResult<i32> {
    let status = command(program, args, cwd)
        .status()
        .map_err(spawn_err(program))?;
    Ok(status.code().unwrap_or(-1))
}

/// Run a command feeding `input` to its stdin and capturing its streams.
///
/// Stderr is inherited so TUI tools (fzf) can draw on the terminal while
/// their selection is read back from stdout.
pub fn run_capture_with_input(
    program: &str,
    args: &[&str],
    input: &str,
) -> ExecResult<Output> {
    let mut child = command(program, args, None)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(spawn_err(program))?;

    if let Some(mut stdin) = child.stdin.take() {
        // The child may exit without draining stdin; a broken pipe is fine.
        let _ = stdin.write_all(input.as_bytes());
    }

    let out = child.wait_with_output().map_err(spawn_err(program))?;
    Ok(Output {
        code: out.status.code().unwrap_or(-1),
        stdout: decode(program, out.stdout)?,
        stderr: decode(program, out.stderr)?,
    })
}

/// Run a command with a deadline. Returns `None` if the deadline expires,
/// in which case the child is killed.
pub fn run_capture_timeout(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> ExecResult<Option<Output>> {
    let mut child = command(program, args, None)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(spawn_err(program))?;

    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait()? {
            Some(_) => break,
            None if Instant::now() >= deadline => {
                tracing::debug!(program, "timed out, killing");
                let _ = child.kill();
                let _ = child.wait();
                return Ok(None);
            }
            None => std::thread::sleep(Duration::from_millis(20)),
        }
    }

    let out = child.wait_with_output().map_err(spawn_err(program))?;
    Ok(Some(Output {
        code: out.status.code().unwrap_or(-1),
        stdout: decode(program, out.stdout)?,
        stderr: decode(program, out.stderr)?,
    }))
}

/// Launch a command detached with piped streams, for wait-for-all batches.
pub fn spawn_piped(program: &str, args: &[&str], cwd: Option<&Path>) -> ExecResult<Child> {
    command(program, args, cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(spawn_err(program))
}

/// Whether an external tool is on PATH.
pub fn tool_available(name: &str) -> bool {
    which::which(name).is_ok()
}
