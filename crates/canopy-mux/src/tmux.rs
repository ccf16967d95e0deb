//! Host-side tmux session control.
//!
//! These drive the tmux server on the host, not the one inside a container.
//! Window commands are shell lines interpreted by tmux's default shell.

use std::path::Path;

use canopy_exec::{run_capture, run_interactive, tool_available};

use crate::error::{MuxError, MuxResult};

/// Whether this process already runs inside a tmux client.
///
/// Nesting attach inside an existing session wedges the terminal, so
/// interactive flows bail out early when this is set.
pub fn in_tmux() -> bool {
    std::env::var("TMUX").map(|v| !v.is_empty()).unwrap_or(false)
}

pub fn tmux_available() -> bool {
    tool_available("tmux")
}

fn run_tmux(args: &[&str]) -> MuxResult<()> {
    let out = run_capture("tmux", args, None)?;
    if out.success() {
        Ok(())
    } else {
        Err(MuxError::CommandFailed {
            command: format!("tmux {}", args.join(" ")),
            exit_code: out.code,
            stderr: out.stderr.trim().to_string(),
        })
    }
}

pub fn session_exists(name: &str) -> bool {
    run_capture("tmux", &["has-session", "-t", name], None)
        .map(|out| out.success())
        .unwrap_or(false)
}

/// Best effort: an absent session is not an error.
pub fn kill_session(name: &str) {
    let _ = run_capture("tmux", &["kill-session", "-t", name], None);
}

/// Create a detached session with a named first window running a shell.
pub fn new_session(session: &str, window: &str, cwd: Option<&Path>) -> MuxResult<()> {
    if !tmux_available() {
        return Err(MuxError::ToolNotAvailable("tmux"));
    }
    let mut args = vec!["new-session", "-d", "-s", session, "-n", window];
    let cwd_str;
    if let Some(dir) = cwd {
        cwd_str = dir.to_string_lossy().into_owned();
        args.push("-c");
        args.push(&cwd_str);
    }
    tracing::debug!(session, window, "creating tmux session");
    run_tmux(&args)
}

/// Add a named shell window to an existing session.
pub fn new_window(session: &str, window: &str, cwd: Option<&Path>) -> MuxResult<()> {
    let mut args = vec!["new-window", "-t", session, "-n", window];
    let cwd_str;
    if let Some(dir) = cwd {
        cwd_str = dir.to_string_lossy().into_owned();
        args.push("-c");
        args.push(&cwd_str);
    }
    tracing::debug!(session, window, "adding tmux window");
    run_tmux(&args)
}

/// Type a command line into a window's shell and run it. The shell survives
/// the command, so the window stays inspectable after it exits.
pub fn send_line(session: &str, window: &str, line: &str) -> MuxResult<()> {
    let target = format!("{session}:{window}");
    run_tmux(&["send-keys", "-t", &target, line, "Enter"])
}

/// Attach the current terminal to a session. Returns tmux's exit code.
pub fn attach(session: &str) -> MuxResult<i32> {
    Ok(run_interactive("tmux", &["attach-session", "-t", session], None)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonexistent_session_reported_absent() {
        if !tmux_available() {
            eprintln!("tmux not available, skipping");
            return;
        }
        assert!(!session_exists("canopy-test-no-such-session"));
    }

    #[test]
    fn kill_missing_session_is_silent() {
        if !tmux_available() {
            eprintln!("tmux not available, skipping");
            return;
        }
        kill_session("canopy-test-no-such-session");
    }
}
