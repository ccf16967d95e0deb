//! Container engine and devcontainer CLI invocations.
//!
//! Containers are not owned by canopy: they are labeled with their host
//! workspace folder by the devcontainer CLI and queried back through the
//! engine's `ps` filter. Lookups are best effort and degrade to empty
//! results; state-changing calls report success booleans for batch callers
//! to aggregate.

use std::path::Path;
use std::process::Child;

use canopy_exec::{run_capture, run_interactive, spawn_piped, tool_available};

use crate::error::DevcontainerResult;

/// The label the devcontainer CLI stamps on every container it creates.
const WORKSPACE_LABEL: &str = "devcontainer.local_folder";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Runtime {
    Docker,
    Podman,
}

impl Runtime {
    pub fn command(&self) -> &'static str {
        match self {
            Runtime::Docker => "docker",
            Runtime::Podman => "podman",
        }
    }
}

/// Detect the available container engine, docker preferred.
pub fn detect_runtime() -> Option<Runtime> {
    if tool_available("docker") {
        Some(Runtime::Docker)
    } else if tool_available("podman") {
        Some(Runtime::Podman)
    } else {
        None
    }
}

/// One container as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    pub name: String,
    /// Host workspace folder from the devcontainer label.
    pub folder: String,
    pub state: String,
}

impl ContainerInfo {
    pub fn is_running(&self) -> bool {
        self.state == "running"
    }

    /// Running, but the labeled workspace folder is gone from disk.
    pub fn is_orphan(&self) -> bool {
        self.is_running() && !Path::new(&self.folder).exists()
    }
}

/// Container name convention: `<project>[-<worktree>]`, lowercased.
pub fn container_name(project_path: &Path, worktree_name: Option<&str>) -> String {
    let project = project_path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match worktree_name {
        Some(wt) => format!("{project}-{wt}"),
        None => project,
    }
}

/// All devcontainer-labeled containers, running or stopped. Empty on any
/// engine failure.
pub fn list_all_containers(rt: Runtime) -> Vec<ContainerInfo> {
    let format = format!("{{{{.Names}}}}\t{{{{.Label \"{WORKSPACE_LABEL}\"}}}}\t{{{{.State}}}}");
    let filter = format!("label={WORKSPACE_LABEL}");
    let out = match run_capture(
        rt.command(),
        &["ps", "-a", "--filter", &filter, "--format", &format],
        None,
    ) {
        Ok(out) if out.success() => out,
        _ => return Vec::new(),
    };

    out.stdout
        .lines()
        .filter_map(|line| {
            let mut parts = line.split('\t');
            Some(ContainerInfo {
                name: parts.next()?.to_string(),
                folder: parts.next()?.to_string(),
                state: parts.next()?.to_string(),
            })
        })
        .collect()
}

/// The container labeled with exactly this workspace folder, if any.
pub fn container_for_workspace(rt: Runtime, workspace: &Path) -> Option<String> {
    let filter = format!("label={WORKSPACE_LABEL}={}", workspace.display());
    let out = run_capture(
        rt.command(),
        &["ps", "-a", "--filter", &filter, "--format", "{{.Names}}"],
        None,
    )
    .ok()?;
    if !out.success() {
        return None;
    }
    out.stdout.lines().next().map(str::to_string)
}

/// Containers belonging to a project: labeled folder equals the git root,
/// or sits directly inside `<project>-worktrees/`. Anything else is only
/// visible in global views.
pub fn containers_for_project(rt: Runtime, git_root: &Path) -> Vec<ContainerInfo> {
    let project_name = git_root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let worktrees_dir = format!("{project_name}-worktrees");

    list_all_containers(rt)
        .into_iter()
        .filter(|c| {
            let folder = Path::new(&c.folder);
            folder == git_root
                || folder
                    .parent()
                    .and_then(|p| p.file_name())
                    .map(|n| n.to_string_lossy() == worktrees_dir)
                    .unwrap_or(false)
        })
        .collect()
}

/// Stop a container by name. Returns whether the engine accepted it.
pub fn stop_container(rt: Runtime, name: &str) -> bool {
    run_capture(rt.command(), &["stop", name], None)
        .map(|out| out.success())
        .unwrap_or(false)
}

/// Remove a (stopped) container by name.
pub fn remove_container(rt: Runtime, name: &str) -> bool {
    run_capture(rt.command(), &["rm", name], None)
        .map(|out| out.success())
        .unwrap_or(false)
}

/// Probe whether the workspace's container answers an exec.
pub fn is_container_running(workspace: &Path) -> bool {
    let ws = workspace.to_string_lossy();
    run_capture(
        "devcontainer",
        &["exec", "--workspace-folder", ws.as_ref(), "true"],
        Some(workspace),
    )
    .map(|out| out.success())
    .unwrap_or(false)
}

/// The histfile is bind-mounted as a file; if it does not exist before the
/// engine resolves the mount, a directory gets created in its place.
pub fn touch_histfile(workspace: &Path) -> std::io::Result<()> {
    let devcontainer = workspace.join(".devcontainer");
    std::fs::create_dir_all(&devcontainer)?;
    let histfile = devcontainer.join(".histfile");
    if !histfile.exists() {
        std::fs::write(&histfile, b"")?;
    }
    Ok(())
}

fn up_args(workspace: &Path, remove_existing: bool) -> Vec<String> {
    let mut args = vec![
        "up".to_string(),
        "--workspace-folder".to_string(),
        workspace.to_string_lossy().into_owned(),
    ];
    if remove_existing {
        args.push("--remove-existing-container".to_string());
    }
    args
}

/// Run `devcontainer up` with inherited stdio. Returns whether it succeeded.
pub fn up(workspace: &Path, remove_existing: bool) -> DevcontainerResult<bool> {
    touch_histfile(workspace)?;
    let args = up_args(workspace, remove_existing);
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let code = run_interactive("devcontainer", &args, Some(workspace))?;
    Ok(code == 0)
}

/// Launch `devcontainer up` detached with piped streams, for the parallel
/// spawn batch.
pub fn spawn_up(workspace: &Path, remove_existing: bool) -> DevcontainerResult<Child> {
    let args = up_args(workspace, remove_existing);
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    Ok(spawn_piped("devcontainer", &args, Some(workspace))?)
}

fn exec_sh(workspace: &Path, shell_cmd: &str) -> DevcontainerResult<i32> {
    let ws = workspace.to_string_lossy();
    Ok(run_interactive(
        "devcontainer",
        &["exec", "--workspace-folder", ws.as_ref(), "sh", "-c", shell_cmd],
        Some(workspace),
    )?)
}

/// Exec a command directly in the container, no tmux.
pub fn exec_command(workspace: &Path, command: &str) -> DevcontainerResult<i32> {
    exec_sh(workspace, command)
}

/// Attach to the persistent `dev` tmux session inside the container,
/// creating it when absent. The attach-or-create pair is what lets repeated
/// invocations resume the same terminal state.
pub fn exec_tmux(workspace: &Path) -> DevcontainerResult<i32> {
    exec_sh(workspace, "tmux attach-session -t dev || tmux new-session -s dev")
}

/// Start an agent with a prompt in a detached `dev` session inside the
/// container.
pub fn exec_agent_prompt(
    workspace: &Path,
    agent_command: &str,
    prompt: &str,
) -> DevcontainerResult<i32> {
    let cmd = format!(
        "tmux new-session -d -s dev {agent_command} {}",
        shlex::try_quote(prompt)?
    );
    exec_sh(workspace, &cmd)
}

/// The shell line a host tmux window runs to drop an agent into a spawned
/// workspace's container.
pub fn agent_exec_line(
    workspace: &Path,
    agent_command: &str,
    prompt: &str,
) -> DevcontainerResult<String> {
    let ws = workspace.to_string_lossy();
    let inner = format!("{agent_command} {}", shlex::try_quote(prompt)?);
    Ok(shlex::try_join([
        "devcontainer",
        "exec",
        "--workspace-folder",
        ws.as_ref(),
        "sh",
        "-c",
        &inner,
    ])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn container_names_are_lowercased() {
        assert_eq!(container_name(Path::new("/dev/MyApp"), None), "myapp");
        assert_eq!(
            container_name(Path::new("/dev/myapp"), Some("bold-fox")),
            "myapp-bold-fox"
        );
    }

    #[test]
    fn orphan_requires_running_state_and_missing_folder() {
        let gone = ContainerInfo {
            name: "x".into(),
            folder: "/no/such/dir".into(),
            state: "running".into(),
        };
        assert!(gone.is_orphan());

        let stopped = ContainerInfo { state: "exited".into(), ..gone.clone() };
        assert!(!stopped.is_orphan());

        let alive = ContainerInfo {
            folder: std::env::temp_dir().to_string_lossy().into_owned(),
            ..gone
        };
        assert!(!alive.is_orphan());
    }

    #[test]
    fn histfile_is_created_as_regular_file() {
        let dir = tempfile::tempdir().unwrap();
        touch_histfile(dir.path()).unwrap();
        let histfile = dir.path().join(".devcontainer/.histfile");
        assert!(histfile.is_file());

        // Re-touching keeps content intact.
        std::fs::write(&histfile, "history").unwrap();
        touch_histfile(dir.path()).unwrap();
        assert_eq!(std::fs::read_to_string(&histfile).unwrap(), "history");
    }

    #[test]
    fn agent_exec_line_quotes_the_prompt() {
        let line = agent_exec_line(
            &PathBuf::from("/w/proj"),
            "claude --dangerously-skip-permissions",
            "fix the bug",
        )
        .unwrap();
        assert_eq!(
            line,
            r#"devcontainer exec --workspace-folder /w/proj sh -c "claude --dangerously-skip-permissions \"fix the bug\"""#
        );
    }

    #[test]
    fn agent_exec_line_passes_plain_words_through() {
        let line = agent_exec_line(&PathBuf::from("/w/proj"), "codex", "hello").unwrap();
        assert_eq!(
            line,
            r#"devcontainer exec --workspace-folder /w/proj sh -c "codex hello""#
        );
    }

    #[test]
    fn agent_exec_line_rejects_nul_in_prompt() {
        let err = agent_exec_line(&PathBuf::from("/w/proj"), "codex", "a\0b").unwrap_err();
        assert!(matches!(err, crate::DevcontainerError::Quote(_)));
    }
}
