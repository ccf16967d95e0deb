//! Spawn: N worktrees, N containers, N agents.
//!
//! Worktree creation is sequential because git does not tolerate concurrent
//! `worktree add` against one repository; the expensive part, `devcontainer
//! up`, runs as a batch of piped children joined in launch order. A partial
//! batch is a warning, not a failure: agents are only dispatched into the
//! workspaces whose container came up.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use canopy_devcontainer::{descriptor, isolate, runtime, CopySpec, MountSpec};
use canopy_mux::tmux;

use crate::config::Config;
use crate::lifecycle::{ensure_worktree, StartOpts};
use crate::names::spawn_names;
use crate::secrets::{export_secrets, resolve_secrets};

const SPAWN_SESSION: &str = "spawn";

pub struct SpawnArgs {
    pub count: usize,
    pub prefix: Option<String>,
    pub from_branch: Option<String>,
}

pub fn run_spawn(config: &Config, args: &SpawnArgs, opts: &StartOpts) -> Result<()> {
    if args.count < 1 {
        bail!("spawn requires a positive number of workspaces");
    }

    let ws = canopy_workspace::GitWorkspace::discover().context("not in a git repository")?;

    if let Some(from) = &args.from_branch {
        if !ws.branch_exists(from) {
            bail!("branch does not exist: {from}");
        }
    }

    let names = spawn_names(args.count, args.prefix.as_deref());
    println!("Spawning {} worktrees: {}", args.count, names.join(", "));

    let home = dirs::home_dir().context("cannot determine home directory")?;
    let mut paths: Vec<PathBuf> = Vec::with_capacity(names.len());

    for (i, name) in names.iter().enumerate() {
        let path = ensure_worktree(&ws, name, args.from_branch.as_deref(), config)?;
        let descriptor_path = path.join(".devcontainer").join("devcontainer.json");

        // Each instance gets its own port so in-container services do not
        // collide on the host.
        if descriptor_path.exists() {
            descriptor::set_container_port(&descriptor_path, config.base_port + i as u16)?;
        }

        if !opts.mounts.is_empty() {
            let mounts = opts
                .mounts
                .iter()
                .map(|m| MountSpec::parse(m, name))
                .collect::<Result<Vec<_>, _>>()?;
            descriptor::append_mounts(&descriptor_path, &mounts)?;
        }
        if !opts.copies.is_empty() {
            let copies: Vec<CopySpec> =
                opts.copies.iter().map(|c| CopySpec::parse(c, name)).collect();
            isolate::copy_user_files(&copies, &path)?;
        }

        isolate::refresh_credential_cache(&home, &path)?;
        isolate::refresh_editor_config(&home, &path)?;
        runtime::touch_histfile(&path)?;

        paths.push(path);
    }

    export_secrets(&resolve_secrets(config));

    println!("Starting {} containers...", args.count);
    let mut children = Vec::with_capacity(paths.len());
    for (i, path) in paths.iter().enumerate() {
        let child = runtime::spawn_up(path, opts.new)?;
        println!("  [{}/{}] Launched: {}", i + 1, args.count, workspace_name(path));
        children.push(child);
    }

    println!("Waiting for {} containers to be ready...", args.count);
    let mut failed: Vec<String> = Vec::new();
    for (path, child) in paths.iter().zip(children) {
        let name = workspace_name(path);
        let output = child.wait_with_output()?;
        if output.status.success() {
            println!("  Ready: {name}");
        } else {
            eprintln!("  Failed: {name}");
            let stderr = String::from_utf8_lossy(&output.stderr);
            let lines: Vec<&str> = stderr.trim().lines().collect();
            for line in lines.iter().rev().take(5).rev() {
                eprintln!("    {line}");
            }
            failed.push(name);
        }
    }

    if !failed.is_empty() {
        println!(
            "Warning: {} container(s) failed to start: {}",
            failed.len(),
            failed.join(", ")
        );
    }

    let Some(prompt) = &opts.prompt else {
        println!();
        println!("{} containers running.", paths.len() - failed.len());
        println!("Use --prompt to start agents, or attach manually.");
        return Ok(());
    };

    let survivors: Vec<(PathBuf, String)> = paths
        .into_iter()
        .zip(names)
        .filter(|(_, name)| !failed.contains(name))
        .collect();

    dispatch_agents(config, &survivors, prompt, opts.agent.as_deref())
}

fn workspace_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// One tmux window per surviving workspace, each typing its agent exec line
/// into a fresh shell, then attach.
fn dispatch_agents(
    config: &Config,
    workspaces: &[(PathBuf, String)],
    prompt: &str,
    agent_override: Option<&str>,
) -> Result<()> {
    if workspaces.is_empty() {
        println!("No containers to attach to.");
        return Ok(());
    }

    if tmux::session_exists(SPAWN_SESSION) {
        tmux::kill_session(SPAWN_SESSION);
    }

    for (i, (path, name)) in workspaces.iter().enumerate() {
        let command = config.agent_command(agent_override, i);
        let line = runtime::agent_exec_line(path, &command, prompt)?;
        if i == 0 {
            tmux::new_session(SPAWN_SESSION, name, None)?;
        } else {
            tmux::new_window(SPAWN_SESSION, name, None)?;
        }
        tmux::send_line(SPAWN_SESSION, name, &line)?;
    }

    let roster: Vec<String> = (0..workspaces.len())
        .map(|i| config.agent_name(agent_override, i))
        .collect();
    println!();
    println!(
        "Started {} agents in tmux session '{SPAWN_SESSION}'",
        workspaces.len()
    );
    println!("Agents: {}", roster.join(", "));
    println!("Attaching to tmux session...");

    tmux::attach(SPAWN_SESSION)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_rejects_zero_count() {
        let args = SpawnArgs {
            count: 0,
            prefix: None,
            from_branch: None,
        };
        let err = run_spawn(&Config::default(), &args, &StartOpts::default()).unwrap_err();
        assert!(err.to_string().contains("positive number"));
    }
}
