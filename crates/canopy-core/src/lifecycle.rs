//! Workspace lifecycle orchestration: the `run_*` entry points behind each
//! CLI command.
//!
//! Every workspace moves through three states: unscaffolded, scaffolded but
//! stopped, and running. Start-like commands drive a workspace to running
//! and then enter it; teardown commands walk the other way, always stopping
//! a container before removing it and handling worktrees before the main
//! checkout.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use canopy_devcontainer::{descriptor, isolate, runtime, CopySpec, MountSpec};
use canopy_mux::{default_picker, tmux};
use canopy_workspace::{find_git_root, init_repo, resolve_main_repo, GitWorkspace};

use crate::config::Config;
use crate::names::random_name;
use crate::prompt::confirm;
use crate::scaffold::{self, Language};
use crate::secrets::{export_secrets, resolve_secrets};

/// Start-path modifiers shared by start, tree, create, and init.
#[derive(Debug, Default, Clone)]
pub struct StartOpts {
    pub prompt: Option<String>,
    pub agent: Option<String>,
    pub new: bool,
    pub detach: bool,
    pub shell: bool,
    pub run: Option<String>,
    pub mounts: Vec<String>,
    pub copies: Vec<String>,
}

fn require_repo() -> Result<GitWorkspace> {
    GitWorkspace::discover().context("not in a git repository")
}

fn require_runtime() -> Result<runtime::Runtime> {
    runtime::detect_runtime()
        .context("no container runtime found (docker or podman required)")
}

fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().context("cannot determine home directory")
}

/// Apply `--mount` / `--copy` arguments to a workspace. `name` scopes
/// relative targets to `/workspaces/<name>/`.
fn apply_mounts_and_copies(workspace: &Path, name: &str, opts: &StartOpts) -> Result<()> {
    if !opts.mounts.is_empty() {
        let mounts = opts
            .mounts
            .iter()
            .map(|m| MountSpec::parse(m, name))
            .collect::<Result<Vec<_>, _>>()?;
        let descriptor_path = workspace.join(".devcontainer").join("devcontainer.json");
        descriptor::append_mounts(&descriptor_path, &mounts)?;
    }

    if !opts.copies.is_empty() {
        let copies: Vec<CopySpec> = opts
            .copies
            .iter()
            .map(|c| CopySpec::parse(c, name))
            .collect();
        isolate::copy_user_files(&copies, workspace)?;
    }

    Ok(())
}

/// Secrets into the environment, credential and editor caches refreshed.
fn prepare_workspace(workspace: &Path, config: &Config) -> Result<()> {
    export_secrets(&resolve_secrets(config));
    let home = home_dir()?;
    isolate::refresh_credential_cache(&home, workspace)?;
    isolate::refresh_editor_config(&home, workspace)?;
    Ok(())
}

fn ensure_running(workspace: &Path, force_new: bool) -> Result<()> {
    if force_new || !runtime::is_container_running(workspace) {
        if !runtime::up(workspace, force_new)? {
            bail!("failed to start devcontainer");
        }
    }
    Ok(())
}

/// The common tail of every start-like command: agent prompt, detach,
/// shell, one-shot command, or tmux attach.
fn enter(workspace: &Path, display_name: &str, config: &Config, opts: &StartOpts) -> Result<()> {
    if let Some(prompt) = &opts.prompt {
        let agent = config.agent_name(opts.agent.as_deref(), 0);
        let command = config.agent_command(opts.agent.as_deref(), 0);
        runtime::exec_agent_prompt(workspace, &command, prompt)?;
        println!("Started {agent} in: {display_name}");
        return Ok(());
    }

    if opts.detach {
        println!("Container started: {display_name}");
        return Ok(());
    }

    if opts.shell {
        runtime::exec_command(workspace, "zsh")?;
        return Ok(());
    }

    if let Some(cmd) = &opts.run {
        runtime::exec_command(workspace, cmd)?;
        return Ok(());
    }

    runtime::exec_tmux(workspace)?;
    Ok(())
}

/// Start (or attach to) the devcontainer of the current repository.
pub fn run_start(config: &Config, opts: &StartOpts) -> Result<()> {
    let ws = GitWorkspace::discover()
        .context("not in a git repository (use `canopy init` to initialize here)")?;
    std::env::set_current_dir(ws.root())?;
    let project_name = ws.project_name();

    descriptor::scaffold(ws.root(), &project_name, &config.base_image, config.base_port)?;
    apply_mounts_and_copies(ws.root(), &project_name, opts)?;
    prepare_workspace(ws.root(), config)?;
    ensure_running(ws.root(), opts.new)?;
    enter(ws.root(), &project_name, config, opts)
}

/// Reuse an existing worktree or create one with a matching new branch and
/// a ready `.devcontainer/`.
pub fn ensure_worktree(
    ws: &GitWorkspace,
    name: &str,
    from_branch: Option<&str>,
    config: &Config,
) -> Result<PathBuf> {
    let path = ws.worktree_path_for(name);
    if path.exists() {
        println!("Using existing worktree: {}", path.display());
        return Ok(path);
    }

    ws.add_worktree(name, &path, from_branch)
        .context("failed to create git worktree")?;

    let src = ws.root().join(".devcontainer");
    let dst = path.join(".devcontainer");
    if dst.exists() {
        // Checked out by git: the directory is committed to the repo.
    } else if src.exists() {
        isolate::copy_tree(&src, &dst)?;
    } else {
        let container = runtime::container_name(ws.root(), Some(name));
        descriptor::scaffold(&path, &container, &config.base_image, config.base_port)?;
    }

    // Git inside the container resolves the worktree's `.git` redirect
    // against the main repo's absolute path.
    descriptor::append_worktree_git_mount(&dst.join("devcontainer.json"), &ws.root().join(".git"))?;

    println!("Created worktree: {}", path.display());
    println!("Branch: {name}");
    Ok(path)
}

/// `tree`: branch off into a worktree with its own container.
pub fn run_tree(
    config: &Config,
    name: Option<String>,
    from_branch: Option<String>,
    opts: &StartOpts,
) -> Result<()> {
    let ws = require_repo()?;

    if let Some(from) = &from_branch {
        if !ws.branch_exists(from) {
            bail!("branch does not exist: {from}");
        }
    }

    let name = name.unwrap_or_else(random_name);
    let path = ensure_worktree(&ws, &name, from_branch.as_deref(), config)?;

    apply_mounts_and_copies(&path, &name, opts)?;
    prepare_workspace(&path, config)?;
    ensure_running(&path, opts.new)?;
    enter(&path, &name, config, opts)
}

fn select_languages() -> Result<Vec<Language>> {
    let labels: Vec<String> = Language::ALL
        .iter()
        .map(|l| l.display_name().to_string())
        .collect();
    let picked = default_picker().pick_many("Select project languages", &labels)?;
    Ok(picked.into_iter().map(|i| Language::ALL[i]).collect())
}

/// `create NAME`: a fresh project directory with git, generated project
/// files, and a running container.
pub fn run_create(
    config: &Config,
    name: &str,
    languages: Option<Vec<Language>>,
    opts: &StartOpts,
) -> Result<()> {
    if find_git_root(None).is_some() {
        bail!("already in a git repository (use `canopy tree` for worktrees)");
    }
    let project_path = std::env::current_dir()?.join(name);
    if project_path.exists() {
        bail!("directory already exists: {}", project_path.display());
    }

    let languages = match languages {
        Some(langs) => langs,
        None => {
            let selected = select_languages()?;
            if selected.is_empty() {
                bail!("no languages selected, aborting");
            }
            selected
        }
    };
    let primary = languages.first().copied().unwrap_or(Language::Other);

    std::fs::create_dir(&project_path)?;
    scaffold::write_project_files(&project_path, name, &languages)?;

    init_repo(&project_path).context("failed to initialize git repository")?;
    descriptor::scaffold(&project_path, name, &config.base_image, config.base_port)?;
    GitWorkspace::at(project_path.clone()).commit_all("Initial commit with devcontainer setup");
    println!("Created project: {}", project_path.display());

    std::env::set_current_dir(&project_path)?;
    apply_mounts_and_copies(&project_path, name, opts)?;
    prepare_workspace(&project_path, config)?;

    // Fresh project, fresh container.
    if !runtime::up(&project_path, true)? {
        bail!("failed to start devcontainer");
    }

    for command in scaffold::init_commands(primary, name) {
        let line = command.join(" ");
        tracing::debug!(%line, "running project init command in container");
        runtime::exec_command(&project_path, &line)?;
    }

    enter(&project_path, name, config, opts)
}

/// `init`: git + devcontainer in the current directory.
pub fn run_init(config: &Config, opts: &StartOpts) -> Result<()> {
    if find_git_root(None).is_some() {
        bail!("already in a git repository (use `canopy start` instead)");
    }

    let project_path = std::env::current_dir()?;
    let project_name = project_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    init_repo(&project_path).context("failed to initialize git repository")?;
    descriptor::scaffold(&project_path, &project_name, &config.base_image, config.base_port)?;
    GitWorkspace::at(project_path.clone()).commit_all("Initial commit with devcontainer setup");
    println!("Initialized: {}", project_path.display());

    apply_mounts_and_copies(&project_path, &project_name, opts)?;
    prepare_workspace(&project_path, config)?;

    if !runtime::up(&project_path, true)? {
        bail!("failed to start devcontainer");
    }

    enter(&project_path, &project_name, config, opts)
}

fn list_global() -> Result<()> {
    let rt = require_runtime()?;
    let containers = runtime::list_all_containers(rt);

    println!("Running devcontainers:");
    println!();
    let running: Vec<_> = containers.iter().filter(|c| c.is_running()).collect();
    if running.is_empty() {
        println!("  (none)");
    } else {
        for c in &running {
            println!("  {:<24} {}", c.name, c.folder);
        }
    }

    let stopped: Vec<_> = containers.iter().filter(|c| !c.is_running()).collect();
    if !stopped.is_empty() {
        println!();
        println!("Stopped devcontainers:");
        println!();
        for c in &stopped {
            println!("  {:<24} {}  ({})", c.name, c.folder, c.state);
        }
    }
    Ok(())
}

/// `list`: project view, or the global view with `--all` / outside a repo.
pub fn run_list(all: bool) -> Result<()> {
    let ws = match (all, GitWorkspace::discover()) {
        (false, Some(ws)) => ws,
        _ => return list_global(),
    };

    println!("Project: {}", ws.project_name());
    println!();

    println!("Containers:");
    let mut any_running = false;
    for (path, label) in ws.find_project_workspaces() {
        if !path.join(".devcontainer").exists() {
            continue;
        }
        let running = runtime::is_container_running(&path);
        any_running |= running;
        let marker = if running { "*" } else { " " };
        let status = if running { "running" } else { "stopped" };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        println!("  {marker} {name:<20} {status:<10} ({label})");
    }
    if !any_running {
        println!("  (no containers running)");
    }
    println!();

    let worktrees: Vec<_> = ws
        .list_worktrees()
        .into_iter()
        .filter(|wt| wt.path != ws.root())
        .collect();
    if worktrees.is_empty() {
        println!("Worktrees: (none)");
    } else {
        println!("Worktrees:");
        for wt in worktrees {
            let name = wt
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            println!("    {name:<20} {:<15} [{}]", wt.branch, wt.commit);
        }
    }
    Ok(())
}

fn stop_workspace(rt: runtime::Runtime, workspace: &Path) -> bool {
    let Some(name) = runtime::container_for_workspace(rt, workspace) else {
        eprintln!("No container found for {}", workspace.display());
        return false;
    };
    if runtime::stop_container(rt, &name) {
        println!("Stopped: {name}");
        true
    } else {
        eprintln!("Failed to stop {name}");
        false
    }
}

/// `stop`: this workspace's container, or with `--all` every container of
/// the project, worktrees before main.
pub fn run_stop(all: bool) -> Result<()> {
    let ws = require_repo()?;
    let rt = require_runtime()?;

    if !all {
        if !stop_workspace(rt, ws.root()) {
            bail!("failed to stop container");
        }
        return Ok(());
    }

    let workspaces = ws.find_project_workspaces();
    let (main, worktrees): (Vec<_>, Vec<_>) =
        workspaces.into_iter().partition(|(_, label)| label == "main");

    let mut any_stopped = false;
    for (path, _) in worktrees.into_iter().chain(main) {
        if !path.exists() {
            continue;
        }
        if runtime::is_container_running(&path) && stop_workspace(rt, &path) {
            any_stopped = true;
        }
    }

    if !any_stopped {
        println!("No running containers found for this project");
    }
    Ok(())
}

fn print_container_bucket(title: &str, entries: &[(String, String)]) {
    if entries.is_empty() {
        return;
    }
    println!("{title}:");
    for (name, folder) in entries {
        println!("  {name:<24} {folder}");
    }
    println!();
}

fn remove_containers(rt: runtime::Runtime, stopped: &[(String, String)], orphans: &[(String, String)]) {
    // Orphans are still running; stop before removal.
    for (name, _) in orphans {
        if runtime::stop_container(rt, name) {
            println!("Stopped: {name}");
        } else {
            eprintln!("Failed to stop: {name}");
        }
    }

    for (name, _) in stopped.iter().chain(orphans) {
        if runtime::remove_container(rt, name) {
            println!("Removed: {name}");
        } else {
            eprintln!("Failed to remove: {name}");
        }
    }
}

/// Teardown flows list what they would act on as buckets; when every bucket
/// is empty the command reports and returns before any confirmation.
fn teardown_is_empty(bucket_sizes: &[usize]) -> bool {
    bucket_sizes.iter().all(|&n| n == 0)
}

fn partition_prunable(containers: &[runtime::ContainerInfo]) -> (Vec<(String, String)>, Vec<(String, String)>) {
    let stopped = containers
        .iter()
        .filter(|c| !c.is_running())
        .map(|c| (c.name.clone(), c.folder.clone()))
        .collect();
    let orphans = containers
        .iter()
        .filter(|c| c.is_orphan())
        .map(|c| (c.name.clone(), c.folder.clone()))
        .collect();
    (stopped, orphans)
}

fn prune_global() -> Result<()> {
    let rt = require_runtime()?;
    let containers = runtime::list_all_containers(rt);
    let (stopped, orphans) = partition_prunable(&containers);

    if teardown_is_empty(&[stopped.len(), orphans.len()]) {
        println!("Nothing to prune.");
        return Ok(());
    }

    print_container_bucket("Stopped containers", &stopped);
    print_container_bucket("Orphan containers (workspace dir missing)", &orphans);

    if !confirm("Remove these?") {
        println!("Cancelled.");
        return Ok(());
    }

    remove_containers(rt, &stopped, &orphans);
    Ok(())
}

/// `prune`: stopped containers, orphaned-running containers, and stale
/// worktrees for this project, or the global equivalent with `--all`.
pub fn run_prune(all: bool) -> Result<()> {
    let ws = match (all, GitWorkspace::discover()) {
        (false, Some(ws)) => ws,
        _ => return prune_global(),
    };
    let rt = require_runtime()?;

    let containers = runtime::containers_for_project(rt, ws.root());
    let (stopped, orphans) = partition_prunable(&containers);
    let stale = ws.find_stale_worktrees();

    if teardown_is_empty(&[stopped.len(), orphans.len(), stale.len()]) {
        println!("Nothing to prune.");
        return Ok(());
    }

    print_container_bucket("Stopped containers", &stopped);
    print_container_bucket("Orphan containers (workspace dir missing)", &orphans);
    if !stale.is_empty() {
        println!("Stale worktrees:");
        for (path, branch) in &stale {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            println!("  {name:<24} ({branch})");
        }
        println!();
    }

    if !confirm("Remove these?") {
        println!("Cancelled.");
        return Ok(());
    }

    remove_containers(rt, &stopped, &orphans);

    for (path, _) in &stale {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if ws.remove_worktree(path) {
            println!("Removed worktree: {name}");
        } else {
            eprintln!("Failed to remove worktree: {name}");
        }
    }
    Ok(())
}

/// `destroy [path]`: remove every container of a project, then optionally
/// its directories, worktree registration, and branch.
pub fn run_destroy(path: Option<PathBuf>, yes: bool) -> Result<()> {
    let git_root = match path {
        Some(p) => {
            let target = p
                .canonicalize()
                .with_context(|| format!("path does not exist: {}", p.display()))?;
            GitWorkspace::discover_from(&target)
                .with_context(|| format!("not a git repository: {}", target.display()))?
                .root()
                .to_path_buf()
        }
        None => find_git_root(None).context("not in a git repository")?,
    };
    let rt = require_runtime()?;

    let containers = runtime::containers_for_project(rt, &git_root);
    if teardown_is_empty(&[containers.len()]) {
        println!("No containers found for this project.");
        return Ok(());
    }

    // Ctrl-C at any destroy prompt is a decline, never an abort mid-way.
    crate::prompt::set_interrupt_hint("Cancelled.");

    let project_name = git_root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    println!("Project: {project_name}");
    println!();
    println!("Containers to destroy:");
    for c in &containers {
        println!("  {:<24} {:<10} {}", c.name, c.state, c.folder);
    }
    println!();

    if !yes && !confirm("Stop and remove these containers?") {
        println!("Cancelled.");
        return Ok(());
    }

    for c in &containers {
        if c.is_running() {
            if runtime::stop_container(rt, &c.name) {
                println!("Stopped: {}", c.name);
            } else {
                eprintln!("Failed to stop {}", c.name);
            }
        }
    }
    for c in &containers {
        if runtime::remove_container(rt, &c.name) {
            println!("Removed: {}", c.name);
        } else {
            eprintln!("Failed to remove: {}", c.name);
        }
    }

    println!();
    println!("Containers removed.");
    println!();

    let worktrees_dir = git_root
        .parent()
        .unwrap_or(Path::new("/"))
        .join(format!("{project_name}-worktrees"));
    let mut dirs_to_remove = vec![git_root.clone()];
    if worktrees_dir.exists() {
        dirs_to_remove.push(worktrees_dir);
    }

    println!("Directories:");
    for d in &dirs_to_remove {
        println!("  {}", d.display());
    }
    println!();

    crate::prompt::set_interrupt_hint(preserve_hint(&git_root));
    if !yes && !confirm("Also remove these directories?") {
        println!("{}", preserve_hint(&git_root));
        return Ok(());
    }

    // When the target is itself a worktree, resolve its main repo and
    // branch before the redirect file is deleted with everything else.
    let main_repo = resolve_main_repo(&git_root);
    let worktree_branch = main_repo.as_ref().and_then(|main| {
        GitWorkspace::at(main.clone())
            .list_worktrees()
            .into_iter()
            .find(|wt| wt.path == git_root)
            .map(|wt| wt.branch)
            .filter(|b| !b.is_empty())
    });

    for d in &dirs_to_remove {
        match std::fs::remove_dir_all(d) {
            Ok(()) => println!("Removed: {}", d.display()),
            Err(err) => eprintln!("Failed to remove {}: {err}", d.display()),
        }
    }

    if let Some(main) = main_repo.filter(|m| m.exists()) {
        let main_ws = GitWorkspace::at(main);
        main_ws.prune_worktrees();

        if let Some(branch) = worktree_branch {
            crate::prompt::set_interrupt_hint(format!("Branch preserved: {branch}"));
            let delete = yes || confirm(&format!("Also delete branch '{branch}'?"));
            if delete {
                match main_ws.delete_branch(&branch) {
                    Ok(()) => println!("Deleted branch: {branch}"),
                    Err(err) => println!("Note: could not delete branch {branch}: {err}"),
                }
            } else {
                println!("Branch preserved: {branch}");
            }
        }
    }

    Ok(())
}

fn preserve_hint(git_root: &Path) -> String {
    format!(
        "Directories preserved. To remove later: rm -rf {}",
        git_root.display()
    )
}

/// Label for the switch picker: `project / worktree` for worktree folders,
/// the directory name otherwise.
fn format_container_display(workspace_folder: &str) -> String {
    let path = Path::new(workspace_folder);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if let Some(parent) = path.parent().and_then(|p| p.file_name()) {
        let parent = parent.to_string_lossy();
        if let Some(project) = parent.strip_suffix("-worktrees") {
            return format!("{project} / {name}");
        }
    }
    name
}

/// `switch`: pick any running container and attach to it.
pub fn run_switch() -> Result<()> {
    let rt = require_runtime()?;
    let running: Vec<_> = runtime::list_all_containers(rt)
        .into_iter()
        .filter(|c| c.is_running() && Path::new(&c.folder).exists())
        .collect();

    if running.is_empty() {
        bail!("no running containers found");
    }
    if running.len() == 1 {
        runtime::exec_tmux(Path::new(&running[0].folder))?;
        return Ok(());
    }

    let labels: Vec<String> = running
        .iter()
        .map(|c| format!("{:<30} {}", format_container_display(&c.folder), c.folder))
        .collect();

    let Some(selected) = default_picker().pick("Pick a container", &labels)? else {
        return Ok(());
    };
    runtime::exec_tmux(Path::new(&running[selected].folder))?;
    Ok(())
}

/// `sync`: regenerate `.devcontainer/` from the current config.
pub fn run_sync(config: &Config) -> Result<()> {
    let ws = require_repo()?;
    std::env::set_current_dir(ws.root())?;
    descriptor::sync(ws.root(), &ws.project_name(), &config.base_image, config.base_port)?;
    println!("Synced .devcontainer/ with current config");
    Ok(())
}

/// `attach`: enter the already-running container of this repository.
pub fn run_attach(shell: bool, run: Option<String>) -> Result<()> {
    let ws = require_repo()?;

    if !runtime::is_container_running(ws.root()) {
        bail!("container is not running (use `canopy start` to start it)");
    }

    if shell {
        runtime::exec_command(ws.root(), "zsh")?;
        return Ok(());
    }
    if let Some(cmd) = run {
        runtime::exec_command(ws.root(), &cmd)?;
        return Ok(());
    }
    runtime::exec_tmux(ws.root())?;
    Ok(())
}

/// Refuse interactive attach from inside tmux; nested attach wedges the
/// terminal. Non-interactive start modifiers are exempt.
pub fn check_tmux_guard(opts: &StartOpts) -> Result<()> {
    let non_interactive =
        opts.detach || opts.prompt.is_some() || opts.shell || opts.run.is_some();
    if !non_interactive && tmux::in_tmux() {
        bail!("already inside tmux; detach first or use --detach, --prompt, --shell, or --run");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_display_labels_worktrees() {
        assert_eq!(format_container_display("/home/u/dev/myapp"), "myapp");
        assert_eq!(
            format_container_display("/home/u/dev/myapp-worktrees/bold-bear"),
            "myapp / bold-bear"
        );
    }

    #[test]
    fn prunable_partition_classifies_orphans() {
        let existing = std::env::temp_dir().to_string_lossy().into_owned();
        let containers = vec![
            runtime::ContainerInfo {
                name: "a".into(),
                folder: existing.clone(),
                state: "exited".into(),
            },
            runtime::ContainerInfo {
                name: "b".into(),
                folder: "/gone/away".into(),
                state: "running".into(),
            },
            runtime::ContainerInfo {
                name: "c".into(),
                folder: existing,
                state: "running".into(),
            },
        ];
        let (stopped, orphans) = partition_prunable(&containers);
        assert_eq!(stopped, vec![("a".to_string(), stopped[0].1.clone())]);
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].0, "b");
    }

    #[test]
    fn empty_buckets_skip_the_confirmation() {
        assert!(teardown_is_empty(&[]));
        assert!(teardown_is_empty(&[0, 0, 0]));
        assert!(!teardown_is_empty(&[0, 1, 0]));
    }

    #[test]
    fn preserve_hint_names_the_project_dir() {
        let hint = preserve_hint(Path::new("/home/u/dev/myapp"));
        assert_eq!(
            hint,
            "Directories preserved. To remove later: rm -rf /home/u/dev/myapp"
        );
    }

    #[test]
    fn tmux_guard_exempts_non_interactive_modes() {
        std::env::set_var("TMUX", "/tmp/tmux-1000/default,1234,0");
        let mut opts = StartOpts::default();
        assert!(check_tmux_guard(&opts).is_err());

        opts.detach = true;
        assert!(check_tmux_guard(&opts).is_ok());

        opts.detach = false;
        opts.run = Some("ls".into());
        assert!(check_tmux_guard(&opts).is_ok());
        std::env::remove_var("TMUX");
    }
}
