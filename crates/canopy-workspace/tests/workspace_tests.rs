use std::fs;
use std::path::Path;
use std::process::Stdio;
use tempfile::TempDir;

use canopy_workspace::{find_git_root, resolve_main_repo, GitWorkspace};

fn check_git_available() -> bool {
    std::process::Command::new("git")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn git(dir: &Path, args: &[&str]) {
    let status = std::process::Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .unwrap();
    assert!(status.success(), "git {args:?} failed in {dir:?}");
}

fn setup_repo() -> TempDir {
    let dir = TempDir::new().unwrap();
    let repo = dir.path().join("proj");
    fs::create_dir(&repo).unwrap();
    git(&repo, &["init", "-b", "main"]);
    git(&repo, &["config", "user.email", "test@example.com"]);
    git(&repo, &["config", "user.name", "Test User"]);
    fs::write(repo.join("README.md"), "hello\n").unwrap();
    git(&repo, &["add", "README.md"]);
    git(&repo, &["commit", "-m", "initial"]);
    dir
}

#[test]
fn find_git_root_from_nested_directory() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join(".git")).unwrap();
    let nested = dir.path().join("src").join("lib");
    fs::create_dir_all(&nested).unwrap();

    let root = find_git_root(Some(&nested)).unwrap();
    assert_eq!(root, dir.path().canonicalize().unwrap());
}

#[test]
fn find_git_root_detects_worktree_pointer_file() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(".git"), "gitdir: /elsewhere/.git/worktrees/x\n").unwrap();

    let root = find_git_root(Some(dir.path())).unwrap();
    assert_eq!(root, dir.path().canonicalize().unwrap());
}

#[test]
fn find_git_root_returns_none_outside_repo() {
    let dir = TempDir::new().unwrap();
    assert_eq!(find_git_root(Some(dir.path())), None);
}

#[test]
fn list_worktrees_is_empty_without_git_metadata() {
    let dir = TempDir::new().unwrap();
    let ws = GitWorkspace::at(dir.path().to_path_buf());
    assert!(ws.list_worktrees().is_empty());
}

#[test]
fn list_worktrees_reports_main_first() {
    if !check_git_available() {
        eprintln!("git not available, skipping test");
        return;
    }

    let dir = setup_repo();
    let ws = GitWorkspace::at(dir.path().join("proj"));

    let worktrees = ws.list_worktrees();
    assert_eq!(worktrees.len(), 1);
    assert_eq!(
        worktrees[0].path.canonicalize().unwrap(),
        ws.root().canonicalize().unwrap()
    );
    assert_eq!(worktrees[0].branch, "main");
    assert_eq!(worktrees[0].commit.len(), 7);
}

#[test]
fn add_worktree_registers_branch_and_path() {
    if !check_git_available() {
        eprintln!("git not available, skipping test");
        return;
    }

    let dir = setup_repo();
    let ws = GitWorkspace::at(dir.path().join("proj"));
    let wt_path = ws.worktree_path_for("feat-x");

    ws.add_worktree("feat-x", &wt_path, None).unwrap();

    assert!(wt_path.exists());
    assert!(ws.branch_exists("feat-x"));
    let worktrees = ws.list_worktrees();
    assert_eq!(worktrees.len(), 2);
    assert_eq!(worktrees[1].branch, "feat-x");

    // A worktree checkout carries a .git redirect file to the main repo.
    let main = resolve_main_repo(&wt_path).unwrap();
    assert_eq!(
        main.canonicalize().unwrap(),
        ws.root().canonicalize().unwrap()
    );
}

#[test]
fn stale_worktrees_are_detected_after_directory_deletion() {
    if !check_git_available() {
        eprintln!("git not available, skipping test");
        return;
    }

    let dir = setup_repo();
    let ws = GitWorkspace::at(dir.path().join("proj"));
    let wt_path = ws.worktree_path_for("doomed");
    ws.add_worktree("doomed", &wt_path, None).unwrap();

    assert!(ws.find_stale_worktrees().is_empty());

    fs::remove_dir_all(&wt_path).unwrap();
    let stale = ws.find_stale_worktrees();
    assert_eq!(stale.len(), 1);
    assert_eq!(stale[0].1, "doomed");
}

#[test]
fn project_workspaces_label_main_and_branches() {
    if !check_git_available() {
        eprintln!("git not available, skipping test");
        return;
    }

    let dir = setup_repo();
    let ws = GitWorkspace::at(dir.path().join("proj"));
    let wt_path = ws.worktree_path_for("feat-y");
    ws.add_worktree("feat-y", &wt_path, None).unwrap();

    let workspaces = ws.find_project_workspaces();
    assert_eq!(workspaces.len(), 2);
    assert_eq!(workspaces[0].1, "main");
    assert_eq!(workspaces[1].1, "feat-y");
}

#[test]
fn worktree_from_existing_branch() {
    if !check_git_available() {
        eprintln!("git not available, skipping test");
        return;
    }

    let dir = setup_repo();
    let ws = GitWorkspace::at(dir.path().join("proj"));
    git(ws.root(), &["branch", "base-branch"]);

    assert!(ws.branch_exists("base-branch"));
    assert!(!ws.branch_exists("missing-branch"));

    let wt_path = ws.worktree_path_for("from-base");
    ws.add_worktree("from-base", &wt_path, Some("base-branch"))
        .unwrap();
    assert!(wt_path.exists());
}

#[test]
fn remove_worktree_and_delete_branch() {
    if !check_git_available() {
        eprintln!("git not available, skipping test");
        return;
    }

    let dir = setup_repo();
    let ws = GitWorkspace::at(dir.path().join("proj"));
    let wt_path = ws.worktree_path_for("short-lived");
    ws.add_worktree("short-lived", &wt_path, None).unwrap();

    assert!(ws.remove_worktree(&wt_path));
    assert!(!wt_path.exists());

    ws.delete_branch("short-lived").unwrap();
    assert!(!ws.branch_exists("short-lived"));

    // Deleting again reports the failure with git's stderr attached.
    let err = ws.delete_branch("short-lived").unwrap_err();
    assert!(err.to_string().contains("git branch -D"));
}
