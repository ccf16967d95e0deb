use std::path::{Path, PathBuf};

use canopy_exec::{run_capture, run_interactive};

use crate::error::{WorkspaceError, WorkspaceResult};

/// One entry from `git worktree list --porcelain`.
///
/// The first entry git reports is always the main checkout itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorktreeEntry {
    pub path: PathBuf,
    /// Abbreviated HEAD commit (7 chars).
    pub commit: String,
    /// Branch name with `refs/heads/` stripped; empty for detached HEAD.
    pub branch: String,
}

/// Find a git repository root by walking ancestors from `start`
/// (default: current directory).
///
/// A `.git` entry may be a directory (main checkout) or a file (worktree
/// pointer); both count. Returns `None` when no repository is found.
pub fn find_git_root(start: Option<&Path>) -> Option<PathBuf> {
    let start = match start {
        Some(p) => p.to_path_buf(),
        None => std::env::current_dir().ok()?,
    };
    let mut current = start.canonicalize().unwrap_or(start);

    loop {
        if current.join(".git").exists() {
            return Some(current);
        }
        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => return None,
        }
    }
}

/// Compute the conventional worktree location:
/// `<parent of root>/<root name>-worktrees/<name>`.
///
/// Pure naming convention; nothing is checked against the filesystem.
/// A trailing slash on `project_root` does not change the result.
pub fn worktree_path_for(project_root: &Path, name: &str) -> PathBuf {
    let project_name = project_root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parent = project_root.parent().unwrap_or(Path::new("/"));
    parent.join(format!("{project_name}-worktrees")).join(name)
}

/// Resolve a worktree's main repository from its `.git` redirect file.
///
/// The file contains `gitdir: <main>/.git/worktrees/<name>`; ascending three
/// levels from that directory yields the main checkout. Returns `None` when
/// `root` is not a worktree.
pub fn resolve_main_repo(root: &Path) -> Option<PathBuf> {
    let git_file = root.join(".git");
    if !git_file.is_file() {
        return None;
    }
    let content = std::fs::read_to_string(&git_file).ok()?;
    let gitdir = content.trim().strip_prefix("gitdir:")?.trim();
    // <main>/.git/worktrees/<name> -> <main>
    Path::new(gitdir)
        .parent()?
        .parent()?
        .parent()
        .map(Path::to_path_buf)
}

/// Initialize a fresh repository in `path`.
pub fn init_repo(path: &Path) -> WorkspaceResult<()> {
    let code = run_interactive("git", &["init"], Some(path))?;
    if code != 0 {
        return Err(WorkspaceError::CommandFailed {
            command: "git init".to_string(),
            exit_code: code,
            stderr: String::new(),
        });
    }
    Ok(())
}

/// A resolved git repository root and the operations canopy performs on it.
#[derive(Debug, Clone)]
pub struct GitWorkspace {
    root: PathBuf,
}

impl GitWorkspace {
    /// Discover the repository containing the current directory.
    pub fn discover() -> Option<Self> {
        find_git_root(None).map(|root| Self { root })
    }

    /// Discover the repository containing `start`.
    pub fn discover_from(start: &Path) -> Option<Self> {
        find_git_root(Some(start)).map(|root| Self { root })
    }

    /// Wrap an already-known repository root.
    pub fn at(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory basename, used for container and worktree-dir naming.
    pub fn project_name(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn worktree_path_for(&self, name: &str) -> PathBuf {
        worktree_path_for(&self.root, name)
    }

    /// List worktrees from the porcelain output. First entry is the main
    /// checkout. Any git failure degrades to an empty list so read-only
    /// commands never hard-fail.
    pub fn list_worktrees(&self) -> Vec<WorktreeEntry> {
        let out = match run_capture(
            "git",
            &["worktree", "list", "--porcelain"],
            Some(&self.root),
        ) {
            Ok(out) if out.success() => out,
            _ => return Vec::new(),
        };

        let mut entries = Vec::new();
        let mut path: Option<PathBuf> = None;
        let mut commit = String::new();
        let mut branch = String::new();

        let mut flush = |path: &mut Option<PathBuf>, commit: &mut String, branch: &mut String| {
            if let Some(p) = path.take() {
                entries.push(WorktreeEntry {
                    path: p,
                    commit: std::mem::take(commit),
                    branch: std::mem::take(branch),
                });
            }
            commit.clear();
            branch.clear();
        };

        for line in out.stdout.lines() {
            if line.is_empty() {
                flush(&mut path, &mut commit, &mut branch);
            } else if let Some(p) = line.strip_prefix("worktree ") {
                path = Some(PathBuf::from(p));
            } else if let Some(h) = line.strip_prefix("HEAD ") {
                commit = h.chars().take(7).collect();
            } else if let Some(b) = line.strip_prefix("branch ") {
                branch = b.trim_start_matches("refs/heads/").to_string();
            }
        }
        flush(&mut path, &mut commit, &mut branch);

        entries
    }

    /// Worktrees still registered in git whose directory has been deleted.
    pub fn find_stale_worktrees(&self) -> Vec<(PathBuf, String)> {
        self.list_worktrees()
            .into_iter()
            .filter(|wt| wt.path != self.root && !wt.path.exists())
            .map(|wt| (wt.path, wt.branch))
            .collect()
    }

    /// All workspace directories for this project: the main checkout
    /// (labeled `main`) followed by its worktrees labeled by branch.
    pub fn find_project_workspaces(&self) -> Vec<(PathBuf, String)> {
        let mut workspaces = vec![(self.root.clone(), "main".to_string())];

        let worktrees_dir = self
            .root
            .parent()
            .unwrap_or(Path::new("/"))
            .join(format!("{}-worktrees", self.project_name()));
        if worktrees_dir.exists() {
            for wt in self.list_worktrees() {
                if wt.path != self.root {
                    let label = if wt.branch.is_empty() {
                        wt.path
                            .file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .unwrap_or_default()
                    } else {
                        wt.branch
                    };
                    workspaces.push((wt.path, label));
                }
            }
        }

        workspaces
    }

    /// Whether a branch or ref resolves in this repository.
    pub fn branch_exists(&self, branch: &str) -> bool {
        run_capture("git", &["rev-parse", "--verify", branch], Some(&self.root))
            .map(|out| out.success())
            .unwrap_or(false)
    }

    /// Create a new worktree with a matching new branch, optionally based
    /// on `from_branch`. Parent directories are created first.
    pub fn add_worktree(
        &self,
        name: &str,
        path: &Path,
        from_branch: Option<&str>,
    ) -> WorkspaceResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let path_str = path.to_string_lossy();
        let mut args = vec!["worktree", "add", "-b", name, path_str.as_ref()];
        if let Some(from) = from_branch {
            args.push(from);
        }

        let code = run_interactive("git", &args, Some(&self.root))?;
        if code != 0 {
            return Err(WorkspaceError::CommandFailed {
                command: format!("git {}", args.join(" ")),
                exit_code: code,
                stderr: String::new(),
            });
        }
        Ok(())
    }

    /// Deregister and delete a worktree. Returns whether git accepted it.
    pub fn remove_worktree(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();
        run_capture(
            "git",
            &["worktree", "remove", "--force", path_str.as_ref()],
            Some(&self.root),
        )
        .map(|out| out.success())
        .unwrap_or(false)
    }

    /// Drop bookkeeping for worktrees deleted from disk. Best effort.
    pub fn prune_worktrees(&self) {
        let _ = run_capture("git", &["worktree", "prune"], Some(&self.root));
    }

    /// Force-delete a local branch.
    pub fn delete_branch(&self, branch: &str) -> WorkspaceResult<()> {
        let out = run_capture("git", &["branch", "-D", branch], Some(&self.root))?;
        if !out.success() {
            return Err(WorkspaceError::CommandFailed {
                command: format!("git branch -D {branch}"),
                exit_code: out.code,
                stderr: out.stderr.trim().to_string(),
            });
        }
        Ok(())
    }

    /// Stage everything and commit. Best effort: a failed commit (empty
    /// tree, unset identity) is not fatal to scaffolding.
    pub fn commit_all(&self, message: &str) {
        let _ = run_capture("git", &["add", "."], Some(&self.root));
        let _ = run_capture("git", &["commit", "-m", message], Some(&self.root));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worktree_path_is_pure_convention() {
        assert_eq!(
            worktree_path_for(Path::new("/dev/myapp"), "feature-x"),
            PathBuf::from("/dev/myapp-worktrees/feature-x")
        );
    }

    #[test]
    fn worktree_path_ignores_trailing_slash() {
        assert_eq!(
            worktree_path_for(Path::new("/dev/myapp/"), "feature-x"),
            worktree_path_for(Path::new("/dev/myapp"), "feature-x")
        );
    }

    #[test]
    fn main_repo_resolution_requires_redirect_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(resolve_main_repo(dir.path()), None);

        std::fs::write(
            dir.path().join(".git"),
            "gitdir: /home/u/dev/app/.git/worktrees/bold-fox\n",
        )
        .unwrap();
        assert_eq!(
            resolve_main_repo(dir.path()),
            Some(PathBuf::from("/home/u/dev/app"))
        );
    }
}
