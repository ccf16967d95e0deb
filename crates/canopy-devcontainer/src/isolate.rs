//! Per-workspace copies of host credentials and editor configuration.
//!
//! Containers get working auth through bind mounts of these copies, without
//! write access to the host originals. All refresh paths replace directory
//! *contents* and never the directory itself: a live container's bind mount
//! is resolved by inode, and recreating the directory would silently break
//! the mount.

use std::fs;
use std::path::Path;

use crate::descriptor::CopySpec;
use crate::error::{DevcontainerError, DevcontainerResult};

/// Files copied from `~/.claude/` into the per-workspace cache.
const CLAUDE_FILES: &[&str] = &[".credentials.json", "settings.json"];

/// Files copied from `~/.gemini/` into the per-workspace cache.
const GEMINI_FILES: &[&str] = &["settings.json", "google_accounts.json", "oauth_creds.json"];

/// Remove every entry inside `path` without removing `path` itself.
pub fn clear_directory_contents(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        return Ok(());
    }
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let ty = entry.file_type()?;
        if ty.is_dir() {
            fs::remove_dir_all(entry.path())?;
        } else {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

/// Recursive copy preserving symlinks as symlinks.
pub fn copy_tree(src: &Path, dst: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        let ty = entry.file_type()?;
        if ty.is_symlink() {
            let link = fs::read_link(&from)?;
            #[cfg(unix)]
            std::os::unix::fs::symlink(&link, &to)?;
            #[cfg(not(unix))]
            let _ = link;
        } else if ty.is_dir() {
            copy_tree(&from, &to)?;
        } else {
            fs::copy(&from, &to)?;
        }
    }
    Ok(())
}

fn refresh_dir_in_place(dir: &Path) -> std::io::Result<()> {
    if dir.exists() {
        clear_directory_contents(dir)
    } else {
        fs::create_dir_all(dir)
    }
}

fn copy_allowlisted(src_dir: &Path, dst_dir: &Path, names: &[&str]) -> std::io::Result<()> {
    for name in names {
        let src = src_dir.join(name);
        if src.exists() {
            fs::copy(&src, dst_dir.join(name))?;
        }
    }
    Ok(())
}

/// Copy agent credentials into `<workspace>/.devcontainer/` caches.
///
/// Only a fixed allow-list of files is copied, never the whole host
/// directory. Missing sources are skipped: not every agent is configured on
/// every host.
pub fn refresh_credential_cache(home: &Path, workspace: &Path) -> std::io::Result<()> {
    let devcontainer = workspace.join(".devcontainer");

    let claude_cache = devcontainer.join(".claude-cache");
    refresh_dir_in_place(&claude_cache)?;
    let claude_dir = home.join(".claude");
    copy_allowlisted(&claude_dir, &claude_cache, CLAUDE_FILES)?;

    let statsig_src = claude_dir.join("statsig");
    if statsig_src.exists() {
        let statsig_dst = claude_cache.join("statsig");
        if statsig_dst.exists() {
            fs::remove_dir_all(&statsig_dst)?;
        }
        copy_tree(&statsig_src, &statsig_dst)?;
    }

    let claude_json = home.join(".claude.json");
    if claude_json.exists() {
        fs::copy(&claude_json, devcontainer.join(".claude.json"))?;
    }

    let gemini_cache = devcontainer.join(".gemini-cache");
    refresh_dir_in_place(&gemini_cache)?;
    copy_allowlisted(&home.join(".gemini"), &gemini_cache, GEMINI_FILES)?;

    Ok(())
}

/// Copy `~/.config/emacs` into an isolated per-workspace tree and prepare
/// the host-side container package caches. No-op when the host has no Emacs
/// config.
pub fn refresh_editor_config(home: &Path, workspace: &Path) -> std::io::Result<()> {
    let emacs_src = home.join(".config").join("emacs");
    if !emacs_src.exists() {
        return Ok(());
    }

    let devcontainer = workspace.join(".devcontainer");
    fs::create_dir_all(devcontainer.join(".emacs-cache"))?;

    // Shared across projects so elpaca only builds once per container
    // Emacs version + libc combination.
    let container_cache = home.join(".cache").join("emacs-container");
    fs::create_dir_all(container_cache.join("elpaca"))?;
    fs::create_dir_all(container_cache.join("tree-sitter"))?;

    let emacs_dst = devcontainer.join(".emacs-config");
    refresh_dir_in_place(&emacs_dst)?;
    copy_tree(&emacs_src, &emacs_dst)
}

/// Copy user-requested files into the workspace before start.
///
/// Targets under `/workspaces/<project>/` are remapped to the host-side
/// workspace directory; a missing source is fatal.
pub fn copy_user_files(copies: &[CopySpec], workspace: &Path) -> DevcontainerResult<()> {
    for spec in copies {
        let source = Path::new(&spec.source);
        if !source.exists() {
            return Err(DevcontainerError::CopySourceMissing(source.to_path_buf()));
        }

        let target = match spec.target.strip_prefix("/workspaces/") {
            Some(rest) => match rest.split_once('/') {
                Some((_, relative)) => workspace.join(relative),
                // Bare project dir: fall back to the source basename.
                None => workspace.join(source.file_name().unwrap_or_default()),
            },
            None => Path::new(&spec.target).to_path_buf(),
        };

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(source, &target)?;
        tracing::debug!(from = %source.display(), to = %target.display(), "copied");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::MetadataExt;
    use tempfile::TempDir;

    #[test]
    fn clear_keeps_the_directory_inode() {
        let dir = TempDir::new().unwrap();
        let cache = dir.path().join("cache");
        fs::create_dir(&cache).unwrap();
        fs::write(cache.join("a.json"), "{}").unwrap();
        fs::create_dir(cache.join("nested")).unwrap();
        let inode_before = fs::metadata(&cache).unwrap().ino();

        clear_directory_contents(&cache).unwrap();

        assert!(cache.exists());
        assert_eq!(fs::read_dir(&cache).unwrap().count(), 0);
        assert_eq!(fs::metadata(&cache).unwrap().ino(), inode_before);
    }

    #[test]
    fn clear_missing_directory_is_a_noop() {
        let dir = TempDir::new().unwrap();
        clear_directory_contents(&dir.path().join("absent")).unwrap();
    }

    #[test]
    fn credential_refresh_copies_allowlist_only() {
        let home = TempDir::new().unwrap();
        let workspace = TempDir::new().unwrap();

        let claude = home.path().join(".claude");
        fs::create_dir_all(&claude).unwrap();
        fs::write(claude.join(".credentials.json"), "{\"token\":1}").unwrap();
        fs::write(claude.join("settings.json"), "{}").unwrap();
        fs::write(claude.join("history.jsonl"), "private").unwrap();
        fs::write(home.path().join(".claude.json"), "{}").unwrap();

        refresh_credential_cache(home.path(), workspace.path()).unwrap();

        let cache = workspace.path().join(".devcontainer/.claude-cache");
        assert!(cache.join(".credentials.json").exists());
        assert!(cache.join("settings.json").exists());
        assert!(!cache.join("history.jsonl").exists());
        assert!(workspace.path().join(".devcontainer/.claude.json").exists());
        // No gemini config on this host: cache exists but stays empty.
        let gemini = workspace.path().join(".devcontainer/.gemini-cache");
        assert_eq!(fs::read_dir(gemini).unwrap().count(), 0);
    }

    #[test]
    fn credential_refresh_preserves_cache_inode() {
        let home = TempDir::new().unwrap();
        let workspace = TempDir::new().unwrap();
        fs::create_dir_all(home.path().join(".claude")).unwrap();

        let cache = workspace.path().join(".devcontainer/.claude-cache");
        fs::create_dir_all(&cache).unwrap();
        fs::write(cache.join("stale.json"), "old").unwrap();
        let inode_before = fs::metadata(&cache).unwrap().ino();

        refresh_credential_cache(home.path(), workspace.path()).unwrap();

        assert_eq!(fs::metadata(&cache).unwrap().ino(), inode_before);
        assert!(!cache.join("stale.json").exists());
    }

    #[test]
    fn editor_config_copy_preserves_symlinks() {
        let home = TempDir::new().unwrap();
        let workspace = TempDir::new().unwrap();

        let emacs = home.path().join(".config/emacs");
        fs::create_dir_all(&emacs).unwrap();
        fs::write(emacs.join("init.el"), ";; init").unwrap();
        std::os::unix::fs::symlink("init.el", emacs.join("link.el")).unwrap();

        refresh_editor_config(home.path(), workspace.path()).unwrap();

        let dst = workspace.path().join(".devcontainer/.emacs-config");
        assert!(dst.join("init.el").exists());
        assert!(dst.join("link.el").symlink_metadata().unwrap().is_symlink());
        assert!(workspace.path().join(".devcontainer/.emacs-cache").exists());
        assert!(home.path().join(".cache/emacs-container/elpaca").exists());
    }

    #[test]
    fn editor_config_without_source_is_a_noop() {
        let home = TempDir::new().unwrap();
        let workspace = TempDir::new().unwrap();
        refresh_editor_config(home.path(), workspace.path()).unwrap();
        assert!(!workspace.path().join(".devcontainer").exists());
    }

    #[test]
    fn user_copies_remap_workspace_targets() {
        let workspace = TempDir::new().unwrap();
        let src_dir = TempDir::new().unwrap();
        let src = src_dir.path().join("notes.md");
        fs::write(&src, "hi").unwrap();

        let spec = CopySpec {
            source: src.to_string_lossy().into_owned(),
            target: "/workspaces/proj/docs/notes.md".to_string(),
        };
        copy_user_files(&[spec], workspace.path()).unwrap();
        assert!(workspace.path().join("docs/notes.md").exists());
    }

    #[test]
    fn user_copy_with_missing_source_is_fatal() {
        let workspace = TempDir::new().unwrap();
        let spec = CopySpec {
            source: "/definitely/not/here".to_string(),
            target: "/workspaces/proj/x".to_string(),
        };
        let err = copy_user_files(&[spec], workspace.path()).unwrap_err();
        assert!(matches!(err, DevcontainerError::CopySourceMissing(_)));
    }
}
