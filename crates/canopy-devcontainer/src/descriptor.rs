use std::fs;
use std::path::Path;

use serde_json::{json, Map, Value};

use crate::error::{DevcontainerError, DevcontainerResult};

/// Mounts present in every generated descriptor. These strings are the
/// devcontainer wire format and must round-trip unchanged.
const BASE_MOUNTS: &[&str] = &[
    "source=/tmp/.X11-unix,target=/tmp/.X11-unix,type=bind",
    // Gemini: copy-based isolation (credentials copied to .devcontainer/.gemini-cache/)
    "source=${localWorkspaceFolder}/.devcontainer/.gemini-cache,target=/home/${localEnv:USER}/.gemini,type=bind",
    // Claude: copy-based isolation (credentials copied to .devcontainer/.claude-cache/)
    "source=${localWorkspaceFolder}/.devcontainer/.claude-cache,target=/home/${localEnv:USER}/.claude,type=bind",
    "source=${localWorkspaceFolder}/.devcontainer/.claude.json,target=/home/${localEnv:USER}/.claude.json,type=bind",
    "source=${localEnv:HOME}/.zshrc,target=/home/${localEnv:USER}/.zshrc,type=bind,readonly",
    "source=${localWorkspaceFolder}/.devcontainer/.histfile,target=/home/${localEnv:USER}/.histfile,type=bind",
    "source=${localEnv:HOME}/.tmux.conf,target=/home/${localEnv:USER}/.tmux.conf,type=bind,readonly",
    "source=${localEnv:HOME}/.gitconfig,target=/home/${localEnv:USER}/.gitconfig,type=bind,readonly",
    "source=${localEnv:HOME}/.config/tmux,target=/home/${localEnv:USER}/.config/tmux,type=bind,readonly",
    // Emacs: config copied for isolation, packages in a container-specific
    // cache (~/.cache/emacs-container/) so the container builds its own
    // elpaca/tree-sitter for its Emacs version + libc, separate from host.
    "source=${localWorkspaceFolder}/.devcontainer/.emacs-config,target=/home/${localEnv:USER}/.config/emacs,type=bind",
    "source=${localWorkspaceFolder}/.devcontainer/.emacs-cache,target=/home/${localEnv:USER}/.cache/emacs,type=bind",
    "source=${localEnv:HOME}/.cache/emacs-container/elpaca,target=/home/${localEnv:USER}/.cache/emacs/elpaca,type=bind",
    "source=${localEnv:HOME}/.cache/emacs-container/tree-sitter,target=/home/${localEnv:USER}/.cache/emacs/tree-sitter,type=bind",
    "source=${localEnv:HOME}/.gnupg/pubring.kbx,target=/home/${localEnv:USER}/.gnupg/pubring.kbx,type=bind,readonly",
    "source=${localEnv:HOME}/.gnupg/trustdb.gpg,target=/home/${localEnv:USER}/.gnupg/trustdb.gpg,type=bind,readonly",
    "source=${localEnv:XDG_RUNTIME_DIR}/gnupg/S.gpg-agent,target=/home/${localEnv:USER}/.gnupg/S.gpg-agent,type=bind",
    "source=${localEnv:HOME}/.config/gh,target=/home/${localEnv:USER}/.config/gh,type=bind,readonly",
];

/// Only included when the host has a Wayland session.
const WAYLAND_MOUNT: &str = "source=${localEnv:XDG_RUNTIME_DIR}/${localEnv:WAYLAND_DISPLAY},target=/tmp/container-runtime/${localEnv:WAYLAND_DISPLAY},type=bind";

/// Whether the host advertises a Wayland session.
pub fn wayland_session_active() -> bool {
    std::env::var("WAYLAND_DISPLAY").map(|v| !v.is_empty()).unwrap_or(false)
}

fn expand_user(path: &str) -> String {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home.to_string_lossy().into_owned();
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest).to_string_lossy().into_owned();
        }
    }
    path.to_string()
}

/// A host-path bind mount requested on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountSpec {
    pub source: String,
    pub target: String,
    pub readonly: bool,
}

impl MountSpec {
    /// Parse `source:target[:ro]`. The `:ro` suffix is stripped before the
    /// source/target split; a relative target resolves under the container
    /// workspace root, `~` in the source resolves on the host.
    pub fn parse(arg: &str, project_name: &str) -> DevcontainerResult<Self> {
        let mut parts: Vec<&str> = arg.split(':').collect();

        let readonly = parts.len() >= 2 && *parts.last().unwrap() == "ro";
        if readonly {
            parts.pop();
        }

        if parts.len() < 2 {
            return Err(DevcontainerError::InvalidMount(arg.to_string()));
        }

        let source = expand_user(parts[0]);
        // Targets may themselves contain colons.
        let target = parts[1..].join(":");
        let target = if target.starts_with('/') {
            target
        } else {
            format!("/workspaces/{project_name}/{target}")
        };

        Ok(Self { source, target, readonly })
    }

    /// Serialize to the descriptor's delimited mount string.
    pub fn render(&self) -> String {
        let mut s = format!("source={},target={},type=bind", self.source, self.target);
        if self.readonly {
            s.push_str(",readonly");
        }
        s
    }
}

/// A host file to copy into the workspace before start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopySpec {
    pub source: String,
    pub target: String,
}

impl CopySpec {
    /// Parse `source[:target]`. An omitted target lands the file at the
    /// workspace root under its original basename.
    pub fn parse(arg: &str, project_name: &str) -> Self {
        let (source, target) = match arg.split_once(':') {
            Some((src, dst)) => (src.to_string(), Some(dst.to_string())),
            None => (arg.to_string(), None),
        };

        let source = expand_user(&source);
        let target = match target {
            None => {
                let basename = Path::new(&source)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                format!("/workspaces/{project_name}/{basename}")
            }
            Some(t) if t.starts_with('/') => t,
            Some(t) => format!("/workspaces/{project_name}/{t}"),
        };

        Self { source, target }
    }
}

/// Build the descriptor document. Deterministic given identical inputs;
/// `wayland` decides the one conditional mount.
pub fn build_descriptor(project_name: &str, port: u16, wayland: bool) -> Value {
    let mut mounts: Vec<Value> = BASE_MOUNTS.iter().map(|m| json!(m)).collect();
    if wayland {
        mounts.push(json!(WAYLAND_MOUNT));
    }

    let workspace_folder = format!("/workspaces/{project_name}");
    json!({
        "name": project_name,
        "build": {"dockerfile": "Dockerfile"},
        "workspaceFolder": workspace_folder,
        "runArgs": ["--hostname", project_name],
        "mounts": mounts,
        "containerEnv": {
            "TERM": "xterm-256color",
            "DISPLAY": "${localEnv:DISPLAY}",
            "WAYLAND_DISPLAY": "${localEnv:WAYLAND_DISPLAY}",
            "XDG_RUNTIME_DIR": "/tmp/container-runtime",
            "ANTHROPIC_API_KEY": "${localEnv:ANTHROPIC_API_KEY}",
            "OPENAI_API_KEY": "${localEnv:OPENAI_API_KEY}",
            "PORT": port.to_string(),
            "WORKSPACE_FOLDER": workspace_folder,
        },
    })
}

fn dockerfile_content(base_image: &str) -> String {
    let username = std::env::var("USER").unwrap_or_else(|_| "dev".to_string());
    format!(
        "FROM {base_image}\n\
         \n\
         USER root\n\
         RUN apk add --no-cache nodejs npm\n\
         LABEL devcontainer.metadata='[{{\"remoteUser\":\"{username}\"}}]'\n\
         \n\
         USER {username}\n"
    )
}

fn write_pretty(path: &Path, value: &Value) -> DevcontainerResult<()> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    serde::Serialize::serialize(value, &mut ser).map_err(|source| {
        DevcontainerError::Descriptor { path: path.to_path_buf(), source }
    })?;
    fs::write(path, buf)?;
    Ok(())
}

fn read_descriptor(path: &Path) -> DevcontainerResult<Value> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|source| DevcontainerError::Descriptor {
        path: path.to_path_buf(),
        source,
    })
}

fn write_files(dir: &Path, project_name: &str, base_image: &str, port: u16) -> DevcontainerResult<()> {
    let descriptor = build_descriptor(project_name, port, wayland_session_active());
    write_pretty(&dir.join("devcontainer.json"), &descriptor)?;
    fs::write(dir.join("Dockerfile"), dockerfile_content(base_image))?;
    Ok(())
}

/// Create `.devcontainer/` with descriptor and Dockerfile, but only when it
/// does not already exist. Returns whether anything was written.
///
/// This is the guarantee that keeps re-runs from clobbering a hand-edited
/// descriptor; `sync` is the explicit escape hatch.
pub fn scaffold(
    workspace: &Path,
    project_name: &str,
    base_image: &str,
    port: u16,
) -> DevcontainerResult<bool> {
    let dir = workspace.join(".devcontainer");
    if dir.exists() {
        return Ok(false);
    }
    fs::create_dir_all(&dir)?;
    write_files(&dir, project_name, base_image, port)?;
    Ok(true)
}

/// Regenerate `.devcontainer/`, overwriting whatever is there.
pub fn sync(
    workspace: &Path,
    project_name: &str,
    base_image: &str,
    port: u16,
) -> DevcontainerResult<()> {
    let dir = workspace.join(".devcontainer");
    fs::create_dir_all(&dir)?;
    write_files(&dir, project_name, base_image, port)
}

/// Append user mounts to an existing descriptor. Additive: callers are
/// responsible for not applying the same spec twice.
pub fn append_mounts(descriptor_path: &Path, mounts: &[MountSpec]) -> DevcontainerResult<()> {
    if mounts.is_empty() {
        return Ok(());
    }

    let mut content = read_descriptor(descriptor_path)?;
    let array = mounts_array(&mut content);
    for mount in mounts {
        array.push(json!(mount.render()));
    }
    write_pretty(descriptor_path, &content)
}

/// Append a same-path bind mount for the main repository's `.git` directory.
///
/// A worktree's `.git` is a redirect file holding an absolute host path into
/// the main repo's `.git/worktrees/<name>/`; without this mount, git inside
/// the container cannot resolve it.
pub fn append_worktree_git_mount(
    descriptor_path: &Path,
    main_git_dir: &Path,
) -> DevcontainerResult<()> {
    let mut content = read_descriptor(descriptor_path)?;
    let git_dir = main_git_dir.to_string_lossy();
    mounts_array(&mut content).push(json!(format!(
        "source={git_dir},target={git_dir},type=bind"
    )));
    write_pretty(descriptor_path, &content)
}

/// Set `containerEnv.PORT`, used by spawn to give each instance its own port.
pub fn set_container_port(descriptor_path: &Path, port: u16) -> DevcontainerResult<()> {
    let mut content = read_descriptor(descriptor_path)?;
    let env = content
        .as_object_mut()
        .map(|obj| {
            obj.entry("containerEnv")
                .or_insert_with(|| Value::Object(Map::new()))
        })
        .and_then(Value::as_object_mut);
    if let Some(env) = env {
        env.insert("PORT".to_string(), json!(port.to_string()));
    }
    write_pretty(descriptor_path, &content)
}

fn mounts_array(content: &mut Value) -> &mut Vec<Value> {
    content
        .as_object_mut()
        .expect("descriptor root is an object")
        .entry("mounts")
        .or_insert_with(|| Value::Array(Vec::new()))
        .as_array_mut()
        .expect("mounts is an array")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mount_parse_strips_ro_before_splitting() {
        let m = MountSpec::parse("~/data:foo:ro", "myproj").unwrap();
        let home = dirs::home_dir().unwrap();
        assert_eq!(m.source, home.join("data").to_string_lossy());
        assert_eq!(m.target, "/workspaces/myproj/foo");
        assert!(m.readonly);
    }

    #[test]
    fn mount_parse_absolute_target_passes_through() {
        let m = MountSpec::parse("/src:/abs/target", "p").unwrap();
        assert_eq!(m.target, "/abs/target");
        assert!(!m.readonly);
    }

    #[test]
    fn mount_parse_rejects_missing_target() {
        assert!(MountSpec::parse("justsource", "p").is_err());
        assert!(MountSpec::parse("justsource:ro", "p").is_err());
    }

    #[test]
    fn mount_render_matches_wire_format() {
        let m = MountSpec {
            source: "/a".into(),
            target: "/b".into(),
            readonly: false,
        };
        assert_eq!(m.render(), "source=/a,target=/b,type=bind");

        let ro = MountSpec { readonly: true, ..m };
        assert_eq!(ro.render(), "source=/a,target=/b,type=bind,readonly");
    }

    #[test]
    fn copy_parse_defaults_to_workspace_basename() {
        let c = CopySpec::parse("/etc/hosts", "myproj");
        assert_eq!(c.target, "/workspaces/myproj/hosts");

        let c = CopySpec::parse("/etc/hosts:conf/hosts", "myproj");
        assert_eq!(c.target, "/workspaces/myproj/conf/hosts");

        let c = CopySpec::parse("/etc/hosts:/abs/hosts", "myproj");
        assert_eq!(c.target, "/abs/hosts");
    }

    #[test]
    fn descriptor_is_deterministic() {
        let a = build_descriptor("proj", 4000, false);
        let b = build_descriptor("proj", 4000, false);
        assert_eq!(a, b);
        assert_eq!(a["containerEnv"]["PORT"], json!("4000"));
        assert_eq!(a["workspaceFolder"], json!("/workspaces/proj"));
    }

    #[test]
    fn scaffold_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        assert!(scaffold(dir.path(), "proj", "img:latest", 4000).unwrap());

        let descriptor_path = dir.path().join(".devcontainer/devcontainer.json");
        let before = fs::read_to_string(&descriptor_path).unwrap();

        assert!(!scaffold(dir.path(), "other-name", "other:img", 9999).unwrap());
        assert_eq!(fs::read_to_string(&descriptor_path).unwrap(), before);
    }

    #[test]
    fn sync_overwrites_unconditionally() {
        let dir = tempfile::tempdir().unwrap();
        scaffold(dir.path(), "proj", "img:latest", 4000).unwrap();

        sync(dir.path(), "proj", "img:latest", 4100).unwrap();
        let descriptor_path = dir.path().join(".devcontainer/devcontainer.json");
        let content: Value =
            serde_json::from_str(&fs::read_to_string(&descriptor_path).unwrap()).unwrap();
        assert_eq!(content["containerEnv"]["PORT"], json!("4100"));
    }

    #[test]
    fn append_mounts_preserves_existing_entries() {
        let dir = tempfile::tempdir().unwrap();
        scaffold(dir.path(), "proj", "img:latest", 4000).unwrap();
        let descriptor_path = dir.path().join(".devcontainer/devcontainer.json");

        let base_count = {
            let content: Value =
                serde_json::from_str(&fs::read_to_string(&descriptor_path).unwrap()).unwrap();
            content["mounts"].as_array().unwrap().len()
        };

        let extra = [
            MountSpec::parse("/a:/b", "proj").unwrap(),
            MountSpec::parse("/c:/d:ro", "proj").unwrap(),
        ];
        append_mounts(&descriptor_path, &extra).unwrap();

        let content: Value =
            serde_json::from_str(&fs::read_to_string(&descriptor_path).unwrap()).unwrap();
        let mounts = content["mounts"].as_array().unwrap();
        assert_eq!(mounts.len(), base_count + 2);
        assert_eq!(mounts[mounts.len() - 1], json!("source=/c,target=/d,type=bind,readonly"));
    }

    #[test]
    fn wayland_mount_is_conditional() {
        let without = build_descriptor("proj", 4000, false);
        let with = build_descriptor("proj", 4000, true);
        let count = |v: &Value| v["mounts"].as_array().unwrap().len();
        assert_eq!(count(&with), count(&without) + 1);
        assert_eq!(with["mounts"].as_array().unwrap().last().unwrap(), &json!(WAYLAND_MOUNT));
    }
}
