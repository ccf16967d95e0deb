//! Layered TOML configuration.
//!
//! Resolution order, later wins per key: built-in defaults, then
//! `~/.config/canopy/config.toml`, then `.canopy.toml` in the working
//! directory. Unknown keys in user files are ignored. The resolved value is
//! immutable for the rest of the invocation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub base_image: String,
    pub pass_path_anthropic: String,
    pub pass_path_openai: String,
    pub agents: Vec<String>,
    pub agent_commands: BTreeMap<String, String>,
    pub base_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        let agent_commands = BTreeMap::from([
            (
                "claude".to_string(),
                "claude --dangerously-skip-permissions".to_string(),
            ),
            ("gemini".to_string(), "gemini --yolo".to_string()),
            ("codex".to_string(), "codex".to_string()),
        ]);
        Self {
            base_image: "localhost/emacs-gui:latest".to_string(),
            pass_path_anthropic: "api/llm/anthropic".to_string(),
            pass_path_openai: "api/llm/openai".to_string(),
            agents: vec![
                "claude".to_string(),
                "gemini".to_string(),
                "codex".to_string(),
            ],
            agent_commands,
            base_port: 4000,
        }
    }
}

/// One user config file: every field optional so a file can override a
/// single key without restating the rest.
#[derive(Debug, Default, Deserialize)]
struct ConfigOverlay {
    base_image: Option<String>,
    pass_path_anthropic: Option<String>,
    pass_path_openai: Option<String>,
    agents: Option<Vec<String>>,
    agent_commands: Option<BTreeMap<String, String>>,
    base_port: Option<u16>,
}

impl Config {
    /// Load from the standard locations relative to the current directory.
    pub fn load() -> Result<Self, ConfigError> {
        let global_dir = dirs::config_dir().map(|d| d.join("canopy"));
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::load_from(global_dir.as_deref(), &cwd)
    }

    /// Load with explicit layer locations.
    pub fn load_from(global_dir: Option<&Path>, cwd: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(dir) = global_dir {
            config.apply_file(&dir.join("config.toml"))?;
        }
        config.apply_file(&cwd.join(".canopy.toml"))?;

        Ok(config)
    }

    fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        if !path.exists() {
            return Ok(());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let overlay: ConfigOverlay =
            toml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::debug!(path = %path.display(), "applied config layer");
        self.apply(overlay);
        Ok(())
    }

    fn apply(&mut self, overlay: ConfigOverlay) {
        if let Some(v) = overlay.base_image {
            self.base_image = v;
        }
        if let Some(v) = overlay.pass_path_anthropic {
            self.pass_path_anthropic = v;
        }
        if let Some(v) = overlay.pass_path_openai {
            self.pass_path_openai = v;
        }
        if let Some(v) = overlay.agents {
            self.agents = v;
        }
        if let Some(v) = overlay.agent_commands {
            self.agent_commands = v;
        }
        if let Some(v) = overlay.base_port {
            self.base_port = v;
        }
    }

    /// Agent for a batch slot: an explicit override wins, otherwise agents
    /// rotate round-robin by index.
    pub fn agent_name(&self, agent_override: Option<&str>, index: usize) -> String {
        if let Some(name) = agent_override {
            return name.to_string();
        }
        if self.agents.is_empty() {
            return "claude".to_string();
        }
        self.agents[index % self.agents.len()].clone()
    }

    /// Launch command for the agent at a batch slot. Agents without a
    /// configured command run under their bare name.
    pub fn agent_command(&self, agent_override: Option<&str>, index: usize) -> String {
        let name = self.agent_name(agent_override, index);
        self.agent_commands.get(&name).cloned().unwrap_or(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_without_any_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(None, dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.base_port, 4000);
    }

    #[test]
    fn project_layer_overrides_global_per_key() {
        let global = TempDir::new().unwrap();
        let cwd = TempDir::new().unwrap();
        std::fs::write(
            global.path().join("config.toml"),
            "base_image = \"global:img\"\nbase_port = 5000\n",
        )
        .unwrap();
        std::fs::write(cwd.path().join(".canopy.toml"), "base_port = 6000\n").unwrap();

        let config = Config::load_from(Some(global.path()), cwd.path()).unwrap();
        assert_eq!(config.base_image, "global:img");
        assert_eq!(config.base_port, 6000);
        // Untouched keys keep their defaults.
        assert_eq!(config.pass_path_anthropic, "api/llm/anthropic");
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let cwd = TempDir::new().unwrap();
        std::fs::write(
            cwd.path().join(".canopy.toml"),
            "base_port = 4100\nno_such_key = true\n",
        )
        .unwrap();
        let config = Config::load_from(None, cwd.path()).unwrap();
        assert_eq!(config.base_port, 4100);
    }

    #[test]
    fn malformed_layer_is_an_error() {
        let cwd = TempDir::new().unwrap();
        std::fs::write(cwd.path().join(".canopy.toml"), "base_port = [").unwrap();
        assert!(matches!(
            Config::load_from(None, cwd.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn round_robin_wraps_and_override_wins() {
        let config = Config::default();
        assert_eq!(config.agent_name(None, 0), "claude");
        assert_eq!(config.agent_name(None, 1), "gemini");
        assert_eq!(config.agent_name(None, 2), "codex");
        assert_eq!(config.agent_name(None, 3), "claude");
        assert_eq!(config.agent_name(Some("codex"), 0), "codex");
    }

    #[test]
    fn agent_command_falls_back_to_bare_name() {
        let mut config = Config::default();
        config.agents.push("aider".to_string());
        assert_eq!(
            config.agent_command(None, 0),
            "claude --dangerously-skip-permissions"
        );
        assert_eq!(config.agent_command(Some("aider"), 0), "aider");
    }
}
