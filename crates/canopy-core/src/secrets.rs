//! API key resolution: `pass` first, environment fallback.
//!
//! Secret lookups are never fatal. A wedged gpg pinentry must not hang the
//! launcher, so `pass show` runs under a 5 second timeout; anything that
//! fails or times out falls back to the same-named environment variable,
//! defaulting to empty.

use std::time::Duration;

use canopy_exec::{run_capture_timeout, tool_available};

use crate::config::Config;

const PASS_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolve ANTHROPIC_API_KEY and OPENAI_API_KEY.
pub fn resolve_secrets(config: &Config) -> Vec<(String, String)> {
    let pass_available = tool_available("pass");

    [
        ("ANTHROPIC_API_KEY", config.pass_path_anthropic.as_str()),
        ("OPENAI_API_KEY", config.pass_path_openai.as_str()),
    ]
    .into_iter()
    .map(|(key, pass_path)| {
        let value = if pass_available {
            pass_lookup(pass_path)
        } else {
            None
        };
        let value =
            value.unwrap_or_else(|| std::env::var(key).unwrap_or_default());
        (key.to_string(), value)
    })
    .collect()
}

fn pass_lookup(path: &str) -> Option<String> {
    match run_capture_timeout("pass", &["show", path], PASS_TIMEOUT) {
        Ok(Some(out)) if out.success() => Some(out.stdout.trim().to_string()),
        Ok(Some(_)) | Ok(None) => {
            tracing::debug!(path, "pass lookup failed or timed out");
            None
        }
        Err(err) => {
            tracing::debug!(path, %err, "pass invocation failed");
            None
        }
    }
}

/// Export resolved secrets into this process's environment so the
/// devcontainer CLI can interpolate `${localEnv:...}` references.
pub fn export_secrets(secrets: &[(String, String)]) {
    for (key, value) in secrets {
        std::env::set_var(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_fallback_when_pass_has_no_entry() {
        let config = Config {
            pass_path_anthropic: "canopy/test/no-such-entry".to_string(),
            pass_path_openai: "canopy/test/no-such-entry-2".to_string(),
            ..Config::default()
        };
        std::env::set_var("ANTHROPIC_API_KEY", "from-env");
        std::env::remove_var("OPENAI_API_KEY");

        let secrets = resolve_secrets(&config);
        let get = |k: &str| {
            secrets
                .iter()
                .find(|(key, _)| key == k)
                .map(|(_, v)| v.clone())
                .unwrap()
        };
        assert_eq!(get("ANTHROPIC_API_KEY"), "from-env");
        assert_eq!(get("OPENAI_API_KEY"), "");
    }

    #[test]
    fn export_sets_process_environment() {
        export_secrets(&[("CANOPY_TEST_SECRET".to_string(), "v1".to_string())]);
        assert_eq!(std::env::var("CANOPY_TEST_SECRET").unwrap(), "v1");
    }
}
