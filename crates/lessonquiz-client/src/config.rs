//! Client configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use lessonquiz_core::coordinator::{SubmitConfig, MAX_AUTO_RETRIES};

/// Top-level lessonquiz configuration.
///
/// Note: custom Debug impl masks the token so it never reaches logs.
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the grading service.
    #[serde(default)]
    pub server_url: Option<String>,
    /// Bearer token sent with submissions.
    #[serde(default)]
    pub token: Option<String>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Automatic retries after a network failure (0 or 1; larger values
    /// are capped at 1).
    #[serde(default = "default_retries")]
    pub auto_retries: u32,
    /// Delay before an automatic retry in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    /// User id for local sessions.
    #[serde(default = "default_user")]
    pub default_user: String,
    /// Where reports are written.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("server_url", &self.server_url)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("timeout_secs", &self.timeout_secs)
            .field("auto_retries", &self.auto_retries)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .field("default_user", &self.default_user)
            .field("output_dir", &self.output_dir)
            .finish()
    }
}

fn default_timeout() -> u64 {
    30
}
fn default_retries() -> u32 {
    1
}
fn default_retry_delay() -> u64 {
    500
}
fn default_user() -> String {
    "local".to_string()
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./lessonquiz-results")
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            token: None,
            timeout_secs: default_timeout(),
            auto_retries: default_retries(),
            retry_delay_ms: default_retry_delay(),
            default_user: default_user(),
            output_dir: default_output_dir(),
        }
    }
}

impl ClientConfig {
    /// Retry settings for the submission coordinator.
    pub fn submit_config(&self) -> SubmitConfig {
        SubmitConfig {
            auto_retries: self.auto_retries.min(MAX_AUTO_RETRIES),
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
/// Unset variables resolve to the empty string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        let var_name = &rest[start + 2..start + len];
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + len + 1..];
    }
    result.push_str(rest);
    result
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `lessonquiz.toml` in the current directory
/// 2. `~/.config/lessonquiz/config.toml`
///
/// Environment variable overrides: `LESSONQUIZ_SERVER`, `LESSONQUIZ_TOKEN`.
pub fn load_config() -> Result<ClientConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<ClientConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("lessonquiz.toml");
            if local.exists() {
                Some(local)
            } else {
                dirs_path()
                    .map(|dir| dir.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<ClientConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => ClientConfig::default(),
    };

    if let Ok(server) = std::env::var("LESSONQUIZ_SERVER") {
        config.server_url = Some(server);
    }
    if let Ok(token) = std::env::var("LESSONQUIZ_TOKEN") {
        config.token = Some(token);
    }

    config.server_url = config
        .server_url
        .map(|u| resolve_env_vars(&u))
        .filter(|u| !u.is_empty());
    config.token = config
        .token
        .map(|t| resolve_env_vars(&t))
        .filter(|t| !t.is_empty());

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("lessonquiz"))
}
