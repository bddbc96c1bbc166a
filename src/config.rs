//! Configuration loading and validation.
//!
//! Marvin reads a single human-owned `config.toml`. The Slack token itself
//! never lives in the file: the file names the environment variable that
//! holds it, and `.env` files are honoured when resolving it.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::adapters::slack;

/// Top-level configuration.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Robot identity.
    #[serde(default)]
    pub robot: RobotConfig,

    /// Slack connection settings.
    #[serde(default)]
    pub slack: SlackConfig,

    /// Auxiliary HTTP server.
    #[serde(default)]
    pub http: HttpConfig,

    /// Directory for rotated JSON logs. Defaults to `~/.marvin/logs`.
    #[serde(default)]
    pub logs_dir: Option<PathBuf>,
}

/// Robot identity and startup behaviour.
#[derive(Debug, Deserialize)]
pub struct RobotConfig {
    /// Name the robot answers to (`@marvin`, `marvin:`).
    #[serde(default = "default_robot_name")]
    pub name: String,

    /// Channel to post an "online" notice to after connecting.
    #[serde(default)]
    pub announce_channel: Option<String>,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            name: default_robot_name(),
            announce_channel: None,
        }
    }
}

/// Slack-specific configuration.
#[derive(Debug, Deserialize)]
pub struct SlackConfig {
    /// Environment variable name holding the bot token.
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// `rtm.start` endpoint.
    #[serde(default = "default_rtm_start_endpoint")]
    pub rtm_start_endpoint: String,

    /// Upper bound on the `rtm.start` response body, in bytes.
    #[serde(default = "default_max_handshake_bytes")]
    pub max_handshake_bytes: usize,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            token_env: default_token_env(),
            rtm_start_endpoint: default_rtm_start_endpoint(),
            max_handshake_bytes: default_max_handshake_bytes(),
        }
    }
}

/// Auxiliary HTTP server configuration.
#[derive(Debug, Default, Deserialize)]
pub struct HttpConfig {
    /// Address to serve on. No server runs when absent.
    #[serde(default)]
    pub bind: Option<SocketAddr>,
}

// Default value functions for serde

fn default_robot_name() -> String {
    "marvin".to_owned()
}
fn default_token_env() -> String {
    "MARVIN_SLACK_TOKEN".to_owned()
}
fn default_rtm_start_endpoint() -> String {
    slack::DEFAULT_RTM_START_ENDPOINT.to_owned()
}
fn default_max_handshake_bytes() -> usize {
    slack::DEFAULT_MAX_HANDSHAKE_BYTES
}

impl Config {
    /// Resolve the Slack token from the configured environment variable.
    ///
    /// # Errors
    ///
    /// Returns an error if the variable is unset or empty.
    pub fn slack_token(&self) -> anyhow::Result<String> {
        let name = &self.slack.token_env;
        match std::env::var(name) {
            Ok(token) if !token.trim().is_empty() => Ok(token.trim().to_owned()),
            Ok(_) => Err(anyhow::anyhow!("environment variable {name} is empty")),
            Err(_) => Err(anyhow::anyhow!("environment variable {name} is not set")),
        }
    }

    /// Build the adapter configuration, resolving the token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be resolved.
    pub fn adapter_config(&self) -> anyhow::Result<slack::SlackConfig> {
        let mut adapter = slack::SlackConfig::new(self.slack_token()?)
            .with_endpoint(self.slack.rtm_start_endpoint.clone());
        adapter.max_handshake_bytes = self.slack.max_handshake_bytes;
        Ok(adapter)
    }

    /// Directory for rotated logs.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn logs_dir(&self) -> anyhow::Result<PathBuf> {
        match &self.logs_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(config_dir()?.join("logs")),
        }
    }
}

/// Load the config from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config at {}: {e}", path.display()))?;
    let config: Config = toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("failed to parse config at {}: {e}", path.display()))?;
    Ok(config)
}

/// Resolve the default config directory (`~/.marvin/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_dir() -> anyhow::Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".marvin"))
}
