//! Configuration management for Frame Watcher
//!
//! Handles loading, parsing and validating the YAML configuration file.
//! Configuration is read once at startup and stays immutable afterwards.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::player::Protocol;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub display: DisplayConfig,
    pub player: PlayerConfig,
    #[serde(default)]
    pub watcher: WatcherConfig,
}

/// Samsung Frame TV connection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DisplayConfig {
    pub host: String,
    #[serde(default = "default_display_port")]
    pub port: u16,
    /// Token obtained when pairing with the TV (see `paths` for the default)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_file: Option<PathBuf>,
    #[serde(default = "default_client_name")]
    pub client_name: String,
    #[serde(default = "default_display_timeout")]
    pub timeout_secs: u64,
}

/// Apple TV detection through `atvremote`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayerConfig {
    /// Identifier printed by `atvremote scan`
    pub id: String,
    /// Static IP; skips discovery, which is the flaky part of atvremote
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default = "default_player_command")]
    pub command: String,
    /// Arguments placed before the atvremote ones (e.g. `-m pyatv.scripts.atvremote`)
    #[serde(default)]
    pub command_args: Vec<String>,
    #[serde(default = "default_query_timeout")]
    pub query_timeout_secs: u64,
    #[serde(default = "default_primary_protocol")]
    pub primary_protocol: Protocol,
    #[serde(default = "default_primary_attempts")]
    pub primary_attempts: u32,
    #[serde(default = "default_secondary_protocol")]
    pub secondary_protocol: Protocol,
    #[serde(default = "default_secondary_attempts")]
    pub secondary_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

/// Reconciliation loop pacing and restoration budget
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct WatcherConfig {
    /// Poll interval while the player is on
    pub active_poll_ms: u64,
    /// Poll interval while idle, in art mode or after waking the display
    pub idle_poll_ms: u64,
    /// Wait after the player turns off before touching the display
    pub settle_delay_secs: u64,
    pub restore_attempts: u32,
    /// Wait between a power toggle and the art mode check
    pub toggle_wait_secs: u64,
    /// Extra wait before the next restoration attempt
    pub retry_wait_secs: u64,
    pub art_mode_retries: u32,
    pub art_mode_retry_delay_ms: u64,
    /// Pause after an unexpected failure inside a tick
    pub error_backoff_secs: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            active_poll_ms: 500,
            idle_poll_ms: 2000,
            settle_delay_secs: 5,
            restore_attempts: 5,
            toggle_wait_secs: 3,
            retry_wait_secs: 3,
            art_mode_retries: 5,
            art_mode_retry_delay_ms: 1000,
            error_backoff_secs: 2,
        }
    }
}

/// Values given on the command line (or environment) that win over the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub display_host: Option<String>,
    pub token_file: Option<PathBuf>,
    pub player_id: Option<String>,
    pub player_address: Option<String>,
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = Self::from_yaml(&contents)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: AppConfig =
            serde_yaml::from_str(contents).context("Failed to parse YAML config")?;
        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides, then re-validate
    pub fn apply_overrides(&mut self, overrides: Overrides) -> Result<()> {
        if let Some(host) = overrides.display_host {
            self.display.host = host;
        }
        if let Some(token_file) = overrides.token_file {
            self.display.token_file = Some(token_file);
        }
        if let Some(id) = overrides.player_id {
            self.player.id = id;
        }
        if let Some(address) = overrides.player_address {
            self.player.address = Some(address);
        }
        self.validate()
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        if self.display.host.trim().is_empty() {
            anyhow::bail!("display.host cannot be empty");
        }
        if self.display.port == 0 {
            anyhow::bail!("display.port cannot be 0");
        }
        if self.display.timeout_secs == 0 {
            anyhow::bail!("display.timeout_secs must be at least 1");
        }

        if self.player.id.trim().is_empty() {
            anyhow::bail!("player.id cannot be empty");
        }
        if self.player.command.trim().is_empty() {
            anyhow::bail!("player.command cannot be empty");
        }
        if self.player.query_timeout_secs == 0 {
            anyhow::bail!("player.query_timeout_secs must be at least 1");
        }
        if self.player.primary_attempts == 0 && self.player.secondary_attempts == 0 {
            anyhow::bail!("player needs at least one primary or secondary attempt");
        }

        let w = &self.watcher;
        if w.restore_attempts == 0 {
            anyhow::bail!("watcher.restore_attempts must be at least 1");
        }
        if w.art_mode_retries == 0 {
            anyhow::bail!("watcher.art_mode_retries must be at least 1");
        }
        // A zero poll interval would spin the loop hot
        if w.active_poll_ms == 0 || w.idle_poll_ms == 0 || w.error_backoff_secs == 0 {
            anyhow::bail!("watcher poll intervals and error backoff must be non-zero");
        }

        Ok(())
    }
}

// Default value functions
fn default_display_port() -> u16 { 8002 }
fn default_client_name() -> String { "FrameWatcher".to_string() }
fn default_display_timeout() -> u64 { 5 }
fn default_player_command() -> String { "atvremote".to_string() }
fn default_query_timeout() -> u64 { 5 }
fn default_primary_protocol() -> Protocol { Protocol::Companion }
fn default_primary_attempts() -> u32 { 2 }
fn default_secondary_protocol() -> Protocol { Protocol::Airplay }
fn default_secondary_attempts() -> u32 { 5 }
fn default_retry_delay_ms() -> u64 { 1000 }
