//! Default locations for the config and token files.
//!
//! - **Working directory**: if `config.yaml` exists in the current directory
//!   it wins (typical for `cargo run` and for systemd units with a
//!   `WorkingDirectory=`).
//! - **User config dir** (default): `~/.config/frame-watcher/` on Linux, the
//!   platform equivalent elsewhere.
//!
//! The token file always defaults to the user config dir, next to where a
//! pairing helper would have written it.

use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory name used under the user config dir
const APP_DIR: &str = "frame-watcher";
const CONFIG_FILE: &str = "config.yaml";
const TOKEN_FILE: &str = "frame_token.txt";

/// Resolved default paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub config: PathBuf,
    pub token_file: PathBuf,
}

impl AppPaths {
    /// Detect defaults from the current directory and the user config dir.
    pub fn detect() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let app_dir = dirs::config_dir()
            .unwrap_or_else(|| cwd.clone())
            .join(APP_DIR);
        Self::resolve(&cwd, &app_dir)
    }

    fn resolve(cwd: &Path, app_dir: &Path) -> Self {
        let cwd_config = cwd.join(CONFIG_FILE);
        let config = if cwd_config.exists() {
            debug!("Using config from working directory: {}", cwd_config.display());
            cwd_config
        } else {
            app_dir.join(CONFIG_FILE)
        };

        Self {
            config,
            token_file: app_dir.join(TOKEN_FILE),
        }
    }
}
