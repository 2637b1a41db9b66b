//! Media player (Apple TV) power detection
//!
//! The player is queried through pyatv's `atvremote` CLI. Two protocols are
//! available: Companion is fast and accurate while the player is awake,
//! AirPlay keeps answering from light/deep sleep. [`PlayerStateProbe`] tries
//! the primary one first and falls back to the secondary one.

mod atvremote;
mod probe;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::retry::Probe;

pub use atvremote::AtvRemote;
pub use probe::PlayerStateProbe;

/// Media player power state, recomputed every poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerPowerState {
    On,
    Off,
    /// Every attempt was inconclusive; treated as Off by the watcher
    Unknown,
}

impl PlayerPowerState {
    pub fn is_on(self) -> bool {
        self == PlayerPowerState::On
    }
}

/// Protocol used by a single `atvremote` invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Companion,
    Airplay,
}

impl Protocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Companion => "companion",
            Protocol::Airplay => "airplay",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One power-state query against the player over a given protocol
#[async_trait]
pub trait PowerQuery: Send + Sync {
    async fn query(&self, protocol: Protocol) -> Probe<PlayerPowerState>;
}

/// Polled by the watcher once per tick
#[async_trait]
pub trait PlayerSource: Send + Sync {
    /// Never fails: unresolved state is reported as [`PlayerPowerState::Unknown`]
    async fn power_state(&self) -> PlayerPowerState;
}

/// Interpret the text printed by `atvremote ... power_state`.
///
/// Output looks like `PowerState.On` / `PowerState.Off`. "On" wins if present;
/// "Off" or "Standby" mean off; anything else (including empty) is inconclusive.
pub fn interpret_power_output(output: &str) -> Probe<PlayerPowerState> {
    let output = output.trim();
    if output.is_empty() {
        return Probe::Inconclusive(String::new());
    }

    if output.contains("On") {
        Probe::Value(PlayerPowerState::On)
    } else if output.contains("Off") || output.contains("Standby") {
        Probe::Value(PlayerPowerState::Off)
    } else {
        Probe::Inconclusive(output.to_string())
    }
}
