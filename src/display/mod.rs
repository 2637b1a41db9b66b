//! Smart display (Samsung Frame) access
//!
//! Nothing here keeps a session open. Every call goes through
//! [`FrameTransport`], whose implementation connects, asks and disconnects,
//! so a stale socket can never hide the TV's real state.

mod client;
mod error;
mod samsung;

use async_trait::async_trait;

pub use client::DisplayClient;
pub use error::DisplayError;
pub use samsung::SamsungFrame;

/// Display power state as reported by the device-info endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayPowerState {
    On,
    Standby,
    /// Transport error, missing field or an unrecognised value
    Unknown,
}

impl DisplayPowerState {
    /// Parse the raw `PowerState` field (case-insensitive)
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "on" => DisplayPowerState::On,
            "standby" => DisplayPowerState::Standby,
            _ => DisplayPowerState::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DisplayPowerState::On => "on",
            DisplayPowerState::Standby => "standby",
            DisplayPowerState::Unknown => "unknown",
        }
    }
}

/// Art mode as reported by the art channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtModeState {
    On,
    Off,
    /// Non-standard payload or unreachable TV
    Indeterminate,
}

impl ArtModeState {
    /// Only the exact values `on` and `off` are definitive
    pub fn parse(raw: &str) -> Self {
        match raw {
            "on" => ArtModeState::On,
            "off" => ArtModeState::Off,
            _ => ArtModeState::Indeterminate,
        }
    }
}

/// Raw per-call operations; each call owns its own connection
#[async_trait]
pub trait FrameTransport: Send + Sync {
    /// Raw `PowerState` field from device info (`None` if absent)
    async fn power_state_field(&self) -> Result<Option<String>, DisplayError>;

    /// Raw art mode value (normally `on` / `off`)
    async fn art_mode(&self) -> Result<String, DisplayError>;

    /// Send the power key (toggles art mode / power on a Frame)
    async fn send_power_key(&self) -> Result<(), DisplayError>;
}

/// What the watcher needs from the display
#[async_trait]
pub trait DisplayControl: Send + Sync {
    async fn power_state(&self) -> DisplayPowerState;

    /// `true` only when art mode is positively confirmed within `max_retries`
    async fn art_mode_is_on(&self, max_retries: u32) -> bool;

    /// Fire-and-forget; the outcome is verified by a later art mode check
    async fn toggle_power(&self);
}
