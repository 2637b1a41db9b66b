//! Loop memory, pacing and per-tick results

use std::time::Duration;

use crate::config::WatcherConfig;

/// The only state carried between ticks; everything else is queried live.
///
/// Lost on restart, which is fine: the next live query is authoritative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopState {
    /// Player was seen on; its On→Off edge triggers art mode restoration
    pub player_has_been_on: bool,
    /// Display already reported as sleeping (only dedupes the log line)
    pub display_has_been_sleeping: bool,
}

/// Named pacing and retry budget for the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatcherTimings {
    pub active_poll: Duration,
    pub idle_poll: Duration,
    pub settle_delay: Duration,
    pub restore_attempts: u32,
    pub toggle_wait: Duration,
    pub retry_wait: Duration,
    pub art_mode_retries: u32,
    pub error_backoff: Duration,
}

impl From<&WatcherConfig> for WatcherTimings {
    fn from(config: &WatcherConfig) -> Self {
        Self {
            active_poll: Duration::from_millis(config.active_poll_ms),
            idle_poll: Duration::from_millis(config.idle_poll_ms),
            settle_delay: Duration::from_secs(config.settle_delay_secs),
            restore_attempts: config.restore_attempts,
            toggle_wait: Duration::from_secs(config.toggle_wait_secs),
            retry_wait: Duration::from_secs(config.retry_wait_secs),
            art_mode_retries: config.art_mode_retries,
            error_backoff: Duration::from_secs(config.error_backoff_secs),
        }
    }
}

impl Default for WatcherTimings {
    fn default() -> Self {
        Self::from(&WatcherConfig::default())
    }
}

/// Which row of the decision table a tick took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    /// Player on, display awake: fast poll
    Active,
    /// Player on, display in standby: power key sent to wake it
    Wake,
    /// Player off, art mode already showing
    ArtModeOn,
    /// Player On→Off edge with art mode off
    Restore(RestoreOutcome),
    /// Player off, art mode off, player never seen on
    Sleeping,
    /// Tick panicked; state kept, backoff applied
    Recovered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// Art mode confirmed after this many toggles
    Restored { attempts: u32 },
    GaveUp,
}

/// Result of one tick: next state and how long to sleep before the next one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    pub state: LoopState,
    pub branch: Branch,
    pub sleep: Duration,
}

impl TickOutcome {
    pub fn new(state: LoopState, branch: Branch, sleep: Duration) -> Self {
        Self {
            state,
            branch,
            sleep,
        }
    }
}
