//! Reconciliation loop
//!
//! Once per tick the player and the display are polled, one row of the
//! decision table is picked and at most one command goes to the display.
//! Ticks are strictly sequential; the only memory between them is
//! [`LoopState`], passed in and handed back explicitly.
//!
//! | Player      | Display / art mode           | Action                    | Sleep  |
//! |-------------|------------------------------|---------------------------|--------|
//! | on          | not standby                  | remember player was on    | active |
//! | on          | standby                      | power key (wake)          | idle   |
//! | off/unknown | art mode on                  | nothing                   | idle   |
//! | off/unknown | art mode off, player was on  | restoration protocol      | none   |
//! | off/unknown | art mode off, never on       | note display is sleeping  | idle   |

mod restore;
mod state;


use futures_util::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::display::{DisplayControl, DisplayPowerState};
use crate::player::PlayerSource;

pub use state::{Branch, LoopState, RestoreOutcome, TickOutcome, WatcherTimings};

/// Keeps the display in art mode whenever the player is off
pub struct Watcher<P, D> {
    player: P,
    display: D,
    timings: WatcherTimings,
}

impl<P: PlayerSource, D: DisplayControl> Watcher<P, D> {
    pub fn new(player: P, display: D, timings: WatcherTimings) -> Self {
        Self {
            player,
            display,
            timings,
        }
    }

    pub fn timings(&self) -> &WatcherTimings {
        &self.timings
    }

    /// Run until `shutdown` resolves.
    ///
    /// Shutdown may interrupt a tick mid-flight (including a restoration);
    /// nothing else does.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) {
        info!("Frame watcher started.");
        tokio::pin!(shutdown);

        let mut state = LoopState::default();
        loop {
            tokio::select! {
                next = self.cycle(state) => state = next,
                _ = &mut shutdown => {
                    info!("Stopping watcher.");
                    break;
                }
            }
        }
    }

    async fn cycle(&self, state: LoopState) -> LoopState {
        let outcome = self.step(state).await;
        if !outcome.sleep.is_zero() {
            tokio::time::sleep(outcome.sleep).await;
        }
        outcome.state
    }

    /// One guarded tick.
    ///
    /// A panic anywhere in the tick is logged and answered with the error
    /// backoff; the previous state is kept so edge history survives.
    pub async fn step(&self, state: LoopState) -> TickOutcome {
        match AssertUnwindSafe(self.tick(state)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(panic) => {
                error!("[watcher loop] Unexpected error: {}", panic_message(&*panic));
                TickOutcome::new(state, Branch::Recovered, self.timings.error_backoff)
            }
        }
    }

    /// Evaluate the decision table once
    pub async fn tick(&self, state: LoopState) -> TickOutcome {
        let player = self.player.power_state().await;
        let display_power = self.display.power_state().await;
        debug!(
            "tick: player={:?} display={:?} state={:?}",
            player, display_power, state
        );

        let mut next = state;

        if player.is_on() {
            if display_power == DisplayPowerState::Standby {
                info!("Player ON but display in standby → waking display");
                self.display.toggle_power().await;
                return TickOutcome::new(next, Branch::Wake, self.timings.idle_poll);
            }

            if !state.player_has_been_on {
                info!("Player turned ON");
            }
            next.player_has_been_on = true;
            next.display_has_been_sleeping = false;
            return TickOutcome::new(next, Branch::Active, self.timings.active_poll);
        }

        // Off and Unknown are handled alike: fail toward art mode
        if self.display.art_mode_is_on(self.timings.art_mode_retries).await {
            return TickOutcome::new(next, Branch::ArtModeOn, self.timings.idle_poll);
        }

        if state.player_has_been_on {
            info!("Player turned OFF → restoring Art Mode");
            next.player_has_been_on = false;
            let result = self.restore_art_mode().await;
            return TickOutcome::new(next, Branch::Restore(result), Duration::ZERO);
        }

        if !state.display_has_been_sleeping {
            info!("Display appears to be sleeping");
        }
        next.display_has_been_sleeping = true;
        TickOutcome::new(next, Branch::Sleeping, self.timings.idle_poll)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
