//! Art mode restoration after the player turns off

use tracing::{error, info};

use super::{RestoreOutcome, Watcher};
use crate::display::DisplayControl;
use crate::player::PlayerSource;
use crate::retry::{Probe, RetryPolicy};

impl<P: PlayerSource, D: DisplayControl> Watcher<P, D> {
    /// Toggle power until art mode is confirmed or attempts run out.
    ///
    /// Runs to completion once started; a new player observation does not
    /// cancel it. Giving up is logged and the loop just resumes polling.
    pub(super) async fn restore_art_mode(&self) -> RestoreOutcome {
        let t = self.timings;

        // Let the player's HDMI/CEC power-down finish before sending keys
        info!("  - Waiting {:?} for display to settle...", t.settle_delay);
        tokio::time::sleep(t.settle_delay).await;

        let this = self;
        let policy = RetryPolicy::new(t.restore_attempts, t.retry_wait);
        let confirmed = policy
            .run("art mode restore", move |attempt| async move {
                info!("  - Attempt {}: toggling power & checking Art Mode", attempt);
                this.display.toggle_power().await;
                tokio::time::sleep(t.toggle_wait).await;

                if this.display.art_mode_is_on(t.art_mode_retries).await {
                    Probe::Value(attempt)
                } else {
                    info!("  - Art mode still off, waiting before retry...");
                    Probe::Inconclusive("art mode still off".to_string())
                }
            })
            .await;

        match confirmed {
            Some(attempts) => {
                info!("✅ Art mode successfully enabled.");
                RestoreOutcome::Restored { attempts }
            }
            None => {
                error!(
                    "❌ Gave up trying to restore Art Mode after {} attempts",
                    t.restore_attempts
                );
                RestoreOutcome::GaveUp
            }
        }
    }
}
