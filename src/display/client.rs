//! Display capability wrapper used by the watcher

use async_trait::async_trait;
use std::time::Duration;
use tracing::{info, warn};

use super::{ArtModeState, DisplayControl, DisplayPowerState, FrameTransport};
use crate::retry::{Probe, RetryPolicy};

/// Turns raw transport results into the watcher's fail-safe answers.
///
/// Errors never escape: power state degrades to `Unknown`, art mode to
/// "not on" (so the watcher keeps trying to restore it), toggles are logged.
pub struct DisplayClient<T> {
    transport: T,
    retry_delay: Duration,
}

impl<T: FrameTransport> DisplayClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            retry_delay: Duration::from_secs(1),
        }
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn art_mode_once(&self) -> Probe<bool> {
        match self.transport.art_mode().await {
            Ok(raw) => match ArtModeState::parse(&raw) {
                ArtModeState::On => Probe::Value(true),
                ArtModeState::Off => Probe::Value(false),
                ArtModeState::Indeterminate => Probe::Inconclusive(raw),
            },
            // The TV sometimes sends event payloads instead of on/off, and
            // sometimes it is just unreachable
            Err(e) => Probe::Transport(e.to_string()),
        }
    }
}

#[async_trait]
impl<T: FrameTransport> DisplayControl for DisplayClient<T> {
    async fn power_state(&self) -> DisplayPowerState {
        match self.transport.power_state_field().await {
            Ok(Some(raw)) => DisplayPowerState::parse(&raw),
            Ok(None) => {
                warn!("Display device info has no PowerState field");
                DisplayPowerState::Unknown
            }
            Err(e) => {
                warn!("Error getting display status: {}", e);
                DisplayPowerState::Unknown
            }
        }
    }

    async fn art_mode_is_on(&self, max_retries: u32) -> bool {
        let this = self;
        let policy = RetryPolicy::new(max_retries, self.retry_delay);

        let answer = policy
            .run("art mode check", move |attempt| async move {
                if attempt > 1 {
                    info!(
                        "Art mode check retry {}, display status: {}",
                        attempt,
                        this.power_state().await.as_str()
                    );
                }
                this.art_mode_once().await
            })
            .await;

        match answer {
            Some(on) => on,
            None => {
                warn!("Art mode check gave up after {} attempts", max_retries);
                false
            }
        }
    }

    async fn toggle_power(&self) {
        if let Err(e) = self.transport.send_power_key().await {
            warn!("Error toggling display power: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::DisplayError;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Pops scripted art mode replies; repeats the last one when drained
    #[derive(Default)]
    struct ScriptedTransport {
        art_replies: Mutex<VecDeque<Result<String, DisplayError>>>,
        power_field: Mutex<Option<Result<Option<String>, DisplayError>>>,
        art_calls: Mutex<usize>,
        key_presses: Mutex<usize>,
        fail_keys: bool,
    }

    impl ScriptedTransport {
        fn with_art(replies: Vec<Result<&str, DisplayError>>) -> Self {
            let replies = replies
                .into_iter()
                .map(|r| r.map(|s| s.to_string()))
                .collect();
            Self {
                art_replies: Mutex::new(replies),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl FrameTransport for ScriptedTransport {
        async fn power_state_field(&self) -> Result<Option<String>, DisplayError> {
            match self.power_field.lock().take() {
                Some(reply) => reply,
                None => Ok(Some("on".to_string())),
            }
        }

        async fn art_mode(&self) -> Result<String, DisplayError> {
            *self.art_calls.lock() += 1;
            let mut replies = self.art_replies.lock();
            match replies.pop_front() {
                Some(reply) => reply,
                None => Ok("off".to_string()),
            }
        }

        async fn send_power_key(&self) -> Result<(), DisplayError> {
            *self.key_presses.lock() += 1;
            if self.fail_keys {
                Err(DisplayError::ChannelClosed)
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_art_mode_on_after_inconclusive_replies() {
        let client = DisplayClient::new(ScriptedTransport::with_art(vec![
            Ok("{\"event\":\"art_mode_changed\"}"),
            Err(DisplayError::ChannelClosed),
            Ok("on"),
        ]));

        assert!(client.art_mode_is_on(5).await);
        assert_eq!(*client.transport().art_calls.lock(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_art_mode_off_is_definitive() {
        let client = DisplayClient::new(ScriptedTransport::with_art(vec![Ok("off"), Ok("on")]));

        assert!(!client.art_mode_is_on(5).await);
        assert_eq!(*client.transport().art_calls.lock(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_art_mode_gives_up_as_off() {
        let client = DisplayClient::new(ScriptedTransport::with_art(vec![
            Ok(""),
            Err(DisplayError::Timeout(Duration::from_secs(5))),
            Ok("weird"),
            Ok("ON"),
            Err(DisplayError::ChannelClosed),
            Ok("on"),
        ]));

        assert!(!client.art_mode_is_on(5).await);
        assert_eq!(*client.transport().art_calls.lock(), 5);
    }

    #[tokio::test]
    async fn test_power_state_degrades_to_unknown() {
        let client = DisplayClient::new(ScriptedTransport::default());
        assert_eq!(client.power_state().await, DisplayPowerState::On);

        *client.transport().power_field.lock() = Some(Ok(Some("Standby".to_string())));
        assert_eq!(client.power_state().await, DisplayPowerState::Standby);

        *client.transport().power_field.lock() = Some(Ok(None));
        assert_eq!(client.power_state().await, DisplayPowerState::Unknown);

        *client.transport().power_field.lock() = Some(Err(DisplayError::MissingField("device")));
        assert_eq!(client.power_state().await, DisplayPowerState::Unknown);
    }

    #[tokio::test]
    async fn test_toggle_swallows_errors() {
        let client = DisplayClient::new(ScriptedTransport {
            fail_keys: true,
            ..Default::default()
        });

        client.toggle_power().await;
        client.toggle_power().await;
        assert_eq!(*client.transport().key_presses.lock(), 2);
    }
}
