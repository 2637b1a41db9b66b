//! Two-protocol player power probe

use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

use super::{PlayerPowerState, PlayerSource, PowerQuery, Protocol};
use crate::config::PlayerConfig;
use crate::retry::RetryPolicy;

/// Resolves the player's power state: primary protocol first, then the
/// secondary (more sleep-tolerant) one, each with its own attempt budget.
pub struct PlayerStateProbe<Q> {
    query: Q,
    primary: (Protocol, RetryPolicy),
    secondary: (Protocol, RetryPolicy),
}

impl<Q: PowerQuery> PlayerStateProbe<Q> {
    pub fn new(query: Q, primary: (Protocol, RetryPolicy), secondary: (Protocol, RetryPolicy)) -> Self {
        Self {
            query,
            primary,
            secondary,
        }
    }

    pub fn from_config(query: Q, config: &PlayerConfig) -> Self {
        let delay = Duration::from_millis(config.retry_delay_ms);
        Self::new(
            query,
            (
                config.primary_protocol,
                RetryPolicy::new(config.primary_attempts, delay),
            ),
            (
                config.secondary_protocol,
                RetryPolicy::new(config.secondary_attempts, delay),
            ),
        )
    }

    /// `true` only when a protocol positively reported On.
    ///
    /// Total failure reads as off, which biases the watcher toward putting
    /// the display back into art mode.
    pub async fn is_player_on(&self) -> bool {
        self.resolve().await.is_on()
    }

    pub async fn resolve(&self) -> PlayerPowerState {
        if let Some(state) = self.read(self.primary).await {
            return state;
        }

        // Keep the retry spacing across the protocol switch
        let (_, primary_policy) = self.primary;
        if primary_policy.max_attempts > 0 {
            tokio::time::sleep(primary_policy.delay).await;
        }

        if let Some(state) = self.read(self.secondary).await {
            return state;
        }

        warn!(
            "player power_state unresolved after {} {} + {} {} attempts → assuming OFF",
            self.primary.1.max_attempts,
            self.primary.0,
            self.secondary.1.max_attempts,
            self.secondary.0
        );
        PlayerPowerState::Unknown
    }

    async fn read(&self, (protocol, policy): (Protocol, RetryPolicy)) -> Option<PlayerPowerState> {
        let label = format!("player {} read", protocol);
        policy.run(&label, |_| self.query.query(protocol)).await
    }
}

#[async_trait]
impl<Q: PowerQuery> PlayerSource for PlayerStateProbe<Q> {
    async fn power_state(&self) -> PlayerPowerState {
        self.resolve().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::interpret_power_output;
    use crate::retry::Probe;
    use parking_lot::Mutex;
    use proptest::prelude::*;

    /// Replays fixed raw outputs per protocol and records every call
    struct ScriptedQuery {
        primary_output: String,
        secondary_output: String,
        calls: Mutex<Vec<Protocol>>,
    }

    impl ScriptedQuery {
        fn new(primary_output: &str, secondary_output: &str) -> Self {
            Self {
                primary_output: primary_output.to_string(),
                secondary_output: secondary_output.to_string(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls_for(&self, protocol: Protocol) -> usize {
            self.calls.lock().iter().filter(|p| **p == protocol).count()
        }
    }

    #[async_trait]
    impl PowerQuery for ScriptedQuery {
        async fn query(&self, protocol: Protocol) -> Probe<PlayerPowerState> {
            self.calls.lock().push(protocol);
            match protocol {
                Protocol::Companion => interpret_power_output(&self.primary_output),
                Protocol::Airplay => interpret_power_output(&self.secondary_output),
            }
        }
    }

    fn probe(query: ScriptedQuery) -> PlayerStateProbe<ScriptedQuery> {
        let delay = Duration::from_secs(1);
        PlayerStateProbe::new(
            query,
            (Protocol::Companion, RetryPolicy::new(2, delay)),
            (Protocol::Airplay, RetryPolicy::new(5, delay)),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_primary_on_short_circuits() {
        let probe = probe(ScriptedQuery::new("PowerState.On", "PowerState.Off"));

        assert!(probe.is_player_on().await);
        assert_eq!(probe.query.calls_for(Protocol::Companion), 1);
        assert_eq!(probe.query.calls_for(Protocol::Airplay), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_primary_off_is_definitive() {
        let probe = probe(ScriptedQuery::new("PowerState.Off", "PowerState.On"));

        assert!(!probe.is_player_on().await);
        assert_eq!(probe.query.calls_for(Protocol::Airplay), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_falls_back_to_secondary() {
        let probe = probe(ScriptedQuery::new("", "PowerState.On"));

        let started = tokio::time::Instant::now();

        assert!(probe.is_player_on().await);
        assert_eq!(probe.query.calls_for(Protocol::Companion), 2);
        assert_eq!(probe.query.calls_for(Protocol::Airplay), 1);
        // 1 s between the two primary reads, 1 s before switching protocol
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unresolved_assumes_off() {
        let probe = probe(ScriptedQuery::new("", "garbage"));

        assert_eq!(probe.resolve().await, PlayerPowerState::Unknown);
        assert!(!probe.is_player_on().await);
        // Two full rounds: 2 primary + 5 secondary each
        assert_eq!(probe.query.calls_for(Protocol::Companion), 4);
        assert_eq!(probe.query.calls_for(Protocol::Airplay), 10);
    }

    proptest! {
        #[test]
        fn prop_same_outputs_same_answer(
            primary in prop::sample::select(vec!["", "PowerState.On", "PowerState.Off", "Standby", "??"]),
            secondary in prop::sample::select(vec!["", "PowerState.On", "PowerState.Off", "Standby", "??"]),
            repeats in 1usize..4,
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .start_paused(true)
                .build()
                .unwrap();

            let answers: Vec<bool> = rt.block_on(async {
                let probe = probe(ScriptedQuery::new(primary, secondary));
                let mut answers = Vec::new();
                for _ in 0..repeats {
                    answers.push(probe.is_player_on().await);
                }
                answers
            });

            prop_assert!(answers.windows(2).all(|w| w[0] == w[1]));

            let expected = primary.contains("On")
                || (interpret_power_output(primary).value().is_none() && secondary.contains("On"));
            prop_assert_eq!(answers[0], expected);
        }
    }
}
