//! Bounded retries over tri-state probe outcomes
//!
//! Every device query in the watcher answers with a [`Probe`]: a definitive
//! value, an inconclusive reply (the device answered but not with something we
//! can act on), or a transport failure. [`RetryPolicy`] repeats a query until
//! it yields a value or the attempt budget is spent.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Outcome of a single device query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe<T> {
    /// Definitive answer
    Value(T),
    /// Device replied, but the reply was empty or non-standard
    Inconclusive(String),
    /// Device could not be reached (network, spawn, timeout)
    Transport(String),
}

impl<T> Probe<T> {
    /// Consume the probe, keeping only a definitive value
    pub fn value(self) -> Option<T> {
        match self {
            Probe::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_value(&self) -> bool {
        matches!(self, Probe::Value(_))
    }
}

/// Fixed-delay bounded retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts (not retries after the first)
    pub max_attempts: u32,
    /// Pause between two consecutive attempts
    pub delay: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Run `op` until it yields [`Probe::Value`] or attempts run out.
    ///
    /// `op` receives the 1-based attempt number. Failed attempts after the
    /// first are logged at warn level with `label` so flapping devices are
    /// visible in the journal. The delay is only applied between attempts.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Option<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Probe<T>>,
    {
        for attempt in 1..=self.max_attempts {
            let (kind, detail) = match op(attempt).await {
                Probe::Value(v) => return Some(v),
                Probe::Inconclusive(detail) => ("inconclusive", detail),
                Probe::Transport(err) => ("failed", err),
            };

            if attempt > 1 {
                warn!("{} {} (attempt {}) -> {:?}", label, kind, attempt, detail);
            } else {
                debug!("{} {} (attempt {}) -> {:?}", label, kind, attempt, detail);
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(self.delay).await;
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_stops_on_first_value() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(5, Duration::from_secs(1));

        let result = policy
            .run("test", |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 3 {
                        Probe::Value("on")
                    } else {
                        Probe::Inconclusive(String::new())
                    }
                }
            })
            .await;

        assert_eq!(result, Some("on"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_budget_and_sleeps_between_attempts_only() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(4, Duration::from_secs(1));
        let start = Instant::now();

        let result: Option<()> = policy
            .run("test", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Probe::Transport("unreachable".to_string()) }
            })
            .await;

        assert_eq!(result, None);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_zero_attempts_never_calls() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(0, Duration::from_secs(1));

        let result: Option<u8> = policy
            .run("test", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Probe::Value(1) }
            })
            .await;

        assert_eq!(result, None);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_probe_value() {
        assert_eq!(Probe::Value(3).value(), Some(3));
        assert_eq!(Probe::<u8>::Inconclusive("x".into()).value(), None);
        assert!(!Probe::<u8>::Transport("x".into()).is_value());
    }
}
