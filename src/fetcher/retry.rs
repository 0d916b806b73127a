use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

/// Source of delays between attempts; swapped for a recording fake in tests
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed,
    Exponential,
}

/// Bounded retry: at most `max_attempts` calls, `delay` apart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            backoff: Backoff::Fixed,
        }
    }

    pub fn exponential(max_attempts: u32, base: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay: base,
            backoff: Backoff::Exponential,
        }
    }

    /// Delay after the failed attempt numbered `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential => self
                .delay
                .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1))),
        }
    }

    /// Run `op` until it succeeds, returns a non-retryable error, or attempts
    /// run out. `op` receives the 1-based attempt number.
    pub async fn run<T, E, F, Fut>(
        &self,
        sleeper: &dyn Sleeper,
        mut op: F,
        retryable: impl Fn(&E) -> bool,
    ) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts && retryable(&e) => {
                    let delay = self.delay_after(attempt);
                    debug!(attempt, ?delay, "Attempt failed, retrying");
                    sleeper.sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(3, Duration::from_secs(1))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Records requested delays without waiting
    #[derive(Debug, Default)]
    pub struct RecordingSleeper {
        pub delays: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.delays.lock().unwrap().push(duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::testing::RecordingSleeper;
    use super::*;

    #[tokio::test]
    async fn test_stops_after_max_attempts() {
        let policy = RetryPolicy::fixed(3, Duration::from_millis(250));
        let sleeper = RecordingSleeper::default();
        let calls = AtomicU32::new(0);

        let result: Result<(), &str> = policy
            .run(
                &sleeper,
                |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err("down") }
                },
                |_| true,
            )
            .await;

        assert_eq!(result, Err("down"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let delays = sleeper.delays.lock().unwrap().clone();
        assert_eq!(delays, vec![Duration::from_millis(250); 2]);
    }

    #[tokio::test]
    async fn test_non_retryable_error_returns_immediately() {
        let policy = RetryPolicy::fixed(5, Duration::from_secs(1));
        let sleeper = RecordingSleeper::default();
        let calls = AtomicU32::new(0);

        let result: Result<(), u16> = policy
            .run(
                &sleeper,
                |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err(404) }
                },
                |status| *status >= 500,
            )
            .await;

        assert_eq!(result, Err(404));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(sleeper.delays.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_succeeds_on_later_attempt() {
        let policy = RetryPolicy::fixed(3, Duration::ZERO);
        let sleeper = RecordingSleeper::default();

        let result: Result<u32, &str> = policy
            .run(
                &sleeper,
                |attempt| async move {
                    if attempt < 2 {
                        Err("flaky")
                    } else {
                        Ok(attempt)
                    }
                },
                |_| true,
            )
            .await;

        assert_eq!(result, Ok(2));
    }

    #[test]
    fn test_exponential_delays() {
        let policy = RetryPolicy::exponential(4, Duration::from_secs(1));
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
        assert_eq!(policy.delay_after(3), Duration::from_secs(4));
    }

    #[test]
    fn test_zero_attempts_clamped_to_one() {
        assert_eq!(RetryPolicy::fixed(0, Duration::ZERO).max_attempts, 1);
    }
}
