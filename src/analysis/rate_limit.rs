use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::info;

/// Minimum spacing between calls to the analysis API.
///
/// The last-call timestamp sits behind an async mutex that stays held while a
/// caller sleeps, so concurrent callers go through one at a time.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    /// `0` disables limiting
    pub fn per_minute(calls: u32) -> Self {
        let interval = if calls == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(60) / calls
        };
        Self::new(interval)
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until a call is allowed, then record it
    pub async fn acquire(&self) {
        let mut last_call = self.last_call.lock().await;

        if let Some(last) = *last_call {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                info!("Rate limiting: sleeping for {:.2} seconds", wait.as_secs_f64());
                tokio::time::sleep(wait).await;
            }
        }

        *last_call = Some(Instant::now());
    }
}
