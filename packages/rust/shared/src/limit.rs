//! Token-paced rate limiting for polite provider access.
//!
//! Every external provider gets its own [`RateLimiter`] so one provider's
//! throttle never blocks another's loop.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Paces calls so consecutive completions are at least `1/rps` apart.
///
/// Safe for concurrent use: the interior mutex serializes the gate, so under
/// a worker pool the spacing guarantee still holds.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// A limiter allowing `rps` requests per second.
    ///
    /// A rate of 0 (or anything non-positive) disables pacing entirely.
    pub fn per_second(rps: f64) -> Self {
        let min_interval = if rps > 0.0 {
            Duration::from_secs_f64(1.0 / rps)
        } else {
            Duration::ZERO
        };
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// Wait until the next request is allowed, then claim the slot.
    pub async fn wait(&self) {
        if self.min_interval.is_zero() {
            return;
        }

        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}
