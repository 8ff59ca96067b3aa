//! Provider error taxonomy and retry backoff.
//!
//! Providers distinguish transient failures (timeouts, 5xx, generic non-2xx)
//! from permanent ones (the resource or credential is invalid). Transient
//! errors are retried with exponential backoff up to a fixed attempt cap;
//! permanent errors abort retries immediately.

use std::time::Duration;

/// Attempt cap for per-domain provider lookups.
pub const MAX_ATTEMPTS: u32 = 3;

/// Backoff base in seconds (`base * 2^(attempt-1)`).
const BACKOFF_BASE_SECS: f64 = 0.5;

/// Backoff ceiling in seconds.
const BACKOFF_CAP_SECS: f64 = 8.0;

/// A failed provider call, classified for retry policy.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Timeout, 5xx, or other retryable failure.
    #[error("transient provider error: {0}")]
    Transient(String),

    /// 4xx from the permanent set — retrying cannot help.
    #[error("permanent provider error: HTTP {0}")]
    Permanent(u16),
}

impl ProviderError {
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent(_))
    }
}

/// Delay before the attempt following `attempt` (1-indexed):
/// `0.5 * 2^(attempt-1)` seconds, capped at 8 s.
pub fn backoff_delay(attempt: u32) -> Duration {
    let secs = (BACKOFF_BASE_SECS * 2f64.powi(attempt as i32 - 1)).min(BACKOFF_CAP_SECS);
    Duration::from_secs_f64(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(backoff_delay(1), Duration::from_millis(500));
        assert_eq!(backoff_delay(2), Duration::from_secs(1));
        assert_eq!(backoff_delay(3), Duration::from_secs(2));
        assert_eq!(backoff_delay(4), Duration::from_secs(4));
        assert_eq!(backoff_delay(5), Duration::from_secs(8));
        assert_eq!(backoff_delay(9), Duration::from_secs(8));
    }

    #[test]
    fn permanence_classification() {
        assert!(ProviderError::Permanent(404).is_permanent());
        assert!(!ProviderError::Transient("timeout".into()).is_permanent());
    }
}
