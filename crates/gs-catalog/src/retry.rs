//! Retry policy for transient server failures.

use std::time::Duration;

use reqwest::Method;

/// Default retry configuration values.
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_BACKOFF_FACTOR: f64 = 0.9;
const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(120);

/// Statuses a proxy in front of the server answers while it restarts.
const RETRY_STATUSES: [u16; 3] = [502, 503, 504];

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the initial attempt.
    pub max_retries: u32,
    /// Seconds; retry `n` waits `backoff_factor * 2^(n-1)`.
    pub backoff_factor: f64,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff_factor: f64) -> Self {
        Self {
            max_retries,
            backoff_factor,
            ..Default::default()
        }
    }

    /// Single attempt only.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            backoff_factor: 0.0,
            max_backoff: Duration::ZERO,
        }
    }

    /// Delay before retry `retry` (1-indexed). Retry 0 is the initial attempt.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        if retry == 0 || self.backoff_factor <= 0.0 {
            return Duration::ZERO;
        }
        let secs = self.backoff_factor * 2f64.powi((retry - 1).min(30) as i32);
        Duration::try_from_secs_f64(secs).map_or(self.max_backoff, |delay| delay.min(self.max_backoff))
    }

    /// Only methods that are safe to repeat are retried; POST never is.
    pub fn allows_method(&self, method: &Method) -> bool {
        [
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
            Method::TRACE,
        ]
        .contains(method)
    }

    pub fn is_retryable_status(&self, status: u16) -> bool {
        RETRY_STATUSES.contains(&status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_backoff() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_retry(0), Duration::ZERO);
        assert_eq!(policy.delay_for_retry(1), Duration::from_secs_f64(0.9));
        assert_eq!(policy.delay_for_retry(2), Duration::from_secs_f64(1.8));
        assert_eq!(policy.delay_for_retry(3), Duration::from_secs_f64(3.6));
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy::new(20, 10.0);
        assert_eq!(policy.delay_for_retry(10), Duration::from_secs(120));
    }

    #[test]
    fn test_huge_backoff_factor_is_capped() {
        let policy = RetryPolicy::new(3, 1e300);
        assert_eq!(policy.delay_for_retry(1), Duration::from_secs(120));
        assert_eq!(policy.delay_for_retry(3), Duration::from_secs(120));
        assert_eq!(RetryPolicy::new(3, f64::INFINITY).delay_for_retry(1), Duration::from_secs(120));
    }

    #[test]
    fn test_post_is_never_retried() {
        let policy = RetryPolicy::default();
        assert!(policy.allows_method(&Method::GET));
        assert!(policy.allows_method(&Method::PUT));
        assert!(policy.allows_method(&Method::DELETE));
        assert!(!policy.allows_method(&Method::POST));
    }

    #[test]
    fn test_retryable_statuses() {
        let policy = RetryPolicy::default();
        assert!(policy.is_retryable_status(503));
        assert!(!policy.is_retryable_status(500));
        assert!(!policy.is_retryable_status(404));
    }

    #[test]
    fn test_no_retry() {
        let policy = RetryPolicy::no_retry();
        assert_eq!(policy.max_retries, 0);
        assert_eq!(policy.delay_for_retry(1), Duration::ZERO);
    }
}
