// SPDX-License-Identifier: GPL-3.0-or-later

use crate::error::{EchoNestError, Result};
use echonest_config::{RateLimitConfig, RateLimitMode};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};

/// Upper bound on the call log's preallocation.
const MAX_INITIAL_CAPACITY: usize = 1024;

/// Sliding-window rate limiter for Echo Nest API calls.
///
/// The Echo Nest allows 120 calls per minute per key. The limiter keeps the
/// timestamps of admitted calls, drops those older than the window on every
/// check, and refuses once the window holds `max_calls` entries. It is local
/// and best-effort: the service still enforces its own limit.
///
/// Clones share the same call log.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    enabled: bool,
    max_calls: usize,
    window: Duration,
    retry_interval: Duration,
    mode: RateLimitMode,
    call_log: Arc<Mutex<VecDeque<Instant>>>,
}

impl RateLimiter {
    /// Create an enabled limiter admitting `max_calls` per `window`.
    pub fn new(max_calls: usize, window: Duration) -> Self {
        Self {
            enabled: true,
            max_calls,
            window,
            retry_interval: Duration::from_millis(500),
            mode: RateLimitMode::Block,
            call_log: Arc::new(Mutex::new(VecDeque::with_capacity(
                max_calls.min(MAX_INITIAL_CAPACITY),
            ))),
        }
    }

    /// Create a rate limiter with Echo Nest defaults (120 calls per 60 seconds).
    pub fn echonest_default() -> Self {
        Self::new(120, Duration::from_secs(60))
    }

    /// A limiter that admits everything.
    pub fn disabled() -> Self {
        Self::echonest_default().enabled(false)
    }

    /// Build the limiter described by the `rate_limit` configuration section.
    /// An enforced limit of zero calls is refused.
    pub fn from_config(config: &RateLimitConfig) -> Result<Self> {
        if config.obey_rate_limit && config.max_calls == 0 {
            return Err(EchoNestError::Configuration(
                "rate_limit.max_calls must be at least 1".to_string(),
            ));
        }
        Ok(Self::new(config.max_calls, config.window())
            .enabled(config.obey_rate_limit)
            .mode(config.mode)
            .retry_interval(config.retry_interval()))
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn mode(mut self, mode: RateLimitMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record a call if the window has room. Never waits.
    pub async fn try_admit(&self) -> bool {
        if !self.enabled {
            return true;
        }

        let mut log = self.call_log.lock().await;
        let now = Instant::now();
        while let Some(oldest) = log.front() {
            if now.duration_since(*oldest) >= self.window {
                log.pop_front();
            } else {
                break;
            }
        }

        if log.len() >= self.max_calls {
            return false;
        }

        log.push_back(now);
        true
    }

    /// Admit a call according to the configured mode: wait for a slot in
    /// [`RateLimitMode::Block`], or fail with `RateLimitExceeded` in
    /// [`RateLimitMode::Reject`].
    pub async fn acquire(&self) -> Result<()> {
        loop {
            if self.try_admit().await {
                return Ok(());
            }

            // A zero-call window never frees a slot.
            if self.max_calls == 0 {
                return Err(EchoNestError::RateLimitExceeded { calls: 0 });
            }

            match self.mode {
                RateLimitMode::Reject => {
                    let calls = self.recent_calls().await;
                    tracing::debug!(target: "echonest", "rate limit hit, rejecting call");
                    return Err(EchoNestError::RateLimitExceeded { calls });
                }
                RateLimitMode::Block => {
                    tracing::trace!(
                        target: "echonest",
                        "rate limiting: waiting {:?}",
                        self.retry_interval
                    );
                    sleep(self.retry_interval).await;
                }
            }
        }
    }

    /// Number of admitted calls still inside the window.
    pub async fn recent_calls(&self) -> usize {
        let log = self.call_log.lock().await;
        let now = Instant::now();
        log.iter()
            .filter(|t| now.duration_since(**t) < self.window)
            .count()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::echonest_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    #[tokio::test(start_paused = true)]
    async fn test_rate_limiter_refuses_beyond_ceiling() {
        let limiter = RateLimiter::echonest_default();

        let mut admitted = 0;
        for i in 0..121 {
            if limiter.try_admit().await {
                admitted += 1;
            }
            if i % 20 == 0 {
                advance(Duration::from_millis(8)).await;
            }
        }

        assert_eq!(admitted, 120);
        assert!(!limiter.try_admit().await);
        assert_eq!(limiter.recent_calls().await, 120);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limiter_window_slides() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));

        assert!(limiter.try_admit().await);
        advance(Duration::from_secs(30)).await;
        assert!(limiter.try_admit().await);
        assert!(limiter.try_admit().await);
        assert!(!limiter.try_admit().await);

        // First call leaves the window; only one slot frees up.
        advance(Duration::from_secs(30)).await;
        assert!(limiter.try_admit().await);
        assert!(!limiter.try_admit().await);

        advance(Duration::from_secs(30)).await;
        assert!(limiter.try_admit().await);
        assert!(limiter.try_admit().await);
        assert!(!limiter.try_admit().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limiter_blocks_until_slot_frees() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60))
            .retry_interval(Duration::from_millis(250));
        let start = Instant::now();

        limiter.acquire().await.unwrap();
        limiter.acquire().await.unwrap();
        limiter.acquire().await.unwrap();

        let elapsed = start.elapsed();
        assert!(
            elapsed >= Duration::from_secs(60),
            "expected >= 60s, got {:?}",
            elapsed
        );
        assert!(elapsed < Duration::from_secs(61));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limiter_reject_mode_errors() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60)).mode(RateLimitMode::Reject);

        limiter.acquire().await.unwrap();
        let err = limiter.acquire().await.unwrap_err();
        assert!(matches!(err, EchoNestError::RateLimitExceeded { calls: 1 }));
    }

    #[tokio::test]
    async fn test_disabled_limiter_admits_everything() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60)).enabled(false);
        for _ in 0..10 {
            assert!(limiter.try_admit().await);
        }
        assert_eq!(limiter.recent_calls().await, 0);
    }

    #[test]
    fn test_from_config_refuses_zero_calls() {
        let config = RateLimitConfig {
            max_calls: 0,
            ..Default::default()
        };
        let err = RateLimiter::from_config(&config).unwrap_err();
        assert!(matches!(err, EchoNestError::Configuration(_)));

        let unenforced = RateLimitConfig {
            max_calls: 0,
            obey_rate_limit: false,
            ..Default::default()
        };
        assert!(!RateLimiter::from_config(&unenforced).unwrap().is_enabled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_call_limiter_rejects_instead_of_blocking() {
        let limiter = RateLimiter::new(0, Duration::from_secs(60));
        let err = limiter.acquire().await.unwrap_err();
        assert!(matches!(err, EchoNestError::RateLimitExceeded { calls: 0 }));
    }

    #[test]
    fn test_huge_limit_does_not_preallocate() {
        let limiter = RateLimiter::new(usize::MAX, Duration::from_secs(60));
        let capacity = limiter.call_log.try_lock().unwrap().capacity();
        assert!(capacity < 1 << 20, "capacity {capacity}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_clones_share_call_log() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let clone = limiter.clone();
        assert!(limiter.try_admit().await);
        assert!(clone.try_admit().await);
        assert!(!limiter.try_admit().await);

        let independent = RateLimiter::new(2, Duration::from_secs(60));
        assert!(independent.try_admit().await);
    }
}
