//! Request rate limiting.
//!
//! The limiter is a service constructed once at startup and carried in
//! [`AppState`](crate::state::AppState); handlers never reach a global.
//! Swapping the in-process [`SlidingWindowRateLimiter`] for a shared store
//! only requires another [`RateLimiter`] implementation.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// The request may proceed.
    Allowed,
    /// The request exceeds the limit.
    Limited {
        /// Time until the oldest counted request leaves the window.
        retry_after: Duration,
    },
}

/// Counts requests per client key.
pub trait RateLimiter: Send + Sync {
    /// Records a request from `key` and decides whether it may proceed.
    fn check(&self, key: &str) -> RateLimitDecision;
}

/// Allows `limit` requests per key within any `window`-long interval.
///
/// Keys that went quiet are swept at most once per window, so a check
/// only touches its own key in between sweeps.
#[derive(Debug)]
pub struct SlidingWindowRateLimiter {
    limit: usize,
    window: Duration,
    state: Mutex<Windows>,
}

#[derive(Debug, Default)]
struct Windows {
    hits: HashMap<String, VecDeque<Instant>>,
    last_sweep: Option<Instant>,
}

impl Windows {
    fn sweep_if_due(&mut self, now: Instant, window: Duration) {
        let due = self
            .last_sweep
            .is_none_or(|last| now.saturating_duration_since(last) >= window);
        if !due {
            return;
        }
        self.hits.retain(|_, times| {
            times
                .back()
                .is_some_and(|last| now.saturating_duration_since(*last) < window)
        });
        self.last_sweep = Some(now);
    }
}

impl SlidingWindowRateLimiter {
    /// Creates a limiter.
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            state: Mutex::new(Windows::default()),
        }
    }

    /// Returns the per-key limit.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Returns the window length.
    pub fn window(&self) -> Duration {
        self.window
    }

    fn check_at(&self, key: &str, now: Instant) -> RateLimitDecision {
        let mut state = self.state.lock();
        state.sweep_if_due(now, self.window);

        let times = state.hits.entry(key.to_string()).or_default();
        while times
            .front()
            .is_some_and(|first| now.saturating_duration_since(*first) >= self.window)
        {
            times.pop_front();
        }

        if times.len() >= self.limit {
            let retry_after = times
                .front()
                .map(|first| self.window.saturating_sub(now.saturating_duration_since(*first)))
                .unwrap_or(self.window);
            return RateLimitDecision::Limited {
                retry_after: retry_after.max(Duration::from_secs(1)),
            };
        }

        times.push_back(now);
        RateLimitDecision::Allowed
    }
}

impl Default for SlidingWindowRateLimiter {
    fn default() -> Self {
        Self::new(100, Duration::from_secs(60))
    }
}

impl RateLimiter for SlidingWindowRateLimiter {
    fn check(&self, key: &str) -> RateLimitDecision {
        self.check_at(key, Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_up_to_limit() {
        let limiter = SlidingWindowRateLimiter::new(3, Duration::from_secs(60));
        let now = Instant::now();
        for _ in 0..3 {
            assert_eq!(limiter.check_at("1.2.3.4", now), RateLimitDecision::Allowed);
        }
        assert!(matches!(
            limiter.check_at("1.2.3.4", now),
            RateLimitDecision::Limited { .. }
        ));
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = SlidingWindowRateLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();
        assert_eq!(limiter.check_at("a", now), RateLimitDecision::Allowed);
        assert_eq!(limiter.check_at("b", now), RateLimitDecision::Allowed);
        assert!(matches!(
            limiter.check_at("a", now),
            RateLimitDecision::Limited { .. }
        ));
    }

    #[test]
    fn test_window_slides() {
        let limiter = SlidingWindowRateLimiter::new(2, Duration::from_secs(60));
        let start = Instant::now();
        assert_eq!(limiter.check_at("a", start), RateLimitDecision::Allowed);
        assert_eq!(
            limiter.check_at("a", start + Duration::from_secs(30)),
            RateLimitDecision::Allowed
        );

        match limiter.check_at("a", start + Duration::from_secs(45)) {
            RateLimitDecision::Limited { retry_after } => {
                assert_eq!(retry_after, Duration::from_secs(15));
            }
            other => panic!("expected Limited, got {:?}", other),
        }

        // The first hit has left the window.
        assert_eq!(
            limiter.check_at("a", start + Duration::from_secs(61)),
            RateLimitDecision::Allowed
        );
    }

    #[test]
    fn test_quiet_keys_are_swept_once_per_window() {
        let limiter = SlidingWindowRateLimiter::new(5, Duration::from_secs(60));
        let start = Instant::now();
        let tracked = |limiter: &SlidingWindowRateLimiter| limiter.state.lock().hits.len();

        limiter.check_at("a", start);
        limiter.check_at("b", start + Duration::from_secs(30));
        assert_eq!(tracked(&limiter), 2);

        // A full window after the first sweep: "a" is stale, "b" is not.
        limiter.check_at("c", start + Duration::from_secs(70));
        assert_eq!(tracked(&limiter), 2);
        assert!(!limiter.state.lock().hits.contains_key("a"));

        // "b" is stale now, but the next sweep is not due yet.
        limiter.check_at("d", start + Duration::from_secs(100));
        assert_eq!(tracked(&limiter), 3);

        limiter.check_at("e", start + Duration::from_secs(131));
        assert_eq!(tracked(&limiter), 2);
        assert!(!limiter.state.lock().hits.contains_key("b"));
        assert!(!limiter.state.lock().hits.contains_key("c"));
    }

    #[test]
    fn test_refused_requests_are_not_counted() {
        let limiter = SlidingWindowRateLimiter::new(1, Duration::from_secs(10));
        let start = Instant::now();
        assert_eq!(limiter.check_at("a", start), RateLimitDecision::Allowed);
        for s in 1..5 {
            assert!(matches!(
                limiter.check_at("a", start + Duration::from_secs(s)),
                RateLimitDecision::Limited { .. }
            ));
        }
        assert_eq!(
            limiter.check_at("a", start + Duration::from_secs(10)),
            RateLimitDecision::Allowed
        );
    }
}
