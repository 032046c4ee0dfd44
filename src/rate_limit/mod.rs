//! Per-route, per-client request rate limiting.
//!
//! Each route owns an independent sliding window keyed by client IP.
//! State lives in memory only; a restart resets every counter. Idle client
//! keys are dropped by `RateLimiter::sweep`, which the server runs
//! periodically.

mod config;
mod window;

pub use config::{RouteKey, RouteLimit};
pub use window::{Rejected, SlidingWindow};

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("Rate limit exceeded for {route}: max {max_requests} requests per {window_secs}s")]
    Exceeded {
        route: RouteKey,
        max_requests: usize,
        window_secs: u64,
        retry_after: Duration,
    },
}

/// Rate limiter covering every route in `RouteKey::ALL`.
pub struct RateLimiter {
    routes: HashMap<RouteKey, Mutex<SlidingWindow>>,
}

impl RateLimiter {
    /// Build a limiter with default budgets, replaced by any `overrides`.
    pub fn new(overrides: &HashMap<RouteKey, RouteLimit>) -> Self {
        let routes = RouteKey::ALL
            .iter()
            .map(|route| {
                let limit = overrides
                    .get(route)
                    .copied()
                    .unwrap_or_else(|| route.default_limit());
                (*route, Mutex::new(SlidingWindow::new(limit)))
            })
            .collect();
        Self { routes }
    }

    pub fn with_defaults() -> Self {
        Self::new(&HashMap::new())
    }

    pub fn limit(&self, route: RouteKey) -> RouteLimit {
        self.routes
            .get(&route)
            .map(|w| lock(w).limit())
            .unwrap_or_else(|| route.default_limit())
    }

    /// Record a request from `client` on `route`, or reject it.
    pub fn check(&self, route: RouteKey, client: &str) -> Result<(), RateLimitError> {
        self.check_at(route, client, Instant::now())
    }

    pub fn check_at(
        &self,
        route: RouteKey,
        client: &str,
        now: Instant,
    ) -> Result<(), RateLimitError> {
        let Some(window) = self.routes.get(&route) else {
            return Ok(());
        };
        let mut window = lock(window);
        window.check(client, now).map_err(|rejected| {
            let limit = window.limit();
            warn!("Rate limit exceeded for {} on {}", client, route);
            RateLimitError::Exceeded {
                route,
                max_requests: limit.max_requests,
                window_secs: limit.window_secs,
                retry_after: rejected.retry_after,
            }
        })
    }

    /// Evict idle client keys from every route. Returns the number removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        let removed: usize = self
            .routes
            .values()
            .map(|window| lock(window).evict_idle(now))
            .sum();
        if removed > 0 {
            debug!("Evicted {} idle rate limit entries", removed);
        }
        removed
    }

    /// Total client keys tracked across all routes.
    pub fn tracked_clients(&self) -> usize {
        self.routes
            .values()
            .map(|window| lock(window).tracked_clients())
            .sum()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn lock(window: &Mutex<SlidingWindow>) -> std::sync::MutexGuard<'_, SlidingWindow> {
    window.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Parse Retry-After header value (seconds).
/// Returns duration to wait, or None if header is missing/invalid.
pub fn parse_retry_after(header_value: Option<&str>) -> Option<Duration> {
    let value = header_value?;
    value
        .parse::<u64>()
        .ok()
        .map(|secs| Duration::from_secs(secs.min(60)))
}

/// Calculate exponential backoff delay for a given attempt.
pub fn backoff_delay(attempt: u32, base_ms: u64) -> Duration {
    let delay_ms = base_ms.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(delay_ms.min(60_000))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_per_minute() {
        let mut overrides = HashMap::new();
        overrides.insert(RouteKey::Stats, RouteLimit::new(3, 60));
        let limiter = RateLimiter::new(&overrides);
        let start = Instant::now();

        for _ in 0..3 {
            assert!(limiter.check_at(RouteKey::Stats, "10.0.0.1", start).is_ok());
        }
        let err = limiter
            .check_at(RouteKey::Stats, "10.0.0.1", start + Duration::from_secs(1))
            .unwrap_err();
        let RateLimitError::Exceeded {
            max_requests,
            window_secs,
            ..
        } = err;
        assert_eq!((max_requests, window_secs), (3, 60));

        assert!(limiter
            .check_at(RouteKey::Stats, "10.0.0.1", start + Duration::from_secs(61))
            .is_ok());
    }

    #[test]
    fn test_routes_do_not_share_state() {
        let mut overrides = HashMap::new();
        overrides.insert(RouteKey::UsersRead, RouteLimit::new(1, 60));
        overrides.insert(RouteKey::UsersWrite, RouteLimit::new(1, 60));
        let limiter = RateLimiter::new(&overrides);
        let now = Instant::now();

        assert!(limiter.check_at(RouteKey::UsersRead, "ip", now).is_ok());
        assert!(limiter.check_at(RouteKey::UsersRead, "ip", now).is_err());
        assert!(limiter.check_at(RouteKey::UsersWrite, "ip", now).is_ok());
    }

    #[test]
    fn test_defaults_and_overrides() {
        let mut overrides = HashMap::new();
        overrides.insert(RouteKey::Backup, RouteLimit::new(1, 10));
        let limiter = RateLimiter::new(&overrides);

        assert_eq!(limiter.limit(RouteKey::Backup), RouteLimit::new(1, 10));
        assert_eq!(limiter.limit(RouteKey::ClearAll), RouteLimit::new(2, 3600));
        assert_eq!(limiter.limit(RouteKey::GuessesWrite), RouteLimit::new(100, 60));
    }

    #[test]
    fn test_sweep_removes_idle_clients() {
        let limiter = RateLimiter::with_defaults();
        let start = Instant::now();

        limiter.check_at(RouteKey::Stats, "a", start).unwrap();
        limiter.check_at(RouteKey::SystemInfo, "b", start).unwrap();
        assert_eq!(limiter.tracked_clients(), 2);

        assert_eq!(limiter.sweep_at(start + Duration::from_secs(30)), 0);
        assert_eq!(limiter.sweep_at(start + Duration::from_secs(61)), 2);
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[test]
    fn test_backoff_delay() {
        assert_eq!(backoff_delay(0, 500), Duration::from_millis(500));
        assert_eq!(backoff_delay(2, 500), Duration::from_millis(2000));
        assert_eq!(backoff_delay(30, 500), Duration::from_secs(60));
    }

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after(Some("5")), Some(Duration::from_secs(5)));
        assert_eq!(parse_retry_after(Some("600")), Some(Duration::from_secs(60)));
        assert_eq!(parse_retry_after(Some("soon")), None);
        assert_eq!(parse_retry_after(None), None);
    }
}
