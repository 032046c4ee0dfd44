//! Sliding-window request counter for a single route.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use super::config::RouteLimit;

/// Request timestamps per client key for one route.
#[derive(Debug)]
pub struct SlidingWindow {
    limit: RouteLimit,
    clients: HashMap<String, VecDeque<Instant>>,
}

/// Outcome of a rejected request: how long until the oldest request in the
/// window expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rejected {
    pub retry_after: Duration,
}

impl SlidingWindow {
    pub fn new(limit: RouteLimit) -> Self {
        Self {
            limit,
            clients: HashMap::new(),
        }
    }

    pub fn limit(&self) -> RouteLimit {
        self.limit
    }

    /// Prune expired timestamps for `key`, then either record `now` or reject.
    pub fn check(&mut self, key: &str, now: Instant) -> Result<(), Rejected> {
        let window = self.limit.window();
        let requests = self.clients.entry(key.to_string()).or_default();

        while let Some(oldest) = requests.front() {
            if now.saturating_duration_since(*oldest) >= window {
                requests.pop_front();
            } else {
                break;
            }
        }

        if requests.len() >= self.limit.max_requests {
            let retry_after = requests
                .front()
                .map(|oldest| window.saturating_sub(now.saturating_duration_since(*oldest)))
                .unwrap_or(window);
            return Err(Rejected { retry_after });
        }

        requests.push_back(now);
        Ok(())
    }

    /// Drop clients with no request inside the window. Returns how many were
    /// removed.
    pub fn evict_idle(&mut self, now: Instant) -> usize {
        let window = self.limit.window();
        let before = self.clients.len();
        self.clients.retain(|_, requests| {
            requests
                .back()
                .is_some_and(|newest| now.saturating_duration_since(*newest) < window)
        });
        before - self.clients.len()
    }

    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_up_to_max_then_rejects() {
        let mut window = SlidingWindow::new(RouteLimit::new(3, 60));
        let start = Instant::now();

        for i in 0..3 {
            assert!(window.check("1.2.3.4", start + Duration::from_secs(i)).is_ok());
        }
        let rejected = window
            .check("1.2.3.4", start + Duration::from_secs(10))
            .unwrap_err();
        assert_eq!(rejected.retry_after, Duration::from_secs(50));
    }

    #[test]
    fn test_window_elapses() {
        let mut window = SlidingWindow::new(RouteLimit::new(3, 60));
        let start = Instant::now();

        for _ in 0..3 {
            window.check("1.2.3.4", start).unwrap();
        }
        assert!(window.check("1.2.3.4", start + Duration::from_secs(59)).is_err());
        assert!(window.check("1.2.3.4", start + Duration::from_secs(60)).is_ok());
    }

    #[test]
    fn test_clients_are_independent() {
        let mut window = SlidingWindow::new(RouteLimit::new(1, 60));
        let now = Instant::now();

        assert!(window.check("a", now).is_ok());
        assert!(window.check("a", now).is_err());
        assert!(window.check("b", now).is_ok());
    }

    #[test]
    fn test_rejected_request_is_not_recorded() {
        let mut window = SlidingWindow::new(RouteLimit::new(1, 10));
        let start = Instant::now();

        window.check("a", start).unwrap();
        // Rejections inside the window must not extend it.
        assert!(window.check("a", start + Duration::from_secs(5)).is_err());
        assert!(window.check("a", start + Duration::from_secs(10)).is_ok());
    }

    #[test]
    fn test_evict_idle() {
        let mut window = SlidingWindow::new(RouteLimit::new(5, 60));
        let start = Instant::now();

        window.check("old", start).unwrap();
        window.check("recent", start + Duration::from_secs(50)).unwrap();

        let removed = window.evict_idle(start + Duration::from_secs(70));
        assert_eq!(removed, 1);
        assert_eq!(window.tracked_clients(), 1);
    }
}
