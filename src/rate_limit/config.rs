//! Per-route rate limit budgets.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Every rate-limited route. Each one keeps its own independent counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteKey {
    UsersRead,
    UsersWrite,
    GuessesRead,
    GuessesWrite,
    ResultsRead,
    ResultsWrite,
    Backup,
    ExportCsv,
    ClearAll,
    RestartCompetition,
    Restore,
    Stats,
    SystemInfo,
    Leaderboard,
}

impl RouteKey {
    pub const ALL: [RouteKey; 14] = [
        RouteKey::UsersRead,
        RouteKey::UsersWrite,
        RouteKey::GuessesRead,
        RouteKey::GuessesWrite,
        RouteKey::ResultsRead,
        RouteKey::ResultsWrite,
        RouteKey::Backup,
        RouteKey::ExportCsv,
        RouteKey::ClearAll,
        RouteKey::RestartCompetition,
        RouteKey::Restore,
        RouteKey::Stats,
        RouteKey::SystemInfo,
        RouteKey::Leaderboard,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RouteKey::UsersRead => "users_read",
            RouteKey::UsersWrite => "users_write",
            RouteKey::GuessesRead => "guesses_read",
            RouteKey::GuessesWrite => "guesses_write",
            RouteKey::ResultsRead => "results_read",
            RouteKey::ResultsWrite => "results_write",
            RouteKey::Backup => "backup",
            RouteKey::ExportCsv => "export_csv",
            RouteKey::ClearAll => "clear_all",
            RouteKey::RestartCompetition => "restart_competition",
            RouteKey::Restore => "restore",
            RouteKey::Stats => "stats",
            RouteKey::SystemInfo => "system_info",
            RouteKey::Leaderboard => "leaderboard",
        }
    }

    /// Budget used when the configuration does not override this route.
    pub fn default_limit(&self) -> RouteLimit {
        match self {
            RouteKey::UsersRead | RouteKey::UsersWrite => RouteLimit::new(50, 60),
            RouteKey::GuessesRead | RouteKey::GuessesWrite => RouteLimit::new(100, 60),
            RouteKey::ResultsRead | RouteKey::ResultsWrite => RouteLimit::new(50, 60),
            RouteKey::Backup | RouteKey::ExportCsv => RouteLimit::new(5, 300),
            RouteKey::ClearAll => RouteLimit::new(2, 3600),
            RouteKey::RestartCompetition => RouteLimit::new(5, 3600),
            RouteKey::Restore => RouteLimit::new(2, 3600),
            RouteKey::Stats | RouteKey::Leaderboard => RouteLimit::new(60, 60),
            RouteKey::SystemInfo => RouteLimit::new(10, 60),
        }
    }
}

impl FromStr for RouteKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RouteKey::ALL
            .iter()
            .find(|r| r.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown route: {}", s))
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maximum number of requests accepted per client inside a sliding window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteLimit {
    pub max_requests: usize,
    pub window_secs: u64,
}

impl RouteLimit {
    pub const fn new(max_requests: usize, window_secs: u64) -> Self {
        Self {
            max_requests,
            window_secs,
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_names_round_trip() {
        for route in RouteKey::ALL {
            assert_eq!(route.as_str().parse::<RouteKey>().unwrap(), route);
        }
        assert!("nope".parse::<RouteKey>().is_err());
    }
}
