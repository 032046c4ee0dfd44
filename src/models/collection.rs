//! The three persisted collections.

use std::fmt;

/// A top-level JSON object, the shape of every persisted collection.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// One of the named persistent mappings backing the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    /// username -> password
    Users,
    /// username -> course -> guess record
    Guesses,
    /// course -> exam type -> actual average
    Results,
}

impl Collection {
    pub const ALL: [Collection; 3] = [Collection::Users, Collection::Guesses, Collection::Results];

    /// File name inside the data directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            Collection::Users => "users.json",
            Collection::Guesses => "guesses.json",
            Collection::Results => "actual_results.json",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Guesses => "guesses",
            Collection::Results => "results",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
