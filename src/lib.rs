//! BitBets: guess-the-class-average game backend.
//!
//! Players register, guess the class average for each course's midsem and
//! compre exams, and are ranked against the actual averages once they are
//! recorded. State lives in three JSON files under a data directory, with
//! timestamped snapshots and CSV reports written alongside.

pub mod cli;
pub mod client;
pub mod config;
pub mod models;
pub mod rate_limit;
pub mod server;
pub mod services;
pub mod storage;
pub mod store;
pub mod utils;
