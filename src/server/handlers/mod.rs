//! HTTP request handlers for the API server.

mod admin;
mod api;
mod collections;
mod helpers;

// Re-export handlers for use by the router
pub use admin::{backup, clear_all, export_csv, restart_competition, restore};
pub use api::{api_leaderboard, health, not_found, root, stats, system_info, Stats};
pub use collections::{get_guesses, get_results, get_users, post_guesses, post_results, post_users};
pub use helpers::{ApiError, ApiMessage, ADMIN_TOKEN_HEADER};
