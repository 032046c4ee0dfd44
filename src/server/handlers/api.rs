//! Read-only API endpoints: service info, diagnostics, stats and scoring.

use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};

use super::super::middleware::ClientKey;
use super::super::AppState;
use super::helpers::{rate_limit, ApiError};
use crate::models::{parse_guesses, parse_results, Collection};
use crate::rate_limit::RouteKey;
use crate::services::{leaderboard, CompetitionStats, ExamStanding};
use crate::utils::{disk_usage, resident_memory_bytes, round_gb};

const ENDPOINTS: &[&str] = &[
    "GET/POST /api/users",
    "GET/POST /api/guesses",
    "GET/POST /api/results",
    "GET /health",
    "GET /api/stats",
    "GET /api/leaderboard",
    "GET /api/system-info",
    "POST /api/backup",
    "POST /api/export-csv",
    "POST /api/clear-all",
    "POST /api/restart-competition",
    "POST /api/restore",
];

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "BitBets API Server is running!",
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": ENDPOINTS,
    }))
}

fn cache_counts(state: &AppState) -> [(Collection, usize); 3] {
    Collection::ALL.map(|c| (c, state.store.cached_len(c)))
}

/// Health check: file presence, cache sizes and disk space.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let data_dir = state.store.data_dir();
    let files_exist: serde_json::Map<_, _> = Collection::ALL
        .iter()
        .map(|c| (c.as_str().to_string(), Value::Bool(state.store.exists(*c))))
        .collect();
    let cache_status: serde_json::Map<_, _> = cache_counts(&state)
        .iter()
        .map(|(c, n)| (format!("{}_cached", c), json!(n)))
        .collect();

    let disk = match disk_usage(data_dir) {
        Ok(usage) => json!({
            "free_gb": round_gb(usage.free_bytes),
            "total_gb": round_gb(usage.total_bytes),
        }),
        Err(err) => {
            tracing::debug!("Disk usage unavailable: {}", err);
            json!({ "error": "Cannot check disk usage" })
        }
    };

    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "data_directory": data_dir.display().to_string(),
        "files_exist": files_exist,
        "disk_usage": disk,
        "cache_status": cache_status,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Collection counts plus server uptime.
#[derive(Debug, Serialize)]
pub struct Stats {
    #[serde(flatten)]
    pub counts: CompetitionStats,
    pub server_uptime: u64,
    pub last_updated: String,
}

pub async fn stats(
    State(state): State<AppState>,
    ClientKey(client): ClientKey,
) -> Result<Json<Stats>, ApiError> {
    rate_limit(&state, RouteKey::Stats, &client)?;

    Ok(Json(Stats {
        counts: CompetitionStats::load(&state.store).await,
        server_uptime: state.started_at.elapsed().as_secs(),
        last_updated: Utc::now().to_rfc3339(),
    }))
}

/// Process and cache figures.
pub async fn system_info(
    State(state): State<AppState>,
    ClientKey(client): ClientKey,
) -> Result<Json<Value>, ApiError> {
    rate_limit(&state, RouteKey::SystemInfo, &client)?;

    let cache_size: serde_json::Map<_, _> = cache_counts(&state)
        .iter()
        .map(|(c, n)| (c.as_str().to_string(), json!(n)))
        .collect();
    let memory_mb = resident_memory_bytes()
        .map(|bytes| (bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0);

    Ok(Json(json!({
        "process": {
            "pid": std::process::id(),
            "uptime_seconds": state.started_at.elapsed().as_secs(),
            "memory_mb": memory_mb,
        },
        "cache_size": cache_size,
        "rate_limiter": {
            "tracked_clients": state.rate_limiter.tracked_clients(),
        },
        "version": env!("CARGO_PKG_VERSION"),
        "platform": std::env::consts::OS,
        "arch": std::env::consts::ARCH,
    })))
}

/// Ranked standings for every course and exam with a recorded average.
pub async fn api_leaderboard(
    State(state): State<AppState>,
    ClientKey(client): ClientKey,
) -> Result<Json<Vec<ExamStanding>>, ApiError> {
    rate_limit(&state, RouteKey::Leaderboard, &client)?;

    let guesses = parse_guesses(&state.store.load(Collection::Guesses).await);
    let results = parse_results(&state.store.load(Collection::Results).await);
    Ok(Json(leaderboard(
        &guesses,
        &results,
        state.settings.winner_threshold,
    )))
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
