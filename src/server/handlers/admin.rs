//! Backup, export and destructive maintenance endpoints.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};
use serde_json::Value;
use tracing::error;

use super::super::middleware::ClientKey;
use super::super::validation;
use super::super::AppState;
use super::helpers::{object_body, rate_limit, require_admin, ApiError, ApiMessage};
use crate::models::Collection;
use crate::rate_limit::RouteKey;
use crate::services::{competition, CompetitionError, RestoreSet};

fn internal(action: &str, err: CompetitionError) -> ApiError {
    error!("{} failed: {}", action, err);
    ApiError::Internal(format!("{} failed: {}", action, err))
}

/// Start a snapshot in the background.
pub async fn backup(
    State(state): State<AppState>,
    ClientKey(client): ClientKey,
) -> Result<Json<ApiMessage>, ApiError> {
    rate_limit(&state, RouteKey::Backup, &client)?;
    state.spawn_backup();
    Ok(ApiMessage::ok("Backup creation started"))
}

/// Start a CSV export in the background.
pub async fn export_csv(
    State(state): State<AppState>,
    ClientKey(client): ClientKey,
) -> Result<Json<ApiMessage>, ApiError> {
    rate_limit(&state, RouteKey::ExportCsv, &client)?;
    state.spawn_export();
    Ok(ApiMessage::ok("CSV export started"))
}

pub async fn clear_all(
    State(state): State<AppState>,
    ClientKey(client): ClientKey,
    headers: HeaderMap,
) -> Result<Json<ApiMessage>, ApiError> {
    rate_limit(&state, RouteKey::ClearAll, &client)?;
    require_admin(&state, &headers)?;
    competition::clear_all(&state.store, &state.backups)
        .await
        .map_err(|e| internal("Clear all", e))?;
    Ok(ApiMessage::ok("All data cleared"))
}

/// Wipe guesses and results but keep every registered user.
pub async fn restart_competition(
    State(state): State<AppState>,
    ClientKey(client): ClientKey,
    headers: HeaderMap,
) -> Result<Json<ApiMessage>, ApiError> {
    rate_limit(&state, RouteKey::RestartCompetition, &client)?;
    require_admin(&state, &headers)?;
    competition::restart_competition(&state.store, &state.backups)
        .await
        .map_err(|e| internal("Restart", e))?;
    Ok(ApiMessage::ok("Competition restarted"))
}

/// Replace collections wholesale from a snapshot-shaped body.
pub async fn restore(
    State(state): State<AppState>,
    ClientKey(client): ClientKey,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ApiMessage>, ApiError> {
    rate_limit(&state, RouteKey::Restore, &client)?;
    require_admin(&state, &headers)?;

    let body = object_body(body)?;
    let mut set: RestoreSet = serde_json::from_value(Value::Object(body))
        .map_err(|_| ApiError::BadRequest("Backup collections must be JSON objects".to_string()))?;
    if set.is_empty() {
        return Err(ApiError::BadRequest("No backup data provided".to_string()));
    }
    if let Some(users) = &set.users {
        validation::validate_users(users).map_err(ApiError::BadRequest)?;
    }
    if let Some(guesses) = set.guesses.take() {
        set.guesses = Some(validation::normalize_guesses(guesses).map_err(ApiError::BadRequest)?);
    }
    if let Some(results) = set.actual_results.take() {
        set.actual_results =
            Some(validation::normalize_results(results).map_err(ApiError::BadRequest)?);
    }

    let restored = competition::restore(&state.store, &state.backups, &set)
        .await
        .map_err(|e| internal("Restore", e))?;
    if restored.iter().any(|c| *c != Collection::Users) {
        state.spawn_export();
    }

    let names: Vec<_> = restored.iter().map(Collection::as_str).collect();
    Ok(ApiMessage::ok(format!("Restored {}", names.join(", "))))
}
