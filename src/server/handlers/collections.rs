//! Read and merge endpoints for the three collections.

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde_json::Value;
use tracing::{error, info};

use super::super::middleware::ClientKey;
use super::super::validation;
use super::super::AppState;
use super::helpers::{object_body, rate_limit, ApiError, ApiMessage};
use crate::models::{Collection, JsonMap};
use crate::rate_limit::RouteKey;

async fn read(state: &AppState, collection: Collection) -> Json<JsonMap> {
    let data = state.store.load(collection).await;
    info!("GET /api/{} - returning {} entries", collection, data.len());
    Json(data)
}

async fn merge(
    state: &AppState,
    collection: Collection,
    data: JsonMap,
) -> Result<Json<ApiMessage>, ApiError> {
    let count = data.len();
    state.store.merge(collection, data).await.map_err(|err| {
        error!("Failed to save {}: {}", collection, err);
        ApiError::Internal(format!("Failed to save {}", collection))
    })?;
    info!("POST /api/{} - merged {} entries", collection, count);
    Ok(ApiMessage::ok(format!("{} updated", capitalize(collection.as_str()))))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub async fn get_users(
    State(state): State<AppState>,
    ClientKey(client): ClientKey,
) -> Result<Json<JsonMap>, ApiError> {
    rate_limit(&state, RouteKey::UsersRead, &client)?;
    Ok(read(&state, Collection::Users).await)
}

pub async fn post_users(
    State(state): State<AppState>,
    ClientKey(client): ClientKey,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ApiMessage>, ApiError> {
    rate_limit(&state, RouteKey::UsersWrite, &client)?;
    let data = object_body(body)?;
    validation::validate_users(&data).map_err(ApiError::BadRequest)?;
    merge(&state, Collection::Users, data).await
}

pub async fn get_guesses(
    State(state): State<AppState>,
    ClientKey(client): ClientKey,
) -> Result<Json<JsonMap>, ApiError> {
    rate_limit(&state, RouteKey::GuessesRead, &client)?;
    Ok(read(&state, Collection::Guesses).await)
}

/// Merge guesses, then refresh the CSV exports in the background.
pub async fn post_guesses(
    State(state): State<AppState>,
    ClientKey(client): ClientKey,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ApiMessage>, ApiError> {
    rate_limit(&state, RouteKey::GuessesWrite, &client)?;
    let data = validation::normalize_guesses(object_body(body)?).map_err(ApiError::BadRequest)?;
    let response = merge(&state, Collection::Guesses, data).await?;
    state.spawn_export();
    Ok(response)
}

pub async fn get_results(
    State(state): State<AppState>,
    ClientKey(client): ClientKey,
) -> Result<Json<JsonMap>, ApiError> {
    rate_limit(&state, RouteKey::ResultsRead, &client)?;
    Ok(read(&state, Collection::Results).await)
}

/// Merge actual averages, then refresh the CSV exports in the background.
pub async fn post_results(
    State(state): State<AppState>,
    ClientKey(client): ClientKey,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ApiMessage>, ApiError> {
    rate_limit(&state, RouteKey::ResultsWrite, &client)?;
    let data = validation::normalize_results(object_body(body)?).map_err(ApiError::BadRequest)?;
    let response = merge(&state, Collection::Results, data).await?;
    state.spawn_export();
    Ok(response)
}
