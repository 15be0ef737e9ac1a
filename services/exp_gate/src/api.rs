use crate::error::AppError;
use crate::AppState;
use axum::{extract::State, Json};
use exp_adapter::{Container, ExperienceError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct LoadReq {
    pub slot: String,
    #[serde(default)]
    pub params: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct LoadRes {
    pub callback_id: String,
    pub payload: Value,
}

/// Issue a content request and hold the connection open until the service
/// resolves it or the resolve window closes.
pub async fn load(
    State(state): State<AppState>,
    Json(req): Json<LoadReq>,
) -> Result<Json<LoadRes>, AppError> {
    if req.slot.trim().is_empty() {
        return Err(AppError::bad_request("slot cannot be empty"));
    }
    let handle = state
        .experience
        .load(&req.slot, &req.params)
        .await
        .map_err(|e| AppError::bad_gateway(e.to_string()))?;
    let callback_id = handle.callback_id().to_string();
    debug!(slot = %req.slot, callback_id = %callback_id, "load issued");

    match handle.wait().await {
        Ok(payload) => Ok(Json(LoadRes {
            callback_id,
            payload,
        })),
        Err(ExperienceError::Timeout { timeout_ms, .. }) => Err(AppError::resolve_timeout(
            format!("no resolve within {timeout_ms}ms"),
        )),
        Err(err) => Err(AppError::bad_gateway(err.to_string())),
    }
}

#[derive(Debug, Deserialize)]
pub struct ResolveReq {
    pub callback_id: String,
    pub payload: Value,
}

/// Inbound entry point for the personalization service: deliver the result
/// payload for an outstanding callback id.
pub async fn resolve(
    State(state): State<AppState>,
    Json(req): Json<ResolveReq>,
) -> Result<Json<Value>, AppError> {
    match state.experience.resolve(&req.callback_id, req.payload) {
        Ok(()) => Ok(Json(json!({"resolved": true}))),
        Err(ExperienceError::UnknownCallback { callback_id }) => {
            Err(AppError::unknown_callback(&callback_id))
        }
        Err(err) => Err(AppError::internal(err.to_string())),
    }
}

/// Containers created so far.
pub async fn slots(State(state): State<AppState>) -> Json<Vec<Container>> {
    Json(state.experience.containers().await)
}

/// Count of requests awaiting resolution.
pub async fn pending(State(state): State<AppState>) -> Json<Value> {
    Json(json!({"pending": state.experience.pending_len()}))
}
