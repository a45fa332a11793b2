//! /health 핸들러

use std::sync::Arc;

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::error::{HubError, Result};
use crate::state::AppState;

/// 저장소 연결까지 확인
pub async fn health_check(State(state): State<Arc<AppState>>) -> Result<Json<Value>> {
    state.store.ping().await.map_err(|e| {
        tracing::warn!("Health check failed: {}", e);
        HubError::Unavailable {
            message: "store unreachable".to_string(),
        }
    })?;
    Ok(Json(json!({ "status": "ok" })))
}
