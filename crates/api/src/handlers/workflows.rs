use axum::{
    extract::{Path, State},
    Json,
};
use engine::Workflow;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{ApiError, AppState};

pub async fn get(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Workflow>, ApiError> {
    Ok(Json(state.engine.get_workflow(id).await?))
}

/// Check a stored workflow against the currently registered providers.
pub async fn validate(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    let workflow = state.engine.get_workflow(id).await?;
    state.engine.validate_workflow(&workflow)?;
    Ok(Json(json!({ "valid": true })))
}
