use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use engine::WorkflowExecution;
use uuid::Uuid;

use super::{ApiError, AppState};

/// Start a workflow manually. The request body is the raw trigger payload;
/// an empty body counts as `{}`.
pub async fn execute(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    body: String,
) -> Result<(StatusCode, Json<WorkflowExecution>), ApiError> {
    let payload = if body.trim().is_empty() { "{}".to_owned() } else { body };
    let execution = state.engine.execute_workflow(id, payload).await?;
    Ok((StatusCode::ACCEPTED, Json(execution)))
}

/// Poll an execution's status and action history.
pub async fn get(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<WorkflowExecution>, ApiError> {
    Ok(Json(state.engine.get_execution(id).await?))
}
