use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use super::{ApiError, AppState};

/// Inbound webhook for a workflow. The body is forwarded untouched as the
/// trigger payload.
pub async fn handle_webhook(
    Path(workflow_id): Path<Uuid>,
    State(state): State<AppState>,
    body: String,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let execution = state.engine.execute_workflow(workflow_id, body).await?;
    info!(execution_id = %execution.id, "webhook accepted for workflow {workflow_id}");

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "message": "webhook accepted", "execution_id": execution.id })),
    ))
}
