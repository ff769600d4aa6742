//! Request handlers. Each one decodes the request and calls the engine.

pub mod executions;
pub mod webhooks;
pub mod workflows;

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use engine::{Engine, EngineError, ErrorKind};
use serde_json::json;
use tracing::error;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

/// An engine error rendered as a JSON response.
pub struct ApiError(pub EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::InvalidConfig
            | ErrorKind::UnknownTransformer
            | ErrorKind::TransformFailed
            | ErrorKind::InvalidPayload => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::ConnectionUnavailable | ErrorKind::ActionExecutionFailed => {
                StatusCode::BAD_GATEWAY
            }
            ErrorKind::PersistenceFailed => {
                error!("request failed: {}", self.0);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
