//! `api` crate — thin HTTP layer over the engine.
//!
//! Exposes:
//!   GET    /api/v1/workflows/:id
//!   POST   /api/v1/workflows/:id/validate
//!   POST   /api/v1/workflows/:id/execute
//!   GET    /api/v1/executions/:id
//!   POST   /api/v1/webhooks/:workflow_id

pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use engine::Engine;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

pub use handlers::AppState;

pub fn router(engine: Arc<Engine>) -> Router {
    use handlers::{executions, webhooks, workflows};

    Router::new()
        .route("/api/v1/workflows/:id", get(workflows::get))
        .route("/api/v1/workflows/:id/validate", post(workflows::validate))
        .route("/api/v1/workflows/:id/execute", post(executions::execute))
        .route("/api/v1/executions/:id", get(executions::get))
        .route("/api/v1/webhooks/:workflow_id", post(webhooks::handle_webhook))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState { engine })
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(addr: &str, engine: Arc<Engine>) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router(engine)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use engine::store::MemoryStore;
    use engine::{EngineConfig, Workflow};
    use providers::mock::{MockBehaviour, MockProvider};
    use providers::{ConfigSchema, Connection, DataMap};
    use serde_json::Value;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn setup() -> (Router, Arc<MemoryStore>, Workflow) {
        let store = Arc::new(MemoryStore::new());
        let engine = Arc::new(Engine::with_store(store.clone(), EngineConfig::default()));
        engine.register_service_provider(Arc::new(
            MockProvider::new("jira").with_trigger("issue_created", ConfigSchema::empty()),
        ));
        engine.register_service_provider(Arc::new(
            MockProvider::new("slack").with_action("post_message", MockBehaviour::Echo),
        ));

        let user = Uuid::new_v4();
        store.insert_connection(Connection::active(user, "slack", DataMap::new()));
        let wf = Workflow::new(user, "alerts", "jira", "issue_created")
            .with_action("slack", "post_message", Value::Null);
        store.insert_workflow(wf.clone());

        (router(engine), store, wf)
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn execute_returns_accepted_running_execution() {
        let (app, store, wf) = setup();

        let response = app
            .oneshot(
                Request::post(format!("/api/v1/workflows/{}/execute", wf.id))
                    .body(Body::from(r#"{"summary":"x"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = json_body(response).await;
        assert_eq!(body["status"], "running");
        assert_eq!(body["trigger_payload"], r#"{"summary":"x"}"#);
        assert_eq!(store.execution_count(wf.id), 1);
    }

    #[tokio::test]
    async fn unknown_workflow_is_404() {
        let (app, _, _) = setup();

        let response = app
            .oneshot(
                Request::post(format!("/api/v1/webhooks/{}", Uuid::new_v4()))
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(json_body(response).await["error"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn unknown_execution_is_404() {
        let (app, _, _) = setup();

        let response = app
            .oneshot(
                Request::get(format!("/api/v1/executions/{}", Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_workflow_is_unprocessable() {
        let (app, store, wf) = setup();
        let broken = wf.with_action("slack", "delete_channel", Value::Null);
        store.insert_workflow(broken.clone());

        let response = app
            .oneshot(
                Request::post(format!("/api/v1/workflows/{}/validate", broken.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(json_body(response).await["error"]
            .as_str()
            .unwrap()
            .contains("delete_channel"));
        assert_eq!(store.execution_count(broken.id), 0);
    }
}
