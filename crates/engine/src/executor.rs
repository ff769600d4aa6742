//! Workflow execution engine.
//!
//! `Engine` is the central orchestrator:
//! 1. Loads the workflow and validates it against the registered providers.
//! 2. Durably records a `running` execution and hands it back to the caller.
//! 3. Runs the action pipeline on a background task: map data, resolve a
//!    connection, invoke the provider, record the step.
//! 4. Finalizes the execution as `completed` or `failed`.
//!
//! Anything that goes wrong after step 2 is captured on the execution record,
//! never returned to the caller.

use std::sync::Arc;
use std::time::Duration;

use providers::ServiceProvider;
use serde_json::Value;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, info_span, instrument, warn, Instrument};
use uuid::Uuid;

use crate::mapper::DataMapper;
use crate::models::{Action, DataMap, ExecutionStatus, Workflow, WorkflowExecution, WorkflowStatus};
use crate::registry::ProviderRegistry;
use crate::resolver::ConnectionResolver;
use crate::store::{ConnectionStore, ExecutionStore, WorkflowStore};
use crate::transform::TransformerRegistry;
use crate::validator::validate_workflow;
use crate::EngineError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tuning knobs for the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Deadline for a single provider action call.
    pub action_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            action_timeout: Duration::from_secs(60),
        }
    }
}

// ---------------------------------------------------------------------------
// Execution handle
// ---------------------------------------------------------------------------

/// A started execution and the background task running its pipeline.
///
/// Dropping the handle detaches the task; the pipeline keeps running.
pub struct ExecutionHandle {
    /// The execution as recorded when the pipeline was started.
    pub execution: WorkflowExecution,
    task: JoinHandle<ExecutionStatus>,
}

impl ExecutionHandle {
    pub fn id(&self) -> Uuid {
        self.execution.id
    }

    /// Wait for the pipeline to finish and return its terminal status.
    pub async fn wait(self) -> Result<ExecutionStatus, EngineError> {
        self.task
            .await
            .map_err(|e| EngineError::TaskFailed(e.to_string()))
    }

    /// Let the pipeline run on without an observer.
    pub fn detach(self) -> WorkflowExecution {
        self.execution
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Owns the provider and transformer registries and the storage handles.
///
/// Construct once at startup, wrap in an `Arc`, and share with every caller.
pub struct Engine {
    providers: ProviderRegistry,
    transformers: TransformerRegistry,
    mapper: DataMapper,
    resolver: ConnectionResolver,
    workflows: Arc<dyn WorkflowStore>,
    executions: Arc<dyn ExecutionStore>,
    config: EngineConfig,
}

impl Engine {
    /// Create an engine with the built-in transformers and no providers.
    pub fn new(
        workflows: Arc<dyn WorkflowStore>,
        executions: Arc<dyn ExecutionStore>,
        connections: Arc<dyn ConnectionStore>,
        config: EngineConfig,
    ) -> Self {
        let transformers = TransformerRegistry::with_builtins();
        Self {
            providers: ProviderRegistry::new(),
            mapper: DataMapper::new(transformers.clone()),
            transformers,
            resolver: ConnectionResolver::new(connections),
            workflows,
            executions,
            config,
        }
    }

    /// Create an engine backed by one store implementing every storage trait.
    pub fn with_store<S>(store: Arc<S>, config: EngineConfig) -> Self
    where
        S: WorkflowStore + ExecutionStore + ConnectionStore + 'static,
    {
        Self::new(store.clone(), store.clone(), store, config)
    }

    pub fn register_service_provider(&self, provider: Arc<dyn ServiceProvider>) {
        self.providers.register(provider);
    }

    pub fn register_transformer<F>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.transformers.register(name, f);
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    pub async fn get_workflow(&self, id: Uuid) -> Result<Workflow, EngineError> {
        self.workflows.load_workflow(id).await.map_err(|e| match e {
            db::DbError::NotFound => EngineError::WorkflowNotFound(id),
            other => other.into(),
        })
    }

    pub fn validate_workflow(&self, workflow: &Workflow) -> Result<(), EngineError> {
        validate_workflow(workflow, &self.providers, &self.transformers)
    }

    pub async fn get_execution(&self, id: Uuid) -> Result<WorkflowExecution, EngineError> {
        self.executions.get_execution(id).await.map_err(|e| match e {
            db::DbError::NotFound => EngineError::ExecutionNotFound(id),
            other => other.into(),
        })
    }

    /// Start a run of `workflow_id` and return as soon as it is recorded.
    ///
    /// # Errors
    /// Lookup and validation failures are returned here and never create an
    /// execution record. Pipeline failures are only visible on the record.
    pub async fn execute_workflow(
        self: &Arc<Self>,
        workflow_id: Uuid,
        trigger_payload: impl Into<String>,
    ) -> Result<WorkflowExecution, EngineError> {
        Ok(self.start_workflow(workflow_id, trigger_payload).await?.detach())
    }

    /// Like [`Engine::execute_workflow`], but keeps the pipeline task handle.
    #[instrument(skip(self, trigger_payload))]
    pub async fn start_workflow(
        self: &Arc<Self>,
        workflow_id: Uuid,
        trigger_payload: impl Into<String>,
    ) -> Result<ExecutionHandle, EngineError> {
        let workflow = self.get_workflow(workflow_id).await?;
        if workflow.status != WorkflowStatus::Active {
            return Err(EngineError::WorkflowInactive {
                id: workflow.id,
                status: workflow.status,
            });
        }
        self.validate_workflow(&workflow)?;

        let trigger_payload = trigger_payload.into();
        let execution = self
            .executions
            .create_execution(workflow.id, &trigger_payload)
            .await?;
        info!(
            execution_id = %execution.id,
            "execution recorded, running {} actions",
            workflow.actions.len()
        );

        let engine = Arc::clone(self);
        let span = info_span!("pipeline", workflow_id = %workflow.id, execution_id = %execution.id);
        let execution_id = execution.id;
        let task = tokio::spawn(
            async move { engine.run_pipeline(&workflow, execution_id, &trigger_payload).await }
                .instrument(span),
        );

        Ok(ExecutionHandle { execution, task })
    }

    // -----------------------------------------------------------------------
    // Internal: the background pipeline.
    // -----------------------------------------------------------------------

    async fn run_pipeline(
        &self,
        workflow: &Workflow,
        execution_id: Uuid,
        trigger_payload: &str,
    ) -> ExecutionStatus {
        let (status, error) = match self.run_actions(workflow, execution_id, trigger_payload).await {
            Ok(()) => {
                info!("execution {execution_id} completed");
                (ExecutionStatus::Completed, None)
            }
            Err(e) => {
                error!("execution {execution_id} failed: {e}");
                (ExecutionStatus::Failed, Some(e.to_string()))
            }
        };

        if let Err(e) = self
            .executions
            .finish_execution(execution_id, status, error.as_deref())
            .await
        {
            error!("could not record {status} for execution {execution_id}: {e}");
        }
        status
    }

    /// Walk the actions in position order, feeding each step's output into
    /// the next step's mappings. Stops at the first failure.
    async fn run_actions(
        &self,
        workflow: &Workflow,
        execution_id: Uuid,
        trigger_payload: &str,
    ) -> Result<(), EngineError> {
        let mut working: DataMap = serde_json::from_str(trigger_payload)
            .map_err(|e| EngineError::InvalidTriggerPayload(e.to_string()))?;
        let mut source_service = workflow.trigger.service.as_str();

        for action in workflow.ordered_actions() {
            let input = self.mapper.apply_mappings(
                source_service,
                &working,
                &action.service,
                &workflow.mappings,
            )?;

            let record = self
                .executions
                .start_action(execution_id, action.id, &input)
                .await?;

            let outcome = match self.run_action(workflow.user_id, action, input).await {
                Ok(output) => self
                    .executions
                    .complete_action(record.id, &output)
                    .await
                    .map(|()| output)
                    .map_err(EngineError::from),
                Err(e) => Err(e),
            };

            match outcome {
                Ok(output) => {
                    info!(
                        "action {} ('{}.{}') completed",
                        action.position, action.service, action.action_id
                    );
                    working = output;
                    source_service = action.service.as_str();
                }
                Err(e) => {
                    if let Err(db_err) = self.executions.fail_action(record.id, &e.to_string()).await {
                        warn!("could not record failure of action execution {}: {db_err}", record.id);
                    }
                    return Err(e);
                }
            }
        }

        Ok(())
    }

    async fn run_action(
        &self,
        user_id: Uuid,
        action: &Action,
        input: DataMap,
    ) -> Result<DataMap, EngineError> {
        let connection = self.resolver.resolve(user_id, &action.service).await?;
        let provider = self.providers.get(&action.service)?;

        provider
            .auth_handler()
            .check_connection(&connection)
            .map_err(|source| EngineError::ConnectionRejected {
                connection_id: connection.id,
                service: action.service.clone(),
                source,
            })?;

        // The call runs on its own task so a panicking provider fails this
        // action instead of unwinding the pipeline.
        let service = action.service.clone();
        let action_id = action.action_id.clone();
        let config = action.config.clone();
        let mut call = tokio::spawn(async move {
            provider
                .action_handler()
                .execute(&connection, &action_id, &config, input)
                .await
        });

        match tokio::time::timeout(self.config.action_timeout, &mut call).await {
            Ok(Ok(Ok(output))) => Ok(output),
            Ok(Ok(Err(source))) => Err(EngineError::ActionFailed {
                service,
                action_id: action.action_id.clone(),
                source,
            }),
            Ok(Err(join_err)) => Err(EngineError::ActionPanicked {
                service,
                action_id: action.action_id.clone(),
                reason: panic_reason(join_err),
            }),
            Err(_) => {
                call.abort();
                Err(EngineError::ActionTimedOut {
                    service,
                    action_id: action.action_id.clone(),
                    timeout: self.config.action_timeout,
                })
            }
        }
    }
}

fn panic_reason(err: JoinError) -> String {
    match err.try_into_panic() {
        Ok(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_owned()),
        Err(err) => err.to_string(),
    }
}
