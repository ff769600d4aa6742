//! `engine` crate — domain models, validation, data mapping, and the
//! workflow execution engine.

pub mod models;
pub mod error;
pub mod registry;
pub mod transform;
pub mod mapper;
pub mod validator;
pub mod resolver;
pub mod store;
pub mod executor;

pub use models::{
    Action, ActionExecution, DataMapping, ExecutionStatus, TriggerSpec, Workflow,
    WorkflowExecution, WorkflowStatus,
};
pub use error::{EngineError, ErrorKind};
pub use registry::ProviderRegistry;
pub use transform::TransformerRegistry;
pub use mapper::DataMapper;
pub use validator::validate_workflow;
pub use resolver::ConnectionResolver;
pub use executor::{Engine, EngineConfig, ExecutionHandle};
