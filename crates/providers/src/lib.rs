//! `providers` crate — the `ServiceProvider` capability traits and built-in providers.
//!
//! Every integration (built-in or external) implements [`ServiceProvider`],
//! which hands out three capability objects: auth, trigger and action.
//! The engine crate resolves providers by service name and dispatches
//! through these trait objects.

pub mod connection;
pub mod error;
pub mod http;
pub mod mock;
pub mod schema;
pub mod traits;

pub use connection::{Connection, ConnectionStatus, DataMap};
pub use error::ProviderError;
pub use schema::{Capability, ConfigSchema};
pub use traits::{ActionHandler, AuthHandler, ServiceProvider, TriggerHandler};
