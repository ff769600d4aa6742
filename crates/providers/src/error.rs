//! Provider-level error type.

use thiserror::Error;

/// Errors returned by a provider's capability handlers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The trigger or action id is not offered by this provider.
    #[error("unsupported {kind} '{id}'")]
    Unsupported { kind: &'static str, id: String },

    /// The supplied config does not match what the capability expects.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// The connection lacks credentials the provider needs.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The remote call itself failed.
    #[error("request failed: {0}")]
    Request(String),
}
