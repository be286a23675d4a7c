//! Error types for the Ethology environment abstraction.

use thiserror::Error;

/// Errors that can occur in the environment abstraction layer.
#[derive(Debug, Error)]
pub enum EnvError {
    /// Transport send failed (queue closed, peer gone, etc.)
    #[error("Transport error: {0}")]
    TransportError(String),

    /// Requester is not connected anymore
    #[error("Requester unreachable: {0}")]
    RequesterUnreachable(String),

    /// Envelope serialization/deserialization failed
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Context operation failed
    #[error("Context error: {0}")]
    ContextError(String),
}

impl EnvError {
    /// Creates a transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::TransportError(msg.into())
    }

    /// Creates an unreachable error.
    pub fn unreachable(requester: impl std::fmt::Display) -> Self {
        Self::RequesterUnreachable(requester.to_string())
    }
}
