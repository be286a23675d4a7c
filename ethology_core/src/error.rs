//! Error types for the analysis engine.

use ethology_env::{AgentTypeKey, EnvError};
use thiserror::Error;

/// Engine-level errors.
#[derive(Debug, Error)]
pub enum EthologyError {
    #[error("Agent type {0} is deny-listed for analysis")]
    Denied(AgentTypeKey),

    #[error("Agent type {0} cannot be instantiated")]
    NotInstantiable(AgentTypeKey),

    #[error("Failed to instantiate {key}: {reason}")]
    Instantiation { key: AgentTypeKey, reason: String },

    #[error("Codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Environment error: {0}")]
    Env(#[from] EnvError),
}

impl EthologyError {
    /// Creates an instantiation error.
    pub fn instantiation(key: &AgentTypeKey, reason: impl Into<String>) -> Self {
        Self::Instantiation {
            key: key.clone(),
            reason: reason.into(),
        }
    }
}

/// A single inspector failed on a single unit.
///
/// Never aborts an analysis pass: the unit is treated as unclassifiable.
#[derive(Debug, Error)]
pub enum InspectError {
    #[error("Unexpected subject for inspector: {0}")]
    WrongSubject(String),

    #[error("Missing field `{0}`")]
    MissingField(String),

    #[error("Inspector panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Other(String),
}

/// Reading one field of one unit failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("Field `{0}` is not declared on this unit")]
    Unknown(String),

    #[error("Field `{0}` is detached")]
    Detached(String),

    #[error("Field `{0}` denied access")]
    AccessDenied(String),
}

/// Worker pool failures.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Worker pool is closed")]
    Closed,

    #[error("Worker job failed: {0}")]
    JobFailed(String),
}
