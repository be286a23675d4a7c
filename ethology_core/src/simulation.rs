//! The host simulation as seen by the engine.

use crate::agent::AgentRef;
use crate::error::EthologyError;
use ethology_env::{AgentTypeKey, InstanceId};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Agent creation, disposal and lookup.
///
/// Must only be driven from the authoritative context (the coordinator task).
pub trait Simulation: Send + Sync {
    /// Whether agents of this type can be created at all.
    fn can_instantiate(&self, key: &AgentTypeKey) -> bool;

    /// Creates a throwaway agent that is never added to the world.
    fn instantiate_disposable(&self, key: &AgentTypeKey) -> Result<AgentRef, EthologyError>;

    /// Releases an agent created by `instantiate_disposable`.
    fn dispose(&self, agent: &AgentRef);

    /// A live agent in the world.
    fn live_agent(&self, id: InstanceId) -> Option<AgentRef>;
}

/// A disposable agent released when the guard is dropped.
///
/// Every exit path of an archetype analysis, including worker panics and
/// failed classifications, ends with the guard being dropped on the context
/// that created it.
pub struct DisposableAgent {
    agent: AgentRef,
    simulation: Arc<dyn Simulation>,
}

impl DisposableAgent {
    pub fn instantiate(simulation: &Arc<dyn Simulation>, key: &AgentTypeKey) -> Result<Self, EthologyError> {
        let agent = simulation.instantiate_disposable(key)?;
        Ok(Self {
            agent,
            simulation: Arc::clone(simulation),
        })
    }

    pub fn agent(&self) -> &AgentRef {
        &self.agent
    }
}

impl Drop for DisposableAgent {
    fn drop(&mut self) {
        debug!("Disposing archetype instance {}", self.agent.agent_type());
        self.simulation.dispose(&self.agent);
    }
}

impl fmt::Debug for DisposableAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisposableAgent")
            .field("agent", &self.agent.agent_type())
            .finish()
    }
}
