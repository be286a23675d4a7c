//! SimWorld - the host simulation the engine analyzes.

use crate::bestiary::{Classes, ARCHETYPES, MARKERS};
use ethology_core::{AgentRef, EthologyError, Simulation, StaticAgent};
use ethology_env::{AgentTypeKey, InstanceId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::debug;

/// Live agents plus bookkeeping for every disposable handed out.
pub struct SimWorld {
    classes: Classes,
    live: RwLock<HashMap<InstanceId, Arc<StaticAgent>>>,
    injected_failures: Mutex<HashMap<AgentTypeKey, u32>>,
    next_instance: AtomicU64,
    created: AtomicU64,
    disposed: AtomicU64,
    failed: AtomicU64,
}

impl SimWorld {
    pub fn new() -> Self {
        Self {
            classes: Classes::new(),
            live: RwLock::new(HashMap::new()),
            injected_failures: Mutex::new(HashMap::new()),
            next_instance: AtomicU64::new(1),
            created: AtomicU64::new(0),
            disposed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn classes(&self) -> &Classes {
        &self.classes
    }

    /// Every kind the world knows, instantiable or not.
    pub fn known_types(&self) -> Vec<AgentTypeKey> {
        ARCHETYPES
            .iter()
            .chain(MARKERS)
            .map(|raw| AgentTypeKey::parse(raw))
            .collect()
    }

    /// Adds a live agent of `key` to the world.
    pub fn spawn_live(&self, key: &AgentTypeKey) -> Option<InstanceId> {
        let id = InstanceId::from_seed(self.next_instance.fetch_add(1, Ordering::SeqCst));
        let agent = Arc::new(self.classes.build(key, id)?);
        self.live
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, agent);
        debug!("Spawned live {} as {}", key, id);
        Some(id)
    }

    /// Concrete handle to a live agent, for mutating its state.
    pub fn live(&self, id: InstanceId) -> Option<Arc<StaticAgent>> {
        self.live
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    pub fn despawn(&self, id: InstanceId) -> bool {
        self.live
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some()
    }

    /// The next `count` instantiations of `key` fail.
    pub fn inject_failures(&self, key: &AgentTypeKey, count: u32) {
        self.injected_failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), count);
    }

    pub fn created(&self) -> u64 {
        self.created.load(Ordering::SeqCst)
    }

    pub fn disposed(&self) -> u64 {
        self.disposed.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::SeqCst)
    }

    /// Disposables created but not yet released.
    pub fn outstanding(&self) -> u64 {
        self.created().saturating_sub(self.disposed())
    }

    fn take_injected_failure(&self, key: &AgentTypeKey) -> bool {
        let mut failures = self
            .injected_failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match failures.get_mut(key) {
            Some(left) if *left > 0 => {
                *left -= 1;
                true
            }
            _ => false,
        }
    }
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulation for SimWorld {
    fn can_instantiate(&self, key: &AgentTypeKey) -> bool {
        !(key.namespace() == AgentTypeKey::DEFAULT_NAMESPACE && MARKERS.contains(&key.path()))
    }

    fn instantiate_disposable(&self, key: &AgentTypeKey) -> Result<AgentRef, EthologyError> {
        if self.take_injected_failure(key) {
            self.failed.fetch_add(1, Ordering::SeqCst);
            return Err(EthologyError::instantiation(key, "injected failure"));
        }
        let id = InstanceId::from_seed(u64::MAX - self.created.load(Ordering::SeqCst));
        match self.classes.build(key, id) {
            Some(agent) => {
                self.created.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(agent))
            }
            None => {
                self.failed.fetch_add(1, Ordering::SeqCst);
                Err(EthologyError::instantiation(key, "constructor threw"))
            }
        }
    }

    fn dispose(&self, _agent: &AgentRef) {
        self.disposed.fetch_add(1, Ordering::SeqCst);
    }

    fn live_agent(&self, id: InstanceId) -> Option<AgentRef> {
        self.live(id).map(|agent| agent as AgentRef)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethology_core::Agent;

    #[test]
    fn test_injected_failures_are_consumed() {
        let world = SimWorld::new();
        let cow = AgentTypeKey::parse("cow");
        world.inject_failures(&cow, 1);

        assert!(world.instantiate_disposable(&cow).is_err());
        let agent = world.instantiate_disposable(&cow).expect("second attempt succeeds");
        world.dispose(&agent);

        assert_eq!(world.failed(), 1);
        assert_eq!(world.created(), 1);
        assert_eq!(world.outstanding(), 0);
    }

    #[test]
    fn test_markers_and_glitches() {
        let world = SimWorld::new();
        assert!(!world.can_instantiate(&AgentTypeKey::parse("marker")));

        let glitch = AgentTypeKey::parse("wildlife:glitch");
        assert!(world.can_instantiate(&glitch));
        assert!(world.instantiate_disposable(&glitch).is_err());
    }

    #[test]
    fn test_live_agents() {
        let world = SimWorld::new();
        let id = world.spawn_live(&AgentTypeKey::parse("villager")).expect("villager spawns");
        let agent = world.live_agent(id).expect("live");
        assert_eq!(agent.instance_id(), id);

        assert!(world.despawn(id));
        assert!(world.live_agent(id).is_none());
    }
}
