//! Result caches.
//!
//! - `ArchetypeCache`: one published result per agent type, never expires
//! - `InstanceCache`: per live instance, fresh for a fixed window

use crate::accumulator::TraitAccumulator;
use ethology_env::{AgentTypeKey, InstanceId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default, Clone)]
pub struct ArchetypeCache {
    entries: HashMap<AgentTypeKey, Arc<TraitAccumulator>>,
}

impl ArchetypeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &AgentTypeKey) -> Option<Arc<TraitAccumulator>> {
        self.entries.get(key).cloned()
    }

    pub fn insert(&mut self, key: AgentTypeKey, result: Arc<TraitAccumulator>) {
        self.entries.insert(key, result);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone)]
struct InstanceEntry {
    result: Arc<TraitAccumulator>,
    computed_at: Duration,
}

/// Instance results with a freshness window.
///
/// An entry is fresh while `now - computed_at < window`. Stale entries are
/// pruned on every insert, so the map only holds results from the last
/// window.
#[derive(Debug, Clone)]
pub struct InstanceCache {
    window: Duration,
    entries: HashMap<InstanceId, InstanceEntry>,
}

impl InstanceCache {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: HashMap::new(),
        }
    }

    pub fn insert(&mut self, id: InstanceId, result: Arc<TraitAccumulator>, now: Duration) {
        self.prune(now);
        self.entries.insert(
            id,
            InstanceEntry {
                result,
                computed_at: now,
            },
        );
    }

    /// The cached result if it is still fresh at `now`.
    pub fn get_fresh(&self, id: InstanceId, now: Duration) -> Option<Arc<TraitAccumulator>> {
        let entry = self.entries.get(&id)?;
        if now.saturating_sub(entry.computed_at) < self.window {
            Some(Arc::clone(&entry.result))
        } else {
            None
        }
    }

    /// Drops every stale entry. Returns how many were removed.
    pub fn prune(&mut self, now: Duration) -> usize {
        let before = self.entries.len();
        let window = self.window;
        self.entries
            .retain(|_, entry| now.saturating_sub(entry.computed_at) < window);
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
