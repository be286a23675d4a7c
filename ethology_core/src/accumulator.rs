//! Per-agent collection of capability and current-state traits.

use crate::behavior_trait::BehaviorTrait;
use ethology_env::{AgentTypeKey, InstanceId};

/// Capability vs. current-state target list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// What the agent kind can do
    Capability,
    /// What this instance is doing now
    CurrentState,
}

/// Fixed numeric stats read from the agent's attributes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AgentStats {
    pub health: f64,
    pub damage: f64,
    pub speed: f64,
    pub defense: f64,
}

/// Result of one analysis pass.
///
/// Owned by a single pass while it is being filled; published as an
/// immutable `Arc<TraitAccumulator>` afterwards. Both lists keep insertion
/// order and never hold two traits with the same key.
#[derive(Debug, Clone, PartialEq)]
pub struct TraitAccumulator {
    agent_type: AgentTypeKey,
    instance_id: Option<InstanceId>,
    stats: AgentStats,
    capabilities: Vec<BehaviorTrait>,
    current_states: Vec<BehaviorTrait>,
}

impl TraitAccumulator {
    pub fn new(agent_type: AgentTypeKey) -> Self {
        Self {
            agent_type,
            instance_id: None,
            stats: AgentStats::default(),
            capabilities: Vec::new(),
            current_states: Vec::new(),
        }
    }

    /// Accumulator for a specific live instance.
    pub fn for_instance(agent_type: AgentTypeKey, instance_id: InstanceId) -> Self {
        let mut acc = Self::new(agent_type);
        acc.instance_id = Some(instance_id);
        acc
    }

    pub fn agent_type(&self) -> &AgentTypeKey {
        &self.agent_type
    }

    pub fn instance_id(&self) -> Option<InstanceId> {
        self.instance_id
    }

    pub fn set_instance_id(&mut self, id: Option<InstanceId>) {
        self.instance_id = id;
    }

    /// Appends unless a trait with the same key is already present.
    pub fn add_capability(&mut self, t: BehaviorTrait) {
        push_unique(&mut self.capabilities, t);
    }

    /// Appends unless a trait with the same key is already present.
    pub fn add_current_state(&mut self, t: BehaviorTrait) {
        push_unique(&mut self.current_states, t);
    }

    /// Routes a trait into the list for `scope`.
    pub fn add(&mut self, scope: Scope, t: BehaviorTrait) {
        match scope {
            Scope::Capability => self.add_capability(t),
            Scope::CurrentState => self.add_current_state(t),
        }
    }

    pub fn capabilities(&self) -> &[BehaviorTrait] {
        &self.capabilities
    }

    pub fn current_states(&self) -> &[BehaviorTrait] {
        &self.current_states
    }

    pub fn has_capability(&self, key: &str) -> bool {
        self.capabilities.iter().any(|t| t.key == key)
    }

    pub fn has_current_state(&self, key: &str) -> bool {
        self.current_states.iter().any(|t| t.key == key)
    }

    pub fn stats(&self) -> AgentStats {
        self.stats
    }

    pub fn set_stats(&mut self, stats: AgentStats) {
        self.stats = stats;
    }

    pub fn set_health(&mut self, value: f64) {
        self.stats.health = value;
    }

    pub fn set_damage(&mut self, value: f64) {
        self.stats.damage = value;
    }

    pub fn set_speed(&mut self, value: f64) {
        self.stats.speed = value;
    }

    pub fn set_defense(&mut self, value: f64) {
        self.stats.defense = value;
    }
}

fn push_unique(list: &mut Vec<BehaviorTrait>, t: BehaviorTrait) {
    if !list.iter().any(|existing| existing.key == t.key) {
        list.push(t);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior_trait::TraitCategory;
    use proptest::prelude::*;

    fn t(key: &str) -> BehaviorTrait {
        BehaviorTrait::new(key, "minecraft:stone", "ethology.test", TraitCategory::Goal)
    }

    #[test]
    fn test_duplicate_keys_are_ignored() {
        let mut acc = TraitAccumulator::new(AgentTypeKey::parse("cow"));
        acc.add_capability(t("a"));
        acc.add_capability(t("b").with_arg("first"));
        acc.add_capability(t("b").with_arg("second"));
        acc.add_current_state(t("a"));

        let keys: Vec<&str> = acc.capabilities().iter().map(|t| t.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
        // The first insertion wins
        assert_eq!(acc.capabilities()[1].args, vec!["first"]);
        // Lists are independent
        assert_eq!(acc.current_states().len(), 1);
    }

    #[test]
    fn test_stat_setters_overwrite() {
        let mut acc = TraitAccumulator::new(AgentTypeKey::parse("zombie"));
        acc.set_health(20.0);
        acc.set_health(22.5);
        acc.set_damage(3.0);
        assert_eq!(acc.stats().health, 22.5);
        assert_eq!(acc.stats().damage, 3.0);
        assert_eq!(acc.stats().speed, 0.0);
    }

    proptest! {
        #[test]
        fn test_keys_stay_unique_and_ordered(keys in prop::collection::vec("[a-e]", 0..40)) {
            let mut acc = TraitAccumulator::new(AgentTypeKey::parse("cow"));
            for key in &keys {
                acc.add_capability(t(key));
            }

            let mut expected: Vec<&str> = Vec::new();
            for key in &keys {
                if !expected.contains(&key.as_str()) {
                    expected.push(key);
                }
            }
            let actual: Vec<&str> = acc.capabilities().iter().map(|t| t.key.as_str()).collect();
            prop_assert_eq!(actual, expected);
        }

        #[test]
        fn test_reinsertion_is_idempotent(keys in prop::collection::vec("[a-z]{1,3}", 1..20)) {
            let mut acc = TraitAccumulator::new(AgentTypeKey::parse("cow"));
            for key in &keys {
                acc.add_current_state(t(key));
            }
            let before = acc.current_states().to_vec();
            for key in &keys {
                acc.add_current_state(t(key));
            }
            prop_assert_eq!(acc.current_states(), before.as_slice());
        }
    }
}
