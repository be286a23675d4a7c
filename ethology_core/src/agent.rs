//! Read surface of a simulated agent.
//!
//! The host owns agents; the engine only reads them. `StaticAgent` is a
//! ready-made implementation for hosts that describe agents as data.

use crate::unit::{ClassRef, UnitRef};
use ethology_env::{AgentTypeKey, InstanceId};
use nalgebra::Point3;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use uuid::Uuid;

/// Shared handle to an agent.
pub type AgentRef = Arc<dyn Agent>;

/// Spawn category of an agent kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentCategory {
    Monster,
    Creature,
    Ambient,
    WaterCreature,
    Misc,
}

/// Numeric attributes the analyzer reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    MaxHealth,
    AttackDamage,
    MovementSpeed,
    Armor,
}

/// How the agent finds paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Navigation {
    #[default]
    Ground,
    Water,
    Amphibious,
    Flying,
}

impl Navigation {
    pub fn is_aquatic(self) -> bool {
        matches!(self, Navigation::Water | Navigation::Amphibious)
    }
}

/// A task or targeting unit as scheduled on the agent.
#[derive(Debug, Clone)]
pub struct GoalSlot {
    pub unit: UnitRef,
    pub priority: i32,
    pub running: bool,
}

impl GoalSlot {
    pub fn new(priority: i32, unit: UnitRef) -> Self {
        Self {
            unit,
            priority,
            running: false,
        }
    }
}

/// Value held by a memory slot.
#[derive(Debug, Clone, PartialEq)]
pub enum MemoryValue {
    /// A block position
    Position(Point3<i32>),
    /// Another agent
    Entity(Uuid),
    Text(String),
    Flag(bool),
}

impl MemoryValue {
    /// Short form used as a trait argument.
    pub fn display_arg(&self) -> String {
        match self {
            MemoryValue::Position(p) => format!("{}, {}, {}", p.x, p.y, p.z),
            MemoryValue::Entity(id) => id.to_string().chars().take(8).collect(),
            MemoryValue::Text(text) => text.clone(),
            MemoryValue::Flag(flag) => flag.to_string(),
        }
    }
}

impl fmt::Display for MemoryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_arg())
    }
}

/// A registered memory and its current value, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct MemorySlot {
    pub id: String,
    pub value: Option<MemoryValue>,
}

/// A coarse activity label and whether it is active now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivitySlot {
    pub id: String,
    pub active: bool,
}

/// Read-only view of one agent.
pub trait Agent: Send + Sync {
    fn agent_type(&self) -> &AgentTypeKey;

    fn instance_id(&self) -> InstanceId;

    /// Class descriptor of the agent itself.
    fn class(&self) -> &ClassRef;

    fn category(&self) -> AgentCategory;

    /// Current attribute value, `None` when the agent lacks the attribute.
    fn attribute(&self, attribute: Attribute) -> Option<f64>;

    /// Task units in scheduling order.
    fn goals(&self) -> Vec<GoalSlot>;

    /// Targeting units in scheduling order.
    fn targets(&self) -> Vec<GoalSlot>;

    /// Ids of the registered perception units.
    fn sensors(&self) -> Vec<String>;

    fn memories(&self) -> Vec<MemorySlot>;

    fn activities(&self) -> Vec<ActivitySlot>;

    fn navigation(&self) -> Navigation;

    /// Whether the agent kind can be spawned by players.
    fn can_summon(&self) -> bool;
}

impl fmt::Debug for dyn Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Agent<{} {}>", self.agent_type(), self.instance_id())
    }
}

/// Data-driven agent.
///
/// Live state (running flags, memory values, active activities) sits behind
/// locks so a host can advance it while analyzers hold a shared reference.
#[derive(Debug)]
pub struct StaticAgent {
    agent_type: AgentTypeKey,
    instance_id: InstanceId,
    class: ClassRef,
    category: AgentCategory,
    attributes: HashMap<Attribute, f64>,
    goals: RwLock<Vec<GoalSlot>>,
    targets: Vec<GoalSlot>,
    sensors: Vec<String>,
    memories: RwLock<Vec<MemorySlot>>,
    activities: RwLock<Vec<ActivitySlot>>,
    navigation: Navigation,
    summonable: bool,
}

impl StaticAgent {
    pub fn builder(agent_type: AgentTypeKey, class: &ClassRef) -> StaticAgentBuilder {
        StaticAgentBuilder {
            agent: StaticAgent {
                agent_type,
                instance_id: InstanceId::new(),
                class: ClassRef::clone(class),
                category: AgentCategory::Creature,
                attributes: HashMap::new(),
                goals: RwLock::new(Vec::new()),
                targets: Vec::new(),
                sensors: Vec::new(),
                memories: RwLock::new(Vec::new()),
                activities: RwLock::new(Vec::new()),
                navigation: Navigation::Ground,
                summonable: true,
            },
        }
    }

    /// Marks the goal at `index` as running or idle.
    pub fn set_running(&self, index: usize, running: bool) {
        if let Some(slot) = self
            .goals
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(index)
        {
            slot.running = running;
        }
    }

    /// Sets or clears a memory value. Unregistered memories are ignored.
    pub fn set_memory(&self, id: &str, value: Option<MemoryValue>) {
        let mut memories = self.memories.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = memories.iter_mut().find(|slot| slot.id == id) {
            slot.value = value;
        }
    }

    pub fn set_activity(&self, id: &str, active: bool) {
        let mut activities = self.activities.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = activities.iter_mut().find(|slot| slot.id == id) {
            slot.active = active;
        }
    }
}

impl Agent for StaticAgent {
    fn agent_type(&self) -> &AgentTypeKey {
        &self.agent_type
    }

    fn instance_id(&self) -> InstanceId {
        self.instance_id
    }

    fn class(&self) -> &ClassRef {
        &self.class
    }

    fn category(&self) -> AgentCategory {
        self.category
    }

    fn attribute(&self, attribute: Attribute) -> Option<f64> {
        self.attributes.get(&attribute).copied()
    }

    fn goals(&self) -> Vec<GoalSlot> {
        self.goals.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn targets(&self) -> Vec<GoalSlot> {
        self.targets.clone()
    }

    fn sensors(&self) -> Vec<String> {
        self.sensors.clone()
    }

    fn memories(&self) -> Vec<MemorySlot> {
        self.memories.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn activities(&self) -> Vec<ActivitySlot> {
        self.activities.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn navigation(&self) -> Navigation {
        self.navigation
    }

    fn can_summon(&self) -> bool {
        self.summonable
    }
}

/// Builder for `StaticAgent`.
pub struct StaticAgentBuilder {
    agent: StaticAgent,
}

impl StaticAgentBuilder {
    pub fn instance_id(mut self, id: InstanceId) -> Self {
        self.agent.instance_id = id;
        self
    }

    pub fn category(mut self, category: AgentCategory) -> Self {
        self.agent.category = category;
        self
    }

    pub fn attribute(mut self, attribute: Attribute, value: f64) -> Self {
        self.agent.attributes.insert(attribute, value);
        self
    }

    pub fn goal(mut self, priority: i32, unit: UnitRef) -> Self {
        self.agent
            .goals
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .push(GoalSlot::new(priority, unit));
        self
    }

    pub fn target(mut self, priority: i32, unit: UnitRef) -> Self {
        self.agent.targets.push(GoalSlot::new(priority, unit));
        self
    }

    pub fn sensor(mut self, id: &str) -> Self {
        self.agent.sensors.push(id.to_string());
        self
    }

    pub fn memory(mut self, id: &str, value: Option<MemoryValue>) -> Self {
        self.agent
            .memories
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .push(MemorySlot {
                id: id.to_string(),
                value,
            });
        self
    }

    pub fn activity(mut self, id: &str, active: bool) -> Self {
        self.agent
            .activities
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ActivitySlot {
                id: id.to_string(),
                active,
            });
        self
    }

    pub fn navigation(mut self, navigation: Navigation) -> Self {
        self.agent.navigation = navigation;
        self
    }

    pub fn summonable(mut self, summonable: bool) -> Self {
        self.agent.summonable = summonable;
        self
    }

    pub fn build(self) -> StaticAgent {
        self.agent
    }
}
