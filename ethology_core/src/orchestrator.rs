//! Drives the sub-analyzers into one accumulator per agent.
//!
//! Archetype analysis runs stats and the capability analyzers on a disposable
//! instance. Instance analysis adds the state analyzers on a live agent.

use crate::accumulator::{AgentStats, Scope, TraitAccumulator};
use crate::agent::{Agent, Attribute};
use crate::behavior_trait::BehaviorTrait;
use crate::catalog::{CatalogSnapshot, TraitCatalog};
use crate::config::EngineConfig;
use crate::ecology;
use crate::error::EthologyError;
use crate::generic::GenericHeuristicInspector;
use crate::naming::EntityNames;
use crate::reflection::FieldScanner;
use crate::registry::{self, ClassifierKey, InspectorRegistry, Subject};
use crate::simulation::{DisposableAgent, Simulation};
use crate::walker::BehaviorGraphWalker;
use ethology_env::AgentTypeKey;
use std::sync::Arc;
use tracing::{debug, warn};

/// Shared read-only state handed to every sub-analyzer.
pub struct AnalysisContext<'a> {
    pub walker: &'a BehaviorGraphWalker,
    pub registry: &'a InspectorRegistry,
    pub catalog: &'a CatalogSnapshot,
}

impl AnalysisContext<'_> {
    /// Registry inspector for `key`, else the catalog template.
    pub fn classify(&self, key: &ClassifierKey, subject: &Subject<'_>, args: &[String]) -> Option<BehaviorTrait> {
        if let Some(inspector) = self.registry.lookup(key) {
            return registry::invoke(inspector, subject);
        }
        self.catalog
            .get(key)
            .map(|template| template.instantiate_with(args.iter().cloned()))
    }
}

/// One pass over one aspect of an agent.
///
/// Implementations catch and skip per-unit failures internally.
pub trait SubAnalyzer: Send + Sync {
    fn name(&self) -> &'static str;

    fn analyze(&self, ctx: &AnalysisContext<'_>, agent: &dyn Agent, acc: &mut TraitAccumulator);
}

/// Every task and targeting unit, as capabilities.
pub struct GoalCapabilities;

impl SubAnalyzer for GoalCapabilities {
    fn name(&self) -> &'static str {
        "goal_capabilities"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>, agent: &dyn Agent, acc: &mut TraitAccumulator) {
        for slot in agent.goals().iter().chain(agent.targets().iter()) {
            ctx.walker.walk(&slot.unit, Scope::Capability, acc);
        }
    }
}

/// Sensors, memories (capability form) and every activity.
pub struct BrainCapabilities;

impl SubAnalyzer for BrainCapabilities {
    fn name(&self) -> &'static str {
        "brain_capabilities"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>, agent: &dyn Agent, acc: &mut TraitAccumulator) {
        for sensor in agent.sensors() {
            let subject = Subject::Sensor { id: &sensor };
            if let Some(t) = ctx.classify(&ClassifierKey::sensor(&sensor), &subject, &[]) {
                acc.add_capability(t);
            }
        }
        for memory in agent.memories() {
            let subject = Subject::Memory { id: &memory.id, value: None };
            if let Some(t) = ctx.classify(&ClassifierKey::memory(&memory.id), &subject, &[]) {
                acc.add_capability(t);
            }
        }
        for activity in agent.activities() {
            let subject = Subject::Activity { id: &activity.id };
            if let Some(t) = ctx.classify(&ClassifierKey::activity(&activity.id), &subject, &[]) {
                acc.add_capability(t);
            }
        }
    }
}

/// Habitat and temperament.
pub struct EcologyCapabilities;

impl SubAnalyzer for EcologyCapabilities {
    fn name(&self) -> &'static str {
        "ecology"
    }

    fn analyze(&self, _ctx: &AnalysisContext<'_>, agent: &dyn Agent, acc: &mut TraitAccumulator) {
        ecology::classify(agent, acc);
    }
}

/// Running task units, as current states.
pub struct RunningGoals;

impl SubAnalyzer for RunningGoals {
    fn name(&self) -> &'static str {
        "running_goals"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>, agent: &dyn Agent, acc: &mut TraitAccumulator) {
        for slot in agent.goals().iter().filter(|slot| slot.running) {
            ctx.walker.walk(&slot.unit, Scope::CurrentState, acc);
        }
    }
}

/// Active activities and memories holding a value, as current states.
pub struct BrainStates;

impl SubAnalyzer for BrainStates {
    fn name(&self) -> &'static str {
        "brain_states"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>, agent: &dyn Agent, acc: &mut TraitAccumulator) {
        for activity in agent.activities().iter().filter(|a| a.active) {
            let subject = Subject::Activity { id: &activity.id };
            if let Some(t) = ctx.classify(&ClassifierKey::activity(&activity.id), &subject, &[]) {
                acc.add_current_state(t);
            }
        }
        for memory in agent.memories() {
            let Some(value) = memory.value.as_ref() else {
                continue;
            };
            let subject = Subject::Memory {
                id: &memory.id,
                value: Some(value),
            };
            let args = [value.display_arg()];
            if let Some(t) = ctx.classify(&ClassifierKey::memory(&memory.id), &subject, &args) {
                acc.add_current_state(t);
            }
        }
    }
}

pub struct AnalysisOrchestrator {
    config: Arc<EngineConfig>,
    registry: Arc<InspectorRegistry>,
    catalog: Arc<TraitCatalog>,
    scanner: Arc<FieldScanner>,
    walker: BehaviorGraphWalker,
    capability_analyzers: Vec<Box<dyn SubAnalyzer>>,
    state_analyzers: Vec<Box<dyn SubAnalyzer>>,
}

impl AnalysisOrchestrator {
    pub fn new(
        config: Arc<EngineConfig>,
        registry: Arc<InspectorRegistry>,
        catalog: Arc<TraitCatalog>,
        names: Arc<EntityNames>,
    ) -> Self {
        let scanner = Arc::new(FieldScanner::new());
        let generic = GenericHeuristicInspector::new(Arc::clone(&scanner), names, Arc::clone(&catalog))
            .with_debug_unknown(config.debug_unknown_units);
        let walker = BehaviorGraphWalker::new(
            Arc::clone(&registry),
            Arc::clone(&catalog),
            Arc::clone(&scanner),
            generic,
        );

        Self {
            config,
            registry,
            catalog,
            scanner,
            walker,
            capability_analyzers: vec![
                Box::new(GoalCapabilities),
                Box::new(BrainCapabilities),
                Box::new(EcologyCapabilities),
            ],
            state_analyzers: vec![Box::new(RunningGoals), Box::new(BrainStates)],
        }
    }

    /// Appends a capability analyzer, run after the built-in ones.
    pub fn with_capability_analyzer(mut self, analyzer: Box<dyn SubAnalyzer>) -> Self {
        self.capability_analyzers.push(analyzer);
        self
    }

    pub fn with_state_analyzer(mut self, analyzer: Box<dyn SubAnalyzer>) -> Self {
        self.state_analyzers.push(analyzer);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<TraitCatalog> {
        &self.catalog
    }

    pub fn scanner(&self) -> &Arc<FieldScanner> {
        &self.scanner
    }

    /// Deny-list and instantiability checks, before any work is scheduled.
    pub fn validate_archetype(&self, key: &AgentTypeKey, simulation: &dyn Simulation) -> Result<(), EthologyError> {
        if self.config.is_denied(key) {
            return Err(EthologyError::Denied(key.clone()));
        }
        if !simulation.can_instantiate(key) {
            return Err(EthologyError::NotInstantiable(key.clone()));
        }
        Ok(())
    }

    /// Analyzes an agent kind through a disposable instance.
    ///
    /// The instance is disposed on every exit path.
    pub fn analyze_archetype(
        &self,
        key: &AgentTypeKey,
        simulation: &Arc<dyn Simulation>,
    ) -> Option<TraitAccumulator> {
        let attempt = self
            .validate_archetype(key, simulation.as_ref())
            .and_then(|_| DisposableAgent::instantiate(simulation, key));

        match attempt {
            Ok(guard) => Some(self.analyze_capabilities(guard.agent().as_ref())),
            Err(e) => {
                warn!("Archetype analysis of {} failed: {}", key, e);
                None
            }
        }
    }

    /// Stats and capabilities only. Safe to run off the authoritative
    /// context: only reads the agent.
    pub fn analyze_capabilities(&self, agent: &dyn Agent) -> TraitAccumulator {
        let mut acc = TraitAccumulator::new(agent.agent_type().clone());
        acc.set_stats(read_stats(agent));
        self.run(&self.capability_analyzers, agent, &mut acc);
        acc
    }

    /// Full analysis of a live agent, capabilities and current states.
    pub fn analyze_instance(&self, agent: &dyn Agent) -> TraitAccumulator {
        let mut acc = TraitAccumulator::for_instance(agent.agent_type().clone(), agent.instance_id());
        acc.set_stats(read_stats(agent));
        self.run(&self.capability_analyzers, agent, &mut acc);
        self.run(&self.state_analyzers, agent, &mut acc);
        acc
    }

    fn run(&self, analyzers: &[Box<dyn SubAnalyzer>], agent: &dyn Agent, acc: &mut TraitAccumulator) {
        let catalog = self.catalog.snapshot();
        let ctx = AnalysisContext {
            walker: &self.walker,
            registry: &self.registry,
            catalog: &catalog,
        };
        for analyzer in analyzers {
            debug!("Running {} on {}", analyzer.name(), agent.agent_type());
            analyzer.analyze(&ctx, agent, acc);
        }
    }
}

fn read_stats(agent: &dyn Agent) -> AgentStats {
    AgentStats {
        health: agent.attribute(Attribute::MaxHealth).unwrap_or(0.0),
        damage: agent.attribute(Attribute::AttackDamage).unwrap_or(0.0),
        speed: agent.attribute(Attribute::MovementSpeed).unwrap_or(0.0),
        defense: agent.attribute(Attribute::Armor).unwrap_or(0.0),
    }
}
