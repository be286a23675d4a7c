//! Ethology Core - Behavior Introspection & Trait Synthesis Engine
//!
//! Turns the opaque behavior units attached to simulated agents into
//! display-ready traits:
//! 1. **Introspection**: `FieldScanner` finds typed fields on units of unknown classes
//! 2. **Classification**: registry inspectors, catalog templates and a generic heuristic,
//!    driven over each agent's behavior graph by `BehaviorGraphWalker`
//! 3. **Serving**: `ScanCoordinator` coalesces archetype scans, rate limits requesters
//!    and caches results; `ClientScanScheduler` debounces and merges on the client

pub mod accumulator;
pub mod agent;
pub mod behavior_trait;
pub mod builtin;
pub mod cache;
pub mod catalog;
pub mod classes;
pub mod client;
pub mod codec;
pub mod config;
pub mod coordinator;
pub mod ecology;
pub mod error;
pub mod generic;
pub mod items;
pub mod naming;
pub mod orchestrator;
pub mod rate_limit;
pub mod reflection;
pub mod registry;
pub mod simulation;
pub mod unit;
pub mod walker;
pub mod worker;

// Re-export key types for convenience
pub use accumulator::{AgentStats, Scope, TraitAccumulator};
pub use agent::{Agent, AgentCategory, AgentRef, Attribute, MemoryValue, Navigation, StaticAgent};
pub use behavior_trait::{BehaviorTrait, TraitCategory};
pub use catalog::{CatalogSnapshot, TraitCatalog, TraitTemplate};
pub use client::{ClientDatabase, ClientScanScheduler, TargetedScan};
pub use codec::ScanResult;
pub use config::{EngineConfig, RateLimitConfig};
pub use coordinator::{CoordinatorHandle, CoordinatorStats, ScanCoordinator};
pub use error::{EthologyError, FieldError, InspectError, WorkerError};
pub use naming::EntityNames;
pub use orchestrator::AnalysisOrchestrator;
pub use reflection::FieldScanner;
pub use registry::{ClassifierKey, InspectorRegistry, Subject};
pub use simulation::{DisposableAgent, Simulation};
pub use unit::{ClassRef, Unit, UnitClass, UnitObject, UnitRef, Value, ValueKind};
pub use walker::BehaviorGraphWalker;
