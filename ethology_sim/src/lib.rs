//! Ethology Deterministic Simulation Harness
//!
//! Runs the scan coordinator, client schedulers and analysis pipeline
//! against a scripted host world, with time and request ordering under the
//! harness's control.
//!
//! # Determinism
//!
//! - **Time**: `SimContext` owns a virtual clock that only moves when a
//!   scenario advances it. Rate limiting, debouncing and instance freshness
//!   all read this clock.
//! - **Ordering**: requester order and selection bursts are shuffled from a
//!   single ChaCha8 stream seeded per run.
//! - **World**: `SimWorld` builds every agent from fixed class descriptors
//!   and counts each disposable it hands out.
//!
//! # Usage
//!
//! ```ignore
//! use ethology_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let result = ScenarioRunner::new(42).run(ScenarioId::Coalescing);
//! assert!(result.passed);
//! ```

pub mod bestiary;
mod context;
mod network;
mod runner;
pub mod scenarios;
mod world;

pub use context::SimContext;
pub use network::SimNetwork;
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner, SimError};
pub use world::SimWorld;
