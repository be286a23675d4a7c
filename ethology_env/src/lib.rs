//! Ethology Environment Abstraction Layer
//!
//! This crate provides the "Sans-IO" abstraction allowing the Ethology
//! analysis engine to run both inside a live host (tokio) and inside the
//! deterministic simulation harness (virtual clock).
//!
//! # Core Concept: The Authoritative Context
//!
//! The engine never reads the wall clock or spawns threads on its own.
//! Everything that would introduce non-determinism goes through a context:
//! - Time (`now()`, `sleep()`)
//! - Task spawning (`spawn()`)
//! - Transport (`RequestSender`, `ResultSink`)
//!
//! # Example
//!
//! ```ignore
//! use ethology_env::{EthologyContext, ScanRequest, RequestSender};
//!
//! async fn client_loop<Ctx: EthologyContext>(ctx: &Ctx, scheduler: &mut Scheduler) {
//!     loop {
//!         ctx.sleep(Duration::from_millis(50)).await;
//!         scheduler.tick();
//!     }
//! }
//! ```

mod context;
mod transport;
mod types;
mod error;
mod tokio_impl;

pub use context::EthologyContext;
pub use transport::{RequestSender, ResultSink};
pub use types::{AgentTypeKey, InstanceId, RequesterId, ResultEnvelope, ScanRequest};
pub use error::EnvError;
pub use tokio_impl::TokioContext;
