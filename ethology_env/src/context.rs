//! Core environment context trait for the Ethology engine.

use async_trait::async_trait;
use std::future::Future;
use std::time::{Duration, SystemTime};

/// The central interface for environment interaction.
///
/// This trait abstracts the host so that the scan coordinator and the
/// client scheduler run unchanged in production (tokio) and in the
/// deterministic simulation harness.
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `tokio::time` and `tokio::spawn`
/// - **Simulation**: `SimContext` - virtual clock advanced by the harness
///
/// # Determinism
///
/// Freshness windows, debounce timers and token-bucket refills all read
/// `now()`, so a virtual clock makes every one of them reproducible.
#[async_trait]
pub trait EthologyContext: Send + Sync + 'static {
    /// Returns the current monotonic time since context creation.
    ///
    /// Used for cache timestamps, rate-limiter refills and debounce deadlines.
    /// In simulation, this is the virtual clock time.
    fn now(&self) -> Duration;

    /// Returns the wall-clock time (log lines, exported reports).
    fn system_time(&self) -> SystemTime;

    /// Suspends execution for the given duration.
    ///
    /// In production: wraps `tokio::time::sleep`
    /// In simulation: advances virtual clock
    async fn sleep(&self, duration: Duration);

    /// Spawns a background task.
    ///
    /// The scan coordinator uses this to hand classification jobs to the
    /// worker pool; the job reports back through the coordinator's queue.
    fn spawn<F>(&self, name: &str, future: F)
    where
        F: Future<Output = ()> + Send + 'static;
}
