//! Server-side scan coordinator.
//!
//! One task owns every piece of mutable server state: the rate limiters, the
//! archetype and instance caches, and the pending map. It is fed by a single
//! unbounded command queue. Archetype classification is pushed to the worker
//! pool and reports back through the same queue as `Command::Completed`, so
//! the disposable agent is always released on the coordinator task.
//!
//! ```text
//! Scan ──► rate limit ──► instance live? ──► fresh? ──► deliver
//!                              │               └──► analyze now ──► deliver
//!                              │
//!                              ▼
//!                 validate ──► cached? ──► deliver
//!                              │
//!                 pending? ──► attach waiter
//!                              │
//!                 instantiate ──► worker ──► Completed ──► dispose, cache, deliver all
//! ```

use crate::accumulator::TraitAccumulator;
use crate::cache::{ArchetypeCache, InstanceCache};
use crate::codec::ScanResult;
use crate::error::{EthologyError, WorkerError};
use crate::orchestrator::AnalysisOrchestrator;
use crate::rate_limit::RateLimiter;
use crate::registry::panic_message;
use crate::simulation::{DisposableAgent, Simulation};
use crate::worker::WorkerPool;
use ethology_env::{
    AgentTypeKey, EnvError, EthologyContext, RequestSender, RequesterId, ResultSink, ScanRequest,
};
use serde::Serialize;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace, warn};

enum Command {
    Scan {
        requester: RequesterId,
        request: ScanRequest,
    },
    Completed {
        key: AgentTypeKey,
        outcome: Result<TraitAccumulator, WorkerError>,
    },
    ClearCaches,
    Stats(oneshot::Sender<CoordinatorStats>),
}

/// Counters exposed for the harness and for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoordinatorStats {
    pub scans_received: u64,
    pub rate_limited: u64,
    pub rejected: u64,
    pub archetype_cache_hits: u64,
    pub coalesced: u64,
    pub computations_started: u64,
    pub computations_failed: u64,
    pub instance_scans: u64,
    pub instance_cache_hits: u64,
    pub instance_failures: u64,
    pub results_delivered: u64,
    pub cached_archetypes: usize,
    pub cached_instances: usize,
    pub pending: usize,
}

struct PendingScan {
    guard: DisposableAgent,
    waiters: Vec<RequesterId>,
}

/// Cloneable front door to a running coordinator.
#[derive(Clone)]
pub struct CoordinatorHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl CoordinatorHandle {
    /// Queues a scan. Never blocks; the result, if any, arrives through the
    /// coordinator's `ResultSink`.
    pub fn scan(&self, requester: RequesterId, request: ScanRequest) -> Result<(), EthologyError> {
        self.send(Command::Scan { requester, request })
    }

    /// Drops both cache tiers and every rate-limit bucket.
    pub fn clear_caches(&self) -> Result<(), EthologyError> {
        self.send(Command::ClearCaches)
    }

    /// Snapshot of the coordinator's counters, taken after every command
    /// queued before this call has been handled.
    pub async fn stats(&self) -> Result<CoordinatorStats, EthologyError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Stats(tx))?;
        rx.await
            .map_err(|_| EthologyError::Env(EnvError::transport("coordinator stopped")))
    }

    /// A `RequestSender` that issues scans on behalf of `requester`.
    pub fn sender_for(&self, requester: RequesterId) -> RequesterLink {
        RequesterLink {
            requester,
            handle: self.clone(),
        }
    }

    fn send(&self, command: Command) -> Result<(), EthologyError> {
        self.commands
            .send(command)
            .map_err(|_| EthologyError::Env(EnvError::transport("coordinator stopped")))
    }
}

/// In-process request path from one requester to the coordinator.
#[derive(Clone)]
pub struct RequesterLink {
    requester: RequesterId,
    handle: CoordinatorHandle,
}

impl RequestSender for RequesterLink {
    fn send_request(&self, request: ScanRequest) -> Result<(), EnvError> {
        self.handle
            .commands
            .send(Command::Scan {
                requester: self.requester,
                request,
            })
            .map_err(|_| EnvError::transport("coordinator stopped"))
    }
}

pub struct ScanCoordinator<Ctx: EthologyContext> {
    ctx: Arc<Ctx>,
    orchestrator: Arc<AnalysisOrchestrator>,
    simulation: Arc<dyn Simulation>,
    sink: Arc<dyn ResultSink>,
    workers: WorkerPool,
    limiter: RateLimiter,
    archetypes: ArchetypeCache,
    instances: InstanceCache,
    pending: HashMap<AgentTypeKey, PendingScan>,
    // Weak so the queue closes once every handle and in-flight job is gone
    completions: mpsc::WeakUnboundedSender<Command>,
    stats: CoordinatorStats,
}

impl<Ctx: EthologyContext> ScanCoordinator<Ctx> {
    /// Starts the coordinator task on `ctx` and returns its handle.
    ///
    /// The task exits when every handle is dropped and no computation is in
    /// flight; pending disposables are released on the way out.
    pub fn spawn(
        ctx: Arc<Ctx>,
        orchestrator: Arc<AnalysisOrchestrator>,
        simulation: Arc<dyn Simulation>,
        sink: Arc<dyn ResultSink>,
    ) -> CoordinatorHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let config = orchestrator.config();
        let coordinator = Self {
            workers: WorkerPool::new(config.worker_threads),
            limiter: RateLimiter::new(config.rate_limit),
            archetypes: ArchetypeCache::new(),
            instances: InstanceCache::new(config.instance_freshness),
            pending: HashMap::new(),
            completions: tx.downgrade(),
            stats: CoordinatorStats::default(),
            ctx: Arc::clone(&ctx),
            orchestrator,
            simulation,
            sink,
        };

        ctx.spawn("scan-coordinator", coordinator.run(rx));
        CoordinatorHandle { commands: tx }
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        info!("Scan coordinator started ({} workers)", self.workers.size());
        while let Some(command) = rx.recv().await {
            match command {
                Command::Scan { requester, request } => self.handle_scan(requester, request),
                Command::Completed { key, outcome } => self.handle_completed(key, outcome),
                Command::ClearCaches => self.clear_caches(),
                Command::Stats(reply) => {
                    let _ = reply.send(self.snapshot());
                }
            }
        }
        self.workers.close();
        info!(
            "Scan coordinator stopped, releasing {} pending archetypes",
            self.pending.len()
        );
    }

    fn handle_scan(&mut self, requester: RequesterId, request: ScanRequest) {
        self.stats.scans_received += 1;
        let now = self.ctx.now();

        if !self.limiter.try_acquire(requester, now) {
            self.stats.rate_limited += 1;
            trace!("Dropping scan of {} from {}: rate limited", request.agent_type, requester);
            return;
        }

        if let Some(id) = request.instance_id {
            match self.simulation.live_agent(id) {
                Some(agent) => {
                    if self.orchestrator.config().is_denied(agent.agent_type()) {
                        self.stats.rejected += 1;
                        warn!("Instance scan of {} rejected: type is deny-listed", agent.agent_type());
                        return;
                    }
                    if let Some(result) = self.instances.get_fresh(id, now) {
                        self.stats.instance_cache_hits += 1;
                        debug!("Instance cache hit for {}", id);
                        self.deliver(requester, &result);
                        return;
                    }
                    self.stats.instance_scans += 1;
                    let orchestrator = &self.orchestrator;
                    match catch_unwind(AssertUnwindSafe(|| orchestrator.analyze_instance(agent.as_ref()))) {
                        Ok(acc) => {
                            let result = Arc::new(acc);
                            self.instances.insert(id, Arc::clone(&result), now);
                            self.deliver(requester, &result);
                        }
                        Err(payload) => {
                            self.stats.instance_failures += 1;
                            warn!(
                                "Instance analysis of {} panicked: {}",
                                id,
                                panic_message(payload.as_ref())
                            );
                        }
                    }
                    return;
                }
                None => {
                    debug!("Instance {} is not live, scanning archetype {}", id, request.agent_type);
                }
            }
        }

        self.handle_archetype(requester, request.agent_type);
    }

    fn handle_archetype(&mut self, requester: RequesterId, key: AgentTypeKey) {
        if let Err(e) = self
            .orchestrator
            .validate_archetype(&key, self.simulation.as_ref())
        {
            self.stats.rejected += 1;
            warn!("Archetype scan rejected: {}", e);
            return;
        }

        if let Some(result) = self.archetypes.get(&key) {
            self.stats.archetype_cache_hits += 1;
            debug!("Archetype cache hit for {}", key);
            self.deliver(requester, &result);
            return;
        }

        if let Some(pending) = self.pending.get_mut(&key) {
            self.stats.coalesced += 1;
            debug!("Coalescing scan of {} ({} waiting)", key, pending.waiters.len() + 1);
            pending.waiters.push(requester);
            return;
        }

        let guard = match DisposableAgent::instantiate(&self.simulation, &key) {
            Ok(guard) => guard,
            Err(e) => {
                self.stats.computations_failed += 1;
                warn!("Archetype analysis of {} failed: {}", key, e);
                return;
            }
        };

        let Some(completions) = self.completions.upgrade() else {
            warn!("Coordinator queue closed, dropping scan of {}", key);
            return;
        };

        self.stats.computations_started += 1;
        debug!("Scheduling archetype analysis of {}", key);

        let agent = Arc::clone(guard.agent());
        let orchestrator = Arc::clone(&self.orchestrator);
        let workers = self.workers.clone();
        let job_key = key.clone();
        self.ctx.spawn("archetype-analysis", async move {
            let outcome = workers
                .run(move || orchestrator.analyze_capabilities(agent.as_ref()))
                .await;
            let _ = completions.send(Command::Completed { key: job_key, outcome });
        });

        self.pending.insert(
            key,
            PendingScan {
                guard,
                waiters: vec![requester],
            },
        );
    }

    fn handle_completed(&mut self, key: AgentTypeKey, outcome: Result<TraitAccumulator, WorkerError>) {
        let Some(pending) = self.pending.remove(&key) else {
            warn!("Completion for {} with no pending scan", key);
            return;
        };
        let PendingScan { guard, waiters } = pending;
        drop(guard);

        match outcome {
            Ok(acc) => {
                let result = Arc::new(acc);
                self.archetypes.insert(key.clone(), Arc::clone(&result));
                debug!("Archetype {} cached, answering {} requesters", key, waiters.len());
                for requester in waiters {
                    self.deliver(requester, &result);
                }
            }
            Err(e) => {
                self.stats.computations_failed += 1;
                warn!(
                    "Archetype analysis of {} failed: {} ({} requesters unanswered)",
                    key,
                    e,
                    waiters.len()
                );
            }
        }
    }

    fn clear_caches(&mut self) {
        info!(
            "Clearing scan caches ({} archetypes, {} instances)",
            self.archetypes.len(),
            self.instances.len()
        );
        self.archetypes.clear();
        self.instances.clear();
        self.limiter.clear();
    }

    fn deliver(&mut self, requester: RequesterId, result: &TraitAccumulator) {
        let timestamp_ms = self.ctx.now().as_millis() as u64;
        let envelope = match ScanResult::from(result).to_envelope(timestamp_ms) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Failed to encode result for {}: {}", result.agent_type(), e);
                return;
            }
        };
        match self.sink.on_scan_result(requester, envelope) {
            Ok(()) => self.stats.results_delivered += 1,
            Err(e) => warn!("Failed to deliver result to {}: {}", requester, e),
        }
    }

    fn snapshot(&self) -> CoordinatorStats {
        CoordinatorStats {
            cached_archetypes: self.archetypes.len(),
            cached_instances: self.instances.len(),
            pending: self.pending.len(),
            ..self.stats.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Agent, AgentCategory, AgentRef, Attribute, StaticAgent};
    use crate::catalog::TraitCatalog;
    use crate::classes;
    use crate::config::EngineConfig;
    use crate::naming::EntityNames;
    use crate::registry::InspectorRegistry;
    use crate::builtin::register_builtin_inspectors;
    use crate::unit::{ClassRef, UnitClass, UnitObject};
    use ethology_env::{InstanceId, ResultEnvelope, TokioContext};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    struct Farm {
        mob: ClassRef,
        float: ClassRef,
        created: AtomicUsize,
        disposed: AtomicUsize,
        failures_left: AtomicUsize,
        live: Mutex<HashMap<InstanceId, AgentRef>>,
    }

    impl Farm {
        fn new() -> Self {
            let living = UnitClass::builder(classes::LIVING_ENTITY).build();
            let goal = UnitClass::builder(classes::GOAL).build();
            Self {
                mob: UnitClass::leaf(classes::MOB, &living),
                float: UnitClass::leaf(classes::FLOAT_GOAL, &goal),
                created: AtomicUsize::new(0),
                disposed: AtomicUsize::new(0),
                failures_left: AtomicUsize::new(0),
                live: Mutex::new(HashMap::new()),
            }
        }

        fn cow(&self, id: InstanceId) -> StaticAgent {
            StaticAgent::builder(AgentTypeKey::parse("cow"), &self.mob)
                .instance_id(id)
                .category(AgentCategory::Creature)
                .attribute(Attribute::MaxHealth, 10.0)
                .goal(0, UnitObject::new(&self.float).into_ref())
                .build()
        }

        fn spawn_live(&self, id: InstanceId) {
            self.spawn_agent(id, Arc::new(self.cow(id)));
        }

        fn spawn_agent(&self, id: InstanceId, agent: AgentRef) {
            self.live.lock().expect("lock").insert(id, agent);
        }
    }

    /// A modded goal whose only field getter throws.
    struct Haunted(UnitObject);

    impl crate::unit::Unit for Haunted {
        fn class(&self) -> &ClassRef {
            self.0.class()
        }

        fn read_field(&self, _field: &crate::unit::FieldHandle) -> Result<crate::unit::Value, crate::error::FieldError> {
            panic!("getter blew up")
        }
    }

    /// An agent whose attribute table blows up mid-analysis.
    struct Cursed(StaticAgent);

    impl Agent for Cursed {
        fn agent_type(&self) -> &AgentTypeKey {
            self.0.agent_type()
        }
        fn instance_id(&self) -> InstanceId {
            self.0.instance_id()
        }
        fn class(&self) -> &ClassRef {
            self.0.class()
        }
        fn category(&self) -> AgentCategory {
            self.0.category()
        }
        fn attribute(&self, _attribute: Attribute) -> Option<f64> {
            panic!("attribute table corrupted")
        }
        fn goals(&self) -> Vec<crate::agent::GoalSlot> {
            self.0.goals()
        }
        fn targets(&self) -> Vec<crate::agent::GoalSlot> {
            self.0.targets()
        }
        fn sensors(&self) -> Vec<String> {
            self.0.sensors()
        }
        fn memories(&self) -> Vec<crate::agent::MemorySlot> {
            self.0.memories()
        }
        fn activities(&self) -> Vec<crate::agent::ActivitySlot> {
            self.0.activities()
        }
        fn navigation(&self) -> crate::agent::Navigation {
            self.0.navigation()
        }
        fn can_summon(&self) -> bool {
            true
        }
    }

    impl Simulation for Farm {
        fn can_instantiate(&self, key: &AgentTypeKey) -> bool {
            key.path() != "marker"
        }

        fn instantiate_disposable(&self, key: &AgentTypeKey) -> Result<AgentRef, EthologyError> {
            if key.path() == "flaky"
                && self
                    .failures_left
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok()
            {
                return Err(EthologyError::instantiation(key, "world not ready"));
            }
            self.created.fetch_add(1, Ordering::SeqCst);
            match key.path() {
                "cursed" => Ok(Arc::new(Cursed(self.cow(InstanceId::from_seed(0))))),
                _ => Ok(Arc::new(self.cow(InstanceId::from_seed(0)))),
            }
        }

        fn dispose(&self, _agent: &AgentRef) {
            self.disposed.fetch_add(1, Ordering::SeqCst);
        }

        fn live_agent(&self, id: InstanceId) -> Option<AgentRef> {
            self.live.lock().expect("lock").get(&id).cloned()
        }
    }

    struct ChannelSink(mpsc::UnboundedSender<(RequesterId, ResultEnvelope)>);

    impl ResultSink for ChannelSink {
        fn on_scan_result(&self, requester: RequesterId, envelope: ResultEnvelope) -> Result<(), EnvError> {
            self.0
                .send((requester, envelope))
                .map_err(|_| EnvError::unreachable(requester))
        }
    }

    fn start(
        config: EngineConfig,
    ) -> (
        CoordinatorHandle,
        Arc<Farm>,
        mpsc::UnboundedReceiver<(RequesterId, ResultEnvelope)>,
    ) {
        let mut registry = InspectorRegistry::new();
        let names = Arc::new(EntityNames::new());
        register_builtin_inspectors(&mut registry, Arc::clone(&names));
        let orchestrator = Arc::new(AnalysisOrchestrator::new(
            Arc::new(config),
            Arc::new(registry),
            Arc::new(TraitCatalog::new()),
            names,
        ));
        let farm = Arc::new(Farm::new());
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = ScanCoordinator::spawn(
            TokioContext::shared(),
            orchestrator,
            farm.clone(),
            Arc::new(ChannelSink(tx)),
        );
        (handle, farm, rx)
    }

    async fn next_result(
        rx: &mut mpsc::UnboundedReceiver<(RequesterId, ResultEnvelope)>,
    ) -> (RequesterId, TraitAccumulator) {
        let (requester, envelope) = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("result in time")
            .expect("sink open");
        let result = ScanResult::from_envelope(&envelope).expect("decodes");
        (requester, result.into())
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_computation() {
        let (handle, farm, mut rx) = start(EngineConfig::default());
        let key = AgentTypeKey::parse("cow");

        for seed in 0..5 {
            handle
                .scan(RequesterId::from_seed(seed), ScanRequest::archetype(key.clone()))
                .expect("queued");
        }

        let mut results = Vec::new();
        for _ in 0..5 {
            results.push(next_result(&mut rx).await);
        }

        assert_eq!(farm.created.load(Ordering::SeqCst), 1);
        assert_eq!(farm.disposed.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|(_, acc)| acc == &results[0].1));
        assert!(results[0].1.has_capability("ethology:vanilla_float"));

        let stats = handle.stats().await.expect("stats");
        assert_eq!(stats.computations_started, 1);
        assert_eq!(stats.coalesced, 4);
        assert_eq!(stats.cached_archetypes, 1);

        // Later requests are served from the cache
        handle
            .scan(RequesterId::from_seed(9), ScanRequest::archetype(key))
            .expect("queued");
        let (requester, _) = next_result(&mut rx).await;
        assert_eq!(requester, RequesterId::from_seed(9));
        assert_eq!(farm.created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_instantiation_is_retried() {
        let (handle, farm, mut rx) = start(EngineConfig::default());
        farm.failures_left.store(1, Ordering::SeqCst);
        let key = AgentTypeKey::parse("flaky");
        let requester = RequesterId::from_seed(1);

        handle.scan(requester, ScanRequest::archetype(key.clone())).expect("queued");
        let stats = handle.stats().await.expect("stats");
        assert_eq!(stats.computations_failed, 1);
        assert_eq!(stats.cached_archetypes, 0);
        assert!(rx.try_recv().is_err());

        handle.scan(requester, ScanRequest::archetype(key)).expect("queued");
        let (_, acc) = next_result(&mut rx).await;
        assert_eq!(acc.agent_type().path(), "flaky");
    }

    #[tokio::test]
    async fn test_worker_panic_still_disposes() {
        let (handle, farm, mut rx) = start(EngineConfig::default());
        let key = AgentTypeKey::parse("cursed");

        handle
            .scan(RequesterId::from_seed(1), ScanRequest::archetype(key))
            .expect("queued");

        let mut stats = handle.stats().await.expect("stats");
        for _ in 0..100 {
            if stats.pending == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            stats = handle.stats().await.expect("stats");
        }

        assert_eq!(stats.pending, 0);
        assert_eq!(stats.computations_failed, 1);
        assert_eq!(stats.cached_archetypes, 0);
        assert_eq!(farm.disposed.load(Ordering::SeqCst), 1);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_instance_scan_uses_live_agent() {
        let (handle, farm, mut rx) = start(EngineConfig::default());
        let id = InstanceId::from_seed(42);
        farm.spawn_live(id);

        handle
            .scan(RequesterId::from_seed(1), ScanRequest::instance(AgentTypeKey::parse("cow"), id))
            .expect("queued");
        let (_, acc) = next_result(&mut rx).await;
        assert_eq!(acc.instance_id(), Some(id));
        assert_eq!(farm.created.load(Ordering::SeqCst), 0);

        let stats = handle.stats().await.expect("stats");
        assert_eq!(stats.instance_scans, 1);
        assert_eq!(stats.cached_instances, 1);
        assert_eq!(stats.cached_archetypes, 0);
    }

    #[tokio::test]
    async fn test_missing_instance_falls_back_to_archetype() {
        let (handle, farm, mut rx) = start(EngineConfig::default());
        handle
            .scan(
                RequesterId::from_seed(1),
                ScanRequest::instance(AgentTypeKey::parse("cow"), InstanceId::from_seed(5)),
            )
            .expect("queued");

        let (_, acc) = next_result(&mut rx).await;
        assert_eq!(acc.instance_id(), None);
        assert_eq!(farm.created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rate_limited_requests_are_dropped() {
        let (handle, _farm, mut rx) = start(EngineConfig::default().with_rate_limit(2, 0.001));
        let requester = RequesterId::from_seed(1);
        for _ in 0..4 {
            handle
                .scan(requester, ScanRequest::archetype(AgentTypeKey::parse("cow")))
                .expect("queued");
        }

        next_result(&mut rx).await;
        next_result(&mut rx).await;
        let stats = handle.stats().await.expect("stats");
        assert_eq!(stats.rate_limited, 2);
        assert_eq!(stats.results_delivered, 2);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_rejected_types_get_nothing() {
        let (handle, farm, _rx) = start(EngineConfig::default().with_deny_list(["cow"]));
        let requester = RequesterId::from_seed(1);
        handle
            .scan(requester, ScanRequest::archetype(AgentTypeKey::parse("cow")))
            .expect("queued");
        handle
            .scan(requester, ScanRequest::archetype(AgentTypeKey::parse("marker")))
            .expect("queued");

        let stats = handle.stats().await.expect("stats");
        assert_eq!(stats.rejected, 2);
        assert_eq!(farm.created.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_clear_caches_forces_recomputation() {
        let (handle, farm, mut rx) = start(EngineConfig::default());
        let link = handle.sender_for(RequesterId::from_seed(3));
        let key = AgentTypeKey::parse("cow");

        link.send_request(ScanRequest::archetype(key.clone())).expect("queued");
        next_result(&mut rx).await;
        handle.clear_caches().expect("queued");
        link.send_request(ScanRequest::archetype(key)).expect("queued");
        next_result(&mut rx).await;

        assert_eq!(farm.created.load(Ordering::SeqCst), 2);
        assert_eq!(farm.disposed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_panicking_live_agent_keeps_coordinator_running() {
        let (handle, farm, mut rx) = start(EngineConfig::default());
        let id = InstanceId::from_seed(13);
        farm.spawn_agent(id, Arc::new(Cursed(farm.cow(id))));

        handle
            .scan(RequesterId::from_seed(1), ScanRequest::instance(AgentTypeKey::parse("cow"), id))
            .expect("queued");
        let stats = handle.stats().await.expect("coordinator still answers");
        assert_eq!(stats.instance_failures, 1);
        assert_eq!(stats.cached_instances, 0);
        assert!(rx.try_recv().is_err());

        handle
            .scan(RequesterId::from_seed(2), ScanRequest::archetype(AgentTypeKey::parse("cow")))
            .expect("queued");
        let (requester, acc) = next_result(&mut rx).await;
        assert_eq!(requester, RequesterId::from_seed(2));
        assert!(acc.has_capability("ethology:vanilla_float"));
    }

    #[tokio::test]
    async fn test_panicking_unit_field_still_answers() {
        let (handle, farm, mut rx) = start(EngineConfig::default());
        let goal = UnitClass::builder(classes::GOAL).build();
        let weird = UnitClass::builder("mod.WeirdGoal")
            .extends(&goal)
            .field("inner", crate::unit::ValueKind::Unit)
            .build();
        let id = InstanceId::from_seed(21);
        let agent = StaticAgent::builder(AgentTypeKey::parse("cow"), &farm.mob)
            .instance_id(id)
            .goal(0, Arc::new(Haunted(UnitObject::new(&weird))))
            .goal(1, UnitObject::new(&farm.float).into_ref())
            .build();
        farm.spawn_agent(id, Arc::new(agent));

        handle
            .scan(RequesterId::from_seed(1), ScanRequest::instance(AgentTypeKey::parse("cow"), id))
            .expect("queued");
        let (_, acc) = next_result(&mut rx).await;
        assert_eq!(acc.instance_id(), Some(id));
        assert!(acc.has_capability("ethology:vanilla_float"));

        let stats = handle.stats().await.expect("stats");
        assert_eq!(stats.instance_failures, 0);
    }

    #[tokio::test]
    async fn test_fresh_instance_is_served_without_recomputation() {
        let window = Duration::from_millis(200);
        let (handle, farm, mut rx) = start(EngineConfig::default().with_instance_freshness(window));
        let id = InstanceId::from_seed(42);
        farm.spawn_live(id);
        let request = ScanRequest::instance(AgentTypeKey::parse("cow"), id);
        let requester = RequesterId::from_seed(1);

        handle.scan(requester, request.clone()).expect("queued");
        let (_, first) = next_result(&mut rx).await;
        handle.scan(requester, request.clone()).expect("queued");
        let (_, second) = next_result(&mut rx).await;
        assert_eq!(first, second);

        let stats = handle.stats().await.expect("stats");
        assert_eq!(stats.instance_scans, 1);
        assert_eq!(stats.instance_cache_hits, 1);

        tokio::time::sleep(window + Duration::from_millis(50)).await;
        handle.scan(requester, request).expect("queued");
        next_result(&mut rx).await;
        let stats = handle.stats().await.expect("stats");
        assert_eq!(stats.instance_scans, 2);
        assert_eq!(stats.instance_cache_hits, 1);
    }

    #[tokio::test]
    async fn test_instance_tier_stays_bounded() {
        let window = Duration::from_millis(50);
        let (handle, farm, mut rx) = start(
            EngineConfig::default()
                .with_instance_freshness(window)
                .with_rate_limit(100, 100.0),
        );
        let requester = RequesterId::from_seed(1);
        for seed in 0..10 {
            let id = InstanceId::from_seed(seed);
            farm.spawn_live(id);
            handle
                .scan(requester, ScanRequest::instance(AgentTypeKey::parse("cow"), id))
                .expect("queued");
            next_result(&mut rx).await;
        }
        assert_eq!(handle.stats().await.expect("stats").cached_instances, 10);

        tokio::time::sleep(window + Duration::from_millis(30)).await;
        let id = InstanceId::from_seed(99);
        farm.spawn_live(id);
        handle
            .scan(requester, ScanRequest::instance(AgentTypeKey::parse("cow"), id))
            .expect("queued");
        next_result(&mut rx).await;

        // Stale entries went out with the next insert
        assert_eq!(handle.stats().await.expect("stats").cached_instances, 1);
    }
}
