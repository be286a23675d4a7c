//! Client-side scan scheduling and the local result database.
//!
//! The scheduler analyzes locally first so something can be shown right
//! away, then asks the server for the authoritative result. Selections are
//! debounced: browsing quickly through a list only scans where the user
//! stops.

use crate::accumulator::TraitAccumulator;
use crate::agent::Agent;
use crate::cache::InstanceCache;
use crate::codec::ScanResult;
use crate::error::EthologyError;
use crate::orchestrator::AnalysisOrchestrator;
use crate::simulation::Simulation;
use ethology_env::{AgentTypeKey, EthologyContext, InstanceId, RequestSender, ResultEnvelope, ScanRequest};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Last known result per agent type, plus fresh instance results.
#[derive(Debug, Clone)]
pub struct ClientDatabase {
    by_type: HashMap<AgentTypeKey, Arc<TraitAccumulator>>,
    instances: InstanceCache,
    scanned: bool,
}

impl ClientDatabase {
    pub fn new(instance_freshness: Duration) -> Self {
        Self {
            by_type: HashMap::new(),
            instances: InstanceCache::new(instance_freshness),
            scanned: false,
        }
    }

    /// Stores a server result as the latest for its type. Instance results
    /// are also timestamped for the freshness check.
    pub fn register(&mut self, result: TraitAccumulator, now: Duration) {
        let result = Arc::new(result);
        if let Some(id) = result.instance_id() {
            self.instances.insert(id, Arc::clone(&result), now);
        }
        self.by_type.insert(result.agent_type().clone(), result);
    }

    /// Stores a locally computed result for display. Never counts as a
    /// fresh server answer.
    pub fn register_local(&mut self, result: TraitAccumulator) {
        self.by_type.insert(result.agent_type().clone(), Arc::new(result));
    }

    pub fn get(&self, key: &AgentTypeKey) -> Option<Arc<TraitAccumulator>> {
        self.by_type.get(key).cloned()
    }

    pub fn fresh_instance(&self, id: InstanceId, now: Duration) -> Option<Arc<TraitAccumulator>> {
        self.instances.get_fresh(id, now)
    }

    pub fn known_types(&self) -> impl Iterator<Item = &AgentTypeKey> {
        self.by_type.keys()
    }

    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }

    pub fn is_scanned(&self) -> bool {
        self.scanned
    }

    pub fn set_scanned(&mut self, scanned: bool) {
        self.scanned = scanned;
    }

    /// Session teardown.
    pub fn clear(&mut self) {
        self.by_type.clear();
        self.instances.clear();
        self.scanned = false;
    }
}

/// How a targeted scan was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetedScan {
    /// Capabilities came from a fresh cached server result; no request sent
    ServedFromCache,
    /// A request went to the server
    Requested,
}

pub struct ClientScanScheduler<Ctx: EthologyContext> {
    ctx: Arc<Ctx>,
    orchestrator: Arc<AnalysisOrchestrator>,
    local: Arc<dyn Simulation>,
    sender: Arc<dyn RequestSender>,
    database: ClientDatabase,
    debounce: Duration,
    pending: Option<(AgentTypeKey, Duration)>,
    requests_sent: u64,
}

impl<Ctx: EthologyContext> ClientScanScheduler<Ctx> {
    pub fn new(
        ctx: Arc<Ctx>,
        orchestrator: Arc<AnalysisOrchestrator>,
        local: Arc<dyn Simulation>,
        sender: Arc<dyn RequestSender>,
    ) -> Self {
        let config = orchestrator.config();
        let debounce = config.debounce;
        let database = ClientDatabase::new(config.instance_freshness);
        Self {
            ctx,
            orchestrator,
            local,
            sender,
            database,
            debounce,
            pending: None,
            requests_sent: 0,
        }
    }

    /// Marks `key` as selected. Supersedes any selection still waiting out
    /// its quiet interval.
    pub fn select(&mut self, key: AgentTypeKey) {
        debug!("Selected {}, scan deferred", key);
        self.pending = Some((key, self.ctx.now()));
    }

    /// Fires the pending selection once it has been quiet long enough.
    /// Returns the type that was scanned, if any.
    pub fn tick(&mut self) -> Option<AgentTypeKey> {
        let now = self.ctx.now();
        let ready = matches!(&self.pending, Some((_, at)) if now.saturating_sub(*at) >= self.debounce);
        if !ready {
            return None;
        }
        let (key, _) = self.pending.take()?;
        self.scan_archetype(&key);
        Some(key)
    }

    /// Local archetype analysis, then a remote request.
    pub fn scan_archetype(&mut self, key: &AgentTypeKey) {
        if let Some(local) = self.orchestrator.analyze_archetype(key, &self.local) {
            self.database.register_local(local);
        }
        self.request(ScanRequest::archetype(key.clone()));
    }

    /// Scans one live agent.
    ///
    /// States always come from the local analysis. When the server answered
    /// for this instance recently, its capabilities are merged in and no
    /// request is sent.
    pub fn scan_targeted(&mut self, agent: &dyn Agent) -> TargetedScan {
        let now = self.ctx.now();
        let mut local = self.orchestrator.analyze_instance(agent);

        if let Some(cached) = self.database.fresh_instance(agent.instance_id(), now) {
            for t in cached.capabilities() {
                local.add_capability(t.clone());
            }
            debug!("Instance {} served from cache", agent.instance_id());
            self.database.register_local(local);
            return TargetedScan::ServedFromCache;
        }

        self.database.register_local(local);
        self.request(ScanRequest::instance(agent.agent_type().clone(), agent.instance_id()));
        TargetedScan::Requested
    }

    /// Decodes a server result and stores it.
    pub fn on_scan_result(&mut self, envelope: &ResultEnvelope) -> Result<(), EthologyError> {
        let result: TraitAccumulator = ScanResult::from_envelope(envelope)?.into();
        debug!(
            "Received {} traits for {}",
            result.capabilities().len() + result.current_states().len(),
            result.agent_type()
        );
        self.database.register(result, self.ctx.now());
        Ok(())
    }

    pub fn database(&self) -> &ClientDatabase {
        &self.database
    }

    pub fn database_mut(&mut self) -> &mut ClientDatabase {
        &mut self.database
    }

    pub fn pending_selection(&self) -> Option<&AgentTypeKey> {
        self.pending.as_ref().map(|(key, _)| key)
    }

    pub fn requests_sent(&self) -> u64 {
        self.requests_sent
    }

    fn request(&mut self, request: ScanRequest) {
        match self.sender.send_request(request) {
            Ok(()) => self.requests_sent += 1,
            Err(e) => warn!("Failed to send scan request: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentRef, StaticAgent};
    use crate::behavior_trait::{BehaviorTrait, TraitCategory};
    use crate::builtin::register_builtin_inspectors;
    use crate::catalog::TraitCatalog;
    use crate::classes;
    use crate::config::EngineConfig;
    use crate::naming::EntityNames;
    use crate::registry::InspectorRegistry;
    use crate::unit::{ClassRef, UnitClass, UnitObject};
    use async_trait::async_trait;
    use ethology_env::EnvError;
    use std::sync::Mutex;
    use std::time::SystemTime;

    #[derive(Default)]
    struct ManualClock(Mutex<Duration>);

    impl ManualClock {
        fn advance(&self, by: Duration) {
            *self.0.lock().expect("lock") += by;
        }
    }

    #[async_trait]
    impl EthologyContext for ManualClock {
        fn now(&self) -> Duration {
            *self.0.lock().expect("lock")
        }

        fn system_time(&self) -> SystemTime {
            SystemTime::UNIX_EPOCH + self.now()
        }

        async fn sleep(&self, duration: Duration) {
            self.advance(duration);
        }

        fn spawn<F>(&self, _name: &str, future: F)
        where
            F: std::future::Future<Output = ()> + Send + 'static,
        {
            drop(future);
        }
    }

    #[derive(Default)]
    struct Outbox(Mutex<Vec<ScanRequest>>);

    impl RequestSender for Outbox {
        fn send_request(&self, request: ScanRequest) -> Result<(), EnvError> {
            self.0.lock().expect("lock").push(request);
            Ok(())
        }
    }

    struct LocalWorld {
        mob: ClassRef,
        float: ClassRef,
    }

    impl LocalWorld {
        fn new() -> Self {
            let living = UnitClass::builder(classes::LIVING_ENTITY).build();
            let goal = UnitClass::builder(classes::GOAL).build();
            Self {
                mob: UnitClass::leaf(classes::MOB, &living),
                float: UnitClass::leaf(classes::FLOAT_GOAL, &goal),
            }
        }

        fn agent(&self, key: &AgentTypeKey, id: InstanceId) -> StaticAgent {
            StaticAgent::builder(key.clone(), &self.mob)
                .instance_id(id)
                .goal(0, UnitObject::new(&self.float).into_ref())
                .activity("minecraft:idle", true)
                .build()
        }
    }

    impl Simulation for LocalWorld {
        fn can_instantiate(&self, _key: &AgentTypeKey) -> bool {
            true
        }

        fn instantiate_disposable(&self, key: &AgentTypeKey) -> Result<AgentRef, EthologyError> {
            Ok(Arc::new(self.agent(key, InstanceId::from_seed(0))))
        }

        fn dispose(&self, _agent: &AgentRef) {}

        fn live_agent(&self, _id: InstanceId) -> Option<AgentRef> {
            None
        }
    }

    fn scheduler() -> (ClientScanScheduler<ManualClock>, Arc<ManualClock>, Arc<Outbox>, Arc<LocalWorld>) {
        let mut registry = InspectorRegistry::new();
        let names = Arc::new(EntityNames::new());
        register_builtin_inspectors(&mut registry, Arc::clone(&names));
        let orchestrator = Arc::new(AnalysisOrchestrator::new(
            Arc::new(EngineConfig::default()),
            Arc::new(registry),
            Arc::new(TraitCatalog::new()),
            names,
        ));
        let clock = Arc::new(ManualClock::default());
        let outbox = Arc::new(Outbox::default());
        let world = Arc::new(LocalWorld::new());
        let scheduler = ClientScanScheduler::new(Arc::clone(&clock), orchestrator, world.clone(), outbox.clone());
        (scheduler, clock, outbox, world)
    }

    #[test]
    fn test_debounce_sends_only_last_selection() {
        let (mut scheduler, clock, outbox, _) = scheduler();
        let zombie = AgentTypeKey::parse("zombie");
        let skeleton = AgentTypeKey::parse("skeleton");

        scheduler.select(zombie);
        clock.advance(Duration::from_millis(100));
        assert!(scheduler.tick().is_none());
        scheduler.select(skeleton.clone());
        clock.advance(Duration::from_millis(299));
        assert!(scheduler.tick().is_none());
        clock.advance(Duration::from_millis(1));
        assert_eq!(scheduler.tick(), Some(skeleton.clone()));
        assert!(scheduler.tick().is_none());

        let sent = outbox.0.lock().expect("lock");
        assert_eq!(*sent, vec![ScanRequest::archetype(skeleton.clone())]);
        assert!(scheduler.database().get(&skeleton).is_some());
    }

    #[test]
    fn test_fresh_instance_skips_round_trip() {
        let (mut scheduler, clock, outbox, world) = scheduler();
        let key = AgentTypeKey::parse("wolf");
        let id = InstanceId::from_seed(11);
        let agent = world.agent(&key, id);

        assert_eq!(scheduler.scan_targeted(&agent), TargetedScan::Requested);

        // Server answers with an extra capability
        let mut remote = TraitAccumulator::for_instance(key.clone(), id);
        remote.add_capability(BehaviorTrait::new("ethology:server_only", "minecraft:bone", "t.server", TraitCategory::Goal));
        let envelope = ScanResult::from(&remote).to_envelope(0).expect("encodes");
        scheduler.on_scan_result(&envelope).expect("decodes");

        clock.advance(Duration::from_secs(1));
        assert_eq!(scheduler.scan_targeted(&agent), TargetedScan::ServedFromCache);
        let merged = scheduler.database().get(&key).expect("registered");
        assert!(merged.has_capability("ethology:server_only"));
        assert!(merged.has_capability("ethology:vanilla_float"));
        assert_eq!(outbox.0.lock().expect("lock").len(), 1);

        // Past the freshness window the server is asked again
        clock.advance(Duration::from_secs(5));
        assert_eq!(scheduler.scan_targeted(&agent), TargetedScan::Requested);
        assert_eq!(outbox.0.lock().expect("lock").len(), 2);
    }

    #[test]
    fn test_database_clear() {
        let mut db = ClientDatabase::new(Duration::from_secs(5));
        let id = InstanceId::from_seed(1);
        db.register(TraitAccumulator::for_instance(AgentTypeKey::parse("cow"), id), Duration::ZERO);
        db.set_scanned(true);
        assert!(db.fresh_instance(id, Duration::from_secs(1)).is_some());

        db.register_local(TraitAccumulator::for_instance(AgentTypeKey::parse("pig"), InstanceId::from_seed(2)));
        assert!(db.fresh_instance(InstanceId::from_seed(2), Duration::ZERO).is_none());
        assert_eq!(db.len(), 2);

        db.clear();
        assert!(db.is_empty());
        assert!(!db.is_scanned());
        assert!(db.fresh_instance(id, Duration::from_secs(1)).is_none());
    }
}
