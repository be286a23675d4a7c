//! Classifier keys and the inspector registry.
//!
//! A classifier key names "something that can be classified": a unit class,
//! a perception unit id, a memory id or an activity id. The same key space
//! indexes both the registry (code) and the catalog (data).

use crate::agent::MemoryValue;
use crate::behavior_trait::BehaviorTrait;
use crate::error::InspectError;
use crate::unit::{Unit, UnitClass};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

/// Key into the inspector registry and the trait catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClassifierKey {
    /// Unit class name; lookups walk the ancestry
    UnitType(String),
    Sensor(String),
    Memory(String),
    Activity(String),
    /// Engine-owned fallback templates, e.g. `unknown`
    Fallback(String),
}

impl ClassifierKey {
    pub fn unit_type(class_name: &str) -> Self {
        ClassifierKey::UnitType(class_name.to_string())
    }

    pub fn sensor(id: &str) -> Self {
        ClassifierKey::Sensor(namespaced(id))
    }

    pub fn memory(id: &str) -> Self {
        ClassifierKey::Memory(namespaced(id))
    }

    pub fn activity(id: &str) -> Self {
        ClassifierKey::Activity(namespaced(id))
    }

    pub fn fallback(name: &str) -> Self {
        ClassifierKey::Fallback(name.to_string())
    }
}

impl fmt::Display for ClassifierKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifierKey::UnitType(name) => write!(f, "unit:{}", name),
            ClassifierKey::Sensor(id) => write!(f, "sensor:{}", id),
            ClassifierKey::Memory(id) => write!(f, "memory:{}", id),
            ClassifierKey::Activity(id) => write!(f, "activity:{}", id),
            ClassifierKey::Fallback(name) => write!(f, "fallback:{}", name),
        }
    }
}

/// Ids without a namespace belong to `minecraft`.
pub(crate) fn namespaced(id: &str) -> String {
    if id.contains(':') {
        id.to_string()
    } else {
        format!("minecraft:{}", id)
    }
}

/// What an inspector is asked to classify.
#[derive(Clone, Copy)]
pub enum Subject<'a> {
    Unit(&'a dyn Unit),
    Sensor { id: &'a str },
    Memory { id: &'a str, value: Option<&'a MemoryValue> },
    Activity { id: &'a str },
}

impl<'a> Subject<'a> {
    pub fn as_unit(&self) -> Result<&'a dyn Unit, InspectError> {
        match self {
            Subject::Unit(unit) => Ok(*unit),
            other => Err(InspectError::WrongSubject(other.describe())),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Subject::Unit(unit) => format!("unit {}", unit.class().name()),
            Subject::Sensor { id } => format!("sensor {}", id),
            Subject::Memory { id, .. } => format!("memory {}", id),
            Subject::Activity { id } => format!("activity {}", id),
        }
    }
}

impl fmt::Debug for Subject<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// A typed classification function.
///
/// `Ok(None)` means "recognized, but nothing to report".
pub type Inspector =
    Arc<dyn Fn(&Subject<'_>) -> Result<Option<BehaviorTrait>, InspectError> + Send + Sync>;

/// Wraps a closure as an `Inspector`.
pub fn inspector<F>(f: F) -> Inspector
where
    F: Fn(&Subject<'_>) -> Result<Option<BehaviorTrait>, InspectError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Runs one inspector with failures isolated to this subject.
///
/// Errors and panics are logged and reported as "no trait".
pub fn invoke(inspector: &Inspector, subject: &Subject<'_>) -> Option<BehaviorTrait> {
    let outcome = catch_unwind(AssertUnwindSafe(|| inspector(subject)))
        .unwrap_or_else(|payload| Err(InspectError::Panicked(panic_message(payload.as_ref()))));
    match outcome {
        Ok(found) => found,
        Err(e) => {
            warn!("Inspector failed on {}: {}", subject.describe(), e);
            None
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Registered inspectors, populated during initialization and then shared
/// read-only behind an `Arc`.
#[derive(Default, Clone)]
pub struct InspectorRegistry {
    inspectors: HashMap<ClassifierKey, Inspector>,
}

impl InspectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an inspector, replacing any previous one for `key`.
    pub fn register(&mut self, key: ClassifierKey, inspector: Inspector) {
        debug!("Registered inspector for {}", key);
        self.inspectors.insert(key, inspector);
    }

    /// Convenience for registering a closure.
    pub fn register_fn<F>(&mut self, key: ClassifierKey, f: F)
    where
        F: Fn(&Subject<'_>) -> Result<Option<BehaviorTrait>, InspectError> + Send + Sync + 'static,
    {
        self.register(key, inspector(f));
    }

    /// Exact lookup.
    pub fn lookup(&self, key: &ClassifierKey) -> Option<&Inspector> {
        self.inspectors.get(key)
    }

    /// Most derived registered ancestor of `class`, with its name.
    pub fn lookup_unit<'c>(&self, class: &'c UnitClass) -> Option<(&'c str, &Inspector)> {
        class.ancestry().find_map(|c| {
            self.inspectors
                .get(&ClassifierKey::unit_type(c.name()))
                .map(|inspector| (c.name(), inspector))
        })
    }

    pub fn len(&self) -> usize {
        self.inspectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inspectors.is_empty()
    }
}

impl fmt::Debug for InspectorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InspectorRegistry")
            .field("inspectors", &self.inspectors.len())
            .finish()
    }
}
