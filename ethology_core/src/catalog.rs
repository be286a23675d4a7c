//! Externally supplied trait definitions.
//!
//! The catalog maps classifier keys to display metadata. Its content is data
//! (JSON), loaded once and replaced wholesale on reload: readers clone an
//! `Arc` to one immutable snapshot and never observe a half-loaded catalog.
//!
//! # Format
//!
//! ```json
//! {
//!   "ethology:tempted": { "type": "goal", "target": "ai.goal.TemptGoal", "icon": "minecraft:wheat" },
//!   "ethology:works":   { "type": "activity", "target": "work", "icon": "minecraft:emerald",
//!                         "translation_key": "ethology.trait.activity.working" },
//!   "ethology:unknown": { "type": "fallback", "target": "unknown", "icon": "minecraft:barrier" }
//! }
//! ```
//!
//! The object key is the trait key. A missing `translation_key` defaults to
//! `ethology.trait.<type>.<path of the trait key>`.

use crate::behavior_trait::{BehaviorTrait, TraitCategory};
use crate::error::EthologyError;
use crate::registry::ClassifierKey;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{info, warn};

/// Icon used when a definition names none.
pub const MISSING_ICON: &str = "minecraft:barrier";

/// Display metadata for one classifier key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraitTemplate {
    pub key: String,
    pub icon: String,
    pub translation_key: String,
    pub category: TraitCategory,
}

impl TraitTemplate {
    pub fn new(key: &str, icon: &str, translation_key: &str, category: TraitCategory) -> Self {
        Self {
            key: key.to_string(),
            icon: icon.to_string(),
            translation_key: translation_key.to_string(),
            category,
        }
    }

    /// A trait with no arguments.
    pub fn instantiate(&self) -> BehaviorTrait {
        BehaviorTrait::new(&self.key, &self.icon, &self.translation_key, self.category)
    }

    pub fn instantiate_with<I, S>(&self, args: I) -> BehaviorTrait
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.instantiate().with_args(args)
    }
}

#[derive(Debug, Deserialize)]
struct Definition {
    #[serde(rename = "type")]
    kind: String,
    target: String,
    #[serde(default)]
    icon: Option<String>,
    #[serde(default)]
    translation_key: Option<String>,
}

/// One immutable catalog generation.
#[derive(Debug, Default, Clone)]
pub struct CatalogSnapshot {
    templates: HashMap<ClassifierKey, TraitTemplate>,
}

impl CatalogSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses definitions from JSON.
    ///
    /// Malformed JSON fails the whole load; a single definition with an
    /// unknown type is logged and skipped.
    pub fn from_json(json: &str) -> Result<Self, EthologyError> {
        let definitions: BTreeMap<String, Definition> =
            serde_json::from_str(json).map_err(|e| EthologyError::Catalog(e.to_string()))?;

        let mut snapshot = Self::new();
        for (trait_key, definition) in definitions {
            match parse_definition(&trait_key, &definition) {
                Some((key, template)) => snapshot.insert(key, template),
                None => warn!(
                    "Skipping trait definition {}: unknown type '{}'",
                    trait_key, definition.kind
                ),
            }
        }
        Ok(snapshot)
    }

    pub fn insert(&mut self, key: ClassifierKey, template: TraitTemplate) {
        self.templates.insert(key, template);
    }

    pub fn with(mut self, key: ClassifierKey, template: TraitTemplate) -> Self {
        self.insert(key, template);
        self
    }

    pub fn get(&self, key: &ClassifierKey) -> Option<&TraitTemplate> {
        self.templates.get(key)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

fn parse_definition(trait_key: &str, definition: &Definition) -> Option<(ClassifierKey, TraitTemplate)> {
    let kind = definition.kind.to_ascii_lowercase();
    let (key, category) = match kind.as_str() {
        "goal" => (ClassifierKey::unit_type(&definition.target), TraitCategory::Goal),
        "sensor" => (ClassifierKey::sensor(&definition.target), TraitCategory::Sensor),
        "memory" => (ClassifierKey::memory(&definition.target), TraitCategory::Memory),
        "activity" => (ClassifierKey::activity(&definition.target), TraitCategory::Activity),
        "fallback" => (ClassifierKey::fallback(&definition.target), TraitCategory::Goal),
        _ => return None,
    };

    let path = trait_key.rsplit(':').next().unwrap_or(trait_key);
    let translation_key = definition
        .translation_key
        .clone()
        .unwrap_or_else(|| format!("ethology.trait.{}.{}", category, path));
    let icon = definition
        .icon
        .clone()
        .filter(|icon| !icon.is_empty())
        .unwrap_or_else(|| MISSING_ICON.to_string());

    Some((
        key,
        TraitTemplate {
            key: trait_key.to_string(),
            icon,
            translation_key,
            category,
        },
    ))
}

/// Hot-reloadable catalog shared across the engine.
#[derive(Debug, Default)]
pub struct TraitCatalog {
    current: RwLock<Arc<CatalogSnapshot>>,
}

impl TraitCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: CatalogSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, EthologyError> {
        let catalog = Self::new();
        catalog.reload_json(json)?;
        Ok(catalog)
    }

    /// The current generation. Holders keep it alive across reloads.
    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*current)
    }

    pub fn lookup(&self, key: &ClassifierKey) -> Option<TraitTemplate> {
        self.snapshot().get(key).cloned()
    }

    /// Atomically replaces the whole catalog. Returns the number of entries.
    pub fn reload(&self, snapshot: CatalogSnapshot) -> usize {
        let count = snapshot.len();
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(snapshot);
        info!("Loaded {} Ethology traits", count);
        count
    }

    /// Parses and installs new definitions. On error the old catalog stays.
    pub fn reload_json(&self, json: &str) -> Result<usize, EthologyError> {
        let snapshot = CatalogSnapshot::from_json(json)?;
        Ok(self.reload(snapshot))
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}
