//! Fallback classification for unit classes nobody registered.
//!
//! Most plugin units are variations on a handful of themes: they tempt or
//! use an item, or they target some kind of agent. The heuristics here look
//! for fields holding items or agent classes and turn them into a generic
//! trait naming what was found.

use crate::behavior_trait::{BehaviorTrait, TraitCategory};
use crate::catalog::TraitCatalog;
use crate::classes;
use crate::naming::EntityNames;
use crate::reflection::FieldScanner;
use crate::registry::ClassifierKey;
use crate::unit::{Unit, Value, ValueKind};
use std::sync::Arc;
use tracing::trace;

pub const GENERIC_INTERACT_KEY: &str = "ethology:generic_interact";
pub const GENERIC_TARGET_KEY: &str = "ethology:generic_target";

/// Catalog fallback consulted in debug-unknown mode.
pub const UNKNOWN_FALLBACK: &str = "unknown";

/// At most this many distinct names are reported per trait.
const MAX_ARGS: usize = 3;

#[derive(Debug, Clone)]
pub struct GenericHeuristicInspector {
    scanner: Arc<FieldScanner>,
    names: Arc<EntityNames>,
    catalog: Arc<TraitCatalog>,
    debug_unknown: bool,
}

impl GenericHeuristicInspector {
    pub fn new(scanner: Arc<FieldScanner>, names: Arc<EntityNames>, catalog: Arc<TraitCatalog>) -> Self {
        Self {
            scanner,
            names,
            catalog,
            debug_unknown: false,
        }
    }

    /// Reports unclassifiable units through the catalog's "unknown" template.
    pub fn with_debug_unknown(mut self, enabled: bool) -> Self {
        self.debug_unknown = enabled;
        self
    }

    /// Classifies a leaf unit. First matching heuristic wins.
    pub fn inspect(&self, unit: &dyn Unit) -> Option<BehaviorTrait> {
        let items = self.scan_items(unit);
        if !items.is_empty() {
            return Some(
                BehaviorTrait::new(
                    GENERIC_INTERACT_KEY,
                    "minecraft:spyglass",
                    "ethology.trait.goal.generic_interact",
                    TraitCategory::Goal,
                )
                .with_args(items),
            );
        }

        let targets = self.scan_targets(unit);
        if !targets.is_empty() {
            return Some(
                BehaviorTrait::new(
                    GENERIC_TARGET_KEY,
                    "minecraft:target",
                    "ethology.trait.goal.generic_target",
                    TraitCategory::Goal,
                )
                .with_args(targets),
            );
        }

        if self.debug_unknown {
            return self.unknown(unit);
        }
        trace!("No heuristic matched {}", unit.class().name());
        None
    }

    fn scan_items(&self, unit: &dyn Unit) -> Vec<String> {
        let selectors = self
            .scanner
            .find_all(unit, ValueKind::ItemSelector)
            .into_iter()
            .filter_map(|value| match value {
                Value::ItemSelector(selector) => {
                    selector.representative().map(|stack| stack.hover_name().to_string())
                }
                _ => None,
            });

        let items = self
            .scanner
            .find_all(unit, ValueKind::Item)
            .into_iter()
            .filter_map(|value| match value {
                Value::Item(item) if !item.is_air() => Some(item.display_name),
                _ => None,
            });

        let stacks = self
            .scanner
            .find_all(unit, ValueKind::ItemStack)
            .into_iter()
            .filter_map(|value| match value {
                Value::ItemStack(stack) if !stack.is_empty() => Some(stack.hover_name().to_string()),
                _ => None,
            });

        distinct_limited(selectors.chain(items).chain(stacks))
    }

    fn scan_targets(&self, unit: &dyn Unit) -> Vec<String> {
        let names = self
            .scanner
            .find_all(unit, ValueKind::Class)
            .into_iter()
            .filter_map(|value| match value {
                Value::Class(class) if class.is_a(classes::LIVING_ENTITY) => {
                    Some(self.names.name_for(&class))
                }
                _ => None,
            });
        distinct_limited(names)
    }

    fn unknown(&self, unit: &dyn Unit) -> Option<BehaviorTrait> {
        let template = self
            .catalog
            .lookup(&ClassifierKey::fallback(UNKNOWN_FALLBACK))?;
        Some(template.instantiate_with([unit.class().simple_name()]))
    }
}

fn distinct_limited(names: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(MAX_ARGS);
    for name in names {
        if out.len() == MAX_ARGS {
            break;
        }
        if !out.contains(&name) {
            out.push(name);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogSnapshot, TraitTemplate};
    use crate::items::{ItemRef, ItemSelector, ItemStack};
    use crate::unit::{ClassRef, UnitClass, UnitObject};

    struct Fixture {
        living: ClassRef,
        goal: ClassRef,
        inspector: GenericHeuristicInspector,
    }

    fn fixture(catalog: TraitCatalog) -> Fixture {
        let living = UnitClass::builder(classes::LIVING_ENTITY).build();
        let cow = UnitClass::leaf("entity.animal.Cow", &living);
        let goal = UnitClass::builder("mod.ai.CustomGoal")
            .field("lure", ValueKind::ItemSelector)
            .field("held", ValueKind::Item)
            .field("drop", ValueKind::ItemStack)
            .field("extra", ValueKind::Item)
            .field("prey", ValueKind::Class)
            .field("other_prey", ValueKind::Class)
            .build();
        let names = EntityNames::new().with(&cow, "Cow");
        let inspector = GenericHeuristicInspector::new(
            Arc::new(FieldScanner::new()),
            Arc::new(names),
            Arc::new(catalog),
        );
        Fixture {
            living,
            goal,
            inspector,
        }
    }

    #[test]
    fn test_item_affinity_collects_distinct_names() {
        let f = fixture(TraitCatalog::new());
        let unit = UnitObject::new(&f.goal)
            .with(
                "lure",
                Value::ItemSelector(ItemSelector::any_of([
                    ItemRef::new("minecraft:wheat", "Wheat"),
                    ItemRef::new("minecraft:carrot", "Carrot"),
                ])),
            )
            .with("held", Value::Item(ItemRef::new("minecraft:wheat", "Wheat")))
            .with("extra", Value::Item(ItemRef::air()))
            .with("drop", Value::ItemStack(ItemStack::of(ItemRef::new("minecraft:egg", "Egg"))));

        let t = f.inspector.inspect(&unit).expect("items found");
        assert_eq!(t.key, GENERIC_INTERACT_KEY);
        assert_eq!(t.icon, "minecraft:spyglass");
        assert_eq!(t.args, vec!["Wheat", "Egg"]);
    }

    #[test]
    fn test_entity_affinity_names_living_classes() {
        let f = fixture(TraitCatalog::new());
        let squid = UnitClass::leaf("mod.GlowSquidEntity", &f.living);
        let unit = UnitObject::new(&f.goal)
            .with("prey", Value::Class(Arc::clone(&squid)))
            .with("other_prey", Value::Class(UnitClass::builder("world.Block").build()));

        let t = f.inspector.inspect(&unit).expect("target found");
        assert_eq!(t.key, GENERIC_TARGET_KEY);
        // Non-living classes are ignored
        assert_eq!(t.args, vec!["GlowSquid"]);
    }

    #[test]
    fn test_items_take_precedence_over_targets() {
        let f = fixture(TraitCatalog::new());
        let unit = UnitObject::new(&f.goal)
            .with("prey", Value::Class(Arc::clone(&f.living)))
            .with("held", Value::Item(ItemRef::new("minecraft:bone", "Bone")));
        assert_eq!(f.inspector.inspect(&unit).map(|t| t.key), Some(GENERIC_INTERACT_KEY.to_string()));
    }

    #[test]
    fn test_args_capped_at_three() {
        let f = fixture(TraitCatalog::new());
        let unit = UnitObject::new(&f.goal)
            .with(
                "lure",
                Value::ItemSelector(ItemSelector::any_of([ItemRef::new("minecraft:a", "A")])),
            )
            .with("held", Value::Item(ItemRef::new("minecraft:b", "B")))
            .with("extra", Value::Item(ItemRef::new("minecraft:c", "C")))
            .with("drop", Value::ItemStack(ItemStack::of(ItemRef::new("minecraft:d", "D"))));
        assert_eq!(f.inspector.inspect(&unit).map(|t| t.args.len()), Some(3));
    }

    #[test]
    fn test_debug_unknown_uses_catalog_template() {
        let catalog = TraitCatalog::from_snapshot(CatalogSnapshot::new().with(
            ClassifierKey::fallback(UNKNOWN_FALLBACK),
            TraitTemplate::new("ethology:unknown", "minecraft:barrier", "ethology.trait.goal.unknown", TraitCategory::Goal),
        ));
        let f = fixture(catalog);
        let unit = UnitObject::new(&f.goal);

        assert!(f.inspector.inspect(&unit).is_none());

        let debug = f.inspector.clone().with_debug_unknown(true);
        let t = debug.inspect(&unit).expect("unknown trait");
        assert_eq!(t.key, "ethology:unknown");
        assert_eq!(t.args, vec!["CustomGoal"]);
    }

    #[test]
    fn test_debug_unknown_without_template_emits_nothing() {
        let f = fixture(TraitCatalog::new());
        let debug = f.inspector.clone().with_debug_unknown(true);
        assert!(debug.inspect(&UnitObject::new(&f.goal)).is_none());
    }
}
