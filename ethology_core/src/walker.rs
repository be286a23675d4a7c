//! Recursive, cycle-safe traversal of a unit graph.
//!
//! Plugins love to wrap units: a priority wrapper around a conditional
//! wrapper around a sequence of the units that actually do something. The
//! walker peels these layers off and classifies only the leaves.
//!
//! Per node, in order:
//! 1. explicit wrapper: recurse into the nested unit, no trait for the wrapper
//! 2. nearest registered match over the class ancestry (registry inspector,
//!    then catalog template, at each level): terminal
//! 3. composite probe: recurse into units held in fields or collections
//! 4. generic heuristics
//!
//! Each unit is visited at most once per walk, so cyclic graphs terminate.

use crate::accumulator::{Scope, TraitAccumulator};
use crate::catalog::{CatalogSnapshot, TraitCatalog, TraitTemplate};
use crate::generic::GenericHeuristicInspector;
use crate::reflection::FieldScanner;
use crate::registry::{self, ClassifierKey, Inspector, InspectorRegistry, Subject};
use crate::unit::{identity, Unit, UnitClass, UnitRef, Value, ValueKind};
use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{trace, warn};

/// What the nearest ancestry match resolved to.
enum Match<'a> {
    Registered(&'a Inspector),
    Template(TraitTemplate),
}

#[derive(Debug, Clone)]
pub struct BehaviorGraphWalker {
    registry: Arc<InspectorRegistry>,
    catalog: Arc<TraitCatalog>,
    scanner: Arc<FieldScanner>,
    generic: GenericHeuristicInspector,
}

impl BehaviorGraphWalker {
    pub fn new(
        registry: Arc<InspectorRegistry>,
        catalog: Arc<TraitCatalog>,
        scanner: Arc<FieldScanner>,
        generic: GenericHeuristicInspector,
    ) -> Self {
        Self {
            registry,
            catalog,
            scanner,
            generic,
        }
    }

    /// Classifies every leaf reachable from `root` into `acc` under `scope`.
    pub fn walk(&self, root: &UnitRef, scope: Scope, acc: &mut TraitAccumulator) {
        let mut visited = HashSet::new();
        let catalog = self.catalog.snapshot();
        self.visit(root, scope, acc, &mut visited, &catalog);
    }

    fn visit(
        &self,
        unit: &UnitRef,
        scope: Scope,
        acc: &mut TraitAccumulator,
        visited: &mut HashSet<usize>,
        catalog: &CatalogSnapshot,
    ) {
        if !visited.insert(identity(unit)) {
            trace!("Already visited {}", unit.class().name());
            return;
        }

        if let Some(inner) = unit.nested() {
            self.visit(&inner, scope, acc, visited, catalog);
            return;
        }

        if let Some(found) = self.nearest_match(unit.class(), catalog) {
            let classified = match found {
                Match::Registered(inspector) => {
                    registry::invoke(inspector, &Subject::Unit(unit.as_ref()))
                }
                Match::Template(template) => Some(template.instantiate()),
            };
            if let Some(t) = classified {
                acc.add(scope, t);
            }
            return;
        }

        let children = self.composite_children(unit.as_ref());
        if !children.is_empty() {
            for child in &children {
                self.visit(child, scope, acc, visited, catalog);
            }
            return;
        }

        let generic = catch_unwind(AssertUnwindSafe(|| self.generic.inspect(unit.as_ref())));
        match generic {
            Ok(Some(t)) => acc.add(scope, t),
            Ok(None) => {}
            Err(payload) => warn!(
                "Generic inspection panicked on {}: {}",
                unit.class().name(),
                registry::panic_message(payload.as_ref())
            ),
        }
    }

    fn nearest_match<'a>(&'a self, class: &UnitClass, catalog: &CatalogSnapshot) -> Option<Match<'a>> {
        class.ancestry().find_map(|c| {
            let key = ClassifierKey::unit_type(c.name());
            if let Some(inspector) = self.registry.lookup(&key) {
                return Some(Match::Registered(inspector));
            }
            catalog.get(&key).cloned().map(Match::Template)
        })
    }

    /// Units held directly in fields, or in collections whose first
    /// non-null element is a unit.
    fn composite_children(&self, unit: &dyn Unit) -> Vec<UnitRef> {
        let mut children: Vec<UnitRef> = self
            .scanner
            .find_all(unit, ValueKind::Unit)
            .into_iter()
            .filter_map(|value| match value {
                Value::Unit(child) => Some(child),
                _ => None,
            })
            .collect();

        for value in self.scanner.find_all(unit, ValueKind::Collection) {
            let Some(elements) = value.as_collection() else {
                continue;
            };
            let first = elements.iter().find(|v| !matches!(v, Value::Null));
            if !matches!(first, Some(Value::Unit(_))) {
                continue;
            }
            children.extend(elements.iter().filter_map(|v| v.as_unit().cloned()));
        }
        children
    }
}
