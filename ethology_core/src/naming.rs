//! Display names for agent kinds referenced by class descriptor.

use crate::classes;
use crate::unit::{ClassRef, UnitClass};

/// Directory of registered agent kinds, in registration order.
///
/// Resolves a class descriptor found in a unit's fields (e.g. "targets
/// instances of X") to the display name of the first registered agent kind
/// whose base class is X or derives from it.
#[derive(Debug, Default, Clone)]
pub struct EntityNames {
    entries: Vec<(ClassRef, String)>,
}

impl EntityNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, base_class: &ClassRef, display_name: &str) {
        self.entries
            .push((ClassRef::clone(base_class), display_name.to_string()));
    }

    pub fn with(mut self, base_class: &ClassRef, display_name: &str) -> Self {
        self.register(base_class, display_name);
        self
    }

    /// Display name of the first registered kind assignable to `class`.
    pub fn registered_name(&self, class: &UnitClass) -> Option<&str> {
        self.entries
            .iter()
            .find(|(base, _)| base.is_subclass_of(class))
            .map(|(_, name)| name.as_str())
    }

    /// Registered name, else the simple class name without its `Entity` suffix.
    pub fn name_for(&self, class: &UnitClass) -> String {
        self.registered_name(class)
            .map(str::to_string)
            .unwrap_or_else(|| strip_entity_suffix(class.simple_name()).to_string())
    }

    /// Like `name_for`, but any player kind reads as "Players".
    pub fn target_name_for(&self, class: &UnitClass) -> String {
        if class.is_a(classes::PLAYER) {
            return "Players".to_string();
        }
        self.name_for(class)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn strip_entity_suffix(name: &str) -> &str {
    match name.strip_suffix("Entity") {
        Some(stripped) if !stripped.is_empty() => stripped,
        _ => name,
    }
}
