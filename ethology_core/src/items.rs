//! Item references carried by behavior units.
//!
//! Units that tempt, breed, pick up or use things hold on to one of three
//! shapes: a single item, a stack of an item, or a weighted selector over
//! several stacks. The generic inspector reads all three.

use serde::{Deserialize, Serialize};

/// A registered item kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemRef {
    /// Namespaced id, e.g. `minecraft:wheat`
    pub id: String,
    /// Human readable name, e.g. `Wheat`
    pub display_name: String,
}

impl ItemRef {
    /// Id of the empty item.
    pub const AIR: &'static str = "minecraft:air";

    pub fn new(id: &str, display_name: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
        }
    }

    /// The empty item.
    pub fn air() -> Self {
        Self::new(Self::AIR, "Air")
    }

    pub fn is_air(&self) -> bool {
        self.id == Self::AIR
    }
}

/// An item with a count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub item: ItemRef,
    pub count: u32,
}

impl ItemStack {
    pub fn new(item: ItemRef, count: u32) -> Self {
        Self { item, count }
    }

    /// A stack of one.
    pub fn of(item: ItemRef) -> Self {
        Self::new(item, 1)
    }

    /// Empty stacks hold air or nothing at all.
    pub fn is_empty(&self) -> bool {
        self.count == 0 || self.item.is_air()
    }

    /// Name shown when hovering the stack.
    pub fn hover_name(&self) -> &str {
        &self.item.display_name
    }
}

/// A weighted choice over item stacks ("any of these").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSelector {
    entries: Vec<(ItemStack, u32)>,
}

impl ItemSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selector accepting any of the given items with equal weight.
    pub fn any_of(items: impl IntoIterator<Item = ItemRef>) -> Self {
        Self {
            entries: items.into_iter().map(|item| (ItemStack::of(item), 1)).collect(),
        }
    }

    pub fn with_entry(mut self, stack: ItemStack, weight: u32) -> Self {
        self.entries.push((stack, weight));
        self
    }

    /// First concrete (non-empty, non-zero weight) stack.
    pub fn representative(&self) -> Option<&ItemStack> {
        self.entries
            .iter()
            .filter(|(_, weight)| *weight > 0)
            .map(|(stack, _)| stack)
            .find(|stack| !stack.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.representative().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_air_stack_is_empty() {
        assert!(ItemStack::of(ItemRef::air()).is_empty());
        assert!(ItemStack::new(ItemRef::new("minecraft:wheat", "Wheat"), 0).is_empty());
        assert!(!ItemStack::of(ItemRef::new("minecraft:wheat", "Wheat")).is_empty());
    }

    #[test]
    fn test_selector_representative_skips_empty_and_unweighted() {
        let selector = ItemSelector::new()
            .with_entry(ItemStack::of(ItemRef::air()), 5)
            .with_entry(ItemStack::of(ItemRef::new("minecraft:carrot", "Carrot")), 0)
            .with_entry(ItemStack::of(ItemRef::new("minecraft:wheat", "Wheat")), 1);

        assert_eq!(selector.representative().map(|s| s.hover_name()), Some("Wheat"));
        assert!(ItemSelector::new().is_empty());
    }
}
