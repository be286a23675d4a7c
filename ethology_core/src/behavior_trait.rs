//! Display-ready descriptions of one capability or current state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Which analyzer produced a trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TraitCategory {
    Goal,
    Sensor,
    Memory,
    Activity,
    Stat,
}

impl TraitCategory {
    /// Lowercase name used in catalog files and translation keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            TraitCategory::Goal => "goal",
            TraitCategory::Sensor => "sensor",
            TraitCategory::Memory => "memory",
            TraitCategory::Activity => "activity",
            TraitCategory::Stat => "stat",
        }
    }

    /// Parses a catalog type name, case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "goal" => Some(TraitCategory::Goal),
            "sensor" => Some(TraitCategory::Sensor),
            "memory" => Some(TraitCategory::Memory),
            "activity" => Some(TraitCategory::Activity),
            "stat" => Some(TraitCategory::Stat),
            _ => None,
        }
    }
}

impl fmt::Display for TraitCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classified trait.
///
/// Identity is the `key` alone: two traits with the same key are the same
/// trait even if their arguments differ. Accumulators rely on this for
/// deduplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorTrait {
    /// Namespaced identifier, e.g. `ethology:vanilla_tempt`
    pub key: String,
    /// Item id used as the trait's icon
    pub icon: String,
    pub translation_key: String,
    /// Arguments substituted into the translated text
    pub args: Vec<String>,
    pub category: TraitCategory,
}

impl BehaviorTrait {
    pub fn new(key: &str, icon: &str, translation_key: &str, category: TraitCategory) -> Self {
        Self {
            key: key.to_string(),
            icon: icon.to_string(),
            translation_key: translation_key.to_string(),
            args: Vec::new(),
            category,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

impl PartialEq for BehaviorTrait {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for BehaviorTrait {}

impl Hash for BehaviorTrait {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Display for BehaviorTrait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            write!(f, "{}", self.key)
        } else {
            write!(f, "{}({})", self.key, self.args.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_identity_is_key_only() {
        let a = BehaviorTrait::new("ethology:vanilla_tempt", "minecraft:wheat", "t", TraitCategory::Goal)
            .with_arg("Wheat");
        let b = BehaviorTrait::new("ethology:vanilla_tempt", "minecraft:carrot", "u", TraitCategory::Stat)
            .with_arg("Carrot");
        assert_eq!(a, b);

        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_category_parse() {
        assert_eq!(TraitCategory::parse("GOAL"), Some(TraitCategory::Goal));
        assert_eq!(TraitCategory::parse("activity"), Some(TraitCategory::Activity));
        assert_eq!(TraitCategory::parse("behavior"), None);
    }
}
