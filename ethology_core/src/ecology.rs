//! Ecological classification: habitat and temperament stat traits.
//!
//! Hostility is a score over the agent's category, its attack damage and the
//! targeting units it carries:
//!
//! | Signal                                  | Score |
//! |-----------------------------------------|-------|
//! | category is Monster                     | +50   |
//! | attack damage > 0                       | +20   |
//! | nearest-attackable targeting players    | +100  |
//! | nearest-attackable targeting other kinds| +10   |
//! | retaliates when hurt                    | +30   |
//! | defends its village                     | +10   |
//!
//! `>= 80` is hostile, `>= 20` neutral, anything lower passive.

use crate::accumulator::TraitAccumulator;
use crate::agent::{Agent, AgentCategory, Attribute, Navigation};
use crate::behavior_trait::{BehaviorTrait, TraitCategory};
use crate::classes;
use crate::unit::{FieldHandle, UnitRef, ValueKind};
use std::sync::Arc;

pub const HOSTILE_THRESHOLD: i32 = 80;
pub const NEUTRAL_THRESHOLD: i32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Temperament {
    Hostile,
    Neutral,
    Passive,
}

impl Temperament {
    pub fn from_score(score: i32) -> Self {
        if score >= HOSTILE_THRESHOLD {
            Temperament::Hostile
        } else if score >= NEUTRAL_THRESHOLD {
            Temperament::Neutral
        } else {
            Temperament::Passive
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Temperament::Hostile => "hostile",
            Temperament::Neutral => "neutral",
            Temperament::Passive => "passive",
        }
    }

    fn icon(self) -> &'static str {
        match self {
            Temperament::Hostile => "minecraft:iron_sword",
            Temperament::Neutral => "minecraft:shield",
            Temperament::Passive => "minecraft:grass_block",
        }
    }

    pub fn to_trait(self) -> BehaviorTrait {
        stat_trait(self.suffix(), self.icon())
    }
}

/// Adds habitat traits, then exactly one temperament trait (summonable
/// agents only).
pub fn classify(agent: &dyn Agent, acc: &mut TraitAccumulator) {
    let navigation = agent.navigation();
    if navigation.is_aquatic() {
        acc.add_capability(stat_trait("aquatic", "minecraft:water_bucket"));
    }
    if navigation == Navigation::Flying {
        acc.add_capability(stat_trait("aerial", "minecraft:feather"));
    }

    if !agent.can_summon() {
        return;
    }
    let score = hostility_score(agent);
    acc.add_capability(Temperament::from_score(score).to_trait());
}

pub fn hostility_score(agent: &dyn Agent) -> i32 {
    let mut score = 0;

    if agent.category() == AgentCategory::Monster {
        score += 50;
    }
    if agent.attribute(Attribute::AttackDamage).is_some_and(|damage| damage > 0.0) {
        score += 20;
    }

    for slot in agent.targets() {
        score += targeting_score(&slot.unit);
    }
    score
}

/// Hosts wrap scheduled units; bounded so a self-wrapping unit cannot spin.
const MAX_WRAP_DEPTH: usize = 8;

fn unwrapped(unit: &UnitRef) -> UnitRef {
    let mut current = Arc::clone(unit);
    for _ in 0..MAX_WRAP_DEPTH {
        match current.nested() {
            Some(inner) => current = inner,
            None => break,
        }
    }
    current
}

fn targeting_score(unit: &UnitRef) -> i32 {
    let unit = unwrapped(unit);
    let class = unit.class();
    let mut score = 0;

    if class.is_a(classes::NEAREST_ATTACKABLE_TARGET_GOAL) {
        let handle = FieldHandle::new(
            classes::NEAREST_ATTACKABLE_TARGET_GOAL,
            classes::FIELD_TARGET_TYPE,
            ValueKind::Class,
        );
        let targets_players = unit
            .read_field(&handle)
            .ok()
            .and_then(|value| value.as_class().map(|c| c.is_a(classes::PLAYER)))
            .unwrap_or(false);
        score += if targets_players { 100 } else { 10 };
    }
    if class.is_a(classes::HURT_BY_TARGET_GOAL) {
        score += 30;
    }
    if class.is_a(classes::DEFEND_VILLAGE_TARGET_GOAL) {
        score += 10;
    }
    score
}

fn stat_trait(suffix: &str, icon: &str) -> BehaviorTrait {
    BehaviorTrait::new(
        &format!("ethology:classifier_{}", suffix),
        icon,
        &format!("ethology.trait.stat.{}", suffix),
        TraitCategory::Stat,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::StaticAgent;
    use crate::unit::{ClassRef, UnitClass, UnitObject, Value};
    use ethology_env::AgentTypeKey;

    struct Kinds {
        mob: ClassRef,
        player: ClassRef,
        villager: ClassRef,
        nearest: ClassRef,
        hurt_by: ClassRef,
        defend: ClassRef,
    }

    fn kinds() -> Kinds {
        let living = UnitClass::builder(classes::LIVING_ENTITY).build();
        let goal = UnitClass::builder(classes::TARGET_GOAL).build();
        Kinds {
            mob: UnitClass::leaf(classes::MOB, &living),
            player: UnitClass::leaf(classes::PLAYER, &living),
            villager: UnitClass::leaf("entity.npc.Villager", &living),
            nearest: UnitClass::builder(classes::NEAREST_ATTACKABLE_TARGET_GOAL)
                .extends(&goal)
                .field(classes::FIELD_TARGET_TYPE, ValueKind::Class)
                .build(),
            hurt_by: UnitClass::leaf(classes::HURT_BY_TARGET_GOAL, &goal),
            defend: UnitClass::leaf(classes::DEFEND_VILLAGE_TARGET_GOAL, &goal),
        }
    }

    fn temperament_keys(acc: &TraitAccumulator) -> Vec<&str> {
        acc.capabilities()
            .iter()
            .map(|t| t.key.as_str())
            .filter(|k| matches!(*k, "ethology:classifier_hostile" | "ethology:classifier_neutral" | "ethology:classifier_passive"))
            .collect()
    }

    #[test]
    fn test_zombie_is_hostile() {
        let k = kinds();
        let hunts_players = UnitObject::new(&k.nearest)
            .with(classes::FIELD_TARGET_TYPE, Value::Class(k.player.clone()))
            .into_ref();
        let zombie = StaticAgent::builder(AgentTypeKey::parse("zombie"), &k.mob)
            .category(AgentCategory::Monster)
            .attribute(Attribute::AttackDamage, 3.0)
            .target(2, hunts_players)
            .build();

        assert_eq!(hostility_score(&zombie), 170);
        let mut acc = TraitAccumulator::new(AgentTypeKey::parse("zombie"));
        classify(&zombie, &mut acc);
        assert_eq!(temperament_keys(&acc), vec!["ethology:classifier_hostile"]);
    }

    #[test]
    fn test_wolf_is_neutral() {
        let k = kinds();
        let wolf = StaticAgent::builder(AgentTypeKey::parse("wolf"), &k.mob)
            .attribute(Attribute::AttackDamage, 4.0)
            .target(1, UnitObject::new(&k.hurt_by).into_ref())
            .build();
        // 20 (damage) + 30 (retaliates)
        assert_eq!(hostility_score(&wolf), 50);
        assert_eq!(Temperament::from_score(hostility_score(&wolf)), Temperament::Neutral);
    }

    #[test]
    fn test_cow_is_passive() {
        let k = kinds();
        let cow = StaticAgent::builder(AgentTypeKey::parse("cow"), &k.mob).build();
        let mut acc = TraitAccumulator::new(AgentTypeKey::parse("cow"));
        classify(&cow, &mut acc);
        assert_eq!(temperament_keys(&acc), vec!["ethology:classifier_passive"]);
    }

    #[test]
    fn test_golem_mixed_signals() {
        let k = kinds();
        let hunts_mobs = UnitObject::new(&k.nearest)
            .with(classes::FIELD_TARGET_TYPE, Value::Class(k.villager.clone()))
            .into_ref();
        let golem = StaticAgent::builder(AgentTypeKey::parse("iron_golem"), &k.mob)
            .attribute(Attribute::AttackDamage, 15.0)
            .target(1, UnitObject::new(&k.defend).into_ref())
            .target(2, UnitObject::new(&k.hurt_by).into_ref())
            .target(3, hunts_mobs)
            .build();
        // 20 + 10 + 30 + 10
        assert_eq!(hostility_score(&golem), 70);
    }

    #[test]
    fn test_wrapped_targets_are_scored() {
        let k = kinds();
        let wrapper = UnitClass::builder(classes::WRAPPED_GOAL).build();
        let wrapped = UnitObject::new(&wrapper)
            .wrapping(UnitObject::new(&k.hurt_by).into_ref())
            .into_ref();
        let llama = StaticAgent::builder(AgentTypeKey::parse("llama"), &k.mob)
            .target(1, wrapped)
            .build();
        assert_eq!(hostility_score(&llama), 30);
    }

    #[test]
    fn test_thresholds() {
        assert_eq!(Temperament::from_score(80), Temperament::Hostile);
        assert_eq!(Temperament::from_score(79), Temperament::Neutral);
        assert_eq!(Temperament::from_score(20), Temperament::Neutral);
        assert_eq!(Temperament::from_score(19), Temperament::Passive);
    }

    #[test]
    fn test_habitat_traits_and_unsummonable() {
        let k = kinds();
        let dolphin = StaticAgent::builder(AgentTypeKey::parse("dolphin"), &k.mob)
            .navigation(Navigation::Water)
            .summonable(false)
            .build();
        let mut acc = TraitAccumulator::new(AgentTypeKey::parse("dolphin"));
        classify(&dolphin, &mut acc);
        assert!(acc.has_capability("ethology:classifier_aquatic"));
        assert!(temperament_keys(&acc).is_empty());

        let parrot = StaticAgent::builder(AgentTypeKey::parse("parrot"), &k.mob)
            .navigation(Navigation::Flying)
            .build();
        let mut acc = TraitAccumulator::new(AgentTypeKey::parse("parrot"));
        classify(&parrot, &mut acc);
        let keys: Vec<&str> = acc.capabilities().iter().map(|t| t.key.as_str()).collect();
        assert_eq!(keys, vec!["ethology:classifier_aerial", "ethology:classifier_passive"]);
    }
}
