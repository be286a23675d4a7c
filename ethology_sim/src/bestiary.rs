//! Synthetic agent kinds for the harness.
//!
//! A small class hierarchy shaped like a real host's: vanilla goal classes
//! the built-in inspectors know, plus a "wildlife" mod whose units only the
//! catalog or the generic heuristic can classify.

use ethology_core::builtin::{ANGRY_AT_MEMORY, HOME_MEMORY, JOB_SITE_MEMORY, MEETING_POINT_MEMORY, WARDEN_SENSOR};
use ethology_core::classes;
use ethology_core::items::{ItemRef, ItemSelector, ItemStack};
use ethology_core::{
    AgentCategory, Attribute, ClassRef, EntityNames, MemoryValue, Navigation, StaticAgent, UnitClass,
    UnitObject, UnitRef, Value, ValueKind,
};
use ethology_env::{AgentTypeKey, InstanceId};
use nalgebra::Point3;
use std::sync::Arc;
use uuid::Uuid;

/// Modded unit classes.
pub const DEN_GOAL: &str = "wildlife.ai.DenGoal";
pub const FORAGE_GOAL: &str = "wildlife.ai.ForageGoal";
pub const STALK_GOAL: &str = "wildlife.ai.StalkGoal";
pub const PACK_GOAL: &str = "wildlife.ai.PackGoal";
pub const MYSTERY_GOAL: &str = "wildlife.ai.MysteryGoal";

/// Catalog shipped with the harness, in the same format hosts load.
pub const DEFAULT_CATALOG: &str = r#"{
    "ethology:works":      { "type": "activity", "target": "work", "icon": "minecraft:emerald" },
    "ethology:rests":      { "type": "activity", "target": "rest", "icon": "minecraft:red_bed" },
    "ethology:idles":      { "type": "activity", "target": "idle", "icon": "minecraft:clock" },
    "ethology:dens":       { "type": "goal", "target": "wildlife.ai.DenGoal", "icon": "minecraft:spruce_log",
                             "translation_key": "wildlife.trait.dens" },
    "ethology:unknown":    { "type": "fallback", "target": "unknown", "icon": "minecraft:barrier" }
}"#;

/// Kinds the harness world can spawn.
pub const ARCHETYPES: &[&str] = &[
    "zombie",
    "creeper",
    "skeleton",
    "cow",
    "wolf",
    "villager",
    "iron_golem",
    "cod",
    "parrot",
    "warden",
    "wildlife:otter",
    "wildlife:glitch",
    "wildlife:pack_wolf",
];

/// Kinds that exist but can never be instantiated.
pub const MARKERS: &[&str] = &["marker", "area_effect_cloud"];

/// Class descriptors for every kind and unit in the bestiary.
#[derive(Debug, Clone)]
pub struct Classes {
    pub living: ClassRef,
    pub player: ClassRef,
    pub monster: ClassRef,
    pub animal: ClassRef,
    pub zombie: ClassRef,
    pub creeper: ClassRef,
    pub skeleton: ClassRef,
    pub cow: ClassRef,
    pub wolf: ClassRef,
    pub villager: ClassRef,
    pub iron_golem: ClassRef,
    pub cod: ClassRef,
    pub parrot: ClassRef,
    pub warden: ClassRef,
    pub otter: ClassRef,
    pub turtle: ClassRef,

    pub wrapped: ClassRef,
    pub tempt: ClassRef,
    pub breed: ClassRef,
    pub avoid: ClassRef,
    pub stroll: ClassRef,
    pub stroll_land: ClassRef,
    pub float: ClassRef,
    pub eat_block: ClassRef,
    pub open_door: ClassRef,
    pub break_door: ClassRef,
    pub sit: ClassRef,
    pub melee: ClassRef,
    pub bow: ClassRef,
    pub swell: ClassRef,
    pub nearest_attackable: ClassRef,
    pub hurt_by: ClassRef,
    pub defend_village: ClassRef,

    pub den: ClassRef,
    pub forage: ClassRef,
    pub stalk: ClassRef,
    pub pack: ClassRef,
    pub mystery: ClassRef,
}

impl Classes {
    pub fn new() -> Self {
        let entity = UnitClass::builder(classes::ENTITY).build();
        let living = UnitClass::leaf(classes::LIVING_ENTITY, &entity);
        let mob = UnitClass::leaf(classes::MOB, &living);
        let monster = UnitClass::leaf("entity.monster.Monster", &mob);
        let animal = UnitClass::leaf("entity.animal.Animal", &mob);
        let golem = UnitClass::leaf("entity.animal.AbstractGolem", &mob);

        let goal = UnitClass::builder(classes::GOAL).build();
        let target = UnitClass::leaf(classes::TARGET_GOAL, &goal);
        let stroll = UnitClass::leaf(classes::RANDOM_STROLL_GOAL, &goal);

        Self {
            player: UnitClass::leaf(classes::PLAYER, &living),
            zombie: UnitClass::leaf("entity.monster.Zombie", &monster),
            creeper: UnitClass::leaf("entity.monster.Creeper", &monster),
            skeleton: UnitClass::leaf("entity.monster.Skeleton", &monster),
            warden: UnitClass::leaf("entity.monster.warden.Warden", &monster),
            cow: UnitClass::leaf("entity.animal.Cow", &animal),
            wolf: UnitClass::leaf("entity.animal.Wolf", &animal),
            cod: UnitClass::leaf("entity.animal.Cod", &mob),
            parrot: UnitClass::leaf("entity.animal.Parrot", &animal),
            turtle: UnitClass::leaf("entity.animal.Turtle", &animal),
            villager: UnitClass::leaf("entity.npc.Villager", &mob),
            iron_golem: UnitClass::leaf("entity.animal.IronGolem", &golem),
            otter: UnitClass::leaf("wildlife.entity.OtterEntity", &animal),

            wrapped: UnitClass::leaf(classes::WRAPPED_GOAL, &goal),
            tempt: UnitClass::builder(classes::TEMPT_GOAL)
                .extends(&goal)
                .field(classes::FIELD_ITEMS, ValueKind::ItemSelector)
                .build(),
            breed: UnitClass::builder(classes::BREED_GOAL)
                .extends(&goal)
                .field(classes::FIELD_PARTNER_CLASS, ValueKind::Class)
                .build(),
            avoid: UnitClass::builder(classes::AVOID_ENTITY_GOAL)
                .extends(&goal)
                .field(classes::FIELD_AVOID_CLASS, ValueKind::Class)
                .build(),
            stroll_land: UnitClass::leaf(classes::WATER_AVOIDING_STROLL_GOAL, &stroll),
            float: UnitClass::leaf(classes::FLOAT_GOAL, &goal),
            eat_block: UnitClass::leaf(classes::EAT_BLOCK_GOAL, &goal),
            open_door: UnitClass::leaf(classes::OPEN_DOOR_GOAL, &goal),
            break_door: UnitClass::leaf(classes::BREAK_DOOR_GOAL, &goal),
            sit: UnitClass::leaf(classes::SIT_GOAL, &goal),
            melee: UnitClass::leaf(classes::MELEE_ATTACK_GOAL, &goal),
            bow: UnitClass::leaf(classes::RANGED_BOW_ATTACK_GOAL, &goal),
            swell: UnitClass::leaf(classes::SWELL_GOAL, &goal),
            nearest_attackable: UnitClass::builder(classes::NEAREST_ATTACKABLE_TARGET_GOAL)
                .extends(&target)
                .field(classes::FIELD_TARGET_TYPE, ValueKind::Class)
                .build(),
            hurt_by: UnitClass::leaf(classes::HURT_BY_TARGET_GOAL, &target),
            defend_village: UnitClass::leaf(classes::DEFEND_VILLAGE_TARGET_GOAL, &target),

            den: UnitClass::leaf(DEN_GOAL, &goal),
            forage: UnitClass::builder(FORAGE_GOAL)
                .extends(&goal)
                .field("food", ValueKind::ItemStack)
                .sealed_field("cooldown", ValueKind::Number)
                .build(),
            stalk: UnitClass::builder(STALK_GOAL)
                .extends(&goal)
                .field("prey", ValueKind::Class)
                .build(),
            pack: UnitClass::builder(PACK_GOAL)
                .extends(&goal)
                .field("leader", ValueKind::Unit)
                .field("fallback", ValueKind::Unit)
                .build(),
            mystery: UnitClass::leaf(MYSTERY_GOAL, &goal),

            stroll,
            living,
            monster,
            animal,
        }
    }

    /// Display names for agent classes referenced by units.
    pub fn names(&self) -> EntityNames {
        EntityNames::new()
            .with(&self.player, "Player")
            .with(&self.zombie, "Zombie")
            .with(&self.creeper, "Creeper")
            .with(&self.skeleton, "Skeleton")
            .with(&self.cow, "Cow")
            .with(&self.wolf, "Wolf")
            .with(&self.villager, "Villager")
            .with(&self.iron_golem, "Iron Golem")
            .with(&self.cod, "Cod")
            .with(&self.parrot, "Parrot")
            .with(&self.turtle, "Turtle")
            .with(&self.monster, "Monsters")
    }

    fn unit(&self, class: &ClassRef) -> UnitRef {
        UnitObject::new(class).into_ref()
    }

    /// The host wraps every goal it schedules.
    fn wrapped(&self, inner: UnitRef) -> UnitRef {
        UnitObject::new(&self.wrapped).wrapping(inner).into_ref()
    }

    fn targeting(&self, prey: &ClassRef) -> UnitRef {
        UnitObject::new(&self.nearest_attackable)
            .with(classes::FIELD_TARGET_TYPE, Value::Class(prey.clone()))
            .into_ref()
    }

    fn tempted_by(&self, items: &[(&str, &str)]) -> UnitRef {
        let selector = ItemSelector::any_of(items.iter().map(|(id, name)| ItemRef::new(id, name)));
        UnitObject::new(&self.tempt)
            .with(classes::FIELD_ITEMS, Value::ItemSelector(selector))
            .into_ref()
    }

    fn breeds_with(&self, partner: &ClassRef) -> UnitRef {
        UnitObject::new(&self.breed)
            .with(classes::FIELD_PARTNER_CLASS, Value::Class(partner.clone()))
            .into_ref()
    }

    /// Builds one agent of `key`. `None` for kinds the bestiary lacks.
    ///
    /// `wildlife:glitch` is deliberately absent: its constructor always fails.
    pub fn build(&self, key: &AgentTypeKey, id: InstanceId) -> Option<StaticAgent> {
        let agent = match (key.namespace(), key.path()) {
            ("minecraft", "zombie") => StaticAgent::builder(key.clone(), &self.zombie)
                .category(AgentCategory::Monster)
                .attribute(Attribute::MaxHealth, 20.0)
                .attribute(Attribute::AttackDamage, 3.0)
                .attribute(Attribute::MovementSpeed, 0.23)
                .attribute(Attribute::Armor, 2.0)
                .goal(2, self.wrapped(self.unit(&self.melee)))
                .goal(6, self.wrapped(self.unit(&self.break_door)))
                .goal(7, self.wrapped(self.unit(&self.stroll_land)))
                .target(1, self.wrapped(self.unit(&self.hurt_by)))
                .target(2, self.wrapped(self.targeting(&self.player)))
                .target(3, self.wrapped(self.targeting(&self.villager))),
            ("minecraft", "creeper") => StaticAgent::builder(key.clone(), &self.creeper)
                .category(AgentCategory::Monster)
                .attribute(Attribute::MaxHealth, 20.0)
                .attribute(Attribute::MovementSpeed, 0.25)
                .goal(1, self.wrapped(self.unit(&self.float)))
                .goal(2, self.wrapped(self.unit(&self.swell)))
                .goal(3, self.wrapped(self.avoiding(&self.parrot)))
                .target(1, self.wrapped(self.targeting(&self.player))),
            ("minecraft", "skeleton") => StaticAgent::builder(key.clone(), &self.skeleton)
                .category(AgentCategory::Monster)
                .attribute(Attribute::MaxHealth, 20.0)
                .attribute(Attribute::MovementSpeed, 0.25)
                .goal(4, self.wrapped(self.unit(&self.bow)))
                .goal(5, self.wrapped(self.unit(&self.stroll_land)))
                .target(1, self.wrapped(self.unit(&self.hurt_by)))
                .target(2, self.wrapped(self.targeting(&self.player))),
            ("minecraft", "cow") => StaticAgent::builder(key.clone(), &self.cow)
                .category(AgentCategory::Creature)
                .attribute(Attribute::MaxHealth, 10.0)
                .attribute(Attribute::MovementSpeed, 0.2)
                .goal(0, self.wrapped(self.unit(&self.float)))
                .goal(2, self.wrapped(self.breeds_with(&self.cow)))
                .goal(3, self.wrapped(self.tempted_by(&[("minecraft:wheat", "Wheat")])))
                .goal(5, self.wrapped(self.unit(&self.stroll_land))),
            ("minecraft", "wolf") => StaticAgent::builder(key.clone(), &self.wolf)
                .category(AgentCategory::Creature)
                .attribute(Attribute::MaxHealth, 8.0)
                .attribute(Attribute::AttackDamage, 4.0)
                .attribute(Attribute::MovementSpeed, 0.3)
                .goal(1, self.wrapped(self.unit(&self.float)))
                .goal(2, self.wrapped(self.unit(&self.sit)))
                .goal(5, self.wrapped(self.unit(&self.melee)))
                .goal(6, self.wrapped(self.breeds_with(&self.wolf)))
                .target(3, self.wrapped(self.unit(&self.hurt_by))),
            ("minecraft", "villager") => StaticAgent::builder(key.clone(), &self.villager)
                .category(AgentCategory::Misc)
                .attribute(Attribute::MaxHealth, 20.0)
                .attribute(Attribute::MovementSpeed, 0.5)
                .goal(0, self.wrapped(self.unit(&self.float)))
                .goal(4, self.wrapped(self.unit(&self.open_door)))
                .memory(HOME_MEMORY, None)
                .memory(JOB_SITE_MEMORY, None)
                .memory(MEETING_POINT_MEMORY, None)
                .activity("minecraft:work", false)
                .activity("minecraft:rest", false)
                .activity("minecraft:idle", true),
            ("minecraft", "iron_golem") => StaticAgent::builder(key.clone(), &self.iron_golem)
                .category(AgentCategory::Misc)
                .attribute(Attribute::MaxHealth, 100.0)
                .attribute(Attribute::AttackDamage, 15.0)
                .attribute(Attribute::MovementSpeed, 0.25)
                .goal(1, self.wrapped(self.unit(&self.melee)))
                .target(1, self.wrapped(self.unit(&self.defend_village)))
                .target(2, self.wrapped(self.unit(&self.hurt_by)))
                .target(3, self.wrapped(self.targeting(&self.monster))),
            ("minecraft", "cod") => StaticAgent::builder(key.clone(), &self.cod)
                .category(AgentCategory::WaterCreature)
                .attribute(Attribute::MaxHealth, 3.0)
                .navigation(Navigation::Water)
                .goal(4, self.wrapped(self.unit(&self.stroll))),
            ("minecraft", "parrot") => StaticAgent::builder(key.clone(), &self.parrot)
                .category(AgentCategory::Creature)
                .attribute(Attribute::MaxHealth, 6.0)
                .navigation(Navigation::Flying)
                .goal(0, self.wrapped(self.unit(&self.float)))
                .goal(2, self.wrapped(self.unit(&self.sit)))
                .goal(3, self.wrapped(self.tempted_by(&[]))),
            ("minecraft", "warden") => StaticAgent::builder(key.clone(), &self.warden)
                .category(AgentCategory::Monster)
                .attribute(Attribute::MaxHealth, 500.0)
                .attribute(Attribute::AttackDamage, 30.0)
                .sensor(WARDEN_SENSOR)
                .memory(ANGRY_AT_MEMORY, None)
                .summonable(false),
            ("wildlife", "otter") => StaticAgent::builder(key.clone(), &self.otter)
                .category(AgentCategory::Creature)
                .attribute(Attribute::MaxHealth, 12.0)
                .navigation(Navigation::Amphibious)
                .goal(0, self.wrapped(self.unit(&self.den)))
                .goal(
                    2,
                    self.wrapped(
                        UnitObject::new(&self.forage)
                            .with(
                                "food",
                                Value::ItemStack(ItemStack::new(ItemRef::new("minecraft:salmon", "Raw Salmon"), 1)),
                            )
                            .into_ref(),
                    ),
                )
                .goal(
                    3,
                    self.wrapped(
                        UnitObject::new(&self.stalk)
                            .with("prey", Value::Class(self.cod.clone()))
                            .into_ref(),
                    ),
                )
                .goal(9, self.wrapped(self.unit(&self.mystery))),
            ("wildlife", "pack_wolf") => StaticAgent::builder(key.clone(), &self.wolf)
                .category(AgentCategory::Creature)
                .attribute(Attribute::MaxHealth, 8.0)
                .goal(1, self.wrapped(self.pack_cycle())),
            _ => return None,
        };
        Some(agent.instance_id(id).build())
    }

    fn avoiding(&self, feared: &ClassRef) -> UnitRef {
        UnitObject::new(&self.avoid)
            .with(classes::FIELD_AVOID_CLASS, Value::Class(feared.clone()))
            .into_ref()
    }

    /// Two pack goals that reference each other as leader.
    ///
    /// The pair keeps itself alive; harness runs are short enough not to care.
    pub fn pack_cycle(&self) -> UnitRef {
        let alpha = Arc::new(UnitObject::new(&self.pack).with("fallback", Value::Unit(self.unit(&self.float))));
        let alpha_ref: UnitRef = alpha.clone();
        let beta = UnitObject::new(&self.pack)
            .with("leader", Value::Unit(alpha_ref))
            .with("fallback", Value::Unit(self.unit(&self.stroll)))
            .into_ref();
        alpha.assign("leader", Value::Unit(beta.clone()));
        beta
    }
}

impl Default for Classes {
    fn default() -> Self {
        Self::new()
    }
}

/// Live memory values an instance can be given.
pub fn home_at(x: i32, y: i32, z: i32) -> MemoryValue {
    MemoryValue::Position(Point3::new(x, y, z))
}

pub fn angry_at(seed: u64) -> MemoryValue {
    MemoryValue::Entity(Uuid::from_u64_pair(seed, seed.rotate_left(17)))
}
