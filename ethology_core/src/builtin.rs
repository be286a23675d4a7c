//! Inspectors for the host's own unit classes, sensors and memories.

use crate::behavior_trait::{BehaviorTrait, TraitCategory};
use crate::classes;
use crate::error::InspectError;
use crate::naming::EntityNames;
use crate::registry::{ClassifierKey, InspectorRegistry, Subject};
use crate::unit::{FieldHandle, Unit, Value, ValueKind};
use std::sync::Arc;

pub const HOGLIN_SENSOR: &str = "minecraft:hoglin_specific_sensor";
pub const WARDEN_SENSOR: &str = "minecraft:warden_entity_sensor";

pub const HOME_MEMORY: &str = "minecraft:home";
pub const JOB_SITE_MEMORY: &str = "minecraft:job_site";
pub const MEETING_POINT_MEMORY: &str = "minecraft:meeting_point";
pub const ANGRY_AT_MEMORY: &str = "minecraft:angry_at";

/// Argument-free goal traits, keyed by the class they classify.
const SIMPLE_GOALS: &[(&str, &str, &str, &str)] = &[
    (classes::RANDOM_STROLL_GOAL, "ethology:vanilla_stroll", "minecraft:leather_boots", "ethology.trait.goal.wanders"),
    (classes::WATER_AVOIDING_STROLL_GOAL, "ethology:vanilla_stroll_land", "minecraft:leather_boots", "ethology.trait.goal.wanders_land"),
    (classes::FLOAT_GOAL, "ethology:vanilla_float", "minecraft:oak_boat", "ethology.trait.goal.floats"),
    (classes::EAT_BLOCK_GOAL, "ethology:vanilla_eat_block", "minecraft:grass_block", "ethology.trait.goal.eats_blocks"),
    (classes::OPEN_DOOR_GOAL, "ethology:vanilla_open_door", "minecraft:oak_door", "ethology.trait.goal.opens_doors"),
    (classes::BREAK_DOOR_GOAL, "ethology:vanilla_break_door", "minecraft:iron_axe", "ethology.trait.goal.breaks_doors"),
    (classes::SIT_GOAL, "ethology:vanilla_sit", "minecraft:oak_stairs", "ethology.trait.goal.sits"),
    (classes::MELEE_ATTACK_GOAL, "ethology:vanilla_melee", "minecraft:iron_sword", "ethology.trait.goal.melee_attack"),
    (classes::RANGED_BOW_ATTACK_GOAL, "ethology:vanilla_bow", "minecraft:bow", "ethology.trait.goal.ranged_attack"),
    (classes::SWELL_GOAL, "ethology:vanilla_swell", "minecraft:tnt", "ethology.trait.goal.explodes"),
    (classes::HURT_BY_TARGET_GOAL, "ethology:vanilla_hurt_by", "minecraft:shield", "ethology.trait.goal.retaliates"),
    (classes::DEFEND_VILLAGE_TARGET_GOAL, "ethology:vanilla_defend_village", "minecraft:bell", "ethology.trait.goal.defends_village"),
];

/// Memory traits: (memory id, key stem, icon, state translation, capability translation).
const MEMORIES: &[(&str, &str, &str, &str, &str)] = &[
    (HOME_MEMORY, "ethology:memory_home", "minecraft:red_bed", "ethology.trait.memory.home_set", "ethology.trait.memory.can_have_home"),
    (JOB_SITE_MEMORY, "ethology:memory_job", "minecraft:emerald", "ethology.trait.memory.has_job", "ethology.trait.memory.can_have_job"),
    (MEETING_POINT_MEMORY, "ethology:memory_meeting", "minecraft:bell", "ethology.trait.memory.meeting_point", "ethology.trait.memory.can_meet"),
    (ANGRY_AT_MEMORY, "ethology:memory_angry", "minecraft:tnt", "ethology.trait.memory.angry_at", "ethology.trait.memory.can_get_angry"),
];

/// Registers every built-in inspector.
pub fn register_builtin_inspectors(registry: &mut InspectorRegistry, names: Arc<EntityNames>) {
    registry.register_fn(ClassifierKey::unit_type(classes::TEMPT_GOAL), |subject| {
        let unit = subject.as_unit()?;
        let arg = match read(unit, classes::TEMPT_GOAL, classes::FIELD_ITEMS, ValueKind::ItemSelector)? {
            Value::ItemSelector(selector) => selector
                .representative()
                .map(|stack| stack.hover_name().to_string())
                .unwrap_or_else(|| "Food".to_string()),
            _ => "Items".to_string(),
        };
        Ok(Some(
            goal("ethology:vanilla_tempt", "minecraft:wheat", "ethology.trait.goal.temptable").with_arg(arg),
        ))
    });

    let breed_names = Arc::clone(&names);
    registry.register_fn(ClassifierKey::unit_type(classes::BREED_GOAL), move |subject| {
        let unit = subject.as_unit()?;
        let partner = class_name(unit, classes::BREED_GOAL, classes::FIELD_PARTNER_CLASS, &breed_names)?;
        Ok(Some(
            goal("ethology:vanilla_breed", "minecraft:heart_of_the_sea", "ethology.trait.goal.breed_goal")
                .with_arg(partner),
        ))
    });

    let avoid_names = Arc::clone(&names);
    registry.register_fn(ClassifierKey::unit_type(classes::AVOID_ENTITY_GOAL), move |subject| {
        let unit = subject.as_unit()?;
        let feared = class_name(unit, classes::AVOID_ENTITY_GOAL, classes::FIELD_AVOID_CLASS, &avoid_names)?;
        Ok(Some(
            goal("ethology:vanilla_avoid", "minecraft:barrier", "ethology.trait.goal.fearful").with_arg(feared),
        ))
    });

    let target_names = Arc::clone(&names);
    registry.register_fn(
        ClassifierKey::unit_type(classes::NEAREST_ATTACKABLE_TARGET_GOAL),
        move |subject| {
            let unit = subject.as_unit()?;
            let value = read(
                unit,
                classes::NEAREST_ATTACKABLE_TARGET_GOAL,
                classes::FIELD_TARGET_TYPE,
                ValueKind::Class,
            )?;
            let target = value
                .as_class()
                .ok_or_else(|| InspectError::MissingField(classes::FIELD_TARGET_TYPE.to_string()))?;
            let (key, icon) = if target.is_a(classes::PLAYER) {
                ("ethology:vanilla_aggro_player", "minecraft:iron_sword")
            } else {
                ("ethology:vanilla_aggro_mob", "minecraft:crossbow")
            };
            Ok(Some(
                goal(key, icon, "ethology.trait.goal.aggressive").with_arg(target_names.target_name_for(target)),
            ))
        },
    );

    for &(class, key, icon, translation) in SIMPLE_GOALS {
        registry.register_fn(ClassifierKey::unit_type(class), move |_| {
            Ok(Some(goal(key, icon, translation)))
        });
    }

    registry.register_fn(ClassifierKey::sensor(HOGLIN_SENSOR), |_| {
        Ok(Some(sensor("ethology:sensor_hoglin", "minecraft:warped_fungus", "ethology.trait.sensor.hoglin_sensing")))
    });
    registry.register_fn(ClassifierKey::sensor(WARDEN_SENSOR), |_| {
        Ok(Some(sensor("ethology:sensor_warden", "minecraft:sculk_sensor", "ethology.trait.sensor.warden_sensing")))
    });

    for &(id, stem, icon, state_translation, capability_translation) in MEMORIES {
        registry.register_fn(ClassifierKey::memory(id), move |subject| match subject {
            Subject::Memory { value: Some(value), .. } => Ok(Some(
                BehaviorTrait::new(stem, icon, state_translation, TraitCategory::Memory)
                    .with_arg(value.display_arg()),
            )),
            Subject::Memory { value: None, .. } => Ok(Some(BehaviorTrait::new(
                &format!("{}_capability", stem),
                icon,
                capability_translation,
                TraitCategory::Memory,
            ))),
            other => Err(InspectError::WrongSubject(other.describe())),
        });
    }
}

fn goal(key: &str, icon: &str, translation: &str) -> BehaviorTrait {
    BehaviorTrait::new(key, icon, translation, TraitCategory::Goal)
}

fn sensor(key: &str, icon: &str, translation: &str) -> BehaviorTrait {
    BehaviorTrait::new(key, icon, translation, TraitCategory::Sensor)
}

fn read(unit: &dyn Unit, owner: &str, field: &str, kind: ValueKind) -> Result<Value, InspectError> {
    unit.read_field(&FieldHandle::new(owner, field, kind))
        .map_err(|_| InspectError::MissingField(field.to_string()))
}

/// Display name of the agent class held in `field`, "Unknown" when unset.
fn class_name(unit: &dyn Unit, owner: &str, field: &str, names: &EntityNames) -> Result<String, InspectError> {
    Ok(match read(unit, owner, field, ValueKind::Class)? {
        Value::Class(class) => names.target_name_for(&class),
        _ => "Unknown".to_string(),
    })
}
