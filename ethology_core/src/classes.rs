//! Well-known class names the built-in inspectors and classifiers key on.
//!
//! Hosts describe their own hierarchies with `UnitClass`; these are the names
//! the engine expects to find somewhere in an ancestry chain.

// Task units
pub const GOAL: &str = "ai.goal.Goal";
pub const WRAPPED_GOAL: &str = "ai.goal.WrappedGoal";
pub const TEMPT_GOAL: &str = "ai.goal.TemptGoal";
pub const BREED_GOAL: &str = "ai.goal.BreedGoal";
pub const AVOID_ENTITY_GOAL: &str = "ai.goal.AvoidEntityGoal";
pub const RANDOM_STROLL_GOAL: &str = "ai.goal.RandomStrollGoal";
pub const WATER_AVOIDING_STROLL_GOAL: &str = "ai.goal.WaterAvoidingRandomStrollGoal";
pub const FLOAT_GOAL: &str = "ai.goal.FloatGoal";
pub const EAT_BLOCK_GOAL: &str = "ai.goal.EatBlockGoal";
pub const OPEN_DOOR_GOAL: &str = "ai.goal.OpenDoorGoal";
pub const BREAK_DOOR_GOAL: &str = "ai.goal.BreakDoorGoal";
pub const SIT_GOAL: &str = "ai.goal.SitWhenOrderedToGoal";
pub const MELEE_ATTACK_GOAL: &str = "ai.goal.MeleeAttackGoal";
pub const RANGED_BOW_ATTACK_GOAL: &str = "ai.goal.RangedBowAttackGoal";
pub const SWELL_GOAL: &str = "ai.goal.SwellGoal";

// Targeting units
pub const TARGET_GOAL: &str = "ai.goal.target.TargetGoal";
pub const NEAREST_ATTACKABLE_TARGET_GOAL: &str = "ai.goal.target.NearestAttackableTargetGoal";
pub const HURT_BY_TARGET_GOAL: &str = "ai.goal.target.HurtByTargetGoal";
pub const DEFEND_VILLAGE_TARGET_GOAL: &str = "ai.goal.target.DefendVillageTargetGoal";

// Agent kinds
pub const ENTITY: &str = "entity.Entity";
pub const LIVING_ENTITY: &str = "entity.LivingEntity";
pub const MOB: &str = "entity.Mob";
pub const PLAYER: &str = "entity.player.Player";

// Field names read by the built-in inspectors
pub const FIELD_ITEMS: &str = "items";
pub const FIELD_PARTNER_CLASS: &str = "partnerClass";
pub const FIELD_AVOID_CLASS: &str = "avoidClass";
pub const FIELD_TARGET_TYPE: &str = "targetType";
