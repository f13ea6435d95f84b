//! Damage and resistance calculation
//!
//! Per hit the pipeline is:
//! 1. roll base damage in [min, max] and scale by the caster's power
//! 2. multiply critical hits
//! 3. apply the area tile's damage percent
//! 4. apply environment and status mitigation, each a percent reduction
//! 5. split off armor-piercing damage, run the rest through armor
//!    resistance and the armor pool, and send overflow to HP
//!
//! Every stage is recorded in a `DamageBreakdown` so previews and logs can
//! show exactly where damage went. Mitigation only ever removes damage, so
//! `hp_damage + armor_damage` never exceeds the damage entering step 4. The
//! crit multiplier is the one stage that raises damage: without a crit the
//! total is also bounded by the scaled roll.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::battle::ability::AbilityInfo;
use crate::battle::state::{CombatUnit, Environment};
use crate::core::config::config;
use crate::core::types::DamageType;
use crate::data::{GameData, ResistanceTable, StatusKind, TagBonus, TagIndex};

/// Absorbs float noise when scaling integers by config factors
const ROUNDING_EPSILON: f64 = 1e-9;

/// Config factors are written as short decimals; round away f32 noise
fn tunable(value: f32) -> f64 {
    (value as f64 * 1e6).round() / 1e6
}

/// floor(amount * factor), never negative
fn apply_factor(amount: u32, factor: f64) -> u32 {
    if factor <= 0.0 {
        return 0;
    }
    (amount as f64 * factor + ROUNDING_EPSILON).floor() as u32
}

/// floor(amount * percent / 100)
pub fn percent_of(amount: u32, percent: u32) -> u32 {
    (amount as u64 * percent as u64 / 100) as u32
}

/// Base damage scaled by the power stat
pub fn scaled_damage(base: u32, power: i32) -> u32 {
    let per_point = tunable(config().power_scaling_per_point);
    apply_factor(base, 1.0 + per_point * power as f64)
}

/// Percent chance the defender evades, clamped to [0, 100]
pub fn dodge_chance(defense: i32, offense: i32) -> u32 {
    (defense - offense + config().dodge_offset).clamp(0, 100) as u32
}

/// Unit crit + ability crit + tag-conditional bonuses, clamped to [0, 100]
pub fn crit_chance(
    unit_crit: i32,
    ability_crit: i32,
    bonuses: &[TagBonus],
    target_tags: &[String],
    tags: &TagIndex,
) -> u32 {
    let bonus: i32 = bonuses
        .iter()
        .filter(|b| tags.tag_matches(&b.tag, target_tags))
        .map(|b| b.bonus)
        .sum();
    (unit_crit + ability_crit + bonus).clamp(0, 100) as u32
}

/// Per-tick damage of a DoT effect before mitigation
pub fn dot_damage(expected_damage: u32, multiplier: f32, bonus: i32) -> u32 {
    let raw = expected_damage as f64 * tunable(multiplier) + bonus as f64 + ROUNDING_EPSILON;
    raw.floor().max(0.0) as u32
}

/// Roll a percent chance
pub fn roll_percent<R: Rng + ?Sized>(chance: u32, rng: &mut R) -> bool {
    chance > 0 && rng.gen_range(0..100) < chance
}

/// Roll unscaled damage in the ability's range
pub fn roll_base_damage<R: Rng + ?Sized>(info: &AbilityInfo, rng: &mut R) -> u32 {
    let max = info.base_max_damage.max(info.base_min_damage);
    rng.gen_range(info.base_min_damage..=max)
}

/// Where a percent reduction came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", content = "id", rename_all = "snake_case")]
pub enum ModifierSource {
    Environment,
    Status(String),
}

/// One reduction step of the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedModifier {
    pub source: ModifierSource,
    pub percent: i32,
    pub damage_before: u32,
    pub damage_after: u32,
}

/// Everything about a target that affects incoming damage of one type
#[derive(Debug, Clone, PartialEq)]
pub struct DefenderProfile {
    pub current_armor: u32,
    pub hp_resistances: ResistanceTable,
    pub armor_resistances: ResistanceTable,
    pub stunned: bool,
    /// Percent reductions applied in order before the armor split
    pub modifiers: Vec<(ModifierSource, i32)>,
}

impl DefenderProfile {
    /// Profile of a unit under the battle's environment
    ///
    /// Units with unknown stats get no resistances.
    pub fn of(
        data: &GameData,
        unit: &CombatUnit,
        environment: &Environment,
        damage_type: DamageType,
    ) -> Self {
        let (hp_resistances, armor_resistances) = data
            .unit_stats(&unit.unit_id, unit.rank)
            .map(|s| (s.hp_resistances, s.armor_resistances))
            .unwrap_or_default();

        let mut modifiers = Vec::new();
        let env_percent = environment.modifiers.get(damage_type);
        if env_percent != 0 {
            modifiers.push((ModifierSource::Environment, env_percent));
        }
        for effect in &unit.status_effects {
            if let Some(def) = data.status_effect(&effect.effect_id) {
                if let StatusKind::Mitigation { modifiers: table } = &def.kind {
                    let percent = table.get(damage_type);
                    if percent != 0 {
                        modifiers.push((ModifierSource::Status(effect.effect_id.clone()), percent));
                    }
                }
            }
        }

        Self {
            current_armor: unit.current_armor,
            hp_resistances,
            armor_resistances,
            stunned: unit.is_stunned(),
            modifiers,
        }
    }
}

/// Result of the mitigation stages for one hit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mitigation {
    pub modifiers: Vec<AppliedModifier>,
    pub after_modifiers: u32,
    /// Stunned target: armor ignored entirely
    pub armor_bypassed: bool,
    pub piercing: u32,
    pub armorable: u32,
    /// Armorable damage after armor resistance
    pub armor_resisted: u32,
    pub absorbed: u32,
    pub overflow: u32,
    pub hp_damage: u32,
    pub armor_damage: u32,
}

/// Run mitigation on damage entering the defender
pub fn mitigate(
    damage: u32,
    damage_type: DamageType,
    armor_piercing_percent: u32,
    defender: &DefenderProfile,
) -> Mitigation {
    let mut current = damage;
    let mut modifiers = Vec::with_capacity(defender.modifiers.len());
    for (source, percent) in &defender.modifiers {
        let before = current;
        current = percent_of(current, (100 - (*percent).clamp(0, 100)) as u32);
        modifiers.push(AppliedModifier {
            source: source.clone(),
            percent: *percent,
            damage_before: before,
            damage_after: current,
        });
    }
    let after_modifiers = current;

    let piercing = if defender.stunned {
        after_modifiers
    } else {
        percent_of(after_modifiers, armor_piercing_percent.min(100))
    };
    let armorable = after_modifiers - piercing;

    // Armor resistance applies even once the armor pool is empty
    let armor_resisted = defender.armor_resistances.reduce(damage_type, armorable);
    let absorbed = armor_resisted.min(defender.current_armor);
    let overflow = armor_resisted - absorbed;

    let hp_damage = defender.hp_resistances.reduce(damage_type, piercing)
        + defender.hp_resistances.reduce(damage_type, overflow);

    Mitigation {
        modifiers,
        after_modifiers,
        armor_bypassed: defender.stunned,
        piercing,
        armorable,
        armor_resisted,
        absorbed,
        overflow,
        hp_damage,
        armor_damage: absorbed,
    }
}

/// Full record of one hit from roll to HP/armor loss
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageBreakdown {
    pub damage_type: DamageType,
    pub rolled: u32,
    pub scaled: u32,
    pub critical: bool,
    pub after_crit: u32,
    pub damage_percent: u32,
    /// Damage entering mitigation
    pub base_damage: u32,
    pub mitigation: Mitigation,
}

impl DamageBreakdown {
    /// Run the whole pipeline from an unscaled roll
    pub fn compute(
        rolled: u32,
        power: i32,
        critical: bool,
        damage_percent: u32,
        damage_type: DamageType,
        armor_piercing_percent: u32,
        defender: &DefenderProfile,
    ) -> Self {
        let scaled = scaled_damage(rolled, power);
        let after_crit = if critical {
            apply_factor(scaled, tunable(config().crit_damage_multiplier))
        } else {
            scaled
        };
        let base_damage = percent_of(after_crit, damage_percent);
        let mitigation = mitigate(base_damage, damage_type, armor_piercing_percent, defender);
        Self {
            damage_type,
            rolled,
            scaled,
            critical,
            after_crit,
            damage_percent,
            base_damage,
            mitigation,
        }
    }

    pub fn hp_damage(&self) -> u32 {
        self.mitigation.hp_damage
    }

    pub fn armor_damage(&self) -> u32 {
        self.mitigation.armor_damage
    }
}

/// Outcome of one shot at one target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum HitOutcome {
    Dodged {
        dodge_chance: u32,
    },
    Hit {
        dodge_chance: u32,
        crit_chance: u32,
        breakdown: DamageBreakdown,
    },
}

/// Dodge and crit chances of an ability against a target
fn hit_chances(data: &GameData, info: &AbilityInfo, target: &CombatUnit) -> (u32, u32) {
    let defense = data
        .unit_stats(&target.unit_id, target.rank)
        .map(|s| s.defense)
        .unwrap_or(0);
    let empty = Vec::new();
    let target_tags = data
        .unit(&target.unit_id)
        .map(|d| &d.tags)
        .unwrap_or(&empty);
    let dodge = dodge_chance(defense, info.offense);
    let crit = crit_chance(
        info.unit_crit_percent,
        info.crit_percent,
        &info.crit_bonuses,
        target_tags,
        data.tags(),
    );
    (dodge, crit)
}

/// Resolve one damaging shot: dodge roll, crit roll, damage roll, mitigation
///
/// Does not touch the target; the caller applies the breakdown.
pub fn resolve_hit<R: Rng + ?Sized>(
    data: &GameData,
    info: &AbilityInfo,
    target: &CombatUnit,
    damage_percent: u32,
    environment: &Environment,
    rng: &mut R,
) -> HitOutcome {
    let (dodge_chance, crit_chance) = hit_chances(data, info, target);
    if roll_percent(dodge_chance, rng) {
        return HitOutcome::Dodged { dodge_chance };
    }
    let critical = roll_percent(crit_chance, rng);
    let rolled = roll_base_damage(info, rng);
    let defender = DefenderProfile::of(data, target, environment, info.damage_type);
    let breakdown = DamageBreakdown::compute(
        rolled,
        info.power,
        critical,
        damage_percent,
        info.damage_type,
        info.armor_piercing_percent,
        &defender,
    );
    tracing::trace!(
        "{} -> {}: roll {} crit {} => {} hp / {} armor",
        info.ability_id,
        target.key(),
        rolled,
        critical,
        breakdown.hp_damage(),
        breakdown.armor_damage()
    );
    HitOutcome::Hit {
        dodge_chance,
        crit_chance,
        breakdown,
    }
}

/// Deterministic estimate of an ability against a target
///
/// Never consulted by resolution. `min` is the lowest roll without a crit,
/// `max` the highest roll with a crit when one is possible. Both are per
/// shot against the target's current armor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamagePreview {
    pub dodge_chance: u32,
    pub crit_chance: u32,
    /// Shots expected to land on this target (fractional for random abilities)
    pub expected_shots: f32,
    pub min: DamageBreakdown,
    pub max: DamageBreakdown,
}

impl DamagePreview {
    /// Expected HP damage over all expected shots, ignoring armor depletion
    pub fn expected_hp_damage(&self) -> f32 {
        let hit_rate = (100 - self.dodge_chance) as f32 / 100.0;
        let average = (self.min.hp_damage() + self.max.hp_damage()) as f32 / 2.0;
        average * hit_rate * self.expected_shots
    }
}

pub fn preview_damage(
    data: &GameData,
    info: &AbilityInfo,
    target: &CombatUnit,
    damage_percent: u32,
    expected_shots: f32,
    environment: &Environment,
) -> DamagePreview {
    let (dodge_chance, crit_chance) = hit_chances(data, info, target);
    let defender = DefenderProfile::of(data, target, environment, info.damage_type);
    let breakdown = |rolled: u32, critical: bool| {
        DamageBreakdown::compute(
            rolled,
            info.power,
            critical,
            damage_percent,
            info.damage_type,
            info.armor_piercing_percent,
            &defender,
        )
    };
    DamagePreview {
        dodge_chance,
        crit_chance,
        expected_shots,
        min: breakdown(info.base_min_damage, false),
        max: breakdown(
            info.base_max_damage.max(info.base_min_damage),
            crit_chance > 0,
        ),
    }
}
