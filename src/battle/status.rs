//! Status effects: application on hit and start-of-turn ticking

use rand::Rng;

use crate::battle::ability::AbilityInfo;
use crate::battle::actions::BattleAction;
use crate::battle::damage::{dot_damage, mitigate, percent_of, roll_percent, DefenderProfile};
use crate::battle::state::{ActiveStatusEffect, CombatUnit, Environment};
use crate::core::types::UnitKey;
use crate::data::{GameData, StatusEffectDef, StatusKind};

/// Put an effect on a unit, refreshing it if already present
pub fn apply_status(
    unit: &mut CombatUnit,
    def: &StatusEffectDef,
    expected_damage: u32,
    source: Option<UnitKey>,
) {
    if let Some(existing) = unit
        .status_effects
        .iter_mut()
        .find(|e| e.effect_id == def.id)
    {
        existing.remaining_duration = def.duration;
        existing.expected_damage = expected_damage;
        existing.source = source;
        return;
    }
    unit.status_effects.push(ActiveStatusEffect {
        effect_id: def.id.clone(),
        family: def.family.clone(),
        remaining_duration: def.duration,
        is_stun: def.is_stun(),
        expected_damage,
        source,
    });
}

/// Roll each of an ability's status effects after a landed hit
///
/// Chances scale with the tile's damage percent. A successful roll against
/// an immune target is reported instead of applied.
pub fn roll_status_effects<R: Rng + ?Sized>(
    data: &GameData,
    info: &AbilityInfo,
    source: UnitKey,
    target: &mut CombatUnit,
    damage_percent: u32,
    rng: &mut R,
) -> Vec<BattleAction> {
    let mut actions = Vec::new();
    if target.is_dead {
        return actions;
    }

    for entry in &info.status_effects {
        let Some(def) = data.status_effect(&entry.effect) else {
            tracing::warn!("Unknown status effect '{}' on '{}'", entry.effect, info.ability_id);
            continue;
        };
        let chance = percent_of(entry.chance, damage_percent).min(100);
        if !roll_percent(chance, rng) {
            continue;
        }

        let immune = data
            .unit(&target.unit_id)
            .map(|d| d.is_immune_to(&def.family))
            .unwrap_or(false);
        if immune {
            actions.push(BattleAction::StatusImmune {
                source,
                target: target.key(),
                effect_id: def.id.clone(),
                family: def.family.clone(),
            });
            continue;
        }

        apply_status(target, def, info.expected_damage(damage_percent), Some(source));
        tracing::debug!("{} applied {} to {}", source, def.id, target.key());
        actions.push(BattleAction::StatusApplied {
            source,
            target: target.key(),
            effect_id: def.id.clone(),
            duration: def.duration,
        });
    }
    actions
}

/// Tick one unit's effects
fn tick_unit(
    data: &GameData,
    unit: &mut CombatUnit,
    environment: &Environment,
    actions: &mut Vec<BattleAction>,
) {
    unit.stunned_this_turn = unit.is_stunned();

    for index in 0..unit.status_effects.len() {
        if unit.is_dead {
            break;
        }
        let effect = unit.status_effects[index].clone();
        let Some(def) = data.status_effect(&effect.effect_id) else {
            tracing::warn!("Unknown active status effect '{}' on {}", effect.effect_id, unit.key());
            continue;
        };
        let StatusKind::DamageOverTime {
            damage_type,
            dot_multiplier,
            dot_bonus,
            armor_piercing_percent,
        } = def.kind
        else {
            continue;
        };

        let raw = dot_damage(effect.expected_damage, dot_multiplier, dot_bonus);
        let defender = DefenderProfile::of(data, unit, environment, damage_type);
        let mitigation = mitigate(raw, damage_type, armor_piercing_percent, &defender);
        let (hp, armor) = unit.take_damage(mitigation.hp_damage, mitigation.armor_damage);
        actions.push(BattleAction::StatusTick {
            target: unit.key(),
            effect_id: effect.effect_id.clone(),
            hp_damage: hp,
            armor_damage: armor,
            remaining_duration: effect.remaining_duration.saturating_sub(1),
        });
        if unit.is_dead {
            tracing::debug!("{} died to {}", unit.key(), effect.effect_id);
            actions.push(BattleAction::Death {
                unit: unit.key(),
                unit_id: unit.unit_id.clone(),
                killer: effect.source,
            });
        }
    }

    if unit.is_dead {
        return;
    }

    let key = unit.key();
    unit.status_effects.retain_mut(|effect| {
        effect.remaining_duration = effect.remaining_duration.saturating_sub(1);
        if effect.remaining_duration == 0 {
            actions.push(BattleAction::StatusExpired {
                target: key,
                effect_id: effect.effect_id.clone(),
            });
            false
        } else {
            true
        }
    });
}

/// Start-of-turn processing for one side's units
///
/// DoT effects deal damage through the normal mitigation pipeline (no dodge,
/// no crit), then every effect counts down and expires at zero. The stun
/// snapshot is taken first so a stun ending this tick still costs the turn.
pub fn process_status_effects(
    data: &GameData,
    units: &mut [CombatUnit],
    environment: &Environment,
) -> Vec<BattleAction> {
    let mut actions = Vec::new();
    for unit in units.iter_mut().filter(|u| u.is_alive()) {
        tick_unit(data, unit, environment, &mut actions);
    }
    actions
}
