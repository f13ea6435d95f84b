//! Attack execution and counter bookkeeping
//!
//! Both sides go through the same entry points. An invalid request (dead or
//! stunned caster, unavailable ability, illegal target) changes nothing and
//! returns no actions.

use rand::Rng;

use crate::battle::ability::{ability_unavailable_reason, AbilityInfo};
use crate::battle::actions::BattleAction;
use crate::battle::damage::{resolve_hit, roll_base_damage, scaled_damage, HitOutcome};
use crate::battle::state::{BattleState, CombatUnit};
use crate::battle::status::roll_status_effects;
use crate::battle::targeting::{get_valid_targets, random_candidate_tiles, units_hit};
use crate::core::types::{GridId, UnitKey};
use crate::data::{GameData, TargetSide};

/// Resolve and check everything that does not depend on the target
fn prepare(
    data: &GameData,
    state: &BattleState,
    caster: UnitKey,
    ability_id: &str,
) -> Option<AbilityInfo> {
    let Some(unit) = state.unit(caster) else {
        tracing::debug!("No unit at {}", caster);
        return None;
    };
    let info = AbilityInfo::resolve(data, unit, ability_id)?;
    if let Some(reason) = ability_unavailable_reason(data, unit, &info) {
        tracing::debug!("{} cannot use {}: {:?}", caster, ability_id, reason);
        return None;
    }
    Some(info)
}

/// Spend cooldown, ammunition and start a reload when the weapon runs dry
///
/// Counters start one higher than their nominal value because the acting
/// side's counters tick down at the end of this same turn.
pub fn commit_ability_use(unit: &mut CombatUnit, info: &AbilityInfo) {
    if info.cooldown > 0 {
        unit.cooldowns
            .insert(info.ability_id.clone(), info.cooldown + 1);
    }
    if let Some(weapon) = info.weapon_index.and_then(|i| unit.weapons.get_mut(i)) {
        if let Some(ammo) = weapon.ammo.as_mut() {
            *ammo = ammo.saturating_sub(info.ammo_cost);
            if *ammo == 0 {
                weapon.reload_remaining = weapon.reload_time + 1;
            }
        }
    }
}

/// One shot (or heal) against one unit
#[allow(clippy::too_many_arguments)]
fn resolve_shot<R: Rng + ?Sized>(
    data: &GameData,
    state: &mut BattleState,
    caster: UnitKey,
    info: &AbilityInfo,
    target_key: UnitKey,
    damage_percent: u32,
    rng: &mut R,
    actions: &mut Vec<BattleAction>,
) {
    let outcome = {
        let Some(target) = state.unit(target_key).filter(|u| u.is_alive()) else {
            return;
        };
        if info.is_heal() {
            None
        } else {
            Some(resolve_hit(
                data,
                info,
                target,
                damage_percent,
                &state.environment,
                rng,
            ))
        }
    };
    let Some(target) = state.unit_mut(target_key) else {
        return;
    };

    match outcome {
        None => {
            let amount = scaled_damage(roll_base_damage(info, rng), info.power);
            let healed = target.heal(amount);
            actions.push(BattleAction::Heal {
                healer: caster,
                target: target_key,
                ability_id: info.ability_id.clone(),
                amount: healed,
            });
        }
        Some(HitOutcome::Dodged { dodge_chance }) => {
            actions.push(BattleAction::Dodge {
                attacker: caster,
                target: target_key,
                ability_id: info.ability_id.clone(),
                dodge_chance,
            });
        }
        Some(HitOutcome::Hit { breakdown, .. }) => {
            let (hp, armor) = target.take_damage(breakdown.hp_damage(), breakdown.armor_damage());
            actions.push(BattleAction::Attack {
                attacker: caster,
                target: target_key,
                ability_id: info.ability_id.clone(),
                hp_damage: hp,
                armor_damage: armor,
                critical: breakdown.critical,
                damage_percent,
            });
            if target.is_dead {
                tracing::debug!("{} killed {} with {}", caster, target_key, info.ability_id);
                actions.push(BattleAction::Death {
                    unit: target_key,
                    unit_id: target.unit_id.clone(),
                    killer: Some(caster),
                });
            } else {
                actions.extend(roll_status_effects(
                    data,
                    info,
                    caster,
                    target,
                    damage_percent,
                    rng,
                ));
            }
        }
    }
}

/// Use an ability on a target slot of the ability's target side
///
/// Fixed patterns ignore `target_grid_id`; random abilities are routed to
/// `execute_random_attack`. Every hit runs once per shot
/// (`shots_per_attack * attacks_per_use`).
pub fn execute_attack<R: Rng + ?Sized>(
    data: &GameData,
    state: &mut BattleState,
    caster: UnitKey,
    ability_id: &str,
    target_grid_id: GridId,
    rng: &mut R,
) -> Vec<BattleAction> {
    let Some(info) = prepare(data, state, caster, ability_id) else {
        return Vec::new();
    };
    if info.target_area.is_random() {
        return execute_random_attack(data, state, caster, ability_id, rng);
    }

    let hits = {
        let Some(unit) = state.unit(caster) else {
            return Vec::new();
        };
        let view = state.view(caster.side);
        let valid = get_valid_targets(data, unit, &info, view);
        let target = if info.target_area.is_fixed() {
            None
        } else {
            match valid.iter().find(|t| t.grid_id == target_grid_id) {
                Some(t) => Some(*t),
                None => {
                    tracing::debug!(
                        "{} cannot target slot {} with {}",
                        caster,
                        target_grid_id,
                        ability_id
                    );
                    return Vec::new();
                }
            }
        };
        if valid.is_empty() {
            return Vec::new();
        }
        units_hit(data, unit, &info, target, view)
    };

    if let Some(unit) = state.unit_mut(caster) {
        commit_ability_use(unit, &info);
    }

    let mut actions = Vec::new();
    for _ in 0..info.total_shots() {
        for &(key, percent) in &hits {
            resolve_shot(data, state, caster, &info, key, percent, rng, &mut actions);
        }
    }
    actions
}

/// Use a random ability: each shot lands on a uniformly sampled candidate
///
/// Candidates are recomputed per shot so the dead stop drawing fire.
pub fn execute_random_attack<R: Rng + ?Sized>(
    data: &GameData,
    state: &mut BattleState,
    caster: UnitKey,
    ability_id: &str,
    rng: &mut R,
) -> Vec<BattleAction> {
    let Some(info) = prepare(data, state, caster, ability_id) else {
        return Vec::new();
    };
    if !info.target_area.is_random() {
        tracing::debug!("{} is not a random ability", ability_id);
        return Vec::new();
    }
    let pool_side = match info.target_side {
        TargetSide::Enemy => caster.side.opponent(),
        TargetSide::Friendly => caster.side,
    };

    if random_candidate_tiles(data, &info, state.units(pool_side), state.layout).is_empty() {
        tracing::debug!("{} has nothing to hit with {}", caster, ability_id);
        return Vec::new();
    }
    if let Some(unit) = state.unit_mut(caster) {
        commit_ability_use(unit, &info);
    }

    let mut actions = Vec::new();
    for _ in 0..info.total_shots() {
        let candidates = random_candidate_tiles(data, &info, state.units(pool_side), state.layout);
        if candidates.is_empty() {
            break;
        }
        let (key, percent) = candidates[rng.gen_range(0..candidates.len())];
        resolve_shot(data, state, caster, &info, key, percent, rng, &mut actions);
    }
    actions
}

/// End-of-turn countdown for the acting side
///
/// Cooldowns and charge counters drop by one; reloading weapons count down
/// and refill when they reach zero.
pub fn reduce_cooldowns(units: &mut [CombatUnit]) {
    for unit in units.iter_mut().filter(|u| u.is_alive()) {
        unit.cooldowns.retain(|_, turns| {
            *turns = turns.saturating_sub(1);
            *turns > 0
        });
        unit.charge_remaining.retain(|_, turns| {
            *turns = turns.saturating_sub(1);
            *turns > 0
        });
        for weapon in &mut unit.weapons {
            if weapon.reload_remaining > 0 {
                weapon.reload_remaining -= 1;
                if weapon.reload_remaining == 0 {
                    weapon.ammo = weapon.max_ammo;
                }
            }
        }
    }
}
