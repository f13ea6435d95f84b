//! Ability resolution and availability
//!
//! An `AbilityInfo` is derived from static data and the caster's rank each
//! time it is needed; nothing here is stored on the unit.

use serde::{Deserialize, Serialize};

use crate::battle::damage::{percent_of, scaled_damage};
use crate::battle::state::{BattleView, CombatUnit};
use crate::battle::targeting::get_valid_targets;
use crate::core::types::{DamageType, LineOfFire, Rank};
use crate::data::{
    AbilityEffect, GameData, StatusChance, TagBonus, TargetArea, TargetSide,
};

/// An ability as a specific unit would use it right now
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityInfo {
    pub ability_id: String,
    pub name: String,
    /// Weapon whose ammunition the ability draws on
    pub weapon_index: Option<usize>,
    pub damage_type: DamageType,
    pub base_min_damage: u32,
    pub base_max_damage: u32,
    /// Power-scaled damage range
    pub min_damage: u32,
    pub max_damage: u32,
    pub power: i32,
    /// attack + accuracy
    pub offense: i32,
    pub unit_crit_percent: i32,
    pub crit_percent: i32,
    pub crit_bonuses: Vec<TagBonus>,
    pub armor_piercing_percent: u32,
    pub targets: Vec<String>,
    pub min_range: u32,
    pub max_range: u32,
    pub line_of_fire: LineOfFire,
    pub cooldown: u32,
    pub ammo_cost: u32,
    pub charge_time: u32,
    pub min_rank: Rank,
    pub shots_per_attack: u32,
    pub attacks_per_use: u32,
    pub target_side: TargetSide,
    pub effect: AbilityEffect,
    pub target_area: TargetArea,
    pub status_effects: Vec<StatusChance>,
}

impl AbilityInfo {
    /// Combine a unit's rank stats with an ability definition
    ///
    /// `None` (logged) when the unit, its stats, or the ability is missing.
    pub fn resolve(data: &GameData, unit: &CombatUnit, ability_id: &str) -> Option<Self> {
        let Some(def) = data.unit(&unit.unit_id) else {
            tracing::warn!("Unknown unit '{}' at {}", unit.unit_id, unit.key());
            return None;
        };
        let Some(stats) = def.stats(unit.rank) else {
            tracing::warn!("Unit '{}' has no stats", unit.unit_id);
            return None;
        };
        let Some(ability) = data.ability(ability_id) else {
            tracing::warn!("Unknown ability '{}' on '{}'", ability_id, unit.unit_id);
            return None;
        };

        Some(Self {
            ability_id: ability.id.clone(),
            name: ability.name.clone(),
            weapon_index: def.weapon_for(ability_id),
            damage_type: ability.damage_type,
            base_min_damage: ability.min_damage,
            base_max_damage: ability.max_damage,
            min_damage: scaled_damage(ability.min_damage, stats.power),
            max_damage: scaled_damage(ability.max_damage, stats.power),
            power: stats.power,
            offense: ability.attack + stats.accuracy,
            unit_crit_percent: stats.crit_percent,
            crit_percent: ability.crit_percent,
            crit_bonuses: ability.crit_bonuses.clone(),
            armor_piercing_percent: ability.armor_piercing_percent,
            targets: ability.targets.clone(),
            min_range: ability.min_range,
            max_range: ability.max_range,
            line_of_fire: ability.line_of_fire,
            cooldown: ability.cooldown,
            ammo_cost: ability.ammo_cost,
            charge_time: ability.charge_time,
            min_rank: ability.min_rank,
            shots_per_attack: ability.shots_per_attack,
            attacks_per_use: ability.attacks_per_use,
            target_side: ability.target_side,
            effect: ability.effect,
            target_area: ability.target_area.clone(),
            status_effects: ability.status_effects.clone(),
        })
    }

    pub fn total_shots(&self) -> u32 {
        self.shots_per_attack.max(1) * self.attacks_per_use.max(1)
    }

    pub fn is_heal(&self) -> bool {
        self.effect == AbilityEffect::Heal
    }

    /// Average scaled hit at a damage percent, the base for DoT ticks
    pub fn expected_damage(&self, damage_percent: u32) -> u32 {
        percent_of((self.min_damage + self.max_damage) / 2, damage_percent)
    }
}

/// Why an ability cannot be used this turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unavailable {
    Dead,
    Stunned,
    /// Ability is not on any of the unit's weapons
    NotKnown,
    RankTooLow { required: Rank },
    CoolingDown { turns: u32 },
    Reloading { turns: u32 },
    OutOfAmmo,
    Charging { turns: u32 },
    NoValidTargets,
}

/// First rule that blocks an ability, ignoring targets
pub fn ability_unavailable_reason(
    data: &GameData,
    unit: &CombatUnit,
    info: &AbilityInfo,
) -> Option<Unavailable> {
    if unit.is_dead {
        return Some(Unavailable::Dead);
    }
    if !unit.can_act() {
        return Some(Unavailable::Stunned);
    }
    let known = data
        .unit(&unit.unit_id)
        .map(|d| d.ability_ids().contains(&info.ability_id.as_str()))
        .unwrap_or(false);
    if !known {
        return Some(Unavailable::NotKnown);
    }
    if unit.rank < info.min_rank {
        return Some(Unavailable::RankTooLow {
            required: info.min_rank,
        });
    }
    let cooldown = unit.cooldown(&info.ability_id);
    if cooldown > 0 {
        return Some(Unavailable::CoolingDown { turns: cooldown });
    }
    if let Some(weapon) = info.weapon_index.and_then(|i| unit.weapons.get(i)) {
        if weapon.is_reloading() {
            return Some(Unavailable::Reloading {
                turns: weapon.reload_remaining,
            });
        }
        if !weapon.has_ammo(info.ammo_cost) {
            return Some(Unavailable::OutOfAmmo);
        }
    }
    let charge = unit.charge(&info.ability_id);
    if charge > 0 {
        return Some(Unavailable::Charging { turns: charge });
    }
    None
}

/// Every ability the unit knows, resolved for its rank
pub fn known_abilities(data: &GameData, unit: &CombatUnit) -> Vec<AbilityInfo> {
    match data.unit(&unit.unit_id) {
        Some(def) => def
            .ability_ids()
            .into_iter()
            .filter_map(|id| AbilityInfo::resolve(data, unit, id))
            .collect(),
        None => {
            tracing::warn!("Unknown unit '{}' at {}", unit.unit_id, unit.key());
            Vec::new()
        }
    }
}

/// Abilities usable right now with at least one legal target
pub fn get_available_abilities(
    data: &GameData,
    unit: &CombatUnit,
    view: BattleView<'_>,
) -> Vec<AbilityInfo> {
    known_abilities(data, unit)
        .into_iter()
        .filter(|info| ability_unavailable_reason(data, unit, info).is_none())
        .filter(|info| !get_valid_targets(data, unit, info, view).is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::grid::GridLayout;
    use crate::battle::state::FormationSlot;
    use crate::core::types::Side;
    use crate::data::{AbilityDef, RankStats, UnitDef, WeaponDef};
    use std::collections::BTreeSet;

    fn test_data() -> GameData {
        let mut data = GameData::new();
        data.add_unit(UnitDef {
            id: "gunner".into(),
            ranks: vec![
                RankStats {
                    hp: 20,
                    accuracy: 10,
                    power: 10,
                    crit_percent: 5,
                    ..Default::default()
                },
                RankStats {
                    hp: 30,
                    accuracy: 15,
                    power: 10,
                    ..Default::default()
                },
            ],
            weapons: vec![WeaponDef {
                name: "Cannon".into(),
                ammo: Some(1),
                reload_time: 2,
                abilities: vec!["blast".into(), "elite_blast".into(), "missing".into()],
            }],
            ..Default::default()
        });
        data.add_ability(AbilityDef {
            id: "blast".into(),
            min_damage: 10,
            max_damage: 20,
            attack: 5,
            max_range: 3,
            cooldown: 1,
            ..Default::default()
        });
        data.add_ability(AbilityDef {
            id: "elite_blast".into(),
            min_damage: 30,
            max_damage: 30,
            max_range: 3,
            min_rank: 2,
            ..Default::default()
        });
        data.add_unit(UnitDef {
            id: "target".into(),
            ranks: vec![RankStats {
                hp: 10,
                ..Default::default()
            }],
            ..Default::default()
        });
        data
    }

    fn spawn(data: &GameData, id: &str, side: Side, grid_id: u8, rank: u8) -> CombatUnit {
        CombatUnit::spawn(
            data,
            GridLayout::standard(),
            side,
            &FormationSlot::new(id, grid_id, rank),
        )
        .unwrap()
    }

    #[test]
    fn test_resolve_scales_with_rank_stats() {
        let data = test_data();
        let unit = spawn(&data, "gunner", Side::Friendly, 0, 1);
        let info = AbilityInfo::resolve(&data, &unit, "blast").unwrap();
        assert_eq!(info.offense, 15);
        assert_eq!(info.min_damage, 12);
        assert_eq!(info.max_damage, 24);
        assert_eq!(info.unit_crit_percent, 5);
        assert_eq!(info.weapon_index, Some(0));
        assert_eq!(info.expected_damage(50), 9);
    }

    #[test]
    fn test_missing_ability_resolves_to_none() {
        let data = test_data();
        let unit = spawn(&data, "gunner", Side::Friendly, 0, 1);
        assert!(AbilityInfo::resolve(&data, &unit, "missing").is_none());
        assert_eq!(known_abilities(&data, &unit).len(), 2);
    }

    #[test]
    fn test_unavailable_reasons() {
        let data = test_data();
        let mut unit = spawn(&data, "gunner", Side::Friendly, 0, 1);
        let blast = AbilityInfo::resolve(&data, &unit, "blast").unwrap();
        let elite = AbilityInfo::resolve(&data, &unit, "elite_blast").unwrap();

        assert_eq!(ability_unavailable_reason(&data, &unit, &blast), None);
        assert_eq!(
            ability_unavailable_reason(&data, &unit, &elite),
            Some(Unavailable::RankTooLow { required: 2 })
        );

        unit.cooldowns.insert("blast".into(), 2);
        assert_eq!(
            ability_unavailable_reason(&data, &unit, &blast),
            Some(Unavailable::CoolingDown { turns: 2 })
        );
        unit.cooldowns.clear();

        unit.weapons[0].ammo = Some(0);
        assert_eq!(
            ability_unavailable_reason(&data, &unit, &blast),
            Some(Unavailable::OutOfAmmo)
        );
        unit.weapons[0].reload_remaining = 1;
        assert_eq!(
            ability_unavailable_reason(&data, &unit, &blast),
            Some(Unavailable::Reloading { turns: 1 })
        );
    }

    #[test]
    fn test_available_requires_targets() {
        let data = test_data();
        let unit = spawn(&data, "gunner", Side::Friendly, 0, 1);
        let enemy = spawn(&data, "target", Side::Enemy, 4, 1);
        let none = BTreeSet::new();

        let allies = vec![unit.clone()];
        let empty: Vec<CombatUnit> = Vec::new();
        let view = BattleView {
            layout: GridLayout::standard(),
            allies: &allies,
            opponents: &empty,
            ally_collapsed: &none,
            opponent_collapsed: &none,
        };
        assert!(get_available_abilities(&data, &unit, view).is_empty());

        let opponents = vec![enemy];
        let view = BattleView {
            opponents: &opponents,
            ..view
        };
        let available = get_available_abilities(&data, &unit, view);
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].ability_id, "blast");
    }
}
