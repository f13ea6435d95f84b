//! Unit definitions: per-rank stats, weapons, tags and immunities

use serde::{Deserialize, Serialize};

use crate::core::types::{BlockingTier, DamageType, Rank};

/// Percentages per damage type (missing entries are 0)
///
/// Used for resistances (positive = less damage taken), status mitigation
/// and environmental modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResistanceTable {
    pub piercing: i32,
    pub crushing: i32,
    pub explosive: i32,
    pub fire: i32,
    pub cold: i32,
    pub arcane: i32,
}

impl ResistanceTable {
    pub fn get(&self, damage_type: DamageType) -> i32 {
        match damage_type {
            DamageType::Piercing => self.piercing,
            DamageType::Crushing => self.crushing,
            DamageType::Explosive => self.explosive,
            DamageType::Fire => self.fire,
            DamageType::Cold => self.cold,
            DamageType::Arcane => self.arcane,
        }
    }

    pub fn set(&mut self, damage_type: DamageType, percent: i32) {
        match damage_type {
            DamageType::Piercing => self.piercing = percent,
            DamageType::Crushing => self.crushing = percent,
            DamageType::Explosive => self.explosive = percent,
            DamageType::Fire => self.fire = percent,
            DamageType::Cold => self.cold = percent,
            DamageType::Arcane => self.arcane = percent,
        }
    }

    /// Same value for every damage type
    pub fn uniform(percent: i32) -> Self {
        Self {
            piercing: percent,
            crushing: percent,
            explosive: percent,
            fire: percent,
            cold: percent,
            arcane: percent,
        }
    }

    /// Apply the reduction for a type to an amount, rounding down
    pub fn reduce(&self, damage_type: DamageType, amount: u32) -> u32 {
        let percent = self.get(damage_type).clamp(0, 100) as u64;
        (amount as u64 * (100 - percent) / 100) as u32
    }
}

/// Stats for one rank of a unit
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RankStats {
    pub hp: u32,
    pub armor: u32,
    /// Added to an ability's attack to form offense
    pub accuracy: i32,
    /// Compared against attacker offense for dodge
    pub defense: i32,
    /// Damage scaling stat
    pub power: i32,
    /// Base critical chance in percent
    pub crit_percent: i32,
    pub hp_resistances: ResistanceTable,
    pub armor_resistances: ResistanceTable,
}

/// A weapon: ammunition pool shared by the abilities it grants
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponDef {
    pub name: String,
    /// Rounds before reloading; `None` never runs dry
    pub ammo: Option<u32>,
    /// Own turns spent reloading once the weapon is empty
    pub reload_time: u32,
    pub abilities: Vec<String>,
}

/// Static definition of a unit type
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitDef {
    pub id: String,
    pub name: String,
    pub tags: Vec<String>,
    pub blocking: BlockingTier,
    /// Decorative or obstacle units that never decide a battle
    pub ignorable: bool,
    /// Status-effect families this unit never receives
    pub immunities: Vec<String>,
    pub ranks: Vec<RankStats>,
    pub weapons: Vec<WeaponDef>,
}

impl UnitDef {
    /// Stats for a rank, clamped into the defined range
    pub fn stats(&self, rank: Rank) -> Option<&RankStats> {
        if self.ranks.is_empty() {
            return None;
        }
        let index = (rank.max(1) as usize - 1).min(self.ranks.len() - 1);
        self.ranks.get(index)
    }

    /// Highest defined rank
    pub fn max_rank(&self) -> Rank {
        self.ranks.len().min(Rank::MAX as usize) as Rank
    }

    /// Find which weapon grants an ability
    pub fn weapon_for(&self, ability_id: &str) -> Option<usize> {
        self.weapons
            .iter()
            .position(|w| w.abilities.iter().any(|a| a == ability_id))
    }

    /// All ability ids in weapon order, without duplicates
    pub fn ability_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for weapon in &self.weapons {
            for ability in &weapon.abilities {
                if !ids.contains(&ability.as_str()) {
                    ids.push(ability.as_str());
                }
            }
        }
        ids
    }

    pub fn is_immune_to(&self, family: &str) -> bool {
        self.immunities.iter().any(|f| f == family)
    }
}
