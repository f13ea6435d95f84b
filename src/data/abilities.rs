//! Ability definitions as loaded from static data
//!
//! These are rank-independent. Rank-dependent values (offense, scaled damage,
//! crit) are resolved per use into an `AbilityInfo`.

use serde::{Deserialize, Serialize};

use crate::core::types::{DamageType, LineOfFire, Rank};

/// One tile of a target area, relative to its anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaTile {
    /// Column offset (battlefield columns, same direction on both grids)
    pub x: i8,
    /// Row offset, positive is deeper into the formation
    pub y: i8,
    #[serde(default = "full_damage")]
    pub damage_percent: u32,
}

fn full_damage() -> u32 {
    100
}

impl AreaTile {
    pub fn new(x: i8, y: i8, damage_percent: u32) -> Self {
        Self {
            x,
            y,
            damage_percent,
        }
    }
}

/// Which tiles an ability affects
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TargetArea {
    /// Just the chosen target
    #[default]
    Single,
    /// Offsets around an anchor; `fixed` anchors to the caster's column
    /// on the opposing front row instead of a chosen target
    Area {
        tiles: Vec<AreaTile>,
        #[serde(default)]
        fixed: bool,
    },
    /// Each shot lands on a uniformly sampled occupied tile
    ///
    /// `tiles` are absolute positions on the opposing grid; an empty list
    /// means the whole grid.
    Random {
        #[serde(default)]
        tiles: Vec<AreaTile>,
    },
}

impl TargetArea {
    pub fn is_random(&self) -> bool {
        matches!(self, TargetArea::Random { .. })
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self, TargetArea::Area { fixed: true, .. })
    }
}

/// Which formation an ability is aimed at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetSide {
    #[default]
    Enemy,
    Friendly,
}

/// What a successful hit does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbilityEffect {
    #[default]
    Damage,
    Heal,
}

/// Chance to inflict a status effect on hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChance {
    pub effect: String,
    /// Base percent chance at 100% area damage
    pub chance: u32,
}

/// Extra crit chance against targets carrying a tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagBonus {
    pub tag: String,
    pub bonus: i32,
}

/// Static definition of an ability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbilityDef {
    pub id: String,
    pub name: String,
    pub damage_type: DamageType,
    pub min_damage: u32,
    pub max_damage: u32,
    /// Added to the caster's accuracy to form offense
    pub attack: i32,
    pub crit_percent: i32,
    pub crit_bonuses: Vec<TagBonus>,
    pub armor_piercing_percent: u32,
    /// Tag filter; empty targets anything
    pub targets: Vec<String>,
    pub min_range: u32,
    pub max_range: u32,
    pub line_of_fire: LineOfFire,
    pub cooldown: u32,
    pub ammo_cost: u32,
    /// Own turns that must pass before the first use
    pub charge_time: u32,
    pub min_rank: Rank,
    pub shots_per_attack: u32,
    pub attacks_per_use: u32,
    pub target_side: TargetSide,
    pub effect: AbilityEffect,
    pub target_area: TargetArea,
    pub status_effects: Vec<StatusChance>,
}

impl Default for AbilityDef {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            damage_type: DamageType::Piercing,
            min_damage: 0,
            max_damage: 0,
            attack: 0,
            crit_percent: 0,
            crit_bonuses: Vec::new(),
            armor_piercing_percent: 0,
            targets: Vec::new(),
            min_range: 1,
            max_range: 1,
            line_of_fire: LineOfFire::Direct,
            cooldown: 0,
            ammo_cost: 1,
            charge_time: 0,
            min_rank: 1,
            shots_per_attack: 1,
            attacks_per_use: 1,
            target_side: TargetSide::Enemy,
            effect: AbilityEffect::Damage,
            target_area: TargetArea::Single,
            status_effects: Vec::new(),
        }
    }
}

impl AbilityDef {
    /// Total shots fired per use
    pub fn total_shots(&self) -> u32 {
        self.shots_per_attack.max(1) * self.attacks_per_use.max(1)
    }

    pub fn is_heal(&self) -> bool {
        self.effect == AbilityEffect::Heal
    }
}
