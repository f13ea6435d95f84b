//! Status effect families and their definitions

use serde::{Deserialize, Serialize};

use crate::core::types::DamageType;
use crate::data::units::ResistanceTable;

/// What an active effect does each turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StatusKind {
    /// Skips the unit's actions and strips its armor's protection
    Stun,
    /// Deals floor(expected hit * dot_multiplier + dot_bonus) per tick
    DamageOverTime {
        damage_type: DamageType,
        #[serde(default = "one")]
        dot_multiplier: f32,
        #[serde(default)]
        dot_bonus: i32,
        #[serde(default)]
        armor_piercing_percent: u32,
    },
    /// Reduces incoming damage by percent per damage type while active
    Mitigation {
        #[serde(default)]
        modifiers: ResistanceTable,
    },
}

fn one() -> f32 {
    1.0
}

/// Static definition of a status effect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEffectDef {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Immunities are granted per family
    pub family: String,
    /// Turns of the afflicted side the effect lasts
    pub duration: u32,
    pub kind: StatusKind,
}

impl StatusEffectDef {
    pub fn is_stun(&self) -> bool {
        matches!(self.kind, StatusKind::Stun)
    }
}
