//! Discrete combat actions emitted for the presentation layer
//!
//! Every resolution step appends actions in order. A turn's actions can be
//! folded into a `TurnSummary` for display or statistics.

use serde::{Deserialize, Serialize};

use crate::core::types::{Side, UnitKey};

/// Why a unit (or a whole side) did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoValidTargets,
    Stunned,
    /// The player chose to pass
    Requested,
    /// No living units on the acting side
    NoUnits,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            SkipReason::NoValidTargets => "no valid targets",
            SkipReason::Stunned => "stunned",
            SkipReason::Requested => "skipped",
            SkipReason::NoUnits => "no units",
        };
        write!(f, "{}", text)
    }
}

/// One step of combat resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BattleAction {
    Attack {
        attacker: UnitKey,
        target: UnitKey,
        ability_id: String,
        hp_damage: u32,
        armor_damage: u32,
        critical: bool,
        damage_percent: u32,
    },
    Dodge {
        attacker: UnitKey,
        target: UnitKey,
        ability_id: String,
        dodge_chance: u32,
    },
    Heal {
        healer: UnitKey,
        target: UnitKey,
        ability_id: String,
        amount: u32,
    },
    StatusApplied {
        source: UnitKey,
        target: UnitKey,
        effect_id: String,
        duration: u32,
    },
    /// Target is immune to the effect's family
    StatusImmune {
        source: UnitKey,
        target: UnitKey,
        effect_id: String,
        family: String,
    },
    StatusTick {
        target: UnitKey,
        effect_id: String,
        hp_damage: u32,
        armor_damage: u32,
        remaining_duration: u32,
    },
    StatusExpired {
        target: UnitKey,
        effect_id: String,
    },
    Death {
        unit: UnitKey,
        unit_id: String,
        killer: Option<UnitKey>,
    },
    Skip {
        unit: Option<UnitKey>,
        reason: SkipReason,
    },
    RowCollapsed {
        side: Side,
        row: u8,
    },
    WaveStarted {
        wave: usize,
        units: usize,
    },
}

/// Aggregated outcome of one turn's actions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnSummary {
    /// HP lost to attacks and DoT ticks
    pub hp_damage: u32,
    pub armor_damage: u32,
    /// Portion of `hp_damage` + `armor_damage` dealt by ticks
    pub dot_damage: u32,
    pub healing: u32,
    pub hits: u32,
    pub dodges: u32,
    pub crits: u32,
    pub kills: u32,
    pub friendly_deaths: u32,
    pub enemy_deaths: u32,
    pub statuses_applied: u32,
    pub status_immunities: u32,
    pub skips: u32,
}

/// Fold a list of actions into totals
pub fn calculate_turn_summary(actions: &[BattleAction]) -> TurnSummary {
    let mut summary = TurnSummary::default();
    for action in actions {
        match action {
            BattleAction::Attack {
                hp_damage,
                armor_damage,
                critical,
                ..
            } => {
                summary.hits += 1;
                summary.hp_damage += hp_damage;
                summary.armor_damage += armor_damage;
                if *critical {
                    summary.crits += 1;
                }
            }
            BattleAction::Dodge { .. } => summary.dodges += 1,
            BattleAction::Heal { amount, .. } => summary.healing += amount,
            BattleAction::StatusApplied { .. } => summary.statuses_applied += 1,
            BattleAction::StatusImmune { .. } => summary.status_immunities += 1,
            BattleAction::StatusTick {
                hp_damage,
                armor_damage,
                ..
            } => {
                summary.hp_damage += hp_damage;
                summary.armor_damage += armor_damage;
                summary.dot_damage += hp_damage + armor_damage;
            }
            BattleAction::Death { unit, .. } => {
                summary.kills += 1;
                match unit.side {
                    Side::Friendly => summary.friendly_deaths += 1,
                    Side::Enemy => summary.enemy_deaths += 1,
                }
            }
            BattleAction::Skip { .. } => summary.skips += 1,
            BattleAction::StatusExpired { .. }
            | BattleAction::RowCollapsed { .. }
            | BattleAction::WaveStarted { .. } => {}
        }
    }
    summary
}
