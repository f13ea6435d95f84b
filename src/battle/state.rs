//! Battle state: per-battle unit instances and the authoritative snapshot
//!
//! `BattleState` is owned by exactly one caller at a time. Turn transitions
//! in `battle::turn` take it by value and hand back the next snapshot.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::battle::actions::{BattleAction, TurnSummary};
use crate::battle::grid::{GridCoord, GridLayout};
use crate::core::error::{EngineError, Result};
use crate::core::types::{GridId, Rank, Side, UnitKey};
use crate::data::{GameData, ResistanceTable};

/// A status effect currently afflicting a unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveStatusEffect {
    pub effect_id: String,
    pub family: String,
    /// Afflicted side's turns left, removed at zero
    pub remaining_duration: u32,
    pub is_stun: bool,
    /// Expected damage of the hit that applied it (DoT base)
    pub expected_damage: u32,
    pub source: Option<UnitKey>,
}

/// Ammunition state of one weapon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponState {
    /// `None` never runs dry
    pub ammo: Option<u32>,
    pub max_ammo: Option<u32>,
    pub reload_time: u32,
    /// Counter until the magazine refills, 0 when not reloading
    pub reload_remaining: u32,
}

impl WeaponState {
    pub fn is_reloading(&self) -> bool {
        self.reload_remaining > 0
    }

    pub fn has_ammo(&self, cost: u32) -> bool {
        match self.ammo {
            Some(ammo) => ammo >= cost,
            None => true,
        }
    }
}

/// Mutable per-battle instance of a unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatUnit {
    pub grid_id: GridId,
    pub side: Side,
    pub coord: GridCoord,
    pub unit_id: String,
    pub rank: Rank,
    pub current_hp: u32,
    pub max_hp: u32,
    pub current_armor: u32,
    pub max_armor: u32,
    pub is_dead: bool,
    /// Excluded from victory and wave-clear checks
    pub ignorable: bool,
    /// Ability id -> counter, absent when ready
    pub cooldowns: BTreeMap<String, u32>,
    pub weapons: Vec<WeaponState>,
    /// Ability id -> own turns still needed before first use
    pub charge_remaining: BTreeMap<String, u32>,
    pub status_effects: Vec<ActiveStatusEffect>,
    /// Stun snapshot taken at the start of this unit's turn
    pub stunned_this_turn: bool,
}

impl CombatUnit {
    /// Spawn a unit at full health from static data
    ///
    /// Returns `None` when the unit id or its stats are unknown.
    pub fn spawn(
        data: &GameData,
        layout: GridLayout,
        side: Side,
        slot: &FormationSlot,
    ) -> Option<Self> {
        let def = data.unit(&slot.unit_id)?;
        let stats = def.stats(slot.rank)?;
        let coord = layout.coord(side, slot.grid_id)?;

        let weapons = def
            .weapons
            .iter()
            .map(|w| WeaponState {
                ammo: w.ammo,
                max_ammo: w.ammo,
                reload_time: w.reload_time,
                reload_remaining: 0,
            })
            .collect();

        let mut charge_remaining = BTreeMap::new();
        for ability_id in def.ability_ids() {
            if let Some(ability) = data.ability(ability_id) {
                if ability.charge_time > 0 {
                    charge_remaining.insert(ability_id.to_string(), ability.charge_time);
                }
            }
        }

        Some(Self {
            grid_id: slot.grid_id,
            side,
            coord,
            unit_id: slot.unit_id.clone(),
            rank: slot.rank,
            current_hp: stats.hp,
            max_hp: stats.hp,
            current_armor: stats.armor,
            max_armor: stats.armor,
            is_dead: stats.hp == 0,
            ignorable: def.ignorable,
            cooldowns: BTreeMap::new(),
            weapons,
            charge_remaining,
            status_effects: Vec::new(),
            stunned_this_turn: false,
        })
    }

    pub fn key(&self) -> UnitKey {
        UnitKey::new(self.side, self.grid_id)
    }

    pub fn is_alive(&self) -> bool {
        !self.is_dead
    }

    /// Any stun effect still active
    pub fn is_stunned(&self) -> bool {
        self.status_effects
            .iter()
            .any(|e| e.is_stun && e.remaining_duration > 0)
    }

    pub fn can_act(&self) -> bool {
        self.is_alive() && !self.stunned_this_turn && !self.is_stunned()
    }

    pub fn cooldown(&self, ability_id: &str) -> u32 {
        self.cooldowns.get(ability_id).copied().unwrap_or(0)
    }

    pub fn charge(&self, ability_id: &str) -> u32 {
        self.charge_remaining.get(ability_id).copied().unwrap_or(0)
    }

    /// Apply damage, clamped to what is left; returns (hp, armor) actually lost
    pub fn take_damage(&mut self, hp_damage: u32, armor_damage: u32) -> (u32, u32) {
        let hp = hp_damage.min(self.current_hp);
        let armor = armor_damage.min(self.current_armor);
        self.current_hp -= hp;
        self.current_armor -= armor;
        if self.current_hp == 0 {
            self.is_dead = true;
            self.status_effects.clear();
        }
        (hp, armor)
    }

    /// Restore HP up to max; returns the amount healed
    pub fn heal(&mut self, amount: u32) -> u32 {
        if self.is_dead {
            return 0;
        }
        let healed = amount.min(self.max_hp - self.current_hp);
        self.current_hp += healed;
        healed
    }
}

/// One placed unit in a formation or wave
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormationSlot {
    pub unit_id: String,
    pub grid_id: GridId,
    #[serde(default = "first_rank")]
    pub rank: Rank,
}

fn first_rank() -> Rank {
    1
}

impl FormationSlot {
    pub fn new(unit_id: &str, grid_id: GridId, rank: Rank) -> Self {
        Self {
            unit_id: unit_id.to_string(),
            grid_id,
            rank,
        }
    }
}

/// The player's placed units
pub type Formation = Vec<FormationSlot>;

/// A batch of enemy units introduced once the previous batch is cleared
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Wave {
    #[serde(default)]
    pub units: Vec<FormationSlot>,
}

impl Wave {
    pub fn new(units: Vec<FormationSlot>) -> Self {
        Self { units }
    }
}

/// Per-type damage reductions from the battlefield
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Environment {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub modifiers: ResistanceTable,
}

/// Where the state machine stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum TurnPhase {
    PlayerTurn,
    EnemyTurn,
    BattleOver { player_won: bool },
}

/// One completed side turn in the battle log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub turn: u32,
    pub wave: usize,
    pub side: Side,
    pub actions: Vec<BattleAction>,
    pub summary: TurnSummary,
}

/// Authoritative battle snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleState {
    pub layout: GridLayout,
    pub friendly_units: Vec<CombatUnit>,
    pub enemy_units: Vec<CombatUnit>,
    pub friendly_collapsed: BTreeSet<u8>,
    pub enemy_collapsed: BTreeSet<u8>,
    pub waves: Vec<Wave>,
    pub current_wave: usize,
    pub current_turn: u32,
    pub phase: TurnPhase,
    pub environment: Environment,
    /// Actions of the side turn in progress (start-of-turn ticks included)
    pub pending_actions: Vec<BattleAction>,
    pub log: Vec<TurnRecord>,
}

impl BattleState {
    pub fn total_waves(&self) -> usize {
        self.waves.len()
    }

    pub fn is_player_turn(&self) -> bool {
        self.phase == TurnPhase::PlayerTurn
    }

    pub fn is_battle_over(&self) -> bool {
        matches!(self.phase, TurnPhase::BattleOver { .. })
    }

    pub fn is_player_victory(&self) -> bool {
        self.phase == TurnPhase::BattleOver { player_won: true }
    }

    pub fn units(&self, side: Side) -> &[CombatUnit] {
        match side {
            Side::Friendly => &self.friendly_units,
            Side::Enemy => &self.enemy_units,
        }
    }

    pub fn units_mut(&mut self, side: Side) -> &mut Vec<CombatUnit> {
        match side {
            Side::Friendly => &mut self.friendly_units,
            Side::Enemy => &mut self.enemy_units,
        }
    }

    pub fn collapsed(&self, side: Side) -> &BTreeSet<u8> {
        match side {
            Side::Friendly => &self.friendly_collapsed,
            Side::Enemy => &self.enemy_collapsed,
        }
    }

    pub fn collapsed_mut(&mut self, side: Side) -> &mut BTreeSet<u8> {
        match side {
            Side::Friendly => &mut self.friendly_collapsed,
            Side::Enemy => &mut self.enemy_collapsed,
        }
    }

    pub fn unit(&self, key: UnitKey) -> Option<&CombatUnit> {
        self.units(key.side).iter().find(|u| u.grid_id == key.grid_id)
    }

    pub fn unit_mut(&mut self, key: UnitKey) -> Option<&mut CombatUnit> {
        self.units_mut(key.side)
            .iter_mut()
            .find(|u| u.grid_id == key.grid_id)
    }

    /// Living units on a side that decide the battle
    pub fn decisive_survivors(&self, side: Side) -> usize {
        self.units(side)
            .iter()
            .filter(|u| u.is_alive() && !u.ignorable)
            .count()
    }

    /// The board as seen by one side
    pub fn view(&self, side: Side) -> BattleView<'_> {
        BattleView {
            layout: self.layout,
            allies: self.units(side),
            opponents: self.units(side.opponent()),
            ally_collapsed: self.collapsed(side),
            opponent_collapsed: self.collapsed(side.opponent()),
        }
    }
}

/// Borrowed board from one side's perspective
///
/// Bundles the two unit collections and both collapsed-row sets that
/// availability and targeting checks need.
#[derive(Debug, Clone, Copy)]
pub struct BattleView<'a> {
    pub layout: GridLayout,
    pub allies: &'a [CombatUnit],
    pub opponents: &'a [CombatUnit],
    pub ally_collapsed: &'a BTreeSet<u8>,
    pub opponent_collapsed: &'a BTreeSet<u8>,
}

/// Reject duplicate or off-grid slots
fn validate_slots(layout: GridLayout, slots: &[FormationSlot]) -> Result<()> {
    let mut seen = BTreeSet::new();
    for slot in slots {
        if !layout.contains(slot.grid_id) {
            return Err(EngineError::GridSlotOutOfRange {
                grid_id: slot.grid_id,
                columns: layout.columns,
            });
        }
        if !seen.insert(slot.grid_id) {
            return Err(EngineError::DuplicateGridSlot(slot.grid_id));
        }
    }
    Ok(())
}

/// Spawn every slot, skipping unknown units with a warning
pub(crate) fn spawn_units(
    data: &GameData,
    layout: GridLayout,
    side: Side,
    slots: &[FormationSlot],
) -> Vec<CombatUnit> {
    slots
        .iter()
        .filter_map(|slot| {
            let unit = CombatUnit::spawn(data, layout, side, slot);
            if unit.is_none() {
                tracing::warn!(
                    "Unknown unit '{}' at {:?} slot {}, leaving it empty",
                    slot.unit_id,
                    side,
                    slot.grid_id
                );
            }
            unit
        })
        .collect()
}

/// Spawn an enemy wave; wave units always enter at rank 1
pub(crate) fn spawn_wave(data: &GameData, layout: GridLayout, wave: &Wave) -> Vec<CombatUnit> {
    let slots: Vec<FormationSlot> = wave
        .units
        .iter()
        .map(|slot| {
            if slot.rank != 1 {
                tracing::debug!(
                    "Wave slot {} lists rank {} for '{}', spawning at rank 1",
                    slot.grid_id,
                    slot.rank,
                    slot.unit_id
                );
            }
            FormationSlot::new(&slot.unit_id, slot.grid_id, 1)
        })
        .collect();
    spawn_units(data, layout, Side::Enemy, &slots)
}

/// Create a battle from the player's formation and the enemy waves
///
/// Structural problems (no waves, duplicate or off-grid slots, starting wave
/// out of range) are errors. Unknown unit ids are dropped with a warning.
/// Battles starting past the first wave open on the enemy's turn.
pub fn initialize_battle(
    data: &GameData,
    layout: GridLayout,
    formation: &[FormationSlot],
    waves: Vec<Wave>,
    starting_wave: usize,
) -> Result<BattleState> {
    if waves.is_empty() {
        return Err(EngineError::NoWaves);
    }
    if starting_wave >= waves.len() {
        return Err(EngineError::InvalidConfig(format!(
            "starting wave {} but only {} waves",
            starting_wave,
            waves.len()
        )));
    }
    validate_slots(layout, formation)?;
    for wave in &waves {
        validate_slots(layout, &wave.units)?;
    }

    let friendly_units = spawn_units(data, layout, Side::Friendly, formation);
    let enemy_units = spawn_wave(data, layout, &waves[starting_wave]);

    let phase = if starting_wave == 0 {
        TurnPhase::PlayerTurn
    } else {
        TurnPhase::EnemyTurn
    };

    tracing::info!(
        "Battle initialized: {} friendly vs {} enemy, wave {}/{}",
        friendly_units.len(),
        enemy_units.len(),
        starting_wave + 1,
        waves.len()
    );

    Ok(BattleState {
        layout,
        friendly_units,
        enemy_units,
        friendly_collapsed: BTreeSet::new(),
        enemy_collapsed: BTreeSet::new(),
        waves,
        current_wave: starting_wave,
        current_turn: 1,
        phase,
        environment: Environment::default(),
        pending_actions: Vec::new(),
        log: Vec::new(),
    })
}
