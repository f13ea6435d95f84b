//! Turn state machine
//!
//! `PlayerTurn -> EnemyTurn -> PlayerTurn ...` until `BattleOver`. Each
//! transition consumes the current `BattleState` and returns the next one
//! inside a `Transition`. A rejected request hands back the state untouched
//! with `accepted == false`.
//!
//! Per side turn:
//! 1. start-of-turn status tick for that side (end and wave checks follow)
//! 2. the side's single action (player command or AI choice)
//! 3. row collapse on both grids, at most one new row per side
//! 4. cooldown, reload and charge countdown for the acting side
//! 5. end and wave checks

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::battle::actions::{calculate_turn_summary, BattleAction, SkipReason};
use crate::battle::ai::run_ai_turn;
use crate::battle::execution::{execute_attack, reduce_cooldowns};
use crate::battle::grid::collapse_grid;
use crate::battle::state::{spawn_wave, BattleState, TurnPhase, TurnRecord};
use crate::battle::status::process_status_effects;
use crate::core::config::config;
use crate::core::types::{GridId, Side, UnitKey};
use crate::data::GameData;

/// What the player asks for on their turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum PlayerCommand {
    Attack {
        unit: GridId,
        ability_id: String,
        /// Slot on the ability's target side; ignored by fixed and random abilities
        target: GridId,
    },
    Skip,
}

/// Result of a state machine step
#[derive(Debug, Clone)]
pub struct Transition {
    pub state: BattleState,
    pub accepted: bool,
    /// Actions produced by this step, in order
    pub actions: Vec<BattleAction>,
}

impl Transition {
    fn rejected(state: BattleState) -> Self {
        Self {
            state,
            accepted: false,
            actions: Vec::new(),
        }
    }

    fn accepted(state: BattleState, actions: Vec<BattleAction>) -> Self {
        Self {
            state,
            accepted: true,
            actions,
        }
    }
}

/// Whether the battle is decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleEndCheck {
    pub is_over: bool,
    pub player_won: bool,
}

/// Decide the battle from surviving non-ignorable units
///
/// Losing every friendly unit is a defeat even if the enemy died too. The
/// enemy side only loses once its last wave is cleared. Pure and idempotent.
pub fn check_battle_end(state: &BattleState) -> BattleEndCheck {
    if state.decisive_survivors(Side::Friendly) == 0 {
        return BattleEndCheck {
            is_over: true,
            player_won: false,
        };
    }
    let last_wave = state.current_wave + 1 >= state.total_waves();
    if state.decisive_survivors(Side::Enemy) == 0 && last_wave {
        return BattleEndCheck {
            is_over: true,
            player_won: true,
        };
    }
    BattleEndCheck {
        is_over: false,
        player_won: false,
    }
}

/// Enemy wave cleared with more waves to come
pub fn can_advance_wave(state: &BattleState) -> bool {
    state.decisive_survivors(Side::Enemy) == 0 && state.current_wave + 1 < state.total_waves()
}

/// Bring in the next wave; only the enemy grid's collapsed rows reset
fn start_next_wave(data: &GameData, state: &mut BattleState) -> Option<BattleAction> {
    let next = state.current_wave + 1;
    let units = spawn_wave(data, state.layout, state.waves.get(next)?);
    state.current_wave = next;
    state.enemy_units = units;
    state.enemy_collapsed.clear();
    tracing::info!(
        "Wave {}/{} begins with {} units",
        next + 1,
        state.total_waves(),
        state.enemy_units.len()
    );
    Some(BattleAction::WaveStarted {
        wave: next,
        units: state.enemy_units.len(),
    })
}

/// Advance to the next wave if the current one is cleared
///
/// Not accepted (and unchanged) when enemies remain or no waves are left.
pub fn advance_wave(data: &GameData, state: BattleState) -> Transition {
    if !can_advance_wave(&state) {
        return Transition::rejected(state);
    }
    let mut state = state;
    let actions = start_next_wave(data, &mut state).into_iter().collect();
    state.phase = TurnPhase::EnemyTurn;
    Transition::accepted(state, actions)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Continue,
    WaveAdvanced,
    Over,
}

/// End check then wave check, repeated so empty waves are skipped
fn resolve_outcome(
    data: &GameData,
    state: &mut BattleState,
    actions: &mut Vec<BattleAction>,
) -> Outcome {
    let mut advanced = false;
    loop {
        let end = check_battle_end(state);
        if end.is_over {
            state.phase = TurnPhase::BattleOver {
                player_won: end.player_won,
            };
            tracing::info!(
                "Battle over on turn {}: {}",
                state.current_turn,
                if end.player_won { "victory" } else { "defeat" }
            );
            return Outcome::Over;
        }
        if !can_advance_wave(state) {
            break;
        }
        match start_next_wave(data, state) {
            Some(action) => {
                actions.push(action);
                advanced = true;
            }
            None => break,
        }
    }
    if advanced {
        Outcome::WaveAdvanced
    } else {
        Outcome::Continue
    }
}

/// Collapse rows on both grids, then count down the acting side
fn settle(state: &mut BattleState, acting: Side) -> Vec<BattleAction> {
    let mut actions = Vec::new();
    let max_new = config().max_rows_collapsed_per_turn;
    for side in [acting.opponent(), acting] {
        let previous = state.collapsed(side).clone();
        let collapsed = collapse_grid(state.units(side), &previous, max_new);
        for &row in collapsed.difference(&previous) {
            actions.push(BattleAction::RowCollapsed { side, row });
        }
        *state.collapsed_mut(side) = collapsed;
    }
    reduce_cooldowns(state.units_mut(acting));
    actions
}

/// Move the turn's actions into the log
fn close_turn(state: &mut BattleState, side: Side, actions: &[BattleAction]) {
    state.pending_actions.extend_from_slice(actions);
    let turn_actions = std::mem::take(&mut state.pending_actions);
    let summary = calculate_turn_summary(&turn_actions);
    tracing::debug!(
        "Turn {} ({:?}): {} actions, {} hp damage, {} kills",
        state.current_turn,
        side,
        turn_actions.len(),
        summary.hp_damage,
        summary.kills
    );
    state.log.push(TurnRecord {
        turn: state.current_turn,
        wave: state.current_wave,
        side,
        actions: turn_actions,
        summary,
    });
    state.current_turn += 1;
}

/// Start-of-turn tick for a side followed by end and wave checks
fn begin_side_turn(
    data: &GameData,
    state: &mut BattleState,
    side: Side,
    actions: &mut Vec<BattleAction>,
) -> Outcome {
    let environment = state.environment.clone();
    actions.extend(process_status_effects(data, state.units_mut(side), &environment));
    resolve_outcome(data, state, actions)
}

/// Resolve the player's command
pub fn resolve_player_turn<R: Rng + ?Sized>(
    data: &GameData,
    state: BattleState,
    command: PlayerCommand,
    rng: &mut R,
) -> Transition {
    if state.phase != TurnPhase::PlayerTurn {
        tracing::debug!("Player command outside the player turn");
        return Transition::rejected(state);
    }
    let mut state = state;

    let mut actions = match command {
        PlayerCommand::Skip => vec![BattleAction::Skip {
            unit: None,
            reason: SkipReason::Requested,
        }],
        PlayerCommand::Attack {
            unit,
            ability_id,
            target,
        } => {
            let caster = UnitKey::new(Side::Friendly, unit);
            let acted = execute_attack(data, &mut state, caster, &ability_id, target, rng);
            if acted.is_empty() {
                return Transition::rejected(state);
            }
            acted
        }
    };

    actions.extend(settle(&mut state, Side::Friendly));
    let outcome = resolve_outcome(data, &mut state, &mut actions);
    close_turn(&mut state, Side::Friendly, &actions);
    if outcome != Outcome::Over {
        state.phase = TurnPhase::EnemyTurn;
    }
    Transition::accepted(state, actions)
}

/// Resolve a whole enemy turn and open the next player turn
///
/// Enemy effects tick first; if that ends the battle or clears the wave,
/// it is handled before the AI picks an action.
pub fn resolve_enemy_turn<R: Rng + ?Sized>(
    data: &GameData,
    state: BattleState,
    rng: &mut R,
) -> Transition {
    if state.phase != TurnPhase::EnemyTurn {
        tracing::debug!("Enemy turn requested outside the enemy turn");
        return Transition::rejected(state);
    }
    let mut state = state;
    let mut actions = Vec::new();

    if begin_side_turn(data, &mut state, Side::Enemy, &mut actions) == Outcome::Over {
        close_turn(&mut state, Side::Enemy, &actions);
        return Transition::accepted(state, actions);
    }

    actions.extend(run_ai_turn(data, &mut state, Side::Enemy, rng));
    actions.extend(settle(&mut state, Side::Enemy));
    let outcome = resolve_outcome(data, &mut state, &mut actions);
    close_turn(&mut state, Side::Enemy, &actions);

    match outcome {
        Outcome::Over => {}
        // A fresh wave acts first
        Outcome::WaveAdvanced => state.phase = TurnPhase::EnemyTurn,
        Outcome::Continue => {
            state.phase = TurnPhase::PlayerTurn;
            let mut upkeep = Vec::new();
            begin_side_turn(data, &mut state, Side::Friendly, &mut upkeep);
            if state.is_battle_over() {
                close_turn(&mut state, Side::Friendly, &upkeep);
            } else {
                state.pending_actions.extend_from_slice(&upkeep);
            }
            actions.extend(upkeep);
        }
    }
    Transition::accepted(state, actions)
}
