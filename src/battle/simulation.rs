//! Drive a battle to completion without a presentation layer

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::battle::actions::{calculate_turn_summary, BattleAction, TurnSummary};
use crate::battle::ai::BattlePolicy;
use crate::battle::state::{BattleState, TurnPhase};
use crate::battle::turn::{resolve_enemy_turn, resolve_player_turn, PlayerCommand};
use crate::core::types::Side;
use crate::data::GameData;

/// How an automated battle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleOutcome {
    Victory,
    Defeat,
    /// Hit the turn limit
    Unresolved,
}

/// Compact result of a finished (or abandoned) battle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleResult {
    pub outcome: BattleOutcome,
    pub turns: u32,
    pub waves_cleared: usize,
    pub friendly_survivors: usize,
    pub totals: TurnSummary,
}

impl BattleResult {
    pub fn from_state(state: &BattleState) -> Self {
        let outcome = match state.phase {
            TurnPhase::BattleOver { player_won: true } => BattleOutcome::Victory,
            TurnPhase::BattleOver { player_won: false } => BattleOutcome::Defeat,
            _ => BattleOutcome::Unresolved,
        };
        let waves_cleared = match outcome {
            BattleOutcome::Victory => state.total_waves(),
            _ => state.current_wave,
        };
        let actions: Vec<BattleAction> = state
            .log
            .iter()
            .flat_map(|record| record.actions.iter().cloned())
            .collect();
        Self {
            outcome,
            turns: state.log.len() as u32,
            waves_cleared,
            friendly_survivors: state.decisive_survivors(Side::Friendly),
            totals: calculate_turn_summary(&actions),
        }
    }
}

/// Play until the battle ends or `max_turns` side turns have passed
///
/// The player side follows `policy`; the enemy side uses the built-in AI.
/// A rejected player command is replaced by a skip so the loop always
/// progresses.
pub fn simulate_battle<P, R>(
    data: &GameData,
    state: BattleState,
    policy: &mut P,
    rng: &mut R,
    max_turns: u32,
) -> BattleState
where
    P: BattlePolicy + ?Sized,
    R: Rng + ?Sized,
{
    let mut state = state;
    while !state.is_battle_over() && (state.log.len() as u32) < max_turns {
        state = match state.phase {
            TurnPhase::PlayerTurn => {
                let command = policy.choose_command(data, &state);
                let transition = resolve_player_turn(data, state, command, rng);
                if transition.accepted {
                    transition.state
                } else {
                    tracing::warn!("Policy '{}' issued an illegal command, skipping", policy.name());
                    resolve_player_turn(data, transition.state, PlayerCommand::Skip, rng).state
                }
            }
            TurnPhase::EnemyTurn => resolve_enemy_turn(data, state, rng).state,
            TurnPhase::BattleOver { .. } => break,
        };
    }
    if !state.is_battle_over() {
        tracing::info!("Battle unresolved after {} turns", state.log.len());
    }
    state
}
