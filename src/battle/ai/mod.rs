//! Action selection for AI-driven sides
//!
//! Architecture: flat pool + swappable policy
//! - `build_action_pool` lists every legal (unit, ability, targets) triple
//!   using the same availability and targeting rules as the player path
//! - `select_action` samples the pool uniformly, then a target uniformly
//! - `BattlePolicy` lets the runner drive the player side the same way

mod random_policy;

pub use random_policy::RandomPolicy;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::battle::ability::get_available_abilities;
use crate::battle::actions::{BattleAction, SkipReason};
use crate::battle::execution::{execute_attack, execute_random_attack};
use crate::battle::state::BattleState;
use crate::battle::targeting::get_valid_targets;
use crate::battle::turn::PlayerCommand;
use crate::core::types::{GridId, Side, UnitKey};
use crate::data::GameData;

/// One legal use of an ability and everything it may be aimed at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCandidate {
    pub unit: UnitKey,
    pub ability_id: String,
    /// Slots on the ability's target side
    pub targets: Vec<GridId>,
    /// Shots pick their own tiles; the target is informational
    pub random: bool,
}

/// A sampled action ready to execute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChosenAction {
    pub unit: UnitKey,
    pub ability_id: String,
    pub target: GridId,
    pub random: bool,
}

/// Every legal (unit, ability, targets) triple for a side
///
/// Dead and stunned units contribute nothing. The pool is flat and
/// unweighted across all acting units.
pub fn build_action_pool(data: &GameData, state: &BattleState, side: Side) -> Vec<ActionCandidate> {
    let view = state.view(side);
    let mut pool = Vec::new();
    for unit in state.units(side).iter().filter(|u| u.can_act()) {
        for info in get_available_abilities(data, unit, view) {
            let targets: Vec<GridId> = get_valid_targets(data, unit, &info, view)
                .iter()
                .map(|t| t.grid_id)
                .collect();
            if targets.is_empty() {
                continue;
            }
            pool.push(ActionCandidate {
                unit: unit.key(),
                random: info.target_area.is_random(),
                ability_id: info.ability_id,
                targets,
            });
        }
    }
    pool
}

/// Uniform triple, then uniform target
pub fn select_action<R: Rng + ?Sized>(pool: &[ActionCandidate], rng: &mut R) -> Option<ChosenAction> {
    if pool.is_empty() {
        return None;
    }
    let candidate = &pool[rng.gen_range(0..pool.len())];
    if candidate.targets.is_empty() {
        return None;
    }
    let target = candidate.targets[rng.gen_range(0..candidate.targets.len())];
    Some(ChosenAction {
        unit: candidate.unit,
        ability_id: candidate.ability_id.clone(),
        target,
        random: candidate.random,
    })
}

/// Skips logged when a side cannot act at all
fn skip_actions(state: &BattleState, side: Side) -> Vec<BattleAction> {
    let living: Vec<_> = state.units(side).iter().filter(|u| u.is_alive()).collect();
    if living.is_empty() {
        return vec![BattleAction::Skip {
            unit: None,
            reason: SkipReason::NoUnits,
        }];
    }
    living
        .into_iter()
        .map(|u| BattleAction::Skip {
            unit: Some(u.key()),
            reason: if u.can_act() {
                SkipReason::NoValidTargets
            } else {
                SkipReason::Stunned
            },
        })
        .collect()
}

/// Pick and execute one action for a side
///
/// Does not tick effects or counters; the turn state machine does that.
pub fn run_ai_turn<R: Rng + ?Sized>(
    data: &GameData,
    state: &mut BattleState,
    side: Side,
    rng: &mut R,
) -> Vec<BattleAction> {
    let pool = build_action_pool(data, state, side);
    let Some(choice) = select_action(&pool, rng) else {
        tracing::debug!("{:?} side has no legal action", side);
        return skip_actions(state, side);
    };

    tracing::debug!(
        "{:?} AI: {} uses {} on slot {} (pool of {})",
        side,
        choice.unit,
        choice.ability_id,
        choice.target,
        pool.len()
    );
    let actions = if choice.random {
        execute_random_attack(data, state, choice.unit, &choice.ability_id, rng)
    } else {
        execute_attack(data, state, choice.unit, &choice.ability_id, choice.target, rng)
    };
    if actions.is_empty() {
        // Pool entries are legal by construction; treat a refusal as a skip
        return vec![BattleAction::Skip {
            unit: Some(choice.unit),
            reason: SkipReason::NoValidTargets,
        }];
    }
    actions
}

/// Decides the player's command each turn
pub trait BattlePolicy {
    fn choose_command(&mut self, data: &GameData, state: &BattleState) -> PlayerCommand;

    fn name(&self) -> &str;
}
