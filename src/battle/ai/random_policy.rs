//! Uniform random policy for autopiloting the player side

use rand::Rng;

use super::{build_action_pool, select_action, BattlePolicy};
use crate::battle::state::BattleState;
use crate::battle::turn::PlayerCommand;
use crate::core::types::Side;
use crate::data::GameData;

/// Plays the player side with the same selector the enemy AI uses
pub struct RandomPolicy<R: Rng> {
    rng: R,
}

impl<R: Rng> RandomPolicy<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> BattlePolicy for RandomPolicy<R> {
    fn choose_command(&mut self, data: &GameData, state: &BattleState) -> PlayerCommand {
        let pool = build_action_pool(data, state, Side::Friendly);
        match select_action(&pool, &mut self.rng) {
            Some(choice) => PlayerCommand::Attack {
                unit: choice.unit.grid_id,
                ability_id: choice.ability_id,
                target: choice.target,
            },
            None => PlayerCommand::Skip,
        }
    }

    fn name(&self) -> &str {
        "random"
    }
}
