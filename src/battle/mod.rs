//! Battle system - turn-based combat between two mirrored formation grids
//!
//! One action per side per turn. The player side is driven by commands, the
//! enemy side by a flat random AI; both go through the same availability,
//! targeting and execution rules.
//!
//! Key pieces:
//! - Grid geometry with collapsing rows that shorten range
//! - Line-of-fire blocking by unit tier
//! - Layered HP/armor damage with piercing, resistances and a full breakdown
//! - Status effects with DoT, stun and immunities
//! - Waves of enemies and a value-semantics turn state machine

pub mod ability;
pub mod actions;
pub mod ai;
pub mod damage;
pub mod execution;
pub mod grid;
pub mod scenario;
pub mod simulation;
pub mod state;
pub mod status;
pub mod targeting;
pub mod turn;

// Re-exports for convenient access
pub use ability::{
    ability_unavailable_reason, get_available_abilities, known_abilities, AbilityInfo, Unavailable,
};
pub use actions::{calculate_turn_summary, BattleAction, SkipReason, TurnSummary};
pub use ai::{
    build_action_pool, run_ai_turn, select_action, ActionCandidate, BattlePolicy, ChosenAction,
    RandomPolicy,
};
pub use damage::{
    crit_chance, dodge_chance, mitigate, preview_damage, resolve_hit, scaled_damage,
    DamageBreakdown, DamagePreview, DefenderProfile, HitOutcome, Mitigation,
    ModifierSource,
};
pub use execution::{execute_attack, execute_random_attack, reduce_cooldowns};
pub use grid::{collapse_grid, manhattan_distance, range_between, GridCoord, GridLayout};
pub use scenario::Scenario;
pub use simulation::{simulate_battle, BattleOutcome, BattleResult};
pub use state::{
    initialize_battle, ActiveStatusEffect, BattleState, BattleView, CombatUnit, Environment,
    Formation, FormationSlot, TurnPhase, TurnRecord, Wave,
};
pub use status::{apply_status, process_status_effects, roll_status_effects};
pub use targeting::{
    area_tiles, check_line_of_fire, expected_hits_per_tile, fixed_anchor, get_valid_targets,
    random_candidate_tiles, LineOfFireCheck,
};
pub use turn::{
    advance_wave, check_battle_end, resolve_enemy_turn, resolve_player_turn, BattleEndCheck,
    PlayerCommand, Transition,
};
