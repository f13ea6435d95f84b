//! Battle Grid - turn-based grid combat engine
//!
//! Two formations face each other on mirrored grids. Each turn one side
//! acts, then effects tick and empty rows collapse. Enemies arrive in
//! waves; the battle ends when the player side is wiped or the last wave
//! is cleared.

pub mod battle;
pub mod core;
pub mod data;
