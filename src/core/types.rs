//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};

/// Slot index on one side's formation grid
pub type GridId = u8;

/// Unit rank (1-based index into a unit's stat table)
pub type Rank = u8;

/// Which formation a unit fights for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Friendly,
    Enemy,
}

impl Side {
    /// The side facing this one
    pub fn opponent(&self) -> Side {
        match self {
            Side::Friendly => Side::Enemy,
            Side::Enemy => Side::Friendly,
        }
    }
}

/// Identifies one unit within a battle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitKey {
    pub side: Side,
    pub grid_id: GridId,
}

impl UnitKey {
    pub fn new(side: Side, grid_id: GridId) -> Self {
        Self { side, grid_id }
    }
}

impl std::fmt::Display for UnitKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.side {
            Side::Friendly => "f",
            Side::Enemy => "e",
        };
        write!(f, "{}{}", prefix, self.grid_id)
    }
}

/// Damage channel used for resistance lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    Piercing,
    Crushing,
    Explosive,
    Fire,
    Cold,
    Arcane,
}

impl DamageType {
    pub const ALL: [DamageType; 6] = [
        DamageType::Piercing,
        DamageType::Crushing,
        DamageType::Explosive,
        DamageType::Fire,
        DamageType::Cold,
        DamageType::Arcane,
    ];
}

/// How strongly a unit obstructs shots passing its tile
///
/// Ordering matters: a unit blocks a shot when its tier meets or exceeds
/// the shot's threshold.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BlockingTier {
    #[default]
    None,
    Partial,
    Full,
    God,
}

/// Line-of-fire class of an ability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineOfFire {
    /// Lobbed over everything
    Indirect,
    /// Stopped by anything standing in front
    Contact,
    #[default]
    Direct,
    /// Only stopped by full cover
    Precise,
}

impl LineOfFire {
    /// Minimum blocking tier that stops this shot, `None` if nothing can
    pub fn blocking_threshold(&self) -> Option<BlockingTier> {
        match self {
            LineOfFire::Indirect => None,
            // Presence alone blocks contact attacks, including `BlockingTier::None`
            LineOfFire::Contact => Some(BlockingTier::None),
            LineOfFire::Direct => Some(BlockingTier::Partial),
            LineOfFire::Precise => Some(BlockingTier::Full),
        }
    }
}
