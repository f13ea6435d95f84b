use thiserror::Error;

use crate::core::types::GridId;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Unknown ability '{ability}' referenced by {owner}")]
    UnknownAbility { owner: String, ability: String },

    #[error("Unknown status effect '{effect}' referenced by {owner}")]
    UnknownStatusEffect { owner: String, effect: String },

    #[error("Invalid unit definition '{0}': {1}")]
    InvalidUnit(String, String),

    #[error("Invalid formation: grid slot {0} is used twice")]
    DuplicateGridSlot(GridId),

    #[error("Invalid formation: grid slot {grid_id} is outside a {columns}x3 grid")]
    GridSlotOutOfRange { grid_id: GridId, columns: u8 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Battle has no waves")]
    NoWaves,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
