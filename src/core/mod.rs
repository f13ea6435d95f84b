pub mod config;
pub mod error;
pub mod types;

pub use config::{config, set_config, EngineConfig};
pub use error::{EngineError, Result};
pub use types::{BlockingTier, DamageType, GridId, LineOfFire, Rank, Side, UnitKey};
