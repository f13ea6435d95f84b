//! Engine configuration with documented constants
//!
//! All combat tunables are collected here with explanations of their purpose
//! and how they interact with each other.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::error::{EngineError, Result};

/// Configuration for the combat engine
///
/// Defaults reproduce the stock rules. A TOML file (see `data/engine.toml`)
/// may override any subset of fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === HIT RESOLUTION ===
    /// Flat bonus added to the defender's side of the dodge formula
    ///
    /// dodge% = max(0, defense - offense + dodge_offset). At 5, two evenly
    /// matched units still dodge one shot in twenty.
    pub dodge_offset: i32,

    /// Damage gained per point of the caster's power stat
    ///
    /// scaled = floor(base * (1 + power_scaling_per_point * power)).
    /// At 0.02, a unit with 50 power deals double its listed damage.
    pub power_scaling_per_point: f32,

    /// Multiplier applied to a critical hit before mitigation
    pub crit_damage_multiplier: f32,

    // === GRID ===
    /// Rows that may collapse on one side in a single turn
    ///
    /// Keeping this at 1 makes range changes gradual: a wiped formation
    /// closes the gap one row per turn rather than all at once.
    pub max_rows_collapsed_per_turn: usize,

    /// Columns per formation grid (5 for standard battles, 4 for narrow ones)
    pub grid_columns: u8,

    // === SAFETY ===
    /// Hard cap on turns for automated runs
    ///
    /// The engine itself never loops; the runner stops a battle that has not
    /// finished by this turn and records it as unresolved.
    pub max_turns: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dodge_offset: 5,
            power_scaling_per_point: 0.02,
            crit_damage_multiplier: 1.5,
            max_rows_collapsed_per_turn: 1,
            grid_columns: 5,
            max_turns: 200,
        }
    }
}

impl EngineConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if !(4..=5).contains(&self.grid_columns) {
            return Err(EngineError::InvalidConfig(format!(
                "grid_columns ({}) must be 4 or 5",
                self.grid_columns
            )));
        }

        if self.power_scaling_per_point < 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "power_scaling_per_point ({}) must not be negative",
                self.power_scaling_per_point
            )));
        }

        if self.crit_damage_multiplier < 1.0 {
            return Err(EngineError::InvalidConfig(format!(
                "crit_damage_multiplier ({}) must be at least 1.0",
                self.crit_damage_multiplier
            )));
        }

        if self.max_rows_collapsed_per_turn == 0 {
            return Err(EngineError::InvalidConfig(
                "max_rows_collapsed_per_turn must be at least 1".into(),
            ));
        }

        if self.max_turns == 0 {
            return Err(EngineError::InvalidConfig("max_turns must be positive".into()));
        }

        Ok(())
    }

    /// Load and validate a config from a TOML file
    pub fn load_from_toml(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    /// Parse and validate a config from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }
}

// === GLOBAL CONFIG ACCESS ===

use std::sync::OnceLock;

static CONFIG: OnceLock<EngineConfig> = OnceLock::new();

/// Get the global engine config (initializes with defaults if not set)
pub fn config() -> &'static EngineConfig {
    CONFIG.get_or_init(EngineConfig::default)
}

/// Set the global engine config (can only be called once)
///
/// Returns Err if config was already set.
pub fn set_config(config: EngineConfig) -> std::result::Result<(), EngineConfig> {
    CONFIG.set(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_columns() {
        let config = EngineConfig {
            grid_columns: 7,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_crit_below_one() {
        let config = EngineConfig {
            crit_damage_multiplier: 0.5,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::parse_toml("grid_columns = 4\n").unwrap();
        assert_eq!(config.grid_columns, 4);
        assert_eq!(config.dodge_offset, 5);
        assert_eq!(config.max_rows_collapsed_per_turn, 1);
    }

    #[test]
    fn test_invalid_toml_value_is_error() {
        assert!(EngineConfig::parse_toml("max_turns = 0\n").is_err());
    }
}
