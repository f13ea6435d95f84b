//! Scenario files: a player formation plus the enemy waves it faces

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::battle::grid::GridLayout;
use crate::battle::state::{initialize_battle, BattleState, Environment, FormationSlot, Wave};
use crate::core::config::config;
use crate::core::error::{EngineError, Result};
use crate::data::GameData;

fn default_columns() -> u8 {
    config().grid_columns
}

/// A ready-to-run battle setup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default = "default_columns")]
    pub columns: u8,
    #[serde(default)]
    pub starting_wave: usize,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub formation: Vec<FormationSlot>,
    #[serde(default)]
    pub waves: Vec<Wave>,
}

impl Scenario {
    /// Load a scenario from a TOML file
    pub fn load_from_toml(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    /// Parse a scenario from TOML
    pub fn parse_toml(content: &str) -> Result<Self> {
        let scenario: Scenario = toml::from_str(content)?;
        if !(4..=5).contains(&scenario.columns) {
            return Err(EngineError::InvalidConfig(format!(
                "scenario '{}' has {} columns, expected 4 or 5",
                scenario.name, scenario.columns
            )));
        }
        Ok(scenario)
    }

    pub fn layout(&self) -> GridLayout {
        GridLayout::new(self.columns)
    }

    /// Build the opening battle state
    pub fn initialize(&self, data: &GameData) -> Result<BattleState> {
        let mut state = initialize_battle(
            data,
            self.layout(),
            &self.formation,
            self.waves.clone(),
            self.starting_wave,
        )?;
        state.environment = self.environment.clone();
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::DamageType;

    const SCENARIO: &str = r#"
        name = "Ridge"
        columns = 4

        [environment]
        name = "Rain"
        modifiers = { fire = 30 }

        [[formation]]
        unit_id = "rifleman"
        grid_id = 1
        rank = 2

        [[waves]]
        units = [{ unit_id = "raider", grid_id = 0 }]

        [[waves]]
        units = [{ unit_id = "raider", grid_id = 0 }, { unit_id = "brute", grid_id = 5, rank = 3 }]
    "#;

    #[test]
    fn test_parse_scenario() {
        let scenario = Scenario::parse_toml(SCENARIO).unwrap();
        assert_eq!(scenario.layout(), GridLayout::narrow());
        assert_eq!(scenario.formation[0].rank, 2);
        assert_eq!(scenario.waves.len(), 2);
        assert_eq!(scenario.waves[0].units[0].rank, 1);
        assert_eq!(scenario.waves[1].units[1].rank, 3);
        assert_eq!(scenario.environment.modifiers.get(DamageType::Fire), 30);
        assert_eq!(scenario.starting_wave, 0);
    }

    #[test]
    fn test_rejects_bad_columns() {
        let result = Scenario::parse_toml("name = \"x\"\ncolumns = 6\n");
        assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn test_initialize_without_waves_fails() {
        let scenario = Scenario::parse_toml("name = \"empty\"\n").unwrap();
        assert!(matches!(
            scenario.initialize(&GameData::new()),
            Err(EngineError::NoWaves)
        ));
    }
}
