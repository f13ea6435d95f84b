//! Static game data: units, abilities, status effects and tags
//!
//! Everything here is read-only during a battle. Catalogs are loaded from
//! TOML files in a data directory (see `data/` at the repository root) or
//! assembled in code for tests.

pub mod abilities;
pub mod status_effects;
pub mod tags;
pub mod units;

use ahash::AHashMap;
use serde::Deserialize;
use std::path::Path;

use crate::core::error::{EngineError, Result};
use crate::core::types::Rank;

pub use abilities::{
    AbilityDef, AbilityEffect, AreaTile, StatusChance, TagBonus, TargetArea, TargetSide,
};
pub use status_effects::{StatusEffectDef, StatusKind};
pub use tags::{TagHierarchy, TagIndex};
pub use units::{RankStats, ResistanceTable, UnitDef, WeaponDef};

/// TOML representation of `units.toml`
#[derive(Debug, Deserialize)]
struct TomlUnits {
    #[serde(default)]
    units: Vec<UnitDef>,
}

/// TOML representation of `abilities.toml`
#[derive(Debug, Deserialize)]
struct TomlAbilities {
    #[serde(default)]
    abilities: Vec<AbilityDef>,
}

/// TOML representation of `status_effects.toml`
#[derive(Debug, Deserialize)]
struct TomlStatusEffects {
    #[serde(default)]
    status_effects: Vec<StatusEffectDef>,
}

/// Read-only lookup tables consumed by the combat engine
#[derive(Debug, Clone, Default)]
pub struct GameData {
    units: AHashMap<String, UnitDef>,
    abilities: AHashMap<String, AbilityDef>,
    status_effects: AHashMap<String, StatusEffectDef>,
    tags: TagIndex,
}

impl GameData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_unit(&mut self, unit: UnitDef) {
        self.units.insert(unit.id.clone(), unit);
    }

    pub fn add_ability(&mut self, ability: AbilityDef) {
        self.abilities.insert(ability.id.clone(), ability);
    }

    pub fn add_status_effect(&mut self, effect: StatusEffectDef) {
        self.status_effects.insert(effect.id.clone(), effect);
    }

    /// Replace the tag hierarchy, rebuilding its closure
    pub fn set_tag_hierarchy(&mut self, hierarchy: &TagHierarchy) {
        self.tags = hierarchy.closure();
    }

    pub fn unit(&self, id: &str) -> Option<&UnitDef> {
        self.units.get(id)
    }

    pub fn unit_stats(&self, id: &str, rank: Rank) -> Option<&RankStats> {
        self.units.get(id).and_then(|u| u.stats(rank))
    }

    pub fn ability(&self, id: &str) -> Option<&AbilityDef> {
        self.abilities.get(id)
    }

    pub fn status_effect(&self, id: &str) -> Option<&StatusEffectDef> {
        self.status_effects.get(id)
    }

    pub fn tags(&self) -> &TagIndex {
        &self.tags
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn ability_count(&self) -> usize {
        self.abilities.len()
    }

    pub fn status_effect_count(&self) -> usize {
        self.status_effects.len()
    }

    /// Load `units.toml`, `abilities.toml`, `status_effects.toml` and
    /// `tags.toml` from a directory
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let units = std::fs::read_to_string(dir.join("units.toml"))?;
        let abilities = std::fs::read_to_string(dir.join("abilities.toml"))?;
        let effects = std::fs::read_to_string(dir.join("status_effects.toml"))?;
        let tags = std::fs::read_to_string(dir.join("tags.toml"))?;
        let data = Self::parse_toml(&units, &abilities, &effects, &tags)?;
        tracing::info!(
            "Loaded {} units, {} abilities, {} status effects from {}",
            data.unit_count(),
            data.ability_count(),
            data.status_effect_count(),
            dir.display()
        );
        Ok(data)
    }

    /// Parse all four catalogs from TOML strings and validate references
    pub fn parse_toml(units: &str, abilities: &str, effects: &str, tags: &str) -> Result<Self> {
        let units: TomlUnits = toml::from_str(units)?;
        let abilities: TomlAbilities = toml::from_str(abilities)?;
        let effects: TomlStatusEffects = toml::from_str(effects)?;
        let hierarchy: TagHierarchy = toml::from_str(tags)?;

        let mut data = Self::new();
        for unit in units.units {
            data.add_unit(unit);
        }
        for ability in abilities.abilities {
            data.add_ability(ability);
        }
        for effect in effects.status_effects {
            data.add_status_effect(effect);
        }
        data.set_tag_hierarchy(&hierarchy);
        data.validate()?;
        Ok(data)
    }

    /// Check for dangling references and malformed definitions
    ///
    /// The engine tolerates missing data at runtime (abilities degrade to
    /// unavailable), so this is a load-time lint rather than a requirement.
    pub fn validate(&self) -> Result<()> {
        for unit in self.units.values() {
            if unit.ranks.is_empty() {
                return Err(EngineError::InvalidUnit(
                    unit.id.clone(),
                    "no ranks defined".into(),
                ));
            }
            for ability in unit.ability_ids() {
                if !self.abilities.contains_key(ability) {
                    return Err(EngineError::UnknownAbility {
                        owner: unit.id.clone(),
                        ability: ability.to_string(),
                    });
                }
            }
        }

        for ability in self.abilities.values() {
            if ability.min_damage > ability.max_damage {
                return Err(EngineError::InvalidConfig(format!(
                    "ability '{}' has min_damage {} above max_damage {}",
                    ability.id, ability.min_damage, ability.max_damage
                )));
            }
            for chance in &ability.status_effects {
                if !self.status_effects.contains_key(&chance.effect) {
                    return Err(EngineError::UnknownStatusEffect {
                        owner: ability.id.clone(),
                        effect: chance.effect.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}
