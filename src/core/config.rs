//! Habitat configuration with documented constants
//!
//! All tunable numbers are collected here with explanations of their purpose
//! and how they interact with each other. The config is passed explicitly to
//! `HabitatWorld::new`; there is no process-wide instance.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{HabitatError, Result};

/// Configuration for density, contention and growth systems
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HabitatConfig {
    // === DENSITY ===
    /// Cells of habitat a single individual occupies
    ///
    /// A population of `n` individuals spread over `area` reachable cells
    /// contributes `n * per_unit_footprint / area` to every cell it reaches.
    /// At 1.0 a density of 1.0 means "one individual per cell".
    pub per_unit_footprint: f32,

    /// Density score above which a population starts to feel crowded
    ///
    /// Scores at or below this value leave the crowding need untouched.
    pub crowding_tolerance: f32,

    // === FOOD ===
    /// Food each individual needs per tick
    ///
    /// A population's requirement is `group_size * food_per_unit`; the
    /// fraction of that requirement it fails to acquire drives hunger.
    pub food_per_unit: f32,

    // === NEEDS / GROWTH ===
    /// Fraction of health recovered per tick when fed and uncrowded
    pub recovery_rate: f32,

    /// Health lost per tick at full starvation (food need = 1.0)
    pub starvation_rate: f32,

    /// Health lost per tick per unit of crowding need
    pub crowding_penalty: f32,

    /// Chance per tick that a healthy, fed population grows
    ///
    /// Rolled once per population per tick from the seeded RNG.
    pub birth_chance: f32,

    /// Fraction of the group added on a successful birth roll (at least one)
    pub growth_rate: f32,

    /// Health below which individuals start dying
    pub mortality_threshold: f32,

    // === DETERMINISM ===
    /// Seed for the simulation RNG (birth rolls)
    pub seed: u64,
}

impl Default for HabitatConfig {
    fn default() -> Self {
        Self {
            // Density
            per_unit_footprint: 1.0,
            crowding_tolerance: 0.5,

            // Food
            food_per_unit: 1.0,

            // Needs and growth
            recovery_rate: 0.05,
            starvation_rate: 0.1,
            crowding_penalty: 0.05,
            birth_chance: 0.1,
            growth_rate: 0.1,
            mortality_threshold: 0.3,

            seed: 42,
        }
    }
}

impl HabitatConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document; missing keys fall back to defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: HabitatConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.per_unit_footprint <= 0.0 {
            return Err(HabitatError::InvalidConfig(format!(
                "per_unit_footprint ({}) must be positive",
                self.per_unit_footprint
            )));
        }

        if self.food_per_unit <= 0.0 {
            return Err(HabitatError::InvalidConfig(format!(
                "food_per_unit ({}) must be positive",
                self.food_per_unit
            )));
        }

        if self.crowding_tolerance < 0.0 {
            return Err(HabitatError::InvalidConfig(
                "crowding_tolerance must not be negative".into(),
            ));
        }

        let rates = [
            ("recovery_rate", self.recovery_rate),
            ("starvation_rate", self.starvation_rate),
            ("crowding_penalty", self.crowding_penalty),
            ("growth_rate", self.growth_rate),
        ];
        for (name, rate) in rates {
            if rate < 0.0 {
                return Err(HabitatError::InvalidConfig(format!(
                    "{} ({}) must not be negative",
                    name, rate
                )));
            }
        }

        let probabilities = [
            ("birth_chance", self.birth_chance),
            ("mortality_threshold", self.mortality_threshold),
        ];
        for (name, p) in probabilities {
            if !(0.0..=1.0).contains(&p) {
                return Err(HabitatError::InvalidConfig(format!(
                    "{} ({}) must be within [0, 1]",
                    name, p
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(HabitatConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = HabitatConfig::from_toml_str(
            r#"
            per_unit_footprint = 2.0
            seed = 7
            "#,
        )
        .unwrap();

        assert_eq!(config.per_unit_footprint, 2.0);
        assert_eq!(config.seed, 7);
        assert_eq!(config.food_per_unit, HabitatConfig::default().food_per_unit);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = HabitatConfig::from_toml_str("food_per_unit = 0.0").unwrap_err();
        assert!(matches!(err, HabitatError::InvalidConfig(_)));

        let err = HabitatConfig::from_toml_str("birth_chance = 1.5").unwrap_err();
        assert!(matches!(err, HabitatError::InvalidConfig(_)));

        let err = HabitatConfig::from_toml_str("starvation_rate = -0.1").unwrap_err();
        assert!(matches!(err, HabitatError::InvalidConfig(_)));
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let config = HabitatConfig::from_toml_str(include_str!("../../config/habitat.toml")).unwrap();
        assert_eq!(config, HabitatConfig::default());
    }

    #[test]
    fn test_malformed_toml_is_an_error() {
        let err = HabitatConfig::from_toml_str("per_unit_footprint = [").unwrap_err();
        assert!(matches!(err, HabitatError::Toml(_)));
    }
}
