//! Population needs and growth
//!
//! Consumes the food a population acquired in the contention pass and its
//! density score, and turns them into hunger, crowding, health and a change
//! in group size.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::config::HabitatConfig;
use crate::density::DENSITY_NO_DATA;

/// Needs shared by every population
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationNeeds {
    /// 0.0 = fed, 1.0 = starving
    pub food: f32,
    /// 0.0 = roomy, 1.0 = packed
    pub crowding: f32,
    /// 1.0 = thriving, 0.0 = dying out
    pub health: f32,
}

impl Default for PopulationNeeds {
    fn default() -> Self {
        Self {
            food: 0.0,
            crowding: 0.0,
            health: 1.0,
        }
    }
}

impl PopulationNeeds {
    /// Food this population needs per tick
    pub fn food_required(group_size: u32, config: &HabitatConfig) -> f32 {
        group_size as f32 * config.food_per_unit
    }

    /// Fold one tick of food and crowding into the needs
    pub fn update(&mut self, acquired: f32, required: f32, density_score: f32, config: &HabitatConfig) {
        self.food = if required > 0.0 {
            (1.0 - acquired / required).clamp(0.0, 1.0)
        } else {
            0.0
        };

        // No reachable cells means no crowding signal; keep the old value
        if density_score != DENSITY_NO_DATA && density_score.is_finite() {
            let excess = density_score - config.crowding_tolerance;
            self.crowding = if excess > 0.0 {
                (excess / density_score.max(f32::EPSILON)).clamp(0.0, 1.0)
            } else {
                0.0
            };
        }

        let loss = self.food * config.starvation_rate + self.crowding * config.crowding_penalty;
        let gain = if self.food == 0.0 && self.crowding == 0.0 {
            config.recovery_rate
        } else {
            0.0
        };
        self.health = (self.health + gain - loss).clamp(0.0, 1.0);
    }

    pub fn is_thriving(&self) -> bool {
        self.food == 0.0 && self.health >= 0.99
    }

    /// Change in group size for this tick.
    ///
    /// Below the mortality threshold a share of the group dies in proportion
    /// to how far health has fallen; thriving groups roll for births.
    pub fn growth_delta<R: Rng>(&self, group_size: u32, rng: &mut R, config: &HabitatConfig) -> i64 {
        if group_size == 0 {
            return 0;
        }

        if self.health < config.mortality_threshold {
            let severity = if config.mortality_threshold > 0.0 {
                1.0 - self.health / config.mortality_threshold
            } else {
                1.0
            };
            let deaths = ((group_size as f32 * severity * 0.5).ceil() as i64).max(1);
            return -deaths.min(group_size as i64);
        }

        if self.is_thriving() && rng.gen::<f32>() < config.birth_chance {
            let births = ((group_size as f32 * config.growth_rate).floor() as i64).max(1);
            return births;
        }

        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_fully_fed_roomy_population_recovers() {
        let config = HabitatConfig::default();
        let mut needs = PopulationNeeds {
            health: 0.5,
            ..Default::default()
        };
        needs.update(10.0, 10.0, 0.1, &config);
        assert_eq!(needs.food, 0.0);
        assert_eq!(needs.crowding, 0.0);
        assert!((needs.health - 0.55).abs() < 1e-6);
    }

    #[test]
    fn test_starvation_hurts() {
        let config = HabitatConfig::default();
        let mut needs = PopulationNeeds::default();
        needs.update(0.0, 10.0, 0.1, &config);
        assert_eq!(needs.food, 1.0);
        assert!((needs.health - (1.0 - config.starvation_rate)).abs() < 1e-6);

        needs.update(5.0, 10.0, 0.1, &config);
        assert!((needs.food - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_crowding_from_density() {
        let config = HabitatConfig::default(); // tolerance 0.5
        let mut needs = PopulationNeeds::default();
        needs.update(1.0, 1.0, 1.0, &config);
        assert!((needs.crowding - 0.5).abs() < 1e-6);

        // No data leaves crowding untouched
        needs.update(1.0, 1.0, DENSITY_NO_DATA, &config);
        assert!((needs.crowding - 0.5).abs() < 1e-6);

        needs.update(1.0, 1.0, 0.2, &config);
        assert_eq!(needs.crowding, 0.0);
    }

    #[test]
    fn test_dying_population_shrinks() {
        let config = HabitatConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let needs = PopulationNeeds {
            food: 1.0,
            crowding: 0.0,
            health: 0.0,
        };
        assert_eq!(needs.growth_delta(10, &mut rng, &config), -5);
        assert_eq!(needs.growth_delta(1, &mut rng, &config), -1);
        assert_eq!(needs.growth_delta(0, &mut rng, &config), 0);
    }

    #[test]
    fn test_thriving_population_can_grow() {
        let config = HabitatConfig {
            birth_chance: 1.0,
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let needs = PopulationNeeds::default();
        assert_eq!(needs.growth_delta(20, &mut rng, &config), 2);
        assert_eq!(needs.growth_delta(3, &mut rng, &config), 1);

        let never = HabitatConfig {
            birth_chance: 0.0,
            ..Default::default()
        };
        assert_eq!(needs.growth_delta(20, &mut rng, &never), 0);
    }
}
