//! One simulation step
//!
//! Terrain edits are applied once per step, then the contention pass and
//! density scores are derived from the settled index, then needs and group
//! sizes are updated. Everything runs to completion before the step returns.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::contention::allocator::ContentionReport;
use crate::core::error::Result;
use crate::core::types::{PopulationId, Tick};
use crate::density::{DensityEstimator, DENSITY_NO_DATA};
use crate::population::needs::PopulationNeeds;
use crate::simulation::world::HabitatWorld;

/// Something that happened during a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimulationEvent {
    /// Terrain edits forced these populations to be flood filled again
    TerrainRecomputed {
        changed_cells: usize,
        populations: Vec<PopulationId>,
    },
    /// Food a population took from the contention pass
    FoodAcquired {
        population: PopulationId,
        acquired: f32,
        required: f32,
    },
    PopulationGrew {
        population: PopulationId,
        from: u32,
        to: u32,
    },
    PopulationDeclined {
        population: PopulationId,
        from: u32,
        to: u32,
    },
    /// Group size reached zero; the slot has been released
    PopulationExtinct {
        population: PopulationId,
        name: String,
    },
}

/// Per-population state at the end of a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationSummary {
    pub id: PopulationId,
    pub name: String,
    pub group_size: u32,
    pub reachable_area: usize,
    /// `DENSITY_NO_DATA` when the population reaches nothing
    pub density_score: f32,
    pub acquired: f32,
    pub needs: PopulationNeeds,
}

/// Everything a step produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub tick: Tick,
    pub recomputed: Vec<PopulationId>,
    pub contention: ContentionReport,
    pub populations: Vec<PopulationSummary>,
    pub events: Vec<SimulationEvent>,
}

impl TickReport {
    pub fn summary(&self, id: PopulationId) -> Option<&PopulationSummary> {
        self.populations.iter().find(|p| p.id == id)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Run one simulation step
pub fn run_habitat_tick(world: &mut HabitatWorld) -> Result<TickReport> {
    let mut events = Vec::new();

    let recomputed = apply_pending_terrain(world, &mut events);

    if world.allocator.is_dirty() {
        world.allocator.sync_access(&world.index);
    }
    let contention = world.allocator.run_pass();

    let scores: AHashMap<PopulationId, f32> =
        DensityEstimator::new(&world.index, world.config.per_unit_footprint)
            .all_scores()
            .into_iter()
            .collect();

    let (populations, extinct) = update_needs(world, &contention, &scores, &mut events)?;

    for (id, name) in extinct {
        world.remove_population(id)?;
        tracing::info!(population = %id, %name, tick = world.current_tick, "population extinct");
        events.push(SimulationEvent::PopulationExtinct { population: id, name });
    }

    let report = TickReport {
        tick: world.current_tick,
        recomputed,
        contention,
        populations,
        events,
    };
    world.current_tick += 1;
    Ok(report)
}

/// Drain the step's terrain edits and recompute each affected population once
fn apply_pending_terrain(world: &mut HabitatWorld, events: &mut Vec<SimulationEvent>) -> Vec<PopulationId> {
    if world.pending.is_empty() {
        return Vec::new();
    }

    let changed = world.pending.drain();
    let recomputed = world.index.apply_terrain_changes(&changed);
    if !recomputed.is_empty() {
        world.allocator.invalidate();
    }

    tracing::debug!(
        tick = world.current_tick,
        changed = changed.len(),
        recomputed = recomputed.len(),
        "terrain edits applied"
    );
    events.push(SimulationEvent::TerrainRecomputed {
        changed_cells: changed.len(),
        populations: recomputed.clone(),
    });
    recomputed
}

type NeedsOutcome = (Vec<PopulationSummary>, Vec<(PopulationId, String)>);

/// Feed acquisitions and density into needs, then grow or shrink each group
fn update_needs(
    world: &mut HabitatWorld,
    contention: &ContentionReport,
    scores: &AHashMap<PopulationId, f32>,
    events: &mut Vec<SimulationEvent>,
) -> Result<NeedsOutcome> {
    let snapshot: Vec<(PopulationId, String, u32)> = world
        .index
        .populations()
        .map(|h| (h.id, h.name.clone(), h.group_size))
        .collect();

    let mut summaries = Vec::with_capacity(snapshot.len());
    let mut extinct = Vec::new();

    for (id, name, group_size) in snapshot {
        let acquired = contention.acquired(id);
        let required = PopulationNeeds::food_required(group_size, &world.config);
        let score = scores.get(&id).copied().unwrap_or(DENSITY_NO_DATA);

        let needs = world.needs.entry(id).or_default();
        needs.update(acquired, required, score, &world.config);
        let delta = needs.growth_delta(group_size, &mut world.rng, &world.config);
        let needs = needs.clone();

        events.push(SimulationEvent::FoodAcquired {
            population: id,
            acquired,
            required,
        });

        let new_size = (group_size as i64 + delta).clamp(0, u32::MAX as i64) as u32;
        if new_size != group_size {
            world.index.set_group_size(id, new_size)?;
            let event = if new_size > group_size {
                SimulationEvent::PopulationGrew {
                    population: id,
                    from: group_size,
                    to: new_size,
                }
            } else {
                SimulationEvent::PopulationDeclined {
                    population: id,
                    from: group_size,
                    to: new_size,
                }
            };
            events.push(event);
        }

        summaries.push(PopulationSummary {
            id,
            name: name.clone(),
            group_size: new_size,
            reachable_area: world.index.reachable_area(id),
            density_score: score,
            acquired,
            needs,
        });

        if new_size == 0 {
            extinct.push((id, name));
        }
    }

    Ok((summaries, extinct))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::HabitatConfig;
    use crate::core::types::CellKey;
    use crate::population::handle::PopulationHandle;
    use crate::spatial::terrain::{TerrainGrid, TerrainKind};

    fn quiet_config() -> HabitatConfig {
        HabitatConfig {
            birth_chance: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_tick_counter_advances() {
        let mut world =
            HabitatWorld::new(TerrainGrid::new(4, 4, TerrainKind::Grass), quiet_config()).unwrap();
        let r0 = run_habitat_tick(&mut world).unwrap();
        let r1 = run_habitat_tick(&mut world).unwrap();
        assert_eq!(r0.tick, 0);
        assert_eq!(r1.tick, 1);
        assert_eq!(world.current_tick, 2);
    }

    #[test]
    fn test_fed_population_is_reported() {
        let mut world =
            HabitatWorld::new(TerrainGrid::new(8, 8, TerrainKind::Grass), quiet_config()).unwrap();
        let herd = PopulationHandle::new("herd", CellKey::new(0, 0)).with_group_size(4);
        let id = herd.id;
        world.add_population(herd).unwrap();
        world.add_source(CellKey::new(3, 3), 10.0).unwrap();

        let report = run_habitat_tick(&mut world).unwrap();
        let summary = report.summary(id).unwrap();
        assert!((summary.acquired - 10.0).abs() < 1e-6);
        assert_eq!(summary.needs.food, 0.0);
        assert_eq!(summary.group_size, 4);
        assert_eq!(summary.reachable_area, 64);
        assert!(report.events.iter().any(|e| matches!(
            e,
            SimulationEvent::FoodAcquired { population, .. } if *population == id
        )));
        assert!(report.to_json().unwrap().contains("FoodAcquired"));
    }

    #[test]
    fn test_terrain_edits_applied_once_per_tick() {
        let mut world =
            HabitatWorld::new(TerrainGrid::new(6, 1, TerrainKind::Grass), quiet_config()).unwrap();
        let herd = PopulationHandle::new("herd", CellKey::new(0, 0));
        let id = herd.id;
        world.add_population(herd).unwrap();

        world.paint(CellKey::new(3, 0), TerrainKind::Wall).unwrap();
        world.paint(CellKey::new(4, 0), TerrainKind::Wall).unwrap();
        // Not applied yet
        assert_eq!(world.index().reachable_area(id), 6);

        let report = run_habitat_tick(&mut world).unwrap();
        assert_eq!(report.recomputed, vec![id]);
        assert_eq!(world.index().reachable_area(id), 3);
        assert_eq!(world.pending_changes(), 0);
        assert!(report.events.iter().any(|e| matches!(
            e,
            SimulationEvent::TerrainRecomputed { changed_cells: 2, .. }
        )));
    }

    #[test]
    fn test_starving_population_goes_extinct() {
        let mut world =
            HabitatWorld::new(TerrainGrid::new(4, 4, TerrainKind::Grass), quiet_config()).unwrap();
        let doomed = PopulationHandle::new("doomed", CellKey::new(0, 0)).with_group_size(3);
        let id = doomed.id;
        world.add_population(doomed).unwrap();

        let mut extinct = false;
        for _ in 0..100 {
            let report = run_habitat_tick(&mut world).unwrap();
            if report
                .events
                .iter()
                .any(|e| matches!(e, SimulationEvent::PopulationExtinct { population, .. } if *population == id))
            {
                extinct = true;
                break;
            }
        }

        assert!(extinct);
        assert!(!world.index().contains(id));
        assert_eq!(world.population_count(), 0);
    }
}
