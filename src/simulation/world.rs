//! Habitat world: terrain, populations, food sources and their needs
//!
//! Every collaborator is constructed here and handed its dependencies
//! explicitly; the index owns the terrain, the allocator and estimators
//! read from the index.

use ahash::AHashMap;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::access::index::AccessibilityIndex;
use crate::contention::allocator::{ContentionAllocator, ContentionOrder};
use crate::core::config::HabitatConfig;
use crate::core::error::{HabitatError, Result};
use crate::core::types::{CellKey, PopulationId, SlotId, SourceId, Tick};
use crate::density::DensityEstimator;
use crate::population::handle::PopulationHandle;
use crate::population::needs::PopulationNeeds;
use crate::spatial::terrain::{TerrainChangeBatch, TerrainGrid, TerrainKind, TerrainProvider};

/// Complete simulation state for one shared map
pub struct HabitatWorld {
    pub(crate) config: HabitatConfig,
    pub(crate) index: AccessibilityIndex<TerrainGrid>,
    pub(crate) allocator: ContentionAllocator,
    pub(crate) needs: AHashMap<PopulationId, PopulationNeeds>,
    pub(crate) pending: TerrainChangeBatch,
    pub(crate) rng: ChaCha8Rng,
    pub current_tick: Tick,
}

impl HabitatWorld {
    pub fn new(terrain: TerrainGrid, config: HabitatConfig) -> Result<Self> {
        config.validate()?;
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Ok(Self {
            index: AccessibilityIndex::new(terrain),
            allocator: ContentionAllocator::new(),
            needs: AHashMap::new(),
            pending: TerrainChangeBatch::new(),
            rng,
            config,
            current_tick: 0,
        })
    }

    pub fn config(&self) -> &HabitatConfig {
        &self.config
    }

    pub fn index(&self) -> &AccessibilityIndex<TerrainGrid> {
        &self.index
    }

    pub fn allocator(&self) -> &ContentionAllocator {
        &self.allocator
    }

    pub fn terrain(&self) -> &TerrainGrid {
        self.index.terrain()
    }

    /// Crowding view over the current reachability
    pub fn density(&self) -> DensityEstimator<'_, TerrainGrid> {
        DensityEstimator::new(&self.index, self.config.per_unit_footprint)
    }

    pub fn needs(&self, id: PopulationId) -> Option<&PopulationNeeds> {
        self.needs.get(&id)
    }

    pub fn population_count(&self) -> usize {
        self.index.live_count()
    }

    // === POPULATIONS ===

    pub fn add_population(&mut self, handle: PopulationHandle) -> Result<SlotId> {
        let id = handle.id;
        let name = handle.name.clone();
        let slot = self.index.add_population(handle)?;
        self.needs.insert(id, PopulationNeeds::default());
        self.allocator.invalidate();
        tracing::info!(population = %id, %name, slot = slot.0, "population added");
        Ok(slot)
    }

    pub fn remove_population(&mut self, id: PopulationId) -> Result<PopulationHandle> {
        let handle = self.index.remove_population(id)?;
        self.needs.remove(&id);
        self.allocator.invalidate();
        tracing::info!(population = %id, name = %handle.name, "population removed");
        Ok(handle)
    }

    pub fn relocate(&mut self, id: PopulationId, origin: CellKey) -> Result<usize> {
        let area = self.index.relocate(id, origin)?;
        self.allocator.invalidate();
        Ok(area)
    }

    pub fn set_dominance(&mut self, id: PopulationId, dominance: f32) -> Result<()> {
        self.index.set_dominance(id, dominance)?;
        self.allocator.invalidate();
        Ok(())
    }

    /// Replace the contention processing order
    pub fn set_contention_order(&mut self, order: ContentionOrder) {
        self.allocator.set_order(order);
    }

    // === FOOD ===

    pub fn add_source(&mut self, cell: CellKey, total_output: f32) -> Result<SourceId> {
        if !self.index.terrain().is_in_bounds(cell) {
            return Err(HabitatError::OutOfBounds(cell));
        }
        Ok(self.allocator.add_source(cell, total_output))
    }

    pub fn remove_source(&mut self, id: SourceId) -> Result<()> {
        self.allocator.remove_source(id)?;
        Ok(())
    }

    pub fn set_source_output(&mut self, id: SourceId, total_output: f32) -> Result<()> {
        self.allocator.set_output(id, total_output)
    }

    // === TERRAIN EDITS ===

    /// Change one cell. Reachability catches up at the next tick.
    pub fn paint(&mut self, cell: CellKey, kind: TerrainKind) -> Result<()> {
        let previous = self
            .index
            .terrain_mut()
            .set(cell, kind)
            .ok_or(HabitatError::OutOfBounds(cell))?;
        if previous != kind {
            self.pending.push(cell);
        }
        Ok(())
    }

    /// Paint an inclusive rectangle; returns how many cells changed
    pub fn paint_rect(&mut self, min: CellKey, max: CellKey, kind: TerrainKind) -> usize {
        let changed = self.index.terrain_mut().paint_rect(min, max, kind);
        let count = changed.len();
        self.pending.extend(changed);
        count
    }

    /// Edited cells waiting for the next tick
    pub fn pending_changes(&self) -> usize {
        self.pending.len()
    }
}
