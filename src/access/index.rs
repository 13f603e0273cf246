//! Per-population reachability masks and the pairwise overlap cache
//!
//! Every cell carries a `u64` access mask: bit *i* is set when the population
//! holding slot *i* can reach the cell. Alongside the masks the index keeps a
//! symmetric 64x64 matrix of overlap counts, `overlap[i][j]` being the number
//! of cells where both bit *i* and bit *j* are set (the diagonal holds each
//! population's reachable area).
//!
//! All mutation goes through the operations below so the matrix can never
//! drift from the masks. Recompute always clears a slot's bits before the
//! flood fill and rewrites that slot's full row and column afterwards.

use ahash::{AHashMap, AHashSet};

use crate::access::slots::SlotAllocator;
use crate::core::error::{HabitatError, Result};
use crate::core::types::{CellKey, PopulationId, SlotId, MAX_SLOTS};
use crate::population::handle::PopulationHandle;
use crate::spatial::grid::Grid;
use crate::spatial::terrain::TerrainProvider;

type OverlapMatrix = [[u32; MAX_SLOTS]; MAX_SLOTS];

/// A live population and the cells its last flood fill admitted
#[derive(Debug, Clone)]
struct SlotRecord {
    handle: PopulationHandle,
    cells: Vec<CellKey>,
}

/// Reachability index for up to 64 live populations on one terrain
pub struct AccessibilityIndex<P: TerrainProvider> {
    terrain: P,
    masks: Grid<u64>,
    overlap: Box<OverlapMatrix>,
    slots: SlotAllocator,
    records: Vec<Option<SlotRecord>>,
    by_id: AHashMap<PopulationId, SlotId>,
    /// Live slot bits keyed by origin cell. A population stuck on terrain it
    /// cannot cross has no mask bits, so edits find it through its origin.
    origins: AHashMap<CellKey, u64>,
    /// Live populations in registration order
    order: Vec<PopulationId>,
}

impl<P: TerrainProvider> AccessibilityIndex<P> {
    pub fn new(terrain: P) -> Self {
        let (width, height) = terrain.dimensions();
        Self {
            terrain,
            masks: Grid::new(width, height),
            overlap: Box::new([[0; MAX_SLOTS]; MAX_SLOTS]),
            slots: SlotAllocator::new(),
            records: vec![None; MAX_SLOTS],
            by_id: AHashMap::new(),
            origins: AHashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn terrain(&self) -> &P {
        &self.terrain
    }

    /// Mutable terrain access. Masks are not updated until the edited cells
    /// are passed to `apply_terrain_changes`.
    pub fn terrain_mut(&mut self) -> &mut P {
        &mut self.terrain
    }

    // === REGISTRATION ===

    /// Register a population, assign it a slot and compute its reachable set
    pub fn add_population(&mut self, handle: PopulationHandle) -> Result<SlotId> {
        if self.by_id.contains_key(&handle.id) {
            return Err(HabitatError::DuplicatePopulation(handle.id));
        }

        let slot = self.slots.allocate().ok_or(HabitatError::CapacityExceeded {
            live: self.slots.live_count(),
        })?;

        let id = handle.id;
        tracing::debug!(population = %id, slot = slot.0, "allocated population slot");

        self.by_id.insert(id, slot);
        self.order.push(id);
        self.mark_origin(handle.origin, slot);
        self.records[slot.index()] = Some(SlotRecord {
            handle,
            cells: Vec::new(),
        });
        self.recompute_slot(slot);

        Ok(slot)
    }

    /// Unregister a population and return its slot to the recycle queue
    pub fn remove_population(&mut self, id: PopulationId) -> Result<PopulationHandle> {
        let slot = self
            .by_id
            .remove(&id)
            .ok_or(HabitatError::PopulationNotFound(id))?;
        self.order.retain(|p| *p != id);

        self.clear_slot_bits(slot);
        for j in 0..MAX_SLOTS {
            self.overlap[slot.index()][j] = 0;
            self.overlap[j][slot.index()] = 0;
        }

        let record = self.records[slot.index()].take();
        if let Some(record) = &record {
            self.unmark_origin(record.handle.origin, slot);
        }
        self.slots.release(slot);

        // This id is next in line: sweep the whole map so the next occupant
        // starts from an all-zero column.
        if self.slots.next_free() == Some(slot) {
            self.purge_slot_bits(slot);
        }

        tracing::debug!(population = %id, slot = slot.0, "released population slot");

        record
            .map(|r| r.handle)
            .ok_or(HabitatError::PopulationNotFound(id))
    }

    /// Recompute one population's reachable set; returns the new area
    pub fn recompute(&mut self, id: PopulationId) -> Result<usize> {
        let slot = self.slot_of(id).ok_or(HabitatError::PopulationNotFound(id))?;
        Ok(self.recompute_slot(slot))
    }

    /// Move a population's origin and recompute it
    pub fn relocate(&mut self, id: PopulationId, origin: CellKey) -> Result<usize> {
        let slot = self.slot_of(id).ok_or(HabitatError::PopulationNotFound(id))?;
        let previous = match self.records[slot.index()].as_mut() {
            Some(record) => std::mem::replace(&mut record.handle.origin, origin),
            None => return Err(HabitatError::PopulationNotFound(id)),
        };
        self.unmark_origin(previous, slot);
        self.mark_origin(origin, slot);
        Ok(self.recompute_slot(slot))
    }

    /// Update group size. Reachability does not depend on it.
    pub fn set_group_size(&mut self, id: PopulationId, group_size: u32) -> Result<()> {
        self.record_mut(id)?.handle.group_size = group_size;
        Ok(())
    }

    /// Update dominance. Reachability does not depend on it.
    pub fn set_dominance(&mut self, id: PopulationId, dominance: f32) -> Result<()> {
        self.record_mut(id)?.handle.dominance = dominance;
        Ok(())
    }

    // === TERRAIN EDITS ===

    /// Populations whose reachable set may change after `changed` cells were
    /// edited, in registration order.
    ///
    /// Looks at the bits on each changed cell and on its four neighbours: a
    /// cell that just became walkable carries no bits yet, but the groups
    /// standing next to it may now spread into it. Populations whose origin
    /// is a changed cell are always included.
    pub fn affected_populations(&self, changed: &[CellKey]) -> Vec<PopulationId> {
        let mut mask = 0u64;
        for cell in changed {
            mask |= self.access_mask(*cell);
            mask |= self.origins.get(cell).copied().unwrap_or(0);
            for n in cell.neighbors() {
                mask |= self.access_mask(n);
            }
        }
        mask &= self.slots.live_mask();

        self.order
            .iter()
            .copied()
            .filter(|id| {
                self.by_id
                    .get(id)
                    .map(|slot| mask & slot.bit() != 0)
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Apply one step's worth of terrain edits: exactly one recompute per
    /// affected population. Returns the populations that were recomputed.
    pub fn apply_terrain_changes(&mut self, changed: &[CellKey]) -> Vec<PopulationId> {
        if changed.is_empty() {
            return Vec::new();
        }

        let affected = self.affected_populations(changed);
        for id in &affected {
            if let Some(slot) = self.slot_of(*id) {
                self.recompute_slot(slot);
            }
        }

        tracing::debug!(
            changed = changed.len(),
            affected = affected.len(),
            "applied terrain changes"
        );
        affected
    }

    // === QUERIES ===

    /// O(1) reachability test. Unknown populations have no access.
    #[inline]
    pub fn can_access(&self, id: PopulationId, cell: CellKey) -> bool {
        match self.by_id.get(&id) {
            Some(slot) => self.access_mask(cell) & slot.bit() != 0,
            None => false,
        }
    }

    /// Live-population bits at a cell (0 outside the map)
    #[inline]
    pub fn access_mask(&self, cell: CellKey) -> u64 {
        self.masks.get(cell).copied().unwrap_or(0)
    }

    /// Live populations that can reach `cell`, in registration order
    pub fn populations_at(&self, cell: CellKey) -> Vec<PopulationId> {
        let mask = self.access_mask(cell);
        self.order
            .iter()
            .copied()
            .filter(|id| self.by_id.get(id).is_some_and(|s| mask & s.bit() != 0))
            .collect()
    }

    pub fn slot_of(&self, id: PopulationId) -> Option<SlotId> {
        self.by_id.get(&id).copied()
    }

    pub fn handle(&self, id: PopulationId) -> Option<&PopulationHandle> {
        let slot = self.slot_of(id)?;
        self.records[slot.index()].as_ref().map(|r| &r.handle)
    }

    /// Live handles in registration order
    pub fn populations(&self) -> impl Iterator<Item = &PopulationHandle> + '_ {
        self.order.iter().filter_map(move |id| self.handle(*id))
    }

    pub fn contains(&self, id: PopulationId) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn live_count(&self) -> usize {
        self.slots.live_count()
    }

    /// Number of cells the population can reach (0 if unknown)
    pub fn reachable_area(&self, id: PopulationId) -> usize {
        self.slot_of(id)
            .map(|slot| self.overlap[slot.index()][slot.index()] as usize)
            .unwrap_or(0)
    }

    /// Cells both populations can reach (0 if either is unknown)
    pub fn overlap(&self, a: PopulationId, b: PopulationId) -> u32 {
        match (self.slot_of(a), self.slot_of(b)) {
            (Some(sa), Some(sb)) => self.overlap[sa.index()][sb.index()],
            _ => 0,
        }
    }

    /// Boolean walkability grid for a pathfinder, one entry per cell
    pub fn traversability_grid(&self, id: PopulationId) -> Grid<bool> {
        let mut grid = Grid::new(self.masks.width, self.masks.height);
        if let Some(record) = self.slot_of(id).and_then(|s| self.records[s.index()].as_ref()) {
            for cell in &record.cells {
                grid.set(*cell, true);
            }
        }
        grid
    }

    /// Brute-force check that the overlap cache matches the masks and that
    /// no dead slot has bits anywhere. Full map scan; meant for tests and
    /// debug assertions.
    pub fn overlap_is_consistent(&self) -> bool {
        let live = self.slots.live_mask();
        let mut counts = [[0u32; MAX_SLOTS]; MAX_SLOTS];
        for &mask in self.masks.values() {
            if mask & !live != 0 {
                return false;
            }
            let mut bits_i = mask;
            while bits_i != 0 {
                let i = bits_i.trailing_zeros() as usize;
                bits_i &= bits_i - 1;
                let mut bits_j = mask;
                while bits_j != 0 {
                    let j = bits_j.trailing_zeros() as usize;
                    bits_j &= bits_j - 1;
                    counts[i][j] += 1;
                }
            }
        }
        counts == *self.overlap
    }

    // === SLOT-LEVEL ACCESS FOR ESTIMATORS ===

    /// Live slots with their handle and reachable area
    pub(crate) fn live_slots(&self) -> impl Iterator<Item = (SlotId, &PopulationHandle, usize)> + '_ {
        self.order.iter().filter_map(move |id| {
            let slot = self.slot_of(*id)?;
            let record = self.records[slot.index()].as_ref()?;
            Some((slot, &record.handle, record.cells.len()))
        })
    }

    pub(crate) fn slot_handle(&self, slot: SlotId) -> Option<(&PopulationHandle, usize)> {
        self.records
            .get(slot.index())?
            .as_ref()
            .map(|r| (&r.handle, r.cells.len()))
    }

    pub(crate) fn overlap_row(&self, slot: SlotId) -> &[u32; MAX_SLOTS] {
        &self.overlap[slot.index()]
    }

    // === INTERNALS ===

    fn mark_origin(&mut self, origin: CellKey, slot: SlotId) {
        *self.origins.entry(origin).or_insert(0) |= slot.bit();
    }

    fn unmark_origin(&mut self, origin: CellKey, slot: SlotId) {
        if let Some(bits) = self.origins.get_mut(&origin) {
            *bits &= !slot.bit();
            if *bits == 0 {
                self.origins.remove(&origin);
            }
        }
    }

    fn record_mut(&mut self, id: PopulationId) -> Result<&mut SlotRecord> {
        let slot = self.slot_of(id).ok_or(HabitatError::PopulationNotFound(id))?;
        self.records[slot.index()]
            .as_mut()
            .ok_or(HabitatError::PopulationNotFound(id))
    }

    /// Clear, flood fill, then rewrite the overlap row/column. Order matters:
    /// filling before clearing would double count stale overlap.
    fn recompute_slot(&mut self, slot: SlotId) -> usize {
        self.clear_slot_bits(slot);

        let handle = match self.records[slot.index()].as_ref() {
            Some(record) => record.handle.clone(),
            None => return 0,
        };
        let cells = self.flood_fill(&handle, slot);
        let area = cells.len();

        if let Some(record) = self.records[slot.index()].as_mut() {
            record.cells = cells;
        }
        self.refresh_overlap(slot);

        tracing::debug!(slot = slot.0, area, "recomputed reachability");
        area
    }

    /// Clear every bit the slot's previous fill set
    fn clear_slot_bits(&mut self, slot: SlotId) {
        let cells = match self.records[slot.index()].as_mut() {
            Some(record) => std::mem::take(&mut record.cells),
            None => return,
        };
        let keep = !slot.bit();
        for cell in cells {
            if let Some(mask) = self.masks.get_mut(cell) {
                *mask &= keep;
            }
        }
    }

    /// Clear the slot's bit on every cell of the map
    fn purge_slot_bits(&mut self, slot: SlotId) {
        let keep = !slot.bit();
        let (width, height) = (self.masks.width as i32, self.masks.height as i32);
        for y in 0..height {
            for x in 0..width {
                if let Some(mask) = self.masks.get_mut(CellKey::new(x, y)) {
                    *mask &= keep;
                }
            }
        }
    }

    #[inline]
    fn admissible(&self, handle: &PopulationHandle, cell: CellKey) -> bool {
        self.terrain.is_in_bounds(cell)
            && self.masks.contains(cell)
            && handle.can_traverse(self.terrain.terrain_kind_at(cell))
            && handle.in_range(cell)
    }

    /// 4-connected flood fill from the origin with an explicit stack.
    ///
    /// Sets the slot bit as each cell is admitted (the bit doubles as the
    /// visited marker) and remembers rejected cells so their terrain is only
    /// tested once.
    fn flood_fill(&mut self, handle: &PopulationHandle, slot: SlotId) -> Vec<CellKey> {
        let bit = slot.bit();
        let mut cells = Vec::new();

        if !self.admissible(handle, handle.origin) {
            return cells;
        }

        let mut rejected: AHashSet<CellKey> = AHashSet::new();
        let mut stack = vec![handle.origin];
        if let Some(mask) = self.masks.get_mut(handle.origin) {
            *mask |= bit;
        }
        cells.push(handle.origin);

        while let Some(cell) = stack.pop() {
            for next in cell.neighbors() {
                if self.access_mask(next) & bit != 0 || rejected.contains(&next) {
                    continue;
                }
                if !self.admissible(handle, next) {
                    rejected.insert(next);
                    continue;
                }
                if let Some(mask) = self.masks.get_mut(next) {
                    *mask |= bit;
                }
                cells.push(next);
                stack.push(next);
            }
        }

        cells
    }

    /// Rewrite row and column `slot` from its current cells
    fn refresh_overlap(&mut self, slot: SlotId) {
        let live = self.slots.live_mask();
        let mut counts = [0u32; MAX_SLOTS];

        if let Some(record) = self.records[slot.index()].as_ref() {
            for cell in &record.cells {
                let mut bits = self.access_mask(*cell) & live;
                while bits != 0 {
                    let j = bits.trailing_zeros() as usize;
                    bits &= bits - 1;
                    counts[j] += 1;
                }
            }
        }

        let s = slot.index();
        for (j, &count) in counts.iter().enumerate() {
            let value = if live & (1u64 << j) != 0 { count } else { 0 };
            self.overlap[s][j] = value;
            self.overlap[j][s] = value;
        }
    }
}
