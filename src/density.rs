//! Habitat crowding scores derived from reachability
//!
//! Each population spreads `group_size * per_unit_footprint` evenly over the
//! cells it can reach. The density at a cell is the sum of those shares for
//! every population reaching it, and a population's score is the mean density
//! over its own reachable cells. The score is computed from the overlap
//! cache, so it costs one pass over the live slots instead of a map scan.

use crate::access::index::AccessibilityIndex;
use crate::core::types::{CellKey, PopulationId, SlotId};
use crate::population::handle::PopulationHandle;
use crate::spatial::terrain::TerrainProvider;

/// Returned by `density_score` when there is nothing to average over
pub const DENSITY_NO_DATA: f32 = -1.0;

/// Read-only crowding view over an accessibility index
pub struct DensityEstimator<'a, P: TerrainProvider> {
    index: &'a AccessibilityIndex<P>,
    per_unit_footprint: f32,
}

impl<'a, P: TerrainProvider> DensityEstimator<'a, P> {
    pub fn new(index: &'a AccessibilityIndex<P>, per_unit_footprint: f32) -> Self {
        Self {
            index,
            per_unit_footprint,
        }
    }

    /// Per-cell share one population contributes to every cell it reaches
    #[inline]
    fn share(&self, handle: &PopulationHandle, area: usize) -> f32 {
        if area == 0 {
            return 0.0;
        }
        handle.group_size as f32 * self.per_unit_footprint / area as f32
    }

    /// Summed shares of every population reaching `cell` (0 when none do)
    pub fn density_at(&self, cell: CellKey) -> f32 {
        let mut bits = self.index.access_mask(cell);
        let mut total = 0.0;
        while bits != 0 {
            let slot = SlotId(bits.trailing_zeros() as u8);
            bits &= bits - 1;
            if let Some((handle, area)) = self.index.slot_handle(slot) {
                total += self.share(handle, area);
            }
        }
        total
    }

    /// Mean density over the population's reachable cells.
    ///
    /// `DENSITY_NO_DATA` for an unknown population or one that reaches no
    /// cells.
    pub fn density_score(&self, id: PopulationId) -> f32 {
        let slot = match self.index.slot_of(id) {
            Some(slot) => slot,
            None => return DENSITY_NO_DATA,
        };
        let row = self.index.overlap_row(slot);
        let own_area = row[slot.index()];
        if own_area == 0 {
            return DENSITY_NO_DATA;
        }

        let weighted: f32 = self
            .index
            .live_slots()
            .map(|(other, handle, area)| row[other.index()] as f32 * self.share(handle, area))
            .sum();

        weighted / own_area as f32
    }

    /// Scores for every live population in registration order
    pub fn all_scores(&self) -> Vec<(PopulationId, f32)> {
        self.index
            .populations()
            .map(|h| (h.id, self.density_score(h.id)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::terrain::{TerrainGrid, TerrainKind};

    fn index_with(rows: &[&str]) -> AccessibilityIndex<TerrainGrid> {
        AccessibilityIndex::new(TerrainGrid::from_ascii(rows))
    }

    #[test]
    fn test_empty_cell_has_zero_density() {
        let index = index_with(&["...", "..."]);
        let density = DensityEstimator::new(&index, 1.0);
        assert_eq!(density.density_at(CellKey::new(1, 1)), 0.0);
        assert_eq!(density.density_at(CellKey::new(9, 9)), 0.0);
    }

    #[test]
    fn test_unregistered_population_has_no_data() {
        let index = index_with(&["..."]);
        let density = DensityEstimator::new(&index, 1.0);
        assert_eq!(density.density_score(PopulationId::new()), DENSITY_NO_DATA);
    }

    #[test]
    fn test_zero_area_population_has_no_data() {
        let mut index = index_with(&["#.."]);
        let h = PopulationHandle::new("stuck", CellKey::new(0, 0)).with_group_size(5);
        let id = h.id;
        index.add_population(h).unwrap();

        let density = DensityEstimator::new(&index, 1.0);
        assert_eq!(density.density_score(id), DENSITY_NO_DATA);
    }

    #[test]
    fn test_single_population_density() {
        // 4 cells, 8 individuals, footprint 0.5 -> 1.0 per cell
        let mut index = index_with(&["....", "####"]);
        let h = PopulationHandle::new("herd", CellKey::new(0, 0)).with_group_size(8);
        let id = h.id;
        index.add_population(h).unwrap();

        let density = DensityEstimator::new(&index, 0.5);
        assert!((density.density_at(CellKey::new(2, 0)) - 1.0).abs() < 1e-6);
        assert_eq!(density.density_at(CellKey::new(2, 1)), 0.0);
        assert!((density.density_score(id) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_score_matches_mean_of_cell_densities() {
        // A reaches the whole row, B only the right half via water
        let mut index = index_with(&["....~~~~", "........"]);
        let a = PopulationHandle::new("a", CellKey::new(0, 1)).with_group_size(16);
        let b = PopulationHandle::new("b", CellKey::new(7, 0))
            .with_traversable(crate::spatial::terrain::TerrainSet::amphibious())
            .with_range(2.5)
            .with_group_size(3);
        let (ida, idb) = (a.id, b.id);
        index.add_population(a).unwrap();
        index.add_population(b).unwrap();

        let density = DensityEstimator::new(&index, 1.0);
        for id in [ida, idb] {
            let cells: Vec<CellKey> = index
                .traversability_grid(id)
                .iter()
                .filter(|(_, v)| **v)
                .map(|(c, _)| c)
                .collect();
            let mean: f32 =
                cells.iter().map(|c| density.density_at(*c)).sum::<f32>() / cells.len() as f32;
            assert!(
                (density.density_score(id) - mean).abs() < 1e-4,
                "score {} vs mean {}",
                density.density_score(id),
                mean
            );
        }
    }

    #[test]
    fn test_crowding_rises_with_overlap() {
        let mut index = AccessibilityIndex::new(TerrainGrid::new(4, 4, TerrainKind::Grass));
        let a = PopulationHandle::new("a", CellKey::new(0, 0)).with_group_size(16);
        let ida = a.id;
        index.add_population(a).unwrap();
        let alone = DensityEstimator::new(&index, 1.0).density_score(ida);

        let b = PopulationHandle::new("b", CellKey::new(3, 3)).with_group_size(16);
        index.add_population(b).unwrap();
        let shared = DensityEstimator::new(&index, 1.0).density_score(ida);

        assert!((alone - 1.0).abs() < 1e-6);
        assert!((shared - 2.0).abs() < 1e-6);
        assert_eq!(DensityEstimator::new(&index, 1.0).all_scores().len(), 2);
    }
}
