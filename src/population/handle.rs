//! Population handles: the identity and traversal rules of one agent group

use serde::{Deserialize, Serialize};

use crate::core::types::{CellKey, PopulationId};
use crate::spatial::terrain::{TerrainKind, TerrainSet};

/// One independently-moving agent group sharing the world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationHandle {
    pub id: PopulationId,
    pub name: String,
    /// Terrain kinds the group can walk on
    pub traversable: TerrainSet,
    /// Straight-line search radius around `origin`, in cells
    pub range: f32,
    /// Where the group's flood fill starts
    pub origin: CellKey,
    /// Proportional claim on contested food
    pub dominance: f32,
    /// Number of individuals
    pub group_size: u32,
}

impl PopulationHandle {
    pub fn new(name: impl Into<String>, origin: CellKey) -> Self {
        Self {
            id: PopulationId::new(),
            name: name.into(),
            traversable: TerrainSet::land(),
            range: 16.0,
            origin,
            dominance: 1.0,
            group_size: 1,
        }
    }

    pub fn with_id(mut self, id: PopulationId) -> Self {
        self.id = id;
        self
    }

    pub fn with_traversable(mut self, traversable: TerrainSet) -> Self {
        self.traversable = traversable;
        self
    }

    pub fn with_range(mut self, range: f32) -> Self {
        self.range = range;
        self
    }

    pub fn with_dominance(mut self, dominance: f32) -> Self {
        self.dominance = dominance;
        self
    }

    pub fn with_group_size(mut self, group_size: u32) -> Self {
        self.group_size = group_size;
        self
    }

    #[inline]
    pub fn can_traverse(&self, kind: TerrainKind) -> bool {
        self.traversable.contains(kind)
    }

    /// Whether `cell` lies within `range` of the origin (straight line, inclusive)
    #[inline]
    pub fn in_range(&self, cell: CellKey) -> bool {
        if self.range < 0.0 {
            return false;
        }
        let limit = self.range as f64;
        (self.origin.distance_sq(&cell) as f64) <= limit * limit
    }
}
