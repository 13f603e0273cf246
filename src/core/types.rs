//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a population (one independently-moving agent group)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PopulationId(pub Uuid);

impl PopulationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PopulationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PopulationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Short form is enough to tell groups apart in logs
        let s = self.0.simple().to_string();
        write!(f, "pop-{}", &s[..8])
    }
}

/// Simulation step counter
pub type Tick = u64;

/// Maximum number of concurrently live populations.
///
/// One bit per population in a `u64` access mask.
pub const MAX_SLOTS: usize = 64;

/// Bitmask slot a live population occupies (0..=63)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotId(pub u8);

impl SlotId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Single-bit mask for this slot
    #[inline]
    pub fn bit(self) -> u64 {
        1u64 << self.0
    }
}

/// Identifier for a resource source (e.g. a food source)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceId(pub u32);

impl SourceId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

/// Integer grid coordinate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellKey {
    pub x: i32,
    pub y: i32,
}

impl CellKey {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The four edge-adjacent cells (east, west, north, south)
    pub fn neighbors(&self) -> [CellKey; 4] {
        [
            CellKey::new(self.x + 1, self.y),
            CellKey::new(self.x - 1, self.y),
            CellKey::new(self.x, self.y + 1),
            CellKey::new(self.x, self.y - 1),
        ]
    }

    /// Squared straight-line distance, exact in integers
    #[inline]
    pub fn distance_sq(&self, other: &CellKey) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        dx * dx + dy * dy
    }

    /// Straight-line distance
    pub fn distance(&self, other: &CellKey) -> f32 {
        (self.distance_sq(other) as f32).sqrt()
    }
}

impl From<(i32, i32)> for CellKey {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}
