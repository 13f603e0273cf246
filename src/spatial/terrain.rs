//! Terrain kinds, traversal sets and the terrain provider seam
//!
//! The accessibility index never reaches out to "whatever terrain exists";
//! it is handed a `TerrainProvider` at construction. `TerrainGrid` is the
//! dense in-memory provider used by the simulation driver, and
//! `TerrainChangeBatch` collects the cells edited during one step.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::core::types::CellKey;
use crate::spatial::grid::Grid;

/// Terrain types a cell can hold
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TerrainKind {
    #[default]
    Grass = 0,
    Dirt = 1,
    Sand = 2,
    Forest = 3,
    Rock = 4,
    Snow = 5,
    ShallowWater = 6,
    DeepWater = 7,
    Wall = 8,
}

impl TerrainKind {
    pub const ALL: [TerrainKind; 9] = [
        Self::Grass,
        Self::Dirt,
        Self::Sand,
        Self::Forest,
        Self::Rock,
        Self::Snow,
        Self::ShallowWater,
        Self::DeepWater,
        Self::Wall,
    ];

    #[inline]
    fn bit(self) -> u32 {
        1u32 << (self as u8)
    }

    pub fn is_water(&self) -> bool {
        matches!(self, Self::ShallowWater | Self::DeepWater)
    }
}

/// Set of terrain kinds a population can walk on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TerrainSet(u32);

impl TerrainSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Every kind, walls included
    pub fn all() -> Self {
        Self::from_kinds(&TerrainKind::ALL)
    }

    pub fn from_kinds(kinds: &[TerrainKind]) -> Self {
        kinds.iter().fold(Self::empty(), |set, &k| set.with(k))
    }

    /// Dry land walkers
    pub fn land() -> Self {
        Self::from_kinds(&[
            TerrainKind::Grass,
            TerrainKind::Dirt,
            TerrainKind::Sand,
            TerrainKind::Forest,
            TerrainKind::Rock,
            TerrainKind::Snow,
        ])
    }

    /// Land plus shallow water (waders, shore animals)
    pub fn amphibious() -> Self {
        Self::land().with(TerrainKind::ShallowWater)
    }

    /// Swimmers only
    pub fn aquatic() -> Self {
        Self::from_kinds(&[TerrainKind::ShallowWater, TerrainKind::DeepWater])
    }

    #[must_use]
    pub fn with(self, kind: TerrainKind) -> Self {
        Self(self.0 | kind.bit())
    }

    #[must_use]
    pub fn without(self, kind: TerrainKind) -> Self {
        Self(self.0 & !kind.bit())
    }

    #[inline]
    pub fn contains(&self, kind: TerrainKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// Read-only terrain access consumed by the accessibility index
pub trait TerrainProvider {
    fn terrain_kind_at(&self, cell: CellKey) -> TerrainKind;

    fn is_in_bounds(&self, cell: CellKey) -> bool;

    /// Map extent; every in-bounds cell lies within `(0,0)..(width,height)`
    fn dimensions(&self) -> (usize, usize);
}

/// Dense terrain map
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainGrid {
    cells: Grid<TerrainKind>,
}

impl TerrainGrid {
    /// Map filled with a single kind
    pub fn new(width: usize, height: usize, fill: TerrainKind) -> Self {
        Self {
            cells: Grid::filled(width, height, fill),
        }
    }

    /// Build from rows of characters, top row first.
    ///
    /// `.` grass, `,` dirt, `s` sand, `f` forest, `r` rock, `*` snow,
    /// `~` shallow water, `w` deep water, `#` wall. Unknown characters are grass.
    pub fn from_ascii(rows: &[&str]) -> Self {
        let height = rows.len();
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
        let mut cells = Grid::filled(width, height, TerrainKind::Grass);
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                let kind = match ch {
                    ',' => TerrainKind::Dirt,
                    's' => TerrainKind::Sand,
                    'f' => TerrainKind::Forest,
                    'r' => TerrainKind::Rock,
                    '*' => TerrainKind::Snow,
                    '~' => TerrainKind::ShallowWater,
                    'w' => TerrainKind::DeepWater,
                    '#' => TerrainKind::Wall,
                    _ => TerrainKind::Grass,
                };
                cells.set(CellKey::new(x as i32, y as i32), kind);
            }
        }
        Self { cells }
    }

    pub fn width(&self) -> usize {
        self.cells.width
    }

    pub fn height(&self) -> usize {
        self.cells.height
    }

    /// Change one cell, returning the previous kind if the cell exists
    pub fn set(&mut self, cell: CellKey, kind: TerrainKind) -> Option<TerrainKind> {
        let slot = self.cells.get_mut(cell)?;
        let previous = *slot;
        *slot = kind;
        Some(previous)
    }

    /// Paint an inclusive rectangle, returning the cells whose kind changed
    pub fn paint_rect(&mut self, min: CellKey, max: CellKey, kind: TerrainKind) -> Vec<CellKey> {
        let mut changed = Vec::new();
        for y in min.y.min(max.y)..=min.y.max(max.y) {
            for x in min.x.min(max.x)..=min.x.max(max.x) {
                let cell = CellKey::new(x, y);
                if let Some(previous) = self.set(cell, kind) {
                    if previous != kind {
                        changed.push(cell);
                    }
                }
            }
        }
        changed
    }

    /// Count cells of a given kind
    pub fn count(&self, kind: TerrainKind) -> usize {
        self.cells.values().filter(|&&k| k == kind).count()
    }
}

impl TerrainProvider for TerrainGrid {
    #[inline]
    fn terrain_kind_at(&self, cell: CellKey) -> TerrainKind {
        self.cells.get(cell).copied().unwrap_or(TerrainKind::Wall)
    }

    #[inline]
    fn is_in_bounds(&self, cell: CellKey) -> bool {
        self.cells.contains(cell)
    }

    fn dimensions(&self) -> (usize, usize) {
        (self.cells.width, self.cells.height)
    }
}

/// Cells changed during one simulation step
///
/// De-duplicates while keeping first-edit order so the batch is applied
/// deterministically.
#[derive(Debug, Clone, Default)]
pub struct TerrainChangeBatch {
    seen: AHashSet<CellKey>,
    cells: Vec<CellKey>,
}

impl TerrainChangeBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cell: CellKey) {
        if self.seen.insert(cell) {
            self.cells.push(cell);
        }
    }

    pub fn extend(&mut self, cells: impl IntoIterator<Item = CellKey>) {
        for cell in cells {
            self.push(cell);
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Take every pending cell, leaving the batch empty
    pub fn drain(&mut self) -> Vec<CellKey> {
        self.seen.clear();
        std::mem::take(&mut self.cells)
    }
}
