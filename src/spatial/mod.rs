//! Grid storage and terrain

pub mod grid;
pub mod terrain;

pub use grid::Grid;
pub use terrain::{TerrainChangeBatch, TerrainGrid, TerrainKind, TerrainProvider, TerrainSet};
