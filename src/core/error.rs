use thiserror::Error;

use crate::core::types::{CellKey, PopulationId, SourceId};

#[derive(Error, Debug)]
pub enum HabitatError {
    #[error("All population slots are live ({live}); evict or merge a population first")]
    CapacityExceeded { live: usize },

    #[error("Population already registered: {0}")]
    DuplicatePopulation(PopulationId),

    #[error("Population not found: {0}")]
    PopulationNotFound(PopulationId),

    #[error("Resource source not found: {0:?}")]
    SourceNotFound(SourceId),

    #[error("Cell out of bounds: ({}, {})", .0.x, .0.y)]
    OutOfBounds(CellKey),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HabitatError>;
