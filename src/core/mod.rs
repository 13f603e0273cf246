pub mod config;
pub mod error;
pub mod types;

pub use config::HabitatConfig;
pub use error::{HabitatError, Result};
pub use types::{CellKey, PopulationId, SlotId, SourceId, Tick, MAX_SLOTS};
