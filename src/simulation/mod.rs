//! Step driver tying terrain edits, reachability, contention and needs together

pub mod tick;
pub mod world;

pub use tick::{run_habitat_tick, PopulationSummary, SimulationEvent, TickReport};
pub use world::HabitatWorld;
