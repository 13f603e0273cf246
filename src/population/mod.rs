//! Populations: identity, traversal rules and needs

pub mod handle;
pub mod needs;

pub use handle::PopulationHandle;
pub use needs::PopulationNeeds;
