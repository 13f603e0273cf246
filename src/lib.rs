//! Habitat Reach - per-population reachability, crowding and food contention
//!
//! Up to 64 populations share one grid map. For each of them the
//! [`access::AccessibilityIndex`] tracks which cells it can reach under its
//! own terrain rules; [`density::DensityEstimator`] turns that into crowding
//! scores and [`contention::ContentionAllocator`] splits shared food among the
//! populations that can reach it.

pub mod access;
pub mod contention;
pub mod core;
pub mod density;
pub mod population;
pub mod simulation;
pub mod spatial;
