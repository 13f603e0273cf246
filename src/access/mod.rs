//! Population reachability
//!
//! `AccessibilityIndex` owns slot allocation, the per-cell access masks and
//! the pairwise overlap cache. Density and contention read from it; nothing
//! else writes to it.

pub mod index;
pub mod slots;

pub use index::AccessibilityIndex;
pub use slots::SlotAllocator;
