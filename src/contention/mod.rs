//! Food contention between populations

pub mod allocator;
pub mod source;

pub use allocator::{
    dominance_descending, registration_order, Allocation, ContentionAllocator, ContentionOrder,
    ContentionReport, Contender,
};
pub use source::ResourceSource;
