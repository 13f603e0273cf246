//! FIFO recycling of bitmask slots

use std::collections::VecDeque;

use crate::core::types::{SlotId, MAX_SLOTS};

/// Hands out the 64 mask slots, oldest-freed first
///
/// A freed slot goes to the back of the queue, so a numeric id is only
/// reused once every other free slot has been handed out.
#[derive(Debug, Clone)]
pub struct SlotAllocator {
    free: VecDeque<SlotId>,
    live: u64,
}

impl SlotAllocator {
    pub fn new() -> Self {
        Self {
            free: (0..MAX_SLOTS as u8).map(SlotId).collect(),
            live: 0,
        }
    }

    /// Take the next free slot, or `None` when all 64 are live
    pub fn allocate(&mut self) -> Option<SlotId> {
        let slot = self.free.pop_front()?;
        self.live |= slot.bit();
        Some(slot)
    }

    /// Return a slot to the back of the queue. Releasing a slot that is not
    /// live is a no-op.
    pub fn release(&mut self, slot: SlotId) -> bool {
        if self.live & slot.bit() == 0 {
            return false;
        }
        self.live &= !slot.bit();
        self.free.push_back(slot);
        true
    }

    /// The slot the next `allocate` will hand out
    pub fn next_free(&self) -> Option<SlotId> {
        self.free.front().copied()
    }

    #[inline]
    pub fn is_live(&self, slot: SlotId) -> bool {
        self.live & slot.bit() != 0
    }

    /// Bitmask of every live slot
    #[inline]
    pub fn live_mask(&self) -> u64 {
        self.live
    }

    pub fn live_count(&self) -> usize {
        self.live.count_ones() as usize
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }
}

impl Default for SlotAllocator {
    fn default() -> Self {
        Self::new()
    }
}
