//! Per-tick division of shared food among competing populations
//!
//! Each tick starts with `reset_calculator`, which refills every source and
//! sets its dominance budget to the summed dominance of all populations that
//! can reach it. Populations are then processed one at a time in a fixed
//! order. A population claims `dominance / remaining_budget` of what is left
//! at each of its sources, visiting the sources with the largest remaining
//! dominance budget first. Its full dominance is then removed from the
//! budget of every source it reaches.
//!
//! Processing order matters: earlier populations get closer to a true
//! proportional share. The default order is registration order; it can be
//! swapped with `set_order` to pin down other sequences in tests.

use std::cmp::{Ordering, Reverse};

use ahash::AHashMap;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::access::index::AccessibilityIndex;
use crate::contention::source::{ResourceSource, SourceLedger};
use crate::core::error::{HabitatError, Result};
use crate::core::types::{CellKey, PopulationId, SourceId};
use crate::spatial::terrain::TerrainProvider;

/// A population's snapshot as seen by the allocator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contender {
    pub id: PopulationId,
    pub dominance: f32,
    /// Position in the index's registration order at sync time
    pub registration: usize,
    /// Reachable sources, in source registration order
    pub sources: Vec<SourceId>,
}

/// Comparator deciding which contender is processed first
pub type ContentionOrder = fn(&Contender, &Contender) -> Ordering;

/// Earliest-registered population first
pub fn registration_order(a: &Contender, b: &Contender) -> Ordering {
    a.registration.cmp(&b.registration)
}

/// Strongest population first, ties by registration
pub fn dominance_descending(a: &Contender, b: &Contender) -> Ordering {
    OrderedFloat(b.dominance)
        .cmp(&OrderedFloat(a.dominance))
        .then_with(|| registration_order(a, b))
}

/// What one population acquired during a pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub population: PopulationId,
    pub acquired: f32,
}

/// Outcome of a full contention pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentionReport {
    /// In processing order
    pub allocations: Vec<Allocation>,
    /// Food left at each source after the pass
    pub leftover: Vec<(SourceId, f32)>,
    /// Food handed out by each source during the pass
    pub taken: Vec<(SourceId, f32)>,
}

impl ContentionReport {
    pub fn acquired(&self, id: PopulationId) -> f32 {
        self.allocations
            .iter()
            .find(|a| a.population == id)
            .map(|a| a.acquired)
            .unwrap_or(0.0)
    }

    /// Food one source handed out (0 for unknown sources)
    pub fn taken_at(&self, source: SourceId) -> f32 {
        self.taken
            .iter()
            .find(|(id, _)| *id == source)
            .map(|(_, t)| *t)
            .unwrap_or(0.0)
    }

    pub fn total_acquired(&self) -> f32 {
        self.allocations.iter().map(|a| a.acquired).sum()
    }
}

/// Splits depleting food sources among populations once per tick
pub struct ContentionAllocator {
    sources: Vec<ResourceSource>,
    ledgers: Vec<SourceLedger>,
    source_index: AHashMap<SourceId, usize>,
    next_source_id: u32,
    contenders: Vec<Contender>,
    contender_index: AHashMap<PopulationId, usize>,
    order: ContentionOrder,
    access_dirty: bool,
}

impl ContentionAllocator {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            ledgers: Vec::new(),
            source_index: AHashMap::new(),
            next_source_id: 1,
            contenders: Vec::new(),
            contender_index: AHashMap::new(),
            order: registration_order,
            access_dirty: true,
        }
    }

    // === SOURCES ===

    /// Register a food source
    pub fn add_source(&mut self, cell: CellKey, total_output: f32) -> SourceId {
        let id = SourceId::new(self.next_source_id);
        self.next_source_id += 1;

        self.source_index.insert(id, self.sources.len());
        self.sources.push(ResourceSource::new(id, cell, total_output));
        self.ledgers.push(SourceLedger::default());
        self.access_dirty = true;
        id
    }

    pub fn remove_source(&mut self, id: SourceId) -> Result<ResourceSource> {
        let pos = self
            .source_index
            .remove(&id)
            .ok_or(HabitatError::SourceNotFound(id))?;
        let source = self.sources.remove(pos);
        self.ledgers.remove(pos);
        for (i, s) in self.sources.iter().enumerate().skip(pos) {
            self.source_index.insert(s.id, i);
        }
        self.access_dirty = true;
        Ok(source)
    }

    /// Change a source's per-tick output; takes effect at the next reset
    pub fn set_output(&mut self, id: SourceId, total_output: f32) -> Result<()> {
        let pos = *self
            .source_index
            .get(&id)
            .ok_or(HabitatError::SourceNotFound(id))?;
        self.sources[pos].total_output = total_output.max(0.0);
        Ok(())
    }

    pub fn source(&self, id: SourceId) -> Option<&ResourceSource> {
        self.source_index.get(&id).map(|&i| &self.sources[i])
    }

    pub fn sources(&self) -> &[ResourceSource] {
        &self.sources
    }

    /// Food still available at a source in the current tick
    pub fn remaining_output(&self, id: SourceId) -> Option<f32> {
        self.source_index.get(&id).map(|&i| self.ledgers[i].remaining_output)
    }

    /// Unprocessed dominance still competing for a source in the current tick
    pub fn remaining_budget(&self, id: SourceId) -> Option<f32> {
        self.source_index.get(&id).map(|&i| self.ledgers[i].remaining_budget)
    }

    // === ACCESS CACHE ===

    /// Mark the cached population/source access as stale
    pub fn invalidate(&mut self) {
        self.access_dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.access_dirty
    }

    /// Rebuild contenders from the index: dominance and reachable sources
    pub fn sync_access<P: TerrainProvider>(&mut self, index: &AccessibilityIndex<P>) {
        self.contenders.clear();
        self.contender_index.clear();

        for (registration, handle) in index.populations().enumerate() {
            let sources = self
                .sources
                .iter()
                .filter(|s| index.can_access(handle.id, s.cell))
                .map(|s| s.id)
                .collect();
            self.contender_index.insert(handle.id, self.contenders.len());
            self.contenders.push(Contender {
                id: handle.id,
                dominance: handle.dominance,
                registration,
                sources,
            });
        }

        self.access_dirty = false;
        tracing::debug!(
            contenders = self.contenders.len(),
            sources = self.sources.len(),
            "synced contention access"
        );
    }

    pub fn contender(&self, id: PopulationId) -> Option<&Contender> {
        self.contender_index.get(&id).map(|&i| &self.contenders[i])
    }

    // === ORDERING ===

    pub fn set_order(&mut self, order: ContentionOrder) {
        self.order = order;
    }

    /// Contenders in the order a pass processes them
    pub fn processing_order(&self) -> Vec<PopulationId> {
        let mut ordered: Vec<&Contender> = self.contenders.iter().collect();
        ordered.sort_by(|a, b| (self.order)(a, b));
        ordered.into_iter().map(|c| c.id).collect()
    }

    // === PASS ===

    /// Refill every source and reset its dominance budget. Must run before
    /// any population is processed in a tick.
    pub fn reset_calculator(&mut self) {
        for (ledger, source) in self.ledgers.iter_mut().zip(&self.sources) {
            ledger.remaining_output = source.total_output;
            ledger.taken = 0.0;
            ledger.remaining_budget = 0.0;
        }
        for contender in &self.contenders {
            for sid in &contender.sources {
                if let Some(&i) = self.source_index.get(sid) {
                    self.ledgers[i].remaining_budget += contender.dominance;
                }
            }
        }
    }

    /// Claim this population's share at each source it reaches and return
    /// the total acquired. Unknown populations acquire nothing.
    pub fn calculate_distribution(&mut self, id: PopulationId) -> f32 {
        let contender = match self.contender(id) {
            Some(c) => c.clone(),
            None => return 0.0,
        };

        let mut positions: Vec<usize> = contender
            .sources
            .iter()
            .filter_map(|sid| self.source_index.get(sid).copied())
            .collect();
        // Largest remaining budget first
        positions.sort_by_key(|&i| Reverse(OrderedFloat(self.ledgers[i].remaining_budget)));

        let mut acquired = 0.0;
        for &i in &positions {
            let ledger = &mut self.ledgers[i];
            let mut ratio = if ledger.remaining_budget > 0.0 {
                contender.dominance / ledger.remaining_budget
            } else {
                1.0
            };
            if ratio <= 0.0 || !ratio.is_finite() {
                ratio = 1.0;
            }

            let want = (ledger.remaining_output * ratio).min(ledger.remaining_output);
            acquired += ledger.take(want);
        }

        // Full dominance leaves every touched source, independent of the take
        for &i in &positions {
            self.ledgers[i].release_budget(contender.dominance);
        }

        acquired
    }

    /// Reset, then process every contender in order
    pub fn run_pass(&mut self) -> ContentionReport {
        self.reset_calculator();

        let allocations: Vec<Allocation> = self
            .processing_order()
            .into_iter()
            .map(|id| Allocation {
                population: id,
                acquired: self.calculate_distribution(id),
            })
            .collect();

        let leftover = self
            .sources
            .iter()
            .zip(&self.ledgers)
            .map(|(s, l)| (s.id, l.remaining_output))
            .collect();
        let taken = self
            .sources
            .iter()
            .zip(&self.ledgers)
            .map(|(s, l)| (s.id, l.taken))
            .collect();

        let report = ContentionReport {
            allocations,
            leftover,
            taken,
        };
        tracing::debug!(
            contenders = report.allocations.len(),
            acquired = report.total_acquired(),
            "contention pass complete"
        );
        report
    }
}

impl Default for ContentionAllocator {
    fn default() -> Self {
        Self::new()
    }
}
