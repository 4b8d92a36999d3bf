//! Reconcile reports and cumulative streaming counters

use crate::core::types::{CellIndex, RecordId};

/// Outcome of one reconciliation or transition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Grid center the targets were computed around, if any
    pub center: Option<CellIndex>,
    /// Load jobs issued for the near tier
    pub near_loads: usize,
    /// Unload jobs issued for the near tier
    pub near_unloads: usize,
    /// Load jobs issued for the far tier
    pub far_loads: usize,
    /// Unload jobs issued for the far tier
    pub far_unloads: usize,
    /// Near loads satisfied from an entity cache
    pub cache_hits: usize,
    /// Near unloads that kept the entity cached and only hid it
    pub demoted: usize,
    /// Scene contexts destroyed, including cache evictions
    pub destroyed: usize,
    /// Targets whose records could not be found
    pub holes: Vec<RecordId>,
}

impl ReconcileReport {
    /// Total load and unload jobs issued
    pub fn jobs(&self) -> usize {
        self.near_loads + self.near_unloads + self.far_loads + self.far_unloads
    }

    /// Loads that created a new scene context
    pub fn fresh_loads(&self) -> usize {
        (self.near_loads + self.far_loads).saturating_sub(self.cache_hits + self.holes.len())
    }

    pub fn is_noop(&self) -> bool {
        self.jobs() == 0
    }
}

/// Running totals across the manager's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamingStats {
    pub reconciles: u64,
    pub jobs: u64,
    pub loads: u64,
    pub unloads: u64,
    pub cache_hits: u64,
    pub demoted: u64,
    pub destroyed: u64,
    pub holes: u64,
    /// Worlds built from records
    pub world_loads: u64,
    /// World entries satisfied from the world cache
    pub world_cache_hits: u64,
    pub worlds_evicted: u64,
    /// Cached exteriors dropped because their world was evicted
    pub invalidated: u64,
}

impl StreamingStats {
    /// Fold one report into the totals
    pub fn absorb(&mut self, report: &ReconcileReport) {
        self.reconciles += 1;
        self.jobs += report.jobs() as u64;
        self.loads += (report.near_loads + report.far_loads) as u64;
        self.unloads += (report.near_unloads + report.far_unloads) as u64;
        self.cache_hits += report.cache_hits as u64;
        self.demoted += report.demoted as u64;
        self.destroyed += report.destroyed as u64;
        self.holes += report.holes.len() as u64;
    }
}
