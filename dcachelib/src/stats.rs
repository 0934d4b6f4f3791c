use serde::{Deserialize, Serialize};

/// Whether a memory operation reads or writes
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessKind {
    Load,
    Store,
}

/// The four running counters kept for a cache level, or for the hierarchy as a whole
///
/// Counters only ever grow, and `hits + misses` of a kind is always the number of accesses of that
/// kind recorded so far
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessCounters {
    pub load_hits: u64,
    pub load_misses: u64,
    pub store_hits: u64,
    pub store_misses: u64,
}

impl AccessCounters {
    #[inline]
    pub fn record(&mut self, kind: AccessKind, hit: bool) {
        let counter = match (kind, hit) {
            (AccessKind::Load, true) => &mut self.load_hits,
            (AccessKind::Load, false) => &mut self.load_misses,
            (AccessKind::Store, true) => &mut self.store_hits,
            (AccessKind::Store, false) => &mut self.store_misses,
        };
        *counter += 1;
    }

    pub fn load_accesses(&self) -> u64 {
        self.load_hits + self.load_misses
    }

    pub fn store_accesses(&self) -> u64 {
        self.store_hits + self.store_misses
    }

    pub fn hits(&self) -> u64 {
        self.load_hits + self.store_hits
    }

    pub fn misses(&self) -> u64 {
        self.load_misses + self.store_misses
    }

    pub fn accesses(&self) -> u64 {
        self.load_accesses() + self.store_accesses()
    }

    pub fn derive(&self) -> DerivedStats {
        DerivedStats {
            load_accesses: self.load_accesses(),
            store_accesses: self.store_accesses(),
            total_hits: self.hits(),
            total_misses: self.misses(),
            total_accesses: self.accesses(),
            load_hit_rate: percentage(self.load_hits, self.load_accesses()),
            load_miss_rate: percentage(self.load_misses, self.load_accesses()),
            store_hit_rate: percentage(self.store_hits, self.store_accesses()),
            store_miss_rate: percentage(self.store_misses, self.store_accesses()),
            hit_rate: percentage(self.hits(), self.accesses()),
            miss_rate: percentage(self.misses(), self.accesses()),
        }
    }
}

/// `part` as a percentage of `whole`, 0 when there is nothing to divide by
pub fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        100.0 * part as f64 / whole as f64
    }
}

/// Totals and rates computed from a set of counters at report time. Rates are percentages.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedStats {
    pub load_accesses: u64,
    pub store_accesses: u64,
    pub total_hits: u64,
    pub total_misses: u64,
    pub total_accesses: u64,
    pub load_hit_rate: f64,
    pub load_miss_rate: f64,
    pub store_hit_rate: f64,
    pub store_miss_rate: f64,
    pub hit_rate: f64,
    pub miss_rate: f64,
}

/// The result for an individual cache level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelReport {
    pub name: String,
    pub counters: AccessCounters,
    pub derived: DerivedStats,
}

impl LevelReport {
    pub fn new(name: impl Into<String>, counters: AccessCounters) -> Self {
        Self {
            name: name.into(),
            counters,
            derived: counters.derive(),
        }
    }
}

/// The result of a simulation run, handed to whatever renders or stores it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsReport {
    /// L1 first, then L2 when configured
    pub levels: Vec<LevelReport>,
    /// Line accesses satisfied by some level, or by none
    pub hierarchy: LevelReport,
    /// Lines that missed every level
    pub main_memory_accesses: u64,
    /// Line probes that came from prefetch instructions, already included in the load counters
    pub prefetch_accesses: u64,
}

impl StatsReport {
    pub fn l1(&self) -> &LevelReport {
        &self.levels[0]
    }

    pub fn l2(&self) -> Option<&LevelReport> {
        self.levels.get(1)
    }
}
