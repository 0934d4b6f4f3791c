use std::time::{Duration, Instant};
use log::{trace, warn};
use crate::addressing::CacheGeometry;
use crate::cache::CacheTrait;
use crate::config::HierarchyConfig;
use crate::error::{AccessError, ConfigError, SimulationError, TraceError};
use crate::hierarchy::CacheHierarchy;
use crate::splitter::{plan_access, AccessEvent, AccessPlan, AccessReason, SplitterSettings};
use crate::stats::{AccessCounters, AccessKind, LevelReport, StatsReport};

/// The simulator splits accesses into lines, feeds them through the hierarchy, and collects results.
///
/// Its lifecycle is `new`, any number of `notify_access` calls (or trace replays), then `finalize`,
/// which consumes it. Nothing is shared, the host serialises calls if it has several threads.
pub struct Simulator {
    hierarchy: CacheHierarchy,
    l1_geometry: CacheGeometry,
    settings: SplitterSettings,
    counters: AccessCounters,
    prefetch_accesses: u64,
    simulation_time: Duration,
}

impl Simulator {
    /// Creates a new simulator for a given configuration
    ///
    /// # Arguments
    ///
    /// * `config`: A hierarchy configuration, usually resulting from parsing JSON or CLI knobs
    ///
    /// returns: Result<Simulator, ConfigError>
    pub fn new(config: &HierarchyConfig) -> Result<Self, ConfigError> {
        let hierarchy = CacheHierarchy::new(config)?;
        Ok(Self {
            l1_geometry: *hierarchy.l1().geometry(),
            hierarchy,
            settings: SplitterSettings {
                single_line_threshold: config.single_line_threshold,
                prefetch_size: config.prefetch_size,
            },
            counters: AccessCounters::default(),
            prefetch_accesses: 0,
            simulation_time: Duration::new(0, 0),
        })
    }

    /// Handles one memory operation reported by the host
    ///
    /// Every L1 line the operation touches is a separate hit or miss
    pub fn notify_access(&mut self, event: &AccessEvent) -> Result<(), AccessError> {
        if event.reason == AccessReason::Prefetch && event.kind == AccessKind::Store {
            warn!("prefetch at {:#x} reported as a store, treating it as a load", event.ip);
        }
        let plan = plan_access(event, &self.l1_geometry, &self.settings)?;
        if let AccessPlan::MultiLine { first_line, line_count, .. } = plan {
            trace!("{:#x}+{} split into {line_count} lines from {first_line:#x}", event.address, event.size);
        }
        let kind = plan.kind();
        for line in plan.line_addresses(self.l1_geometry.line_size()) {
            let hit = self.hierarchy.access_single_line(line, kind);
            self.counters.record(kind, hit);
        }
        if event.reason == AccessReason::Prefetch {
            self.prefetch_accesses += plan.line_count();
        }
        Ok(())
    }

    /// Single line fast path for a host that already knows the access fits in one line
    ///
    /// Fails without touching any state if it does not, the host can then fall back to
    /// `notify_access`
    pub fn access_single_line(&mut self, address: u64, size: u32, kind: AccessKind) -> Result<bool, AccessError> {
        if size == 0 {
            return Err(AccessError::EmptyAccess { address });
        }
        if !self.l1_geometry.is_single_line(address, size) {
            return Err(AccessError::NotSingleLine { address, size, line_size: self.l1_geometry.line_size() });
        }
        let hit = self.hierarchy.access_single_line(address, kind);
        self.counters.record(kind, hit);
        Ok(hit)
    }

    /// Replays a stream of numbered events, stopping at the first bad record or bad access
    ///
    /// Events carry their record number, as yielded by `trace::records`, so an access error names
    /// the record even when the stream was filtered. Wall clock time spent here is added to the
    /// execution time. Returns the number of events replayed.
    pub fn replay<I>(&mut self, events: I) -> Result<u64, SimulationError>
    where
        I: IntoIterator<Item = Result<(usize, AccessEvent), TraceError>>,
    {
        let start = Instant::now();
        let result = self.replay_events(events);
        self.simulation_time += start.elapsed();
        result
    }

    fn replay_events<I>(&mut self, events: I) -> Result<u64, SimulationError>
    where
        I: IntoIterator<Item = Result<(usize, AccessEvent), TraceError>>,
    {
        let mut replayed = 0;
        for item in events {
            let (record, event) = item?;
            self.notify_access(&event)
                .map_err(|source| SimulationError::Access { record, ip: event.ip, source })?;
            replayed += 1;
        }
        Ok(replayed)
    }

    /// Simulates the caches over a trace buffer in the record format of the `trace` module
    ///
    /// # Arguments
    ///
    /// * `bytes`: The input byte array, holding whole records only
    ///
    /// returns: Result<u64, SimulationError>
    pub fn simulate(&mut self, bytes: &[u8]) -> Result<u64, SimulationError> {
        let records = crate::trace::records(bytes)?;
        self.replay(records)
    }

    /// Gets the wall-clock execution time for processing
    pub fn get_execution_time(&self) -> &Duration {
        &self.simulation_time
    }

    /// Gets the number of never filled lines for each level
    pub fn get_empty_line_counts(&self) -> Vec<usize> {
        self.hierarchy.empty_line_counts()
    }

    pub fn hierarchy(&self) -> &CacheHierarchy {
        &self.hierarchy
    }

    /// The hierarchy level counters so far
    pub fn counters(&self) -> &AccessCounters {
        &self.counters
    }

    /// Ends the run and produces the report
    pub fn finalize(self) -> StatsReport {
        StatsReport {
            levels: self.hierarchy.level_reports(),
            hierarchy: LevelReport::new("Total", self.counters),
            main_memory_accesses: self.counters.misses(),
            prefetch_accesses: self.prefetch_accesses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;

    fn l1_only(size_kb: f32, line_size: u64, associativity: u32) -> Simulator {
        Simulator::new(&HierarchyConfig::new(CacheConfig::new("L1", size_kb, line_size, associativity), None)).unwrap()
    }

    #[test]
    fn straddling_access_probes_both_lines() {
        let mut simulator = l1_only(1.0, 32, 1);
        simulator.notify_access(&AccessEvent::load(32, 4)).unwrap();
        simulator.notify_access(&AccessEvent::load(28, 8)).unwrap();
        // Line 0 was cold, line 32 was already resident
        assert_eq!(simulator.counters(), &AccessCounters { load_hits: 1, load_misses: 2, ..Default::default() });
        let l1 = simulator.hierarchy().l1().counters();
        assert_eq!(l1.load_accesses(), 3);
    }

    #[test]
    fn same_line_multi_byte_access_counts_once() {
        let mut simulator = l1_only(1.0, 32, 1);
        simulator.notify_access(&AccessEvent::store(0, 16)).unwrap();
        simulator.notify_access(&AccessEvent::store(16, 16)).unwrap();
        assert_eq!(simulator.counters().store_accesses(), 2);
        assert_eq!(simulator.counters().store_hits, 1);
    }

    #[test]
    fn prefetch_counts_as_loads_of_its_footprint() {
        let mut simulator = l1_only(1.0, 32, 1);
        simulator.notify_access(&AccessEvent::prefetch(0x100, 1)).unwrap();
        simulator.notify_access(&AccessEvent::load(0x120, 8)).unwrap();
        let report = simulator.finalize();
        assert_eq!(report.prefetch_accesses, 2);
        assert_eq!(report.hierarchy.counters, AccessCounters { load_hits: 1, load_misses: 2, ..Default::default() });
    }

    #[test]
    fn explicit_fast_path_rejects_straddling_access() {
        let mut simulator = l1_only(1.0, 32, 1);
        assert_eq!(
            simulator.access_single_line(30, 4, AccessKind::Load),
            Err(AccessError::NotSingleLine { address: 30, size: 4, line_size: 32 })
        );
        assert_eq!(simulator.counters().accesses(), 0);
        assert_eq!(simulator.access_single_line(28, 4, AccessKind::Load), Ok(false));
        assert_eq!(simulator.access_single_line(0, 1, AccessKind::Load), Ok(true));
    }

    #[test]
    fn zero_sized_access_is_surfaced() {
        let mut simulator = l1_only(1.0, 32, 1);
        assert_eq!(simulator.notify_access(&AccessEvent::load(0, 0)), Err(AccessError::EmptyAccess { address: 0 }));
        assert_eq!(simulator.notify_access(&AccessEvent::store(4, 0)), Err(AccessError::EmptyAccess { address: 4 }));
        assert_eq!(simulator.counters().accesses(), 0);
    }

    #[test]
    fn zero_sized_prefetch_is_surfaced_without_counting() {
        let mut simulator = l1_only(1.0, 32, 1);
        assert_eq!(
            simulator.notify_access(&AccessEvent::prefetch(0x100, 0)),
            Err(AccessError::EmptyAccess { address: 0x100 })
        );
        assert_eq!(simulator.counters().accesses(), 0);
        assert_eq!(simulator.finalize().prefetch_accesses, 0);
    }

    #[test]
    fn zero_sized_records_of_every_kind_stop_the_replay() {
        for kind in ['R', 'W', 'P'] {
            let trace = format!("0000000000400000 0000000000001000 {kind} 000\n");
            let mut simulator = l1_only(1.0, 32, 1);
            assert_eq!(
                simulator.simulate(trace.as_bytes()),
                Err(SimulationError::Access { record: 0, ip: 0x400000, source: AccessError::EmptyAccess { address: 0x1000 } }),
                "{kind} 000"
            );
            assert_eq!(simulator.counters().accesses(), 0, "{kind} 000");
        }
    }

    #[test]
    fn finalize_with_no_accesses_reports_zero_rates() {
        let report = l1_only(32.0, 32, 4).finalize();
        assert_eq!(report.hierarchy.derived.hit_rate, 0.0);
        assert_eq!(report.l1().derived.miss_rate, 0.0);
        assert_eq!(report.main_memory_accesses, 0);
        assert!(report.l2().is_none());
    }

    #[test]
    fn replays_a_trace_buffer() {
        let trace = concat!(
            "0000000000400000 0000000000001000 R 004\n",
            "0000000000400004 0000000000001000 W 004\n",
            "0000000000400008 000000000000101c R 008\n",
        );
        let mut simulator = l1_only(1.0, 32, 1);
        assert_eq!(simulator.simulate(trace.as_bytes()), Ok(3));
        let report = simulator.finalize();
        assert_eq!(report.hierarchy.counters, AccessCounters { load_hits: 1, load_misses: 2, store_hits: 1, store_misses: 0 });
        assert_eq!(report.main_memory_accesses, 2);
    }

    #[test]
    fn replay_stops_at_a_bad_access() {
        let trace = concat!(
            "0000000000400000 0000000000001000 R 004\n",
            "0000000000400004 0000000000001000 W 000\n",
            "0000000000400008 0000000000002000 R 004\n",
        );
        let mut simulator = l1_only(1.0, 32, 1);
        assert_eq!(
            simulator.simulate(trace.as_bytes()),
            Err(SimulationError::Access { record: 1, ip: 0x400004, source: AccessError::EmptyAccess { address: 0x1000 } })
        );
        assert_eq!(simulator.counters().accesses(), 1);
    }

    #[test]
    fn filtered_replay_reports_the_record_number() {
        let trace = concat!(
            "0000000000400000 0000000000001000 R 004\n",
            "0000000000500000 0000000000001000 R 004\n",
            "0000000000400008 0000000000002000 W 000\n",
        );
        let mut simulator = l1_only(1.0, 32, 1);
        let records = crate::trace::records(trace.as_bytes()).unwrap();
        let in_range = records.filter(|item| item.as_ref().map_or(true, |(_, event)| event.ip < 0x500000));
        assert_eq!(
            simulator.replay(in_range),
            Err(SimulationError::Access { record: 2, ip: 0x400008, source: AccessError::EmptyAccess { address: 0x2000 } })
        );
        assert_eq!(simulator.counters().accesses(), 1);
    }
}
