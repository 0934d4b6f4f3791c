use crate::addressing::CacheGeometry;
use crate::cache::CacheTrait;
use crate::config::StoreAllocation;
use crate::stats::{AccessCounters, AccessKind};

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
struct Slot {
    /// Line address, lines can live away from their primary slot so the set index is part of it
    line: Option<u64>,
    /// Set when the line sits in its secondary slot
    rehashed: bool,
}

/// A direct mapped cache with a second chance: a line missing from its primary slot is looked for
/// in the slot with the top set index bit flipped
///
/// Lines found in the secondary slot are swapped into the primary one, and a miss pushes the old
/// primary line into the secondary slot. The rehash bit marks lines living in their secondary slot,
/// and a primary slot holding one is replaced straight away without a second probe.
pub struct ColumnAssociativeCache {
    name: String,
    geometry: CacheGeometry,
    slots: Vec<Slot>,
    store_allocation: StoreAllocation,
    counters: AccessCounters,
    flip_bit: u64,
}

impl ColumnAssociativeCache {
    pub fn new(name: impl Into<String>, geometry: CacheGeometry, store_allocation: StoreAllocation) -> Self {
        debug_assert!(geometry.associativity() == 1 && geometry.sets() >= 2);
        Self {
            name: name.into(),
            slots: vec![Slot::default(); geometry.sets() as usize],
            flip_bit: geometry.sets() >> 1,
            geometry,
            store_allocation,
            counters: AccessCounters::default(),
        }
    }

    /// Whether the line holding `address` is in its primary or secondary slot
    pub fn contains(&self, address: u64) -> bool {
        let line = Some(self.geometry.line_address(address));
        let primary = self.geometry.set_index(address);
        self.slots[primary as usize].line == line || self.slots[(primary ^ self.flip_bit) as usize].line == line
    }

    fn lookup(&mut self, address: u64, allocate: bool) -> bool {
        let line = self.geometry.line_address(address);
        let primary = self.geometry.set_index(address) as usize;
        let secondary = primary ^ self.flip_bit as usize;
        let first = self.slots[primary];
        if first.line == Some(line) {
            return true;
        }
        if first.rehashed {
            if allocate {
                self.slots[primary] = Slot { line: Some(line), rehashed: false };
            }
            return false;
        }
        if self.slots[secondary].line == Some(line) {
            self.slots[secondary] = Slot { line: first.line, rehashed: first.line.is_some() };
            self.slots[primary] = Slot { line: Some(line), rehashed: false };
            return true;
        }
        if allocate {
            self.slots[secondary] = Slot { line: first.line, rehashed: first.line.is_some() };
            self.slots[primary] = Slot { line: Some(line), rehashed: false };
        }
        false
    }
}

impl CacheTrait for ColumnAssociativeCache {
    fn name(&self) -> &str {
        &self.name
    }

    fn geometry(&self) -> &CacheGeometry {
        &self.geometry
    }

    fn access_single_line(&mut self, address: u64, kind: AccessKind) -> bool {
        let allocate = kind == AccessKind::Load || self.store_allocation == StoreAllocation::Allocate;
        let hit = self.lookup(address, allocate);
        self.counters.record(kind, hit);
        hit
    }

    fn counters(&self) -> &AccessCounters {
        &self.counters
    }

    fn empty_line_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.line.is_none()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use AccessKind::Load;

    // 4 slots of 32 bytes: set index is bits 5-6, set 0 pairs with set 2 and set 1 with set 3
    fn small() -> ColumnAssociativeCache {
        let geometry = CacheConfig::new("col", 0.125, 32, 1).validate().unwrap();
        ColumnAssociativeCache::new("col", geometry, StoreAllocation::Allocate)
    }

    #[test]
    fn conflicting_lines_both_stay_resident() {
        let mut cache = small();
        // 0 and 128 both map to set 0
        assert!(!cache.access_single_line(0, Load));
        assert!(!cache.access_single_line(128, Load));
        assert!(cache.contains(0));
        assert!(cache.contains(128));
        assert!(cache.access_single_line(0, Load));
        assert!(cache.access_single_line(128, Load));
        assert_eq!(cache.counters().load_hits, 2);
    }

    #[test]
    fn secondary_hit_swaps_lines() {
        let mut cache = small();
        cache.access_single_line(0, Load);
        cache.access_single_line(128, Load);
        // 0 now sits in slot 2 as a rehashed line, a hit there brings it back to slot 0
        assert_eq!(cache.slots[2], Slot { line: Some(0), rehashed: true });
        assert!(cache.access_single_line(0, Load));
        assert_eq!(cache.slots[0], Slot { line: Some(0), rehashed: false });
        assert_eq!(cache.slots[2], Slot { line: Some(128), rehashed: true });
    }

    #[test]
    fn rehashed_primary_is_replaced_without_second_probe() {
        let mut cache = small();
        cache.access_single_line(0, Load);
        cache.access_single_line(128, Load);
        // 64 maps to set 2, which holds the rehashed line 0
        assert!(!cache.access_single_line(64, Load));
        assert_eq!(cache.slots[2], Slot { line: Some(64), rehashed: false });
        assert!(!cache.contains(0));
        assert!(cache.contains(128));
    }

    #[test]
    fn third_conflicting_line_evicts_the_oldest() {
        let mut cache = small();
        cache.access_single_line(0, Load);
        cache.access_single_line(128, Load);
        cache.access_single_line(256, Load);
        assert!(cache.contains(256));
        assert!(cache.contains(128));
        assert!(!cache.contains(0));
        assert_eq!(cache.empty_line_count(), 2);
    }

    #[test]
    fn store_without_allocation_changes_nothing() {
        let geometry = CacheConfig::new("col", 0.125, 32, 1).validate().unwrap();
        let mut cache = ColumnAssociativeCache::new("col", geometry, StoreAllocation::NoAllocate);
        assert!(!cache.access_single_line(0, AccessKind::Store));
        assert_eq!(cache.empty_line_count(), 4);
    }
}
