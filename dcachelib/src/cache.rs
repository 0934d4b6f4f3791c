use log::debug;
use crate::addressing::CacheGeometry;
use crate::column_associative::ColumnAssociativeCache;
use crate::config::{CacheConfig, OrganisationConfig, ReplacementPolicyConfig, StoreAllocation};
use crate::error::{AccessError, ConfigError};
use crate::replacement_policies::{LeastRecentlyUsed, ReplacementPolicy, RoundRobin};
use crate::set::Set;
use crate::stats::{AccessCounters, AccessKind};

/// A generic trait for cache levels
///
/// Technically not required as we're using static dispatch through `GenericCache` instead of
/// dyn Cache, but this keeps the organisations interchangeable with no overhead
///
/// The trait assumes that ensuring accesses spanning multiple cache lines are split properly is
/// the responsibility of the caller
pub trait CacheTrait {
    /// The level's name, as used in reports
    fn name(&self) -> &str;

    /// Gets the validated geometry of this level
    fn geometry(&self) -> &CacheGeometry;

    /// Looks up the line holding `address`, returning true on a hit
    ///
    /// On both hits and misses, the implementation must update its replacement state and its
    /// counters
    ///
    /// # Arguments
    ///
    /// * `address`: Any address within the line. Note this is for the line at that address, hence
    /// no size argument
    /// * `kind`: Load or store, picks the counter and whether a miss allocates
    ///
    /// returns: bool
    fn access_single_line(&mut self, address: u64, kind: AccessKind) -> bool;

    /// The running hit and miss counters of this level
    fn counters(&self) -> &AccessCounters;

    /// Gets the number of line slots never filled. Useful for analysing cache performance or
    /// debugging
    fn empty_line_count(&self) -> usize;

    /// Checked access of `size` bytes at `address`, which must all sit in one line
    fn access(&mut self, address: u64, size: u32, kind: AccessKind) -> Result<bool, AccessError> {
        if size == 0 {
            return Err(AccessError::EmptyAccess { address });
        }
        let geometry = self.geometry();
        if !geometry.is_single_line(address, size) {
            return Err(AccessError::NotSingleLine { address, size, line_size: geometry.line_size() });
        }
        Ok(self.access_single_line(address, kind))
    }
}

/// A set associative cache, parameterised by a replacement policy
///
/// We rely on monomorphisation and the inlining of the replacement policy functions to provide
/// performance, which should be close to on par with writing specialised implementations for
/// each policy
pub struct Cache<R: ReplacementPolicy> {
    name: String,
    geometry: CacheGeometry,
    sets: Vec<Set<R>>,
    store_allocation: StoreAllocation,
    counters: AccessCounters,
}

impl<R: ReplacementPolicy> Cache<R> {
    pub fn new(name: impl Into<String>, geometry: CacheGeometry, store_allocation: StoreAllocation) -> Self {
        let associativity = geometry.associativity() as usize;
        Self {
            name: name.into(),
            sets: (0..geometry.sets()).map(|_| Set::new(associativity)).collect(),
            geometry,
            store_allocation,
            counters: AccessCounters::default(),
        }
    }

    /// The set a given address maps to
    pub fn set_for(&self, address: u64) -> &Set<R> {
        &self.sets[self.geometry.set_index(address) as usize]
    }

    /// Whether the line holding `address` is resident, without touching any state
    pub fn contains(&self, address: u64) -> bool {
        self.set_for(address).contains(self.geometry.tag(address))
    }
}

impl<R: ReplacementPolicy> CacheTrait for Cache<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn geometry(&self) -> &CacheGeometry {
        &self.geometry
    }

    // Cache hit is true, cache miss is false
    #[inline]
    fn access_single_line(&mut self, address: u64, kind: AccessKind) -> bool {
        let (set, tag) = self.geometry.address_to_set_and_tag(address);
        let allocate = kind == AccessKind::Load || self.store_allocation == StoreAllocation::Allocate;
        let hit = self.sets[set as usize].probe(tag, allocate);
        self.counters.record(kind, hit);
        hit
    }

    fn counters(&self) -> &AccessCounters {
        &self.counters
    }

    fn empty_line_count(&self) -> usize {
        self.sets.iter().map(|set| set.free_ways()).sum()
    }
}

/// Enum for every kind of cache level the library provides
///
/// Using trait objects reduces boilerplate, but it is surprisingly slow, as this is completely
/// opaque to the compiler. Each access would go through a vtable twice, once per level.
///
/// It's much faster to explicitly branch on all implementations, as the compiler can reason about
/// the concrete types, perform function inlining etc
pub enum GenericCache {
    RoundRobin(Cache<RoundRobin>),
    LeastRecentlyUsed(Cache<LeastRecentlyUsed>),
    ColumnAssociative(ColumnAssociativeCache),
}

impl GenericCache {
    /// Validates a level's configuration and builds the matching cache
    pub fn from_config(config: &CacheConfig) -> Result<Self, ConfigError> {
        let geometry = config.validate()?;
        debug!(
            "{}: {} sets x {} ways x {} byte lines, {:?}, {:?}, stores {:?}",
            config.name,
            geometry.sets(),
            geometry.associativity(),
            geometry.line_size(),
            config.organisation,
            config.replacement_policy,
            config.store_allocation
        );
        let name = config.name.clone();
        Ok(match (config.organisation, config.replacement_policy) {
            (OrganisationConfig::ColumnAssociative, _) => {
                ColumnAssociativeCache::new(name, geometry, config.store_allocation).into()
            }
            (OrganisationConfig::SetAssociative, ReplacementPolicyConfig::RoundRobin) => {
                Cache::<RoundRobin>::new(name, geometry, config.store_allocation).into()
            }
            (OrganisationConfig::SetAssociative, ReplacementPolicyConfig::LeastRecentlyUsed) => {
                Cache::<LeastRecentlyUsed>::new(name, geometry, config.store_allocation).into()
            }
        })
    }
}

impl From<Cache<RoundRobin>> for GenericCache {
    fn from(value: Cache<RoundRobin>) -> Self {
        Self::RoundRobin(value)
    }
}

impl From<Cache<LeastRecentlyUsed>> for GenericCache {
    fn from(value: Cache<LeastRecentlyUsed>) -> Self {
        Self::LeastRecentlyUsed(value)
    }
}

impl From<ColumnAssociativeCache> for GenericCache {
    fn from(value: ColumnAssociativeCache) -> Self {
        Self::ColumnAssociative(value)
    }
}

impl CacheTrait for GenericCache {
    fn name(&self) -> &str {
        match self {
            GenericCache::RoundRobin(c) => c.name(),
            GenericCache::LeastRecentlyUsed(c) => c.name(),
            GenericCache::ColumnAssociative(c) => c.name(),
        }
    }

    fn geometry(&self) -> &CacheGeometry {
        match self {
            GenericCache::RoundRobin(c) => c.geometry(),
            GenericCache::LeastRecentlyUsed(c) => c.geometry(),
            GenericCache::ColumnAssociative(c) => c.geometry(),
        }
    }

    #[inline]
    fn access_single_line(&mut self, address: u64, kind: AccessKind) -> bool {
        match self {
            GenericCache::RoundRobin(c) => c.access_single_line(address, kind),
            GenericCache::LeastRecentlyUsed(c) => c.access_single_line(address, kind),
            GenericCache::ColumnAssociative(c) => c.access_single_line(address, kind),
        }
    }

    fn counters(&self) -> &AccessCounters {
        match self {
            GenericCache::RoundRobin(c) => c.counters(),
            GenericCache::LeastRecentlyUsed(c) => c.counters(),
            GenericCache::ColumnAssociative(c) => c.counters(),
        }
    }

    fn empty_line_count(&self) -> usize {
        match self {
            GenericCache::RoundRobin(c) => c.empty_line_count(),
            GenericCache::LeastRecentlyUsed(c) => c.empty_line_count(),
            GenericCache::ColumnAssociative(c) => c.empty_line_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AccessKind::{Load, Store};

    fn round_robin(size_kb: f32, line_size: u64, associativity: u32) -> GenericCache {
        GenericCache::from_config(&CacheConfig::new("test", size_kb, line_size, associativity)).unwrap()
    }

    #[test]
    fn cold_miss_then_hit() {
        let mut cache = round_robin(32.0, 32, 4);
        assert!(!cache.access_single_line(0x1000, Load));
        assert!(cache.access_single_line(0x1000, Load));
        assert!(cache.access_single_line(0x101f, Store));
        assert_eq!(cache.counters(), &AccessCounters { load_hits: 1, load_misses: 1, store_hits: 1, store_misses: 0 });
    }

    #[test]
    fn round_robin_evicts_in_strict_rotation() {
        // 64 bytes with 32 byte lines and 2 ways is a single set
        let mut cache = round_robin(0.0625, 32, 2);
        assert_eq!(cache.geometry().sets(), 1);
        let results = [0u64, 32, 64, 96].map(|address| cache.access_single_line(address, Load));
        assert_eq!(results, [false; 4]);
        assert!(!cache.access_single_line(0, Load));
        assert!(cache.access_single_line(96, Load));
    }

    #[test]
    fn lru_keeps_lines_that_round_robin_evicts() {
        let config = CacheConfig::new("lru", 0.0625, 32, 2).with_policy(ReplacementPolicyConfig::LeastRecentlyUsed);
        let mut lru = GenericCache::from_config(&config).unwrap();
        let mut rr = round_robin(0.0625, 32, 2);
        for cache in [&mut lru, &mut rr] {
            cache.access_single_line(0, Load);
            cache.access_single_line(32, Load);
            cache.access_single_line(0, Load);
            cache.access_single_line(64, Load);
        }
        assert!(lru.access_single_line(0, Load));
        assert!(!rr.access_single_line(0, Load));
    }

    #[test]
    fn checked_access_rejects_straddling_and_empty_accesses() {
        let mut cache = round_robin(1.0, 32, 1);
        assert_eq!(cache.access(28, 8, Load), Err(AccessError::NotSingleLine { address: 28, size: 8, line_size: 32 }));
        assert_eq!(cache.access(28, 0, Load), Err(AccessError::EmptyAccess { address: 28 }));
        assert_eq!(cache.counters().accesses(), 0);
        assert_eq!(cache.access(28, 4, Store), Ok(false));
        assert_eq!(cache.access(0, 32, Load), Ok(true));
    }

    #[test]
    fn store_no_allocate_does_not_install_lines() {
        let config = CacheConfig::new("wna", 1.0, 32, 2).with_store_allocation(StoreAllocation::NoAllocate);
        let mut cache = GenericCache::from_config(&config).unwrap();
        assert!(!cache.access_single_line(0x40, Store));
        assert!(!cache.access_single_line(0x40, Store));
        assert!(!cache.access_single_line(0x40, Load));
        assert!(cache.access_single_line(0x40, Store));
        assert_eq!(cache.counters().store_misses, 2);
        assert_eq!(cache.counters().store_hits, 1);
    }

    #[test]
    fn counts_empty_lines() {
        let mut cache = round_robin(1.0, 32, 2);
        assert_eq!(cache.empty_line_count(), 32);
        cache.access_single_line(0, Load);
        cache.access_single_line(0, Load);
        cache.access_single_line(1024, Load);
        assert_eq!(cache.empty_line_count(), 30);
    }

    #[test]
    fn contains_does_not_disturb_counters() {
        let geometry = CacheConfig::new("c", 1.0, 32, 2).validate().unwrap();
        let mut cache = Cache::<RoundRobin>::new("c", geometry, StoreAllocation::Allocate);
        cache.access_single_line(0x80, Load);
        assert!(cache.contains(0x9f));
        assert!(!cache.contains(0xa0));
        assert_eq!(cache.counters().accesses(), 1);
    }
}
