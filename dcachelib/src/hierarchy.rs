use crate::cache::{CacheTrait, GenericCache};
use crate::config::HierarchyConfig;
use crate::error::ConfigError;
use crate::stats::{AccessKind, LevelReport};

/// A mandatory L1 and an optional L2
///
/// L2 is only probed when L1 misses, so L2's counters only ever see L1 misses
pub struct CacheHierarchy {
    l1: GenericCache,
    l2: Option<GenericCache>,
}

impl CacheHierarchy {
    /// Builds both levels from a configuration, failing before anything is simulated if either
    /// level is invalid
    pub fn new(config: &HierarchyConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            l1: GenericCache::from_config(&config.l1)?,
            l2: config.l2.as_ref().map(GenericCache::from_config).transpose()?,
        })
    }

    pub fn l1(&self) -> &GenericCache {
        &self.l1
    }

    pub fn l2(&self) -> Option<&GenericCache> {
        self.l2.as_ref()
    }

    /// Accesses the line holding `address`, returning true if any level had it
    ///
    /// # Arguments
    ///
    /// * `address`: Any address within an L1 line. L2 lines are at least as large so the same
    /// address identifies the L2 line
    /// * `kind`: Load or store
    ///
    /// returns: bool
    #[inline]
    pub fn access_single_line(&mut self, address: u64, kind: AccessKind) -> bool {
        if self.l1.access_single_line(address, kind) {
            return true;
        }
        match &mut self.l2 {
            Some(l2) => l2.access_single_line(address, kind),
            None => false,
        }
    }

    /// Per level reports, L1 first
    pub fn level_reports(&self) -> Vec<LevelReport> {
        std::iter::once(&self.l1)
            .chain(self.l2.as_ref())
            .map(|cache| LevelReport::new(cache.name(), *cache.counters()))
            .collect()
    }

    /// Never filled line slots for each level, L1 first
    pub fn empty_line_counts(&self) -> Vec<usize> {
        std::iter::once(&self.l1)
            .chain(self.l2.as_ref())
            .map(|cache| cache.empty_line_count())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use AccessKind::{Load, Store};

    fn two_level() -> CacheHierarchy {
        // L1 is a single set of 2 ways, L2 has room for everything used here
        CacheHierarchy::new(&HierarchyConfig::new(
            CacheConfig::new("L1", 0.0625, 32, 2),
            Some(CacheConfig::new("L2", 4.0, 32, 4)),
        ))
        .unwrap()
    }

    #[test]
    fn l1_miss_l2_hit_is_an_overall_hit() {
        let mut hierarchy = two_level();
        for address in [0u64, 32, 64] {
            assert!(!hierarchy.access_single_line(address, Load));
        }
        // 0 was rotated out of L1 but is still in L2
        assert!(hierarchy.access_single_line(0, Load));
        let l1 = hierarchy.l1().counters();
        let l2 = hierarchy.l2().unwrap().counters();
        assert_eq!((l1.load_hits, l1.load_misses), (0, 4));
        assert_eq!((l2.load_hits, l2.load_misses), (1, 3));
    }

    #[test]
    fn l1_hit_does_not_probe_l2() {
        let mut hierarchy = two_level();
        hierarchy.access_single_line(0x20, Store);
        assert!(hierarchy.access_single_line(0x20, Store));
        assert!(hierarchy.access_single_line(0x3f, Load));
        assert_eq!(hierarchy.l1().counters().hits(), 2);
        assert_eq!(hierarchy.l2().unwrap().counters().accesses(), 1);
    }

    #[test]
    fn without_l2_the_result_is_l1s() {
        let mut hierarchy = CacheHierarchy::new(&HierarchyConfig::new(CacheConfig::new("L1", 1.0, 32, 1), None)).unwrap();
        assert!(!hierarchy.access_single_line(0, Load));
        assert!(hierarchy.access_single_line(0, Load));
        assert!(hierarchy.l2().is_none());
        assert_eq!(hierarchy.level_reports().len(), 1);
    }

    #[test]
    fn invalid_level_fails_construction() {
        let config = HierarchyConfig::new(CacheConfig::new("L1", 32.0, 32, 4), Some(CacheConfig::new("L2", 32.0, 48, 4)));
        assert!(matches!(CacheHierarchy::new(&config), Err(ConfigError::LineSizeNotPowerOfTwo { .. })));
    }
}
