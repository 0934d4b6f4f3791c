/// A generic trait for implementing new replacement policies. Can be used to parameterise a Cache.
///
/// Each set owns its own policy state, so implementations only ever see way numbers within one set
pub trait ReplacementPolicy {
    /// Creates the policy state for one set with the given number of ways
    fn for_set(associativity: usize) -> Self;

    /// Updates the policy when a resident line is hit
    ///
    /// Not applicable for some policies, a default which does nothing is provided
    ///
    /// # Arguments
    ///
    /// * `way`: The way which was hit
    fn update_on_hit(&mut self, _way: usize) {}

    /// Updates the policy after a new line has been placed in a way, whether that way was free or
    /// was just chosen as the victim
    fn update_on_fill(&mut self, _way: usize) {}

    /// Used by the set to pick the way to evict when every way holds a line
    ///
    /// Implementations should assume that when this method is called, the line in the returned
    /// way has been replaced
    fn select_victim(&mut self) -> usize;
}

/// Standard round robin replacement policy
///
/// The cursor only moves when a full set evicts, filling a free way leaves it where it is. With a
/// single way it still rotates, back onto way 0.
#[derive(Debug, Clone)]
pub struct RoundRobin {
    next_victim: usize,
    associativity: usize,
}

impl RoundRobin {
    /// The way that will be evicted on the next capacity miss
    pub fn next_victim(&self) -> usize {
        self.next_victim
    }
}

impl ReplacementPolicy for RoundRobin {
    fn for_set(associativity: usize) -> Self {
        Self { next_victim: 0, associativity }
    }

    fn select_victim(&mut self) -> usize {
        let victim = self.next_victim;
        self.next_victim = (self.next_victim + 1) % self.associativity;
        victim
    }
}

/// Least Recently Used replacement policy
///
/// This implementation keeps track of when each way was last used, and also keeps a logical clock
/// which is advanced each time a way is used. Finding the victim is then a search for the oldest
/// timestamp, with no reordering needed on a hit
#[derive(Debug, Clone)]
pub struct LeastRecentlyUsed {
    last_used_times: Vec<u64>,
    time: u64,
}

impl LeastRecentlyUsed {
    fn touch(&mut self, way: usize) {
        // Clock starts at 1 so an unused way always looks oldest
        self.time += 1;
        self.last_used_times[way] = self.time;
    }

    /// Ways ordered from least to most recently used
    pub fn recency_order(&self) -> Vec<usize> {
        let mut ways = (0..self.last_used_times.len()).collect::<Vec<_>>();
        ways.sort_by_key(|way| self.last_used_times[*way]);
        ways
    }
}

impl ReplacementPolicy for LeastRecentlyUsed {
    fn for_set(associativity: usize) -> Self {
        Self {
            last_used_times: vec![0; associativity],
            time: 0,
        }
    }

    fn update_on_hit(&mut self, way: usize) {
        self.touch(way);
    }

    fn update_on_fill(&mut self, way: usize) {
        self.touch(way);
    }

    fn select_victim(&mut self) -> usize {
        // Iterators are slower than the manual loop here
        let mut index = 0;
        let mut min_value = u64::MAX;
        let mut min_index = 0;
        while index < self.last_used_times.len() {
            if self.last_used_times[index] < min_value {
                min_value = self.last_used_times[index];
                min_index = index;
            }
            index += 1;
        }
        min_index
    }
}
