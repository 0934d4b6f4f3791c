use crate::replacement_policies::ReplacementPolicy;

/// One associative bucket: the tags resident in a set, in way order, and the policy deciding who
/// leaves on a miss
///
/// Free ways are always at the end, a set fills up way by way and never shrinks
#[derive(Debug, Clone)]
pub struct Set<R: ReplacementPolicy> {
    tags: Vec<u64>,
    associativity: usize,
    replacement_policy: R,
}

impl<R: ReplacementPolicy> Set<R> {
    pub fn new(associativity: usize) -> Self {
        Self {
            tags: Vec::with_capacity(associativity),
            associativity,
            replacement_policy: R::for_set(associativity),
        }
    }

    /// Looks up a tag, returning true on a hit
    ///
    /// On a miss with `allocate` set the tag is installed, in the first free way if there is one
    /// and over the policy's victim otherwise. Without `allocate` a miss leaves the set untouched.
    ///
    /// # Arguments
    ///
    /// * `tag`: The tag of the line being accessed
    /// * `allocate`: Whether a miss brings the line in
    ///
    /// returns: bool
    #[inline]
    pub fn probe(&mut self, tag: u64, allocate: bool) -> bool {
        // Only search the filled ways
        let mut way = 0;
        while way < self.tags.len() {
            if self.tags[way] == tag {
                self.replacement_policy.update_on_hit(way);
                return true;
            }
            way += 1;
        }
        if !allocate {
            return false;
        }
        let way = if self.tags.len() < self.associativity {
            self.tags.push(tag);
            self.tags.len() - 1
        } else {
            let victim = self.replacement_policy.select_victim();
            self.tags[victim] = tag;
            victim
        };
        self.replacement_policy.update_on_fill(way);
        false
    }

    /// Whether a tag is resident, without touching any state
    pub fn contains(&self, tag: u64) -> bool {
        self.tags.contains(&tag)
    }

    /// The resident tags in way order
    pub fn tags(&self) -> &[u64] {
        &self.tags
    }

    pub fn free_ways(&self) -> usize {
        self.associativity - self.tags.len()
    }

    pub fn replacement_policy(&self) -> &R {
        &self.replacement_policy
    }
}
