/// The validated shape of a cache level, and the address arithmetic that goes with it
///
/// Line size and set count are both powers of two, so every mapping is a shift or a mask. Only
/// `CacheConfig::validate` builds these outside of tests, which is what keeps that true.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CacheGeometry {
    line_size: u64,
    sets: u64,
    associativity: u32,
    line_offset_bits: u32,
    set_selection_bits: u32,
    line_alignment_bit_mask: u64,
    set_selection_bit_mask: u64,
}

impl CacheGeometry {
    pub(crate) fn new(line_size: u64, sets: u64, associativity: u32) -> Self {
        debug_assert!(line_size.is_power_of_two() && sets.is_power_of_two());
        let line_offset_bits = line_size.trailing_zeros();
        Self {
            line_size,
            sets,
            associativity,
            line_offset_bits,
            set_selection_bits: sets.trailing_zeros(),
            line_alignment_bit_mask: !(line_size - 1),
            set_selection_bit_mask: sets - 1,
        }
    }

    pub fn line_size(&self) -> u64 {
        self.line_size
    }

    pub fn sets(&self) -> u64 {
        self.sets
    }

    pub fn associativity(&self) -> u32 {
        self.associativity
    }

    /// Total number of line slots in the level
    pub fn lines(&self) -> u64 {
        self.sets * self.associativity as u64
    }

    /// The address of the first byte of the line holding `address`
    #[inline]
    pub fn line_address(&self, address: u64) -> u64 {
        address & self.line_alignment_bit_mask
    }

    #[inline]
    pub fn line_offset(&self, address: u64) -> u64 {
        address & !self.line_alignment_bit_mask
    }

    #[inline]
    pub fn set_index(&self, address: u64) -> u64 {
        (address >> self.line_offset_bits) & self.set_selection_bit_mask
    }

    #[inline]
    pub fn tag(&self, address: u64) -> u64 {
        address >> (self.line_offset_bits + self.set_selection_bits)
    }

    /// Converts an address into a set and a tag in one go
    #[inline]
    pub fn address_to_set_and_tag(&self, address: u64) -> (u64, u64) {
        (self.set_index(address), self.tag(address))
    }

    /// Inverse of `address_to_set_and_tag`, giving back the line address
    #[inline]
    pub fn line_from_set_and_tag(&self, set: u64, tag: u64) -> u64 {
        ((tag << self.set_selection_bits) | set) << self.line_offset_bits
    }

    /// Whether `size` bytes starting at `address` sit inside one line. Zero sized accesses never do.
    pub fn is_single_line(&self, address: u64, size: u32) -> bool {
        size != 0 && self.line_offset(address) + size as u64 <= self.line_size
    }

    /// The number of lines touched by `size` bytes starting at `address`
    pub fn lines_spanned(&self, address: u64, size: u32) -> u64 {
        if size == 0 {
            return 0;
        }
        let last = address.saturating_add(size as u64 - 1);
        ((self.line_address(last) - self.line_address(address)) >> self.line_offset_bits) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_line_addresses_share_line_set_and_tag() {
        let geometry = CacheGeometry::new(32, 256, 4);
        let base = 0x7fff_1234_5660;
        for offset in 0..32 {
            assert_eq!(geometry.line_address(base + offset), base);
            assert_eq!(geometry.address_to_set_and_tag(base + offset), geometry.address_to_set_and_tag(base));
        }
        assert_ne!(geometry.line_address(base + 32), base);
    }

    #[test]
    fn set_and_tag_recover_the_line() {
        let geometry = CacheGeometry::new(64, 1024, 8);
        for address in [0u64, 63, 64, 0xdead_beef, u64::MAX, 0x1_0000_0040] {
            let (set, tag) = geometry.address_to_set_and_tag(address);
            assert!(set < geometry.sets());
            assert_eq!(geometry.line_from_set_and_tag(set, tag), geometry.line_address(address));
        }
    }

    #[test]
    fn matches_division_definitions() {
        let geometry = CacheGeometry::new(32, 16, 2);
        for address in [5u64, 100, 4096 + 77, 123_456_789] {
            assert_eq!(geometry.set_index(address), (address / 32) % 16);
            assert_eq!(geometry.tag(address), address / (32 * 16));
        }
    }

    #[test]
    fn counts_spanned_lines() {
        let geometry = CacheGeometry::new(32, 1, 2);
        assert!(geometry.is_single_line(0, 32));
        assert!(geometry.is_single_line(28, 4));
        assert!(!geometry.is_single_line(28, 8));
        assert!(!geometry.is_single_line(0, 0));
        assert_eq!(geometry.lines_spanned(28, 8), 2);
        assert_eq!(geometry.lines_spanned(0, 64), 2);
        assert_eq!(geometry.lines_spanned(1, 64), 3);
        assert_eq!(geometry.lines_spanned(40, 1), 1);
    }
}
