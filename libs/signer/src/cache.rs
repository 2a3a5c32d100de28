//! Fixed-capacity FIFO ring of address tags
//!
//! Records which subtree addresses the measurement host has already seen
//! regenerated. Slots start zeroed, so tag `0x00` reads as present in a
//! fresh cache. Insertion never checks for an existing entry: every insert
//! consumes the slot under the cursor, evicting the oldest tag.

/// Capacity of the target's cache
pub const CACHE_SIZE: usize = 171;

/// The cache the target runs with
pub type TargetCache = AddressCache<CACHE_SIZE>;

/// Ring buffer of 8-bit address tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressCache<const CAPACITY: usize> {
    slots: [u8; CAPACITY],
    cursor: usize,
}

impl<const CAPACITY: usize> AddressCache<CAPACITY> {
    /// Zeroed cache with the cursor at slot 0
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: [0; CAPACITY],
            cursor: 0,
        }
    }

    /// Linear scan for `tag`
    #[must_use]
    pub fn contains(&self, tag: u8) -> bool {
        self.slots.contains(&tag)
    }

    /// Overwrite the slot under the cursor and advance it
    pub fn insert(&mut self, tag: u8) {
        self.slots[self.cursor] = tag;
        self.cursor = (self.cursor + 1) % CAPACITY;
    }

    /// Slot the next insert will overwrite
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of slots
    #[must_use]
    pub const fn capacity(&self) -> usize {
        CAPACITY
    }

    /// Raw slot contents in slot order
    #[must_use]
    pub fn slots(&self) -> &[u8] {
        &self.slots
    }

    /// Tags from oldest to newest insertion
    pub fn iter_oldest_first(&self) -> impl Iterator<Item = u8> + '_ {
        self.slots[self.cursor..]
            .iter()
            .chain(&self.slots[..self.cursor])
            .copied()
    }
}

impl<const CAPACITY: usize> Default for AddressCache<CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_cache_reports_zero_tag() {
        let cache = TargetCache::new();
        assert!(cache.contains(0));
        assert!(!cache.contains(1));
        assert_eq!(cache.capacity(), 171);
    }

    #[test]
    fn test_reinsert_consumes_slot() {
        let mut cache = AddressCache::<3>::new();
        cache.insert(7);
        cache.insert(7);
        assert_eq!(cache.cursor(), 2);
        assert_eq!(cache.slots(), &[7, 7, 0]);
    }

    #[test]
    fn test_cursor_wraps() {
        let mut cache = AddressCache::<2>::new();
        cache.insert(1);
        cache.insert(2);
        cache.insert(3);
        assert_eq!(cache.cursor(), 1);
        assert!(!cache.contains(1));
        assert!(cache.contains(2));
        assert!(cache.contains(3));
    }

    #[test]
    fn test_iter_oldest_first() {
        let mut cache = AddressCache::<3>::new();
        for tag in [1, 2, 3, 4] {
            cache.insert(tag);
        }
        assert_eq!(cache.iter_oldest_first().collect::<Vec<_>>(), vec![2, 3, 4]);
    }
}
