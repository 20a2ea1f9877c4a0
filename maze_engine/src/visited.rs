// visited.rs - Search-scoped visited markers, one bit per grid cell

/// Dense bitset owned by a single traversal. Tile identity never carries
/// search state, so a finished search cannot leak markers into the next one.
#[derive(Debug, Clone)]
pub struct VisitedSet {
    words: Vec<u64>,
    len: usize,
}

impl VisitedSet {
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(64)],
            len,
        }
    }

    /// Marks `index`, returning `true` if it was not marked before.
    #[inline]
    pub fn insert(&mut self, index: usize) -> bool {
        let word = &mut self.words[index / 64];
        let bit = 1u64 << (index % 64);
        let fresh = *word & bit == 0;
        *word |= bit;
        fresh
    }

    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        self.words[index / 64] & (1u64 << (index % 64)) != 0
    }

    /// O(cells) reset for reusing the allocation across independent passes.
    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn capacity(&self) -> usize {
        self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_contains_clear() {
        let mut set = VisitedSet::new(130);
        assert_eq!(set.capacity(), 130);
        assert!(set.insert(0));
        assert!(set.insert(64));
        assert!(set.insert(129));
        assert!(!set.insert(64));
        assert!(set.contains(129));
        assert!(!set.contains(128));
        assert_eq!(set.count(), 3);

        set.clear();
        assert_eq!(set.count(), 0);
        assert!(!set.contains(0));
    }
}
