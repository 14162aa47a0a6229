//! Word-packed bit sets over a fixed universe `[0, n)`.

use std::hash::{Hash, Hasher};

const WORD_BITS: usize = 64;

/// A fixed-size bit set. Every element lives in `[0, len)`; the universe
/// size is part of the value and two sets over different universes never
/// compare equal.
#[derive(Clone, Debug)]
pub struct BitSet {
    words: Vec<u64>,
    len: usize,
    ones: usize,
}

impl BitSet {
    pub fn new(len: usize) -> Self {
        BitSet {
            words: vec![0u64; (len + WORD_BITS - 1) / WORD_BITS],
            len,
            ones: 0,
        }
    }

    /// Universe filled with every element of `[0, len)`.
    pub fn full(len: usize) -> Self {
        let mut set = BitSet::new(len);
        for word in set.words.iter_mut() {
            *word = !0u64;
        }
        // Mask off the bits past the end of the last word.
        let tail = len % WORD_BITS;
        if tail != 0 {
            if let Some(last) = set.words.last_mut() {
                *last &= (1u64 << tail) - 1;
            }
        }
        set.ones = len;
        set
    }

    pub fn from_indices(len: usize, indices: &[usize]) -> Self {
        let mut set = BitSet::new(len);
        for &i in indices {
            set.insert(i);
        }
        set
    }

    /// Universe size, not the number of members.
    pub fn universe(&self) -> usize {
        self.len
    }

    /// Number of members.
    pub fn count(&self) -> usize {
        self.ones
    }

    pub fn contains(&self, i: usize) -> bool {
        debug_assert!(i < self.len);
        self.words[i / WORD_BITS] & (1u64 << (i % WORD_BITS)) != 0
    }

    pub fn insert(&mut self, i: usize) {
        assert!(i < self.len, "index {} outside universe [0, {})", i, self.len);
        let word = &mut self.words[i / WORD_BITS];
        let mask = 1u64 << (i % WORD_BITS);
        if *word & mask == 0 {
            *word |= mask;
            self.ones += 1;
        }
    }

    pub fn remove(&mut self, i: usize) {
        assert!(i < self.len, "index {} outside universe [0, {})", i, self.len);
        let word = &mut self.words[i / WORD_BITS];
        let mask = 1u64 << (i % WORD_BITS);
        if *word & mask != 0 {
            *word &= !mask;
            self.ones -= 1;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ones == 0
    }

    /// True when no element is shared with `other`.
    pub fn is_disjoint(&self, other: &BitSet) -> bool {
        debug_assert_eq!(self.len, other.len);
        self.words
            .iter()
            .zip(other.words.iter())
            .all(|(a, b)| a & b == 0)
    }

    /// True when every member of `self` is also in `other`.
    pub fn is_subset(&self, other: &BitSet) -> bool {
        debug_assert_eq!(self.len, other.len);
        self.words
            .iter()
            .zip(other.words.iter())
            .all(|(a, b)| a & !b == 0)
    }

    /// Number of members of `self` that are not members of `other`.
    pub fn count_not_in(&self, other: &BitSet) -> usize {
        debug_assert_eq!(self.len, other.len);
        self.words
            .iter()
            .zip(other.words.iter())
            .map(|(a, b)| (a & !b).count_ones() as usize)
            .sum()
    }

    /// Members in ascending order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            set: self,
            word_ix: 0,
            current: self.words.first().copied().unwrap_or(0),
        }
    }
}

impl PartialEq for BitSet {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.words == other.words
    }
}

impl Eq for BitSet {}

impl Hash for BitSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.words.hash(state);
    }
}

pub struct Iter<'a> {
    set: &'a BitSet,
    word_ix: usize,
    current: u64,
}

impl<'a> Iterator for Iter<'a> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        while self.current == 0 {
            self.word_ix += 1;
            if self.word_ix >= self.set.words.len() {
                return None;
            }
            self.current = self.set.words[self.word_ix];
        }
        let bit = self.current.trailing_zeros() as usize;
        self.current &= self.current - 1;
        Some(self.word_ix * WORD_BITS + bit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_remove_count() {
        let mut s = BitSet::new(130);
        s.insert(0);
        s.insert(64);
        s.insert(129);
        s.insert(64); // repeated insert does not change the count
        assert_eq!(s.count(), 3);
        assert!(s.contains(64));
        s.remove(64);
        s.remove(64);
        assert_eq!(s.count(), 2);
        assert!(!s.contains(64));
    }

    #[test]
    fn iter_ascending() {
        let s = BitSet::from_indices(200, &[3, 199, 64, 65, 0]);
        let got: Vec<_> = s.iter().collect();
        assert_eq!(got, vec![0, 3, 64, 65, 199]);
    }

    #[test]
    fn full_masks_tail() {
        let s = BitSet::full(70);
        assert_eq!(s.count(), 70);
        assert_eq!(s.iter().last(), Some(69));
    }

    #[test]
    fn subset_and_disjoint() {
        let a = BitSet::from_indices(10, &[1, 2, 3]);
        let b = BitSet::from_indices(10, &[1, 2, 3, 7]);
        let c = BitSet::from_indices(10, &[8, 9]);
        assert!(a.is_subset(&b));
        assert!(!b.is_subset(&a));
        assert!(a.is_disjoint(&c));
        assert!(!a.is_disjoint(&b));
        assert_eq!(b.count_not_in(&a), 1);
        assert_eq!(a.count_not_in(&b), 0);
    }
}
