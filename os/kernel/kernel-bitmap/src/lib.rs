//! # Bit Index
//!
//! A fixed-capacity bit vector over borrowed 32-bit words. One bit per slot;
//! a set bit means "claimed". The frame allocator and the virtual page
//! directory each keep one over static storage.
//!
//! Indices must be below [`BitIndex::capacity`]; anything else is a bug in
//! the caller and panics.
//!
//! ```rust
//! # use kernel_bitmap::BitIndex;
//! let mut words = [0u32; 4];
//! let mut bits = BitIndex::new(&mut words, 128);
//! bits.set_range(0..3);
//! assert_eq!(bits.find_first_clear(), Some(3));
//! assert_eq!(bits.find_first_clear_run(8), Some(3));
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

const WORD_BITS: usize = u32::BITS as usize;

/// Fixed-capacity bit vector.
pub struct BitIndex<'a> {
    words: &'a mut [u32],
    capacity: usize,
}

impl<'a> BitIndex<'a> {
    /// Longest run [`find_first_clear_run`](Self::find_first_clear_run) can find.
    ///
    /// The run search slides a window of one machine word over the bitmap, so
    /// runs longer than a word are out of reach regardless of capacity.
    pub const MAX_RUN: usize = WORD_BITS;

    /// Words needed to hold `capacity` bits.
    #[must_use]
    pub const fn words_for(capacity: usize) -> usize {
        capacity.div_ceil(WORD_BITS)
    }

    /// Wrap existing storage. The contents of `words` are kept as they are.
    ///
    /// # Panics
    /// If `words` cannot hold `capacity` bits.
    pub fn new(words: &'a mut [u32], capacity: usize) -> Self {
        assert!(
            words.len() >= Self::words_for(capacity),
            "bit index storage too small: {} words for {capacity} bits",
            words.len()
        );
        Self { words, capacity }
    }

    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    #[must_use]
    pub fn test(&self, index: usize) -> bool {
        let (word, mask) = self.locate(index);
        self.words[word] & mask != 0
    }

    #[inline]
    pub fn set(&mut self, index: usize) {
        let (word, mask) = self.locate(index);
        self.words[word] |= mask;
    }

    #[inline]
    pub fn clear(&mut self, index: usize) {
        let (word, mask) = self.locate(index);
        self.words[word] &= !mask;
    }

    /// Set every index in `range`.
    pub fn set_range(&mut self, range: core::ops::Range<usize>) {
        for index in range {
            self.set(index);
        }
    }

    /// Clear every index in `range`.
    pub fn clear_range(&mut self, range: core::ops::Range<usize>) {
        for index in range {
            self.clear(index);
        }
    }

    /// Number of set bits below `capacity`.
    #[must_use]
    pub fn count_set(&self) -> usize {
        (0..Self::words_for(self.capacity))
            .map(|w| (self.words[w] & self.valid_mask(w)).count_ones() as usize)
            .sum()
    }

    /// Lowest clear index, or `None` if every slot is claimed.
    #[must_use]
    pub fn find_first_clear(&self) -> Option<usize> {
        (0..Self::words_for(self.capacity)).find_map(|w| {
            let word = self.words[w] | !self.valid_mask(w);
            (word != u32::MAX).then(|| w * WORD_BITS + word.trailing_ones() as usize)
        })
    }

    /// Lowest start of `n` consecutive clear indices, or `None` if no such run exists.
    ///
    /// Runs may straddle word boundaries.
    ///
    /// # Panics
    /// If `n` is zero or larger than [`MAX_RUN`](Self::MAX_RUN).
    #[must_use]
    pub fn find_first_clear_run(&self, n: usize) -> Option<usize> {
        assert!(
            (1..=Self::MAX_RUN).contains(&n),
            "run length {n} outside 1..={}",
            Self::MAX_RUN
        );
        if n > self.capacity {
            return None;
        }

        let run_mask = u64::MAX >> (u64::BITS as usize - n);
        let words = Self::words_for(self.capacity);
        for w in 0..words {
            let low = self.words[w] | !self.valid_mask(w);
            if low == u32::MAX {
                continue;
            }
            let high = if w + 1 < words {
                self.words[w + 1] | !self.valid_mask(w + 1)
            } else {
                u32::MAX
            };
            let window = u64::from(low) | (u64::from(high) << WORD_BITS);
            for shift in low.trailing_ones() as usize..WORD_BITS {
                if (window >> shift) & run_mask == 0 {
                    return Some(w * WORD_BITS + shift);
                }
            }
        }
        None
    }

    /// Bits of word `w` that lie below `capacity`.
    #[inline]
    fn valid_mask(&self, w: usize) -> u32 {
        let remaining = self.capacity - w * WORD_BITS;
        if remaining >= WORD_BITS {
            u32::MAX
        } else {
            (1u32 << remaining) - 1
        }
    }

    #[inline]
    fn locate(&self, index: usize) -> (usize, u32) {
        assert!(
            index < self.capacity,
            "bit index {index} out of range (capacity {})",
            self.capacity
        );
        (index / WORD_BITS, 1 << (index % WORD_BITS))
    }
}

impl core::fmt::Debug for BitIndex<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BitIndex")
            .field("capacity", &self.capacity)
            .field("set", &self.count_set())
            .finish()
    }
}
