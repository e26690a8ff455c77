// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use std::sync::atomic::{AtomicUsize, Ordering};

const BITS_PER_WORD: usize = usize::BITS as usize;

/// Lock-free bitmap recording which slots fired since the last drain.
///
/// Setting a bit is idempotent; only the first setter learns that the bit
/// was clear, which lets callers coalesce wakeups.
pub(crate) struct AtomicBitset {
    words: Box<[AtomicUsize]>,
    capacity: usize,
}

impl AtomicBitset {
    pub(crate) fn new(capacity: usize) -> Self {
        let words = (0..capacity.div_ceil(BITS_PER_WORD))
            .map(|_| AtomicUsize::new(0))
            .collect();
        Self { words, capacity }
    }

    /// Set `index`, returning whether it was already set.
    ///
    /// Out-of-range indices are ignored and reported as already set so they
    /// never trigger a wakeup.
    pub(crate) fn test_and_set(&self, index: usize) -> bool {
        if index >= self.capacity {
            return true;
        }

        let bit = 1usize << (index % BITS_PER_WORD);
        let prev = self.words[index / BITS_PER_WORD].fetch_or(bit, Ordering::AcqRel);
        (prev & bit) != 0
    }

    /// Whether any bit is currently set.
    pub(crate) fn any(&self) -> bool {
        self.words
            .iter()
            .any(|word| word.load(Ordering::Acquire) != 0)
    }

    /// Clear every bit and return the indices that were set, ascending.
    pub(crate) fn take_all(&self) -> Vec<usize> {
        let mut indices = Vec::new();

        for (word_idx, word) in self.words.iter().enumerate() {
            let mut value = word.swap(0, Ordering::AcqRel);
            while value != 0 {
                let bit_offset = value.trailing_zeros() as usize;
                value &= value - 1;

                let index = word_idx * BITS_PER_WORD + bit_offset;
                if index < self.capacity {
                    indices.push(index);
                }
            }
        }

        indices
    }
}
