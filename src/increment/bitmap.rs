//! Block set of pages already known to be changed (typically derived from
//! WAL by the caller).

use std::collections::BTreeMap;

/// Number of blocks tracked per backing word.
const BLOCKS_PER_WORD: u32 = 64;

/// Sparse 1-bit-per-block set. Only words holding at least one block are
/// stored, so memory follows the number of blocks, not the largest one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeltaBitmap {
    words: BTreeMap<u32, u64>,
}

fn split(block: u32) -> (u32, u64) {
    (block / BLOCKS_PER_WORD, 1u64 << (block % BLOCKS_PER_WORD))
}

impl DeltaBitmap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, block: u32) {
        let (idx, bit) = split(block);
        *self.words.entry(idx).or_insert(0) |= bit;
    }

    pub fn contains(&self, block: u32) -> bool {
        let (idx, bit) = split(block);
        self.words.get(&idx).is_some_and(|word| word & bit != 0)
    }

    pub fn len(&self) -> usize {
        self.words.values().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Blocks in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.iter_from(0)
    }

    /// Blocks `>= start` in ascending order.
    pub fn iter_from(&self, start: u32) -> impl Iterator<Item = u32> + '_ {
        self.words
            .range(start / BLOCKS_PER_WORD..)
            .flat_map(|(&idx, &word)| {
                (0..BLOCKS_PER_WORD)
                    .filter(move |bit| word & (1u64 << bit) != 0)
                    .map(move |bit| idx * BLOCKS_PER_WORD + bit)
            })
            .filter(move |&block| block >= start)
    }
}

impl FromIterator<u32> for DeltaBitmap {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        let mut bitmap = DeltaBitmap::new();
        for block in iter {
            bitmap.insert(block);
        }
        bitmap
    }
}
