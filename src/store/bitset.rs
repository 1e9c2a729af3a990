//! Word-packed bitsets, owned and memory-mapped.

use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::mmap_vec::MmapVec;

/// Owned bitset with an explicit bit length; lives inside the routing blob.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BitVec {
    words: Vec<u64>,
    len: usize,
}

impl BitVec {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Grow to `len` bits; new bits are zero. Never shrinks.
    pub fn resize(&mut self, len: usize) {
        if len > self.len {
            self.words.resize(len.div_ceil(64), 0);
            self.len = len;
        }
    }

    pub fn set(&mut self, i: usize, value: bool) {
        assert!(i < self.len, "bit {i} out of bounds (len {})", self.len);
        let mask = 1u64 << (i % 64);
        if value {
            self.words[i / 64] |= mask;
        } else {
            self.words[i / 64] &= !mask;
        }
    }

    pub fn get(&self, i: usize) -> bool {
        i < self.len && self.words[i / 64] & (1 << (i % 64)) != 0
    }

    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }
}

/// Bitset backed by a memory-mapped word column; grows on demand when a bit
/// beyond the current length is set.
pub struct MmapBitset {
    words: MmapVec<u64>,
}

impl MmapBitset {
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self {
            words: MmapVec::create(path)?,
        })
    }

    pub fn open_ro(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self {
            words: MmapVec::open_ro(path)?,
        })
    }

    pub fn set(&mut self, i: u64) -> io::Result<()> {
        let word = (i / 64) as usize;
        if word >= self.words.len() {
            self.words.resize(word + 1, 0)?;
        }
        let cur = self.words.get(word);
        self.words.set(word, cur | 1 << (i % 64))
    }

    pub fn test(&self, i: u64) -> bool {
        let word = (i / 64) as usize;
        word < self.words.len() && self.words.get(word) & (1 << (i % 64)) != 0
    }

    /// Indices of all set bits, ascending.
    pub fn set_bits(&self) -> impl Iterator<Item = u64> + '_ {
        self.words
            .as_slice()
            .iter()
            .enumerate()
            .flat_map(|(wi, &word)| {
                (0..64u64).filter_map(move |b| {
                    if word & (1 << b) != 0 {
                        Some(wi as u64 * 64 + b)
                    } else {
                        None
                    }
                })
            })
    }

    pub fn count_ones(&self) -> usize {
        self.words
            .as_slice()
            .iter()
            .map(|w| w.count_ones() as usize)
            .sum()
    }

    pub fn sync(&mut self) -> io::Result<()> {
        self.words.sync()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_bitvec_set_get() {
        let mut b = BitVec::default();
        b.resize(130);
        b.set(0, true);
        b.set(64, true);
        b.set(129, true);
        assert!(b.get(0));
        assert!(!b.get(1));
        assert!(b.get(64));
        assert!(b.get(129));
        assert_eq!(b.count_ones(), 3);
        b.set(64, false);
        assert_eq!(b.count_ones(), 2);
    }

    #[test]
    fn test_mmap_bitset_grows_and_iterates_ascending() {
        let dir = TempDir::new().unwrap();
        let mut b = MmapBitset::create(dir.path().join("bits.bin")).unwrap();
        for i in [700u64, 3, 64, 65] {
            b.set(i).unwrap();
        }
        assert!(b.test(3));
        assert!(b.test(700));
        assert!(!b.test(4));
        assert!(!b.test(100_000));
        let bits: Vec<u64> = b.set_bits().collect();
        assert_eq!(bits, vec![3, 64, 65, 700]);
    }

    #[test]
    fn test_mmap_bitset_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bits.bin");
        {
            let mut b = MmapBitset::create(&path).unwrap();
            b.set(42).unwrap();
            b.sync().unwrap();
        }
        let b = MmapBitset::open_ro(&path).unwrap();
        assert!(b.test(42));
        assert!(!b.test(43));
    }
}
