//! Variable-length bucket sequences: a flat data array plus an index of
//! `n + 1` bucket start offsets.

use std::io;
use std::path::Path;

use bytemuck::Pod;
use serde::{Deserialize, Serialize};

use super::mmap_vec::MmapVec;

/// Memory-mapped bucket sequence, stored as twin `_data`/`_index` files.
/// Buckets are appended whole and never mutated afterwards.
pub struct MmapVecVec<T: Pod> {
    data: MmapVec<T>,
    bucket_starts: MmapVec<u64>,
}

impl<T: Pod> MmapVecVec<T> {
    pub fn create(data_path: impl AsRef<Path>, index_path: impl AsRef<Path>) -> io::Result<Self> {
        let data = MmapVec::create(data_path)?;
        let mut bucket_starts = MmapVec::create(index_path)?;
        bucket_starts.push(0)?;
        Ok(Self { data, bucket_starts })
    }

    pub fn open_ro(data_path: impl AsRef<Path>, index_path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self {
            data: MmapVec::open_ro(data_path)?,
            bucket_starts: MmapVec::open_ro(index_path)?,
        })
    }

    /// Number of buckets.
    pub fn len(&self) -> usize {
        self.bucket_starts.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a bucket, returning its index.
    pub fn push_bucket(&mut self, items: &[T]) -> io::Result<usize> {
        self.data.extend_from_slice(items)?;
        self.bucket_starts.push(self.data.len() as u64)?;
        Ok(self.len() - 1)
    }

    pub fn bucket(&self, i: usize) -> &[T] {
        let starts = self.bucket_starts.as_slice();
        let from = starts[i] as usize;
        let to = starts[i + 1] as usize;
        &self.data.as_slice()[from..to]
    }

    pub fn sync(&mut self) -> io::Result<()> {
        self.data.sync()?;
        self.bucket_starts.sync()
    }
}

/// Owned, serializable twin of [`MmapVecVec`]; the bucket-sequence members of
/// the routing blob use this. Additionally supports sizing to a bucket count
/// and appending into an existing bucket, which the restriction compiler
/// needs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VecVec<T> {
    data: Vec<T>,
    bucket_starts: Vec<u64>,
}

impl<T> Default for VecVec<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            bucket_starts: vec![0],
        }
    }
}

impl<T: Copy> VecVec<T> {
    pub fn len(&self) -> usize {
        self.bucket_starts.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn push_bucket(&mut self, items: &[T]) {
        self.data.extend_from_slice(items);
        self.bucket_starts.push(self.data.len() as u64);
    }

    pub fn bucket(&self, i: usize) -> &[T] {
        let from = self.bucket_starts[i] as usize;
        let to = self.bucket_starts[i + 1] as usize;
        &self.data[from..to]
    }

    /// Grow to `n` buckets by appending empty ones. Never shrinks.
    pub fn resize(&mut self, n: usize) {
        while self.len() < n {
            self.bucket_starts.push(self.data.len() as u64);
        }
    }

    /// Append `value` to bucket `i`, shifting any later data. The compiler
    /// only ever targets the trailing bucket in practice, so the shifted
    /// tail is empty.
    pub fn push_at(&mut self, i: usize, value: T) {
        let at = self.bucket_starts[i + 1] as usize;
        self.data.insert(at, value);
        for start in &mut self.bucket_starts[i + 1..] {
            *start += 1;
        }
    }

    pub fn buckets(&self) -> impl Iterator<Item = &[T]> {
        (0..self.len()).map(move |i| self.bucket(i))
    }
}
