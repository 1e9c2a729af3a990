//! Memory-mapped columnar storage primitives.
//!
//! The graph core never touches files directly; it stores its columns in
//! these containers. Growable mapped arrays ([`MmapVec`]), variable-length
//! bucket sequences ([`MmapVecVec`], with an owned serializable twin
//! [`VecVec`] for the routing blob) and word-packed bitsets ([`BitVec`],
//! [`MmapBitset`]).

pub mod bitset;
pub mod mmap_vec;
pub mod vecvec;

pub use bitset::{BitVec, MmapBitset};
pub use mmap_vec::MmapVec;
pub use vecvec::{MmapVecVec, VecVec};
