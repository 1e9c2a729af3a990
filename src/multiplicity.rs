//! Multiplicity index: which raw OSM nodes are referenced more than once.
//!
//! Two mapped bitsets over raw node ids, counted per reference while ways
//! are added; a node referenced twice by the same way (a closed loop) is
//! promoted just like a shared node. The backing files are temporaries in
//! the graph directory; the graph builder deletes them once vertex
//! assignment is done.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::store::MmapBitset;

const SEEN_FILE: &str = "tmp_node_seen.bin";
const MULTI_FILE: &str = "tmp_node_multi.bin";

pub struct MultiplicityIndex {
    seen: MmapBitset,
    multi: MmapBitset,
    seen_path: PathBuf,
    multi_path: PathBuf,
}

impl MultiplicityIndex {
    pub fn create(dir: &Path) -> io::Result<Self> {
        let seen_path = dir.join(SEEN_FILE);
        let multi_path = dir.join(MULTI_FILE);
        Ok(Self {
            seen: MmapBitset::create(&seen_path)?,
            multi: MmapBitset::create(&multi_path)?,
            seen_path,
            multi_path,
        })
    }

    /// Count one reference to `osm_node`.
    pub fn add(&mut self, osm_node: i64) -> io::Result<()> {
        let bit = u64::try_from(osm_node).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "negative OSM node id")
        })?;
        if self.seen.test(bit) {
            self.multi.set(bit)
        } else {
            self.seen.set(bit)
        }
    }

    pub fn is_multi(&self, osm_node: i64) -> bool {
        osm_node >= 0 && self.multi.test(osm_node as u64)
    }

    /// All multiply-referenced raw node ids, ascending.
    pub fn iter_multi(&self) -> impl Iterator<Item = i64> + '_ {
        self.multi.set_bits().map(|b| b as i64)
    }

    /// Drop the mappings and delete the backing files.
    pub fn dispose(self) -> io::Result<()> {
        let Self {
            seen,
            multi,
            seen_path,
            multi_path,
        } = self;
        drop(seen);
        drop(multi);
        fs::remove_file(&seen_path)?;
        fs::remove_file(&multi_path)?;
        Ok(())
    }
}
