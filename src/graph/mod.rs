//! The road-network graph: columnar raw-way storage, the routing structure,
//! and the build phases that turn one into the other.

pub mod access;
pub mod big_street;
pub mod build;
pub mod components;
pub mod restrictions;
pub mod routing;

pub use restrictions::{ResolvedRestriction, RestrictionKind};
pub use routing::{
    ComponentId, OsmNodeId, OsmWayId, Restriction, Routing, VertexId, WayId, WayPos,
    WayProperties, INVALID_COMPONENT,
};

use std::fs;
use std::path::{Path, PathBuf};

use bytemuck::{Pod, Zeroable};
use rustc_hash::FxHashMap;

use crate::error::GraphError;
use crate::formats::graph_blob;
use crate::geo::Point;
use crate::multiplicity::MultiplicityIndex;
use crate::store::{MmapBitset, MmapVec, MmapVecVec};
use routing::NO_NAME;

const ROUTING_FILE: &str = "routing.bin";

/// One entry of the conditional-access side table, sorted by way id.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct AccessEntry {
    pub way: WayId,
    pub string: u32,
}

/// A road-network graph directory.
///
/// Created writable, populated way by way, then built in strictly ordered
/// phases: [`connect_ways`](WayGraph::connect_ways),
/// [`build_components`](WayGraph::build_components),
/// [`propagate_big_streets`](WayGraph::propagate_big_streets),
/// [`add_restrictions`](WayGraph::add_restrictions). Finished graphs are
/// reopened read-only with [`open`](WayGraph::open) and never mutated.
pub struct WayGraph {
    dir: PathBuf,
    pub(crate) routing: Routing,
    pub(crate) vertex_to_osm: MmapVec<OsmNodeId>,
    pub(crate) way_to_osm: MmapVec<OsmWayId>,
    pub(crate) way_polylines: MmapVecVec<Point>,
    pub(crate) way_raw_nodes: MmapVecVec<OsmNodeId>,
    pub(crate) strings: MmapVecVec<u8>,
    pub(crate) way_names: MmapVec<u32>,
    pub(crate) access_bits: MmapBitset,
    pub(crate) access_entries: MmapVec<AccessEntry>,
    pub(crate) multiplicity: Option<MultiplicityIndex>,
    interner: FxHashMap<String, u32>,
}

impl WayGraph {
    /// Create a fresh, writable graph directory.
    pub fn create(dir: impl AsRef<Path>) -> Result<Self, GraphError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            routing: Routing::default(),
            vertex_to_osm: MmapVec::create(dir.join("vertex_to_osm.bin"))?,
            way_to_osm: MmapVec::create(dir.join("way_to_osm.bin"))?,
            way_polylines: MmapVecVec::create(
                dir.join("way_polylines_data.bin"),
                dir.join("way_polylines_index.bin"),
            )?,
            way_raw_nodes: MmapVecVec::create(
                dir.join("way_raw_nodes_data.bin"),
                dir.join("way_raw_nodes_index.bin"),
            )?,
            strings: MmapVecVec::create(
                dir.join("strings_data.bin"),
                dir.join("strings_index.bin"),
            )?,
            way_names: MmapVec::create(dir.join("way_names.bin"))?,
            access_bits: MmapBitset::create(dir.join("way_access_bits.bin"))?,
            access_entries: MmapVec::create(dir.join("way_access_restrictions.bin"))?,
            multiplicity: Some(MultiplicityIndex::create(&dir)?),
            interner: FxHashMap::default(),
            dir,
        })
    }

    /// Open a previously built graph read-only.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, GraphError> {
        let dir = dir.as_ref().to_path_buf();
        Ok(Self {
            routing: graph_blob::read(dir.join(ROUTING_FILE))?,
            vertex_to_osm: MmapVec::open_ro(dir.join("vertex_to_osm.bin"))?,
            way_to_osm: MmapVec::open_ro(dir.join("way_to_osm.bin"))?,
            way_polylines: MmapVecVec::open_ro(
                dir.join("way_polylines_data.bin"),
                dir.join("way_polylines_index.bin"),
            )?,
            way_raw_nodes: MmapVecVec::open_ro(
                dir.join("way_raw_nodes_data.bin"),
                dir.join("way_raw_nodes_index.bin"),
            )?,
            strings: MmapVecVec::open_ro(
                dir.join("strings_data.bin"),
                dir.join("strings_index.bin"),
            )?,
            way_names: MmapVec::open_ro(dir.join("way_names.bin"))?,
            access_bits: MmapBitset::open_ro(dir.join("way_access_bits.bin"))?,
            access_entries: MmapVec::open_ro(dir.join("way_access_restrictions.bin"))?,
            multiplicity: None,
            interner: FxHashMap::default(),
            dir,
        })
    }

    /// Append one raw way: id, node sequence, parallel geometry, flags, and
    /// optional name / conditional-access restriction.
    pub fn add_way(
        &mut self,
        osm_id: OsmWayId,
        raw_nodes: &[OsmNodeId],
        polyline: &[Point],
        properties: WayProperties,
        name: Option<&str>,
        access_restriction: Option<&str>,
    ) -> Result<WayId, GraphError> {
        if raw_nodes.len() != polyline.len() {
            return Err(GraphError::Consistency(format!(
                "way {osm_id}: {} raw nodes but {} geometry points",
                raw_nodes.len(),
                polyline.len()
            )));
        }
        let multi = self.multiplicity.as_mut().ok_or(GraphError::ReadOnly)?;
        for &n in raw_nodes {
            multi.add(n)?;
        }

        let way = self.way_to_osm.len() as WayId;
        self.way_to_osm.push(osm_id)?;
        self.way_raw_nodes.push_bucket(raw_nodes)?;
        self.way_polylines.push_bucket(polyline)?;
        self.routing.way_properties.push(properties);

        let name_idx = match name {
            Some(s) => self.intern(s)?,
            None => NO_NAME,
        };
        self.way_names.push(name_idx)?;

        // Ways arrive in ascending dense id order, so the table stays sorted.
        if let Some(s) = access_restriction {
            let string = self.intern(s)?;
            self.access_bits.set(way as u64)?;
            self.access_entries.push(AccessEntry { way, string })?;
        }
        Ok(way)
    }

    fn intern(&mut self, s: &str) -> Result<u32, GraphError> {
        if let Some(&idx) = self.interner.get(s) {
            return Ok(idx);
        }
        let idx = self.strings.push_bucket(s.as_bytes())? as u32;
        self.interner.insert(s.to_owned(), idx);
        Ok(idx)
    }

    pub(crate) fn string(&self, idx: u32) -> Result<&str, GraphError> {
        std::str::from_utf8(self.strings.bucket(idx as usize))
            .map_err(|_| GraphError::Consistency(format!("string {idx} is not valid UTF-8")))
    }

    pub fn n_ways(&self) -> usize {
        self.way_to_osm.len()
    }

    pub fn n_vertices(&self) -> usize {
        self.vertex_to_osm.len()
    }

    pub fn routing(&self) -> &Routing {
        &self.routing
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn vertex_osm_id(&self, vertex: VertexId) -> OsmNodeId {
        self.vertex_to_osm.get(vertex as usize)
    }

    /// Dense vertex id for a raw node, if it was promoted to a vertex.
    pub fn find_vertex(&self, osm_node: OsmNodeId) -> Option<VertexId> {
        self.vertex_to_osm
            .as_slice()
            .binary_search(&osm_node)
            .ok()
            .map(|i| i as VertexId)
    }

    pub fn way_osm_id(&self, way: WayId) -> OsmWayId {
        self.way_to_osm.get(way as usize)
    }

    pub fn way_vertices(&self, way: WayId) -> &[VertexId] {
        self.routing.way_vertices.bucket(way as usize)
    }

    pub fn way_dists(&self, way: WayId) -> &[u16] {
        self.routing.way_dists.bucket(way as usize)
    }

    pub fn way_polyline(&self, way: WayId) -> &[Point] {
        self.way_polylines.bucket(way as usize)
    }

    pub fn way_raw_nodes(&self, way: WayId) -> &[OsmNodeId] {
        self.way_raw_nodes.bucket(way as usize)
    }

    pub fn way_component(&self, way: WayId) -> ComponentId {
        self.routing.way_component[way as usize]
    }

    pub fn is_big_street(&self, way: WayId) -> bool {
        self.routing.way_properties[way as usize].is_big_street()
    }

    pub fn way_name(&self, way: WayId) -> Option<&str> {
        let idx = self.way_names.get(way as usize);
        if idx == NO_NAME {
            return None;
        }
        self.string(idx).ok()
    }

    pub fn vertex_ways(&self, vertex: VertexId) -> &[WayId] {
        self.routing.vertex_ways.bucket(vertex as usize)
    }

    pub fn vertex_in_way_pos(&self, vertex: VertexId) -> &[u16] {
        self.routing.vertex_in_way_pos.bucket(vertex as usize)
    }

    pub fn is_restricted(&self, vertex: VertexId) -> bool {
        self.routing.vertex_is_restricted.get(vertex as usize)
    }

    pub fn vertex_restrictions(&self, vertex: VertexId) -> &[Restriction] {
        self.routing.vertex_restrictions.bucket(vertex as usize)
    }

    pub fn is_turn_forbidden(&self, vertex: VertexId, from: WayPos, to: WayPos) -> bool {
        self.routing.is_turn_forbidden(vertex, from, to)
    }

    /// Flush every columnar file to durable storage.
    pub fn sync(&mut self) -> Result<(), GraphError> {
        self.vertex_to_osm.sync()?;
        self.way_to_osm.sync()?;
        self.way_polylines.sync()?;
        self.way_raw_nodes.sync()?;
        self.strings.sync()?;
        self.way_names.sync()?;
        self.access_bits.sync()?;
        self.access_entries.sync()?;
        Ok(())
    }

    /// Write the routing structure as one relocatable blob.
    pub fn write_routing(&self) -> Result<(), GraphError> {
        graph_blob::write(self.dir.join(ROUTING_FILE), &self.routing)
    }

    /// Verify all cross-table invariants. Any failure is fatal to the build.
    pub fn check_consistency(&self) -> Result<(), GraphError> {
        self.routing.check_consistency()?;

        let osm = self.vertex_to_osm.as_slice();
        if !osm.windows(2).all(|w| w[0] < w[1]) {
            return Err(GraphError::Consistency(
                "vertex_to_osm is not strictly increasing".into(),
            ));
        }
        if self.routing.n_vertices() != osm.len() {
            return Err(GraphError::Consistency(format!(
                "routing holds {} vertices, id table holds {}",
                self.routing.n_vertices(),
                osm.len()
            )));
        }
        if self.routing.n_ways() != self.way_to_osm.len() {
            return Err(GraphError::Consistency(format!(
                "routing holds {} ways, id table holds {}",
                self.routing.n_ways(),
                self.way_to_osm.len()
            )));
        }
        if self.way_names.len() != self.way_to_osm.len() {
            return Err(GraphError::Consistency(
                "way name column length disagrees with way count".into(),
            ));
        }

        let entries = self.access_entries.as_slice();
        if !entries.windows(2).all(|e| e[0].way < e[1].way) {
            return Err(GraphError::Consistency(
                "access restriction table is not sorted by way id".into(),
            ));
        }
        for e in entries {
            if !self.access_bits.test(e.way as u64) {
                return Err(GraphError::Consistency(format!(
                    "access table entry for way {} without its bit set",
                    e.way
                )));
            }
        }
        if self.access_bits.count_ones() != entries.len() {
            return Err(GraphError::Consistency(format!(
                "{} access bits set but {} table entries",
                self.access_bits.count_ones(),
                entries.len()
            )));
        }
        Ok(())
    }
}
