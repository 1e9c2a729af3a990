//! The relocatable routing structure: adjacency, components, way flags, and
//! compiled turn restrictions. Serialized as one blob; everything else about
//! the graph lives in per-column mapped files.

use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::store::{BitVec, VecVec};

/// Raw node id as given by the upstream map-data source.
pub type OsmNodeId = i64;
/// Raw way id as given by the upstream map-data source.
pub type OsmWayId = i64;
/// Dense graph vertex id, assigned in ascending raw-node-id order.
pub type VertexId = u32;
/// Dense way id, assigned in raw-way insertion order.
pub type WayId = u32;
/// Connected-component id, dense among assigned ids.
pub type ComponentId = u32;
/// Index of a way within a vertex's ordered incident-way list.
pub type WayPos = u8;

pub const INVALID_COMPONENT: ComponentId = ComponentId::MAX;

/// Sentinel in the way-name column for unnamed ways.
pub(crate) const NO_NAME: u32 = u32::MAX;

/// Packed per-way flag set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WayProperties {
    bits: u8,
}

impl WayProperties {
    const IS_BIG_STREET: u8 = 1 << 0;

    pub fn is_big_street(&self) -> bool {
        self.bits & Self::IS_BIG_STREET != 0
    }

    pub fn set_big_street(&mut self, value: bool) {
        if value {
            self.bits |= Self::IS_BIG_STREET;
        } else {
            self.bits &= !Self::IS_BIG_STREET;
        }
    }
}

/// A forbidden movement at a vertex, in way-position coordinates: entering
/// on the way at position `from`, leaving on the way at position `to` is
/// disallowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restriction {
    pub from: WayPos,
    pub to: WayPos,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
pub struct Routing {
    /// Per way: the graph vertices lying on it, in walk order.
    pub way_vertices: VecVec<VertexId>,
    /// Per way: rounded distances between consecutive vertices, parallel to
    /// `way_vertices` minus one.
    pub way_dists: VecVec<u16>,
    /// Per way: connected-component id.
    pub way_component: Vec<ComponentId>,
    /// Per way: flag set.
    pub way_properties: Vec<WayProperties>,
    /// Per vertex: incident ways, in discovery order.
    pub vertex_ways: VecVec<WayId>,
    /// Per vertex: raw-node walk position within each incident way,
    /// parallel to `vertex_ways`.
    pub vertex_in_way_pos: VecVec<u16>,
    /// Per vertex: whether any movement restriction applies here.
    pub vertex_is_restricted: BitVec,
    /// Per vertex: forbidden movement pairs. Sized to the vertex count once
    /// restriction compilation has run; empty buckets mean unrestricted.
    pub vertex_restrictions: VecVec<Restriction>,
}

impl Routing {
    pub fn n_ways(&self) -> usize {
        self.way_vertices.len()
    }

    /// Valid once `connect_ways` has materialized the inverse adjacency.
    pub fn n_vertices(&self) -> usize {
        self.vertex_ways.len()
    }

    /// Position of `way` in the vertex's incident-way list (first match).
    /// `None` when the way is not incident, or sits beyond the position
    /// range.
    pub fn way_pos(&self, vertex: VertexId, way: WayId) -> Option<WayPos> {
        self.vertex_ways
            .bucket(vertex as usize)
            .iter()
            .position(|&w| w == way)
            .and_then(|i| WayPos::try_from(i).ok())
    }

    pub fn is_turn_forbidden(&self, vertex: VertexId, from: WayPos, to: WayPos) -> bool {
        self.vertex_is_restricted.get(vertex as usize)
            && self
                .vertex_restrictions
                .bucket(vertex as usize)
                .iter()
                .any(|r| r.from == from && r.to == to)
    }

    /// Verify the structural invariants. A violation is a construction bug
    /// and fails the whole build.
    pub fn check_consistency(&self) -> Result<(), GraphError> {
        let n_ways = self.n_ways();
        if self.way_dists.len() != n_ways
            || self.way_component.len() != n_ways
            || self.way_properties.len() != n_ways
        {
            return Err(GraphError::Consistency(format!(
                "way tables disagree: {} vertices buckets, {} dist buckets, {} components, {} properties",
                n_ways,
                self.way_dists.len(),
                self.way_component.len(),
                self.way_properties.len()
            )));
        }
        for w in 0..n_ways {
            let n_verts = self.way_vertices.bucket(w).len();
            let n_dists = self.way_dists.bucket(w).len();
            if n_verts == 0 && n_dists != 0 || n_verts > 0 && n_dists != n_verts - 1 {
                return Err(GraphError::Consistency(format!(
                    "way {w}: {n_verts} vertices but {n_dists} distances"
                )));
            }
        }

        let n_vertices = self.n_vertices();
        if self.vertex_in_way_pos.len() != n_vertices
            || self.vertex_is_restricted.len() != n_vertices
        {
            return Err(GraphError::Consistency(format!(
                "vertex tables disagree: {} way buckets, {} position buckets, {} restricted bits",
                n_vertices,
                self.vertex_in_way_pos.len(),
                self.vertex_is_restricted.len()
            )));
        }
        for v in 0..n_vertices {
            let n_ways_at = self.vertex_ways.bucket(v).len();
            let n_pos = self.vertex_in_way_pos.bucket(v).len();
            if n_ways_at != n_pos {
                return Err(GraphError::Consistency(format!(
                    "vertex {v}: {n_ways_at} incident ways but {n_pos} way positions"
                )));
            }
        }

        if self.vertex_restrictions.len() != n_vertices {
            return Err(GraphError::Consistency(format!(
                "restriction storage holds {} vertices, graph has {n_vertices}",
                self.vertex_restrictions.len()
            )));
        }

        if let Some(w) = self
            .way_component
            .iter()
            .position(|&c| c == INVALID_COMPONENT)
        {
            return Err(GraphError::Consistency(format!(
                "way {w} has no component id"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_way_properties_flags() {
        let mut p = WayProperties::default();
        assert!(!p.is_big_street());
        p.set_big_street(true);
        assert!(p.is_big_street());
        p.set_big_street(false);
        assert!(!p.is_big_street());
    }

    #[test]
    fn test_way_pos_first_match() {
        let mut r = Routing::default();
        r.vertex_ways.push_bucket(&[4, 7, 4, 9]);
        assert_eq!(r.way_pos(0, 4), Some(0));
        assert_eq!(r.way_pos(0, 9), Some(3));
        assert_eq!(r.way_pos(0, 5), None);
    }

    #[test]
    fn test_is_turn_forbidden() {
        let mut r = Routing::default();
        r.vertex_ways.push_bucket(&[1, 2]);
        r.vertex_in_way_pos.push_bucket(&[0, 3]);
        r.vertex_is_restricted.resize(1);
        r.vertex_is_restricted.set(0, true);
        r.vertex_restrictions.resize(1);
        r.vertex_restrictions.push_at(0, Restriction { from: 0, to: 1 });

        assert!(r.is_turn_forbidden(0, 0, 1));
        assert!(!r.is_turn_forbidden(0, 1, 0));
    }

    #[test]
    fn test_consistency_rejects_unassigned_component() {
        let mut r = Routing::default();
        r.way_vertices.push_bucket(&[]);
        r.way_dists.push_bucket(&[]);
        r.way_component.push(INVALID_COMPONENT);
        r.way_properties.push(WayProperties::default());
        assert!(matches!(
            r.check_consistency(),
            Err(GraphError::Consistency(_))
        ));
    }

    #[test]
    fn test_consistency_rejects_length_mismatch() {
        let mut r = Routing::default();
        r.way_vertices.push_bucket(&[0, 1, 2]);
        r.way_dists.push_bucket(&[5]);
        r.way_component.push(0);
        r.way_properties.push(WayProperties::default());
        assert!(matches!(
            r.check_consistency(),
            Err(GraphError::Consistency(_))
        ));
    }
}
