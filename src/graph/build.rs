//! Graph builder: promote multiply-referenced raw nodes to vertices, then
//! compact every way into its vertex sequence and build the inverse
//! (vertex-indexed) adjacency.

use tracing::error;

use crate::error::GraphError;
use crate::geo::Point;
use crate::progress::ProgressObserver;

use super::routing::{VertexId, WayId};
use super::WayGraph;

impl WayGraph {
    /// Connect ways into the vertex graph.
    ///
    /// Step A assigns dense vertex ids to all multiply-referenced raw nodes
    /// in ascending raw-id order, fixing `vertex_to_osm` strictly
    /// increasing. Step B walks every way's raw nodes and geometry in
    /// lockstep, accumulating `distance` between consecutive geometry
    /// points, and emits the way's vertex sequence, its inter-vertex
    /// distances, and the per-vertex staging lists that become the inverse
    /// adjacency.
    ///
    /// Adjacency is discovered way-major but stored vertex-major, so it is
    /// staged in a vertex-indexed arena and copied once into the final
    /// compact storage after the scan. The multiplicity index and its
    /// temporary files are consumed by this phase.
    pub fn connect_ways<F>(
        &mut self,
        distance: F,
        progress: &dyn ProgressObserver,
    ) -> Result<(), GraphError>
    where
        F: Fn(&Point, &Point) -> f64,
    {
        let multi = self.multiplicity.take().ok_or(GraphError::ReadOnly)?;

        // Step A: vertex assignment.
        for osm_node in multi.iter_multi() {
            self.vertex_to_osm.push(osm_node)?;
        }
        let n_vertices = self.vertex_to_osm.len();
        self.routing.vertex_is_restricted.resize(n_vertices);

        // Step B: per-way compaction.
        let n_ways = self.way_to_osm.len();
        progress.begin("connect ways", n_ways as u64);

        let mut staged_ways: Vec<Vec<WayId>> = vec![Vec::new(); n_vertices];
        let mut staged_pos: Vec<Vec<u16>> = vec![Vec::new(); n_vertices];
        let mut verts: Vec<VertexId> = Vec::new();
        let mut dists: Vec<u16> = Vec::new();

        for w in 0..n_ways {
            verts.clear();
            dists.clear();
            let raw_nodes = self.way_raw_nodes.bucket(w);
            let polyline = self.way_polylines.bucket(w);

            let mut pred: Option<Point> = None;
            let mut acc = 0.0f64;
            let mut have_from = false;
            let mut overflow_reported = false;

            for (walk, (&osm_node, point)) in
                raw_nodes.iter().zip(polyline.iter()).enumerate()
            {
                if let Some(p) = &pred {
                    acc += distance(p, point);
                }

                if multi.is_multi(osm_node) {
                    let vertex = match self.vertex_to_osm.as_slice().binary_search(&osm_node) {
                        Ok(i) => i as VertexId,
                        Err(_) => {
                            return Err(GraphError::Consistency(format!(
                                "raw node {osm_node} is multiply referenced but has no vertex id"
                            )))
                        }
                    };

                    // Walk positions are 16-bit; a longer way is a
                    // data-quality defect. Report it and saturate.
                    let pos = if walk > u16::MAX as usize {
                        if !overflow_reported {
                            error!(
                                osm_way = self.way_to_osm.get(w),
                                raw_nodes = raw_nodes.len(),
                                "way exceeds the 16-bit walk position range; positions saturate"
                            );
                            overflow_reported = true;
                        }
                        u16::MAX
                    } else {
                        walk as u16
                    };

                    staged_ways[vertex as usize].push(w as WayId);
                    staged_pos[vertex as usize].push(pos);
                    verts.push(vertex);
                    if have_from {
                        dists.push(acc.round() as u16);
                    }
                    acc = 0.0;
                    have_from = true;
                }

                pred = Some(*point);
            }

            self.routing.way_vertices.push_bucket(&verts);
            self.routing.way_dists.push_bucket(&dists);
            progress.update(w as u64 + 1);
        }

        // Materialize the staged inverse adjacency, then drop the arena.
        for (ways, pos) in staged_ways.iter().zip(staged_pos.iter()) {
            self.routing.vertex_ways.push_bucket(ways);
            self.routing.vertex_in_way_pos.push_bucket(pos);
        }

        self.vertex_to_osm.sync()?;
        multi.dispose()?;
        Ok(())
    }
}
