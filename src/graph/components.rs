//! Component labeler: partition ways into maximal groups connected by
//! shared vertices.

use std::collections::VecDeque;

use crate::progress::ProgressObserver;

use super::routing::{WayId, INVALID_COMPONENT};
use super::WayGraph;

impl WayGraph {
    /// Assign a connected-component id to every way.
    ///
    /// Worklist flood fill over the implicit vertex-way incidence graph,
    /// never recursion, so stack depth stays bounded on large inputs. The
    /// component array doubles as the visited marker. Ids are allocated
    /// densely in way-id order; the partition itself does not depend on
    /// traversal order.
    pub fn build_components(&mut self, progress: &dyn ProgressObserver) {
        let r = &mut self.routing;
        let n_ways = r.way_vertices.len();
        progress.begin("build components", n_ways as u64);

        r.way_component.clear();
        r.way_component.resize(n_ways, INVALID_COMPONENT);

        let mut queue: VecDeque<WayId> = VecDeque::new();
        let mut next_component = 0;
        for w in 0..n_ways {
            if r.way_component[w] != INVALID_COMPONENT {
                progress.update(w as u64 + 1);
                continue;
            }
            r.way_component[w] = next_component;
            queue.push_back(w as WayId);
            while let Some(way) = queue.pop_front() {
                for &vertex in r.way_vertices.bucket(way as usize) {
                    for &other in r.vertex_ways.bucket(vertex as usize) {
                        let c = &mut r.way_component[other as usize];
                        if *c == INVALID_COMPONENT {
                            *c = next_component;
                            queue.push_back(other);
                        }
                    }
                }
            }
            next_component += 1;
            progress.update(w as u64 + 1);
        }
    }
}
