//! Big-street propagator: mark ways adjacent to an originally big street.

use std::sync::atomic::{AtomicU64, Ordering};

use rayon::prelude::*;
use rustc_hash::FxHashSet;

use crate::progress::ProgressObserver;

use super::routing::{Routing, WayId};
use super::WayGraph;

impl WayGraph {
    /// Extend the big-street classification to neighboring ways.
    ///
    /// Decisions are made against a snapshot of the original flags, so a
    /// way that only becomes big through this pass never acts as a source
    /// itself. Each way's computation is independent and writes only its
    /// own flag, so the scan runs on the rayon pool with a per-worker
    /// scratch set; the progress counter is observational only and may be
    /// reported out of order.
    pub fn propagate_big_streets(&mut self, progress: &dyn ProgressObserver) {
        let n_ways = self.routing.n_ways();
        progress.begin("propagate big streets", n_ways as u64);

        let original: Vec<bool> = self
            .routing
            .way_properties
            .iter()
            .map(|p| p.is_big_street())
            .collect();

        let routing = &self.routing;
        let done = AtomicU64::new(0);
        let flagged: Vec<bool> = (0..n_ways)
            .into_par_iter()
            .map_init(FxHashSet::default, |seen: &mut FxHashSet<WayId>, w| {
                let flag =
                    original[w] || near_big_street(routing, &original, w as WayId, seen);
                progress.update(done.fetch_add(1, Ordering::Relaxed) + 1);
                flag
            })
            .collect();

        for (w, &big) in flagged.iter().enumerate() {
            if big {
                self.routing.way_properties[w].set_big_street(true);
            }
        }
    }
}

/// Whether `way` touches an originally big street, probing at most two
/// bounded scan rounds from the same starting way. The second round walks
/// the same frontier again (never the newly discovered neighbors), so the
/// classification cannot cascade: a way only reachable through non-big
/// intermediaries stays unflagged.
fn near_big_street(
    r: &Routing,
    original: &[bool],
    way: WayId,
    seen: &mut FxHashSet<WayId>,
) -> bool {
    seen.clear();
    seen.insert(way);
    for _round in 0..2 {
        for &vertex in r.way_vertices.bucket(way as usize) {
            for &other in r.vertex_ways.bucket(vertex as usize) {
                if !seen.insert(other) {
                    continue;
                }
                if original[other as usize] {
                    return true;
                }
            }
        }
    }
    false
}
