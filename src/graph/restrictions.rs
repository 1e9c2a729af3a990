//! Restriction compiler: turn resolved via/from/to records into per-vertex
//! forbidden-movement tables in way-position coordinates.

use tracing::warn;

use super::routing::{Restriction, VertexId, WayId, WayPos};
use super::WayGraph;

/// How a resolved restriction constrains movement at its via vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestrictionKind {
    /// The exact from -> to movement is disallowed.
    Forbidden,
    /// From the "from" way, only the named "to" way may be taken.
    Exclusive,
}

/// A restriction whose via node and way references have already been
/// resolved to graph ids by the caller.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedRestriction {
    pub via: VertexId,
    pub from: WayId,
    pub to: WayId,
    pub kind: RestrictionKind,
}

impl WayGraph {
    /// Compile one batch of resolved restrictions into the per-vertex
    /// tables. May be called any number of times, once per restriction
    /// source; records are regrouped by via vertex, so callers must not
    /// rely on input order being preserved.
    ///
    /// Records referencing vertices or ways that are not part of the built
    /// graph are skipped with a diagnostic rather than corrupting the
    /// tables.
    pub fn add_restrictions(&mut self, mut batch: Vec<ResolvedRestriction>) {
        let r = &mut self.routing;
        let n_vertices = r.n_vertices();

        batch.sort_by_key(|x| x.via);
        let mut pairs: Vec<Restriction> = Vec::new();
        for group in batch.chunk_by(|a, b| a.via == b.via) {
            let via = group[0].via;
            if via as usize >= n_vertices {
                warn!(via, "restriction references unknown vertex, skipped");
                continue;
            }

            r.vertex_is_restricted.set(via as usize, true);
            if r.vertex_restrictions.len() <= via as usize {
                r.vertex_restrictions.resize(via as usize + 1);
            }

            pairs.clear();
            for record in group {
                match record.kind {
                    RestrictionKind::Forbidden => {
                        match (r.way_pos(via, record.from), r.way_pos(via, record.to)) {
                            (Some(from), Some(to)) => pairs.push(Restriction { from, to }),
                            _ => warn!(
                                via,
                                from = record.from,
                                to = record.to,
                                "restriction way not incident at via vertex, skipped"
                            ),
                        }
                    }
                    RestrictionKind::Exclusive => {
                        let incident = r.vertex_ways.bucket(via as usize);
                        if !incident.contains(&record.from) || !incident.contains(&record.to) {
                            warn!(
                                via,
                                from = record.from,
                                to = record.to,
                                "exclusive restriction way not incident at via vertex, skipped"
                            );
                            continue;
                        }
                        // "Only the named continuation" compiles to: forbid
                        // every other continuation from every position of
                        // the from way.
                        for (i, &from_way) in incident.iter().enumerate() {
                            if from_way != record.from {
                                continue;
                            }
                            for (j, &to_way) in incident.iter().enumerate() {
                                if j == i || to_way == record.to {
                                    continue;
                                }
                                match (WayPos::try_from(i), WayPos::try_from(j)) {
                                    (Ok(from), Ok(to)) => pairs.push(Restriction { from, to }),
                                    _ => warn!(
                                        via,
                                        "way position beyond the 8-bit range, pair skipped"
                                    ),
                                }
                            }
                        }
                    }
                }
            }
            for &pair in &pairs {
                r.vertex_restrictions.push_at(via as usize, pair);
            }
        }

        // Vertices with no restrictions keep an empty, not missing, entry.
        r.vertex_restrictions.resize(n_vertices);
    }
}
