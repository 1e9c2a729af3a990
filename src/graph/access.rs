//! Conditional-access restriction lookup.

use crate::error::GraphError;

use super::routing::WayId;
use super::WayGraph;

impl WayGraph {
    /// The conditional-access restriction string for `way`, if any.
    ///
    /// The bitset and the sorted side table must agree: a set bit without a
    /// table entry is a construction bug and comes back as
    /// [`GraphError::AccessEntryMissing`], never as `Ok(None)`.
    pub fn access_restriction(&self, way: WayId) -> Result<Option<&str>, GraphError> {
        if !self.access_bits.test(way as u64) {
            return Ok(None);
        }
        let entries = self.access_entries.as_slice();
        let i = entries.partition_point(|e| e.way < way);
        let entry = entries
            .get(i)
            .filter(|e| e.way == way)
            .ok_or(GraphError::AccessEntryMissing {
                osm_way: self.way_to_osm.get(way as usize),
            })?;
        Ok(Some(self.string(entry.string)?))
    }
}

#[cfg(test)]
mod tests {
    use crate::error::GraphError;
    use crate::graph::routing::WayProperties;
    use crate::graph::WayGraph;
    use crate::Point;
    use tempfile::TempDir;

    fn add_way(g: &mut WayGraph, osm_id: i64, nodes: &[i64], access: Option<&str>) {
        let line: Vec<Point> = nodes
            .iter()
            .map(|&n| Point::new(50.0 + n as f64 * 0.001, 8.0))
            .collect();
        g.add_way(osm_id, nodes, &line, WayProperties::default(), None, access)
            .unwrap();
    }

    #[test]
    fn test_access_lookup() {
        let dir = TempDir::new().unwrap();
        let mut g = WayGraph::create(dir.path()).unwrap();
        add_way(&mut g, 1, &[1, 2], None);
        add_way(&mut g, 2, &[2, 3], Some("no @ (Mo-Fr 22:00-06:00)"));
        add_way(&mut g, 3, &[3, 4], None);

        assert_eq!(g.access_restriction(0).unwrap(), None);
        assert_eq!(
            g.access_restriction(1).unwrap(),
            Some("no @ (Mo-Fr 22:00-06:00)")
        );
        assert_eq!(g.access_restriction(2).unwrap(), None);
    }

    #[test]
    fn test_set_bit_without_entry_is_fatal() {
        let dir = TempDir::new().unwrap();
        let mut g = WayGraph::create(dir.path()).unwrap();
        add_way(&mut g, 77, &[1, 2], None);

        // Corrupt the structure: flag the way without a table entry.
        g.access_bits.set(0).unwrap();

        match g.access_restriction(0) {
            Err(GraphError::AccessEntryMissing { osm_way }) => assert_eq!(osm_way, 77),
            other => panic!("expected AccessEntryMissing, got {other:?}"),
        }
    }

    #[test]
    fn test_corrupted_graph_fails_consistency_check() {
        let dir = TempDir::new().unwrap();
        let mut g = WayGraph::create(dir.path()).unwrap();
        add_way(&mut g, 1, &[1, 2], None);
        add_way(&mut g, 2, &[2, 3], None);
        g.connect_ways(crate::geo::haversine_distance, &crate::progress::NoProgress)
            .unwrap();
        g.build_components(&crate::progress::NoProgress);
        g.add_restrictions(Vec::new());
        g.check_consistency().unwrap();

        // The full check also rejects the bitset/table disagreement.
        g.access_bits.set(0).unwrap();
        assert!(matches!(
            g.check_consistency(),
            Err(GraphError::Consistency(_))
        ));
    }
}
