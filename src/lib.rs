//! Road-network graph construction from raw OpenStreetMap ways.
//!
//! The pipeline runs as strictly ordered batch phases over a graph directory:
//! populate the raw way store ([`WayGraph::add_way`]), connect ways into a
//! vertex graph ([`WayGraph::connect_ways`]), partition ways into connected
//! components, propagate the big-street classification, and compile turn
//! restrictions. The finished directory is reopened read-only by routing code.

pub mod cli;
pub mod error;
pub mod formats;
pub mod geo;
pub mod graph;
pub mod multiplicity;
pub mod progress;
pub mod store;

pub use error::GraphError;
pub use geo::{haversine_distance, Point};
pub use graph::{
    ComponentId, OsmNodeId, OsmWayId, ResolvedRestriction, Restriction, RestrictionKind, Routing,
    VertexId, WayGraph, WayId, WayPos, WayProperties, INVALID_COMPONENT,
};
pub use progress::{NoProgress, ProgressObserver};
