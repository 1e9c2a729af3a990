//! CLI commands for waygraph.
//!
//! `build` stands in for the external OSM parser: it reads a JSON fixture of
//! raw ways and restriction triples, runs the pipeline phases in order, and
//! writes the graph directory. `inspect` reopens a built graph read-only.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::time::Instant;
use tracing::warn;

use crate::geo::{haversine_distance, Point};
use crate::graph::{
    OsmNodeId, OsmWayId, ResolvedRestriction, RestrictionKind, WayGraph, WayId, WayProperties,
    INVALID_COMPONENT,
};
use crate::progress::ProgressObserver;

#[derive(Parser)]
#[command(name = "waygraph")]
#[command(about = "Compact road-network graph construction from raw OSM ways", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a graph directory from a JSON way fixture
    Build {
        /// Input fixture (ways + restriction triples)
        #[arg(short, long)]
        input: PathBuf,

        /// Output graph directory
        #[arg(short, long)]
        outdir: PathBuf,
    },
    /// Print summary statistics for a built graph
    Inspect {
        /// Graph directory
        graph: PathBuf,
    },
}

#[derive(Debug, Deserialize)]
pub struct Fixture {
    pub ways: Vec<FixtureWay>,
    #[serde(default)]
    pub restrictions: Vec<FixtureRestriction>,
}

#[derive(Debug, Deserialize)]
pub struct FixtureWay {
    pub id: OsmWayId,
    pub nodes: Vec<OsmNodeId>,
    pub polyline: Vec<Point>,
    #[serde(default)]
    pub big_street: bool,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub access_restriction: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FixtureRestriction {
    /// Raw id of the via node.
    pub via: OsmNodeId,
    /// Raw id of the from way.
    pub from: OsmWayId,
    /// Raw id of the to way.
    pub to: OsmWayId,
    pub kind: FixtureRestrictionKind,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixtureRestrictionKind {
    Forbidden,
    Exclusive,
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Build { input, outdir } => run_build(&input, &outdir),
        Commands::Inspect { graph } => run_inspect(&graph),
    }
}

fn run_build(input: &PathBuf, outdir: &PathBuf) -> Result<()> {
    let start = Instant::now();
    println!("Building road graph");
    println!("  fixture: {}", input.display());
    println!("  output:  {}", outdir.display());

    let file =
        File::open(input).with_context(|| format!("Failed to open {}", input.display()))?;
    let fixture: Fixture = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse {}", input.display()))?;

    let mut graph = WayGraph::create(outdir)?;
    let mut way_ids: FxHashMap<OsmWayId, WayId> = FxHashMap::default();
    for way in &fixture.ways {
        let mut properties = WayProperties::default();
        properties.set_big_street(way.big_street);
        let id = graph.add_way(
            way.id,
            &way.nodes,
            &way.polyline,
            properties,
            way.name.as_deref(),
            way.access_restriction.as_deref(),
        )?;
        way_ids.insert(way.id, id);
    }
    println!("  ✓ Staged {} raw ways", fixture.ways.len());

    let progress = BarProgress::new();
    graph.connect_ways(haversine_distance, &progress)?;
    graph.build_components(&progress);
    graph.propagate_big_streets(&progress);
    progress.finish();
    println!(
        "  ✓ Connected {} vertices over {} ways",
        graph.n_vertices(),
        graph.n_ways()
    );

    let resolved = resolve_restrictions(&graph, &way_ids, &fixture.restrictions);
    let n_resolved = resolved.len();
    graph.add_restrictions(resolved);
    println!(
        "  ✓ Compiled {}/{} restrictions",
        n_resolved,
        fixture.restrictions.len()
    );

    graph.check_consistency()?;
    graph.sync()?;
    graph.write_routing()?;
    println!("  ✓ Wrote {}", outdir.join("routing.bin").display());
    println!("✅ Build complete in {:.2}s", start.elapsed().as_secs_f64());
    Ok(())
}

/// Map raw restriction triples onto graph ids. Triples whose via node never
/// became a vertex (or whose ways are unknown) are dropped with a warning;
/// the compiler itself guards against non-incident ways.
fn resolve_restrictions(
    graph: &WayGraph,
    way_ids: &FxHashMap<OsmWayId, WayId>,
    raw: &[FixtureRestriction],
) -> Vec<ResolvedRestriction> {
    let mut resolved = Vec::with_capacity(raw.len());
    for r in raw {
        let Some(via) = graph.find_vertex(r.via) else {
            warn!(via = r.via, "restriction via node is not a graph vertex, dropped");
            continue;
        };
        let (Some(&from), Some(&to)) = (way_ids.get(&r.from), way_ids.get(&r.to)) else {
            warn!(from = r.from, to = r.to, "restriction references unknown way, dropped");
            continue;
        };
        resolved.push(ResolvedRestriction {
            via,
            from,
            to,
            kind: match r.kind {
                FixtureRestrictionKind::Forbidden => RestrictionKind::Forbidden,
                FixtureRestrictionKind::Exclusive => RestrictionKind::Exclusive,
            },
        });
    }
    resolved
}

fn run_inspect(dir: &PathBuf) -> Result<()> {
    let graph = WayGraph::open(dir)?;
    let routing = graph.routing();

    let n_components = routing
        .way_component
        .iter()
        .filter(|&&c| c != INVALID_COMPONENT)
        .map(|&c| c + 1)
        .max()
        .unwrap_or(0);
    let n_big = routing
        .way_properties
        .iter()
        .filter(|p| p.is_big_street())
        .count();
    let n_restricted = routing.vertex_is_restricted.count_ones();

    println!("Graph {}", dir.display());
    println!("  vertices:            {}", graph.n_vertices());
    println!("  ways:                {}", graph.n_ways());
    println!("  components:          {n_components}");
    println!("  big streets:         {n_big}");
    println!("  restricted vertices: {n_restricted}");
    Ok(())
}

/// Progress bar bridge for the build phases.
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")
                .expect("Failed to create progress style")
                .progress_chars("#>-"),
        );
        Self { bar }
    }
}

impl ProgressObserver for BarProgress {
    fn begin(&self, phase: &str, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
        self.bar.set_message(phase.to_string());
    }

    fn update(&self, done: u64) {
        self.bar.set_position(done);
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FIXTURE: &str = r#"{
        "ways": [
            {
                "id": 101,
                "nodes": [1, 2, 3],
                "polyline": [
                    {"lat": 50.000, "lon": 8.000},
                    {"lat": 50.001, "lon": 8.000},
                    {"lat": 50.002, "lon": 8.000}
                ],
                "big_street": true,
                "name": "Main Street"
            },
            {
                "id": 102,
                "nodes": [3, 4],
                "polyline": [
                    {"lat": 50.002, "lon": 8.000},
                    {"lat": 50.002, "lon": 8.001}
                ],
                "access_restriction": "no @ (22:00-06:00)"
            },
            {
                "id": 103,
                "nodes": [3, 5],
                "polyline": [
                    {"lat": 50.002, "lon": 8.000},
                    {"lat": 50.003, "lon": 8.001}
                ]
            }
        ],
        "restrictions": [
            {"via": 3, "from": 101, "to": 102, "kind": "forbidden"}
        ]
    }"#;

    #[test]
    fn test_fixture_parses() {
        let fixture: Fixture = serde_json::from_str(FIXTURE).unwrap();
        assert_eq!(fixture.ways.len(), 3);
        assert!(fixture.ways[0].big_street);
        assert_eq!(fixture.ways[0].name.as_deref(), Some("Main Street"));
        assert_eq!(fixture.restrictions.len(), 1);
    }

    #[test]
    fn test_build_from_fixture() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("fixture.json");
        std::fs::write(&input, FIXTURE).unwrap();
        let outdir = dir.path().join("graph");

        run_build(&input, &outdir).unwrap();

        let graph = WayGraph::open(&outdir).unwrap();
        // Node 3 is the only shared node.
        assert_eq!(graph.n_vertices(), 1);
        assert_eq!(graph.n_ways(), 3);
        assert_eq!(graph.way_name(0), Some("Main Street"));
        assert!(graph.is_big_street(0));
        // Ways 102/103 touch the big street directly.
        assert!(graph.is_big_street(1));
        assert!(graph.is_big_street(2));
        assert_eq!(graph.access_restriction(1).unwrap(), Some("no @ (22:00-06:00)"));

        // The forbidden turn 101 -> 102 at node 3 is compiled.
        let via = graph.find_vertex(3).unwrap();
        assert!(graph.is_restricted(via));
        assert!(graph.is_turn_forbidden(via, 0, 1));
        assert!(!graph.is_turn_forbidden(via, 0, 2));

        run_inspect(&outdir).unwrap();
    }
}
