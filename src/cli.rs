use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use atlas_layout::{Extent, ForceAtlas2, Graph, LayoutConfig, Point, Snapshot};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    /// Graph to lay out as JSON. `-` reads stdin.
    #[arg(long, default_value = "-")]
    pub input: String,

    /// Layout configuration as JSON. Missing fields keep their defaults.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long, default_value_t = 100)]
    pub iterations: usize,

    /// Barnes-Hut opening criterion.
    #[arg(long)]
    pub theta: Option<f64>,

    /// Compute repulsion over all pairs instead of the Barnes-Hut tree.
    #[arg(long)]
    pub exact: bool,

    #[arg(long)]
    pub seed: Option<u64>,

    /// Lay out linear chains as single composite boxes.
    #[arg(long)]
    pub group_chains: bool,

    /// Write positions as JSON lines while the layout runs.
    #[arg(long)]
    pub snapshots: Option<PathBuf>,

    #[arg(long, default_value_t = 10)]
    pub snapshot_every: usize,

    #[arg(long)]
    pub pretty: bool,

    /// Log every iteration.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Accepted input shapes.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum GraphInput {
    Adjacency {
        adjacency: Vec<Vec<f64>>,
        #[serde(default)]
        positions: Option<Vec<Point>>,
        #[serde(default)]
        sizes: Option<Vec<Extent>>,
    },
    Graph(Graph),
}

impl GraphInput {
    pub fn into_graph(self) -> Result<Graph> {
        match self {
            Self::Graph(graph) => Ok(graph),
            Self::Adjacency {
                adjacency,
                positions,
                sizes,
            } => {
                let mut graph = Graph::from_adjacency(&adjacency)?;
                if let Some(positions) = positions {
                    graph.set_positions(&positions)?;
                }
                if let Some(sizes) = sizes {
                    graph.set_extents(&sizes)?;
                }
                Ok(graph)
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LayoutOutput {
    pub positions: Vec<Point>,
    pub iterations: usize,
    pub cancelled: bool,
}

pub fn read_graph(input: &str) -> Result<Graph> {
    let text = if input == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("failed to read graph from stdin")?;
        text
    } else {
        std::fs::read_to_string(input).with_context(|| format!("failed to read graph {input}"))?
    };

    let parsed: GraphInput =
        serde_json::from_str(&text).with_context(|| format!("failed to parse graph {input}"))?;
    parsed
        .into_graph()
        .with_context(|| format!("invalid graph in {input}"))
}

pub fn load_config(args: &Args) -> Result<LayoutConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("failed to parse config {}", path.display()))?
        }
        None => LayoutConfig::default(),
    };

    if let Some(theta) = args.theta {
        config.theta = theta;
    }
    if args.exact {
        config.barnes_hut = false;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if args.group_chains {
        config.group_linear_chains = true;
    }
    if !config.barnes_hut && args.theta.is_some() {
        warn!("--theta has no effect when repulsion is exact");
    }
    Ok(config)
}

/// Writes one JSON array of positions per sampled iteration.
struct SnapshotWriter<W: Write> {
    out: W,
    every: usize,
    error: Option<io::Error>,
}

impl<W: Write> SnapshotWriter<W> {
    fn record(&mut self, snapshot: &Snapshot<'_>) -> ControlFlow<()> {
        let last = snapshot.iteration + 1 == snapshot.iterations;
        if snapshot.iteration % self.every != 0 && !last {
            return ControlFlow::Continue(());
        }

        let written = serde_json::to_writer(&mut self.out, &snapshot.positions())
            .map_err(io::Error::from)
            .and_then(|()| self.out.write_all(b"\n"));
        match written {
            Ok(()) => ControlFlow::Continue(()),
            Err(err) => {
                self.error = Some(err);
                ControlFlow::Break(())
            }
        }
    }
}

fn write_output(output: &LayoutOutput, pretty: bool) -> Result<()> {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    if pretty {
        serde_json::to_writer_pretty(&mut out, output)?;
    } else {
        serde_json::to_writer(&mut out, output)?;
    }
    out.write_all(b"\n")?;
    out.flush().context("failed to write layout")
}

fn open_snapshots(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path)
        .with_context(|| format!("failed to create snapshot file {}", path.display()))?;
    Ok(BufWriter::new(file))
}

pub fn run(args: &Args) -> Result<()> {
    let graph = read_graph(&args.input)?;
    let config = load_config(args)?;
    let engine = ForceAtlas2::new(config);

    let outcome = match &args.snapshots {
        Some(path) => {
            if args.snapshot_every == 0 {
                bail!("--snapshot-every must be at least 1");
            }
            let mut writer = SnapshotWriter {
                out: open_snapshots(path)?,
                every: args.snapshot_every,
                error: None,
            };
            let mut observer = |snapshot: &Snapshot<'_>| writer.record(snapshot);
            let outcome = engine.layout_with(&graph, args.iterations, &mut observer)?;
            if let Some(err) = writer.error {
                return Err(err)
                    .with_context(|| format!("failed to write snapshots to {}", path.display()));
            }
            writer
                .out
                .flush()
                .with_context(|| format!("failed to write snapshots to {}", path.display()))?;
            info!(path = %path.display(), "wrote snapshots");
            outcome
        }
        None => engine.layout_with(&graph, args.iterations, &mut ())?,
    };

    write_output(
        &LayoutOutput {
            positions: outcome.positions,
            iterations: outcome.iterations_run,
            cancelled: outcome.cancelled,
        },
        args.pretty,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_node_and_edge_lists() {
        let input: GraphInput = serde_json::from_str(
            r#"{
                "nodes": [{}, {"mass": 3, "position": {"x": 1, "y": 2}}, {}],
                "edges": [{"node1": 0, "node2": 1}, {"node1": 1, "node2": 2, "weight": 4}]
            }"#,
        )
        .unwrap();
        let graph = input.into_graph().unwrap();

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.nodes[1].mass, Some(3.0));
        assert_eq!(graph.nodes[1].position, Some(Point::new(1.0, 2.0)));
        assert_eq!(graph.edges[0].weight, 1.0);
        assert_eq!(graph.edges[1].weight, 4.0);
    }

    #[test]
    fn parses_adjacency_with_positions_and_sizes() {
        let input: GraphInput = serde_json::from_str(
            r#"{
                "adjacency": [[0, 2], [2, 0]],
                "positions": [{"x": 0, "y": 0}, {"x": 5, "y": 0}],
                "sizes": [{"width": 1, "height": 1}, {"width": 2, "height": 1}]
            }"#,
        )
        .unwrap();
        let graph = input.into_graph().unwrap();

        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].weight, 2.0);
        assert_eq!(graph.masses(), vec![2.0, 2.0]);
        assert_eq!(graph.nodes[1].extent, Some(Extent::new(2.0, 1.0)));
    }

    #[test]
    fn asymmetric_adjacency_is_rejected() {
        let input: GraphInput =
            serde_json::from_str(r#"{"adjacency": [[0, 1], [0, 0]]}"#).unwrap();
        assert!(input.into_graph().is_err());
    }

    #[test]
    fn misspelled_input_keys_are_rejected() {
        let parsed = serde_json::from_str::<GraphInput>(r#"{"adjacncy": [[0, 1], [1, 0]]}"#);
        assert!(parsed.is_err());

        let parsed = serde_json::from_str::<GraphInput>(r#"{"nodes": [{}], "edgs": []}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn flags_override_config() {
        let args = Args::parse_from([
            "atlas-layout",
            "--theta",
            "0.5",
            "--seed",
            "9",
            "--group-chains",
        ]);
        let config = load_config(&args).unwrap();

        assert_eq!(config.theta, 0.5);
        assert_eq!(config.seed, 9);
        assert!(config.group_linear_chains);
        assert!(config.barnes_hut);
    }

    #[test]
    fn snapshots_sample_every_kth_and_last_iteration() {
        let mut graph = Graph::with_nodes(2);
        graph.add_edge(0, 1, 1.0);
        let mut writer = SnapshotWriter {
            out: Vec::new(),
            every: 3,
            error: None,
        };
        let mut observer = |snapshot: &Snapshot<'_>| writer.record(snapshot);
        ForceAtlas2::default()
            .layout_with(&graph, 7, &mut observer)
            .unwrap();

        let text = String::from_utf8(writer.out).unwrap();
        let lines = text.lines().collect::<Vec<_>>();
        // Iterations 0, 3 and 6.
        assert_eq!(lines.len(), 3);
        let first: Vec<Point> = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.len(), 2);
    }
}
