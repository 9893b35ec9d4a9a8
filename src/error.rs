use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("invalid graph: {0}")]
    InvalidGraph(GraphIssue),
    #[error("invalid layout config `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },
    #[error("layout diverged at iteration {iteration}: node {node} has a non-finite position")]
    NumericalDivergence { iteration: usize, node: usize },
}

/// What exactly was wrong with a graph handed to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphIssue {
    EdgeOutOfRange { edge: usize, node: usize, node_count: usize },
    SelfLoop { edge: usize, node: usize },
    DuplicateEdge { edge: usize, node1: usize, node2: usize },
    BadWeight { edge: usize, weight: f64 },
    BadMass { node: usize, mass: f64 },
    BadExtent { node: usize },
    BadPosition { node: usize },
    NotSquare { rows: usize, row: usize, len: usize },
    Asymmetric { row: usize, column: usize },
    LengthMismatch { what: &'static str, expected: usize, actual: usize },
}

impl fmt::Display for GraphIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EdgeOutOfRange {
                edge,
                node,
                node_count,
            } => write!(
                f,
                "edge {edge} references node {node} but the graph has {node_count} nodes"
            ),
            Self::SelfLoop { edge, node } => write!(f, "edge {edge} is a self-loop on node {node}"),
            Self::DuplicateEdge { edge, node1, node2 } => {
                write!(f, "edge {edge} duplicates the pair ({node1}, {node2})")
            }
            Self::BadWeight { edge, weight } => {
                write!(f, "edge {edge} has weight {weight}, expected a finite value >= 0")
            }
            Self::BadMass { node, mass } => {
                write!(f, "node {node} has mass {mass}, expected a finite value >= 1")
            }
            Self::BadExtent { node } => {
                write!(f, "node {node} has a negative or non-finite extent")
            }
            Self::BadPosition { node } => write!(f, "node {node} has a non-finite position"),
            Self::NotSquare { rows, row, len } => write!(
                f,
                "adjacency matrix is not square: row {row} has {len} entries, expected {rows}"
            ),
            Self::Asymmetric { row, column } => write!(
                f,
                "adjacency matrix is not symmetric at ({row}, {column}); only undirected graphs are supported"
            ),
            Self::LengthMismatch {
                what,
                expected,
                actual,
            } => write!(f, "expected {expected} {what}, got {actual}"),
        }
    }
}

pub type Result<T> = std::result::Result<T, LayoutError>;
