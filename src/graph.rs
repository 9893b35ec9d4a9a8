use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{GraphIssue, LayoutError, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub width: f64,
    pub height: f64,
}

impl Extent {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// A node as handed to the engine. Everything is optional: missing masses default to
/// `1 + degree`, missing positions are placed randomly, missing extents are zero.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Node {
    pub mass: Option<f64>,
    pub position: Option<Point>,
    pub extent: Option<Extent>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub node1: usize,
    pub node2: usize,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl Edge {
    pub const fn new(node1: usize, node2: usize, weight: f64) -> Self {
        Self {
            node1,
            node2,
            weight,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Graph {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn with_nodes(count: usize) -> Self {
        Self {
            nodes: vec![Node::default(); count],
            edges: Vec::new(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn add_edge(&mut self, node1: usize, node2: usize, weight: f64) -> &mut Self {
        self.edges.push(Edge::new(node1, node2, weight));
        self
    }

    pub fn set_positions(&mut self, positions: &[Point]) -> Result<()> {
        check_len("positions", self.nodes.len(), positions.len())?;
        for (node, position) in self.nodes.iter_mut().zip(positions) {
            node.position = Some(*position);
        }
        Ok(())
    }

    pub fn set_extents(&mut self, extents: &[Extent]) -> Result<()> {
        check_len("extents", self.nodes.len(), extents.len())?;
        for (node, extent) in self.nodes.iter_mut().zip(extents) {
            node.extent = Some(*extent);
        }
        Ok(())
    }

    /// Builds a graph from a dense, symmetric weighted adjacency matrix. Diagonal
    /// entries are ignored and every node's mass is `1 + number of neighbours`.
    pub fn from_adjacency(matrix: &[Vec<f64>]) -> Result<Self> {
        let rows = matrix.len();
        for (row, values) in matrix.iter().enumerate() {
            if values.len() != rows {
                return Err(LayoutError::InvalidGraph(GraphIssue::NotSquare {
                    rows,
                    row,
                    len: values.len(),
                }));
            }
        }

        let mut graph = Self::with_nodes(rows);
        for row in 0..rows {
            for column in (row + 1)..rows {
                let weight = matrix[row][column];
                if weight != matrix[column][row] {
                    return Err(LayoutError::InvalidGraph(GraphIssue::Asymmetric {
                        row,
                        column,
                    }));
                }
                if weight != 0.0 {
                    graph.edges.push(Edge::new(row, column, weight));
                }
            }
        }

        let degrees = graph.degrees();
        for (node, degree) in graph.nodes.iter_mut().zip(degrees) {
            node.mass = Some(1.0 + degree as f64);
        }
        Ok(graph)
    }

    pub fn degrees(&self) -> Vec<usize> {
        let mut degrees = vec![0usize; self.nodes.len()];
        for edge in &self.edges {
            if let Some(degree) = degrees.get_mut(edge.node1) {
                *degree += 1;
            }
            if let Some(degree) = degrees.get_mut(edge.node2) {
                *degree += 1;
            }
        }
        degrees
    }

    /// Mass actually used by the engine for each node.
    pub fn masses(&self) -> Vec<f64> {
        self.degrees()
            .into_iter()
            .zip(&self.nodes)
            .map(|(degree, node)| node.mass.unwrap_or(1.0 + degree as f64))
            .collect()
    }

    /// Sorted neighbour lists, built from the validated edge list.
    pub fn neighbors(&self) -> Vec<Vec<usize>> {
        let mut neighbors = vec![Vec::new(); self.nodes.len()];
        for edge in &self.edges {
            neighbors[edge.node1].push(edge.node2);
            neighbors[edge.node2].push(edge.node1);
        }
        for list in &mut neighbors {
            list.sort_unstable();
            list.dedup();
        }
        neighbors
    }

    pub fn validate(&self) -> Result<()> {
        let node_count = self.nodes.len();

        for (index, node) in self.nodes.iter().enumerate() {
            if let Some(mass) = node.mass {
                if !mass.is_finite() || mass < 1.0 {
                    return Err(invalid(GraphIssue::BadMass { node: index, mass }));
                }
            }
            if let Some(extent) = node.extent {
                let valid = extent.width.is_finite()
                    && extent.height.is_finite()
                    && extent.width >= 0.0
                    && extent.height >= 0.0;
                if !valid {
                    return Err(invalid(GraphIssue::BadExtent { node: index }));
                }
            }
            if node.position.is_some_and(|position| !position.is_finite()) {
                return Err(invalid(GraphIssue::BadPosition { node: index }));
            }
        }

        let mut seen = HashSet::with_capacity(self.edges.len());
        for (index, edge) in self.edges.iter().enumerate() {
            for node in [edge.node1, edge.node2] {
                if node >= node_count {
                    return Err(invalid(GraphIssue::EdgeOutOfRange {
                        edge: index,
                        node,
                        node_count,
                    }));
                }
            }
            if edge.node1 == edge.node2 {
                return Err(invalid(GraphIssue::SelfLoop {
                    edge: index,
                    node: edge.node1,
                }));
            }
            if !edge.weight.is_finite() || edge.weight < 0.0 {
                return Err(invalid(GraphIssue::BadWeight {
                    edge: index,
                    weight: edge.weight,
                }));
            }
            let key = (edge.node1.min(edge.node2), edge.node1.max(edge.node2));
            if !seen.insert(key) {
                return Err(invalid(GraphIssue::DuplicateEdge {
                    edge: index,
                    node1: key.0,
                    node2: key.1,
                }));
            }
        }

        Ok(())
    }
}

fn invalid(issue: GraphIssue) -> LayoutError {
    LayoutError::InvalidGraph(issue)
}

fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(invalid(GraphIssue::LengthMismatch {
            what,
            expected,
            actual,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(result: Result<()>) -> GraphIssue {
        match result {
            Err(LayoutError::InvalidGraph(issue)) => issue,
            other => panic!("expected an invalid graph, got {other:?}"),
        }
    }

    #[test]
    fn masses_default_to_one_plus_degree() {
        let mut graph = Graph::with_nodes(3);
        graph.add_edge(0, 1, 1.0).add_edge(1, 2, 3.0);
        graph.nodes[2].mass = Some(7.5);

        assert_eq!(graph.masses(), vec![2.0, 3.0, 7.5]);
    }

    #[test]
    fn rejects_out_of_range_edges() {
        let mut graph = Graph::with_nodes(2);
        graph.add_edge(0, 2, 1.0);

        assert_eq!(
            issue(graph.validate()),
            GraphIssue::EdgeOutOfRange {
                edge: 0,
                node: 2,
                node_count: 2
            }
        );
    }

    #[test]
    fn rejects_self_loops_and_duplicates() {
        let mut graph = Graph::with_nodes(2);
        graph.add_edge(1, 1, 1.0);
        assert!(matches!(
            issue(graph.validate()),
            GraphIssue::SelfLoop { node: 1, .. }
        ));

        let mut graph = Graph::with_nodes(2);
        graph.add_edge(0, 1, 1.0).add_edge(1, 0, 2.0);
        assert!(matches!(
            issue(graph.validate()),
            GraphIssue::DuplicateEdge { edge: 1, .. }
        ));
    }

    #[test]
    fn rejects_masses_below_one() {
        let mut graph = Graph::with_nodes(1);
        graph.nodes[0].mass = Some(-2.0);

        assert!(matches!(
            issue(graph.validate()),
            GraphIssue::BadMass { node: 0, .. }
        ));
    }

    #[test]
    fn adjacency_builds_upper_triangle_edges() {
        let matrix = vec![
            vec![0.0, 2.0, 0.0],
            vec![2.0, 0.0, 1.0],
            vec![0.0, 1.0, 0.0],
        ];
        let graph = Graph::from_adjacency(&matrix).unwrap();

        assert_eq!(
            graph.edges,
            vec![Edge::new(0, 1, 2.0), Edge::new(1, 2, 1.0)]
        );
        assert_eq!(graph.masses(), vec![2.0, 3.0, 2.0]);
        graph.validate().unwrap();
    }

    #[test]
    fn adjacency_must_be_square_and_symmetric() {
        let ragged = vec![vec![0.0, 1.0], vec![1.0]];
        assert!(matches!(
            Graph::from_adjacency(&ragged),
            Err(LayoutError::InvalidGraph(GraphIssue::NotSquare { row: 1, .. }))
        ));

        let directed = vec![vec![0.0, 1.0], vec![0.0, 0.0]];
        assert!(matches!(
            Graph::from_adjacency(&directed),
            Err(LayoutError::InvalidGraph(GraphIssue::Asymmetric { row: 0, column: 1 }))
        ));
    }
}
