use std::collections::BTreeMap;

use crate::graph::{Edge, Extent, Graph, Node, Point};

/// A chain of original nodes laid out as one composite box, members side by side in
/// index order.
#[derive(Clone, Debug, PartialEq)]
pub struct Group {
    pub members: Vec<usize>,
    /// Member centre relative to the composite centre.
    pub offsets: Vec<Point>,
    pub extent: Extent,
}

/// The result of collapsing linear chains: the smaller graph to lay out plus what is
/// needed to expand its positions back onto the original nodes.
#[derive(Clone, Debug)]
pub struct Grouping {
    pub groups: Vec<Group>,
    pub graph: Graph,
    node_count: usize,
}

/// Finds chains of nodes where each link is the only higher neighbour of one node and
/// the only lower neighbour of the next. Every node lands in exactly one group and
/// groups are ordered by their first member.
pub fn linear_chains(neighbors: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let mut membership: Vec<Option<usize>> = vec![None; neighbors.len()];
    let mut groups: Vec<Vec<usize>> = Vec::new();

    for index in 0..neighbors.len() {
        let group = match membership[index] {
            Some(group) => group,
            None => {
                groups.push(vec![index]);
                membership[index] = Some(groups.len() - 1);
                groups.len() - 1
            }
        };

        let mut higher = neighbors[index].iter().copied().filter(|&other| other > index);
        let (Some(next), None) = (higher.next(), higher.next()) else {
            continue;
        };
        let next_lower = neighbors[next].iter().filter(|&&other| other < next).count();
        if next_lower == 1 && membership[next].is_none() {
            groups[group].push(next);
            membership[next] = Some(group);
        }
    }

    groups
}

impl Grouping {
    /// Collapses `graph` (already validated) whose nodes sit at `positions`.
    pub fn collapse(graph: &Graph, positions: &[Point], spacing: f64) -> Self {
        let chains = linear_chains(&graph.neighbors());
        let mut group_of = vec![0usize; graph.node_count()];
        for (group, members) in chains.iter().enumerate() {
            for &member in members {
                group_of[member] = group;
            }
        }

        let mut groups = Vec::with_capacity(chains.len());
        let mut nodes = Vec::with_capacity(chains.len());
        for members in chains {
            let (group, position) = build_group(graph, positions, members, spacing);
            let mass = match group.members.as_slice() {
                [single] => graph.nodes[*single].mass,
                _ => None,
            };
            nodes.push(Node {
                mass,
                position: Some(position),
                extent: Some(group.extent),
            });
            groups.push(group);
        }

        // Composite edges keep the weight of what they replace. Two distinct chains
        // are joined by at most one original edge (last of one, first of the other).
        let mut weights: BTreeMap<(usize, usize), f64> = BTreeMap::new();
        for edge in &graph.edges {
            let a = group_of[edge.node1];
            let b = group_of[edge.node2];
            if a != b {
                *weights.entry((a.min(b), a.max(b))).or_insert(0.0) += edge.weight;
            }
        }
        let edges = weights
            .into_iter()
            .map(|((node1, node2), weight)| Edge::new(node1, node2, weight))
            .collect();

        Self {
            groups,
            graph: Graph { nodes, edges },
            node_count: graph.node_count(),
        }
    }

    pub fn initial_positions(&self) -> Vec<Point> {
        self.graph
            .nodes
            .iter()
            .map(|node| node.position.unwrap_or_default())
            .collect()
    }

    /// Places every original node at its composite's position plus its fixed offset.
    pub fn expand(&self, composite: &[Point]) -> Vec<Point> {
        let mut positions = vec![Point::default(); self.node_count];
        for (group, center) in self.groups.iter().zip(composite) {
            for (&member, offset) in group.members.iter().zip(&group.offsets) {
                positions[member] = Point::new(center.x + offset.x, center.y + offset.y);
            }
        }
        positions
    }

    pub fn first_member(&self, group: usize) -> usize {
        self.groups
            .get(group)
            .and_then(|group| group.members.first().copied())
            .unwrap_or(group)
    }
}

fn build_group(
    graph: &Graph,
    positions: &[Point],
    members: Vec<usize>,
    spacing: f64,
) -> (Group, Point) {
    let extent_of = |index: usize| graph.nodes[index].extent.unwrap_or_default();

    let mut width = -spacing;
    let mut height = 0.0_f64;
    for &member in &members {
        let extent = extent_of(member);
        width += extent.width + spacing;
        height = height.max(extent.height);
    }

    let mut offsets = Vec::with_capacity(members.len());
    let mut offset = -width / 2.0;
    for &member in &members {
        let half = extent_of(member).width / 2.0;
        offset += half;
        offsets.push(Point::new(offset, 0.0));
        offset += half + spacing;
    }

    // Keep the first member where it was; the rest of the chain trails to its right.
    let first = members[0];
    let position = Point::new(positions[first].x - offsets[0].x, positions[first].y);

    let group = Group {
        members,
        offsets,
        extent: Extent::new(width, height),
    };
    (group, position)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_graph(count: usize) -> Graph {
        let mut graph = Graph::with_nodes(count);
        for index in 1..count {
            graph.add_edge(index - 1, index, 1.0);
        }
        graph
    }

    #[test]
    fn plain_chain_collapses_into_one_group() {
        let graph = chain_graph(4);
        assert_eq!(linear_chains(&graph.neighbors()), vec![vec![0, 1, 2, 3]]);
    }

    #[test]
    fn branches_split_chains() {
        // 0-1-2-3 plus 1-4: node 1 has two higher neighbours.
        let mut graph = chain_graph(4);
        graph.nodes.push(Node::default());
        graph.add_edge(1, 4, 2.0);

        assert_eq!(
            linear_chains(&graph.neighbors()),
            vec![vec![0, 1], vec![2, 3], vec![4]]
        );
    }

    #[test]
    fn merges_are_not_chained() {
        // 0-2 and 1-2: node 2 has two lower neighbours.
        let mut graph = Graph::with_nodes(3);
        graph.add_edge(0, 2, 1.0).add_edge(1, 2, 1.0);

        assert_eq!(
            linear_chains(&graph.neighbors()),
            vec![vec![0], vec![1], vec![2]]
        );
    }

    #[test]
    fn isolated_nodes_keep_their_own_group() {
        let graph = Graph::with_nodes(3);
        assert_eq!(
            linear_chains(&graph.neighbors()),
            vec![vec![0], vec![1], vec![2]]
        );
    }

    #[test]
    fn composite_extent_and_offsets() {
        let mut graph = chain_graph(3);
        graph
            .set_extents(&[
                Extent::new(2.0, 1.0),
                Extent::new(4.0, 3.0),
                Extent::new(2.0, 2.0),
            ])
            .unwrap();
        let positions = vec![Point::new(10.0, 5.0); 3];
        let grouping = Grouping::collapse(&graph, &positions, 1.0);

        let group = &grouping.groups[0];
        assert_eq!(group.extent, Extent::new(10.0, 3.0));
        assert_eq!(
            group.offsets,
            vec![
                Point::new(-4.0, 0.0),
                Point::new(0.0, 0.0),
                Point::new(4.0, 0.0)
            ]
        );
        assert_eq!(grouping.initial_positions(), vec![Point::new(14.0, 5.0)]);
        assert!(grouping.graph.edges.is_empty());
    }

    #[test]
    fn expanding_a_fresh_collapse_keeps_laid_out_members() {
        let mut graph = chain_graph(3);
        graph.nodes.push(Node::default());
        graph
            .set_extents(&[
                Extent::new(2.0, 2.0),
                Extent::new(2.0, 2.0),
                Extent::new(6.0, 2.0),
                Extent::new(2.0, 2.0),
            ])
            .unwrap();
        // Already spaced exactly as the chain would place them.
        let positions = vec![
            Point::new(0.0, 3.0),
            Point::new(3.0, 3.0),
            Point::new(8.0, 3.0),
            Point::new(-20.0, 7.0),
        ];

        let grouping = Grouping::collapse(&graph, &positions, 1.0);
        assert_eq!(grouping.groups.len(), 2);
        assert_eq!(grouping.expand(&grouping.initial_positions()), positions);

        let expanded = grouping.expand(&grouping.initial_positions());
        let again = Grouping::collapse(&graph, &expanded, 1.0);
        assert_eq!(again.initial_positions(), grouping.initial_positions());
        assert_eq!(again.groups, grouping.groups);
    }

    #[test]
    fn composite_edges_connect_groups() {
        let mut graph = Graph::with_nodes(4);
        graph
            .add_edge(0, 1, 1.0)
            .add_edge(1, 2, 2.5)
            .add_edge(1, 3, 0.5);
        assert_eq!(
            linear_chains(&graph.neighbors()),
            vec![vec![0, 1], vec![2], vec![3]]
        );

        let grouping = Grouping::collapse(&graph, &[Point::default(); 4], 0.0);
        assert_eq!(
            grouping.graph.edges,
            vec![Edge::new(0, 1, 2.5), Edge::new(0, 2, 0.5)]
        );
        assert_eq!(grouping.graph.masses(), vec![3.0, 2.0, 2.0]);
        assert_eq!(grouping.first_member(2), 3);
    }
}
