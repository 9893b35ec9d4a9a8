use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::graph::{Graph, Point};

/// Starting positions for every node: given positions are kept, missing ones are drawn
/// uniformly from the unit square, then everything is jittered by up to `random_offset`
/// on each axis.
pub fn initial_positions(graph: &Graph, seed: u64, random_offset: f64) -> Vec<Point> {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut positions = graph
        .nodes
        .iter()
        .map(|node| {
            node.position
                .unwrap_or_else(|| Point::new(rng.random::<f64>(), rng.random::<f64>()))
        })
        .collect::<Vec<_>>();

    if random_offset > 0.0 {
        for position in &mut positions {
            position.x += (rng.random::<f64>() - 0.5) * 2.0 * random_offset;
            position.y += (rng.random::<f64>() - 0.5) * 2.0 * random_offset;
        }
    }

    positions
}
