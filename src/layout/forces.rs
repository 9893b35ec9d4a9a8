use super::Body;
use crate::graph::Edge;

/// Spacing parameters shared by the overlap and side-aware kernels.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Spacing {
    pub(crate) horizontal: f64,
    pub(crate) vertical: f64,
    pub(crate) buffer_zone: f64,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct AttractionParams {
    pub(crate) distributed: bool,
    pub(crate) coefficient: f64,
    pub(crate) weight_influence: f64,
}

impl AttractionParams {
    fn edge_factor(self, weight: f64, puller: &Body) -> f64 {
        let weight = weighted(weight, self.weight_influence);
        if self.distributed {
            -self.coefficient * weight / puller.mass
        } else {
            -self.coefficient * weight
        }
    }
}

fn weighted(weight: f64, influence: f64) -> f64 {
    if influence == 0.0 {
        1.0
    } else if influence == 1.0 {
        weight
    } else {
        weight.powf(influence)
    }
}

fn sign(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

fn sigmoid(value: f64) -> f64 {
    1.0 / (1.0 + (-value).exp())
}

fn pair_mut(bodies: &mut [Body], a: usize, b: usize) -> (&mut Body, &mut Body) {
    debug_assert_ne!(a, b);
    if a < b {
        let (head, tail) = bodies.split_at_mut(b);
        (&mut head[a], &mut tail[0])
    } else {
        let (head, tail) = bodies.split_at_mut(a);
        (&mut tail[0], &mut head[b])
    }
}

/// Force `other` exerts on `body`: `coefficient * m1 * m2 / d²` along the separation.
pub(crate) fn repulse_one_sided(body: &Body, other: &Body, coefficient: f64) -> (f64, f64) {
    let dx = body.x - other.x;
    let dy = body.y - other.y;
    let distance_sq = dx * dx + dy * dy;
    if distance_sq > 0.0 {
        let factor = coefficient * body.mass * other.mass / distance_sq;
        (dx * factor, dy * factor)
    } else {
        (0.0, 0.0)
    }
}

pub(crate) fn repulse_pair(a: &mut Body, b: &mut Body, coefficient: f64) {
    let (fx, fy) = repulse_one_sided(a, b, coefficient);
    a.dx += fx;
    a.dy += fy;
    b.dx -= fx;
    b.dy -= fy;
}

/// Exact O(n²) repulsion over all unordered pairs.
pub(crate) fn apply_repulsion(bodies: &mut [Body], coefficient: f64) {
    for i in 0..bodies.len() {
        let (head, tail) = bodies.split_at_mut(i + 1);
        let a = &mut head[i];
        for b in tail {
            repulse_pair(a, b, coefficient);
        }
    }
}

pub(crate) fn overlap_pair(a: &mut Body, b: &mut Body, coefficient: f64, spacing: Spacing) {
    let x_dist = a.x - b.x;
    let min_x = spacing.horizontal + spacing.buffer_zone + a.width / 2.0 + b.width / 2.0;
    if x_dist.abs() > min_x {
        return;
    }

    let y_dist = a.y - b.y;
    let min_y = spacing.vertical + spacing.buffer_zone + a.height / 2.0 + b.height / 2.0;
    if y_dist.abs() > min_y {
        return;
    }

    let push_x = sign(x_dist) * min_x - x_dist;
    let push_y = sign(y_dist) * min_y - y_dist;

    let mut factor = coefficient * a.mass * b.mass;
    if spacing.buffer_zone > 0.0 {
        factor *= sigmoid(push_x.min(push_y) / spacing.buffer_zone / 6.0 + 1.0);
    }

    let fx = sign(push_x) * push_y.abs() * factor;
    let fy = sign(push_y) * push_x.abs() * factor;
    a.dx += fx;
    b.dx -= fx;
    a.dy += fy;
    b.dy -= fy;
}

pub(crate) fn apply_overlap_repulsion(bodies: &mut [Body], coefficient: f64, spacing: Spacing) {
    let max_width = bodies.iter().map(|body| body.width).fold(0.0, f64::max);
    let max_height = bodies.iter().map(|body| body.height).fold(0.0, f64::max);
    let reach_x = max_width + spacing.horizontal + spacing.buffer_zone;
    let reach_y = max_height + spacing.vertical + spacing.buffer_zone;

    for i in 0..bodies.len() {
        let (head, tail) = bodies.split_at_mut(i + 1);
        let a = &mut head[i];
        for b in tail {
            if (a.x - b.x).abs() < reach_x && (a.y - b.y).abs() < reach_y {
                overlap_pair(a, b, coefficient, spacing);
            }
        }
    }
}

pub(crate) fn gravity(body: &mut Body, gravity: f64, coefficient: f64) {
    let distance = body.x.hypot(body.y);
    if distance > 0.0 {
        let factor = coefficient * body.mass * gravity / distance;
        body.dx -= body.x * factor;
        body.dy -= body.y * factor;
    }
}

pub(crate) fn strong_gravity(body: &mut Body, gravity: f64, coefficient: f64) {
    let factor = coefficient * body.mass * gravity;
    body.dx -= body.x * factor;
    body.dy -= body.y * factor;
}

pub(crate) fn attract_pair(
    a: &mut Body,
    b: &mut Body,
    factor: f64,
    x_offset: f64,
    only_along_x: bool,
) {
    let x_dist = a.x - b.x - x_offset;
    a.dx += x_dist * factor;
    b.dx -= x_dist * factor;
    if !only_along_x {
        let y_dist = a.y - b.y;
        a.dy += y_dist * factor;
        b.dy -= y_dist * factor;
    }
}

pub(crate) fn apply_attraction(bodies: &mut [Body], edges: &[Edge], params: AttractionParams) {
    for edge in edges {
        let (a, b) = pair_mut(bodies, edge.node1, edge.node2);
        let factor = params.edge_factor(edge.weight, a);
        attract_pair(a, b, factor, 0.0, false);
    }
}

/// Pulls the facing sides of two boxes together instead of their centres. The
/// lower-indexed body is treated as the left one.
pub(crate) fn apply_attraction_to_sides(
    bodies: &mut [Body],
    edges: &[Edge],
    params: AttractionParams,
    horizontal_spacing: f64,
) {
    for edge in edges {
        let (left, right) = ordered_pair(bodies, edge);
        let x_dist = right.x - left.x - horizontal_spacing - left.width / 2.0 - right.width / 2.0;
        let y_dist = right.y - left.y;
        let factor = params.edge_factor(edge.weight, left);
        left.dx -= x_dist * factor;
        left.dy -= y_dist * factor;
        right.dx += x_dist * factor;
        right.dy += y_dist * factor;
    }
}

/// Pushes connected bodies apart along x whenever the lower-indexed one is not
/// sufficiently to the left of the higher-indexed one.
pub(crate) fn apply_axis_ordering(
    bodies: &mut [Body],
    edges: &[Edge],
    params: AttractionParams,
    horizontal_spacing: f64,
) {
    for edge in edges {
        let (left, right) = ordered_pair(bodies, edge);
        let spacing = horizontal_spacing + left.width / 2.0 + right.width / 2.0;
        if left.x + spacing > right.x {
            let factor = params.edge_factor(edge.weight, left);
            attract_pair(left, right, factor, -spacing, true);
        }
    }
}

fn ordered_pair<'a>(bodies: &'a mut [Body], edge: &Edge) -> (&'a mut Body, &'a mut Body) {
    let low = edge.node1.min(edge.node2);
    let high = edge.node1.max(edge.node2);
    pair_mut(bodies, low, high)
}
