use super::Body;
use super::forces::repulse_one_sided;

/// Recursion cap for pathological inputs (many members that stay within one quadrant).
const REGION_MAX_DEPTH: usize = 48;

pub(crate) struct Region {
    pub(crate) mass: f64,
    pub(crate) center_x: f64,
    pub(crate) center_y: f64,
    pub(crate) size: f64,
    pub(crate) members: Vec<usize>,
    pub(crate) children: Vec<Region>,
}

impl Region {
    pub(crate) fn build(bodies: &[Body]) -> Option<Self> {
        if bodies.is_empty() {
            return None;
        }
        let members = (0..bodies.len()).collect::<Vec<_>>();
        Some(Self::build_node(members, bodies, 0))
    }

    fn build_node(members: Vec<usize>, bodies: &[Body], depth: usize) -> Self {
        let mut node = Self::with_geometry(members, bodies);
        if node.members.len() < 2 {
            return node;
        }

        if depth >= REGION_MAX_DEPTH {
            node.children = node.singletons(bodies);
            return node;
        }

        // bottom-left, top-left, bottom-right, top-right
        let mut buckets = std::array::from_fn::<_, 4, _>(|_| Vec::new());
        for &index in &node.members {
            let body = &bodies[index];
            let right = body.x >= node.center_x;
            let top = body.y >= node.center_y;
            let quadrant = match (right, top) {
                (false, false) => 0,
                (false, true) => 1,
                (true, false) => 2,
                (true, true) => 3,
            };
            buckets[quadrant].push(index);
        }

        let member_count = node.members.len();
        if buckets.iter().any(|bucket| bucket.len() == member_count) {
            // Every member landed in one quadrant: they share the centroid.
            node.children = node.singletons(bodies);
            return node;
        }

        node.children = buckets
            .into_iter()
            .filter(|bucket| !bucket.is_empty())
            .map(|bucket| Self::build_node(bucket, bodies, depth + 1))
            .collect();
        node
    }

    fn with_geometry(members: Vec<usize>, bodies: &[Body]) -> Self {
        let mut mass = 0.0;
        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        for &index in &members {
            let body = &bodies[index];
            mass += body.mass;
            sum_x += body.x * body.mass;
            sum_y += body.y * body.mass;
        }

        let (center_x, center_y) = if members.len() == 1 {
            let body = &bodies[members[0]];
            (body.x, body.y)
        } else if mass > 0.0 {
            (sum_x / mass, sum_y / mass)
        } else {
            (0.0, 0.0)
        };

        let mut size = 0.0_f64;
        if members.len() > 1 {
            for &index in &members {
                let body = &bodies[index];
                let distance = (body.x - center_x).hypot(body.y - center_y);
                size = size.max(2.0 * distance);
            }
        }

        Self {
            mass,
            center_x,
            center_y,
            size,
            members,
            children: Vec::new(),
        }
    }

    fn singletons(&self, bodies: &[Body]) -> Vec<Self> {
        self.members
            .iter()
            .map(|&index| Self::with_geometry(vec![index], bodies))
            .collect()
    }

    pub(crate) fn is_leaf(&self) -> bool {
        self.members.len() < 2
    }

    /// Accumulates the repulsion this region exerts on `bodies[index]` into `force`.
    /// Only the queried body is affected.
    pub(crate) fn apply_force(
        &self,
        index: usize,
        bodies: &[Body],
        theta: f64,
        coefficient: f64,
        force: &mut (f64, f64),
    ) {
        let body = &bodies[index];

        if self.is_leaf() {
            let Some(&other) = self.members.first() else {
                return;
            };
            if other != index {
                let (fx, fy) = repulse_one_sided(body, &bodies[other], coefficient);
                force.0 += fx;
                force.1 += fy;
            }
            return;
        }

        let distance = (body.x - self.center_x).hypot(body.y - self.center_y);
        if distance * theta > self.size {
            let dx = body.x - self.center_x;
            let dy = body.y - self.center_y;
            let distance_sq = dx * dx + dy * dy;
            if distance_sq > 0.0 {
                let factor = coefficient * body.mass * self.mass / distance_sq;
                force.0 += dx * factor;
                force.1 += dy * factor;
            }
            return;
        }

        for child in &self.children {
            child.apply_force(index, bodies, theta, coefficient, force);
        }
    }

    pub(crate) fn apply_force_on_bodies(&self, bodies: &mut [Body], theta: f64, coefficient: f64) {
        let forces = (0..bodies.len())
            .map(|index| {
                let mut force = (0.0, 0.0);
                self.apply_force(index, bodies, theta, coefficient, &mut force);
                force
            })
            .collect::<Vec<_>>();

        for (body, (fx, fy)) in bodies.iter_mut().zip(forces) {
            body.dx += fx;
            body.dy += fy;
        }
    }

    #[cfg(test)]
    pub(crate) fn depth(&self) -> usize {
        1 + self.children.iter().map(Self::depth).max().unwrap_or(0)
    }

    #[cfg(test)]
    pub(crate) fn leaf_count(&self) -> usize {
        if self.children.is_empty() {
            1
        } else {
            self.children.iter().map(Self::leaf_count).sum()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::forces::apply_repulsion;

    fn body(x: f64, y: f64, mass: f64) -> Body {
        Body::new(x, y, mass)
    }

    fn scattered(count: usize) -> Vec<Body> {
        (0..count)
            .map(|i| {
                let t = i as f64;
                body(
                    (t * 1.618_034).sin() * 40.0 + t * 0.7,
                    (t * 2.414_214).cos() * 35.0 - t * 0.3,
                    1.0 + (i % 4) as f64,
                )
            })
            .collect()
    }

    #[test]
    fn root_aggregates_mass_and_centroid() {
        let bodies = vec![body(0.0, 0.0, 1.0), body(4.0, 0.0, 3.0)];
        let root = Region::build(&bodies).unwrap();

        assert_eq!(root.mass, 4.0);
        assert_eq!(root.center_x, 3.0);
        assert_eq!(root.center_y, 0.0);
        assert_eq!(root.size, 6.0);
        assert_eq!(root.children.len(), 2);
        assert!(root.children.iter().all(|child| child.size == 0.0));
    }

    #[test]
    fn every_member_ends_in_exactly_one_leaf() {
        let bodies = scattered(64);
        let root = Region::build(&bodies).unwrap();

        fn collect(region: &Region, out: &mut Vec<usize>) {
            if region.children.is_empty() {
                out.extend(&region.members);
            }
            for child in &region.children {
                collect(child, out);
            }
        }
        let mut seen = Vec::new();
        collect(&root, &mut seen);
        seen.sort_unstable();
        assert_eq!(seen, (0..64).collect::<Vec<_>>());
    }

    #[test]
    fn coincident_bodies_terminate() {
        let bodies = vec![body(5.0, 5.0, 1.0); 50];
        let root = Region::build(&bodies).unwrap();

        assert_eq!(root.leaf_count(), 50);
        assert_eq!(root.depth(), 2);
        assert_eq!(root.size, 0.0);
    }

    #[test]
    fn nearly_coincident_bodies_stay_bounded() {
        let bodies = (0..200)
            .map(|i| body(1.0 + i as f64 * f64::EPSILON, 1.0, 1.0))
            .collect::<Vec<_>>();
        let root = Region::build(&bodies).unwrap();

        assert!(root.depth() <= REGION_MAX_DEPTH + 2);
        assert_eq!(root.leaf_count(), 200);
    }

    #[test]
    fn zero_theta_matches_direct_repulsion() {
        let mut direct = scattered(40);
        let mut tree = direct.clone();

        apply_repulsion(&mut direct, 2.0);
        let root = Region::build(&tree).unwrap();
        root.apply_force_on_bodies(&mut tree, 0.0, 2.0);

        for (a, b) in direct.iter().zip(&tree) {
            assert!((a.dx - b.dx).abs() <= 1e-9 * a.dx.abs().max(1.0));
            assert!((a.dy - b.dy).abs() <= 1e-9 * a.dy.abs().max(1.0));
        }
    }

    #[test]
    fn approximation_converges_as_theta_shrinks() {
        let mut exact = scattered(80);
        apply_repulsion(&mut exact, 1.0);
        let total = exact.iter().map(|b| b.dx.hypot(b.dy)).sum::<f64>();

        let error_for = |theta: f64| {
            let mut approx = scattered(80);
            let root = Region::build(&approx).unwrap();
            root.apply_force_on_bodies(&mut approx, theta, 1.0);
            exact
                .iter()
                .zip(&approx)
                .map(|(a, b)| (a.dx - b.dx).hypot(a.dy - b.dy))
                .sum::<f64>()
        };

        let coarse = error_for(1.2);
        let fine = error_for(0.1);
        assert!(coarse.is_finite());
        assert!(fine <= coarse);
        assert!(error_for(0.0) <= 1e-6 * total);
    }
}
