use super::Body;

const MIN_SPEED_EFFICIENCY: f64 = 0.05;
const MAX_JITTER_TOLERANCE: f64 = 10.0;
const ERRATIC_RATIO: f64 = 2.0;
const MAX_RISE: f64 = 0.5;
const SPEED_EFFICIENCY_GROWTH_LIMIT: f64 = 1000.0;

/// Global step size carried from one iteration to the next.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpeedState {
    pub speed: f64,
    pub efficiency: f64,
}

impl Default for SpeedState {
    fn default() -> Self {
        Self {
            speed: 1.0,
            efficiency: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StepStats {
    pub swinging: f64,
    pub traction: f64,
    pub jitter_tolerance: f64,
}

fn swing(body: &Body) -> f64 {
    (body.old_dx - body.dx).hypot(body.old_dy - body.dy)
}

fn traction(body: &Body) -> f64 {
    (body.old_dx + body.dx).hypot(body.old_dy + body.dy)
}

impl SpeedState {
    /// Retunes the step size from this iteration's displacements and moves every body.
    pub(crate) fn adjust_and_apply(&mut self, bodies: &mut [Body], jitter_tolerance: f64) -> StepStats {
        if bodies.is_empty() {
            return StepStats::default();
        }

        let mut total_swinging = 0.0;
        let mut total_traction = 0.0;
        for body in bodies.iter() {
            total_swinging += body.mass * swing(body);
            total_traction += 0.5 * body.mass * traction(body);
        }

        // Bigger graphs need more tolerance, denser ones less.
        let count = bodies.len() as f64;
        let estimated = 0.05 * count.sqrt();
        let min_jt = estimated.sqrt();
        let mut jt = jitter_tolerance
            * min_jt.max(MAX_JITTER_TOLERANCE.min(estimated * total_traction / (count * count)));

        if total_traction > 0.0 && total_swinging / total_traction > ERRATIC_RATIO {
            self.efficiency = (self.efficiency * 0.5).max(MIN_SPEED_EFFICIENCY);
            jt = jt.max(jitter_tolerance);
        }

        let target_speed = if total_swinging == 0.0 {
            f64::INFINITY
        } else {
            jt * self.efficiency * total_traction / total_swinging
        };

        if total_swinging > jt * total_traction {
            self.efficiency = (self.efficiency * 0.7).max(MIN_SPEED_EFFICIENCY);
        } else if self.speed < SPEED_EFFICIENCY_GROWTH_LIMIT {
            self.efficiency *= 1.3;
        }

        self.speed += (target_speed - self.speed).min(MAX_RISE * self.speed);

        for body in bodies.iter_mut() {
            let swinging = body.mass * swing(body);
            let factor = self.speed / (1.0 + (self.speed * swinging).sqrt());
            body.x += body.dx * factor;
            body.y += body.dy * factor;
        }

        StepStats {
            swinging: total_swinging,
            traction: total_traction,
            jitter_tolerance: jt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steady_motion_grows_speed_by_capped_rise() {
        let mut bodies = vec![Body::new(0.0, 0.0, 1.0)];
        bodies[0].old_dx = 1.0;
        bodies[0].dx = 1.0;

        let mut state = SpeedState::default();
        let stats = state.adjust_and_apply(&mut bodies, 1.0);

        assert_eq!(stats.swinging, 0.0);
        assert_eq!(stats.traction, 1.0);
        assert_eq!(state.speed, 1.5);
        assert_eq!(state.efficiency, 1.3);
        // No swing, so the whole speed is applied.
        assert_eq!(bodies[0].x, 1.5);
    }

    #[test]
    fn erratic_motion_cuts_efficiency() {
        let mut bodies = vec![Body::new(0.0, 0.0, 1.0), Body::new(5.0, 5.0, 2.0)];
        for body in &mut bodies {
            body.old_dx = 4.0;
            body.dx = -3.0;
        }

        let mut state = SpeedState::default();
        let stats = state.adjust_and_apply(&mut bodies, 1.0);

        assert_eq!(stats.traction, 1.5);
        assert_eq!(stats.swinging, 21.0);
        // Halved for erratic motion, then shrunk again for too much swinging.
        assert!((state.efficiency - 0.35).abs() < 1e-12);
        assert!((state.speed - 1.5 / 42.0).abs() < 1e-12);
        assert!(bodies[0].x < 0.0);
        assert!(bodies[1].x < 5.0);
    }

    #[test]
    fn efficiency_never_drops_below_floor() {
        let mut state = SpeedState::default();
        for _ in 0..100 {
            let mut bodies = vec![Body::new(0.0, 0.0, 1.0), Body::new(1.0, 0.0, 1.0)];
            bodies[0].old_dx = 10.0;
            bodies[0].dx = -9.0;
            bodies[1].old_dy = -3.0;
            bodies[1].dy = 3.5;
            state.adjust_and_apply(&mut bodies, 1.0);
        }
        assert!(state.efficiency >= MIN_SPEED_EFFICIENCY);
        assert!(state.speed.is_finite() && state.speed > 0.0);
    }

    #[test]
    fn heavier_swinging_bodies_move_less() {
        let mut bodies = vec![Body::new(0.0, 0.0, 1.0), Body::new(0.0, 0.0, 9.0)];
        for body in &mut bodies {
            body.old_dx = 1.0;
            body.dx = 2.0;
        }
        let mut state = SpeedState::default();
        state.adjust_and_apply(&mut bodies, 1.0);

        assert!(bodies[0].x > bodies[1].x);
        assert!(bodies[1].x > 0.0);
    }
}
