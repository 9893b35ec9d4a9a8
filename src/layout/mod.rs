mod forces;
mod region;
mod speed;

use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::LayoutConfig;
use crate::error::{LayoutError, Result};
use crate::graph::{Edge, Graph, Point};
use crate::grouping::Grouping;
use crate::placement::initial_positions;
use crate::schedule::{Kernel, ScheduleRule, ScheduleTable};
use forces::{AttractionParams, Spacing};
use region::Region;
pub use speed::{SpeedState, StepStats};

/// A node while it is being laid out.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Body {
    pub(crate) mass: f64,
    pub(crate) x: f64,
    pub(crate) y: f64,
    pub(crate) dx: f64,
    pub(crate) dy: f64,
    pub(crate) old_dx: f64,
    pub(crate) old_dy: f64,
    pub(crate) width: f64,
    pub(crate) height: f64,
}

impl Body {
    pub(crate) fn new(x: f64, y: f64, mass: f64) -> Self {
        Self {
            mass,
            x,
            y,
            dx: 0.0,
            dy: 0.0,
            old_dx: 0.0,
            old_dy: 0.0,
            width: 0.0,
            height: 0.0,
        }
    }

    fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    fn start_iteration(&mut self) {
        self.old_dx = self.dx;
        self.old_dy = self.dy;
        self.dx = 0.0;
        self.dy = 0.0;
    }
}

/// Read-only view handed to an [`IterationObserver`] after every completed iteration.
pub struct Snapshot<'a> {
    pub iteration: usize,
    pub iterations: usize,
    pub speed: SpeedState,
    pub stats: StepStats,
    bodies: &'a [Body],
    grouping: Option<&'a Grouping>,
}

impl Snapshot<'_> {
    /// Current positions of the original nodes, in input order.
    pub fn positions(&self) -> Vec<Point> {
        let composite = self.bodies.iter().map(Body::position).collect::<Vec<_>>();
        match self.grouping {
            Some(grouping) => grouping.expand(&composite),
            None => composite,
        }
    }

    /// Number of bodies actually simulated (composites when chains are grouped).
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }
}

/// Hooks at iteration boundaries. Returning `Break` from either stops the run with the
/// state reached so far; nothing is ever interrupted mid-iteration.
pub trait IterationObserver {
    /// Called after `snapshot.iteration` completed.
    fn on_iteration(&mut self, snapshot: &Snapshot<'_>) -> ControlFlow<()>;

    /// Called before `iteration` starts, including the first one.
    fn before_iteration(&mut self, _iteration: usize) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

impl IterationObserver for () {
    fn on_iteration(&mut self, _snapshot: &Snapshot<'_>) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

impl<F> IterationObserver for F
where
    F: FnMut(&Snapshot<'_>) -> ControlFlow<()>,
{
    fn on_iteration(&mut self, snapshot: &Snapshot<'_>) -> ControlFlow<()> {
        self(snapshot)
    }
}

/// Cancellation flag that can be shared with another thread. Checked before every
/// iteration, so a flag raised before the run starts leaves the initial placement.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn check(&self) -> ControlFlow<()> {
        if self.is_cancelled() {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }
}

impl IterationObserver for CancelFlag {
    fn on_iteration(&mut self, _snapshot: &Snapshot<'_>) -> ControlFlow<()> {
        self.check()
    }

    fn before_iteration(&mut self, _iteration: usize) -> ControlFlow<()> {
        self.check()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LayoutOutcome {
    pub positions: Vec<Point>,
    pub iterations_run: usize,
    pub cancelled: bool,
}

#[derive(Debug, Default)]
struct KernelTimings {
    tree: Duration,
    repulsion: Duration,
    overlap: Duration,
    gravity: Duration,
    attraction: Duration,
    step: Duration,
}

fn timed<T>(total: &mut Duration, work: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let value = work();
    *total += start.elapsed();
    value
}

#[derive(Clone, Debug, Default)]
pub struct ForceAtlas2 {
    config: LayoutConfig,
}

impl ForceAtlas2 {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Lays out `graph` for `iterations` steps and returns one position per node.
    pub fn layout(&self, graph: &Graph, iterations: usize) -> Result<Vec<Point>> {
        self.layout_with(graph, iterations, &mut ())
            .map(|outcome| outcome.positions)
    }

    pub fn layout_with<O>(
        &self,
        graph: &Graph,
        iterations: usize,
        observer: &mut O,
    ) -> Result<LayoutOutcome>
    where
        O: IterationObserver + ?Sized,
    {
        self.config.validate()?;
        graph.validate()?;

        if graph.node_count() == 0 {
            return Ok(LayoutOutcome {
                positions: Vec::new(),
                iterations_run: 0,
                cancelled: false,
            });
        }

        let positions = initial_positions(graph, self.config.seed, self.config.random_offset);
        let grouping = self.config.group_linear_chains.then(|| {
            Grouping::collapse(graph, &positions, self.config.group_spacing())
        });
        if let Some(grouping) = &grouping {
            info!(
                nodes = graph.node_count(),
                groups = grouping.groups.len(),
                "collapsed linear chains"
            );
        }

        let (working, start) = match &grouping {
            Some(grouping) => (&grouping.graph, grouping.initial_positions()),
            None => (graph, positions),
        };

        let has_extents = working.nodes.iter().any(|node| node.extent.is_some());
        let mut bodies = working
            .masses()
            .into_iter()
            .zip(&working.nodes)
            .zip(start)
            .map(|((mass, node), position)| {
                let mut body = Body::new(position.x, position.y, mass);
                if let Some(extent) = node.extent {
                    body.width = extent.width;
                    body.height = extent.height;
                }
                body
            })
            .collect::<Vec<_>>();

        info!(
            nodes = bodies.len(),
            edges = working.edge_count(),
            iterations,
            barnes_hut = self.config.barnes_hut,
            "starting layout"
        );

        let mut run = Run {
            config: &self.config,
            edges: &working.edges,
            table: ScheduleTable::new(&self.config.schedule, iterations),
            has_extents,
            attraction_compensation: attraction_compensation(&self.config, &bodies),
            speed: SpeedState::default(),
            timings: KernelTimings::default(),
        };

        if !has_extents
            && self.config.schedule.overlap != ScheduleRule::default()
            && run.table.may_contribute(Kernel::Overlap)
        {
            warn!(
                kernel = Kernel::Overlap.label(),
                "kernel is scheduled but no node has an extent; skipping it"
            );
        }

        let mut iterations_run = 0;
        let mut cancelled = false;
        for iteration in 0..iterations {
            if observer.before_iteration(iteration).is_break() {
                cancelled = true;
                break;
            }

            let stats = run.iterate(iteration, &mut bodies);
            iterations_run = iteration + 1;

            if let Some(index) = bodies.iter().position(|body| !body.position().is_finite()) {
                let node = grouping
                    .as_ref()
                    .map_or(index, |grouping| grouping.first_member(index));
                return Err(LayoutError::NumericalDivergence { iteration, node });
            }

            debug!(
                iteration,
                speed = run.speed.speed,
                efficiency = run.speed.efficiency,
                swinging = stats.swinging,
                traction = stats.traction,
                "iteration done"
            );

            let snapshot = Snapshot {
                iteration,
                iterations,
                speed: run.speed,
                stats,
                bodies: &bodies,
                grouping: grouping.as_ref(),
            };
            if observer.on_iteration(&snapshot).is_break() {
                cancelled = true;
                break;
            }
        }

        let timings = &run.timings;
        debug!(
            tree = ?timings.tree,
            repulsion = ?timings.repulsion,
            overlap = ?timings.overlap,
            gravity = ?timings.gravity,
            attraction = ?timings.attraction,
            step = ?timings.step,
            "kernel timings"
        );
        info!(iterations_run, cancelled, "layout finished");

        let composite = bodies.iter().map(Body::position).collect::<Vec<_>>();
        let positions = match &grouping {
            Some(grouping) => grouping.expand(&composite),
            None => composite,
        };

        Ok(LayoutOutcome {
            positions,
            iterations_run,
            cancelled,
        })
    }
}

fn attraction_compensation(config: &LayoutConfig, bodies: &[Body]) -> f64 {
    if config.outbound_attraction_distribution && !bodies.is_empty() {
        bodies.iter().map(|body| body.mass).sum::<f64>() / bodies.len() as f64
    } else {
        1.0
    }
}

struct Run<'a> {
    config: &'a LayoutConfig,
    edges: &'a [Edge],
    table: ScheduleTable,
    has_extents: bool,
    attraction_compensation: f64,
    speed: SpeedState,
    timings: KernelTimings,
}

impl Run<'_> {
    fn iterate(&mut self, iteration: usize, bodies: &mut [Body]) -> StepStats {
        let config = self.config;
        for body in bodies.iter_mut() {
            body.start_iteration();
        }

        let strength = self.table.get(Kernel::Repulsion, iteration);
        if strength > 0.0 {
            let coefficient = config.scaling_ratio * strength;
            if config.barnes_hut {
                let root = timed(&mut self.timings.tree, || Region::build(bodies));
                if let Some(root) = root {
                    timed(&mut self.timings.repulsion, || {
                        root.apply_force_on_bodies(bodies, config.theta, coefficient)
                    });
                }
            } else {
                timed(&mut self.timings.repulsion, || {
                    forces::apply_repulsion(bodies, coefficient)
                });
            }
        }

        let strength = self.table.get(Kernel::Overlap, iteration);
        if self.has_extents && strength > 0.0 {
            let spacing = Spacing {
                horizontal: config.axis_spacing,
                vertical: config.vertical_spacing,
                buffer_zone: config.buffer_zone,
            };
            timed(&mut self.timings.overlap, || {
                forces::apply_overlap_repulsion(bodies, config.scaling_ratio * strength, spacing)
            });
        }

        let strength = self.table.get(Kernel::Gravity, iteration);
        if strength > 0.0 {
            timed(&mut self.timings.gravity, || {
                for body in bodies.iter_mut() {
                    if config.strong_gravity {
                        forces::strong_gravity(body, config.gravity, config.scaling_ratio * strength);
                    } else {
                        forces::gravity(body, config.gravity, strength);
                    }
                }
            });
        }

        let strength = self.table.get(Kernel::Attraction, iteration);
        if strength > 0.0 {
            let params = AttractionParams {
                distributed: config.outbound_attraction_distribution,
                coefficient: self.attraction_compensation * strength,
                weight_influence: config.edge_weight_influence,
            };
            timed(&mut self.timings.attraction, || {
                if config.order_on_axis {
                    forces::apply_attraction_to_sides(bodies, self.edges, params, config.axis_spacing);
                } else {
                    forces::apply_attraction(bodies, self.edges, params);
                }
            });
        }

        let strength = self.table.get(Kernel::AxisOrdering, iteration);
        if config.order_on_axis && strength > 0.0 {
            let params = AttractionParams {
                distributed: config.outbound_attraction_distribution,
                coefficient: strength,
                weight_influence: config.edge_weight_influence,
            };
            timed(&mut self.timings.attraction, || {
                forces::apply_axis_ordering(bodies, self.edges, params, config.axis_spacing)
            });
        }

        timed(&mut self.timings.step, || {
            self.speed.adjust_and_apply(bodies, config.jitter_tolerance)
        })
    }
}
