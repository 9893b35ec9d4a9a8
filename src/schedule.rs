use std::f64::consts::E;

use serde::{Deserialize, Serialize};

/// The kernels whose strength can be shaped over the course of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kernel {
    Repulsion,
    Overlap,
    Gravity,
    Attraction,
    AxisOrdering,
}

impl Kernel {
    pub const ALL: [Self; 5] = [
        Self::Repulsion,
        Self::Overlap,
        Self::Gravity,
        Self::Attraction,
        Self::AxisOrdering,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Repulsion => "repulsion",
            Self::Overlap => "overlap",
            Self::Gravity => "gravity",
            Self::Attraction => "attraction",
            Self::AxisOrdering => "axis-ordering",
        }
    }

    fn slot(self) -> usize {
        match self {
            Self::Repulsion => 0,
            Self::Overlap => 1,
            Self::Gravity => 2,
            Self::Attraction => 3,
            Self::AxisOrdering => 4,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    #[serde(alias = "off", alias = "never", alias = "none", alias = "zero")]
    Disabled,
    #[default]
    #[serde(alias = "on", alias = "always", alias = "enabled")]
    Constant,
    #[serde(alias = "increase", alias = "inc", alias = "up")]
    Increasing,
    #[serde(alias = "decrease", alias = "dec", alias = "down")]
    Decreasing,
    #[serde(alias = "middle", alias = "mid", alias = "mirrored")]
    Midway,
    #[serde(alias = "outside", alias = "antimirror")]
    Outsides,
}

/// Half-open iteration range `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationRange {
    pub start: usize,
    pub end: usize,
}

impl IterationRange {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn is_empty(self) -> bool {
        self.end <= self.start
    }

    pub fn contains(self, iteration: usize) -> bool {
        iteration >= self.start && iteration < self.end
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleRule {
    pub strength: f64,
    /// `None` means the whole run.
    pub within: Option<IterationRange>,
    pub importance: Importance,
    /// 0 is linear; larger values bend the ramp harder, negative values bend it the
    /// other way.
    pub sharpness: f64,
}

impl Default for ScheduleRule {
    fn default() -> Self {
        Self::constant(1.0)
    }
}

impl ScheduleRule {
    pub const fn constant(strength: f64) -> Self {
        Self {
            strength,
            within: None,
            importance: Importance::Constant,
            sharpness: 0.0,
        }
    }

    pub const fn disabled() -> Self {
        Self {
            strength: 0.0,
            within: None,
            importance: Importance::Disabled,
            sharpness: 0.0,
        }
    }

    pub const fn shaped(strength: f64, importance: Importance, sharpness: f64) -> Self {
        Self {
            strength,
            within: None,
            importance,
            sharpness,
        }
    }

    pub const fn within(mut self, range: IterationRange) -> Self {
        self.within = Some(range);
        self
    }

    /// Coefficient multiplier for `iteration` of a run that lasts `iterations` steps.
    pub fn multiplier(&self, iteration: usize, iterations: usize) -> f64 {
        let range = self.window(iterations);
        if range.is_empty() || !range.contains(iteration) {
            return 0.0;
        }

        let last = range.end - 1;
        let progress = (last > range.start)
            .then(|| (iteration - range.start) as f64 / (last - range.start) as f64);

        match (self.importance, progress) {
            (Importance::Disabled, _) => 0.0,
            (Importance::Constant, _) | (_, None) => self.strength,
            (Importance::Increasing, Some(x)) => self.strength * curve(x, self.sharpness),
            (Importance::Decreasing, Some(x)) => self.strength * curve(1.0 - x, self.sharpness),
            (Importance::Midway, Some(x)) => {
                self.strength * curve(x.min(1.0 - x) * 2.0, self.sharpness)
            }
            (Importance::Outsides, Some(x)) => {
                self.strength * curve((x - 0.5).max(0.5 - x) * 2.0, self.sharpness)
            }
        }
    }

    /// Whether the rule can produce a positive multiplier at some point of the run.
    pub fn may_contribute(&self, iterations: usize) -> bool {
        let range = self.window(iterations);
        self.importance != Importance::Disabled
            && self.strength > 0.0
            && !range.is_empty()
            && range.start < iterations
    }

    fn window(&self, iterations: usize) -> IterationRange {
        self.within.unwrap_or(IterationRange::new(0, iterations))
    }
}

/// Exponential ramp through (0, 0) and (1, 1).
pub fn curve(x: f64, sharpness: f64) -> f64 {
    if sharpness == 0.0 {
        return x;
    }
    ((sharpness * x).exp() / E - 1.0 / E) / (sharpness.exp() / E - 1.0 / E)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schedules {
    pub repulsion: ScheduleRule,
    pub overlap: ScheduleRule,
    pub gravity: ScheduleRule,
    pub attraction: ScheduleRule,
    pub axis_ordering: ScheduleRule,
}

impl Schedules {
    pub fn rule(&self, kernel: Kernel) -> &ScheduleRule {
        match kernel {
            Kernel::Repulsion => &self.repulsion,
            Kernel::Overlap => &self.overlap,
            Kernel::Gravity => &self.gravity,
            Kernel::Attraction => &self.attraction,
            Kernel::AxisOrdering => &self.axis_ordering,
        }
    }

    pub fn rule_mut(&mut self, kernel: Kernel) -> &mut ScheduleRule {
        match kernel {
            Kernel::Repulsion => &mut self.repulsion,
            Kernel::Overlap => &mut self.overlap,
            Kernel::Gravity => &mut self.gravity,
            Kernel::Attraction => &mut self.attraction,
            Kernel::AxisOrdering => &mut self.axis_ordering,
        }
    }
}

/// Per-run cache of kernel multipliers. Only the iteration being run is held, so the
/// cost does not depend on the iteration count.
pub struct ScheduleTable {
    schedules: Schedules,
    iterations: usize,
    current: Option<usize>,
    values: [f64; Kernel::ALL.len()],
}

impl ScheduleTable {
    pub fn new(schedules: &Schedules, iterations: usize) -> Self {
        Self {
            schedules: *schedules,
            iterations,
            current: None,
            values: [0.0; Kernel::ALL.len()],
        }
    }

    pub fn get(&mut self, kernel: Kernel, iteration: usize) -> f64 {
        if iteration >= self.iterations {
            return 0.0;
        }
        if self.current != Some(iteration) {
            for kernel in Kernel::ALL {
                self.values[kernel.slot()] =
                    self.schedules.rule(kernel).multiplier(iteration, self.iterations);
            }
            self.current = Some(iteration);
        }
        self.values[kernel.slot()]
    }

    pub fn may_contribute(&self, kernel: Kernel) -> bool {
        self.schedules.rule(kernel).may_contribute(self.iterations)
    }
}
