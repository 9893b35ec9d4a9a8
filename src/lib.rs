//! ForceAtlas2 graph layout with a Barnes-Hut approximation for node repulsion,
//! per-kernel force schedules, and optional collapsing of linear chains into composite
//! boxes.

pub mod config;
pub mod error;
pub mod graph;
pub mod grouping;
pub mod layout;
pub mod placement;
pub mod schedule;

pub use config::LayoutConfig;
pub use error::{GraphIssue, LayoutError, Result};
pub use graph::{Edge, Extent, Graph, Node, Point};
pub use layout::{
    CancelFlag, ForceAtlas2, IterationObserver, LayoutOutcome, Snapshot, SpeedState, StepStats,
};
pub use schedule::{Importance, IterationRange, Kernel, ScheduleRule, Schedules};
