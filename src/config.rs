use serde::{Deserialize, Serialize};

use crate::error::{LayoutError, Result};
use crate::schedule::Schedules;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    // Behaviour
    /// Divide attraction by the pulling node's mass so hubs are pulled less per edge.
    pub outbound_attraction_distribution: bool,
    pub edge_weight_influence: f64,
    /// Keep connected nodes ordered left to right by index.
    pub order_on_axis: bool,
    pub axis_spacing: f64,
    pub vertical_spacing: f64,
    pub buffer_zone: f64,
    /// Spacing between the members of a grouped chain. Falls back to `axis_spacing`.
    pub within_group_spacing: Option<f64>,
    pub group_linear_chains: bool,

    // Performance
    pub jitter_tolerance: f64,
    pub barnes_hut: bool,
    pub theta: f64,

    // Tuning
    pub scaling_ratio: f64,
    pub strong_gravity: bool,
    pub gravity: f64,
    pub random_offset: f64,
    /// Seed for random initial placement and `random_offset`.
    pub seed: u64,

    pub schedule: Schedules,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            outbound_attraction_distribution: false,
            edge_weight_influence: 1.0,
            order_on_axis: false,
            axis_spacing: 50.0,
            vertical_spacing: 0.0,
            buffer_zone: 50.0,
            within_group_spacing: None,
            group_linear_chains: false,
            jitter_tolerance: 1.0,
            barnes_hut: true,
            theta: 1.2,
            scaling_ratio: 2.0,
            strong_gravity: false,
            gravity: 1.0,
            random_offset: 0.0,
            seed: 0,
            schedule: Schedules::default(),
        }
    }
}

impl LayoutConfig {
    pub fn group_spacing(&self) -> f64 {
        self.within_group_spacing.unwrap_or(self.axis_spacing)
    }

    pub fn validate(&self) -> Result<()> {
        non_negative("theta", self.theta)?;
        non_negative("scaling_ratio", self.scaling_ratio)?;
        non_negative("axis_spacing", self.axis_spacing)?;
        non_negative("vertical_spacing", self.vertical_spacing)?;
        non_negative("buffer_zone", self.buffer_zone)?;
        non_negative("random_offset", self.random_offset)?;
        finite("gravity", self.gravity)?;
        finite("edge_weight_influence", self.edge_weight_influence)?;
        if let Some(spacing) = self.within_group_spacing {
            non_negative("within_group_spacing", spacing)?;
        }
        if !(self.jitter_tolerance.is_finite() && self.jitter_tolerance > 0.0) {
            return Err(LayoutError::InvalidConfig {
                field: "jitter_tolerance",
                reason: format!("expected a finite value > 0, got {}", self.jitter_tolerance),
            });
        }
        Ok(())
    }
}

fn finite(field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(LayoutError::InvalidConfig {
            field,
            reason: format!("expected a finite value, got {value}"),
        })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(LayoutError::InvalidConfig {
            field,
            reason: format!("expected a finite value >= 0, got {value}"),
        })
    }
}
