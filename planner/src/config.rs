use serde::{Deserialize, Serialize};

use crate::grid::GridSize;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct PlannerConfig {
    pub grid_size: GridSize,
    /// meters
    pub cell_size: f32,
    /// m/s, used when the agent reports no velocity
    pub default_speed: f32,
    /// Abort the search after this many node expansions.
    pub max_expansions: Option<usize>,
    pub risk_weight: f32,
    pub dynamic_penalty: f32,
    /// Half width of the time window reserved around each path node.
    pub reservation_hold_ms: u64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig {
            grid_size: GridSize::new(50, 50, 10),
            cell_size: 10.0,
            default_speed: 10.0,
            max_expansions: None,
            risk_weight: 10.0,
            dynamic_penalty: 50.0,
            reservation_hold_ms: 1500,
        }
    }
}
