pub mod astar;
pub mod config;
pub mod grid;
pub mod reservation;
pub mod risk_map;
pub mod terms;
pub mod waypoints;
pub mod zones;


pub use astar::{PathPlanner, PlanContext};
pub use config::PlannerConfig;
pub use grid::{Cell, Grid, GridSize};
pub use risk_map::RiskMap;

/// Number of moves in a path (one less than its node count).
pub fn path_hops(path: &[skyfleet_structs::path::PathNode]) -> usize {
    path.len().saturating_sub(1)
}
