pub mod assign;
pub mod config;
pub mod conflict;
pub mod coordinator;
pub mod executive;

#[cfg(test)]
mod executive_tests;

pub use assign::{CapabilitySynergy, CollaborationModel, ConstantSynergy, TaskAssigner};
pub use config::{AssignerConfig, CoordinatorConfig, StarvationPolicy, UtilityWeights};
pub use conflict::{ConflictResolver, NeverConflicts, PathConflictPredicate, ProjectedPathOverlap};
pub use coordinator::{Coordinator, FleetSnapshot, FleetStatus, COORDINATOR_ID};
pub use executive::Executive;
