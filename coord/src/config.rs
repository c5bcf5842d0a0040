use serde::{Deserialize, Serialize};
use skyfleet_planner::PlannerConfig;
use skyfleet_risk::RiskConfig;
use skyfleet_structs::{FleetError, Result};

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct UtilityWeights {
    pub distance: f32,
    pub battery: f32,
    pub collaboration: f32,
}

impl Default for UtilityWeights {
    fn default() -> Self {
        UtilityWeights { distance: 0.4, battery: 0.3, collaboration: 0.3 }
    }
}

/// Priority aging for tasks left pending.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct StarvationPolicy {
    pub boost_per_tick: f32,
    pub max_boost: f32,
}

impl Default for StarvationPolicy {
    fn default() -> Self {
        StarvationPolicy { boost_per_tick: 0.1, max_boost: 2.0 }
    }
}

impl StarvationPolicy {
    /// No aging at all: pending tasks keep their base priority forever.
    pub fn disabled() -> Self {
        StarvationPolicy { boost_per_tick: 0.0, max_boost: 0.0 }
    }

    pub fn boost(&self, ticks_waiting: u32) -> f32 {
        (ticks_waiting as f32 * self.boost_per_tick).min(self.max_boost)
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct AssignerConfig {
    /// percent
    pub min_battery: f32,
    pub weights: UtilityWeights,
    /// Distance at which the distance factor has dropped to one half.
    pub distance_scale: f32,
    pub starvation: StarvationPolicy,
}

impl Default for AssignerConfig {
    fn default() -> Self {
        AssignerConfig {
            min_battery: 30.0,
            weights: Default::default(),
            distance_scale: 100.0,
            starvation: Default::default(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct CoordinatorConfig {
    pub safety_radius: f32,
    pub recent_conflict_window_ms: u64,
    /// Agents this close to a task location count as on site.
    pub arrival_radius: f32,
    /// Battery percentage at or below which an agent declares an emergency.
    pub critical_battery: f32,
    /// Largest per-tick shift of a dynamic no-fly zone centre.
    pub dynamic_zone_drift: f32,
    pub forecast_horizon_secs: f32,
    /// How far ahead agents without a route are extrapolated for path conflicts.
    pub projection_horizon_ms: u64,
    pub seed: u64,
    pub planner: PlannerConfig,
    pub assigner: AssignerConfig,
    pub risk: RiskConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        CoordinatorConfig {
            safety_radius: 5.0,
            recent_conflict_window_ms: 60_000,
            arrival_radius: 10.0,
            critical_battery: 10.0,
            dynamic_zone_drift: 2.0,
            forecast_horizon_secs: 300.0,
            projection_horizon_ms: 10_000,
            seed: 0,
            planner: Default::default(),
            assigner: Default::default(),
            risk: Default::default(),
        }
    }
}

impl CoordinatorConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.safety_radius > 0.0 && self.safety_radius.is_finite()) {
            return Err(FleetError::config(format!("safety radius must be positive, got {}", self.safety_radius)));
        }
        if !(self.arrival_radius > 0.0 && self.arrival_radius.is_finite()) {
            return Err(FleetError::config(format!("arrival radius must be positive, got {}", self.arrival_radius)));
        }
        let w = self.assigner.weights;
        if [w.distance, w.battery, w.collaboration].iter().any(|w| *w < 0.0 || !w.is_finite()) {
            return Err(FleetError::config("utility weights must be finite and non-negative"));
        }
        if !(self.assigner.distance_scale > 0.0) {
            return Err(FleetError::config("distance scale must be positive"));
        }
        self.risk.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let c: CoordinatorConfig =
            serde_json::from_str(r#"{"safety_radius": 8.0, "assigner": {"min_battery": 50.0}}"#).unwrap();
        assert_eq!(c.safety_radius, 8.0);
        assert_eq!(c.assigner.min_battery, 50.0);
        assert_eq!(c.assigner.distance_scale, 100.0);
        assert_eq!(c.recent_conflict_window_ms, 60_000);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn rejects_bad_values() {
        let c = CoordinatorConfig { safety_radius: 0.0, ..Default::default() };
        assert!(matches!(c.validate(), Err(FleetError::Config { .. })));
    }

    #[test]
    fn boost_is_capped() {
        let s = StarvationPolicy::default();
        assert_eq!(s.boost(0), 0.0);
        assert!((s.boost(5) - 0.5).abs() < 1e-6);
        assert_eq!(s.boost(1000), 2.0);
        assert_eq!(StarvationPolicy::disabled().boost(1000), 0.0);
    }
}
