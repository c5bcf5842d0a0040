use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};
use skyfleet_structs::{environment::EnvironmentSnapshot, Timestamp};

use crate::engine::RiskEngine;

/// Battery percentage points drained linearly over the forecast horizon.
const BATTERY_DRAIN: f32 = 20.0;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct ForecastPoint {
    pub timestamp: Timestamp,
    pub risk: f32,
}

impl RiskEngine {
    /// Single-sample forecast with the configured number of steps.
    pub fn forecast(&mut self, snapshot: &EnvironmentSnapshot, horizon_secs: f32) -> Vec<ForecastPoint> {
        let steps = self.config.forecast_steps;
        self.forecast_steps(snapshot, horizon_secs, steps)
    }

    /// Returns `steps + 1` evenly spaced points starting at the snapshot
    /// time. Each point perturbs the snapshot independently and re-runs
    /// [`RiskEngine::assess`], so the risk nodes end up holding the last step.
    /// With zero steps the result is the current assessment alone.
    pub fn forecast_steps(
        &mut self,
        snapshot: &EnvironmentSnapshot,
        horizon_secs: f32,
        steps: usize,
    ) -> Vec<ForecastPoint> {
        if steps == 0 {
            let risk = self.assess(snapshot).overall;
            return vec![ForecastPoint { timestamp: snapshot.timestamp, risk }];
        }
        let horizon_ms = (horizon_secs.max(0.0) * 1000.0) as u64;
        let mut points = Vec::with_capacity(steps + 1);

        for i in 0..=steps {
            let fraction = i as f32 / steps as f32;
            let timestamp = snapshot.timestamp + horizon_ms * i as u64 / steps as u64;

            let mut future = snapshot.clone();
            future.timestamp = timestamp;
            future.weather.wind_speed =
                (future.weather.wind_speed + self.rng.random_range(-1.0f32..=1.0)).max(0.0);
            future.weather.precipitation *= self.rng.random_range(0.9f32..=1.1);
            future.equipment.battery_level =
                (future.equipment.battery_level - BATTERY_DRAIN * fraction).max(0.0);

            let risk = self.assess(&future).overall;
            points.push(ForecastPoint { timestamp, risk });
        }

        debug!(
            "forecast from t={} over {}s: {:?}",
            snapshot.timestamp,
            horizon_secs,
            points.iter().map(|p| p.risk).collect::<Vec<_>>()
        );
        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RiskCategory;

    #[test]
    fn evenly_spaced_points() {
        let mut engine = RiskEngine::with_seed(3);
        let s = EnvironmentSnapshot::calm(5_000);
        let f = engine.forecast(&s, 60.0);
        assert_eq!(f.len(), 11);
        assert_eq!(f[0].timestamp, 5_000);
        assert_eq!(f[1].timestamp, 11_000);
        assert_eq!(f[10].timestamp, 65_000);
        assert!(f.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert!(f.iter().all(|p| (0.0..=1.0).contains(&p.risk)));
        // nodes hold the last step
        assert_eq!(engine.node(RiskCategory::Equipment).timestamp, 65_000);
    }

    #[test]
    fn zero_steps_is_the_current_assessment() {
        let mut s = EnvironmentSnapshot::calm(5_000);
        s.weather.wind_speed = 9.5;
        let mut engine = RiskEngine::with_seed(3);
        let f = engine.forecast_steps(&s, 60.0, 0);
        assert_eq!(f.len(), 1);
        assert_eq!(f[0].timestamp, 5_000);
        assert_eq!(f[0].risk, RiskEngine::with_seed(3).assess(&s).overall);
    }

    #[test]
    fn same_seed_same_forecast() {
        let mut s = EnvironmentSnapshot::calm(0);
        s.weather.wind_speed = 9.5;
        s.weather.precipitation = 1.0;
        let a = RiskEngine::with_seed(11).forecast_steps(&s, 120.0, 6);
        let b = RiskEngine::with_seed(11).forecast_steps(&s, 120.0, 6);
        assert_eq!(a, b);
    }

    #[test]
    fn battery_drain_raises_late_risk() {
        let mut s = EnvironmentSnapshot::calm(0);
        s.equipment.battery_level = 35.0;
        let f = RiskEngine::with_seed(2).forecast_steps(&s, 600.0, 4);
        // 35% drains to 15% at the horizon: equipment tier goes 0.3 -> 0.5
        assert!(f[4].risk > f[0].risk);
    }
}
