use serde::{Deserialize, Serialize};
use skyfleet_structs::FleetError;

use crate::model::RiskCategory;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct CategoryWeights {
    pub weather: f32,
    pub obstacle: f32,
    pub population: f32,
    pub equipment: f32,
    pub airspace: f32,
}

impl Default for CategoryWeights {
    fn default() -> Self {
        CategoryWeights { weather: 0.25, obstacle: 0.2, population: 0.15, equipment: 0.3, airspace: 0.1 }
    }
}

impl CategoryWeights {
    pub fn get(&self, category: RiskCategory) -> f32 {
        match category {
            RiskCategory::Weather => self.weather,
            RiskCategory::Obstacle => self.obstacle,
            RiskCategory::Population => self.population,
            RiskCategory::Equipment => self.equipment,
            RiskCategory::Airspace => self.airspace,
        }
    }

    pub fn sum(&self) -> f32 {
        RiskCategory::ALL.iter().map(|c| self.get(*c)).sum()
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct RiskConfig {
    pub prior: f32,
    pub weights: CategoryWeights,
    pub seed: u64,
    pub forecast_steps: usize,
}

impl Default for RiskConfig {
    fn default() -> Self {
        RiskConfig { prior: 0.1, weights: CategoryWeights::default(), seed: 0, forecast_steps: 10 }
    }
}

impl RiskConfig {
    pub fn validate(&self) -> skyfleet_structs::Result<()> {
        if !(self.prior > 0.0 && self.prior < 1.0) {
            return Err(FleetError::config(format!("risk prior must be in (0, 1), got {}", self.prior)));
        }
        if RiskCategory::ALL.iter().any(|c| self.weights.get(*c) < 0.0) {
            return Err(FleetError::config("risk weights must be non-negative"));
        }
        if (self.weights.sum() - 1.0).abs() > 1e-3 {
            return Err(FleetError::config(format!("risk weights must sum to 1, got {}", self.weights.sum())));
        }
        if self.forecast_steps == 0 {
            return Err(FleetError::config("forecast_steps must be at least 1"));
        }
        Ok(())
    }
}
