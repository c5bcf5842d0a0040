use std::collections::BTreeMap;

use log::debug;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use skyfleet_structs::environment::EnvironmentSnapshot;

use crate::{
    config::RiskConfig,
    model::{probability_tables, seed_nodes, ProbabilityTable, RiskCategory, RiskNode},
    scoring,
};

pub const WEATHER_ADVISORY: &str = "Adverse weather: delay non-urgent flights or reroute around the front";
pub const EQUIPMENT_ADVISORY: &str = "Equipment degraded: run diagnostics before dispatching this drone";
pub const AIRSPACE_ADVISORY: &str = "Restricted airspace nearby: request clearance or plan around the zone";
pub const POPULATION_ADVISORY: &str = "Dense population below: avoid overflying crowds and events";

const RECOMMENDATIONS: [(RiskCategory, f32, &str); 4] = [
    (RiskCategory::Weather, 0.5, WEATHER_ADVISORY),
    (RiskCategory::Equipment, 0.4, EQUIPMENT_ADVISORY),
    (RiskCategory::Airspace, 0.3, AIRSPACE_ADVISORY),
    (RiskCategory::Population, 0.4, POPULATION_ADVISORY),
];

const BASE_CONFIDENCE: f32 = 0.8;
const MIN_CONFIDENCE: f32 = 0.1;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct RiskAssessment {
    /// Posterior risk, the headline number.
    pub overall: f32,
    /// Weighted average of the category scores before the Bayesian update.
    pub likelihood: f32,
    pub by_category: BTreeMap<RiskCategory, f32>,
    pub recommendations: Vec<String>,
    pub confidence: f32,
}

impl RiskAssessment {
    pub fn category(&self, category: RiskCategory) -> f32 {
        self.by_category.get(&category).copied().unwrap_or(0.0)
    }
}

pub struct RiskEngine {
    pub(crate) config: RiskConfig,
    pub(crate) rng: StdRng,
    nodes: Vec<RiskNode>,
    tables: Vec<ProbabilityTable>,
}

impl RiskEngine {
    pub fn new(config: RiskConfig) -> skyfleet_structs::Result<Self> {
        config.validate()?;
        Ok(RiskEngine {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            nodes: seed_nodes(),
            tables: probability_tables(),
        })
    }

    pub fn with_seed(seed: u64) -> Self {
        let config = RiskConfig { seed, ..Default::default() };
        RiskEngine {
            rng: StdRng::seed_from_u64(seed),
            config,
            nodes: seed_nodes(),
            tables: probability_tables(),
        }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    pub fn nodes(&self) -> &[RiskNode] {
        &self.nodes
    }

    pub fn node(&self, category: RiskCategory) -> &RiskNode {
        // seed_nodes creates exactly one node per category, in ALL order
        &self.nodes[RiskCategory::ALL.iter().position(|c| *c == category).unwrap_or(0)]
    }

    pub fn tables(&self) -> &[ProbabilityTable] {
        &self.tables
    }

    /// Scores a snapshot without touching the engine state.
    pub fn evaluate(&self, snapshot: &EnvironmentSnapshot) -> RiskAssessment {
        let by_category: BTreeMap<RiskCategory, f32> = RiskCategory::ALL
            .iter()
            .map(|c| {
                let score = match c {
                    RiskCategory::Weather => scoring::weather(&snapshot.weather),
                    RiskCategory::Obstacle => scoring::obstacle(&snapshot.obstacles),
                    RiskCategory::Population => scoring::population(&snapshot.population),
                    RiskCategory::Equipment => scoring::equipment(&snapshot.equipment),
                    RiskCategory::Airspace => scoring::airspace(&snapshot.airspace),
                };
                (*c, score)
            })
            .collect();

        let likelihood: f32 = by_category
            .iter()
            .map(|(c, s)| self.config.weights.get(*c) * s)
            .sum::<f32>()
            .clamp(0.0, 1.0);
        let overall = scoring::posterior(likelihood, self.config.prior);

        let recommendations = RECOMMENDATIONS
            .iter()
            .filter(|(c, threshold, _)| by_category[c] > *threshold)
            .map(|(_, _, text)| text.to_string())
            .collect();

        RiskAssessment {
            overall,
            likelihood,
            by_category,
            recommendations,
            confidence: confidence(snapshot),
        }
    }

    /// Scores a snapshot and records the result in the risk nodes.
    pub fn assess(&mut self, snapshot: &EnvironmentSnapshot) -> RiskAssessment {
        let assessment = self.evaluate(snapshot);
        for node in self.nodes.iter_mut() {
            node.value = assessment.category(node.category);
            node.confidence = assessment.confidence;
            node.timestamp = snapshot.timestamp;
        }
        debug!(
            "assessed t={} overall={:.4} likelihood={:.3} scores={:?}",
            snapshot.timestamp, assessment.overall, assessment.likelihood, assessment.by_category
        );
        assessment
    }
}

fn confidence(snapshot: &EnvironmentSnapshot) -> f32 {
    let e = &snapshot.equipment;
    let mut c = BASE_CONFIDENCE;
    if e.signal_strength < 50.0 {
        c -= 0.2;
    }
    if !e.sensors.gps {
        c -= 0.3;
    }
    if !e.sensors.camera {
        c -= 0.1;
    }
    c.max(MIN_CONFIDENCE)
}
