//! Static domain knowledge: risk categories, nodes and the
//! conditional-probability tables kept for audit.

use serde::{Deserialize, Serialize};
use skyfleet_structs::{Point, Timestamp};

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum RiskCategory {
    Weather,
    Obstacle,
    Population,
    Equipment,
    Airspace,
}

impl RiskCategory {
    pub const ALL: [RiskCategory; 5] = [
        RiskCategory::Weather,
        RiskCategory::Obstacle,
        RiskCategory::Population,
        RiskCategory::Equipment,
        RiskCategory::Airspace,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RiskCategory::Weather => "weather",
            RiskCategory::Obstacle => "obstacle",
            RiskCategory::Population => "population",
            RiskCategory::Equipment => "equipment",
            RiskCategory::Airspace => "airspace",
        }
    }

    pub fn node_id(&self) -> String {
        format!("{}_risk", self.name())
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct RiskNode {
    pub id: String,
    pub name: String,
    pub category: RiskCategory,
    pub value: f32,
    pub confidence: f32,
    pub timestamp: Timestamp,
    pub location: Option<Point>,
}

const DEFAULT_NODE_VALUE: f32 = 0.1;
const DEFAULT_NODE_CONFIDENCE: f32 = 0.8;

/// The five category nodes at their low starting values.
pub fn seed_nodes() -> Vec<RiskNode> {
    RiskCategory::ALL
        .iter()
        .map(|c| RiskNode {
            id: c.node_id(),
            name: format!("{} risk", c.name()),
            category: *c,
            value: DEFAULT_NODE_VALUE,
            confidence: DEFAULT_NODE_CONFIDENCE,
            timestamp: 0,
            location: None,
        })
        .collect()
}

/// P(incident | condition level) for one category.
#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct ProbabilityTable {
    pub category: RiskCategory,
    pub rows: Vec<(&'static str, f32)>,
}

impl ProbabilityTable {
    pub fn probability(&self, condition: &str) -> Option<f32> {
        self.rows.iter().find(|(c, _)| *c == condition).map(|(_, p)| *p)
    }
}

pub fn probability_tables() -> Vec<ProbabilityTable> {
    use RiskCategory::*;
    let table = |category, rows: &[(&'static str, f32)]| ProbabilityTable { category, rows: rows.to_vec() };
    vec![
        table(Weather, &[("calm", 0.02), ("windy", 0.08), ("storm", 0.35), ("low_visibility", 0.25)]),
        table(Obstacle, &[("clear", 0.01), ("urban", 0.06), ("construction", 0.15), ("emergency", 0.3)]),
        table(Population, &[("sparse", 0.01), ("suburban", 0.04), ("dense", 0.12), ("crowd", 0.3)]),
        table(Equipment, &[("nominal", 0.01), ("degraded", 0.1), ("sensor_fault", 0.25), ("critical", 0.6)]),
        table(Airspace, &[("open", 0.01), ("busy", 0.05), ("restricted", 0.2), ("emergency", 0.5)]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_node_per_category() {
        let nodes = seed_nodes();
        assert_eq!(nodes.len(), 5);
        assert_eq!(nodes[0].id, "weather_risk");
        assert!(nodes.iter().all(|n| (0.0..=1.0).contains(&n.value)));
    }

    #[test]
    fn tables_cover_all_categories() {
        let tables = probability_tables();
        for c in RiskCategory::ALL {
            assert!(tables.iter().any(|t| t.category == c));
        }
        assert_eq!(tables[0].probability("storm"), Some(0.35));
        assert_eq!(tables[0].probability("hail"), None);
    }
}
