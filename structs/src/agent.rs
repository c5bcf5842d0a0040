use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{AgentId, Point, Timestamp};

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Idle,
    Flying,
    Delivering,
    Returning,
    Emergency,
}

/// A temporary displacement the agent must fly before resuming its route.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct AvoidanceManeuver {
    pub displacement: Point,
    pub until: Timestamp,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Agent {
    pub id: AgentId,
    pub position: Point,
    pub velocity: Point,
    pub destination: Option<Point>,
    /// Percent, 0 to 100.
    pub battery_level: f32,
    pub payload_capacity: f32,
    /// Higher is more important.
    pub priority: i32,
    pub status: AgentStatus,
    pub capabilities: BTreeSet<String>,
    pub communication_range: f32,
    pub last_update: Timestamp,
    #[serde(default)]
    pub avoidance: Option<AvoidanceManeuver>,
}

impl Agent {
    pub fn new(id: impl Into<AgentId>, position: Point) -> Self {
        Agent {
            id: id.into(),
            position,
            velocity: Point::ZERO,
            destination: None,
            battery_level: 100.0,
            payload_capacity: 5.0,
            priority: 1,
            status: AgentStatus::Idle,
            capabilities: BTreeSet::new(),
            communication_range: 500.0,
            last_update: 0,
            avoidance: None,
        }
    }

    pub fn with_capabilities<'a>(mut self, caps: impl IntoIterator<Item = &'a str>) -> Self {
        self.capabilities = caps.into_iter().map(str::to_string).collect();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_battery(mut self, battery_level: f32) -> Self {
        self.battery_level = battery_level;
        self
    }

    pub fn with_payload_capacity(mut self, capacity: f32) -> Self {
        self.payload_capacity = capacity;
        self
    }

    pub fn has_capability(&self, cap: &str) -> bool {
        self.capabilities.contains(cap)
    }

    /// Agents that are airborne or otherwise not waiting for work.
    pub fn is_active(&self) -> bool {
        self.status != AgentStatus::Idle
    }

    pub fn speed(&self) -> f32 {
        self.velocity.norm()
    }
}

/// Partial agent update pushed by the host; `None` fields are left as they are.
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct AgentUpdate {
    pub position: Option<Point>,
    pub velocity: Option<Point>,
    pub destination: Option<Option<Point>>,
    pub battery_level: Option<f32>,
    pub payload_capacity: Option<f32>,
    pub priority: Option<i32>,
    pub status: Option<AgentStatus>,
    pub capabilities: Option<BTreeSet<String>>,
    pub communication_range: Option<f32>,
}

impl AgentUpdate {
    pub fn position(position: Point) -> Self {
        Self { position: Some(position), ..Default::default() }
    }

    pub fn apply(self, agent: &mut Agent, now: Timestamp) {
        if let Some(p) = self.position {
            agent.position = p;
        }
        if let Some(v) = self.velocity {
            agent.velocity = v;
        }
        if let Some(d) = self.destination {
            agent.destination = d;
        }
        if let Some(b) = self.battery_level {
            agent.battery_level = b;
        }
        if let Some(c) = self.payload_capacity {
            agent.payload_capacity = c;
        }
        if let Some(p) = self.priority {
            agent.priority = p;
        }
        if let Some(s) = self.status {
            agent.status = s;
        }
        if let Some(c) = self.capabilities {
            agent.capabilities = c;
        }
        if let Some(r) = self.communication_range {
            agent.communication_range = r;
        }
        agent.last_update = now;
    }

    /// Checks that every numeric field present is finite.
    pub fn validate(&self) -> crate::Result<()> {
        let points = [("position", self.position), ("velocity", self.velocity)];
        for (field, p) in points {
            if p.is_some_and(|p| !p.is_finite()) {
                return Err(crate::FleetError::invalid(field, "non-finite coordinate"));
            }
        }
        if let Some(Some(d)) = self.destination {
            if !d.is_finite() {
                return Err(crate::FleetError::invalid("destination", "non-finite coordinate"));
            }
        }
        let scalars = [
            ("battery_level", self.battery_level),
            ("payload_capacity", self.payload_capacity),
            ("communication_range", self.communication_range),
        ];
        for (field, v) in scalars {
            if v.is_some_and(|v| !v.is_finite()) {
                return Err(crate::FleetError::invalid(field, "non-finite value"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_update_touches_only_given_fields() {
        let mut a = Agent::new("d1", Point::new(1.0, 2.0, 3.0)).with_battery(80.0);
        AgentUpdate { battery_level: Some(55.0), ..Default::default() }.apply(&mut a, 42);
        assert_eq!(a.battery_level, 55.0);
        assert_eq!(a.position, Point::new(1.0, 2.0, 3.0));
        assert_eq!(a.last_update, 42);
    }

    #[test]
    fn rejects_nan_battery() {
        let u = AgentUpdate { battery_level: Some(f32::NAN), ..Default::default() };
        assert!(u.validate().is_err());
    }
}
