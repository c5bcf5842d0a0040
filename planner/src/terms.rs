//! Pluggable scoring terms for the path search. Implementations must be
//! pure functions of the cell, the planning agent and the fleet view.

use skyfleet_structs::{agent::Agent, AgentId, Point};

use crate::grid::Cell;

/// What the planner knows about the rest of the fleet.
#[derive(Clone, Debug, Default)]
pub struct FleetView {
    pub cell_size: f32,
    pub others: Vec<OtherAgent>,
}

#[derive(Clone, Debug)]
pub struct OtherAgent {
    pub id: AgentId,
    pub cell: Cell,
    pub destination: Option<Cell>,
    /// Cells of the agent's current route, in order.
    pub route: Vec<Cell>,
}

impl FleetView {
    pub fn cell_of(&self, p: &Point) -> Cell {
        let s = if self.cell_size > 0.0 { self.cell_size } else { 1.0 };
        Cell { x: (p.x / s).floor() as i32, y: (p.y / s).floor() as i32, z: (p.z / s).floor() as i32 }
    }

    pub fn without(&self, agent: &str) -> impl Iterator<Item = &OtherAgent> {
        let agent = agent.to_string();
        self.others.iter().filter(move |o| o.id != agent)
    }
}

pub trait CostTerms {
    fn congestion(&self, _cell: &Cell, _agent: &Agent, _fleet: &FleetView) -> f32 {
        0.0
    }

    fn energy(&self, _from: &Cell, _to: &Cell, _agent: &Agent, _fleet: &FleetView) -> f32 {
        1.0
    }

    fn collaboration_bonus(&self, _cell: &Cell, _agent: &Agent, _fleet: &FleetView) -> f32 {
        0.0
    }
}

/// Zero congestion, unit energy, no bonus.
#[derive(Clone, Copy, Debug, Default)]
pub struct NeutralTerms;

impl CostTerms for NeutralTerms {}

/// Congestion from agents near the cell, climb-weighted energy scaled up as
/// the battery drains, and a bonus for following an agent bound for the same
/// destination.
#[derive(Clone, Copy, Debug)]
pub struct FleetAwareTerms {
    pub congestion_weight: f32,
    pub congestion_radius: u32,
    pub climb_factor: f32,
    pub low_battery_factor: f32,
    pub follow_bonus: f32,
}

impl Default for FleetAwareTerms {
    fn default() -> Self {
        FleetAwareTerms {
            congestion_weight: 0.5,
            congestion_radius: 2,
            climb_factor: 0.5,
            low_battery_factor: 0.5,
            follow_bonus: 0.3,
        }
    }
}

impl CostTerms for FleetAwareTerms {
    fn congestion(&self, cell: &Cell, agent: &Agent, fleet: &FleetView) -> f32 {
        let near = fleet.without(&agent.id).filter(|o| o.cell.chebyshev(cell) <= self.congestion_radius).count();
        self.congestion_weight * near as f32
    }

    fn energy(&self, from: &Cell, to: &Cell, agent: &Agent, _fleet: &FleetView) -> f32 {
        let climb = (to.z - from.z).max(0) as f32;
        let depletion = (1.0 - agent.battery_level.clamp(0.0, 100.0) / 100.0) * self.low_battery_factor;
        (1.0 + self.climb_factor * climb) * (1.0 + depletion)
    }

    fn collaboration_bonus(&self, cell: &Cell, agent: &Agent, fleet: &FleetView) -> f32 {
        let Some(dest) = agent.destination.map(|d| fleet.cell_of(&d)) else {
            return 0.0;
        };
        let shares_corridor = fleet
            .without(&agent.id)
            .any(|o| o.destination.is_some_and(|d| d.chebyshev(&dest) <= 1) && o.route.contains(cell));
        if shares_corridor {
            self.follow_bonus
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> FleetView {
        FleetView {
            cell_size: 10.0,
            others: vec![OtherAgent {
                id: "b".into(),
                cell: Cell::new(5, 5, 1),
                destination: Some(Cell::new(9, 9, 1)),
                route: vec![Cell::new(5, 5, 1), Cell::new(6, 6, 1), Cell::new(9, 9, 1)],
            }],
        }
    }

    #[test]
    fn neutral_terms() {
        let a = Agent::new("a", Point::ZERO);
        let t = NeutralTerms;
        let c = Cell::new(5, 5, 1);
        assert_eq!(t.congestion(&c, &a, &view()), 0.0);
        assert_eq!(t.energy(&c, &c, &a, &view()), 1.0);
        assert_eq!(t.collaboration_bonus(&c, &a, &view()), 0.0);
    }

    #[test]
    fn fleet_aware_terms() {
        let mut a = Agent::new("a", Point::ZERO);
        let t = FleetAwareTerms::default();
        assert_eq!(t.congestion(&Cell::new(6, 6, 1), &a, &view()), 0.5);
        assert_eq!(t.congestion(&Cell::new(0, 0, 1), &a, &view()), 0.0);
        assert_eq!(t.energy(&Cell::new(0, 0, 0), &Cell::new(0, 0, 1), &a, &view()), 1.5);
        assert_eq!(t.collaboration_bonus(&Cell::new(6, 6, 1), &a, &view()), 0.0);
        a.destination = Some(Point::new(95.0, 95.0, 15.0));
        assert_eq!(t.collaboration_bonus(&Cell::new(6, 6, 1), &a, &view()), 0.3);
        // its own entry in the view never counts
        a.id = "b".into();
        assert_eq!(t.congestion(&Cell::new(6, 6, 1), &a, &view()), 0.0);
    }
}
