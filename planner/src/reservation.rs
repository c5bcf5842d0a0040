use std::collections::HashMap;

use skyfleet_structs::{path::PathNode, AgentId, Timestamp};

use crate::grid::{Cell, Grid};

#[derive(Clone, Debug, PartialEq)]
pub struct Reservation {
    pub agent: AgentId,
    pub from: Timestamp,
    pub to: Timestamp,
}

/// Cells other agents are projected to occupy, with their time windows.
#[derive(Clone, Debug, Default)]
pub struct ReservationTable {
    cells: HashMap<Cell, Vec<Reservation>>,
}

impl ReservationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Reserves each cell on `path` from `hold_ms` before to `hold_ms` after
    /// the node's timestamp.
    pub fn reserve_path(&mut self, agent: &str, path: &[PathNode], grid: &Grid, hold_ms: u64) {
        for node in path {
            let c = grid.cell_of(&node.point());
            self.cells.entry(c).or_default().push(Reservation {
                agent: agent.to_string(),
                from: node.timestamp.saturating_sub(hold_ms),
                to: node.timestamp.saturating_add(hold_ms),
            });
        }
    }

    pub fn release(&mut self, agent: &str) {
        for rs in self.cells.values_mut() {
            rs.retain(|r| r.agent != agent);
        }
        self.cells.retain(|_, rs| !rs.is_empty());
    }

    /// True when an agent other than `agent` holds `cell` at time `t`.
    pub fn is_reserved(&self, cell: &Cell, t: Timestamp, agent: &str) -> bool {
        self.cells
            .get(cell)
            .is_some_and(|rs| rs.iter().any(|r| r.agent != agent && r.from <= t && t <= r.to))
    }

    pub fn reservations(&self, cell: &Cell) -> &[Reservation] {
        self.cells.get(cell).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridSize;

    #[test]
    fn windows_and_release() {
        let grid = Grid::new(GridSize::new(5, 5, 1), 1.0).unwrap();
        let node = |x: f32, t| PathNode { x, y: 0.5, z: 0.5, cost: 0.0, risk: 0.0, timestamp: t };
        let mut table = ReservationTable::new();
        table.reserve_path("a", &[node(0.5, 1000), node(1.5, 2000)], &grid, 400);
        assert!(table.is_reserved(&Cell::new(1, 0, 0), 2300, "b"));
        assert!(!table.is_reserved(&Cell::new(1, 0, 0), 2500, "b"));
        assert!(!table.is_reserved(&Cell::new(1, 0, 0), 2000, "a"));
        table.release("a");
        assert!(table.is_empty());
    }
}
