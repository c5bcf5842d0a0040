use skyfleet_risk::{RiskAssessment, RiskCategory};
use skyfleet_structs::environment::EnvironmentSnapshot;

use crate::{
    grid::{Cell, Grid, GridSize},
    zones::ZoneOverlay,
};

/// Radius, in cells, around a population event that carries the
/// population score.
const EVENT_RADIUS_CELLS: f32 = 2.0;

/// Per-cell risk overlay on the planning grid. Reads outside the grid
/// return 0.
#[derive(Clone, Debug, PartialEq)]
pub struct RiskMap {
    size: GridSize,
    values: Vec<f32>,
}

impl RiskMap {
    pub fn new(size: GridSize) -> Self {
        Self::uniform(size, 0.0)
    }

    pub fn uniform(size: GridSize, value: f32) -> Self {
        RiskMap { size, values: vec![value.clamp(0.0, 1.0); size.cells()] }
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    pub fn get(&self, c: &Cell) -> f32 {
        self.size.index(c).map(|i| self.values[i]).unwrap_or(0.0)
    }

    pub fn set(&mut self, c: &Cell, value: f32) {
        if let Some(i) = self.size.index(c) {
            self.values[i] = value.clamp(0.0, 1.0);
        }
    }

    pub fn add(&mut self, c: &Cell, value: f32) {
        if let Some(i) = self.size.index(c) {
            self.values[i] = (self.values[i] + value).clamp(0.0, 1.0);
        }
    }

    pub fn max(&self) -> f32 {
        self.values.iter().copied().fold(0.0, f32::max)
    }

    /// Spreads an assessment over the grid: the posterior everywhere, plus the
    /// category scores around the features that produced them.
    pub fn from_assessment(grid: &Grid, assessment: &RiskAssessment, snapshot: &EnvironmentSnapshot) -> Self {
        let mut map = RiskMap::uniform(grid.size(), assessment.overall);
        let z_all = (0.0, grid.size().z as f32 * grid.cell_size());

        let obstacle = assessment.category(RiskCategory::Obstacle);
        for o in snapshot.obstacles.temporary.iter() {
            let r = o.radius.max(grid.cell_size() * 0.5);
            for c in grid.cells_around(&o.position, r, z_all, |p| p.dist_xy(&o.position) <= r) {
                map.add(&c, obstacle);
            }
        }

        let airspace = assessment.category(RiskCategory::Airspace);
        for z in snapshot.airspace.restricted_zones.iter() {
            let band = (z.min_altitude, z.max_altitude);
            let inside = |p: &skyfleet_structs::Point| {
                p.dist_xy(&z.center) <= z.radius && p.z >= z.min_altitude && p.z <= z.max_altitude
            };
            for c in grid.cells_around(&z.center, z.radius, band, inside) {
                map.add(&c, airspace);
            }
        }

        let population = assessment.category(RiskCategory::Population);
        let r = EVENT_RADIUS_CELLS * grid.cell_size();
        for e in snapshot.population.events.iter() {
            for c in grid.cells_around(&e.location, r, z_all, |p| p.dist_xy(&e.location) <= r) {
                map.add(&c, population);
            }
        }
        map
    }

    pub fn apply_overlay(&mut self, overlay: &ZoneOverlay) {
        for (c, r) in overlay.extra_risk.iter() {
            self.add(c, *r);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyfleet_risk::RiskEngine;
    use skyfleet_structs::environment::{ObstacleKind, TemporaryObstacle};
    use skyfleet_structs::Point;

    #[test]
    fn out_of_bounds_reads_zero() {
        let map = RiskMap::uniform(GridSize::new(2, 2, 2), 0.7);
        assert_eq!(map.get(&Cell::new(1, 1, 1)), 0.7);
        assert_eq!(map.get(&Cell::new(2, 0, 0)), 0.0);
        assert_eq!(map.get(&Cell::new(0, -1, 0)), 0.0);
    }

    #[test]
    fn obstacles_raise_local_risk() {
        let grid = Grid::new(GridSize::new(10, 10, 3), 10.0).unwrap();
        let mut s = EnvironmentSnapshot::calm(0);
        s.obstacles.temporary.push(TemporaryObstacle {
            kind: ObstacleKind::Emergency,
            position: Point::new(55.0, 55.0, 0.0),
            radius: 8.0,
        });
        let a = RiskEngine::with_seed(0).evaluate(&s);
        let map = RiskMap::from_assessment(&grid, &a, &s);
        let near = map.get(&Cell::new(5, 5, 1));
        let far = map.get(&Cell::new(0, 0, 1));
        assert!((far - a.overall).abs() < 1e-6);
        assert!(near > far);
        assert!(map.max() <= 1.0);
    }
}
