//! No-fly zones and their rasterization onto the planning grid.

use std::collections::{HashMap, HashSet};

use log::{debug, info};
use rand::Rng;
use serde::{Deserialize, Serialize};
use skyfleet_structs::{Point, Timestamp};

use crate::grid::{Cell, Grid};

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ZoneLifecycle {
    Permanent,
    Temporary,
    Dynamic,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ZoneSeverity {
    Caution,
    Restricted,
    Prohibited,
}

/// Vertical cylinder from `center.z` up to `center.z + height`.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct Circle {
    pub center: Point,
    pub radius: f32,
    pub height: f32,
}

impl Circle {
    pub fn contains(&self, p: &Point) -> bool {
        self.center.dist_xy(p) <= self.radius && p.z >= self.center.z && p.z <= self.center.z + self.height
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct NoFlyZone {
    pub id: String,
    pub lifecycle: ZoneLifecycle,
    pub geometry: Circle,
    /// Only meaningful for temporary zones.
    pub start_time: Option<Timestamp>,
    pub end_time: Option<Timestamp>,
    pub severity: ZoneSeverity,
}

impl NoFlyZone {
    pub fn permanent(id: impl Into<String>, geometry: Circle, severity: ZoneSeverity) -> Self {
        NoFlyZone {
            id: id.into(),
            lifecycle: ZoneLifecycle::Permanent,
            geometry,
            start_time: None,
            end_time: None,
            severity,
        }
    }

    pub fn temporary(
        id: impl Into<String>,
        geometry: Circle,
        severity: ZoneSeverity,
        start_time: Timestamp,
        end_time: Timestamp,
    ) -> Self {
        NoFlyZone {
            id: id.into(),
            lifecycle: ZoneLifecycle::Temporary,
            geometry,
            start_time: Some(start_time),
            end_time: Some(end_time),
            severity,
        }
    }

    pub fn dynamic(id: impl Into<String>, geometry: Circle, severity: ZoneSeverity) -> Self {
        NoFlyZone { lifecycle: ZoneLifecycle::Dynamic, ..NoFlyZone::permanent(id, geometry, severity) }
    }

    pub fn is_active(&self, now: Timestamp) -> bool {
        match self.lifecycle {
            ZoneLifecycle::Temporary => {
                self.start_time.map_or(true, |s| s <= now) && self.end_time.map_or(true, |e| now < e)
            }
            ZoneLifecycle::Permanent | ZoneLifecycle::Dynamic => true,
        }
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.lifecycle == ZoneLifecycle::Temporary && self.end_time.is_some_and(|e| now >= e)
    }

    pub fn contains(&self, p: &Point, now: Timestamp) -> bool {
        self.is_active(now) && self.geometry.contains(p)
    }
}

/// Grid cells affected by the currently active zones.
#[derive(Clone, Debug, Default)]
pub struct ZoneOverlay {
    /// Hard blocks: prohibited permanent or temporary zones.
    pub blocked: HashSet<Cell>,
    /// Cells under a dynamic zone, penalized rather than blocked.
    pub dynamic: HashSet<Cell>,
    pub extra_risk: HashMap<Cell, f32>,
}

impl ZoneOverlay {
    pub fn is_blocked(&self, c: &Cell) -> bool {
        self.blocked.contains(c)
    }

    pub fn is_dynamic(&self, c: &Cell) -> bool {
        self.dynamic.contains(c)
    }

    pub fn risk(&self, c: &Cell) -> f32 {
        self.extra_risk.get(c).copied().unwrap_or(0.0)
    }
}

const RESTRICTED_RISK: f32 = 0.5;
const CAUTION_RISK: f32 = 0.2;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AirspaceMap {
    zones: Vec<NoFlyZone>,
}

impl AirspaceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn zones(&self) -> &[NoFlyZone] {
        &self.zones
    }

    /// Adds a zone, replacing any zone with the same id.
    pub fn add(&mut self, zone: NoFlyZone) {
        match self.zones.iter_mut().find(|z| z.id == zone.id) {
            Some(existing) => *existing = zone,
            None => self.zones.push(zone),
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<NoFlyZone> {
        let idx = self.zones.iter().position(|z| z.id == id)?;
        Some(self.zones.remove(idx))
    }

    /// Drops temporary zones whose end time has passed.
    pub fn expire(&mut self, now: Timestamp) -> Vec<String> {
        let mut expired = Vec::new();
        self.zones.retain(|z| {
            if z.is_expired(now) {
                expired.push(z.id.clone());
                false
            } else {
                true
            }
        });
        if !expired.is_empty() {
            info!("no-fly zones expired at t={}: {:?}", now, expired);
        }
        expired
    }

    /// Moves each dynamic zone's center by up to `max_shift` in x and y.
    pub fn drift_dynamic(&mut self, rng: &mut impl Rng, max_shift: f32) {
        if max_shift <= 0.0 {
            return;
        }
        for z in self.zones.iter_mut().filter(|z| z.lifecycle == ZoneLifecycle::Dynamic) {
            z.geometry.center.x += rng.random_range(-max_shift..=max_shift);
            z.geometry.center.y += rng.random_range(-max_shift..=max_shift);
        }
    }

    pub fn contains(&self, p: &Point, now: Timestamp) -> Option<&NoFlyZone> {
        self.zones.iter().find(|z| z.contains(p, now))
    }

    pub fn overlay(&self, grid: &Grid, now: Timestamp) -> ZoneOverlay {
        let mut overlay = ZoneOverlay::default();
        for zone in self.zones.iter().filter(|z| z.is_active(now)) {
            let g = zone.geometry;
            let cells = grid.cells_around(&g.center, g.radius, (g.center.z, g.center.z + g.height), |p| g.contains(p));
            for c in cells {
                if zone.lifecycle == ZoneLifecycle::Dynamic {
                    overlay.dynamic.insert(c);
                    continue;
                }
                match zone.severity {
                    ZoneSeverity::Prohibited => {
                        overlay.blocked.insert(c);
                    }
                    ZoneSeverity::Restricted | ZoneSeverity::Caution => {
                        let add = if zone.severity == ZoneSeverity::Restricted { RESTRICTED_RISK } else { CAUTION_RISK };
                        let r = overlay.extra_risk.entry(c).or_insert(0.0);
                        *r = (*r + add).min(1.0);
                    }
                }
            }
        }
        debug!(
            "zone overlay t={}: {} blocked, {} dynamic, {} risk cells",
            now,
            overlay.blocked.len(),
            overlay.dynamic.len(),
            overlay.extra_risk.len()
        );
        overlay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridSize;
    use rand::{rngs::StdRng, SeedableRng};

    fn circle(x: f32, y: f32, radius: f32) -> Circle {
        Circle { center: Point::new(x, y, 0.0), radius, height: 100.0 }
    }

    #[test]
    fn temporary_zone_lifecycle() {
        let mut map = AirspaceMap::new();
        map.add(NoFlyZone::temporary("t", circle(50.0, 50.0, 20.0), ZoneSeverity::Prohibited, 100, 200));
        map.add(NoFlyZone::permanent("p", circle(0.0, 0.0, 5.0), ZoneSeverity::Caution));
        let inside = Point::new(50.0, 50.0, 10.0);
        assert!(map.contains(&inside, 50).is_none());
        assert!(map.contains(&inside, 150).is_some());
        assert!(map.expire(150).is_empty());
        assert_eq!(map.expire(200), vec!["t".to_string()]);
        assert_eq!(map.zones().len(), 1);
    }

    #[test]
    fn overlay_by_severity() {
        let grid = Grid::new(GridSize::new(10, 10, 2), 10.0).unwrap();
        let mut map = AirspaceMap::new();
        map.add(NoFlyZone::permanent("block", circle(15.0, 15.0, 6.0), ZoneSeverity::Prohibited));
        map.add(NoFlyZone::permanent("warn", circle(75.0, 75.0, 6.0), ZoneSeverity::Restricted));
        map.add(NoFlyZone::dynamic("storm", circle(45.0, 45.0, 6.0), ZoneSeverity::Prohibited));
        let o = map.overlay(&grid, 0);
        assert!(o.is_blocked(&Cell::new(1, 1, 0)));
        assert!(o.is_blocked(&Cell::new(1, 1, 1)));
        assert!(!o.is_blocked(&Cell::new(4, 4, 0)));
        assert!(o.is_dynamic(&Cell::new(4, 4, 0)));
        assert_eq!(o.risk(&Cell::new(7, 7, 0)), 0.5);
        assert_eq!(o.risk(&Cell::new(0, 0, 0)), 0.0);
    }

    #[test]
    fn only_dynamic_zones_drift() {
        let mut map = AirspaceMap::new();
        map.add(NoFlyZone::permanent("p", circle(0.0, 0.0, 5.0), ZoneSeverity::Caution));
        map.add(NoFlyZone::dynamic("d", circle(0.0, 0.0, 5.0), ZoneSeverity::Caution));
        let mut rng = StdRng::seed_from_u64(4);
        map.drift_dynamic(&mut rng, 3.0);
        assert_eq!(map.zones()[0].geometry.center, Point::ZERO);
        let moved = map.zones()[1].geometry.center;
        assert!(moved.x.abs() <= 3.0 && moved.y.abs() <= 3.0);
    }
}
