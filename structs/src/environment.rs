//! Environment snapshots: one immutable bundle of sensed conditions per
//! risk assessment.

use serde::{Deserialize, Serialize};

use crate::{FleetError, Point, Timestamp};

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Weather {
    /// m/s
    pub wind_speed: f32,
    /// degrees
    pub wind_direction: f32,
    /// km
    pub visibility: f32,
    /// mm/h
    pub precipitation: f32,
    /// degrees Celsius
    pub temperature: f32,
    /// hPa
    pub pressure: f32,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ObstacleKind {
    Emergency,
    Construction,
    #[serde(other)]
    Other,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct TemporaryObstacle {
    pub kind: ObstacleKind,
    pub position: Point,
    pub radius: f32,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Building {
    pub position: Point,
    pub height: f32,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct PowerLine {
    pub from: Point,
    pub to: Point,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct Obstacles {
    pub buildings: Vec<Building>,
    pub power_lines: Vec<PowerLine>,
    pub temporary: Vec<TemporaryObstacle>,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Emergency,
    Gathering,
    #[serde(other)]
    Other,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct PopulationEvent {
    pub kind: EventKind,
    pub location: Point,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Population {
    /// people per km²
    pub density: f32,
    pub events: Vec<PopulationEvent>,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Sensors {
    pub gps: bool,
    pub imu: bool,
    pub camera: bool,
    pub lidar: bool,
}

impl Sensors {
    pub const ALL_OK: Sensors = Sensors { gps: true, imu: true, camera: true, lidar: true };

    pub fn failed_count(&self) -> usize {
        [self.gps, self.imu, self.camera, self.lidar].iter().filter(|ok| !**ok).count()
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Equipment {
    /// percent
    pub battery_level: f32,
    /// percent
    pub signal_strength: f32,
    /// percent
    pub system_health: f32,
    pub sensors: Sensors,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RestrictedZoneKind {
    Military,
    Airport,
    Emergency,
    #[serde(other)]
    Generic,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct RestrictedZone {
    pub kind: RestrictedZoneKind,
    pub center: Point,
    pub radius: f32,
    pub min_altitude: f32,
    pub max_altitude: f32,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Airspace {
    pub restricted_zones: Vec<RestrictedZone>,
    pub traffic_density: f32,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct EnvironmentSnapshot {
    pub timestamp: Timestamp,
    pub weather: Weather,
    pub obstacles: Obstacles,
    pub population: Population,
    pub equipment: Equipment,
    pub airspace: Airspace,
}

impl EnvironmentSnapshot {
    /// Parses a snapshot, reporting a missing field by name.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        let snapshot: EnvironmentSnapshot = serde_json::from_str(json).map_err(|e| {
            let msg = e.to_string();
            match missing_field_name(&msg) {
                Some(field) => FleetError::missing(field),
                None => FleetError::invalid("snapshot", msg),
            }
        })?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Rejects non-finite numbers. Out-of-range values are accepted and only
    /// clamped by the scoring stage.
    pub fn validate(&self) -> crate::Result<()> {
        let w = &self.weather;
        let e = &self.equipment;
        let scalars = [
            ("weather.wind_speed", w.wind_speed),
            ("weather.wind_direction", w.wind_direction),
            ("weather.visibility", w.visibility),
            ("weather.precipitation", w.precipitation),
            ("weather.temperature", w.temperature),
            ("weather.pressure", w.pressure),
            ("population.density", self.population.density),
            ("equipment.battery_level", e.battery_level),
            ("equipment.signal_strength", e.signal_strength),
            ("equipment.system_health", e.system_health),
            ("airspace.traffic_density", self.airspace.traffic_density),
        ];
        for (field, v) in scalars {
            if !v.is_finite() {
                return Err(FleetError::invalid(field, "non-finite value"));
            }
        }
        for o in self.obstacles.temporary.iter() {
            if !o.position.is_finite() || !o.radius.is_finite() {
                return Err(FleetError::invalid("obstacles.temporary", "non-finite geometry"));
            }
        }
        for z in self.airspace.restricted_zones.iter() {
            if !z.center.is_finite() || !z.radius.is_finite() {
                return Err(FleetError::invalid("airspace.restricted_zones", "non-finite geometry"));
            }
        }
        Ok(())
    }

    /// Calm, healthy baseline used by scenarios and tests.
    pub fn calm(timestamp: Timestamp) -> Self {
        EnvironmentSnapshot {
            timestamp,
            weather: Weather {
                wind_speed: 2.0,
                wind_direction: 0.0,
                visibility: 10.0,
                precipitation: 0.0,
                temperature: 18.0,
                pressure: 1013.0,
            },
            obstacles: Obstacles::default(),
            population: Population { density: 20.0, events: Vec::new() },
            equipment: Equipment {
                battery_level: 100.0,
                signal_strength: 100.0,
                system_health: 100.0,
                sensors: Sensors::ALL_OK,
            },
            airspace: Airspace { restricted_zones: Vec::new(), traffic_density: 0.0 },
        }
    }
}

fn missing_field_name(msg: &str) -> Option<&str> {
    let rest = msg.strip_prefix("missing field `")?;
    rest.split('`').next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_is_named() {
        let mut value = serde_json::to_value(EnvironmentSnapshot::calm(0)).unwrap();
        value["weather"].as_object_mut().unwrap().remove("visibility");
        let err = EnvironmentSnapshot::from_json(&value.to_string()).unwrap_err();
        assert_eq!(err, FleetError::missing("visibility"));
    }

    #[test]
    fn unknown_kinds_fall_back() {
        let json = r#"{"kind":"parade","location":{"x":0.0,"y":0.0,"z":0.0}}"#;
        let ev: PopulationEvent = serde_json::from_str(json).unwrap();
        assert_eq!(ev.kind, EventKind::Other);
    }

    #[test]
    fn round_trips_calm_snapshot() {
        let s = EnvironmentSnapshot::calm(7);
        let parsed = EnvironmentSnapshot::from_json(&serde_json::to_string(&s).unwrap()).unwrap();
        assert_eq!(parsed, s);
    }
}
