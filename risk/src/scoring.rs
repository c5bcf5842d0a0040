//! Additive threshold scoring, one function per category. Every score is
//! clamped to [0, 1].

use skyfleet_structs::environment::{
    Airspace, Equipment, EventKind, ObstacleKind, Obstacles, Population, RestrictedZoneKind,
    Weather,
};

fn clamp01(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

/// Contribution of the highest threshold `value` exceeds, scanning from the
/// top. `tiers` is ordered by decreasing threshold.
fn above(value: f32, tiers: &[(f32, f32)]) -> f32 {
    tiers.iter().find(|(t, _)| value > *t).map(|(_, c)| *c).unwrap_or(0.0)
}

/// Same as [`above`] for "lower is worse" measurements; `tiers` is ordered by
/// increasing threshold.
fn below(value: f32, tiers: &[(f32, f32)]) -> f32 {
    tiers.iter().find(|(t, _)| value < *t).map(|(_, c)| *c).unwrap_or(0.0)
}

pub fn weather(w: &Weather) -> f32 {
    let wind = above(w.wind_speed, &[(15.0, 0.4), (10.0, 0.2), (5.0, 0.1)]);
    let precipitation = above(w.precipitation, &[(2.0, 0.3), (0.5, 0.15)]);
    let visibility = below(w.visibility, &[(1.0, 0.4), (3.0, 0.2), (5.0, 0.1)]);
    let temperature = if w.temperature < -10.0 || w.temperature > 40.0 {
        0.2
    } else if w.temperature < 0.0 || w.temperature > 35.0 {
        0.1
    } else {
        0.0
    };
    clamp01(wind + precipitation + visibility + temperature)
}

pub fn obstacle(o: &Obstacles) -> f32 {
    let buildings = (o.buildings.len() as f32 / 100.0).min(0.3);
    let power_lines = 0.1 * o.power_lines.len() as f32;
    let temporary: f32 = o
        .temporary
        .iter()
        .map(|t| match t.kind {
            ObstacleKind::Emergency => 0.4,
            ObstacleKind::Construction => 0.2,
            ObstacleKind::Other => 0.1,
        })
        .sum();
    clamp01(buildings + power_lines + temporary)
}

pub fn population(p: &Population) -> f32 {
    let density = above(p.density, &[(500.0, 0.4), (200.0, 0.2), (50.0, 0.1)]);
    let events: f32 = p
        .events
        .iter()
        .map(|e| match e.kind {
            EventKind::Emergency => 0.5,
            EventKind::Gathering => 0.3,
            EventKind::Other => 0.1,
        })
        .sum();
    clamp01(density + events)
}

pub fn equipment(e: &Equipment) -> f32 {
    let battery = below(e.battery_level, &[(20.0, 0.5), (40.0, 0.3), (60.0, 0.1)]);
    let signal = below(e.signal_strength, &[(30.0, 0.4), (60.0, 0.2), (80.0, 0.1)]);
    let health = below(e.system_health, &[(50.0, 0.4), (80.0, 0.2)]);
    let sensors = 0.15 * e.sensors.failed_count() as f32;
    clamp01(battery + signal + health + sensors)
}

pub fn airspace(a: &Airspace) -> f32 {
    let zones: f32 = a
        .restricted_zones
        .iter()
        .map(|z| match z.kind {
            RestrictedZoneKind::Military | RestrictedZoneKind::Airport => 0.6,
            RestrictedZoneKind::Emergency => 0.8,
            RestrictedZoneKind::Generic => 0.3,
        })
        .sum();
    let traffic = above(a.traffic_density, &[(8.0, 0.4), (5.0, 0.2), (2.0, 0.1)]);
    clamp01(zones + traffic)
}

/// Bayesian update of `prior` given the weighted likelihood.
pub fn posterior(likelihood: f32, prior: f32) -> f32 {
    let likelihood = clamp01(likelihood);
    let num = likelihood * prior;
    let den = num + (1.0 - likelihood) * (1.0 - prior);
    if den <= 0.0 {
        return 0.0;
    }
    clamp01(num / den)
}
