use skyfleet_planner::zones::{Circle, NoFlyZone, ZoneSeverity};
use skyfleet_structs::{
    environment::{
        Building, EventKind, ObstacleKind, Population, PopulationEvent, RestrictedZone, RestrictedZoneKind,
    },
    Point,
};

use crate::{DroneState, ObstacleState, Workload, World};

/// Cruise altitude over the pads.
const CRUISE: f32 = 30.0;

/// Pads are laid out in a row this far apart.
const PAD_SPACING: f32 = 12.0;

fn pads(base: Point, n: usize) -> impl Iterator<Item = Point> {
    (0..n).map(move |i| Point { x: base.x + i as f32 * PAD_SPACING, ..base })
}

fn patrol(kind: ObstacleKind, waypoints: Vec<Point>, velocity: f32, radius: f32) -> ObstacleState {
    ObstacleState { kind, curr_loc: waypoints[0], waypoints, curr_waypoint: 0, velocity, radius }
}

fn airport(center: Point, radius: f32) -> (RestrictedZone, NoFlyZone) {
    let restricted =
        RestrictedZone { kind: RestrictedZoneKind::Airport, center, radius, min_altitude: 0.0, max_altitude: 150.0 };
    let zone =
        NoFlyZone::permanent("airport", Circle { center, radius, height: 150.0 }, ZoneSeverity::Prohibited);
    (restricted, zone)
}

impl World {
    /// One base, three drones and a trickle of single-drone work. The whole
    /// scenario fits in a 500 x 500 m area.
    pub fn small(seed: u64) -> World {
        let base = Point::new(100.0, 100.0, 0.0);
        let caps: [&[&'static str]; 3] = [&["delivery", "camera"], &["delivery"], &["camera"]];
        let drones = pads(base, 3)
            .zip(caps)
            .enumerate()
            .map(|(i, (pad, caps))| DroneState::new(format!("d{}", i + 1), pad, CRUISE).with_capabilities(caps))
            .collect();

        let workload = Workload {
            sites: vec![
                Point::new(300.0, 120.0, CRUISE),
                Point::new(150.0, 320.0, CRUISE),
                Point::new(380.0, 380.0, CRUISE),
                Point::new(250.0, 250.0, CRUISE),
            ],
            spawn_interval_ms: 20_000,
            delivery_share: 0.6,
            max_team: 1,
            lifetime_ms: 600_000,
            service_ms: 5000,
        };

        let mut world = World::new(seed, drones, workload);
        world.obstacles = vec![patrol(
            ObstacleKind::Construction,
            vec![Point::new(200.0, 200.0, 0.0), Point::new(260.0, 200.0, 0.0)],
            0.5,
            15.0,
        )];
        world.buildings = vec![
            Building { position: Point::new(220.0, 150.0, 0.0), height: 40.0 },
            Building { position: Point::new(180.0, 260.0, 0.0), height: 25.0 },
        ];
        let (restricted, zone) = airport(Point::new(450.0, 100.0, 0.0), 40.0);
        world.restricted = vec![restricted];
        world.zones = vec![zone];
        world
    }

    /// Two bases, eight drones, a stadium event closing part of the sky for
    /// the first five minutes and a storm cell wandering through.
    pub fn medium(seed: u64) -> World {
        let bases = [Point::new(80.0, 80.0, 0.0), Point::new(380.0, 420.0, 0.0)];
        let caps: [&[&'static str]; 4] = [&["delivery"], &["camera"], &["delivery", "camera"], &["lidar", "camera"]];
        let drones = bases
            .iter()
            .flat_map(|base| pads(*base, 4))
            .enumerate()
            .map(|(i, pad)| DroneState::new(format!("d{}", i + 1), pad, CRUISE).with_capabilities(caps[i % caps.len()]))
            .collect();

        let workload = Workload {
            sites: vec![
                Point::new(66.0, 300.0, CRUISE),
                Point::new(312.0, 260.0, CRUISE),
                Point::new(443.0, 250.0, CRUISE),
                Point::new(200.0, 120.0, CRUISE),
                Point::new(120.0, 450.0, CRUISE),
                Point::new(300.0, 60.0, CRUISE),
                Point::new(460.0, 470.0, CRUISE),
                Point::new(250.0, 330.0, CRUISE),
            ],
            spawn_interval_ms: 10_000,
            delivery_share: 0.5,
            max_team: 2,
            lifetime_ms: 600_000,
            service_ms: 8000,
        };

        let mut world = World::new(seed, drones, workload);
        world.obstacles = vec![
            patrol(
                ObstacleKind::Construction,
                vec![Point::new(53.0, 25.0, 0.0), Point::new(118.0, 250.0, 0.0)],
                0.5,
                15.0,
            ),
            patrol(
                ObstacleKind::Emergency,
                vec![Point::new(350.0, 25.0, 0.0), Point::new(470.0, 50.0, 0.0), Point::new(370.0, 320.0, 0.0)],
                8.0,
                25.0,
            ),
            patrol(
                ObstacleKind::Construction,
                vec![Point::new(166.0, 375.0, 0.0), Point::new(160.0, 200.0, 0.0)],
                0.5,
                15.0,
            ),
        ];
        world.buildings = vec![
            Building { position: Point::new(150.0, 150.0, 0.0), height: 60.0 },
            Building { position: Point::new(155.0, 160.0, 0.0), height: 60.0 },
            Building { position: Point::new(280.0, 300.0, 0.0), height: 35.0 },
            Building { position: Point::new(350.0, 180.0, 0.0), height: 20.0 },
        ];

        let stadium = Point::new(250.0, 420.0, 0.0);
        let (restricted, airport) = airport(Point::new(460.0, 100.0, 0.0), 35.0);
        world.restricted = vec![restricted];
        world.zones = vec![
            airport,
            NoFlyZone::temporary(
                "stadium",
                Circle { center: stadium, radius: 40.0, height: 120.0 },
                ZoneSeverity::Prohibited,
                0,
                300_000,
            ),
            NoFlyZone::dynamic(
                "storm",
                Circle { center: Point::new(300.0, 200.0, 0.0), radius: 60.0, height: 200.0 },
                ZoneSeverity::Caution,
            ),
        ];
        world.population = Population {
            density: 150.0,
            events: vec![PopulationEvent { kind: EventKind::Gathering, location: stadium }],
        };
        world
    }
}
