//! A small kinematic world that flies the fleet for the coordinator: drones
//! follow dispatched routes, batteries drain and recharge, the weather
//! wanders, obstacles patrol and new work keeps arriving.

use std::collections::VecDeque;

use log::{debug, info, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};
use skyfleet_coord::Coordinator;
use skyfleet_planner::zones::NoFlyZone;
use skyfleet_structs::{
    agent::{Agent, AgentStatus, AgentUpdate},
    backend::{Backend, BackendEvent},
    environment::{
        Airspace, Building, Equipment, EnvironmentSnapshot, ObstacleKind, Obstacles, Population, RestrictedZone,
        Sensors, TemporaryObstacle, Weather,
    },
    message::{Message, MessageKind},
    path::{Directive, Waypoint},
    task::{Task, TaskKind},
    AgentId, Point, Timestamp,
};

mod scenario;

/// Percent per second while parked on the pad.
const RECHARGE_RATE: f32 = 1.0;

/// Where each team member holds station around the task location, so that
/// teammates stay clear of each other's safety radius.
const TEAM_OFFSETS: [(f32, f32); 5] = [(0.0, 0.0), (6.0, 0.0), (-6.0, 0.0), (0.0, 6.0), (0.0, -6.0)];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Goal {
    Wait,
    Route,
    Base,
}

pub struct DroneState {
    pub id: AgentId,
    pub base_ground: Point,
    pub base_air: Point,
    pub curr_loc: Point,
    /// m/s
    pub velocity: f32,
    /// Displacement per second over the last step.
    pub heading: Point,
    /// percent
    pub battery_level: f32,
    /// percent per second
    pub battery_consumption_traveling: f32,
    /// percent per second
    pub battery_consumption_hovering: f32,
    pub capabilities: Vec<&'static str>,
    pub payload_capacity: f32,
    pub goal: Goal,
    pub route: Vec<Waypoint>,
    pub curr_waypoint: usize,
    /// Final approach point once the route is flown.
    pub target: Option<Point>,
    pub avoidance: Option<(Point, Timestamp)>,
    pub emergency: bool,
    pub lost: bool,
}

impl DroneState {
    pub fn new(id: impl Into<AgentId>, base_ground: Point, cruise_altitude: f32) -> Self {
        DroneState {
            id: id.into(),
            base_ground,
            base_air: Point { z: cruise_altitude, ..base_ground },
            curr_loc: base_ground,
            velocity: 10.0,
            heading: Point::ZERO,
            battery_level: 100.0,
            battery_consumption_traveling: 0.1, // ~16 minutes on full battery
            battery_consumption_hovering: 0.035, // ~45 minutes on full battery
            capabilities: Vec::new(),
            payload_capacity: 5.0,
            goal: Goal::Wait,
            route: Vec::new(),
            curr_waypoint: 0,
            target: None,
            avoidance: None,
            emergency: false,
            lost: false,
        }
    }

    pub fn with_capabilities(mut self, capabilities: &[&'static str]) -> Self {
        self.capabilities = capabilities.to_vec();
        self
    }

    pub fn on_ground(&self) -> bool {
        self.curr_loc.eq_xyz(&self.base_ground)
    }

    pub fn to_agent(&self) -> Agent {
        Agent::new(self.id.clone(), self.curr_loc)
            .with_capabilities(self.capabilities.iter().copied())
            .with_battery(self.battery_level)
            .with_payload_capacity(self.payload_capacity)
    }

    fn send_home(&mut self) {
        self.goal = Goal::Base;
        self.route.clear();
        self.curr_waypoint = 0;
        self.target = None;
    }
}

/// Patrols its waypoints in a loop.
pub struct ObstacleState {
    pub kind: ObstacleKind,
    pub waypoints: Vec<Point>,
    pub curr_waypoint: usize,
    pub curr_loc: Point,
    pub velocity: f32,
    pub radius: f32,
}

pub struct SimTask {
    pub task: Task,
    pub team: Vec<AgentId>,
    pub on_site_since: Option<Timestamp>,
    pub done: bool,
}

/// Task generation parameters.
pub struct Workload {
    pub sites: Vec<Point>,
    /// 0 disables spawning.
    pub spawn_interval_ms: u64,
    pub delivery_share: f64,
    pub max_team: usize,
    pub lifetime_ms: u64,
    /// Time the whole team must hold station on site.
    pub service_ms: u64,
}

pub struct World {
    pub curr_time: Timestamp,
    pub drones: Vec<DroneState>,
    pub obstacles: Vec<ObstacleState>,
    pub buildings: Vec<Building>,
    pub restricted: Vec<RestrictedZone>,
    pub zones: Vec<NoFlyZone>,
    pub population: Population,
    pub weather: Weather,
    pub workload: Workload,
    pub tasks: Vec<SimTask>,
    pub arrival_radius: f32,
    pub completed: usize,
    pub delivered: usize,
    next_spawn: Timestamp,
    task_counter: usize,
    events: VecDeque<BackendEvent>,
    rng: StdRng,
}

impl World {
    pub fn new(seed: u64, drones: Vec<DroneState>, workload: Workload) -> Self {
        World {
            curr_time: 0,
            drones,
            obstacles: Vec::new(),
            buildings: Vec::new(),
            restricted: Vec::new(),
            zones: Vec::new(),
            population: Population { density: 20.0, events: Vec::new() },
            weather: EnvironmentSnapshot::calm(0).weather,
            workload,
            tasks: Vec::new(),
            arrival_radius: 10.0,
            completed: 0,
            delivered: 0,
            next_spawn: 0,
            task_counter: 0,
            events: VecDeque::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn drone(&self, id: &str) -> Option<&DroneState> {
        self.drones.iter().find(|d| d.id == id)
    }

    /// Registers the fleet, adds the scenario's zones and marks building
    /// columns as occupied on the coordinator's planning grid.
    pub fn install(&self, coordinator: &mut Coordinator) -> skyfleet_structs::Result<()> {
        for d in self.drones.iter() {
            coordinator.register_agent(d.to_agent())?;
        }
        for z in self.zones.iter() {
            coordinator.add_zone(z.clone());
        }
        let grid = coordinator.planner_mut().grid_mut();
        for b in self.buildings.iter() {
            let foot = grid.cell_of(&Point { z: 0.0, ..b.position });
            let top = grid.cell_of(&Point { z: b.height, ..b.position });
            grid.occupy_box(foot, top);
        }
        info!(
            "installed {} drones, {} zones, {} buildings",
            self.drones.len(),
            self.zones.len(),
            self.buildings.len()
        );
        Ok(())
    }

    pub fn simulate(&mut self, dt_ms: u64) {
        let dt = dt_ms as f32 / 1000.0;
        self.curr_time += dt_ms;
        let now = self.curr_time;

        let rng = &mut self.rng;
        let w = &mut self.weather;
        drift(rng, &mut w.wind_speed, 0.3 * dt, 0.0, 25.0);
        drift(rng, &mut w.wind_direction, 5.0 * dt, 0.0, 360.0);
        drift(rng, &mut w.precipitation, 0.1 * dt, 0.0, 10.0);
        drift(rng, &mut w.visibility, 0.1 * dt, 0.5, 10.0);

        // First, move the obstacles
        for o in self.obstacles.iter_mut() {
            let mut dist = dt * o.velocity;
            while go_towards(&mut dist, &mut o.curr_loc, o.waypoints[o.curr_waypoint]) {
                o.curr_waypoint = (o.curr_waypoint + 1) % o.waypoints.len();
                if dist <= 0.0 {
                    break;
                }
            }
        }

        // Then move the drones
        for d in self.drones.iter_mut().filter(|d| !d.lost) {
            let start = d.curr_loc;
            let mut remaining_dist = dt * d.velocity;

            if d.avoidance.is_some_and(|(_, until)| now >= until) {
                d.avoidance = None;
            }
            if let Some((target, _)) = d.avoidance {
                go_towards(&mut remaining_dist, &mut d.curr_loc, target);
            } else {
                match d.goal {
                    Goal::Wait => {}
                    Goal::Route => {
                        while d.curr_waypoint < d.route.len()
                            && go_towards(&mut remaining_dist, &mut d.curr_loc, d.route[d.curr_waypoint].point())
                        {
                            d.curr_waypoint += 1;
                        }
                        if d.curr_waypoint >= d.route.len() {
                            if let Some(target) = d.target {
                                go_towards(&mut remaining_dist, &mut d.curr_loc, target);
                            }
                        }
                    }
                    Goal::Base => {
                        let at_base = d.curr_loc.eq_xy(&d.base_air);
                        let descend = at_base || go_towards(&mut remaining_dist, &mut d.curr_loc, d.base_air);
                        if descend {
                            go_towards(&mut remaining_dist, &mut d.curr_loc, d.base_ground);
                        }
                    }
                }
            }

            let moved = d.curr_loc.sub(&start);
            d.heading = if dt > 0.0 { moved.scale(1.0 / dt) } else { Point::ZERO };

            if d.on_ground() {
                d.battery_level = (d.battery_level + dt * RECHARGE_RATE).min(100.0);
                if d.goal == Goal::Base {
                    d.goal = Goal::Wait;
                }
            } else {
                let rate = if moved.norm() > 1e-3 {
                    d.battery_consumption_traveling
                } else {
                    d.battery_consumption_hovering
                };
                d.battery_level -= dt * rate;
                if d.battery_level <= 0.0 {
                    d.battery_level = 0.0;
                    d.lost = true;
                    warn!("drone {} ran out of battery at {:?}", d.id, d.curr_loc);
                    self.events.push_back(BackendEvent::AgentLost(d.id.clone()));
                }
            }
        }

        self.check_tasks(now);

        if self.workload.spawn_interval_ms > 0 && !self.workload.sites.is_empty() {
            while self.next_spawn <= now {
                self.spawn_task();
                self.next_spawn += self.workload.spawn_interval_ms;
            }
        }
    }

    fn check_tasks(&mut self, now: Timestamp) {
        let drones = &mut self.drones;
        for t in self.tasks.iter_mut().filter(|t| !t.done && !t.team.is_empty()) {
            let members: Vec<usize> =
                t.team.iter().filter_map(|id| drones.iter().position(|d| &d.id == id)).collect();
            let broken = members.len() < t.team.len() || members.iter().any(|i| drones[*i].lost || drones[*i].emergency);
            if broken {
                debug!("task {} abandoned by its team", t.task.id);
                t.done = true;
                for i in members {
                    let d = &mut drones[i];
                    if !d.lost && !d.emergency {
                        d.send_home();
                    }
                }
                continue;
            }

            let on_site = members.iter().all(|i| drones[*i].curr_loc.dist(&t.task.location) <= self.arrival_radius);
            if !on_site {
                t.on_site_since = None;
                continue;
            }
            let since = *t.on_site_since.get_or_insert(now);
            if now - since >= self.workload.service_ms {
                info!("t={} task {} done by {:?}", now, t.task.id, t.team);
                t.done = true;
                self.completed += 1;
                self.events.push_back(BackendEvent::TaskFinished { task: t.task.id.clone(), success: true });
                for i in members.iter() {
                    drones[*i].send_home();
                }
            }
        }
    }

    fn spawn_task(&mut self) {
        let w = &self.workload;
        let site = w.sites[self.rng.random_range(0..w.sites.len())];
        self.task_counter += 1;
        let id = format!("task-{}", self.task_counter);
        let task = if self.rng.random_bool(w.delivery_share) {
            Task::new(id, TaskKind::Delivery, site).with_payload(self.rng.random_range(0.5..3.0))
        } else {
            Task::new(id, TaskKind::Surveillance, site).with_required_agents(self.rng.random_range(1..=w.max_team.max(1)))
        }
        .with_priority(self.rng.random_range(1.0..5.0))
        .with_deadline(self.curr_time + w.lifetime_ms);

        debug!("t={} new task {} ({:?}) at {:?}", self.curr_time, task.id, task.kind, task.location);
        self.tasks.push(SimTask { task: task.clone(), team: Vec::new(), on_site_since: None, done: false });
        self.events.push_back(BackendEvent::NewTask(task));
    }

    fn on_coordination(&mut self, payload: &serde_json::Value) {
        let Some(task_id) = payload["task"].as_str() else { return };
        let Ok(location) = serde_json::from_value::<Point>(payload["location"].clone()) else {
            warn!("coordination message for {} without a location", task_id);
            return;
        };
        let team: Vec<AgentId> = payload["team"]
            .as_array()
            .map(|ids| ids.iter().filter_map(|id| id.as_str().map(str::to_string)).collect())
            .unwrap_or_default();

        for (i, id) in team.iter().enumerate() {
            let (dx, dy) = TEAM_OFFSETS[i % TEAM_OFFSETS.len()];
            if let Some(d) = self.drones.iter_mut().find(|d| &d.id == id) {
                d.target = Some(Point::new(location.x + dx, location.y + dy, location.z));
                d.goal = Goal::Route;
            }
        }
        if let Some(t) = self.tasks.iter_mut().find(|t| t.task.id == task_id) {
            t.team = team;
        }
    }
}

impl Backend for World {
    fn current_time(&self) -> Timestamp {
        self.curr_time
    }

    fn snapshot(&self) -> EnvironmentSnapshot {
        let airborne: Vec<&DroneState> = self.drones.iter().filter(|d| !d.lost && !d.on_ground()).collect();
        let weakest = airborne.iter().map(|d| d.battery_level).fold(100.0f32, f32::min);
        EnvironmentSnapshot {
            timestamp: self.curr_time,
            weather: self.weather.clone(),
            obstacles: Obstacles {
                buildings: self.buildings.clone(),
                power_lines: Vec::new(),
                temporary: self
                    .obstacles
                    .iter()
                    .map(|o| TemporaryObstacle { kind: o.kind, position: o.curr_loc, radius: o.radius })
                    .collect(),
            },
            population: self.population.clone(),
            equipment: Equipment {
                battery_level: weakest,
                signal_strength: 100.0,
                system_health: 100.0,
                sensors: Sensors::ALL_OK,
            },
            airspace: Airspace { restricted_zones: self.restricted.clone(), traffic_density: airborne.len() as f32 },
        }
    }

    fn telemetry(&self) -> Vec<(AgentId, AgentUpdate)> {
        self.drones
            .iter()
            .filter(|d| !d.lost)
            .map(|d| {
                let recovered = d.emergency && d.on_ground() && d.battery_level >= 100.0;
                let update = AgentUpdate {
                    position: Some(d.curr_loc),
                    velocity: Some(d.heading),
                    battery_level: Some(d.battery_level),
                    status: recovered.then_some(AgentStatus::Idle),
                    ..Default::default()
                };
                (d.id.clone(), update)
            })
            .collect()
    }

    fn dispatch(&mut self, directive: Directive) {
        let now = self.curr_time;
        let Some(d) = self.drones.iter_mut().find(|d| d.id == directive.agent()) else {
            warn!("directive for unknown drone {}", directive.agent());
            return;
        };
        match directive {
            Directive::PathUpdate { path, .. } => {
                d.route = path;
                d.curr_waypoint = 0;
                d.goal = Goal::Route;
                d.emergency = false;
            }
            Directive::Avoidance { displacement, duration_ms, .. } => {
                let mut target = d.curr_loc.add(&displacement);
                target.z = target.z.max(0.0);
                d.avoidance = Some((target, now + duration_ms));
            }
        }
    }

    fn next_event(&mut self) -> Option<BackendEvent> {
        self.events.pop_front()
    }

    fn deliver(&mut self, message: Message) {
        self.delivered += 1;
        match message.kind {
            MessageKind::Coordination => self.on_coordination(&message.payload),
            MessageKind::Emergency => {
                let Some(id) = message.payload["agent"].as_str() else { return };
                if let Some(d) = self.drones.iter_mut().find(|d| d.id == id) {
                    info!("drone {} returning to base on emergency", id);
                    d.emergency = true;
                    d.avoidance = None;
                    d.send_home();
                }
            }
            _ => {}
        }
    }
}

fn go_towards(max_dist: &mut f32, source: &mut Point, target: Point) -> bool {
    let dist = source.dist(&target);
    if dist <= *max_dist {
        *max_dist -= dist;
        *source = target;
        true
    } else {
        // dist is greater than what is left of this step
        let scaling = *max_dist / dist;
        *source = source.add(&target.sub(source).scale(scaling));
        *max_dist = 0.0;
        false
    }
}

fn drift(rng: &mut StdRng, value: &mut f32, step: f32, min: f32, max: f32) {
    *value = (*value + rng.random_range(-step..=step)).clamp(min, max);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> World {
        let drones = vec![DroneState::new("d1", Point::new(100.0, 100.0, 0.0), 30.0)];
        World::new(
            7,
            drones,
            Workload {
                sites: vec![Point::new(200.0, 100.0, 30.0)],
                spawn_interval_ms: 10_000,
                delivery_share: 0.0,
                max_team: 1,
                lifetime_ms: 60_000,
                service_ms: 2000,
            },
        )
    }

    fn waypoint(x: f32, y: f32, z: f32) -> Waypoint {
        Waypoint { x, y, z, timestamp: 0, speed: 10.0, heading: 0.0 }
    }

    #[test]
    fn go_towards_stops_short_or_arrives() {
        let mut p = Point::ZERO;
        let mut budget = 3.0;
        assert!(!go_towards(&mut budget, &mut p, Point::new(10.0, 0.0, 0.0)));
        assert_eq!(p, Point::new(3.0, 0.0, 0.0));
        assert_eq!(budget, 0.0);

        let mut budget = 10.0;
        assert!(go_towards(&mut budget, &mut p, Point::new(10.0, 0.0, 0.0)));
        assert_eq!(p, Point::new(10.0, 0.0, 0.0));
        assert!((budget - 3.0).abs() < 1e-5);
    }

    #[test]
    fn spawns_tasks_on_schedule() {
        let mut w = world();
        w.simulate(1000);
        assert!(matches!(w.next_event(), Some(BackendEvent::NewTask(t)) if t.id == "task-1" && t.kind == TaskKind::Surveillance));
        assert!(w.next_event().is_none());
        for _ in 0..9 {
            w.simulate(1000);
        }
        assert!(matches!(w.next_event(), Some(BackendEvent::NewTask(t)) if t.id == "task-2" && t.deadline == 70_000));
    }

    #[test]
    fn follows_route_then_target_and_finishes_task() {
        let mut w = world();
        w.workload.spawn_interval_ms = 0;
        w.tasks.push(SimTask {
            task: Task::new("t", TaskKind::Surveillance, Point::new(150.0, 100.0, 30.0)),
            team: Vec::new(),
            on_site_since: None,
            done: false,
        });
        w.dispatch(Directive::PathUpdate {
            agent: "d1".into(),
            path: vec![waypoint(100.0, 100.0, 0.0), waypoint(100.0, 100.0, 30.0), waypoint(145.0, 100.0, 30.0)],
        });
        let coordination = serde_json::json!({ "task": "t", "team": ["d1"], "location": Point::new(150.0, 100.0, 30.0) });
        w.deliver(Message::new("coordinator", skyfleet_structs::message::Recipient::Agent("d1".into()), MessageKind::Coordination, coordination, 0));
        assert_eq!(w.tasks[0].team, vec!["d1".to_string()]);

        w.simulate(3000);
        let d = w.drone("d1").unwrap();
        assert_eq!(d.curr_loc, Point::new(100.0, 100.0, 30.0));
        assert!(d.battery_level < 100.0);
        let velocity = w.telemetry()[0].1.velocity.unwrap();
        assert!(velocity.eq_xyz(&Point::new(0.0, 0.0, 10.0)));

        // within the arrival radius from 7 s, on the target at 8 s
        for _ in 0..5 {
            w.simulate(1000);
        }
        let d = w.drone("d1").unwrap();
        assert!(d.curr_loc.eq_xyz(&Point::new(150.0, 100.0, 30.0)));
        assert_eq!(d.goal, Goal::Route);
        assert_eq!(w.tasks[0].on_site_since, Some(7000));
        assert!(w.next_event().is_none());

        // service time runs out at 9 s
        w.simulate(1000);
        assert!(matches!(w.next_event(), Some(BackendEvent::TaskFinished { task, success: true }) if task == "t"));
        assert_eq!(w.completed, 1);
        let d = w.drone("d1").unwrap();
        assert!(d.curr_loc.eq_xyz(&Point::new(150.0, 100.0, 30.0)));
        assert_eq!(d.goal, Goal::Base);

        // home, landed and recharging
        for _ in 0..20 {
            w.simulate(1000);
        }
        let d = w.drone("d1").unwrap();
        assert!(d.on_ground());
        assert_eq!(d.goal, Goal::Wait);
    }

    #[test]
    fn avoidance_overrides_route_until_it_expires() {
        let mut w = world();
        w.workload.spawn_interval_ms = 0;
        w.drones[0].curr_loc = Point::new(100.0, 100.0, 30.0);
        w.dispatch(Directive::Avoidance { agent: "d1".into(), displacement: Point::new(0.0, 4.0, 0.0), duration_ms: 3000 });
        w.dispatch(Directive::Avoidance { agent: "ghost".into(), displacement: Point::ZERO, duration_ms: 1 });
        w.simulate(1000);
        assert!(w.drone("d1").unwrap().curr_loc.eq_xyz(&Point::new(100.0, 104.0, 30.0)));
        w.simulate(2000);
        assert!(w.drone("d1").unwrap().avoidance.is_none());
    }

    #[test]
    fn emergency_sends_drone_home_and_recovers_when_charged() {
        let mut w = world();
        w.workload.spawn_interval_ms = 0;
        w.drones[0].curr_loc = Point::new(100.0, 100.0, 30.0);
        w.drones[0].battery_level = 9.0;
        let payload = serde_json::json!({ "agent": "d1", "battery": 9.0 });
        w.deliver(Message::new("coordinator", skyfleet_structs::message::Recipient::Broadcast, MessageKind::Emergency, payload, 0));
        assert_eq!(w.delivered, 1);

        w.simulate(5000);
        assert!(w.drone("d1").unwrap().on_ground());
        assert_eq!(w.telemetry()[0].1.status, None);
        for _ in 0..100 {
            w.simulate(1000);
        }
        assert_eq!(w.telemetry()[0].1.status, Some(AgentStatus::Idle));
    }

    #[test]
    fn empty_battery_loses_the_drone() {
        let mut w = world();
        w.workload.spawn_interval_ms = 0;
        w.drones[0].curr_loc = Point::new(100.0, 100.0, 30.0);
        w.drones[0].battery_level = 0.05;
        w.simulate(2000);
        assert!(w.drone("d1").unwrap().lost);
        assert_eq!(w.next_event(), Some(BackendEvent::AgentLost("d1".into())));
        assert!(w.telemetry().is_empty());
    }

    #[test]
    fn snapshot_reflects_the_world() {
        let mut w = World::small(3);
        w.simulate(1000);
        let s = w.snapshot();
        s.validate().unwrap();
        assert_eq!(s.timestamp, 1000);
        assert_eq!(s.obstacles.temporary.len(), w.obstacles.len());
        assert_eq!(s.airspace.traffic_density, 0.0);
        assert_eq!(s.equipment.battery_level, 100.0);
    }
}
