use std::collections::{BTreeMap, HashMap, VecDeque};

use log::{debug, info, warn};
use rand::{rngs::StdRng, SeedableRng};
use serde::Serialize;
use serde_json::json;
use skyfleet_planner::{
    reservation::ReservationTable,
    terms::{FleetView, OtherAgent},
    waypoints::to_waypoints,
    zones::{AirspaceMap, NoFlyZone, ZoneOverlay},
    PathPlanner, PlanContext, RiskMap,
};
use skyfleet_risk::{ForecastPoint, RiskAssessment, RiskEngine};
use skyfleet_structs::{
    agent::{Agent, AgentStatus, AgentUpdate},
    conflict::ConflictRecord,
    environment::EnvironmentSnapshot,
    message::{Message, MessageKind, Recipient},
    path::{Directive, Path},
    task::{Task, TaskKind, TaskStatus},
    AgentId, FleetError, Point, Result, TaskId, Timestamp,
};

use crate::{
    assign::TaskAssigner,
    config::CoordinatorConfig,
    conflict::{project, ConflictResolver, ProjectedPathOverlap, ResolveContext},
};

/// Sender of messages that originate in the coordinator.
pub const COORDINATOR_ID: &str = "coordinator";

#[derive(Clone, Copy, Serialize, Debug, PartialEq)]
pub struct FleetStatus {
    pub total_agents: usize,
    pub active_agents: usize,
    pub active_tasks: usize,
    pub pending_messages: usize,
    pub recent_conflicts: usize,
    /// Share of registered agents that are not idle.
    pub system_load: f32,
}

/// Immutable copy of the coordinator state for renderers, taken between ticks.
#[derive(Clone, Serialize, Debug)]
pub struct FleetSnapshot {
    pub timestamp: Timestamp,
    pub agents: Vec<Agent>,
    pub tasks: Vec<Task>,
    pub routes: BTreeMap<AgentId, Path>,
    pub zones: Vec<NoFlyZone>,
    pub assessment: Option<RiskAssessment>,
    pub forecast: Vec<ForecastPoint>,
    pub status: FleetStatus,
}

/// Owns the agent, task and message registries and runs the decision
/// pipeline once per tick. Not thread safe: hosts serialize calls.
pub struct Coordinator {
    config: CoordinatorConfig,
    agents: Vec<Agent>,
    tasks: Vec<Task>,
    messages: VecDeque<Message>,
    directives: Vec<Directive>,
    routes: HashMap<AgentId, Path>,
    resolver: ConflictResolver,
    assigner: TaskAssigner,
    planner: PathPlanner,
    airspace: AirspaceMap,
    risk: RiskEngine,
    environment: Option<EnvironmentSnapshot>,
    assessment: Option<RiskAssessment>,
    forecast: Vec<ForecastPoint>,
    risk_map: RiskMap,
    rng: StdRng,
    now: Timestamp,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig) -> Result<Self> {
        config.validate()?;
        let planner = PathPlanner::new(config.planner.clone())?;
        let risk = RiskEngine::new(config.risk.clone())?;
        Ok(Coordinator {
            risk_map: RiskMap::new(planner.grid().size()),
            resolver: ConflictResolver::new(config.safety_radius).with_predicate(ProjectedPathOverlap::default()),
            assigner: TaskAssigner::new(config.assigner.clone()),
            rng: StdRng::seed_from_u64(config.seed),
            planner,
            risk,
            config,
            agents: Vec::new(),
            tasks: Vec::new(),
            messages: VecDeque::new(),
            directives: Vec::new(),
            routes: HashMap::new(),
            airspace: AirspaceMap::new(),
            environment: None,
            assessment: None,
            forecast: Vec::new(),
            now: 0,
        })
    }

    pub fn with_resolver(mut self, resolver: ConflictResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_assigner(mut self, assigner: TaskAssigner) -> Self {
        self.assigner = assigner;
        self
    }

    pub fn with_planner(mut self, planner: PathPlanner) -> Self {
        self.risk_map = RiskMap::new(planner.grid().size());
        self.planner = planner;
        self
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// In registration order.
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent(&self, id: &str) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id == id)
    }

    /// In queue order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn route(&self, agent: &str) -> Option<&Path> {
        self.routes.get(agent)
    }

    pub fn assessment(&self) -> Option<&RiskAssessment> {
        self.assessment.as_ref()
    }

    pub fn forecast(&self) -> &[ForecastPoint] {
        &self.forecast
    }

    pub fn risk_map(&self) -> &RiskMap {
        &self.risk_map
    }

    pub fn risk_engine(&self) -> &RiskEngine {
        &self.risk
    }

    pub fn airspace(&self) -> &AirspaceMap {
        &self.airspace
    }

    pub fn planner(&self) -> &PathPlanner {
        &self.planner
    }

    pub fn planner_mut(&mut self) -> &mut PathPlanner {
        &mut self.planner
    }

    pub fn conflict_history(&self) -> &[ConflictRecord] {
        self.resolver.history()
    }

    pub fn register_agent(&mut self, agent: Agent) -> Result<()> {
        if agent.id.is_empty() {
            return Err(FleetError::missing("id"));
        }
        if !agent.position.is_finite() || !agent.velocity.is_finite() {
            return Err(FleetError::invalid("position", "non-finite coordinate"));
        }
        if !agent.battery_level.is_finite() || !agent.payload_capacity.is_finite() {
            return Err(FleetError::invalid("battery_level", "non-finite value"));
        }
        if self.agent(&agent.id).is_some() {
            return Err(FleetError::invalid("id", format!("agent {} is already registered", agent.id)));
        }
        info!("agent {} registered at {:?}", agent.id, agent.position);
        self.agents.push(agent);
        Ok(())
    }

    /// Removes the agent. Any task it was working fails and its teammates
    /// return to the idle pool.
    pub fn unregister_agent(&mut self, id: &str) -> Result<Agent> {
        let idx = self.agent_index(id)?;
        self.abandon_tasks(id, "unregistered");
        self.routes.remove(id);
        let agent = self.agents.remove(idx);
        info!("agent {} unregistered", id);
        Ok(agent)
    }

    pub fn update_agent(&mut self, id: &str, update: AgentUpdate) -> Result<()> {
        update.validate()?;
        let idx = self.agent_index(id)?;
        update.apply(&mut self.agents[idx], self.now);
        Ok(())
    }

    pub fn enqueue_task(&mut self, task: Task) -> Result<()> {
        task.validate()?;
        if self.task(&task.id).is_some() {
            return Err(FleetError::invalid("id", format!("task {} is already queued", task.id)));
        }
        info!("task {} ({:?}, priority {}) queued", task.id, task.kind, task.priority);
        self.tasks.push(task);
        Ok(())
    }

    /// Closes a task and frees its agents.
    pub fn complete_task(&mut self, id: &str, success: bool) -> Result<()> {
        let task = self.tasks.iter_mut().find(|t| t.id == id).ok_or_else(|| FleetError::task_not_found(id))?;
        if task.status.is_finished() {
            return Err(FleetError::invalid("status", format!("task {} is already {:?}", id, task.status)));
        }
        task.status = if success { TaskStatus::Completed } else { TaskStatus::Failed };
        info!("task {} {:?}", id, task.status);
        let team = task.assigned_agents.clone();
        self.release(&team);
        Ok(())
    }

    pub fn add_zone(&mut self, zone: NoFlyZone) {
        debug!("zone {} added", zone.id);
        self.airspace.add(zone);
    }

    pub fn remove_zone(&mut self, id: &str) -> Option<NoFlyZone> {
        self.airspace.remove(id)
    }

    /// Latest sensed conditions; risk is reassessed on the next tick.
    pub fn update_environment(&mut self, snapshot: EnvironmentSnapshot) -> Result<()> {
        snapshot.validate()?;
        self.environment = Some(snapshot);
        Ok(())
    }

    /// Plans and stores a route for one agent, avoiding the routes of the
    /// others. An empty path means no route was found.
    pub fn plan_route(&mut self, id: &str, goal: Point) -> Result<Path> {
        let idx = self.agent_index(id)?;
        if !goal.is_finite() {
            return Err(FleetError::invalid("goal", "non-finite coordinate"));
        }
        let overlay = self.airspace.overlay(self.planner.grid(), self.now);
        let path = self.plan_for(idx, goal, &overlay);
        self.store_route(id, path.clone());
        Ok(path)
    }

    /// Runs one decision step at time `now`.
    pub fn tick(&mut self, now: Timestamp) {
        self.now = now;
        self.refresh(now);
        self.resolve_conflicts(now);
        self.assign_tasks(now);
        self.reassess_risk();
    }

    pub fn get_status(&self) -> FleetStatus {
        let total_agents = self.agents.len();
        let active_agents = self.agents.iter().filter(|a| a.is_active()).count();
        FleetStatus {
            total_agents,
            active_agents,
            active_tasks: self.tasks.iter().filter(|t| t.status.is_active()).count(),
            pending_messages: self.messages.len(),
            recent_conflicts: self.resolver.recent_conflicts(self.now, self.config.recent_conflict_window_ms),
            system_load: if total_agents == 0 { 0.0 } else { active_agents as f32 / total_agents as f32 },
        }
    }

    pub fn drain_messages(&mut self) -> Vec<Message> {
        self.messages.drain(..).collect()
    }

    pub fn drain_directives(&mut self) -> Vec<Directive> {
        std::mem::take(&mut self.directives)
    }

    pub fn snapshot(&self) -> FleetSnapshot {
        FleetSnapshot {
            timestamp: self.now,
            agents: self.agents.clone(),
            tasks: self.tasks.clone(),
            routes: self.routes.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            zones: self.airspace.zones().to_vec(),
            assessment: self.assessment.clone(),
            forecast: self.forecast.clone(),
            status: self.get_status(),
        }
    }

    fn agent_index(&self, id: &str) -> Result<usize> {
        self.agents.iter().position(|a| a.id == id).ok_or_else(|| FleetError::agent_not_found(id))
    }

    fn broadcast(&mut self, kind: MessageKind, payload: serde_json::Value) {
        self.messages.push_back(Message::new(COORDINATOR_ID, Recipient::Broadcast, kind, payload, self.now));
    }

    fn send(&mut self, to: &str, kind: MessageKind, payload: serde_json::Value) {
        self.messages.push_back(Message::new(COORDINATOR_ID, Recipient::Agent(to.to_string()), kind, payload, self.now));
    }

    fn store_route(&mut self, id: &str, path: Path) {
        if path.is_empty() {
            return;
        }
        self.directives.push(Directive::PathUpdate { agent: id.to_string(), path: to_waypoints(&path) });
        self.routes.insert(id.to_string(), path);
    }

    /// Returns the agents to the idle pool.
    fn release(&mut self, team: &[AgentId]) {
        for id in team {
            self.routes.remove(id);
            if let Some(agent) = self.agents.iter_mut().find(|a| &a.id == id) {
                if agent.status != AgentStatus::Emergency {
                    agent.status = AgentStatus::Idle;
                }
                agent.destination = None;
            }
        }
    }

    /// Fails every active task `id` is working and releases its teammates.
    fn abandon_tasks(&mut self, id: &str, reason: &str) {
        let mut freed = Vec::new();
        for task in self.tasks.iter_mut().filter(|t| t.status.is_active() && t.assigned_agents.iter().any(|a| a == id)) {
            warn!("task {} failed: agent {} {}", task.id, id, reason);
            task.status = TaskStatus::Failed;
            freed.extend(task.assigned_agents.iter().filter(|a| *a != id).cloned());
        }
        self.release(&freed);
    }

    fn fleet_view(&self) -> FleetView {
        let grid = self.planner.grid();
        FleetView {
            cell_size: grid.cell_size(),
            others: self
                .agents
                .iter()
                .map(|a| OtherAgent {
                    id: a.id.clone(),
                    cell: grid.cell_of(&a.position),
                    destination: a.destination.map(|d| grid.cell_of(&d)),
                    route: self
                        .routes
                        .get(&a.id)
                        .map(|r| r.iter().map(|n| grid.cell_of(&n.point())).collect())
                        .unwrap_or_default(),
                })
                .collect(),
        }
    }

    fn plan_for(&self, idx: usize, goal: Point, overlay: &ZoneOverlay) -> Path {
        let agent = &self.agents[idx];
        let grid = self.planner.grid();
        let mut reservations = ReservationTable::new();
        for (other, route) in self.routes.iter().filter(|(other, _)| **other != agent.id) {
            reservations.reserve_path(other, route, grid, self.planner.config().reservation_hold_ms);
        }
        let fleet = self.fleet_view();
        let ctx = PlanContext {
            overlay: Some(overlay),
            reservations: Some(&reservations),
            fleet: Some(&fleet),
            depart_at: self.now,
        };
        self.planner.plan_with(agent, agent.position, goal, &self.risk_map, &ctx)
    }

    fn refresh(&mut self, now: Timestamp) {
        let expired = self.airspace.expire(now);
        if !expired.is_empty() {
            debug!("t={} zones expired: {:?}", now, expired);
        }
        self.airspace.drift_dynamic(&mut self.rng, self.config.dynamic_zone_drift);

        for agent in self.agents.iter_mut() {
            if agent.avoidance.is_some_and(|m| m.until <= now) {
                debug!("agent {} back on course", agent.id);
                agent.avoidance = None;
            }
        }

        let critical: Vec<(AgentId, f32, Point)> = self
            .agents
            .iter()
            .filter(|a| a.battery_level <= self.config.critical_battery && a.status != AgentStatus::Emergency)
            .map(|a| (a.id.clone(), a.battery_level, a.position))
            .collect();
        for (id, battery, position) in critical {
            warn!("agent {} declares an emergency at {:.1}% battery", id, battery);
            if let Some(agent) = self.agents.iter_mut().find(|a| a.id == id) {
                agent.status = AgentStatus::Emergency;
                agent.destination = None;
            }
            self.routes.remove(&id);
            self.abandon_tasks(&id, "declared an emergency");
            self.broadcast(MessageKind::Emergency, json!({ "agent": id, "battery": battery, "position": position }));
        }

        let mut arrived = Vec::new();
        for task in self.tasks.iter_mut().filter(|t| t.status == TaskStatus::Assigned) {
            let on_site = task.assigned_agents.iter().all(|id| {
                self.agents
                    .iter()
                    .find(|a| &a.id == id)
                    .is_some_and(|a| a.position.dist(&task.location) <= self.config.arrival_radius)
            });
            if on_site {
                task.status = TaskStatus::Executing;
                info!("task {} executing", task.id);
                if task.kind == TaskKind::Delivery {
                    arrived.extend(task.assigned_agents.iter().cloned());
                }
            }
        }
        for agent in self.agents.iter_mut().filter(|a| arrived.contains(&a.id)) {
            agent.status = AgentStatus::Delivering;
        }

        let positions: Vec<serde_json::Value> = self
            .agents
            .iter()
            .filter(|a| a.is_active())
            .map(|a| json!({ "agent": a.id, "position": a.position, "velocity": a.velocity, "status": a.status }))
            .collect();
        for payload in positions {
            self.broadcast(MessageKind::Position, payload);
        }
    }

    fn resolve_conflicts(&mut self, now: Timestamp) {
        let horizon = self.config.projection_horizon_ms;
        let projections: HashMap<AgentId, Path> =
            self.agents.iter().map(|a| (a.id.clone(), project(a, self.routes.get(&a.id), now, horizon))).collect();
        let teams: HashMap<AgentId, TaskId> = self
            .tasks
            .iter()
            .filter(|t| t.status.is_active())
            .flat_map(|t| t.assigned_agents.iter().map(|a| (a.clone(), t.id.clone())))
            .collect();

        let conflicts = self.resolver.detect(&self.agents, &projections, &teams, now);
        if conflicts.is_empty() {
            return;
        }
        let overlay = self.airspace.overlay(self.planner.grid(), now);
        let ctx = ResolveContext { planner: &self.planner, risk_map: &self.risk_map, overlay: Some(&overlay) };
        let directives = self.resolver.resolve(&conflicts, &mut self.agents, &mut self.routes, &ctx, now);
        self.directives.extend(directives);

        for c in conflicts.iter() {
            let (a, b) = &c.agents;
            for (to, other) in [(a, b), (b, a)] {
                self.send(to, MessageKind::Warning, json!({ "conflict": c.kind, "with": other, "severity": c.severity }));
            }
        }
    }

    fn assign_tasks(&mut self, now: Timestamp) {
        let outcome = self.assigner.assign(&mut self.tasks, &mut self.agents, now);
        if outcome.assigned.is_empty() {
            return;
        }
        let overlay = self.airspace.overlay(self.planner.grid(), now);
        for assignment in outcome.assigned {
            let Some(location) = self.task(&assignment.task).map(|t| t.location) else {
                continue;
            };
            for id in assignment.agents.iter() {
                let Ok(idx) = self.agent_index(id) else {
                    continue;
                };
                let path = self.plan_for(idx, location, &overlay);
                if path.is_empty() {
                    warn!("agent {}: no route to task {}, flying direct", id, assignment.task);
                }
                self.store_route(id, path);
                self.send(
                    id,
                    MessageKind::Coordination,
                    json!({ "task": assignment.task, "team": assignment.agents, "location": location }),
                );
            }
        }
    }

    fn reassess_risk(&mut self) {
        let Some(env) = self.environment.as_ref() else {
            return;
        };
        let assessment = self.risk.assess(env);
        self.forecast = self.risk.forecast(env, self.config.forecast_horizon_secs);
        self.risk_map = RiskMap::from_assessment(self.planner.grid(), &assessment, env);
        debug!(
            "risk reassessed: overall {:.3}, confidence {:.2}, peak cell {:.2}",
            assessment.overall,
            assessment.confidence,
            self.risk_map.max()
        );
        self.assessment = Some(assessment);
    }
}
