use std::collections::HashMap;

use log::{debug, info, warn};
use skyfleet_planner::{
    reservation::ReservationTable, waypoints::to_waypoints, zones::ZoneOverlay, PathPlanner, PlanContext, RiskMap,
};
use skyfleet_structs::{
    agent::{Agent, AvoidanceManeuver},
    conflict::{Conflict, ConflictKind, ConflictRecord},
    path::{Directive, Path, PathNode},
    AgentId, Point, TaskId, Timestamp,
};

/// Shortest avoidance manoeuvre.
pub const MIN_AVOIDANCE_MS: u64 = 3000;
/// Severity of a conflict at zero separation.
pub const MAX_SEVERITY: f32 = 10.0;
const PROJECTION_STEP_MS: u64 = 1000;

pub fn severity(distance: f32) -> f32 {
    (MAX_SEVERITY - distance).max(0.0)
}

/// Decides whether two projected paths conflict, returning the severity.
pub trait PathConflictPredicate {
    fn conflict(&self, a: &[PathNode], b: &[PathNode], safety_radius: f32) -> Option<f32>;
}

/// Only proximity conflicts are ever reported.
#[derive(Clone, Copy, Debug, Default)]
pub struct NeverConflicts;

impl PathConflictPredicate for NeverConflicts {
    fn conflict(&self, _a: &[PathNode], _b: &[PathNode], _safety_radius: f32) -> Option<f32> {
        None
    }
}

/// Two paths conflict when they pass within the safety radius of each other
/// at times no further apart than `time_tolerance_ms`.
#[derive(Clone, Copy, Debug)]
pub struct ProjectedPathOverlap {
    pub time_tolerance_ms: u64,
}

impl Default for ProjectedPathOverlap {
    fn default() -> Self {
        ProjectedPathOverlap { time_tolerance_ms: 1000 }
    }
}

impl PathConflictPredicate for ProjectedPathOverlap {
    fn conflict(&self, a: &[PathNode], b: &[PathNode], safety_radius: f32) -> Option<f32> {
        let mut closest: Option<f32> = None;
        for na in a {
            for nb in b.iter().filter(|nb| nb.timestamp.abs_diff(na.timestamp) <= self.time_tolerance_ms) {
                let d = na.point().dist(&nb.point());
                if d < safety_radius {
                    closest = Some(closest.map_or(d, |c: f32| c.min(d)));
                }
            }
        }
        closest.map(severity)
    }
}

/// Where an agent is expected to be over the next `horizon_ms`: the part of
/// its route not yet flown, or else its velocity extrapolated in one second
/// steps.
pub fn project(agent: &Agent, route: Option<&Path>, now: Timestamp, horizon_ms: u64) -> Path {
    let ahead: Path = route
        .map(|r| r.iter().filter(|n| n.timestamp >= now && n.timestamp <= now + horizon_ms).copied().collect())
        .unwrap_or_default();
    if !ahead.is_empty() {
        return ahead;
    }
    (0..=horizon_ms / PROJECTION_STEP_MS)
        .map(|i| {
            let dt = i * PROJECTION_STEP_MS;
            let p = agent.position.add(&agent.velocity.scale(dt as f32 / 1000.0));
            PathNode { x: p.x, y: p.y, z: p.z, cost: 0.0, risk: 0.0, timestamp: now + dt }
        })
        .collect()
}

/// Planning resources borrowed from the coordinator for rerouting.
pub struct ResolveContext<'a> {
    pub planner: &'a PathPlanner,
    pub risk_map: &'a RiskMap,
    pub overlay: Option<&'a ZoneOverlay>,
}

pub struct ConflictResolver {
    safety_radius: f32,
    predicate: Box<dyn PathConflictPredicate>,
    history: Vec<ConflictRecord>,
}

impl ConflictResolver {
    pub fn new(safety_radius: f32) -> Self {
        ConflictResolver { safety_radius, predicate: Box::new(NeverConflicts), history: Vec::new() }
    }

    pub fn with_predicate(mut self, predicate: impl PathConflictPredicate + 'static) -> Self {
        self.predicate = Box::new(predicate);
        self
    }

    pub fn safety_radius(&self) -> f32 {
        self.safety_radius
    }

    /// Checks every unordered pair once, in registration order. A pair that
    /// is already too close is not checked for a path conflict, and agents
    /// working the same task (per `teams`) never path-conflict with each other.
    pub fn detect(
        &self,
        agents: &[Agent],
        projections: &HashMap<AgentId, Path>,
        teams: &HashMap<AgentId, TaskId>,
        now: Timestamp,
    ) -> Vec<Conflict> {
        let mut conflicts = Vec::new();
        for (i, a) in agents.iter().enumerate() {
            for b in agents[i + 1..].iter() {
                let pair = (a.id.clone(), b.id.clone());
                let d = a.position.dist(&b.position);
                if d < self.safety_radius {
                    conflicts.push(Conflict { kind: ConflictKind::Position, agents: pair, severity: severity(d), timestamp: now });
                    continue;
                }
                if teams.get(&a.id).is_some_and(|t| teams.get(&b.id) == Some(t)) {
                    continue;
                }
                let (Some(pa), Some(pb)) = (projections.get(&a.id), projections.get(&b.id)) else {
                    continue;
                };
                if let Some(severity) = self.predicate.conflict(pa, pb, self.safety_radius) {
                    conflicts.push(Conflict { kind: ConflictKind::Path, agents: pair, severity, timestamp: now });
                }
            }
        }
        if !conflicts.is_empty() {
            debug!("t={} detected {} conflicts among {} agents", now, conflicts.len(), agents.len());
        }
        conflicts
    }

    /// Resolves conflicts in detection order and archives each one.
    pub fn resolve(
        &mut self,
        conflicts: &[Conflict],
        agents: &mut [Agent],
        routes: &mut HashMap<AgentId, Path>,
        ctx: &ResolveContext,
        now: Timestamp,
    ) -> Vec<Directive> {
        let mut directives = Vec::new();
        for conflict in conflicts {
            let resolved = match conflict.kind {
                ConflictKind::Position => self.resolve_position(conflict, agents, now, &mut directives),
                ConflictKind::Path => self.resolve_path(conflict, agents, routes, ctx, now, &mut directives),
            };
            self.history.push(ConflictRecord { conflict: conflict.clone(), resolved, resolved_at: now });
        }
        directives
    }

    fn resolve_position(
        &self,
        conflict: &Conflict,
        agents: &mut [Agent],
        now: Timestamp,
        directives: &mut Vec<Directive>,
    ) -> bool {
        let (Some(ia), Some(ib)) = (index_of(agents, &conflict.agents.0), index_of(agents, &conflict.agents.1)) else {
            warn!("conflict {:?} refers to unknown agents", conflict.agents);
            return false;
        };
        // Ties go to the agent registered first.
        let (keeper, yielder) = if agents[ia].priority >= agents[ib].priority { (ia, ib) } else { (ib, ia) };

        let away = agents[yielder].position.sub(&agents[keeper].position);
        let distance = away.norm();
        let direction = away.normalized().unwrap_or(Point::new(0.0, 0.0, 1.0));
        let displacement = direction.scale(self.safety_radius - distance + 1.0);
        let duration_ms = MIN_AVOIDANCE_MS.max((conflict.severity * 1000.0) as u64);

        agents[yielder].avoidance = Some(AvoidanceManeuver { displacement, until: now + duration_ms });
        info!(
            "agent {} yields to {}: avoid by {:?} for {} ms",
            agents[yielder].id, agents[keeper].id, displacement, duration_ms
        );
        directives.push(Directive::Avoidance { agent: agents[yielder].id.clone(), displacement, duration_ms });
        true
    }

    fn resolve_path(
        &self,
        conflict: &Conflict,
        agents: &[Agent],
        routes: &mut HashMap<AgentId, Path>,
        ctx: &ResolveContext,
        now: Timestamp,
        directives: &mut Vec<Directive>,
    ) -> bool {
        let (a, b) = (&conflict.agents.0, &conflict.agents.1);
        let mut resolved = true;
        for (id, other) in [(a, b), (b, a)] {
            let Some(agent) = agents.iter().find(|x| &x.id == id) else {
                warn!("conflict {:?} refers to unknown agent {}", conflict.agents, id);
                resolved = false;
                continue;
            };
            let goal = agent.destination.or_else(|| routes.get(id).and_then(|r| r.last()).map(|n| n.point()));
            let Some(goal) = goal else {
                debug!("agent {} has nowhere to go, keeping course", id);
                continue;
            };

            let mut reservations = ReservationTable::new();
            if let Some(route) = routes.get(other) {
                reservations.reserve_path(other, route, ctx.planner.grid(), ctx.planner.config().reservation_hold_ms);
            }
            let plan_ctx = PlanContext {
                overlay: ctx.overlay,
                reservations: Some(&reservations),
                fleet: None,
                depart_at: now,
            };
            let path = ctx.planner.plan_with(agent, agent.position, goal, ctx.risk_map, &plan_ctx);
            if path.is_empty() {
                warn!("agent {}: no reroute around {}", id, other);
                resolved = false;
                continue;
            }
            debug!("agent {} rerouted around {} with {} nodes", id, other, path.len());
            directives.push(Directive::PathUpdate { agent: id.clone(), path: to_waypoints(&path) });
            routes.insert(id.clone(), path);
        }
        resolved
    }

    /// Append-only log of every conflict processed.
    pub fn history(&self) -> &[ConflictRecord] {
        &self.history
    }

    /// Conflicts detected within the last `window_ms`.
    pub fn recent_conflicts(&self, now: Timestamp, window_ms: u64) -> usize {
        let since = now.saturating_sub(window_ms);
        self.history.iter().filter(|r| r.conflict.timestamp >= since).count()
    }
}

fn index_of(agents: &[Agent], id: &str) -> Option<usize> {
    agents.iter().position(|a| a.id == id)
}
