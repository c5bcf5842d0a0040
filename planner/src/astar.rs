use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use log::{debug, trace, warn};
use ordered_float::OrderedFloat;
use skyfleet_structs::{
    agent::Agent,
    path::{Path, PathNode},
    Point, Timestamp,
};

use crate::{
    config::PlannerConfig,
    grid::{Cell, Grid},
    reservation::ReservationTable,
    risk_map::RiskMap,
    terms::{CostTerms, FleetView, NeutralTerms},
    zones::ZoneOverlay,
};

/// Edge costs never drop below this, whatever the collaboration bonus.
const MIN_EDGE_COST: f32 = 0.1;

/// Everything besides the static grid that shapes one search.
#[derive(Default, Clone, Copy)]
pub struct PlanContext<'a> {
    pub overlay: Option<&'a ZoneOverlay>,
    pub reservations: Option<&'a ReservationTable>,
    pub fleet: Option<&'a FleetView>,
    pub depart_at: Timestamp,
}

/// Open-set entry. Ordering picks the lowest f, then the lowest h, then the
/// earliest insertion.
type OpenEntry = Reverse<(OrderedFloat<f32>, OrderedFloat<f32>, u64, Cell)>;

pub struct PathPlanner {
    grid: Grid,
    config: PlannerConfig,
    terms: Box<dyn CostTerms>,
}

impl PathPlanner {
    pub fn new(config: PlannerConfig) -> skyfleet_structs::Result<Self> {
        let grid = Grid::new(config.grid_size, config.cell_size)?;
        Ok(Self::with_grid(grid, config))
    }

    /// Uses the grid as given; `config.grid_size` and `config.cell_size` are
    /// overwritten to match it.
    pub fn with_grid(grid: Grid, mut config: PlannerConfig) -> Self {
        config.grid_size = grid.size();
        config.cell_size = grid.cell_size();
        PathPlanner { grid, config, terms: Box::new(NeutralTerms) }
    }

    pub fn with_terms(mut self, terms: impl CostTerms + 'static) -> Self {
        self.terms = Box::new(terms);
        self
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Time to cross one cell at the agent's current speed.
    pub fn step_ms(&self, agent: &Agent) -> u64 {
        let speed = if agent.speed() > 1e-3 { agent.speed() } else { self.config.default_speed };
        ((self.grid.cell_size() / speed.max(1e-3)) * 1000.0).round().max(1.0) as u64
    }

    pub fn plan(&self, agent: &Agent, start: Point, goal: Point, risk_map: &RiskMap) -> Path {
        let ctx = PlanContext { depart_at: agent.last_update, ..Default::default() };
        self.plan_with(agent, start, goal, risk_map, &ctx)
    }

    pub fn plan_with(&self, agent: &Agent, start: Point, goal: Point, risk_map: &RiskMap, ctx: &PlanContext) -> Path {
        #[cfg(feature = "prof")]
        let _p = hprof::enter("plan");

        let empty_fleet = FleetView { cell_size: self.grid.cell_size(), others: Vec::new() };
        let fleet = ctx.fleet.unwrap_or(&empty_fleet);
        let start_cell = self.grid.cell_of(&start);
        let goal_cell = self.grid.cell_of(&goal);
        let step_ms = self.step_ms(agent);

        if !self.passable(&start_cell, ctx) {
            warn!("agent {}: start {:?} is outside the grid or blocked", agent.id, start_cell);
            return Vec::new();
        }
        if self.grid.in_bounds(&goal_cell) && !self.passable(&goal_cell, ctx) {
            debug!("agent {}: goal {:?} is blocked", agent.id, goal_cell);
            return Vec::new();
        }

        let cell_size = self.grid.cell_size();
        let h = |c: &Cell| self.grid.center_of(c).dist(&goal) / cell_size;

        let mut open: BinaryHeap<OpenEntry> = BinaryHeap::new();
        let mut best_g: HashMap<Cell, f32> = HashMap::new();
        let mut hops: HashMap<Cell, u32> = HashMap::new();
        let mut parent: HashMap<Cell, Cell> = HashMap::new();
        let mut closed: HashSet<Cell> = HashSet::new();
        let mut seq: u64 = 0;
        let mut expansions: usize = 0;

        best_g.insert(start_cell, 0.0);
        hops.insert(start_cell, 0);
        open.push(Reverse((OrderedFloat(h(&start_cell)), OrderedFloat(h(&start_cell)), seq, start_cell)));

        while let Some(Reverse((_, _, _, cell))) = open.pop() {
            if !closed.insert(cell) {
                continue;
            }
            expansions += 1;
            if self.config.max_expansions.is_some_and(|max| expansions > max) {
                warn!(
                    "agent {}: search budget of {} expansions exhausted before reaching {:?}",
                    agent.id, expansions - 1, goal_cell
                );
                return Vec::new();
            }

            if self.at_goal(&cell, &goal) {
                let path = self.reconstruct(cell, start, &parent, &best_g, &hops, risk_map, ctx, step_ms);
                debug!(
                    "agent {}: path {:?} -> {:?} with {} nodes, cost {:.2}, {} expansions",
                    agent.id,
                    start_cell,
                    cell,
                    path.len(),
                    best_g[&cell],
                    expansions
                );
                return path;
            }

            let g = best_g[&cell];
            let hop = hops[&cell];
            trace!("expand {:?} g={:.2} hop={}", cell, g, hop);

            for next in self.grid.neighbors(&cell) {
                if closed.contains(&next) || ctx.overlay.is_some_and(|o| o.is_blocked(&next)) {
                    continue;
                }
                let arrival = ctx.depart_at + (hop as u64 + 1) * step_ms;
                let next_g = g + self.edge_cost(&cell, &next, arrival, agent, risk_map, ctx, fleet);
                if best_g.get(&next).is_some_and(|old| next_g >= *old) {
                    continue;
                }
                best_g.insert(next, next_g);
                hops.insert(next, hop + 1);
                parent.insert(next, cell);
                seq += 1;
                let next_h = h(&next);
                open.push(Reverse((OrderedFloat(next_g + next_h), OrderedFloat(next_h), seq, next)));
            }
        }

        warn!("agent {}: no route from {:?} to {:?} ({} expansions)", agent.id, start_cell, goal_cell, expansions);
        Vec::new()
    }

    fn passable(&self, c: &Cell, ctx: &PlanContext) -> bool {
        self.grid.is_free(c) && !ctx.overlay.is_some_and(|o| o.is_blocked(c))
    }

    /// Within one cell of the goal on every axis.
    fn at_goal(&self, c: &Cell, goal: &Point) -> bool {
        let p = self.grid.center_of(c);
        let s = self.grid.cell_size();
        (p.x - goal.x).abs() < s && (p.y - goal.y).abs() < s && (p.z - goal.z).abs() < s
    }

    fn risk(&self, c: &Cell, risk_map: &RiskMap, ctx: &PlanContext) -> f32 {
        let extra = ctx.overlay.map(|o| o.risk(c)).unwrap_or(0.0);
        (risk_map.get(c) + extra).clamp(0.0, 1.0)
    }

    #[allow(clippy::too_many_arguments)]
    fn edge_cost(
        &self,
        from: &Cell,
        to: &Cell,
        arrival: Timestamp,
        agent: &Agent,
        risk_map: &RiskMap,
        ctx: &PlanContext,
        fleet: &FleetView,
    ) -> f32 {
        let dynamic = ctx.overlay.is_some_and(|o| o.is_dynamic(to))
            || ctx.reservations.is_some_and(|r| r.is_reserved(to, arrival, &agent.id));
        let cost = 1.0
            + self.config.risk_weight * self.risk(to, risk_map, ctx)
            + if dynamic { self.config.dynamic_penalty } else { 0.0 }
            + self.terms.congestion(to, agent, fleet)
            + self.terms.energy(from, to, agent, fleet)
            - self.terms.collaboration_bonus(to, agent, fleet);
        cost.max(MIN_EDGE_COST)
    }

    #[allow(clippy::too_many_arguments)]
    fn reconstruct(
        &self,
        goal_cell: Cell,
        start: Point,
        parent: &HashMap<Cell, Cell>,
        best_g: &HashMap<Cell, f32>,
        hops: &HashMap<Cell, u32>,
        risk_map: &RiskMap,
        ctx: &PlanContext,
        step_ms: u64,
    ) -> Path {
        let mut cells = vec![goal_cell];
        let mut cell = goal_cell;
        while let Some(prev) = parent.get(&cell) {
            cells.push(*prev);
            cell = *prev;
        }
        cells.reverse();

        cells
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let p = if i == 0 { start } else { self.grid.center_of(c) };
                PathNode {
                    x: p.x,
                    y: p.y,
                    z: p.z,
                    cost: best_g[c],
                    risk: self.risk(c, risk_map, ctx),
                    timestamp: ctx.depart_at + hops[c] as u64 * step_ms,
                }
            })
            .collect()
    }
}
