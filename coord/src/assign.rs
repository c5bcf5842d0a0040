use std::collections::{BTreeSet, HashSet};

use log::{debug, info, warn};
use serde::Serialize;
use skyfleet_structs::{
    agent::{Agent, AgentStatus},
    task::{Task, TaskKind, TaskStatus},
    AgentId, TaskId, Timestamp,
};

use crate::config::AssignerConfig;

/// Scores how well a candidate complements the agents already picked for a task.
pub trait CollaborationModel {
    /// In [0, 1].
    fn synergy(&self, candidate: &Agent, selected: &[&Agent], task: &Task) -> f32;
}

#[derive(Clone, Copy, Debug)]
pub struct ConstantSynergy(pub f32);

impl Default for ConstantSynergy {
    fn default() -> Self {
        ConstantSynergy(1.0)
    }
}

impl CollaborationModel for ConstantSynergy {
    fn synergy(&self, _candidate: &Agent, _selected: &[&Agent], _task: &Task) -> f32 {
        self.0
    }
}

/// Share of the candidate's capabilities not yet covered by the team. The
/// first pick always scores 1.
#[derive(Clone, Copy, Debug, Default)]
pub struct CapabilitySynergy;

impl CollaborationModel for CapabilitySynergy {
    fn synergy(&self, candidate: &Agent, selected: &[&Agent], _task: &Task) -> f32 {
        if selected.is_empty() {
            return 1.0;
        }
        if candidate.capabilities.is_empty() {
            return 0.0;
        }
        let covered: BTreeSet<&String> = selected.iter().flat_map(|a| a.capabilities.iter()).collect();
        let fresh = candidate.capabilities.iter().filter(|c| !covered.contains(c)).count();
        fresh as f32 / candidate.capabilities.len() as f32
    }
}

#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct Assignment {
    pub task: TaskId,
    /// In selection order.
    pub agents: Vec<AgentId>,
}

/// What one assignment pass did to the pending tasks.
#[derive(Clone, Serialize, Debug, Default, PartialEq)]
pub struct AssignOutcome {
    pub assigned: Vec<Assignment>,
    /// Failed for passing their deadline while still pending.
    pub expired: Vec<TaskId>,
    /// Left pending for lack of eligible agents.
    pub waiting: Vec<TaskId>,
}

pub struct TaskAssigner {
    config: AssignerConfig,
    collaboration: Box<dyn CollaborationModel>,
}

impl TaskAssigner {
    pub fn new(config: AssignerConfig) -> Self {
        TaskAssigner { config, collaboration: Box::new(ConstantSynergy::default()) }
    }

    pub fn with_collaboration(mut self, model: impl CollaborationModel + 'static) -> Self {
        self.collaboration = Box::new(model);
        self
    }

    pub fn config(&self) -> &AssignerConfig {
        &self.config
    }

    /// Base priority plus the aging boost earned while pending.
    pub fn effective_priority(&self, task: &Task) -> f32 {
        task.priority + self.config.starvation.boost(task.ticks_waiting)
    }

    pub fn is_eligible(&self, agent: &Agent, task: &Task) -> bool {
        agent.status == AgentStatus::Idle
            && agent.battery_level >= self.config.min_battery
            && agent.payload_capacity >= task.payload
            && (task.kind != TaskKind::Delivery || agent.has_capability("delivery"))
    }

    pub fn utility(&self, agent: &Agent, selected: &[&Agent], task: &Task) -> f32 {
        let w = &self.config.weights;
        let distance = agent.position.dist(&task.location);
        let distance_factor = 1.0 / (1.0 + distance / self.config.distance_scale);
        let battery_factor = (agent.battery_level / 100.0).clamp(0.0, 1.0);
        let collaboration_factor = self.collaboration.synergy(agent, selected, task).clamp(0.0, 1.0);
        w.distance * distance_factor + w.battery * battery_factor + w.collaboration * collaboration_factor
    }

    /// One greedy pass over the pending tasks, highest effective priority
    /// first (stable, so ties keep queue order). Agents picked for a task
    /// leave the idle pool and cannot be picked again in the same pass.
    /// Agents already listed on an assigned or executing task are never
    /// candidates, whatever status the host last reported for them.
    pub fn assign(&self, tasks: &mut [Task], agents: &mut [Agent], now: Timestamp) -> AssignOutcome {
        let mut outcome = AssignOutcome::default();
        let busy: HashSet<AgentId> = tasks
            .iter()
            .filter(|t| t.status.is_active())
            .flat_map(|t| t.assigned_agents.iter().cloned())
            .collect();
        let mut order: Vec<usize> = (0..tasks.len()).filter(|i| tasks[*i].status == TaskStatus::Pending).collect();
        order.sort_by(|a, b| self.effective_priority(&tasks[*b]).total_cmp(&self.effective_priority(&tasks[*a])));

        for i in order {
            let task = &mut tasks[i];
            if now > task.deadline {
                warn!("task {} missed its deadline {} while pending", task.id, task.deadline);
                task.status = TaskStatus::Failed;
                outcome.expired.push(task.id.clone());
                continue;
            }

            let mut candidates: Vec<usize> = agents
                .iter()
                .enumerate()
                .filter(|(_, a)| !busy.contains(&a.id) && self.is_eligible(a, task))
                .map(|(j, _)| j)
                .collect();
            if candidates.len() < task.required_agents {
                task.ticks_waiting += 1;
                debug!(
                    "task {} waiting: {} eligible agents, {} required (waited {} ticks)",
                    task.id,
                    candidates.len(),
                    task.required_agents,
                    task.ticks_waiting
                );
                outcome.waiting.push(task.id.clone());
                continue;
            }

            let mut chosen: Vec<usize> = Vec::with_capacity(task.required_agents);
            while chosen.len() < task.required_agents {
                let selected: Vec<&Agent> = chosen.iter().map(|j| &agents[*j]).collect();
                let mut best: Option<(usize, f32)> = None;
                for (k, j) in candidates.iter().enumerate() {
                    let u = self.utility(&agents[*j], &selected, task);
                    if best.map_or(true, |(_, b)| u > b) {
                        best = Some((k, u));
                    }
                }
                let Some((k, _)) = best else { break };
                chosen.push(candidates.remove(k));
            }

            for j in chosen.iter() {
                agents[*j].status = AgentStatus::Flying;
                agents[*j].destination = Some(task.location);
            }
            task.assigned_agents = chosen.iter().map(|j| agents[*j].id.clone()).collect();
            task.status = TaskStatus::Assigned;
            info!("task {} assigned to {:?}", task.id, task.assigned_agents);
            outcome.assigned.push(Assignment { task: task.id.clone(), agents: task.assigned_agents.clone() });
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StarvationPolicy;
    use skyfleet_structs::Point;

    fn courier(id: &str, x: f32) -> Agent {
        Agent::new(id, Point::new(x, 0.0, 0.0)).with_capabilities(["delivery"])
    }

    fn delivery(id: &str, priority: f32) -> Task {
        Task::new(id, TaskKind::Delivery, Point::ZERO).with_priority(priority)
    }

    #[test]
    fn nearest_capable_agent_wins() {
        let _ = env_logger::try_init();
        let assigner = TaskAssigner::new(Default::default());
        let mut agents = vec![courier("far", 500.0), Agent::new("plain", Point::ZERO), courier("near", 10.0)];
        let mut tasks = vec![delivery("t", 1.0)];
        let out = assigner.assign(&mut tasks, &mut agents, 0);

        assert_eq!(out.assigned, vec![Assignment { task: "t".into(), agents: vec!["near".into()] }]);
        assert_eq!(tasks[0].status, TaskStatus::Assigned);
        assert_eq!(agents[2].status, AgentStatus::Flying);
        assert_eq!(agents[2].destination, Some(Point::ZERO));
        assert_eq!(agents[0].status, AgentStatus::Idle);
        assert_eq!(agents[1].status, AgentStatus::Idle);
    }

    #[test]
    fn eligibility_filters() {
        let assigner = TaskAssigner::new(Default::default());
        let task = delivery("t", 1.0).with_payload(3.0);
        assert!(assigner.is_eligible(&courier("a", 0.0), &task));
        assert!(!assigner.is_eligible(&courier("a", 0.0).with_battery(29.9), &task));
        assert!(assigner.is_eligible(&courier("a", 0.0).with_battery(30.0), &task));
        assert!(!assigner.is_eligible(&courier("a", 0.0).with_payload_capacity(2.0), &task));
        assert!(!assigner.is_eligible(&Agent::new("a", Point::ZERO), &task));
        let survey = Task::new("s", TaskKind::Surveillance, Point::ZERO);
        assert!(assigner.is_eligible(&Agent::new("a", Point::ZERO), &survey));
        let mut busy = courier("a", 0.0);
        busy.status = AgentStatus::Flying;
        assert!(!assigner.is_eligible(&busy, &task));
    }

    #[test]
    fn not_enough_agents_leaves_task_pending() {
        let assigner = TaskAssigner::new(Default::default());
        let mut agents = vec![courier("a", 0.0)];
        let mut tasks = vec![delivery("t", 1.0).with_required_agents(2)];
        let out = assigner.assign(&mut tasks, &mut agents, 0);
        assert!(out.assigned.is_empty());
        assert_eq!(out.waiting, vec!["t".to_string()]);
        assert_eq!(tasks[0].status, TaskStatus::Pending);
        assert_eq!(tasks[0].ticks_waiting, 1);
        assert!(tasks[0].assigned_agents.is_empty());
        assert_eq!(agents[0].status, AgentStatus::Idle);
    }

    #[test]
    fn higher_priority_first_and_stable_ties() {
        let assigner = TaskAssigner::new(Default::default());
        let mut agents = vec![courier("a", 0.0)];
        let mut tasks = vec![delivery("low", 1.0), delivery("high", 5.0)];
        assigner.assign(&mut tasks, &mut agents, 0);
        assert_eq!(tasks[1].status, TaskStatus::Assigned);
        assert_eq!(tasks[0].status, TaskStatus::Pending);

        let mut agents = vec![courier("a", 0.0)];
        let mut tasks = vec![delivery("first", 2.0), delivery("second", 2.0)];
        assigner.assign(&mut tasks, &mut agents, 0);
        assert_eq!(tasks[0].status, TaskStatus::Assigned);
        assert_eq!(tasks[1].status, TaskStatus::Pending);
    }

    #[test]
    fn waiting_tasks_age_past_fresh_ones() {
        let assigner = TaskAssigner::new(Default::default());
        let mut old = delivery("old", 1.0);
        old.ticks_waiting = 15;
        assert!((assigner.effective_priority(&old) - 2.5).abs() < 1e-5);
        let mut tasks = vec![delivery("fresh", 2.0), old];
        let mut agents = vec![courier("a", 0.0)];
        assigner.assign(&mut tasks, &mut agents, 0);
        assert_eq!(tasks[1].status, TaskStatus::Assigned);

        let strict = TaskAssigner::new(AssignerConfig { starvation: StarvationPolicy::disabled(), ..Default::default() });
        let mut tasks = vec![delivery("fresh", 2.0), tasks[1].clone()];
        tasks[1].status = TaskStatus::Pending;
        let mut agents = vec![courier("a", 0.0)];
        strict.assign(&mut tasks, &mut agents, 0);
        assert_eq!(tasks[0].status, TaskStatus::Assigned);
    }

    #[test]
    fn expired_tasks_fail() {
        let _ = env_logger::try_init();
        let assigner = TaskAssigner::new(Default::default());
        let mut tasks = vec![delivery("late", 1.0).with_deadline(100), delivery("ok", 1.0).with_deadline(100)];
        let mut agents = vec![courier("a", 0.0)];
        let out = assigner.assign(&mut tasks[1..], &mut agents, 100);
        assert_eq!(out.assigned.len(), 1);
        let out = assigner.assign(&mut tasks, &mut agents, 101);
        assert_eq!(out.expired, vec!["late".to_string()]);
        assert_eq!(tasks[0].status, TaskStatus::Failed);
        assert_eq!(tasks[1].status, TaskStatus::Assigned);
    }

    #[test]
    fn agents_on_active_tasks_stay_out_of_the_pool() {
        let assigner = TaskAssigner::new(Default::default());
        let mut agents = vec![courier("a", 0.0), courier("b", 200.0)];
        let mut tasks = vec![delivery("t1", 1.0), delivery("t2", 1.0)];
        tasks[0].status = TaskStatus::Executing;
        tasks[0].assigned_agents = vec!["a".into()];
        // "a" reports idle but still belongs to t1
        let out = assigner.assign(&mut tasks, &mut agents, 0);
        assert_eq!(out.assigned, vec![Assignment { task: "t2".into(), agents: vec!["b".into()] }]);
        assert_eq!(agents[0].status, AgentStatus::Idle);

        let mut agents = vec![courier("a", 0.0)];
        let mut tasks = vec![tasks[0].clone(), delivery("t2", 1.0)];
        let out = assigner.assign(&mut tasks, &mut agents, 0);
        assert!(out.assigned.is_empty());
        assert_eq!(tasks[1].status, TaskStatus::Pending);
    }

    #[test]
    fn teams_are_picked_greedily() {
        let assigner = TaskAssigner::new(Default::default()).with_collaboration(CapabilitySynergy);
        let mut agents = vec![
            Agent::new("cam1", Point::new(10.0, 0.0, 0.0)).with_capabilities(["camera"]),
            Agent::new("cam2", Point::new(20.0, 0.0, 0.0)).with_capabilities(["camera"]),
            Agent::new("lidar", Point::new(60.0, 0.0, 0.0)).with_capabilities(["lidar"]),
        ];
        let mut tasks = vec![Task::new("survey", TaskKind::Surveillance, Point::ZERO).with_required_agents(2)];
        let out = assigner.assign(&mut tasks, &mut agents, 0);
        // a second camera adds nothing, so the lidar drone beats the closer one
        assert_eq!(out.assigned[0].agents, vec!["cam1".to_string(), "lidar".to_string()]);
        assert_eq!(tasks[0].assigned_agents.len(), 2);
        assert_eq!(agents[1].status, AgentStatus::Idle);
    }

    #[test]
    fn capability_synergy() {
        let s = CapabilitySynergy;
        let task = Task::new("t", TaskKind::Surveillance, Point::ZERO);
        let a = Agent::new("a", Point::ZERO).with_capabilities(["camera", "lidar"]);
        let b = Agent::new("b", Point::ZERO).with_capabilities(["camera", "thermal"]);
        assert_eq!(s.synergy(&b, &[], &task), 1.0);
        assert_eq!(s.synergy(&b, &[&a], &task), 0.5);
        assert_eq!(s.synergy(&a, &[&a], &task), 0.0);
        assert_eq!(ConstantSynergy::default().synergy(&a, &[&b], &task), 1.0);
    }
}
