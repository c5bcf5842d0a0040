use serde::{Deserialize, Serialize};

use crate::{AgentId, FleetError, Point, TaskId, Timestamp};

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Delivery,
    Surveillance,
    Emergency,
    Maintenance,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Assigned,
    Executing,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Assigned or executing: the task holds its agents.
    pub fn is_active(&self) -> bool {
        matches!(self, TaskStatus::Assigned | TaskStatus::Executing)
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub kind: TaskKind,
    pub priority: f32,
    pub required_agents: usize,
    pub assigned_agents: Vec<AgentId>,
    pub deadline: Timestamp,
    pub location: Point,
    pub payload: f32,
    pub status: TaskStatus,
    /// Ticks spent pending, used for priority aging.
    #[serde(default)]
    pub ticks_waiting: u32,
}

impl Task {
    pub fn new(id: impl Into<TaskId>, kind: TaskKind, location: Point) -> Self {
        Task {
            id: id.into(),
            kind,
            priority: 1.0,
            required_agents: 1,
            assigned_agents: Vec::new(),
            deadline: Timestamp::MAX,
            location,
            payload: 0.0,
            status: TaskStatus::Pending,
            ticks_waiting: 0,
        }
    }

    pub fn with_priority(mut self, priority: f32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_required_agents(mut self, n: usize) -> Self {
        self.required_agents = n;
        self
    }

    pub fn with_payload(mut self, payload: f32) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_deadline(mut self, deadline: Timestamp) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.id.is_empty() {
            return Err(FleetError::missing("id"));
        }
        if self.required_agents == 0 {
            return Err(FleetError::invalid("required_agents", "must be at least 1"));
        }
        if !self.priority.is_finite() {
            return Err(FleetError::invalid("priority", "non-finite value"));
        }
        if !self.payload.is_finite() || self.payload < 0.0 {
            return Err(FleetError::invalid("payload", "must be a finite non-negative weight"));
        }
        if !self.location.is_finite() {
            return Err(FleetError::invalid("location", "non-finite coordinate"));
        }
        if self.status != TaskStatus::Pending || !self.assigned_agents.is_empty() {
            return Err(FleetError::invalid("status", "new tasks must be pending and unassigned"));
        }
        Ok(())
    }
}
