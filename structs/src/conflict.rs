use serde::{Deserialize, Serialize};

use crate::{AgentId, Timestamp};

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ConflictKind {
    Position,
    Path,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Conflict {
    pub kind: ConflictKind,
    /// Ordered by registration: the first agent registered earlier.
    pub agents: (AgentId, AgentId),
    pub severity: f32,
    pub timestamp: Timestamp,
}

impl Conflict {
    pub fn involves(&self, agent: &str) -> bool {
        self.agents.0 == agent || self.agents.1 == agent
    }
}

/// Archived conflict, keyed by detection time and agent pair.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct ConflictRecord {
    pub conflict: Conflict,
    pub resolved: bool,
    pub resolved_at: Timestamp,
}

impl ConflictRecord {
    pub fn key(&self) -> (Timestamp, &str, &str) {
        (self.conflict.timestamp, &self.conflict.agents.0, &self.conflict.agents.1)
    }
}
