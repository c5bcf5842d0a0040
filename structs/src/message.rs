use serde::{Deserialize, Serialize};

use crate::{AgentId, Timestamp};

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Position,
    Intention,
    Warning,
    Coordination,
    Emergency,
}

impl MessageKind {
    pub fn default_priority(&self) -> u8 {
        match self {
            MessageKind::Position => 1,
            MessageKind::Intention => 2,
            MessageKind::Coordination => 3,
            MessageKind::Warning => 4,
            MessageKind::Emergency => 5,
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum Recipient {
    Agent(AgentId),
    Broadcast,
}

/// Outgoing message for the (external) agent transport layer.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Message {
    pub from: AgentId,
    pub to: Recipient,
    pub kind: MessageKind,
    pub payload: serde_json::Value,
    pub timestamp: Timestamp,
    pub priority: u8,
}

impl Message {
    pub fn new(
        from: impl Into<AgentId>,
        to: Recipient,
        kind: MessageKind,
        payload: serde_json::Value,
        timestamp: Timestamp,
    ) -> Self {
        Message { from: from.into(), to, kind, payload, timestamp, priority: kind.default_priority() }
    }
}
