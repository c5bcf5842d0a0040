use serde::{Deserialize, Serialize};

use crate::{AgentId, Point, Timestamp};

/// One step of a planned route.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct PathNode {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Accumulated cost up to this node.
    pub cost: f32,
    pub risk: f32,
    pub timestamp: Timestamp,
}

impl PathNode {
    pub fn point(&self) -> Point {
        Point { x: self.x, y: self.y, z: self.z }
    }
}

/// Ordered route from start to goal. Empty means no route was found.
pub type Path = Vec<PathNode>;

/// Executable waypoint handed to flight control.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct Waypoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub timestamp: Timestamp,
    pub speed: f32,
    /// degrees, 0 along +x, counter-clockwise
    pub heading: f32,
}

impl Waypoint {
    pub fn point(&self) -> Point {
        Point { x: self.x, y: self.y, z: self.z }
    }
}

/// Instruction issued to one agent by the decision core.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub enum Directive {
    Avoidance { agent: AgentId, displacement: Point, duration_ms: u64 },
    PathUpdate { agent: AgentId, path: Vec<Waypoint> },
}

impl Directive {
    pub fn agent(&self) -> &str {
        match self {
            Directive::Avoidance { agent, .. } | Directive::PathUpdate { agent, .. } => agent,
        }
    }
}
