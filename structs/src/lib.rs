use serde::{Deserialize, Serialize};

pub mod agent;
pub mod backend;
pub mod conflict;
pub mod environment;
pub mod error;
pub mod message;
pub mod path;
pub mod task;

pub use error::{FleetError, Result};

/// Milliseconds since the start of the simulation (or any host epoch).
pub type Timestamp = u64;

pub type AgentId = String;
pub type TaskId = String;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn dist_xy(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
    pub fn dist(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    pub fn eq_xyz(&self, other: &Point) -> bool {
        self.dist(other) < 1e-3
    }
    pub fn eq_xy(&self, other: &Point) -> bool {
        self.dist_xy(other) < 1e-3
    }

    pub fn norm(&self) -> f32 {
        self.dist(&Point::ZERO)
    }

    pub fn sub(&self, other: &Point) -> Point {
        Point { x: self.x - other.x, y: self.y - other.y, z: self.z - other.z }
    }

    pub fn add(&self, other: &Point) -> Point {
        Point { x: self.x + other.x, y: self.y + other.y, z: self.z + other.z }
    }

    pub fn scale(&self, s: f32) -> Point {
        Point { x: self.x * s, y: self.y * s, z: self.z * s }
    }

    /// Unit vector in the same direction, or `None` for the zero vector.
    pub fn normalized(&self) -> Option<Point> {
        let n = self.norm();
        (n > 1e-6).then(|| self.scale(1.0 / n))
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::Point;

    #[test]
    fn distances() {
        let a = Point::new(0.0, 0.0, 0.0);
        let b = Point::new(3.0, 4.0, 12.0);
        assert_eq!(a.dist_xy(&b), 5.0);
        assert_eq!(a.dist(&b), 13.0);
        assert!(b.sub(&b).normalized().is_none());
        let u = b.normalized().unwrap();
        assert!((u.norm() - 1.0).abs() < 1e-5);
    }
}
