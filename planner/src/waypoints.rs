use skyfleet_structs::path::{PathNode, Waypoint};

/// Turns a planned path into executable waypoints. Speed and heading describe
/// the leg leaving each waypoint; the final waypoint keeps the heading of the
/// last leg and has zero speed.
pub fn to_waypoints(path: &[PathNode]) -> Vec<Waypoint> {
    let mut waypoints = Vec::with_capacity(path.len());
    let mut heading = 0.0;
    for (i, node) in path.iter().enumerate() {
        let speed = match path.get(i + 1) {
            Some(next) => {
                let dx = next.x - node.x;
                let dy = next.y - node.y;
                if dx != 0.0 || dy != 0.0 {
                    heading = dy.atan2(dx).to_degrees().rem_euclid(360.0);
                }
                let dt = next.timestamp.saturating_sub(node.timestamp) as f32 / 1000.0;
                if dt > 0.0 {
                    node.point().dist(&next.point()) / dt
                } else {
                    0.0
                }
            }
            None => 0.0,
        };
        waypoints.push(Waypoint { x: node.x, y: node.y, z: node.z, timestamp: node.timestamp, speed, heading });
    }
    waypoints
}
