//! Obstacle avoidance - probe ahead, pick an escape heading from a fixed
//! fan of directions, and hold it while it stays clear.

use crate::components::{AvoidanceCache, Basis, Vec3};
use crate::environment::{LayerMask, ObstacleQuery};

const D: f32 = std::f32::consts::FRAC_1_SQRT_2;

/// Candidate escape directions in agent-local space, in evaluation order.
/// The forward diagonals come first so an agent keeps some momentum.
pub const AVOIDANCE_FAN: [Vec3; 10] = [
    Vec3::new(D, 0.0, D),
    Vec3::new(-D, 0.0, D),
    Vec3::new(0.0, D, D),
    Vec3::new(0.0, -D, D),
    Vec3::new(1.0, 0.0, 0.0),
    Vec3::new(-1.0, 0.0, 0.0),
    Vec3::new(0.0, 1.0, 0.0),
    Vec3::new(0.0, -1.0, 0.0),
    Vec3::new(0.0, 0.0, 1.0),
    Vec3::new(0.0, 0.0, -1.0),
];

/// Obstacle steering for one agent.
///
/// A clear forward probe drops the cache and contributes nothing. When the
/// probe hits, a cached heading is reused only if a ray along it is still
/// clear this tick; otherwise the fan is rescanned and the result cached.
pub fn obstacle_avoidance(
    query: &dyn ObstacleQuery,
    position: Vec3,
    basis: &Basis,
    range: f32,
    mask: LayerMask,
    cache: &mut AvoidanceCache,
) -> Vec3 {
    if query.raycast(position, basis.forward, range, mask).is_none() {
        cache.clear();
        return Vec3::ZERO;
    }

    if let Some(cached) = cache.direction() {
        if query.raycast(position, cached, range, mask).is_none() {
            return cached;
        }
    }

    let direction = select_escape_direction(query, position, basis, range, mask);
    cache.store(direction);
    direction
}

/// First clear fan direction, or the one whose hit is farthest away
pub fn select_escape_direction(
    query: &dyn ObstacleQuery,
    position: Vec3,
    basis: &Basis,
    range: f32,
    mask: LayerMask,
) -> Vec3 {
    let mut farthest: Option<(f32, Vec3)> = None;
    for local in AVOIDANCE_FAN {
        let direction = basis.to_world(local).normalize_or(basis.forward);
        match query.raycast(position, direction, range, mask) {
            None => return direction,
            Some(distance) => {
                if farthest.map_or(true, |(best, _)| distance > best) {
                    farthest = Some((distance, direction));
                }
            }
        }
    }
    log::debug!("All avoidance directions blocked at {:?}; taking farthest hit", position);
    farthest.map_or(-basis.forward, |(_, direction)| direction)
}
