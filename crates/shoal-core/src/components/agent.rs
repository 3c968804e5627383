//! Flock agent components - the per-agent state owned by each entity.

use serde::{Deserialize, Serialize};

use super::common::{Vec3, EPSILON};

/// Marker component for flock agents
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FlockAgent;

/// World-space placement of an agent
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    /// Unit heading
    pub forward: Vec3,
}

impl Transform {
    pub fn new(position: Vec3, forward: Vec3) -> Self {
        Self {
            position,
            forward: forward.normalize_or(Vec3::FORWARD),
        }
    }

    /// Orientation basis derived from the heading and world up
    pub fn basis(&self) -> Basis {
        Basis::from_forward(self.forward)
    }
}

/// Orthonormal right/up/forward frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Basis {
    pub right: Vec3,
    pub up: Vec3,
    pub forward: Vec3,
}

impl Basis {
    /// Builds a frame around `forward`, keeping `up` as close to world up as
    /// possible. Near-vertical headings fall back to world forward as the
    /// up reference.
    pub fn from_forward(forward: Vec3) -> Self {
        let forward = forward.normalize_or(Vec3::FORWARD);
        let up_ref = if forward.dot(&Vec3::UP).abs() > 0.97 {
            Vec3::FORWARD
        } else {
            Vec3::UP
        };
        let right = up_ref.cross(&forward).normalize_or(Vec3::RIGHT);
        let up = forward.cross(&right).normalize_or(Vec3::UP);
        Self { right, up, forward }
    }

    /// Transform a local-space direction into world space
    pub fn to_world(&self, local: Vec3) -> Vec3 {
        self.right * local.x + self.up * local.y + self.forward * local.z
    }
}

/// Physics body. Gravity never applies to agents; `linear_damping` scales
/// the displacement integrated from `velocity` each tick.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Body {
    pub velocity: Vec3,
    pub linear_damping: f32,
}

impl Body {
    pub fn new(velocity: Vec3, linear_damping: f32) -> Self {
        Self {
            velocity,
            linear_damping: linear_damping.max(0.0),
        }
    }

    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }
}

/// Last chosen obstacle-avoidance heading.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub enum AvoidanceCache {
    #[default]
    Empty,
    /// World-space unit direction
    Cached(Vec3),
}

impl AvoidanceCache {
    pub fn direction(&self) -> Option<Vec3> {
        match self {
            AvoidanceCache::Empty => None,
            AvoidanceCache::Cached(dir) => Some(*dir),
        }
    }

    pub fn store(&mut self, direction: Vec3) {
        *self = if direction.length_squared() > EPSILON {
            AvoidanceCache::Cached(direction)
        } else {
            AvoidanceCache::Empty
        };
    }

    pub fn clear(&mut self) {
        *self = AvoidanceCache::Empty;
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, AvoidanceCache::Empty)
    }
}

/// Steering memory carried between ticks
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Steering {
    /// Smoothed heading, the spring's position
    pub smoothed_heading: Vec3,
    /// Rate of change of the smoothed heading, the spring's velocity
    pub heading_velocity: Vec3,
    pub avoidance: AvoidanceCache,
}

impl Steering {
    pub fn new(forward: Vec3) -> Self {
        Self {
            smoothed_heading: forward,
            heading_velocity: Vec3::ZERO,
            avoidance: AvoidanceCache::Empty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        a.distance(&b) < 1.0e-4
    }

    #[test]
    fn test_basis_for_level_heading() {
        let basis = Basis::from_forward(Vec3::FORWARD);
        assert!(approx(basis.right, Vec3::RIGHT));
        assert!(approx(basis.up, Vec3::UP));
        assert!(approx(basis.to_world(Vec3::new(1.0, 0.0, 1.0)), Vec3::new(1.0, 0.0, 1.0)));
    }

    #[test]
    fn test_basis_follows_yaw() {
        // Facing +x, local right points to -z
        let basis = Basis::from_forward(Vec3::RIGHT);
        assert!(approx(basis.right, Vec3::new(0.0, 0.0, -1.0)));
        assert!(approx(basis.to_world(Vec3::FORWARD), Vec3::RIGHT));
    }

    #[test]
    fn test_basis_vertical_heading_is_orthonormal() {
        let basis = Basis::from_forward(Vec3::UP);
        assert!(basis.right.dot(&basis.forward).abs() < 1.0e-4);
        assert!(basis.up.dot(&basis.forward).abs() < 1.0e-4);
        assert!((basis.right.length() - 1.0).abs() < 1.0e-4);
    }

    #[test]
    fn test_transform_normalizes_forward() {
        let t = Transform::new(Vec3::ZERO, Vec3::new(0.0, 0.0, 4.0));
        assert!(approx(t.forward, Vec3::FORWARD));
        let degenerate = Transform::new(Vec3::ZERO, Vec3::ZERO);
        assert_eq!(degenerate.forward, Vec3::FORWARD);
    }

    #[test]
    fn test_avoidance_cache_store_and_clear() {
        let mut cache = AvoidanceCache::default();
        assert!(cache.is_empty());
        cache.store(Vec3::RIGHT);
        assert_eq!(cache.direction(), Some(Vec3::RIGHT));
        cache.store(Vec3::ZERO);
        assert!(cache.is_empty());
        cache.store(Vec3::UP);
        cache.clear();
        assert_eq!(cache.direction(), None);
    }
}
