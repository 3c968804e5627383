//! Environment collaborators - obstacle ray queries and the threat entity.
//!
//! The engine never owns scene geometry. Each tick it is handed an
//! [`Environment`] holding something that answers ray casts and the
//! optional world position of the threat.

use serde::{Deserialize, Serialize};

use crate::components::{BoundingBox, Vec3, EPSILON};

/// Bit set of obstacle layers a ray cast should consider
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const ALL: Self = Self(u32::MAX);
    pub const NONE: Self = Self(0);

    pub fn layer(layer: u8) -> Self {
        Self(1u32.checked_shl(layer as u32).unwrap_or(0))
    }

    pub fn contains(&self, layer: u8) -> bool {
        self.0 & Self::layer(layer).0 != 0
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// Ray cast against static obstacle geometry.
///
/// Returns the distance along `direction` to the nearest hit within
/// `max_distance`, or `None` when the ray is clear. Rays that start inside
/// an obstacle do not hit it.
pub trait ObstacleQuery {
    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<f32>;
}

/// Open water: every ray is clear
#[derive(Debug, Clone, Copy, Default)]
pub struct NoObstacles;

impl ObstacleQuery for NoObstacles {
    fn raycast(
        &self,
        _origin: Vec3,
        _direction: Vec3,
        _max_distance: f32,
        _mask: LayerMask,
    ) -> Option<f32> {
        None
    }
}

/// Static obstacle primitive
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum Shape {
    Sphere { center: Vec3, radius: f32 },
    Box(BoundingBox),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Obstacle {
    pub shape: Shape,
    pub layer: u8,
}

impl Obstacle {
    pub fn sphere(center: Vec3, radius: f32) -> Self {
        Self {
            shape: Shape::Sphere { center, radius },
            layer: 0,
        }
    }

    pub fn cuboid(bounds: BoundingBox) -> Self {
        Self {
            shape: Shape::Box(bounds),
            layer: 0,
        }
    }

    pub fn on_layer(mut self, layer: u8) -> Self {
        self.layer = layer;
        self
    }

    /// Distance to the first surface hit by a unit-direction ray
    fn intersect(&self, origin: Vec3, direction: Vec3) -> Option<f32> {
        match self.shape {
            Shape::Sphere { center, radius } => ray_sphere(origin, direction, center, radius),
            Shape::Box(bounds) => ray_box(origin, direction, &bounds),
        }
    }
}

/// A set of static obstacles answering ray casts by brute force
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObstacleField {
    pub obstacles: Vec<Obstacle>,
}

impl ObstacleField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, obstacle: Obstacle) -> Self {
        self.obstacles.push(obstacle);
        self
    }

    pub fn push(&mut self, obstacle: Obstacle) {
        self.obstacles.push(obstacle);
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }
}

impl ObstacleQuery for ObstacleField {
    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<f32> {
        let direction = direction.normalize();
        if direction.is_zero() || max_distance <= 0.0 {
            return None;
        }
        self.obstacles
            .iter()
            .filter(|o| mask.contains(o.layer))
            .filter_map(|o| o.intersect(origin, direction))
            .filter(|&t| t <= max_distance)
            .min_by(|a, b| a.total_cmp(b))
    }
}

fn ray_sphere(origin: Vec3, direction: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let oc = origin - center;
    let c = oc.length_squared() - radius * radius;
    if c <= 0.0 {
        return None;
    }
    let b = oc.dot(&direction);
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let t = -b - disc.sqrt();
    (t >= 0.0).then_some(t)
}

fn ray_box(origin: Vec3, direction: Vec3, bounds: &BoundingBox) -> Option<f32> {
    if bounds.contains(&origin) {
        return None;
    }
    let axes = [
        (origin.x, direction.x, bounds.min.x, bounds.max.x),
        (origin.y, direction.y, bounds.min.y, bounds.max.y),
        (origin.z, direction.z, bounds.min.z, bounds.max.z),
    ];
    let mut t_near = 0.0f32;
    let mut t_far = f32::INFINITY;
    for (o, d, min, max) in axes {
        if d.abs() <= EPSILON {
            if o < min || o > max {
                return None;
            }
            continue;
        }
        let t1 = (min - o) / d;
        let t2 = (max - o) / d;
        t_near = t_near.max(t1.min(t2));
        t_far = t_far.min(t1.max(t2));
        if t_near > t_far {
            return None;
        }
    }
    Some(t_near)
}

/// Everything outside the flock an agent consults during a tick
#[derive(Clone, Copy)]
pub struct Environment<'a> {
    pub obstacles: &'a dyn ObstacleQuery,
    pub threat: Option<Vec3>,
}

impl<'a> Environment<'a> {
    pub fn new(obstacles: &'a dyn ObstacleQuery) -> Self {
        Self {
            obstacles,
            threat: None,
        }
    }

    pub fn with_threat(mut self, threat: Vec3) -> Self {
        self.threat = Some(threat);
        self
    }
}

impl Environment<'static> {
    /// No obstacles and no threat
    pub fn open_water() -> Self {
        Self {
            obstacles: &NoObstacles,
            threat: None,
        }
    }
}
