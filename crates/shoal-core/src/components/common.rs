//! Common math types shared by components, systems and configuration.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Squared length below which a vector is treated as zero.
pub const EPSILON: f32 = 1.0e-6;

/// 3D vector. `y` is the vertical axis.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, z: 0.0 };
    pub const UP: Self = Self { x: 0.0, y: 1.0, z: 0.0 };
    pub const FORWARD: Self = Self { x: 0.0, y: 0.0, z: 1.0 };
    pub const RIGHT: Self = Self { x: 1.0, y: 0.0, z: 0.0 };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn dot(&self, other: &Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: &Self) -> Self {
        Self {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    pub fn distance_squared(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    pub fn distance(&self, other: &Self) -> f32 {
        self.distance_squared(other).sqrt()
    }

    pub fn length_squared(&self) -> f32 {
        self.dot(self)
    }

    pub fn length(&self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Unit vector in the same direction, or zero for a degenerate vector.
    pub fn normalize(&self) -> Self {
        self.normalize_or(Self::ZERO)
    }

    /// Unit vector in the same direction, or `fallback` for a degenerate vector.
    pub fn normalize_or(&self, fallback: Self) -> Self {
        let len_sq = self.length_squared();
        if len_sq <= EPSILON || !len_sq.is_finite() {
            return fallback;
        }
        *self * (1.0 / len_sq.sqrt())
    }

    pub fn is_zero(&self) -> bool {
        self.length_squared() <= EPSILON
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Angle to `other` in degrees. Degenerate vectors report zero.
    pub fn angle_to(&self, other: &Self) -> f32 {
        let denom = (self.length_squared() * other.length_squared()).sqrt();
        if denom <= EPSILON {
            return 0.0;
        }
        (self.dot(other) / denom).clamp(-1.0, 1.0).acos().to_degrees()
    }
}

impl std::ops::Add for Vec3 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl std::ops::AddAssign for Vec3 {
    fn add_assign(&mut self, other: Self) {
        self.x += other.x;
        self.y += other.y;
        self.z += other.z;
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }
}

impl std::ops::Mul<f32> for Vec3 {
    type Output = Self;
    fn mul(self, scalar: f32) -> Self {
        Self {
            x: self.x * scalar,
            y: self.y * scalar,
            z: self.z * scalar,
        }
    }
}

impl std::ops::Div<f32> for Vec3 {
    type Output = Self;
    fn div(self, scalar: f32) -> Self {
        Self {
            x: self.x / scalar,
            y: self.y / scalar,
            z: self.z / scalar,
        }
    }
}

impl std::ops::Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box of the given half extents centered on `center`
    pub fn centered(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    pub fn contains(&self, point: &Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// True when `min <= max` on every axis
    pub fn is_ordered(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    /// Uniformly sample a point inside the box
    pub fn sample(&self, rng: &mut impl Rng) -> Vec3 {
        Vec3::new(
            sample_axis(rng, self.min.x, self.max.x),
            sample_axis(rng, self.min.y, self.max.y),
            sample_axis(rng, self.min.z, self.max.z),
        )
    }
}

fn sample_axis(rng: &mut impl Rng, min: f32, max: f32) -> f32 {
    if max > min {
        rng.gen_range(min..max)
    } else {
        min
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_vec3_operations() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 5.0, 6.0);

        let sum = a + b;
        assert_eq!(sum, Vec3::new(5.0, 7.0, 9.0));

        let diff = b - a;
        assert_eq!(diff.x, 3.0);

        let scaled = a * 2.0;
        assert_eq!(scaled.y, 4.0);
        assert_eq!(-a, Vec3::new(-1.0, -2.0, -3.0));
        assert_eq!(a.dot(&b), 32.0);
    }

    #[test]
    fn test_cross_follows_axis_order() {
        assert_eq!(Vec3::UP.cross(&Vec3::FORWARD), Vec3::RIGHT);
        assert_eq!(Vec3::FORWARD.cross(&Vec3::RIGHT), Vec3::UP);
    }

    #[test]
    fn test_vec3_normalize() {
        let v = Vec3::new(3.0, 4.0, 0.0);
        let n = v.normalize();
        assert!((n.length() - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_normalize_degenerate_uses_fallback() {
        assert_eq!(Vec3::ZERO.normalize(), Vec3::ZERO);
        assert_eq!(Vec3::ZERO.normalize_or(Vec3::UP), Vec3::UP);
        let nan = Vec3::new(f32::NAN, 0.0, 0.0);
        assert_eq!(nan.normalize_or(Vec3::FORWARD), Vec3::FORWARD);
    }

    #[test]
    fn test_angle_to() {
        assert!((Vec3::RIGHT.angle_to(&Vec3::FORWARD) - 90.0).abs() < 0.01);
        assert_eq!(Vec3::ZERO.angle_to(&Vec3::FORWARD), 0.0);
    }

    #[test]
    fn test_bounding_box_sample_stays_inside() {
        let bb = BoundingBox::new(Vec3::new(-5.0, -10.0, -5.0), Vec3::new(5.0, -2.0, 5.0));
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            assert!(bb.contains(&bb.sample(&mut rng)));
        }
    }

    #[test]
    fn test_flat_box_samples_its_plane() {
        let bb = BoundingBox::new(Vec3::new(0.0, -3.0, 0.0), Vec3::new(4.0, -3.0, 4.0));
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(bb.sample(&mut rng).y, -3.0);
    }
}
