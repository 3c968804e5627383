//! Steering behaviors - one contribution per behavior, blended by weight.
//!
//! Every behavior returns a finite vector. Empty neighbor sets and
//! degenerate geometry produce the zero vector, except alignment, which
//! falls back to the agent's own heading so an isolated agent keeps going
//! straight.

use rand::Rng;

use super::neighbors::{in_field_of_view, AgentSnapshot};
use crate::components::Vec3;
use crate::config::{BehaviorTuning, Containment, DepthBand, FlockConfig};

/// Unweighted output of each behavior for one agent and one tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SteeringContributions {
    pub cohesion: Vec3,
    pub avoidance: Vec3,
    pub alignment: Vec3,
    pub bounds: Vec3,
    pub obstacle: Vec3,
    pub threat: Vec3,
    pub depth: Vec3,
}

impl SteeringContributions {
    /// Weighted sum with the vertical component damped
    pub fn blend(&self, config: &FlockConfig) -> Vec3 {
        let tuning = &config.tuning;
        let mut heading = self.cohesion * config.cohesion_weight
            + self.avoidance * config.avoidance_weight
            + self.alignment * config.alignment_weight
            + self.bounds * config.bounds_weight
            + self.obstacle * config.obstacle_weight
            + self.threat * tuning.threat_weight
            + self.depth * tuning.depth_weight;
        heading.y *= tuning.vertical_damping;
        if heading.is_finite() {
            heading
        } else {
            Vec3::ZERO
        }
    }
}

/// Direction toward the mean position of visible cohesion neighbors
pub fn cohesion(
    me: &AgentSnapshot,
    population: &[AgentSnapshot],
    neighbors: &[usize],
    fov_cos: f32,
) -> Vec3 {
    let mut center = Vec3::ZERO;
    let mut count = 0;
    for other in visible(me, population, neighbors, fov_cos) {
        center += other.position;
        count += 1;
    }
    if count == 0 {
        return Vec3::ZERO;
    }
    (center / count as f32 - me.position).normalize()
}

/// Direction away from visible avoidance neighbors
pub fn avoidance(
    me: &AgentSnapshot,
    population: &[AgentSnapshot],
    neighbors: &[usize],
    fov_cos: f32,
) -> Vec3 {
    let mut away = Vec3::ZERO;
    let mut count = 0;
    for other in visible(me, population, neighbors, fov_cos) {
        away += me.position - other.position;
        count += 1;
    }
    if count == 0 {
        return Vec3::ZERO;
    }
    (away / count as f32).normalize()
}

/// Mean heading of visible alignment neighbors. An empty alignment set
/// keeps the agent's own heading; neighbors that are all out of view, or
/// whose headings cancel, give zero.
pub fn alignment(
    me: &AgentSnapshot,
    population: &[AgentSnapshot],
    neighbors: &[usize],
    fov_cos: f32,
) -> Vec3 {
    if neighbors.is_empty() {
        return me.forward;
    }
    let mut heading = Vec3::ZERO;
    let mut count = 0;
    for other in visible(me, population, neighbors, fov_cos) {
        heading += other.forward;
        count += 1;
    }
    if count == 0 {
        return Vec3::ZERO;
    }
    (heading / count as f32).normalize()
}

fn visible<'a>(
    me: &'a AgentSnapshot,
    population: &'a [AgentSnapshot],
    neighbors: &'a [usize],
    fov_cos: f32,
) -> impl Iterator<Item = &'a AgentSnapshot> + 'a {
    neighbors
        .iter()
        .filter_map(move |&j| population.get(j))
        .filter(move |other| in_field_of_view(me.position, me.forward, other.position, fov_cos))
}

/// Axis-wise push back into the containment volume
pub fn containment(position: Vec3, limits: &Containment) -> Vec3 {
    let mut push = Vec3::ZERO;
    if position.x.abs() > limits.bounds_distance {
        push.x = -position.x.signum();
    }
    if position.z.abs() > limits.bounds_distance {
        push.z = -position.z.signum();
    }
    if position.y > limits.upper_limit {
        push.y = -1.0;
    } else if position.y < limits.lower_limit {
        push.y = 1.0;
    }
    push.normalize()
}

/// Escape direction from a nearby threat, with per-axis jitter
pub fn threat_avoidance(
    position: Vec3,
    forward: Vec3,
    threat: Option<Vec3>,
    tuning: &BehaviorTuning,
    rng: &mut impl Rng,
) -> Vec3 {
    let Some(threat) = threat else {
        return Vec3::ZERO;
    };
    if !threat.is_finite() {
        return Vec3::ZERO;
    }
    let offset = position - threat;
    if offset.length_squared() > tuning.threat_radius * tuning.threat_radius {
        return Vec3::ZERO;
    }
    // Sitting on the threat: flee backwards
    let away = offset.normalize_or(-forward);
    away + jitter(tuning.threat_jitter, rng)
}

fn jitter(amount: f32, rng: &mut impl Rng) -> Vec3 {
    if amount <= 0.0 {
        return Vec3::ZERO;
    }
    Vec3::new(
        rng.gen_range(-amount..=amount),
        rng.gen_range(-amount..=amount),
        rng.gen_range(-amount..=amount),
    )
}

/// Vertical preference for the depth band. Above the band the pull down
/// grows with height; below its floor the agent drifts up; the middle of
/// the band is neutral.
pub fn depth_bias(height: f32, band: &DepthBand) -> Vec3 {
    let vertical = if height > band.ceiling + band.surface_margin {
        -1.0
    } else if height > band.ceiling {
        -0.5
    } else if height > band.comfort_top {
        -0.2
    } else if height < band.floor {
        0.5
    } else {
        0.0
    };
    Vec3::new(0.0, vertical, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::FlockAgent;
    use hecs::World;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn agent(world: &mut World, position: Vec3, forward: Vec3) -> AgentSnapshot {
        AgentSnapshot {
            entity: world.spawn((FlockAgent,)),
            position,
            forward,
            velocity: forward,
            linear_damping: 0.0,
        }
    }

    fn approx(a: Vec3, b: Vec3) -> bool {
        a.distance(&b) < 1.0e-4
    }

    const FOV90: f32 = 0.0;

    #[test]
    fn test_cohesion_points_at_visible_center() {
        let mut world = World::new();
        let population = vec![
            agent(&mut world, Vec3::ZERO, Vec3::FORWARD),
            agent(&mut world, Vec3::new(1.0, 0.0, 2.0), Vec3::FORWARD),
            agent(&mut world, Vec3::new(-1.0, 0.0, 2.0), Vec3::FORWARD),
            // Behind, filtered by the field of view
            agent(&mut world, Vec3::new(0.0, 0.0, -3.0), Vec3::FORWARD),
        ];
        let v = cohesion(&population[0], &population, &[1, 2, 3], FOV90);
        assert!(approx(v, Vec3::FORWARD));
    }

    #[test]
    fn test_cohesion_without_visible_neighbors_is_zero() {
        let mut world = World::new();
        let population = vec![
            agent(&mut world, Vec3::ZERO, Vec3::FORWARD),
            agent(&mut world, Vec3::new(0.0, 0.0, -1.0), Vec3::FORWARD),
        ];
        assert_eq!(cohesion(&population[0], &population, &[1], FOV90), Vec3::ZERO);
        assert_eq!(cohesion(&population[0], &population, &[], FOV90), Vec3::ZERO);
    }

    #[test]
    fn test_avoidance_points_away() {
        let mut world = World::new();
        let population = vec![
            agent(&mut world, Vec3::ZERO, Vec3::FORWARD),
            agent(&mut world, Vec3::new(0.5, 0.0, 0.5), Vec3::FORWARD),
        ];
        let v = avoidance(&population[0], &population, &[1], FOV90);
        assert!(approx(v, Vec3::new(-1.0, 0.0, -1.0).normalize()));
    }

    #[test]
    fn test_coincident_neighbor_does_not_produce_nan() {
        let mut world = World::new();
        let population = vec![
            agent(&mut world, Vec3::ZERO, Vec3::FORWARD),
            agent(&mut world, Vec3::ZERO, Vec3::FORWARD),
        ];
        let v = avoidance(&population[0], &population, &[1], FOV90);
        assert_eq!(v, Vec3::ZERO);
        let c = cohesion(&population[0], &population, &[1], FOV90);
        assert_eq!(c, Vec3::ZERO);
    }

    #[test]
    fn test_alignment_averages_headings() {
        let mut world = World::new();
        let population = vec![
            agent(&mut world, Vec3::ZERO, Vec3::FORWARD),
            agent(&mut world, Vec3::new(0.0, 0.0, 1.0), Vec3::RIGHT),
            agent(&mut world, Vec3::new(0.0, 0.0, 2.0), Vec3::FORWARD),
        ];
        let v = alignment(&population[0], &population, &[1, 2], FOV90);
        assert!(approx(v, Vec3::new(1.0, 0.0, 1.0).normalize()));
    }

    #[test]
    fn test_alignment_falls_back_to_own_heading() {
        let mut world = World::new();
        let population = vec![agent(&mut world, Vec3::ZERO, Vec3::RIGHT)];
        assert_eq!(alignment(&population[0], &population, &[], FOV90), Vec3::RIGHT);
    }

    #[test]
    fn test_containment_pushes_toward_center() {
        let limits = Containment {
            bounds_distance: 10.0,
            upper_limit: -1.0,
            lower_limit: -20.0,
        };
        assert_eq!(containment(Vec3::new(0.0, -5.0, 0.0), &limits), Vec3::ZERO);
        let push = containment(Vec3::new(12.0, -5.0, 0.0), &limits);
        assert!(approx(push, Vec3::new(-1.0, 0.0, 0.0)));
        assert!(approx(containment(Vec3::new(0.0, -5.0, -12.0), &limits), Vec3::FORWARD));
        assert!(approx(containment(Vec3::new(0.0, 0.0, 0.0), &limits), -Vec3::UP));
        assert!(approx(containment(Vec3::new(0.0, -25.0, 0.0), &limits), Vec3::UP));

        let corner = containment(Vec3::new(11.0, 2.0, 11.0), &limits);
        assert!((corner.length() - 1.0).abs() < 1.0e-4);
        assert!(corner.x < 0.0 && corner.y < 0.0 && corner.z < 0.0);
    }

    #[test]
    fn test_threat_inside_radius_repels() {
        let tuning = BehaviorTuning::default();
        let mut rng = StdRng::seed_from_u64(3);
        let threat = Some(Vec3::new(3.0, 0.0, 0.0));
        let v = threat_avoidance(Vec3::ZERO, Vec3::FORWARD, threat, &tuning, &mut rng);
        assert!(v.x < -0.8);
        assert!(v.y.abs() <= tuning.threat_jitter + 1.0e-6);
    }

    #[test]
    fn test_threat_outside_radius_or_missing_is_ignored() {
        let tuning = BehaviorTuning::default();
        let mut rng = StdRng::seed_from_u64(3);
        let far = Some(Vec3::new(30.0, 0.0, 0.0));
        assert_eq!(threat_avoidance(Vec3::ZERO, Vec3::FORWARD, far, &tuning, &mut rng), Vec3::ZERO);
        let none = threat_avoidance(Vec3::ZERO, Vec3::FORWARD, None, &tuning, &mut rng);
        assert_eq!(none, Vec3::ZERO);
    }

    #[test]
    fn test_threat_on_top_of_agent_flees_backwards() {
        let tuning = BehaviorTuning {
            threat_jitter: 0.0,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        let v = threat_avoidance(Vec3::ZERO, Vec3::FORWARD, Some(Vec3::ZERO), &tuning, &mut rng);
        assert_eq!(v, -Vec3::FORWARD);
    }

    #[test]
    fn test_depth_bias_piecewise() {
        let band = DepthBand::default();
        assert_eq!(depth_bias(0.0, &band).y, -1.0);
        assert_eq!(depth_bias(-2.0, &band).y, -0.5);
        assert_eq!(depth_bias(-4.0, &band).y, -0.2);
        assert_eq!(depth_bias(-8.0, &band).y, 0.0);
        assert_eq!(depth_bias(-15.0, &band).y, 0.5);
        assert_eq!(depth_bias(-15.0, &band).x, 0.0);
    }

    #[test]
    fn test_blend_damps_vertical_and_applies_weights() {
        let config = FlockConfig::default();
        let contributions = SteeringContributions {
            bounds: Vec3::new(0.0, 1.0, 0.0),
            alignment: Vec3::FORWARD,
            ..Default::default()
        };
        let blended = contributions.blend(&config);
        let expected_y = config.bounds_weight * config.tuning.vertical_damping;
        assert!((blended.y - expected_y).abs() < 1.0e-5);
        assert!((blended.z - config.alignment_weight).abs() < 1.0e-5);
    }

    #[test]
    fn test_zero_weights_exclude_behaviors() {
        let config = FlockConfig {
            cohesion_weight: 0.0,
            avoidance_weight: 0.0,
            ..Default::default()
        };
        let contributions = SteeringContributions {
            cohesion: Vec3::RIGHT,
            avoidance: Vec3::FORWARD,
            ..Default::default()
        };
        assert_eq!(contributions.blend(&config), Vec3::ZERO);
    }

    #[test]
    fn test_separation_band_between_cohesion_and_avoidance() {
        // Inside the avoidance radius the push apart wins; between the two
        // radii the pull together wins.
        let config = FlockConfig {
            cohesion_weight: 1.0,
            avoidance_weight: 2.0,
            cohesion_distance: 5.0,
            avoidance_distance: 1.5,
            ..Default::default()
        };
        let mut world = World::new();
        for (distance, expect_apart) in [(0.8, true), (1.4, true), (2.5, false), (4.5, false)] {
            let population = vec![
                agent(&mut world, Vec3::ZERO, Vec3::RIGHT),
                agent(&mut world, Vec3::new(distance, 0.0, 0.0), Vec3::RIGHT),
            ];
            let in_avoidance = distance <= config.avoidance_distance;
            let avoid_set: &[usize] = if in_avoidance { &[1] } else { &[] };
            let contributions = SteeringContributions {
                cohesion: cohesion(&population[0], &population, &[1], FOV90),
                avoidance: avoidance(&population[0], &population, avoid_set, FOV90),
                ..Default::default()
            };
            let toward_neighbor = contributions.blend(&config).x;
            assert_eq!(toward_neighbor < 0.0, expect_apart, "distance {}", distance);
        }
    }
}
