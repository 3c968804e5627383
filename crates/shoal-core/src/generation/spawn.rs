//! Flock spawning

use hecs::{Entity, World};
use rand::Rng;
use std::f32::consts::TAU;

use crate::components::*;
use crate::config::FlockConfig;

/// Spawn `count` agents inside `volume`.
///
/// Each agent gets a uniform position in the volume, a random heading
/// about the vertical axis and a cruising speed in
/// `[min_speed, max_speed]`. Returns the entities in spawn order.
pub fn spawn_flock(
    world: &mut World,
    count: u32,
    volume: &BoundingBox,
    config: &FlockConfig,
    rng: &mut impl Rng,
) -> Vec<Entity> {
    let mut agents = Vec::with_capacity(count as usize);

    for _ in 0..count {
        let position = volume.sample(rng);
        let forward = random_heading(rng);
        let speed = random_speed(rng, config.min_speed, config.max_speed);
        agents.push(spawn_agent(world, position, forward, speed, config.linear_damping));
    }

    agents
}

/// Spawn one agent with the given placement
pub fn spawn_agent(
    world: &mut World,
    position: Vec3,
    forward: Vec3,
    speed: f32,
    linear_damping: f32,
) -> Entity {
    let transform = Transform::new(position, forward);
    world.spawn((
        FlockAgent,
        transform,
        Body::new(transform.forward * speed, linear_damping),
        Steering::new(transform.forward),
    ))
}

/// Unit heading in the horizontal plane
pub fn random_heading(rng: &mut impl Rng) -> Vec3 {
    let yaw = rng.gen_range(0.0..TAU);
    Vec3::new(yaw.sin(), 0.0, yaw.cos())
}

fn random_speed(rng: &mut impl Rng, min: f32, max: f32) -> f32 {
    if max > min {
        rng.gen_range(min..=max)
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
    fn test_spawn_flock_places_agents_in_volume() {
        let mut world = World::new();
        let mut rng = StdRng::seed_from_u64(42);
        let config = FlockConfig::default();
        let volume = config.spawn_volume;

        let agents = spawn_flock(&mut world, 50, &volume, &config, &mut rng);
        assert_eq!(agents.len(), 50);

        for entity in agents {
            let transform = world.get::<&Transform>(entity).unwrap();
            let body = world.get::<&Body>(entity).unwrap();
            assert!(volume.contains(&transform.position));
            assert!((transform.forward.length() - 1.0).abs() < 1.0e-4);
            assert_eq!(transform.forward.y, 0.0);
            assert!(body.speed() >= config.min_speed - 1.0e-4);
            assert!(body.speed() <= config.max_speed + 1.0e-4);
            assert_eq!(body.linear_damping, config.linear_damping);
            assert!(world.get::<&FlockAgent>(entity).is_ok());
        }
    }

    #[test]
    fn test_spawn_zero_agents() {
        let mut world = World::new();
        let mut rng = StdRng::seed_from_u64(1);
        let config = FlockConfig::default();
        assert!(spawn_flock(&mut world, 0, &config.spawn_volume, &config, &mut rng).is_empty());
        assert_eq!(world.len(), 0);
    }

    #[test]
    fn test_steering_starts_on_heading() {
        let mut world = World::new();
        let entity = spawn_agent(&mut world, Vec3::ZERO, Vec3::RIGHT * 3.0, 2.0, 0.5);
        let steering = world.get::<&Steering>(entity).unwrap();
        assert_eq!(steering.smoothed_heading, Vec3::RIGHT);
        assert!(steering.avoidance.is_empty());
    }
}
