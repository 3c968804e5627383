//! Flock registry - owns the population and drives the per-tick update.

use hecs::{Entity, World};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::components::*;
use crate::config::{ConfigError, FlockConfig, UpdateMode};
use crate::environment::Environment;
use crate::generation::{spawn_agent, spawn_flock};
use crate::systems::*;

/// Aggregate view of the flock after the last tick
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FlockStats {
    pub population: usize,
    pub live: usize,
    pub centroid: Vec3,
    pub mean_speed: f32,
    pub shared_speed: f32,
    pub ticks: u64,
}

/// Owns the flock: configuration, the ECS world holding the agents, the
/// ordered population, and the shared cruising speed.
pub struct FlockRegistry {
    /// ECS world containing the agent entities
    world: World,
    /// Agent handles in update order. Handles are never removed; entries
    /// despawned from the world are skipped.
    population: Vec<Entity>,
    config: FlockConfig,
    shared_speed: SharedSpeed,
    rng: StdRng,
    ticks: u64,
}

impl FlockRegistry {
    /// Create a registry with no agents
    pub fn new(mut config: FlockConfig) -> Result<Self, ConfigError> {
        config.sanitize();
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let midpoint = (config.min_speed + config.max_speed) * 0.5;
        Ok(Self {
            world: World::new(),
            population: Vec::new(),
            shared_speed: SharedSpeed::new(midpoint, config.min_speed, config.max_speed),
            config,
            rng,
            ticks: 0,
        })
    }

    /// Create a registry and spawn `config.flock_size` agents inside
    /// `volume`.
    pub fn initialize(mut config: FlockConfig, volume: BoundingBox) -> Result<Self, ConfigError> {
        config.spawn_volume = volume;
        let mut registry = Self::new(config)?;
        let count = registry.config.flock_size;
        let agents = spawn_flock(
            &mut registry.world,
            count,
            &volume,
            &registry.config,
            &mut registry.rng,
        );
        registry.population = agents;

        let samples = sample_population(&registry.world, &registry.population);
        if !samples.is_empty() {
            let total: f32 = samples.iter().map(|s| s.velocity.length()).sum();
            let mean = total / samples.len() as f32;
            registry.shared_speed.set(mean);
        }

        log::info!(
            "Spawned flock of {} agents in {:?}..{:?} (shared speed {:.2})",
            count,
            volume.min,
            volume.max,
            registry.shared_speed.value()
        );
        Ok(registry)
    }

    /// Spawn using the volume carried by the config
    pub fn from_config(config: FlockConfig) -> Result<Self, ConfigError> {
        let volume = config.spawn_volume;
        Self::initialize(config, volume)
    }

    /// Append an agent at an explicit placement
    pub fn add_agent(&mut self, position: Vec3, forward: Vec3, speed: f32) -> Entity {
        let (min, max) = self.shared_speed.bounds();
        let speed = if speed.is_finite() { speed.clamp(min, max) } else { min };
        let damping = self.config.linear_damping;
        let entity = spawn_agent(&mut self.world, position, forward, speed, damping);
        self.population.push(entity);
        entity
    }

    /// Remove an agent from the world. Its population slot stays and is
    /// skipped from then on.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        self.world.despawn(entity).is_ok()
    }

    /// Advance every live agent by `dt` seconds
    pub fn tick(&mut self, dt: f32, environment: &Environment<'_>) {
        if !dt.is_finite() || dt < 0.0 {
            log::warn!("Ignoring tick with invalid dt {}", dt);
            return;
        }
        self.ticks += 1;

        let mut samples = sample_population(&self.world, &self.population);
        if samples.is_empty() {
            return;
        }

        self.shared_speed.reduce(&samples, self.config.cohesion_distance);

        let ctx = TickContext {
            config: &self.config,
            environment,
            speed: self.shared_speed.value(),
            dt,
        };

        match self.config.update_mode {
            UpdateMode::Sequential => {
                for index in 0..samples.len() {
                    let entity = samples[index].entity;
                    let Ok(mut steering) = self.world.get::<&mut Steering>(entity) else {
                        continue;
                    };
                    let motion =
                        update_agent(index, &samples, &mut steering, &ctx, &mut self.rng);
                    let Some(motion) = motion else {
                        continue;
                    };
                    drop(steering);
                    apply_motion(&self.world, entity, &motion);
                    // Later agents in this tick see the moved state
                    samples[index] = samples[index].with_motion(&motion);
                }
            }
            UpdateMode::DoubleBuffered => {
                let mut pending = Vec::with_capacity(samples.len());
                for (index, sample) in samples.iter().enumerate() {
                    let Ok(mut steering) = self.world.get::<&mut Steering>(sample.entity) else {
                        continue;
                    };
                    let motion = update_agent(index, &samples, &mut steering, &ctx, &mut self.rng);
                    if let Some(motion) = motion {
                        pending.push((sample.entity, motion));
                    }
                }
                for (entity, motion) in pending {
                    apply_motion(&self.world, entity, &motion);
                }
            }
        }
    }

    /// Current state of every live agent, in population order
    pub fn agent_states(&self) -> Vec<AgentSnapshot> {
        sample_population(&self.world, &self.population)
    }

    pub fn agent_state(&self, entity: Entity) -> Option<AgentSnapshot> {
        let transform = self.world.get::<&Transform>(entity).ok()?;
        let body = self.world.get::<&Body>(entity).ok()?;
        Some(AgentSnapshot::from_parts(entity, &transform, &body))
    }

    pub fn stats(&self) -> FlockStats {
        let samples = self.agent_states();
        let live = samples.len();
        let (centroid, mean_speed) = if live == 0 {
            (Vec3::ZERO, 0.0)
        } else {
            let mut sum = Vec3::ZERO;
            let mut speed = 0.0;
            for s in &samples {
                sum += s.position;
                speed += s.velocity.length();
            }
            (sum / live as f32, speed / live as f32)
        };
        FlockStats {
            population: self.population.len(),
            live,
            centroid,
            mean_speed,
            shared_speed: self.shared_speed.value(),
            ticks: self.ticks,
        }
    }

    pub fn population(&self) -> &[Entity] {
        &self.population
    }

    pub fn live_count(&self) -> usize {
        self.population.iter().filter(|&&e| self.world.contains(e)).count()
    }

    pub fn config(&self) -> &FlockConfig {
        &self.config
    }

    pub fn shared_speed(&self) -> f32 {
        self.shared_speed.value()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn world(&self) -> &World {
        &self.world
    }
}

fn apply_motion(world: &World, entity: Entity, motion: &AgentMotion) {
    if let Ok(mut transform) = world.get::<&mut Transform>(entity) {
        transform.position = motion.position;
        transform.forward = motion.forward;
    }
    if let Ok(mut body) = world.get::<&mut Body>(entity) {
        body.velocity = motion.velocity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(flock_size: u32) -> FlockConfig {
        FlockConfig {
            flock_size,
            seed: Some(11),
            ..Default::default()
        }
    }

    #[test]
    fn test_registry_creation() {
        let registry = FlockRegistry::new(seeded(0)).unwrap();
        assert!(registry.population().is_empty());
        assert_eq!(registry.ticks(), 0);
        assert_eq!(registry.shared_speed(), 2.0);
    }

    #[test]
    fn test_initialize_spawns_flock() {
        let config = seeded(25);
        let volume = config.spawn_volume;
        let registry = FlockRegistry::initialize(config, volume).unwrap();
        assert_eq!(registry.population().len(), 25);
        assert_eq!(registry.live_count(), 25);
        let speed = registry.shared_speed();
        assert!((1.0..=3.0).contains(&speed));
    }

    #[test]
    fn test_initialize_rejects_inverted_volume() {
        let volume = BoundingBox::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0));
        assert!(FlockRegistry::initialize(seeded(5), volume).is_err());
    }

    #[test]
    fn test_empty_tick_counts() {
        let mut registry = FlockRegistry::new(seeded(0)).unwrap();
        registry.tick(0.02, &Environment::open_water());
        assert_eq!(registry.ticks(), 1);
        assert_eq!(registry.stats().live, 0);
    }

    #[test]
    fn test_invalid_dt_is_ignored() {
        let mut registry = FlockRegistry::from_config(seeded(3)).unwrap();
        let before = registry.agent_states();
        registry.tick(f32::NAN, &Environment::open_water());
        registry.tick(-1.0, &Environment::open_water());
        assert_eq!(registry.ticks(), 0);
        assert_eq!(registry.agent_states(), before);
    }

    #[test]
    fn test_despawned_agents_are_skipped() {
        let mut registry = FlockRegistry::from_config(seeded(5)).unwrap();
        let victim = registry.population()[2];
        assert!(registry.despawn(victim));
        assert!(!registry.despawn(victim));

        registry.tick(0.05, &Environment::open_water());
        let stats = registry.stats();
        assert_eq!(stats.population, 5);
        assert_eq!(stats.live, 4);
        assert!(registry.agent_state(victim).is_none());
    }

    #[test]
    fn test_add_agent_clamps_speed() {
        let mut registry = FlockRegistry::new(seeded(0)).unwrap();
        let entity = registry.add_agent(Vec3::new(0.0, -8.0, 0.0), Vec3::FORWARD, 50.0);
        let state = registry.agent_state(entity).unwrap();
        assert!((state.velocity.length() - 3.0).abs() < 1.0e-5);
    }

    #[test]
    fn test_tick_moves_agents() {
        let mut registry = FlockRegistry::from_config(seeded(10)).unwrap();
        let before = registry.agent_states();
        registry.tick(0.1, &Environment::open_water());
        let after = registry.agent_states();
        for (a, b) in before.iter().zip(after.iter()) {
            assert_eq!(a.entity, b.entity);
            assert!(a.position.distance(&b.position) > 0.0);
        }
    }
}
