//! Per-agent update - classify neighbors, steer, smooth, integrate.

use rand::Rng;

use super::integration::{integrate_position, resolve_heading, smooth_damp};
use super::neighbors::{classify_neighbors, AgentSnapshot, NeighborRadii};
use super::obstacle::obstacle_avoidance;
use super::steering::{
    alignment, avoidance, cohesion, containment, depth_bias, threat_avoidance,
    SteeringContributions,
};
use crate::components::{Basis, Steering, Vec3};
use crate::config::FlockConfig;
use crate::environment::Environment;

/// Shared inputs for every agent update in one tick
pub struct TickContext<'a> {
    pub config: &'a FlockConfig,
    pub environment: &'a Environment<'a>,
    /// Shared cruising speed for this tick
    pub speed: f32,
    pub dt: f32,
}

impl TickContext<'_> {
    pub fn radii(&self) -> NeighborRadii {
        NeighborRadii {
            cohesion: self.config.cohesion_distance,
            avoidance: self.config.avoidance_distance,
            alignment: self.config.alignment_distance,
        }
    }
}

/// New kinematic state of one agent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentMotion {
    pub position: Vec3,
    pub forward: Vec3,
    pub velocity: Vec3,
}

impl AgentSnapshot {
    pub fn with_motion(mut self, motion: &AgentMotion) -> Self {
        self.position = motion.position;
        self.forward = motion.forward;
        self.velocity = motion.velocity;
        self
    }
}

/// Evaluate every behavior for the agent at `index`.
///
/// Mutates only the agent's obstacle cache.
pub fn compute_steering(
    index: usize,
    population: &[AgentSnapshot],
    steering: &mut Steering,
    ctx: &TickContext<'_>,
    rng: &mut impl Rng,
) -> SteeringContributions {
    let Some(me) = population.get(index) else {
        return SteeringContributions::default();
    };
    let config = ctx.config;
    let tuning = &config.tuning;
    let fov_cos = tuning.fov_cos();
    let neighbors = classify_neighbors(index, population, &ctx.radii());
    let basis = Basis::from_forward(me.forward);

    SteeringContributions {
        cohesion: cohesion(me, population, &neighbors.cohesion, fov_cos),
        avoidance: avoidance(me, population, &neighbors.avoidance, fov_cos),
        alignment: alignment(me, population, &neighbors.alignment, fov_cos),
        bounds: containment(me.position, &config.containment),
        obstacle: obstacle_avoidance(
            ctx.environment.obstacles,
            me.position,
            &basis,
            config.obstacle_distance,
            config.obstacle_mask,
            &mut steering.avoidance,
        ),
        threat: threat_avoidance(me.position, me.forward, ctx.environment.threat, tuning, rng),
        depth: depth_bias(me.position.y, &tuning.depth_band),
    }
}

/// Full update for the agent at `index`: steer, smooth against last tick's
/// heading, then move at the shared speed along the result.
pub fn update_agent(
    index: usize,
    population: &[AgentSnapshot],
    steering: &mut Steering,
    ctx: &TickContext<'_>,
    rng: &mut impl Rng,
) -> Option<AgentMotion> {
    let me = *population.get(index)?;
    let blended = compute_steering(index, population, steering, ctx, rng).blend(ctx.config);

    let smoothed = smooth_damp(
        steering.smoothed_heading,
        blended,
        &mut steering.heading_velocity,
        ctx.config.tuning.smooth_time,
        ctx.dt,
    );
    steering.smoothed_heading = smoothed;

    let forward = resolve_heading(smoothed, me.forward);
    let velocity = forward * ctx.speed;
    let position = integrate_position(me.position, velocity, me.linear_damping, ctx.dt);

    Some(AgentMotion {
        position,
        forward,
        velocity,
    })
}
