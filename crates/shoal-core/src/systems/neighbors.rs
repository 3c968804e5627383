//! Neighbor classification - radius scans over the population snapshot.

use hecs::{Entity, World};

use crate::components::{Body, Transform, Vec3, EPSILON};

/// Per-agent state read by other agents during a tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentSnapshot {
    pub entity: Entity,
    pub position: Vec3,
    pub forward: Vec3,
    pub velocity: Vec3,
    pub linear_damping: f32,
}

impl AgentSnapshot {
    pub fn from_parts(entity: Entity, transform: &Transform, body: &Body) -> Self {
        Self {
            entity,
            position: transform.position,
            forward: transform.forward,
            velocity: body.velocity,
            linear_damping: body.linear_damping,
        }
    }
}

/// Read the live members of `population`, in order. Handles whose entity
/// was despawned, or that lack agent components, are skipped.
pub fn sample_population(world: &World, population: &[Entity]) -> Vec<AgentSnapshot> {
    let mut samples = Vec::with_capacity(population.len());
    for &entity in population {
        let Ok(transform) = world.get::<&Transform>(entity) else {
            continue;
        };
        let Ok(body) = world.get::<&Body>(entity) else {
            continue;
        };
        samples.push(AgentSnapshot::from_parts(entity, &transform, &body));
    }
    samples
}

/// Classification radii
#[derive(Debug, Clone, Copy)]
pub struct NeighborRadii {
    pub cohesion: f32,
    pub avoidance: f32,
    pub alignment: f32,
}

/// Indices into the population snapshot. The three sets are independent:
/// one neighbor may appear in all of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NeighborSets {
    pub cohesion: Vec<usize>,
    pub avoidance: Vec<usize>,
    pub alignment: Vec<usize>,
}

impl NeighborSets {
    pub fn is_empty(&self) -> bool {
        self.cohesion.is_empty() && self.avoidance.is_empty() && self.alignment.is_empty()
    }
}

/// Exhaustive scan of `population` around the agent at `index`.
pub fn classify_neighbors(
    index: usize,
    population: &[AgentSnapshot],
    radii: &NeighborRadii,
) -> NeighborSets {
    let mut sets = NeighborSets::default();
    let Some(me) = population.get(index) else {
        return sets;
    };

    let cohesion_sq = radii.cohesion * radii.cohesion;
    let avoidance_sq = radii.avoidance * radii.avoidance;
    let alignment_sq = radii.alignment * radii.alignment;

    for (j, other) in population.iter().enumerate() {
        if j == index || other.entity == me.entity {
            continue;
        }
        let dist_sq = me.position.distance_squared(&other.position);
        if dist_sq <= cohesion_sq {
            sets.cohesion.push(j);
        }
        if dist_sq <= avoidance_sq {
            sets.avoidance.push(j);
        }
        if dist_sq <= alignment_sq {
            sets.alignment.push(j);
        }
    }
    sets
}

/// True when `target` lies within the half-angle cone around `forward`.
/// A target at the observer's own position counts as visible.
pub fn in_field_of_view(position: Vec3, forward: Vec3, target: Vec3, fov_cos: f32) -> bool {
    let to_target = target - position;
    let len_sq = to_target.length_squared();
    if len_sq <= EPSILON {
        return true;
    }
    forward.dot(&to_target) / len_sq.sqrt() >= fov_cos - FOV_TOLERANCE
}

// Keeps a neighbor exactly on the cone edge visible despite rounding
const FOV_TOLERANCE: f32 = 1.0e-5;
