//! Shared cruising speed - the one flock-wide value derived from agents.
//!
//! Each agent's local consensus is the mean speed of its cohesion
//! neighbors. The registry reduces those into a single value once per tick,
//! from the tick-start snapshot, before any agent moves.

use serde::{Deserialize, Serialize};

use super::neighbors::AgentSnapshot;

/// Registry-owned cruising speed, kept within `[min, max]`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SharedSpeed {
    value: f32,
    min: f32,
    max: f32,
}

impl SharedSpeed {
    pub fn new(value: f32, min: f32, max: f32) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        let value = if value.is_finite() { value } else { (min + max) * 0.5 };
        Self {
            value: value.clamp(min, max),
            min,
            max,
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn bounds(&self) -> (f32, f32) {
        (self.min, self.max)
    }

    /// Set a new value, clamped. Non-finite input is ignored.
    pub fn set(&mut self, value: f32) {
        if value.is_finite() {
            self.value = value.clamp(self.min, self.max);
        }
    }

    /// Fold the flock's local consensus speeds into the shared value. When
    /// no agent has a cohesion neighbor the last value is kept.
    pub fn reduce(&mut self, population: &[AgentSnapshot], cohesion_distance: f32) -> Option<f32> {
        let mut total = 0.0;
        let mut contributors = 0usize;
        for index in 0..population.len() {
            if let Some(local) = local_consensus(index, population, cohesion_distance) {
                total += local;
                contributors += 1;
            }
        }
        if contributors == 0 {
            return None;
        }
        self.set(total / contributors as f32);
        Some(self.value)
    }
}

/// Mean speed of the cohesion neighbors of the agent at `index`
pub fn local_consensus(
    index: usize,
    population: &[AgentSnapshot],
    cohesion_distance: f32,
) -> Option<f32> {
    let me = population.get(index)?;
    let radius_sq = cohesion_distance * cohesion_distance;
    let mut total = 0.0;
    let mut count = 0usize;
    for (j, other) in population.iter().enumerate() {
        if j == index {
            continue;
        }
        if me.position.distance_squared(&other.position) <= radius_sq {
            total += other.velocity.length();
            count += 1;
        }
    }
    (count > 0).then(|| total / count as f32)
}
