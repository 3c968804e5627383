//! Shoal Core - 3D flocking engine
//!
//! Simulates a school of agents swimming inside a bounded volume. Each
//! tick every agent blends cohesion, avoidance and alignment with its
//! neighbors, containment, obstacle avoidance, threat evasion and a
//! preferred depth band into a heading, smooths it, and moves at the
//! flock's shared cruising speed.
//!
//! # Architecture
//!
//! Agents live in a `hecs` world owned by [`registry::FlockRegistry`]:
//! - **Components**: pure agent data (Transform, Body, Steering)
//! - **Systems**: neighbor scans, steering behaviors, smoothing, integration
//! - **Environment**: obstacle queries and the optional threat, passed per tick
//!
//! # Example
//!
//! ```rust,no_run
//! use shoal_core::prelude::*;
//!
//! let config = FlockConfig {
//!     seed: Some(7),
//!     ..Default::default()
//! };
//! let mut flock = FlockRegistry::from_config(config).expect("valid config");
//!
//! let rocks = ObstacleField::new().with(Obstacle::sphere(Vec3::new(0.0, -8.0, 0.0), 2.0));
//! let env = Environment::new(&rocks).with_threat(Vec3::new(10.0, -8.0, 0.0));
//! loop {
//!     flock.tick(1.0 / 50.0, &env);
//! }
//! ```

pub mod components;
pub mod config;
pub mod environment;
pub mod generation;
pub mod registry;
pub mod systems;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::config::{ConfigError, FlockConfig, UpdateMode};
    pub use crate::environment::{
        Environment, LayerMask, NoObstacles, Obstacle, ObstacleField, ObstacleQuery,
    };
    pub use crate::registry::{FlockRegistry, FlockStats};
    pub use crate::systems::AgentSnapshot;
}
