//! Component definitions for the ECS simulation.
//!
//! Components are pure data structs attached to agent entities.
//! They have no behavior - that lives in systems.

mod agent;
mod common;

pub use agent::*;
pub use common::*;
