//! Systems - logic that operates on agent components

mod agent;
mod integration;
mod neighbors;
mod obstacle;
mod speed;
mod steering;

pub use agent::*;
pub use integration::*;
pub use neighbors::*;
pub use obstacle::*;
pub use speed::*;
pub use steering::*;
