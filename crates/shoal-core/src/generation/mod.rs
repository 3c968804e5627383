//! Generation - initial placement of the flock

mod spawn;

pub use spawn::*;
