//! Attaches bounding volume hierarchies to mesh geometry and dispatches ray
//! casts through them, falling back to a linear scan when none is attached.

#[macro_use]
extern crate log;

mod geometry;
mod raycaster;
mod scene;

// Re-export
pub use geometry::*;
pub use raycaster::*;
pub use scene::*;
