//! Ray intersection acceleration data structures for triangle meshes.

#[macro_use]
extern crate log;

mod bvh;

// Re-export
pub use bvh::*;
