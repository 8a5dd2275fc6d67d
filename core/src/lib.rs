//! Core types shared by the mesh ray casting crates: floating point helpers, 3-D geometry
//! primitives, errors and intersection statistics.

pub mod error;
pub mod geometry;
pub mod pbrt;
pub mod stats;

// Re-export
pub use error::*;
