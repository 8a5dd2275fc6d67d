//! Triangle meshes and the ray-triangle intersection primitive.

#[macro_use]
extern crate log;
extern crate ply_rs;

mod intersector;
mod mesh;
mod plymesh;
mod procedural;
mod triangle;

// Re-export
pub use intersector::*;
pub use mesh::*;
pub use plymesh::*;
pub use triangle::*;
