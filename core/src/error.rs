//! Error types for mesh ray casting.

use thiserror::Error;

/// Errors that can occur while building or querying mesh bounds trees.
#[derive(Error, Debug)]
pub enum Error {
    /// The ray cannot be used for a query; zero-length or non-finite direction, or
    /// non-finite origin.
    #[error("invalid ray: {0}")]
    InvalidRay(String),

    /// The vertex or index buffers do not describe a triangle mesh.
    #[error("invalid mesh: {0}")]
    InvalidMesh(String),

    /// A bounds tree was queried with a mesh other than the one it was built for.
    #[error("bounds tree was built for {expected} triangles but mesh has {actual}")]
    StaleBoundsTree { expected: usize, actual: usize },

    /// Reading a mesh file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A PLY file could not be parsed.
    #[error("unable to parse PLY file '{path}': {reason}")]
    Ply { path: String, reason: String },
}

/// Result type for mesh ray casting operations.
pub type Result<T> = std::result::Result<T, Error>;
