//! Scene

use crate::geometry::Geometry;
use crate::raycaster::Raycaster;
use ordered_float::OrderedFloat;
use raycast_core::pbrt::Float;
use raycast_core::Result;
use raycast_shapes::TriangleHit;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Source of unique mesh identifiers.
static NEXT_MESH_ID: AtomicUsize = AtomicUsize::new(0);

/// A named instance of geometry. Several meshes can share the same geometry
/// and therefore the same bounds tree.
#[derive(Clone)]
pub struct Mesh {
    /// Unique identifier.
    id: usize,

    /// Name.
    pub name: String,

    /// The geometry.
    pub geometry: Arc<Geometry>,
}

impl Mesh {
    /// Create a new mesh.
    ///
    /// * `name`     - Name.
    /// * `geometry` - The geometry.
    pub fn new(name: &str, geometry: Arc<Geometry>) -> Self {
        Self {
            id: NEXT_MESH_ID.fetch_add(1, Ordering::Relaxed),
            name: name.to_string(),
            geometry,
        }
    }

    /// Returns a new mesh with its own identifier that shares this mesh's
    /// geometry.
    pub fn instance(&self) -> Self {
        Self::new(&self.name, Arc::clone(&self.geometry))
    }

    /// Returns the unique identifier.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Casts a ray into the mesh geometry.
    ///
    /// * `raycaster` - The ray and query mode.
    pub fn raycast(&self, raycaster: &Raycaster) -> Result<Vec<Intersection>> {
        Ok(self
            .geometry
            .raycast(raycaster)?
            .into_iter()
            .map(|hit| Intersection {
                distance: hit.t,
                hit,
                mesh_id: self.id,
            })
            .collect())
    }
}

/// A ray-triangle intersection tagged with the mesh that was hit.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Intersection {
    /// Distance from the ray origin.
    pub distance: Float,

    /// The triangle hit.
    pub hit: TriangleHit,

    /// Identifier of the mesh.
    pub mesh_id: usize,
}

/// A flat collection of meshes.
#[derive(Clone, Default)]
pub struct Scene {
    meshes: Vec<Mesh>,
}

impl Scene {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a mesh to the scene.
    ///
    /// * `mesh` - The mesh.
    pub fn add(&mut self, mesh: Mesh) {
        self.meshes.push(mesh);
    }

    /// Returns the meshes.
    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    /// Returns the mesh with the given identifier.
    ///
    /// * `id` - Mesh identifier.
    pub fn mesh(&self, id: usize) -> Option<&Mesh> {
        self.meshes.iter().find(|m| m.id == id)
    }

    /// Casts a ray into every mesh and returns the hits sorted by distance.
    /// With `first_hit_only` each mesh contributes at most its closest hit.
    ///
    /// * `raycaster` - The ray and query mode.
    pub fn intersect_objects(&self, raycaster: &Raycaster) -> Result<Vec<Intersection>> {
        let mut intersections = vec![];
        for mesh in self.meshes.iter() {
            intersections.extend(mesh.raycast(raycaster)?);
        }
        intersections.sort_by_key(|i| (OrderedFloat(i.distance), i.mesh_id, i.hit.triangle));
        Ok(intersections)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
