//! Raycaster

use raycast_core::geometry::*;
use raycast_core::pbrt::*;
use raycast_shapes::{IntersectOptions, Side};

/// A ray along with the limits and mode used to cast it into geometry.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Raycaster {
    /// The ray. Its direction does not need to be normalized; distances are
    /// measured along the normalized direction.
    pub ray: Ray,

    /// Hits closer than this distance are dropped.
    pub near: Float,

    /// Hits further than this distance are dropped.
    pub far: Float,

    /// Report only the closest hit of each mesh.
    pub first_hit_only: bool,

    /// Faces that can be hit.
    pub side: Side,
}

impl Default for Raycaster {
    fn default() -> Self {
        Self {
            ray: Ray::default(),
            near: 0.0,
            far: INFINITY,
            first_hit_only: false,
            side: Side::default(),
        }
    }
}

impl Raycaster {
    /// Create a new `Raycaster` with no distance limits that reports all hits
    /// on either side of a triangle.
    ///
    /// * `origin`    - Ray origin.
    /// * `direction` - Ray direction.
    pub fn new(origin: Point3f, direction: Vector3f) -> Self {
        Self {
            ray: Ray::unbounded(origin, direction),
            ..Default::default()
        }
    }

    /// Updates the ray.
    ///
    /// * `origin`    - Ray origin.
    /// * `direction` - Ray direction.
    pub fn set(&mut self, origin: Point3f, direction: Vector3f) {
        self.ray = Ray::unbounded(origin, direction);
    }

    /// Returns the raycaster with the given distance limits.
    ///
    /// * `near` - Minimum distance.
    /// * `far`  - Maximum distance.
    pub fn with_limits(self, near: Float, far: Float) -> Self {
        Self { near, far, ..self }
    }

    /// Returns the raycaster with the given query mode.
    ///
    /// * `first_hit_only` - Report only the closest hit of each mesh.
    pub fn with_first_hit_only(self, first_hit_only: bool) -> Self {
        Self {
            first_hit_only,
            ..self
        }
    }

    /// Returns the raycaster with the given face culling.
    ///
    /// * `side` - Faces that can be hit.
    pub fn with_side(self, side: Side) -> Self {
        Self { side, ..self }
    }

    /// Returns the ray used for queries; its extent ends at `far`.
    pub fn query_ray(&self) -> Ray {
        Ray::new(self.ray.o, self.ray.d, self.far)
    }

    /// Returns the triangle intersection options.
    pub fn intersect_options(&self) -> IntersectOptions {
        IntersectOptions::with_side(self.side)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
