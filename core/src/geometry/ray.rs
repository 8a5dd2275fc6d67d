//! Rays

use super::{Point3f, Vector3f};
use crate::error::{Error, Result};
use crate::pbrt::{Float, INFINITY};

/// A Ray
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ray {
    /// Origin.
    pub o: Point3f,

    /// Direction.
    pub d: Vector3f,

    /// Maximum extent of the ray.
    pub t_max: Float,
}

impl Ray {
    /// Returns a new ray.
    ///
    /// * `o`     - Origin.
    /// * `d`     - Direction.
    /// * `t_max` - Maximum extent of the ray.
    pub fn new(o: Point3f, d: Vector3f, t_max: Float) -> Self {
        Self { o, d, t_max }
    }

    /// Returns a ray with unlimited extent.
    ///
    /// * `o` - Origin.
    /// * `d` - Direction.
    pub fn unbounded(o: Point3f, d: Vector3f) -> Self {
        Self::new(o, d, INFINITY)
    }

    /// Returns the position along the ray at a given parameter value.
    ///
    /// * `t` - The parameter.
    pub fn at(&self, t: Float) -> Point3f {
        self.o + self.d * t
    }

    /// Returns true if origin or direction contain a NaN value.
    pub fn has_nans(&self) -> bool {
        self.o.has_nans() || self.d.has_nans() || self.t_max.is_nan()
    }

    /// Returns a copy of the ray with a unit length direction. Distances
    /// reported for the returned ray are therefore euclidean.
    ///
    /// Fails with `Error::InvalidRay` when the origin or direction are not
    /// finite, the direction has zero length or `t_max` is NaN.
    pub fn normalized(&self) -> Result<Ray> {
        if !self.o.is_finite() {
            return Err(Error::InvalidRay(format!("non-finite origin {:?}", self.o)));
        }
        if !self.d.is_finite() {
            return Err(Error::InvalidRay(format!(
                "non-finite direction {:?}",
                self.d
            )));
        }
        if self.t_max.is_nan() {
            return Err(Error::InvalidRay("t_max is NaN".to_string()));
        }

        let len = self.d.length();
        if len <= 0.0 || !len.is_finite() {
            return Err(Error::InvalidRay(format!(
                "zero length direction {:?}",
                self.d
            )));
        }

        Ok(Ray::new(self.o, self.d / len, self.t_max))
    }
}

impl Default for Ray {
    /// Returns a ray at the origin pointing along +Z with unlimited extent.
    fn default() -> Self {
        Self::unbounded(Point3f::ZERO, Vector3f::new(0.0, 0.0, 1.0))
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
