//! Triangles

use crate::mesh::TriangleMesh;
use raycast_core::geometry::*;
use raycast_core::pbrt::*;
use raycast_core::{stat_inc, stat_percent, stat_register_fns};
use std::fmt;
use std::str::FromStr;

stat_percent!(
    "Intersections/Ray-triangle intersection hits",
    N_HITS,
    N_TESTS,
    triangle_stats_hits,
);

stat_register_fns!(triangle_stats_hits);

/// Tolerance for barycentric coordinates so rays through shared edges and
/// vertices are not lost to rounding.
pub const BARYCENTRIC_EPSILON: Float = 1e-6;

/// A determinant whose magnitude is at most this fraction of the face normal
/// length is treated as a ray parallel to the triangle.
pub const PARALLEL_EPSILON: Float = 1e-9;

/// Which faces of a triangle can be hit. The front face is the one whose
/// vertices appear counter-clockwise to the viewer.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Side {
    /// Only front faces.
    Front,

    /// Only back faces.
    Back,

    /// Both faces.
    #[default]
    Double,
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "front" => Ok(Self::Front),
            "back" => Ok(Self::Back),
            "double" => Ok(Self::Double),
            _ => Err(format!("unknown side '{s}', expected front, back or double")),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Front => write!(f, "front"),
            Self::Back => write!(f, "back"),
            Self::Double => write!(f, "double"),
        }
    }
}

/// Options for ray-triangle intersection tests.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct IntersectOptions {
    /// Faces that can be hit.
    pub side: Side,

    /// Report hits behind the ray origin (negative distances).
    pub allow_negative: bool,
}

impl IntersectOptions {
    /// Returns options that only accept hits on the given side.
    ///
    /// * `side` - Faces that can be hit.
    pub fn with_side(side: Side) -> Self {
        Self {
            side,
            ..Self::default()
        }
    }
}

/// A ray-triangle intersection.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TriangleHit {
    /// Parametric distance along the ray.
    pub t: Float,

    /// Hit point.
    pub point: Point3f,

    /// Index of the triangle in its mesh.
    pub triangle: usize,

    /// Vertex indices of the triangle.
    pub vertices: [usize; 3],

    /// Unit face normal facing the ray origin.
    pub normal: Normal3f,

    /// Barycentric coordinates of the hit point with respect to the three
    /// vertices.
    pub barycentric: [Float; 3],

    /// Interpolated uv-coordinates when the mesh has them.
    pub uv: Option<Point2f>,

    /// True if the front face was hit.
    pub front_face: bool,
}

impl TriangleHit {
    /// Returns true if this hit should be preferred over another as the
    /// closest hit: a smaller distance wins and equal distances are resolved
    /// by the lower triangle index.
    ///
    /// * `other` - The other hit.
    pub fn is_closer_than(&self, other: &TriangleHit) -> bool {
        self.t < other.t || (self.t == other.t && self.triangle < other.triangle)
    }
}

/// A triangle referencing its mesh.
#[derive(Copy, Clone)]
pub struct Triangle<'a> {
    /// The mesh.
    mesh: &'a TriangleMesh,

    /// Index of the triangle in the mesh.
    pub index: usize,

    /// Vertex indices.
    pub v: [usize; 3],
}

impl<'a> Triangle<'a> {
    /// Create a new triangle.
    ///
    /// * `mesh`  - The mesh.
    /// * `index` - Index of the triangle in the mesh.
    pub fn new(mesh: &'a TriangleMesh, index: usize) -> Self {
        Self {
            mesh,
            index,
            v: mesh.vertex_indices(index),
        }
    }

    /// Returns the vertex positions.
    pub fn vertices(&self) -> [Point3f; 3] {
        let p = self.mesh.positions();
        [p[self.v[0]], p[self.v[1]], p[self.v[2]]]
    }

    /// Returns true if all vertex coordinates are finite.
    pub fn is_finite(&self) -> bool {
        self.vertices().iter().all(|p| p.is_finite())
    }

    /// Returns the bounds of the triangle, or the empty box if any vertex
    /// has non-finite coordinates.
    pub fn world_bound(&self) -> Bounds3f {
        if !self.is_finite() {
            return Bounds3f::EMPTY;
        }
        let [p0, p1, p2] = self.vertices();
        Bounds3::new(p0, p1).union(&p2)
    }

    /// Returns the centroid of the triangle.
    pub fn centroid(&self) -> Point3f {
        let [p0, p1, p2] = self.vertices();
        (p0 + p1 + p2) / 3.0
    }

    /// Returns the unnormalized face normal `(p1 - p0) x (p2 - p0)`.
    pub fn face_normal(&self) -> Vector3f {
        let [p0, p1, p2] = self.vertices();
        (p1 - p0).cross(&(p2 - p0))
    }

    /// Returns the area of the triangle.
    pub fn area(&self) -> Float {
        0.5 * self.face_normal().length()
    }

    /// Intersect the triangle with a ray using the Möller-Trumbore algorithm.
    /// The ray direction does not need to be normalized; distances are in
    /// units of the direction's length.
    ///
    /// * `ray`     - The ray.
    /// * `options` - Side culling and negative distance handling.
    pub fn intersect(&self, ray: &Ray, options: &IntersectOptions) -> Option<TriangleHit> {
        stat_inc!(N_TESTS, 1);

        let [p0, p1, p2] = self.vertices();
        let edge1 = p1 - p0;
        let edge2 = p2 - p0;
        let n = edge1.cross(&edge2);

        // det > 0 means the ray sees the front face. The negated comparisons
        // below also reject NaN.
        let pvec = ray.d.cross(&edge2);
        let det = edge1.dot(&pvec);
        if !(abs(det) > PARALLEL_EPSILON * n.length() * ray.d.length()) {
            return None;
        }
        let front_face = det > 0.0;
        match options.side {
            Side::Front if !front_face => return None,
            Side::Back if front_face => return None,
            _ => (),
        }

        let inv_det = 1.0 / det;
        let tvec = ray.o - p0;
        let u = tvec.dot(&pvec) * inv_det;
        if !(u >= -BARYCENTRIC_EPSILON && u <= 1.0 + BARYCENTRIC_EPSILON) {
            return None;
        }

        let qvec = tvec.cross(&edge1);
        let v = ray.d.dot(&qvec) * inv_det;
        if !(v >= -BARYCENTRIC_EPSILON && u + v <= 1.0 + BARYCENTRIC_EPSILON) {
            return None;
        }

        let t = edge2.dot(&qvec) * inv_det;
        if !t.is_finite() || t > ray.t_max || (t < 0.0 && !options.allow_negative) {
            return None;
        }

        let point = ray.at(t);
        if !point.is_finite() {
            return None;
        }

        let b0 = 1.0 - u - v;
        let normal = Normal3f::from(n.normalize()).face_forward(&-ray.d);
        let uv = self.mesh.uvs().map(|uvs| {
            b0 * uvs[self.v[0]] + u * uvs[self.v[1]] + v * uvs[self.v[2]]
        });

        stat_inc!(N_HITS, 1);
        Some(TriangleHit {
            t,
            point,
            triangle: self.index,
            vertices: self.v,
            normal,
            barycentric: [b0, u, v],
            uv,
            front_face,
        })
    }
}

impl fmt::Debug for Triangle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Triangle")
            .field("index", &self.index)
            .field("v", &self.v)
            .field("vertices", &self.vertices())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
