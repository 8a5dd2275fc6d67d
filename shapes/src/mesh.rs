//! Triangle meshes

use crate::triangle::{register_stats, Triangle};
use raycast_core::geometry::*;
use raycast_core::pbrt::*;
use raycast_core::{Error, Result};

/// A triangle mesh described by a vertex position buffer and an optional
/// triangle index buffer. Without an index buffer, every three consecutive
/// positions form a triangle.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TriangleMesh {
    /// Vertex positions.
    positions: Vec<Point3f>,

    /// Vertex indices. For the ith triangle, its three vertex positions are
    /// p[indices[3 * i]], p[indices[3 * i + 1]], and p[indices[3 * i + 2]].
    indices: Option<Vec<usize>>,

    /// Parametric uv-coordinates per vertex.
    uvs: Option<Vec<Point2f>>,
}

impl TriangleMesh {
    /// Create a new triangle mesh.
    ///
    /// Fails with `Error::InvalidMesh` when the index buffer length is not a
    /// multiple of three or references a missing vertex, or when there is no
    /// index buffer and the number of positions is not a multiple of three.
    ///
    /// * `positions` - Vertex positions.
    /// * `indices`   - Optional vertex indices, three per triangle.
    pub fn new(positions: Vec<Point3f>, indices: Option<Vec<usize>>) -> Result<Self> {
        register_stats();

        match &indices {
            Some(indices) => {
                if indices.len() % 3 != 0 {
                    return Err(Error::InvalidMesh(format!(
                        "index buffer length {} is not a multiple of 3",
                        indices.len()
                    )));
                }
                if let Some((i, vi)) = indices
                    .iter()
                    .enumerate()
                    .find(|(_, vi)| **vi >= positions.len())
                {
                    return Err(Error::InvalidMesh(format!(
                        "index {vi} at position {i} is out of range for {} vertices",
                        positions.len()
                    )));
                }
            }
            None => {
                if positions.len() % 3 != 0 {
                    return Err(Error::InvalidMesh(format!(
                        "{} positions do not form whole triangles",
                        positions.len()
                    )));
                }
            }
        }

        let non_finite = positions.iter().filter(|p| !p.is_finite()).count();
        if non_finite > 0 {
            warn!("Triangle mesh has {non_finite} vertices with non-finite coordinates");
        }

        Ok(Self {
            positions,
            indices,
            uvs: None,
        })
    }

    /// Create a new triangle mesh from flat buffers, three floats per vertex
    /// position.
    ///
    /// * `positions` - Vertex position buffer laid out as `[x0, y0, z0, x1, ...]`.
    /// * `indices`   - Optional vertex indices, three per triangle.
    pub fn from_flat(positions: &[Float], indices: Option<&[u32]>) -> Result<Self> {
        if positions.len() % 3 != 0 {
            return Err(Error::InvalidMesh(format!(
                "position buffer length {} is not a multiple of 3",
                positions.len()
            )));
        }

        let points = positions
            .chunks_exact(3)
            .map(|c| Point3f::new(c[0], c[1], c[2]))
            .collect();
        let indices = indices.map(|ind| ind.iter().map(|&i| i as usize).collect());
        Self::new(points, indices)
    }

    /// Attach per vertex uv-coordinates.
    ///
    /// * `uvs` - One uv-coordinate per vertex position.
    pub fn with_uvs(mut self, uvs: Vec<Point2f>) -> Result<Self> {
        if uvs.len() != self.positions.len() {
            return Err(Error::InvalidMesh(format!(
                "{} uv-coordinates given for {} vertices",
                uvs.len(),
                self.positions.len()
            )));
        }
        self.uvs = Some(uvs);
        Ok(self)
    }

    /// Returns the number of triangles.
    pub fn num_triangles(&self) -> usize {
        match &self.indices {
            Some(indices) => indices.len() / 3,
            None => self.positions.len() / 3,
        }
    }

    /// Returns the number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.positions.len()
    }

    /// Returns true if the mesh has no triangles.
    pub fn is_empty(&self) -> bool {
        self.num_triangles() == 0
    }

    /// Returns the vertex positions.
    pub fn positions(&self) -> &[Point3f] {
        &self.positions
    }

    /// Returns the index buffer if there is one.
    pub fn indices(&self) -> Option<&[usize]> {
        self.indices.as_deref()
    }

    /// Returns the uv-coordinates if there are any.
    pub fn uvs(&self) -> Option<&[Point2f]> {
        self.uvs.as_deref()
    }

    /// Returns the vertex indices of a triangle.
    ///
    /// * `i` - Triangle index.
    pub fn vertex_indices(&self, i: usize) -> [usize; 3] {
        match &self.indices {
            Some(indices) => [indices[3 * i], indices[3 * i + 1], indices[3 * i + 2]],
            None => [3 * i, 3 * i + 1, 3 * i + 2],
        }
    }

    /// Returns a triangle of the mesh.
    ///
    /// * `i` - Triangle index.
    pub fn triangle(&self, i: usize) -> Triangle<'_> {
        Triangle::new(self, i)
    }

    /// Returns an iterator over all triangles in index order.
    pub fn triangles(&self) -> impl Iterator<Item = Triangle<'_>> + '_ {
        (0..self.num_triangles()).map(move |i| self.triangle(i))
    }

    /// Returns the bounds of all vertices referenced by triangles, skipping
    /// vertices with non-finite coordinates.
    pub fn world_bound(&self) -> Bounds3f {
        self.triangles()
            .fold(Bounds3f::EMPTY, |b, t| b.union(&t.world_bound()))
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> TriangleMesh {
        TriangleMesh::from_flat(
            &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
            Some(&[0, 1, 2, 0, 2, 3]),
        )
        .expect("valid mesh")
    }

    #[test]
    fn indexed_mesh_triangles() {
        let mesh = quad();
        assert_eq!(mesh.num_triangles(), 2);
        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.vertex_indices(1), [0, 2, 3]);
        assert_eq!(
            mesh.world_bound(),
            Bounds3::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 0.0))
        );
    }

    #[test]
    fn non_indexed_mesh_triangles() {
        let p = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let mesh = TriangleMesh::new(p, None).expect("valid mesh");
        assert_eq!(mesh.num_triangles(), 1);
        assert_eq!(mesh.vertex_indices(0), [0, 1, 2]);
        assert!(mesh.indices().is_none());
    }

    #[test]
    fn empty_mesh() {
        let mesh = TriangleMesh::new(vec![], None).expect("valid mesh");
        assert!(mesh.is_empty());
        assert!(mesh.world_bound().is_empty());
    }

    #[test]
    fn rejects_partial_triangles() {
        let err = TriangleMesh::from_flat(&[0.0; 9], Some(&[0, 1])).unwrap_err();
        assert!(matches!(err, Error::InvalidMesh(_)));

        let err = TriangleMesh::from_flat(&[0.0; 6], None).unwrap_err();
        assert!(matches!(err, Error::InvalidMesh(_)));

        let err = TriangleMesh::from_flat(&[0.0; 7], None).unwrap_err();
        assert!(matches!(err, Error::InvalidMesh(_)));
    }

    #[test]
    fn rejects_out_of_range_index() {
        let err = TriangleMesh::from_flat(&[0.0; 9], Some(&[0, 1, 3])).unwrap_err();
        assert!(matches!(err, Error::InvalidMesh(_)));
    }

    #[test]
    fn uvs_must_match_vertices() {
        let uvs = vec![Point2::new(0.0, 0.0); 3];
        assert!(quad().with_uvs(uvs).is_err());

        let uvs = vec![Point2::new(0.0, 0.0); 4];
        let mesh = quad().with_uvs(uvs).expect("valid uvs");
        assert_eq!(mesh.uvs().map(|uv| uv.len()), Some(4));
    }

    #[test]
    fn world_bound_skips_non_finite_triangles() {
        let mesh = TriangleMesh::from_flat(
            &[
                0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, //
                Float::NAN, 0.0, 0.0, 9.0, 9.0, 9.0, 0.0, 0.0, 1.0,
            ],
            None,
        )
        .expect("valid mesh");
        let b = mesh.world_bound();
        assert_eq!(b.p_max, Point3::new(1.0, 1.0, 0.0));
    }
}
