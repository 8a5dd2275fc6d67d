//! Mesh intersection queries

use crate::mesh::TriangleMesh;
use crate::triangle::{IntersectOptions, TriangleHit};
use raycast_core::geometry::Ray;
use raycast_core::Result;

/// Answers ray queries against the triangles of a mesh. Every query first
/// replaces the ray direction with its unit vector so reported distances are
/// euclidean, failing with `Error::InvalidRay` if that is not possible.
pub trait MeshIntersector: Send + Sync {
    /// Returns every hit along the ray in no particular order.
    ///
    /// * `mesh`    - The mesh to query.
    /// * `ray`     - The ray.
    /// * `options` - Side culling and negative distance handling.
    fn intersect_all(
        &self,
        mesh: &TriangleMesh,
        ray: &Ray,
        options: &IntersectOptions,
    ) -> Result<Vec<TriangleHit>>;

    /// Returns the closest hit along the ray. Ties in distance go to the
    /// lowest triangle index.
    ///
    /// * `mesh`    - The mesh to query.
    /// * `ray`     - The ray.
    /// * `options` - Side culling and negative distance handling.
    fn intersect_first(
        &self,
        mesh: &TriangleMesh,
        ray: &Ray,
        options: &IntersectOptions,
    ) -> Result<Option<TriangleHit>>;

    /// Returns true if the ray hits any triangle.
    ///
    /// * `mesh`    - The mesh to query.
    /// * `ray`     - The ray.
    /// * `options` - Side culling and negative distance handling.
    fn intersect_p(
        &self,
        mesh: &TriangleMesh,
        ray: &Ray,
        options: &IntersectOptions,
    ) -> Result<bool> {
        Ok(self.intersect_first(mesh, ray, options)?.is_some())
    }
}

/// Brute force intersection against every triangle of the mesh.
#[derive(Copy, Clone, Debug, Default)]
pub struct LinearScan;

impl MeshIntersector for LinearScan {
    fn intersect_all(
        &self,
        mesh: &TriangleMesh,
        ray: &Ray,
        options: &IntersectOptions,
    ) -> Result<Vec<TriangleHit>> {
        let ray = ray.normalized()?;
        Ok(mesh
            .triangles()
            .filter_map(|tri| tri.intersect(&ray, options))
            .collect())
    }

    fn intersect_first(
        &self,
        mesh: &TriangleMesh,
        ray: &Ray,
        options: &IntersectOptions,
    ) -> Result<Option<TriangleHit>> {
        let mut ray = ray.normalized()?;
        let mut closest: Option<TriangleHit> = None;
        for tri in mesh.triangles() {
            if let Some(hit) = tri.intersect(&ray, options) {
                if closest.map_or(true, |c| hit.is_closer_than(&c)) {
                    // Hits further away than this one can be skipped. Triangles
                    // at exactly this distance are still tested by later indices
                    // but lose the tie.
                    ray.t_max = hit.t;
                    closest = Some(hit);
                }
            }
        }
        Ok(closest)
    }

    fn intersect_p(
        &self,
        mesh: &TriangleMesh,
        ray: &Ray,
        options: &IntersectOptions,
    ) -> Result<bool> {
        let ray = ray.normalized()?;
        Ok(mesh.triangles().any(|tri| tri.intersect(&ray, options).is_some()))
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use raycast_core::geometry::*;
    use raycast_core::Error;

    /// Two parallel unit quads at z = 0 and z = -1.
    fn slabs() -> TriangleMesh {
        let mut p = vec![];
        for z in [0.0, -1.0] {
            p.extend([
                Point3::new(-1.0, -1.0, z),
                Point3::new(1.0, -1.0, z),
                Point3::new(1.0, 1.0, z),
                Point3::new(-1.0, 1.0, z),
            ]);
        }
        TriangleMesh::new(p, Some(vec![0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7])).expect("valid mesh")
    }

    #[test]
    fn all_hits_through_both_quads() {
        let ray = Ray::unbounded(Point3::new(0.5, -0.5, 10.0), Vector3::new(0.0, 0.0, -3.0));
        let hits = LinearScan
            .intersect_all(&slabs(), &ray, &IntersectOptions::default())
            .expect("valid ray");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].triangle, 0);
        assert_eq!(hits[1].triangle, 2);

        // Distances are measured along the unit direction.
        assert_eq!(hits[0].t, 10.0);
        assert_eq!(hits[1].t, 11.0);
    }

    #[test]
    fn first_hit_is_closest() {
        let ray = Ray::unbounded(Point3::new(0.5, -0.5, -10.0), Vector3::new(0.0, 0.0, 1.0));
        let hit = LinearScan
            .intersect_first(&slabs(), &ray, &IntersectOptions::default())
            .expect("valid ray")
            .expect("should hit");
        assert_eq!(hit.triangle, 2);
        assert_eq!(hit.t, 9.0);
    }

    #[test]
    fn diagonal_tie_goes_to_lowest_index() {
        // The ray runs through the shared diagonal of the upper quad.
        let ray = Ray::unbounded(Point3::new(0.0, 0.0, 10.0), Vector3::new(0.0, 0.0, -1.0));
        let mesh = slabs();
        let options = IntersectOptions::default();
        let all = LinearScan.intersect_all(&mesh, &ray, &options).expect("valid ray");
        assert_eq!(all.len(), 4);

        let hit = LinearScan
            .intersect_first(&mesh, &ray, &options)
            .expect("valid ray")
            .expect("should hit");
        assert_eq!(hit.triangle, 0);
        assert!(LinearScan.intersect_p(&mesh, &ray, &options).expect("valid ray"));
    }

    #[test]
    fn invalid_ray_is_an_error() {
        let ray = Ray::unbounded(Point3::new(0.0, 0.0, 10.0), Vector3f::ZERO);
        let result = LinearScan.intersect_all(&slabs(), &ray, &IntersectOptions::default());
        assert!(matches!(result, Err(Error::InvalidRay(_))));
    }

    #[test]
    fn empty_mesh_has_no_hits() {
        let mesh = TriangleMesh::default();
        let ray = Ray::default();
        let options = IntersectOptions::default();
        assert!(LinearScan
            .intersect_all(&mesh, &ray, &options)
            .expect("valid ray")
            .is_empty());
        assert!(LinearScan
            .intersect_first(&mesh, &ray, &options)
            .expect("valid ray")
            .is_none());
    }
}
