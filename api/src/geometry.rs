//! Geometry

use crate::raycaster::Raycaster;
use arc_swap::ArcSwapOption;
use raycast_accelerators::{BVHAccel, BVHOptions};
use raycast_core::Result;
use raycast_shapes::{LinearScan, MeshIntersector, TriangleHit, TriangleMesh};
use std::sync::Arc;

/// A triangle mesh with an optional bounds tree attached.
///
/// Ray casts go through the attached tree when there is one and scan every
/// triangle otherwise. Both paths report the same hits. Attaching or
/// detaching a tree never blocks concurrent ray casts.
pub struct Geometry {
    /// The triangles.
    mesh: Arc<TriangleMesh>,

    /// The attached bounds tree.
    bounds_tree: ArcSwapOption<BVHAccel>,
}

impl Geometry {
    /// Create geometry without a bounds tree.
    ///
    /// * `mesh` - The triangles.
    pub fn new(mesh: TriangleMesh) -> Self {
        Self::from_shared(Arc::new(mesh))
    }

    /// Create geometry without a bounds tree from triangles that are shared
    /// with other geometry.
    ///
    /// * `mesh` - The triangles.
    pub fn from_shared(mesh: Arc<TriangleMesh>) -> Self {
        Self {
            mesh,
            bounds_tree: ArcSwapOption::const_empty(),
        }
    }

    /// Returns the triangles.
    pub fn mesh(&self) -> &Arc<TriangleMesh> {
        &self.mesh
    }

    /// Replaces the triangles. An attached bounds tree is kept as is; it has
    /// to be rebuilt with `compute_bounds_tree()` to reflect the new mesh.
    ///
    /// * `mesh` - The new triangles.
    pub fn set_mesh(&mut self, mesh: TriangleMesh) {
        if self.has_bounds_tree() {
            debug!("Mesh replaced while a bounds tree is attached");
        }
        self.mesh = Arc::new(mesh);
    }

    /// Builds a bounds tree for the current mesh, attaches it and returns it.
    /// Any previously attached tree is replaced.
    ///
    /// * `options` - Build options.
    pub fn compute_bounds_tree(&self, options: BVHOptions) -> Arc<BVHAccel> {
        let tree = Arc::new(BVHAccel::new(&self.mesh, options));
        self.bounds_tree.store(Some(Arc::clone(&tree)));
        tree
    }

    /// Returns the attached bounds tree.
    pub fn bounds_tree(&self) -> Option<Arc<BVHAccel>> {
        self.bounds_tree.load_full()
    }

    /// Returns true if a bounds tree is attached.
    pub fn has_bounds_tree(&self) -> bool {
        self.bounds_tree.load().is_some()
    }

    /// Attaches a previously built bounds tree, or detaches the current one
    /// with `None`.
    ///
    /// * `tree` - The bounds tree.
    pub fn set_bounds_tree(&self, tree: Option<Arc<BVHAccel>>) {
        self.bounds_tree.store(tree);
    }

    /// Detaches the bounds tree. Later ray casts scan every triangle.
    pub fn dispose_bounds_tree(&self) {
        self.bounds_tree.store(None);
    }

    /// Casts a ray into the geometry. Returns every hit within the
    /// raycaster's limits in no particular order, or just the closest one
    /// when `first_hit_only` is set.
    ///
    /// * `raycaster` - The ray and query mode.
    pub fn raycast(&self, raycaster: &Raycaster) -> Result<Vec<TriangleHit>> {
        let tree = self.bounds_tree.load();
        match &*tree {
            Some(tree) => cast(tree.as_ref(), &self.mesh, raycaster),
            None => cast(&LinearScan, &self.mesh, raycaster),
        }
    }
}

/// Runs the query selected by the raycaster through an intersector.
///
/// * `intersector` - The bounds tree or linear scan.
/// * `mesh`        - The mesh.
/// * `raycaster`   - The ray and query mode.
fn cast(
    intersector: &dyn MeshIntersector,
    mesh: &TriangleMesh,
    raycaster: &Raycaster,
) -> Result<Vec<TriangleHit>> {
    let ray = raycaster.query_ray();
    let options = raycaster.intersect_options();

    if raycaster.first_hit_only && raycaster.near <= 0.0 {
        return Ok(intersector
            .intersect_first(mesh, &ray, &options)?
            .into_iter()
            .collect());
    }

    let mut hits = intersector.intersect_all(mesh, &ray, &options)?;
    if raycaster.near > 0.0 {
        hits.retain(|hit| hit.t >= raycaster.near);
    }
    if raycaster.first_hit_only {
        let closest = hits
            .into_iter()
            .reduce(|a, b| if b.is_closer_than(&a) { b } else { a });
        return Ok(closest.into_iter().collect());
    }
    Ok(hits)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use raycast_core::geometry::*;
    use raycast_core::pbrt::{Float, INFINITY};
    use raycast_core::Error;
    use raycast_shapes::Side;

    /// Three parallel unit quads at z = 0, -1 and -2.
    fn layers() -> TriangleMesh {
        let mut positions = vec![];
        let mut indices = vec![];
        for (i, z) in [0.0, -1.0, -2.0].into_iter().enumerate() {
            positions.extend([
                Point3::new(-1.0, -1.0, z),
                Point3::new(1.0, -1.0, z),
                Point3::new(1.0, 1.0, z),
                Point3::new(-1.0, 1.0, z),
            ]);
            let a = 4 * i;
            indices.extend([a, a + 1, a + 2, a, a + 2, a + 3]);
        }
        TriangleMesh::new(positions, Some(indices)).expect("valid mesh")
    }

    fn down() -> Raycaster {
        Raycaster::new(Point3::new(0.25, 0.5, 4.0), Vector3::new(0.0, 0.0, -2.0))
    }

    fn distances(mut hits: Vec<TriangleHit>) -> Vec<Float> {
        hits.sort_by(|a, b| a.t.total_cmp(&b.t));
        hits.iter().map(|h| h.t).collect()
    }

    #[test]
    fn tree_is_attached_and_detached() {
        let geometry = Geometry::new(layers());
        assert!(geometry.bounds_tree().is_none());

        let tree = geometry.compute_bounds_tree(BVHOptions::default());
        assert!(geometry.has_bounds_tree());
        assert!(Arc::ptr_eq(&tree, &geometry.bounds_tree().expect("attached")));

        geometry.dispose_bounds_tree();
        assert!(!geometry.has_bounds_tree());
        geometry.dispose_bounds_tree();

        geometry.set_bounds_tree(Some(Arc::clone(&tree)));
        assert!(geometry.has_bounds_tree());
        geometry.set_bounds_tree(None);
        assert!(geometry.bounds_tree().is_none());
    }

    #[test]
    fn both_paths_report_all_layers() {
        let geometry = Geometry::new(layers());
        let linear = distances(geometry.raycast(&down()).expect("valid ray"));
        geometry.compute_bounds_tree(BVHOptions {
            max_leaf_triangles: 1,
            ..Default::default()
        });
        let indexed = distances(geometry.raycast(&down()).expect("valid ray"));
        assert_eq!(linear, vec![4.0, 5.0, 6.0]);
        assert_eq!(indexed, linear);
    }

    #[test]
    fn first_hit_only_returns_closest() {
        let geometry = Geometry::new(layers());
        let raycaster = down().with_first_hit_only(true);
        let hits = geometry.raycast(&raycaster).expect("valid ray");
        assert_eq!(distances(hits), vec![4.0]);

        geometry.compute_bounds_tree(BVHOptions::default());
        let hits = geometry.raycast(&raycaster).expect("valid ray");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].triangle, 1);
        assert_eq!(hits[0].t, 4.0);
    }

    #[test]
    fn near_and_far_limit_hits() {
        let geometry = Geometry::new(layers());
        geometry.compute_bounds_tree(BVHOptions::default());

        let raycaster = down().with_limits(4.5, 5.5);
        assert_eq!(distances(geometry.raycast(&raycaster).expect("valid ray")), vec![5.0]);

        let raycaster = raycaster.with_first_hit_only(true).with_limits(4.5, INFINITY);
        assert_eq!(distances(geometry.raycast(&raycaster).expect("valid ray")), vec![5.0]);

        let raycaster = down().with_limits(0.0, 3.0);
        assert!(geometry.raycast(&raycaster).expect("valid ray").is_empty());
    }

    #[test]
    fn side_culling() {
        let geometry = Geometry::new(layers());
        // Looking down at counter-clockwise quads sees their front faces.
        let front = down().with_side(Side::Front);
        assert_eq!(geometry.raycast(&front).expect("valid ray").len(), 3);
        let back = down().with_side(Side::Back);
        assert!(geometry.raycast(&back).expect("valid ray").is_empty());
    }

    #[test]
    fn stale_tree_is_an_error() {
        let mut geometry = Geometry::new(layers());
        geometry.compute_bounds_tree(BVHOptions::default());
        geometry.set_mesh(TriangleMesh::default());
        assert!(matches!(
            geometry.raycast(&down()),
            Err(Error::StaleBoundsTree {
                expected: 6,
                actual: 0
            })
        ));

        geometry.compute_bounds_tree(BVHOptions::default());
        assert!(geometry.raycast(&down()).expect("valid ray").is_empty());
    }

    #[test]
    fn invalid_ray_is_an_error() {
        let geometry = Geometry::new(layers());
        let raycaster = Raycaster::new(Point3::ZERO, Vector3::ZERO);
        assert!(matches!(geometry.raycast(&raycaster), Err(Error::InvalidRay(_))));
    }
}
