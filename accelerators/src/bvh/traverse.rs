//! BVH ray queries

use super::common::*;
use super::BVHAccel;
use raycast_core::geometry::*;
use raycast_core::pbrt::*;
use raycast_core::{stat_inc, Error, Result};
use raycast_shapes::{IntersectOptions, MeshIntersector, TriangleHit, TriangleMesh};

/// Capacity of the traversal stack. A path from the root to the deepest
/// leaf pushes at most one node per level.
const STACK_SIZE: usize = MAX_TREE_DEPTH + 1;

/// Precomputed ray data for slab tests.
struct RayBoxQuery {
    ray: Ray,
    inv_dir: Vector3f,
    dir_is_neg: [u8; 3],
    t_min: Float,
}

impl RayBoxQuery {
    fn new(ray: Ray, options: &IntersectOptions) -> Self {
        let inv_dir = Vector3::new(1.0 / ray.d.x, 1.0 / ray.d.y, 1.0 / ray.d.z);
        let dir_is_neg = [
            u8::from(inv_dir.x < 0.0),
            u8::from(inv_dir.y < 0.0),
            u8::from(inv_dir.z < 0.0),
        ];
        let t_min = if options.allow_negative { -INFINITY } else { 0.0 };
        Self {
            ray,
            inv_dir,
            dir_is_neg,
            t_min,
        }
    }

    /// Returns the distance at which the ray enters the box, clamped to the
    /// start of the query interval, or `None` if the ray misses it.
    fn entry(&self, bounds: &Bounds3f) -> Option<Float> {
        bounds
            .intersect_p(&self.ray, &self.inv_dir, self.dir_is_neg)
            .and_then(|(t0, t1)| (t1 >= self.t_min).then(|| max(t0, self.t_min)))
    }
}

/// Returns true if a box entered at `t_entry` may still contain a hit at
/// or before `t_best`. The entry distance is lowered by its rounding bound
/// so that ties at `t_best` are never pruned.
fn may_contain(t_entry: Float, t_best: Float) -> bool {
    t_entry - 2.0 * gamma(3) * abs(t_entry) <= t_best
}

impl BVHAccel {
    /// Fails if `mesh` is not the mesh the tree was built for.
    ///
    /// * `mesh` - The mesh passed to a query.
    fn check_mesh(&self, mesh: &TriangleMesh) -> Result<()> {
        let actual = mesh.num_triangles();
        if actual != self.num_triangles {
            return Err(Error::StaleBoundsTree {
                expected: self.num_triangles,
                actual,
            });
        }
        Ok(())
    }

    /// Calls `visit` with the triangle indices of every leaf whose box the
    /// ray passes through. Children are visited front to back along the
    /// split axis. Traversal ends early when `visit` returns true.
    ///
    /// * `query` - The ray.
    /// * `visit` - Leaf callback.
    fn visit_leaves<F>(&self, query: &RayBoxQuery, mut visit: F)
    where
        F: FnMut(&[usize]) -> bool,
    {
        stat_inc!(RAYS_TRAVERSED, 1);

        let mut nodes_to_visit = [0_usize; STACK_SIZE];
        let mut to_visit_offset = 0;
        let mut current_node_index = 0;

        loop {
            let node = &self.nodes[current_node_index];
            if query.entry(&node.bounds).is_some() {
                stat_inc!(NODES_VISITED, 1);
                match node.kind {
                    NodeKind::Leaf { offset, count } => {
                        let start = offset as usize;
                        if visit(&self.triangle_indices[start..start + count as usize]) {
                            break;
                        }
                    }
                    NodeKind::Interior { second_child, axis } => {
                        // Put far BVH node on nodes_to_visit stack, advance to near node.
                        if query.dir_is_neg[axis as usize] == 1 {
                            nodes_to_visit[to_visit_offset] = current_node_index + 1;
                            current_node_index = second_child as usize;
                        } else {
                            nodes_to_visit[to_visit_offset] = second_child as usize;
                            current_node_index += 1;
                        }
                        to_visit_offset += 1;
                        continue;
                    }
                }
            }

            if to_visit_offset == 0 {
                break;
            }
            to_visit_offset -= 1;
            current_node_index = nodes_to_visit[to_visit_offset];
        }
    }
}

impl MeshIntersector for BVHAccel {
    fn intersect_all(
        &self,
        mesh: &TriangleMesh,
        ray: &Ray,
        options: &IntersectOptions,
    ) -> Result<Vec<TriangleHit>> {
        self.check_mesh(mesh)?;
        let query = RayBoxQuery::new(ray.normalized()?, options);

        let mut hits = vec![];
        self.visit_leaves(&query, |triangles| {
            hits.extend(
                triangles
                    .iter()
                    .filter_map(|&i| mesh.triangle(i).intersect(&query.ray, options)),
            );
            false
        });
        Ok(hits)
    }

    fn intersect_first(
        &self,
        mesh: &TriangleMesh,
        ray: &Ray,
        options: &IntersectOptions,
    ) -> Result<Option<TriangleHit>> {
        self.check_mesh(mesh)?;
        let query = RayBoxQuery::new(ray.normalized()?, options);

        // Triangles are tested against a copy of the ray whose `t_max` shrinks
        // to the closest hit so far. Boxes keep using the full interval.
        let mut ray = query.ray;
        let mut closest: Option<TriangleHit> = None;

        let mut t_entry = match query.entry(&self.nodes[0].bounds) {
            Some(t) => t,
            None => return Ok(None),
        };
        stat_inc!(RAYS_TRAVERSED, 1);

        let mut nodes_to_visit = [(0_usize, 0.0 as Float); STACK_SIZE];
        let mut to_visit_offset = 0;
        let mut current_node_index = 0;

        loop {
            if may_contain(t_entry, ray.t_max) {
                stat_inc!(NODES_VISITED, 1);
                match self.nodes[current_node_index].kind {
                    NodeKind::Leaf { offset, count } => {
                        let start = offset as usize;
                        for &i in &self.triangle_indices[start..start + count as usize] {
                            if let Some(hit) = mesh.triangle(i).intersect(&ray, options) {
                                if closest.map_or(true, |c| hit.is_closer_than(&c)) {
                                    ray.t_max = hit.t;
                                    closest = Some(hit);
                                }
                            }
                        }
                    }
                    NodeKind::Interior { second_child, .. } => {
                        let first = current_node_index + 1;
                        let second = second_child as usize;
                        let t_first = query.entry(&self.nodes[first].bounds);
                        let t_second = query.entry(&self.nodes[second].bounds);

                        // Descend into the child the ray enters first and
                        // remember the other one with its entry distance.
                        let next = match (t_first, t_second) {
                            (Some(t0), Some(t1)) => {
                                let (near, far) = if t1 < t0 {
                                    ((second, t1), (first, t0))
                                } else {
                                    ((first, t0), (second, t1))
                                };
                                nodes_to_visit[to_visit_offset] = far;
                                to_visit_offset += 1;
                                Some(near)
                            }
                            (Some(t0), None) => Some((first, t0)),
                            (None, Some(t1)) => Some((second, t1)),
                            (None, None) => None,
                        };

                        if let Some((index, t)) = next {
                            current_node_index = index;
                            t_entry = t;
                            continue;
                        }
                    }
                }
            }

            if to_visit_offset == 0 {
                break;
            }
            to_visit_offset -= 1;
            (current_node_index, t_entry) = nodes_to_visit[to_visit_offset];
        }

        Ok(closest)
    }

    fn intersect_p(
        &self,
        mesh: &TriangleMesh,
        ray: &Ray,
        options: &IntersectOptions,
    ) -> Result<bool> {
        self.check_mesh(mesh)?;
        let query = RayBoxQuery::new(ray.normalized()?, options);

        let mut found = false;
        self.visit_leaves(&query, |triangles| {
            found = triangles
                .iter()
                .any(|&i| mesh.triangle(i).intersect(&query.ray, options).is_some());
            found
        });
        Ok(found)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
