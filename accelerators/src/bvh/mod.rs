//! Bounding Volume Hierarchy.

use raycast_core::geometry::*;
use raycast_core::stat_inc;
use raycast_shapes::TriangleMesh;

mod build;
mod common;
mod traverse;

use build::BuildContext;
pub use common::*;
use shared_arena::{ArenaArc, SharedArena};

/// Bounding Volume Hierarchy over the triangles of one mesh.
///
/// The tree only stores triangle indices. Queries take the mesh as an
/// argument and fail with `Error::StaleBoundsTree` if its triangle count no
/// longer matches the one the tree was built for.
#[derive(Clone, Debug)]
pub struct BVHAccel {
    /// Nodes in depth-first order. The root is at index 0.
    nodes: Vec<LinearBVHNode>,

    /// Triangle indices ordered such that every leaf covers a contiguous range.
    triangle_indices: Vec<usize>,

    /// Number of triangles in the mesh the tree was built for.
    num_triangles: usize,

    /// Options the tree was built with after validation.
    options: BVHOptions,

    /// Depth of the deepest leaf.
    depth: usize,
}

impl BVHAccel {
    /// Build a Bounding Volume Hierarchy for a mesh.
    ///
    /// * `mesh`    - The mesh.
    /// * `options` - Build options.
    pub fn new(mesh: &TriangleMesh, options: BVHOptions) -> Self {
        register_stats();

        let options = options.validated();
        let n_triangles = mesh.num_triangles();

        if n_triangles == 0 {
            stat_inc!(LEAF_NODES, 1);
            return Self {
                nodes: vec![LinearBVHNode::new_leaf_node(Bounds3f::EMPTY, 0, 0)],
                triangle_indices: vec![],
                num_triangles: 0,
                options,
                depth: 0,
            };
        }

        // Triangles with non-finite vertices can never be hit. They get an
        // empty box and a centroid inside the mesh so they don't stretch
        // the split planes.
        let mesh_bounds = mesh.world_bound();
        let placeholder = if mesh_bounds.is_empty() {
            Point3f::ZERO
        } else {
            mesh_bounds.centroid()
        };

        // Initializes primitive_info array for triangles.
        let mut primitive_info: Vec<BVHPrimitiveInfo> = mesh
            .triangles()
            .map(|tri| {
                if tri.is_finite() {
                    BVHPrimitiveInfo::new(tri.index, tri.world_bound(), tri.centroid())
                } else {
                    BVHPrimitiveInfo::new(tri.index, Bounds3f::EMPTY, placeholder)
                }
            })
            .collect();

        // Build BVH tree for triangles using `primitive_info`.
        let arena = SharedArena::<BVHBuildNode>::with_capacity(2 * n_triangles);
        let mut ctx = BuildContext::new(&arena, options, n_triangles);
        let root = build::build(&mut ctx, &mut primitive_info, 0, n_triangles, 0);
        let total_nodes = ctx.total_nodes;

        let (arena_used, _arena_free) = arena.stats();
        info!(
            "BVH ({}) created with {} nodes for {} triangles, depth {} ({:.2} MB), arena allocated {:.2} MB",
            options.split_method,
            total_nodes,
            n_triangles,
            ctx.max_depth_reached,
            (total_nodes * std::mem::size_of::<LinearBVHNode>()) as f32 / (1024.0 * 1024.0),
            (arena_used * std::mem::size_of::<BVHBuildNode>()) as f32 / (1024.0 * 1024.0)
        );

        // Compute representation of depth-first traversal of BVH tree.
        let tree_bytes = total_nodes * std::mem::size_of::<LinearBVHNode>()
            + std::mem::size_of::<Self>()
            + n_triangles * std::mem::size_of::<usize>();
        stat_inc!(TREE_BYTES, tree_bytes as u64);

        let mut nodes = Vec::with_capacity(total_nodes);
        Self::flatten_bvh_tree(root, &mut nodes);
        debug_assert!(total_nodes == nodes.len());

        Self {
            nodes,
            triangle_indices: ctx.ordered_triangles,
            num_triangles: n_triangles,
            options,
            depth: ctx.max_depth_reached,
        }
    }

    /// Flatten the tree to the linear representation. The first child of an
    /// interior node directly follows it. Returns the offset of `node`.
    ///
    /// * `node`  - The node.
    /// * `nodes` - Flattened nodes appended in depth-first order.
    fn flatten_bvh_tree(node: ArenaArc<BVHBuildNode>, nodes: &mut Vec<LinearBVHNode>) -> u32 {
        let my_offset = nodes.len();

        match (node.children[0].clone(), node.children[1].clone()) {
            (Some(c0), Some(c1)) => {
                // Reserve the slot; the second child offset is known after
                // the first subtree is laid out.
                nodes.push(LinearBVHNode::new_interior_node(node.bounds, 0, node.split_axis));
                Self::flatten_bvh_tree(c0, nodes);
                let second_child_offset = Self::flatten_bvh_tree(c1, nodes);
                nodes[my_offset] =
                    LinearBVHNode::new_interior_node(node.bounds, second_child_offset, node.split_axis);
            }
            _ => {
                nodes.push(LinearBVHNode::new_leaf_node(
                    node.bounds,
                    node.first_tri_offset as u32,
                    node.n_triangles as u32,
                ));
            }
        }

        my_offset as u32
    }

    /// Returns the flattened nodes in depth-first order.
    pub fn nodes(&self) -> &[LinearBVHNode] {
        &self.nodes
    }

    /// Returns the triangle indices in leaf order.
    pub fn triangle_indices(&self) -> &[usize] {
        &self.triangle_indices
    }

    /// Returns the number of triangles the tree was built for.
    pub fn num_triangles(&self) -> usize {
        self.num_triangles
    }

    /// Returns the validated build options.
    pub fn options(&self) -> BVHOptions {
        self.options
    }

    /// Returns the depth of the deepest leaf. A tree with a single leaf has
    /// depth 0.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns the bounds of the root node.
    pub fn bounds(&self) -> Bounds3f {
        self.nodes[0].bounds
    }

    /// Returns the triangle indices stored in each leaf along with the
    /// leaf's bounds, in depth-first order.
    pub fn leaf_ranges(&self) -> impl Iterator<Item = (&Bounds3f, &[usize])> + '_ {
        self.nodes.iter().filter_map(move |node| match node.kind {
            NodeKind::Leaf { offset, count } => {
                let start = offset as usize;
                Some((&node.bounds, &self.triangle_indices[start..start + count as usize]))
            }
            NodeKind::Interior { .. } => None,
        })
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use raycast_shapes::TriangleMesh;

    /// A row of `n` small triangles along the x-axis.
    fn strip(n: usize) -> TriangleMesh {
        let mut p = Vec::with_capacity(3 * n);
        for i in 0..n {
            let x = i as f32 * 2.0;
            p.extend([
                Point3::new(x, 0.0, 0.0),
                Point3::new(x + 1.0, 0.0, 0.0),
                Point3::new(x, 1.0, 0.0),
            ]);
        }
        TriangleMesh::new(p, None).expect("valid mesh")
    }

    fn all_options() -> Vec<BVHOptions> {
        [SplitMethod::Middle, SplitMethod::EqualCounts, SplitMethod::SAH]
            .into_iter()
            .flat_map(|split_method| {
                [1, 4, 10].into_iter().map(move |max_leaf_triangles| BVHOptions {
                    max_leaf_triangles,
                    split_method,
                    ..Default::default()
                })
            })
            .collect()
    }

    #[test]
    fn every_triangle_is_in_exactly_one_leaf() {
        let mesh = strip(100);
        for options in all_options() {
            let bvh = BVHAccel::new(&mesh, options);
            let mut seen: Vec<usize> = bvh.leaf_ranges().flat_map(|(_, tris)| tris.to_vec()).collect();
            seen.sort_unstable();
            assert_eq!(seen, (0..100).collect::<Vec<_>>(), "{options:?}");
        }
    }

    #[test]
    fn nodes_contain_their_triangles_and_children() {
        let mesh = strip(64);
        for options in all_options() {
            let bvh = BVHAccel::new(&mesh, options);
            for (i, node) in bvh.nodes().iter().enumerate() {
                match node.kind {
                    NodeKind::Leaf { offset, count } => {
                        assert!(count as usize <= options.max_leaf_triangles);
                        let start = offset as usize;
                        for &t in &bvh.triangle_indices()[start..start + count as usize] {
                            let tb = mesh.triangle(t).world_bound();
                            assert!(node.bounds.contains_bounds(&tb));
                        }
                    }
                    NodeKind::Interior { second_child, .. } => {
                        assert!(second_child as usize > i + 1);
                        let c0 = &bvh.nodes()[i + 1].bounds;
                        let c1 = &bvh.nodes()[second_child as usize].bounds;
                        assert!(node.bounds.contains_bounds(c0));
                        assert!(node.bounds.contains_bounds(c1));
                    }
                }
            }
        }
    }

    #[test]
    fn build_is_deterministic() {
        let mesh = strip(50);
        for options in all_options() {
            let a = BVHAccel::new(&mesh, options);
            let b = BVHAccel::new(&mesh, options);
            assert_eq!(a.nodes(), b.nodes());
            assert_eq!(a.triangle_indices(), b.triangle_indices());
        }
    }

    #[test]
    fn empty_mesh_has_single_empty_leaf() {
        let bvh = BVHAccel::new(&TriangleMesh::default(), BVHOptions::default());
        assert_eq!(bvh.nodes().len(), 1);
        assert_eq!(bvh.nodes()[0].kind, NodeKind::Leaf { offset: 0, count: 0 });
        assert!(bvh.bounds().is_empty());
        assert_eq!(bvh.depth(), 0);
        assert_eq!(bvh.num_triangles(), 0);
    }

    #[test]
    fn small_mesh_is_a_single_leaf() {
        let bvh = BVHAccel::new(&strip(3), BVHOptions::default());
        assert_eq!(bvh.nodes().len(), 1);
        assert!(bvh.nodes()[0].is_leaf());
        assert_eq!(bvh.depth(), 0);
    }

    #[test]
    fn max_depth_limits_tree() {
        let options = BVHOptions {
            max_leaf_triangles: 1,
            max_depth: 2,
            ..Default::default()
        };
        let bvh = BVHAccel::new(&strip(40), options);
        assert_eq!(bvh.depth(), 2);
        assert_eq!(bvh.leaf_ranges().count(), 4);
        assert_eq!(bvh.leaf_ranges().map(|(_, t)| t.len()).sum::<usize>(), 40);
    }

    #[test]
    fn depth_is_clamped() {
        let options = BVHOptions {
            max_leaf_triangles: 1,
            max_depth: 1000,
            ..Default::default()
        };
        let bvh = BVHAccel::new(&strip(10), options);
        assert_eq!(bvh.options().max_depth, MAX_TREE_DEPTH);
        assert!(bvh.depth() <= MAX_TREE_DEPTH);
    }

    #[test]
    fn identical_triangles_still_split() {
        let p = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let positions: Vec<Point3f> = p.iter().cycle().take(3 * 20).copied().collect();
        let mesh = TriangleMesh::new(positions, None).expect("valid mesh");
        for options in all_options() {
            let bvh = BVHAccel::new(&mesh, options);
            assert!(bvh.leaf_ranges().all(|(_, t)| t.len() <= options.max_leaf_triangles));
        }
    }

    #[test]
    fn non_finite_triangles_get_empty_bounds() {
        let mut p: Vec<Point3f> = strip(20).positions().to_vec();
        p[0] = Point3::new(f32::NAN, 0.0, 0.0);
        p[4] = Point3::new(f32::INFINITY, 0.0, 0.0);
        let mesh = TriangleMesh::new(p, None).expect("valid mesh");
        let bvh = BVHAccel::new(&mesh, BVHOptions::default());
        assert!(bvh.bounds().p_max.x.is_finite());
        assert!(bvh.bounds().p_min.x.is_finite());
        assert_eq!(bvh.leaf_ranges().map(|(_, t)| t.len()).sum::<usize>(), 20);
    }
}
