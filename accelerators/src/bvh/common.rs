//! BVH Common

use raycast_core::geometry::*;
use raycast_core::pbrt::*;
use raycast_core::{
    stat_counter, stat_dist, stat_inc, stat_int_distribution, stat_memory_counter, stat_ratio,
    stat_register_fns,
};
use shared_arena::ArenaArc;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

stat_memory_counter!("Memory/BVH tree", TREE_BYTES, bvh_stats_tree_bytes);
stat_int_distribution!(
    "BVH/Triangles per leaf node",
    TRIANGLES_PER_LEAF,
    bvh_stats_triangles_per_leaf
);
stat_counter!("BVH/Interior nodes", INTERIOR_NODES, bvh_stats_interior_nodes);
stat_counter!("BVH/Leaf nodes", LEAF_NODES, bvh_stats_leaf_nodes);
stat_ratio!(
    "BVH/Nodes visited per ray",
    NODES_VISITED,
    RAYS_TRAVERSED,
    bvh_stats_nodes_per_ray,
);

stat_register_fns!(
    bvh_stats_tree_bytes,
    bvh_stats_triangles_per_leaf,
    bvh_stats_interior_nodes,
    bvh_stats_leaf_nodes,
    bvh_stats_nodes_per_ray,
);

/// Deepest tree the fixed size traversal stack can handle.
pub const MAX_TREE_DEPTH: usize = 63;

/// Triangle bounds are padded by this fraction of their extent plus their
/// largest coordinate magnitude.
pub const BOUNDS_PADDING: Float = 1e-5;

/// Splitting method to use to subdivide triangles.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum SplitMethod {
    /// Split at the midpoint of the longest axis of the node bounds. Falls
    /// back to `EqualCounts` when all centroids fall on one side.
    #[default]
    Middle,

    /// Partition triangles into equally sized subsets such that the first half
    /// of the triangles have smallest centroid coordinate values along the
    /// chosen axis, and second half have the largest centroid coordinate values.
    EqualCounts,

    /// Surface Area Heuristic over 12 buckets of centroids.
    SAH,
}

impl FromStr for SplitMethod {
    type Err = Infallible;

    /// Parse a split method name. Unknown names fall back to `Middle`.
    ///
    /// * `s` - One of "middle", "equal" or "sah".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "middle" => Self::Middle,
            "equal" | "equalcounts" => Self::EqualCounts,
            "sah" => Self::SAH,
            sm => {
                warn!("BVH split method '{sm}' unknown.  Using 'middle'.");
                Self::Middle
            }
        })
    }
}

impl fmt::Display for SplitMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Middle => write!(f, "middle"),
            Self::EqualCounts => write!(f, "equal"),
            Self::SAH => write!(f, "sah"),
        }
    }
}

/// Options controlling how a BVH is built.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BVHOptions {
    /// A node holding at most this many triangles becomes a leaf.
    pub max_leaf_triangles: usize,

    /// Nodes at this depth become leaves regardless of size. The root has
    /// depth 0.
    pub max_depth: usize,

    /// Splitting method.
    pub split_method: SplitMethod,
}

impl Default for BVHOptions {
    fn default() -> Self {
        Self {
            max_leaf_triangles: 10,
            max_depth: 40,
            split_method: SplitMethod::Middle,
        }
    }
}

impl BVHOptions {
    /// Returns the options with out of range values replaced: `max_depth` is
    /// clamped to `MAX_TREE_DEPTH` and `max_leaf_triangles` is at least 1.
    pub fn validated(self) -> Self {
        let mut options = self;
        if options.max_depth > MAX_TREE_DEPTH {
            warn!(
                "BVH max depth {} exceeds {MAX_TREE_DEPTH}.  Using {MAX_TREE_DEPTH}.",
                options.max_depth
            );
            options.max_depth = MAX_TREE_DEPTH;
        }
        if options.max_leaf_triangles == 0 {
            warn!("BVH max leaf triangles must be at least 1.  Using 1.");
            options.max_leaf_triangles = 1;
        }
        options
    }
}

/// SAH bucket information.
#[derive(Copy, Clone, Debug)]
pub struct BucketInfo {
    /// Count of triangles.
    pub count: usize,

    /// Bounding box for the bucket.
    pub bounds: Bounds3f,
}

impl Default for BucketInfo {
    fn default() -> Self {
        Self {
            count: 0,
            bounds: Bounds3f::EMPTY,
        }
    }
}

/// Stores information about a triangle used during the build.
#[derive(Copy, Clone, Debug)]
pub struct BVHPrimitiveInfo {
    /// Index of the triangle in the mesh.
    pub triangle: usize,

    /// The padded bounding box of the triangle. Empty for triangles with
    /// non-finite coordinates.
    pub bounds: Bounds3f,

    /// The centroid of the triangle.
    pub centroid: Point3f,
}

impl BVHPrimitiveInfo {
    /// Create a `BVHPrimitiveInfo`.
    ///
    /// * `triangle` - Index of the triangle in the mesh.
    /// * `bounds`   - The bounding box of the triangle.
    /// * `centroid` - The centroid of the triangle.
    pub fn new(triangle: usize, bounds: Bounds3f, centroid: Point3f) -> Self {
        Self {
            triangle,
            bounds: pad_bounds(&bounds),
            centroid,
        }
    }
}

/// Grow a box so that points found slightly outside a triangle by the
/// intersection tolerance still fall inside it.
///
/// * `b` - The bounding box.
pub fn pad_bounds(b: &Bounds3f) -> Bounds3f {
    if b.is_empty() {
        return *b;
    }
    let extent = b.diagonal().max_component();
    let magnitude = Vector3::from(b.p_min)
        .abs()
        .max(&Vector3::from(b.p_max).abs())
        .max_component();
    b.expand(BOUNDS_PADDING * (extent + magnitude))
}

/// BVHBuildNode represents a node of the Bound Volume Hierarchy during
/// construction.
#[derive(Clone)]
pub struct BVHBuildNode {
    /// Bounding box of all children beneath this node.
    pub bounds: Bounds3f,

    /// Children of this node.
    pub children: [Option<ArenaArc<BVHBuildNode>>; 2],

    /// Coordinate axis along which triangles are partitioned between the
    /// two children.
    pub split_axis: Axis,

    /// Index of the first entry of `BVHAccel::triangle_indices` stored at this node.
    pub first_tri_offset: usize,

    /// Number of triangles stored at this node.
    pub n_triangles: usize,
}

impl BVHBuildNode {
    /// Create a leaf BVH node.
    ///
    /// * `first`  - Index of the first entry of `BVHAccel::triangle_indices` stored at this node.
    /// * `n`      - Number of triangles stored at this node.
    /// * `bounds` - Bounding box.
    pub fn new_leaf_node(first: usize, n: usize, bounds: Bounds3f) -> Self {
        stat_inc!(LEAF_NODES, 1);
        stat_dist!(TRIANGLES_PER_LEAF, n as i64);
        Self {
            first_tri_offset: first,
            n_triangles: n,
            bounds,
            children: [None, None],
            split_axis: Axis::default(),
        }
    }

    /// Allocates an interior BVH node.
    ///
    /// * `axis` - Axis used for partitioning children.
    /// * `c0`   - First child.
    /// * `c1`   - Second child.
    pub fn new_interior_node(
        axis: Axis,
        c0: ArenaArc<BVHBuildNode>,
        c1: ArenaArc<BVHBuildNode>,
    ) -> Self {
        stat_inc!(INTERIOR_NODES, 1);
        Self {
            first_tri_offset: 0,
            n_triangles: 0,
            bounds: c0.bounds.union(&c1.bounds),
            children: [Some(c0), Some(c1)],
            split_axis: axis,
        }
    }

    /// Returns true if this is a leaf node.
    pub fn is_leaf(&self) -> bool {
        self.children[0].is_none()
    }
}

/// Kind of a flattened BVH node.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// Leaf holding `BVHAccel::triangle_indices[offset..offset + count]`.
    Leaf { offset: u32, count: u32 },

    /// Interior node. The first child immediately follows this node; the
    /// second child is at `second_child`.
    Interior { second_child: u32, axis: Axis },
}

/// Stores information needed to traverse the BVH.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LinearBVHNode {
    /// Bounding box for the node.
    pub bounds: Bounds3f,

    /// Leaf or interior node data.
    pub kind: NodeKind,
}

impl LinearBVHNode {
    /// Creates a leaf linear bvh node.
    ///
    /// * `bounds` - Bounding box for the node.
    /// * `offset` - Offset for triangle indices in the node.
    /// * `count`  - Number of triangles in the node.
    pub fn new_leaf_node(bounds: Bounds3f, offset: u32, count: u32) -> Self {
        Self {
            bounds,
            kind: NodeKind::Leaf { offset, count },
        }
    }

    /// Creates an interior linear bvh node.
    ///
    /// * `bounds`       - Bounding box for the node.
    /// * `second_child` - Offset to the second child.
    /// * `axis`         - Axis used for partitioning.
    pub fn new_interior_node(bounds: Bounds3f, second_child: u32, axis: Axis) -> Self {
        Self {
            bounds,
            kind: NodeKind::Interior { second_child, axis },
        }
    }

    /// Returns true if this is a leaf node.
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_method_from_str() {
        assert_eq!("middle".parse::<SplitMethod>(), Ok(SplitMethod::Middle));
        assert_eq!("EQUAL".parse::<SplitMethod>(), Ok(SplitMethod::EqualCounts));
        assert_eq!("sah".parse::<SplitMethod>(), Ok(SplitMethod::SAH));
        assert_eq!("hlbvh".parse::<SplitMethod>(), Ok(SplitMethod::Middle));
        assert_eq!(SplitMethod::EqualCounts.to_string(), "equal");
    }

    #[test]
    fn options_are_clamped() {
        let options = BVHOptions {
            max_leaf_triangles: 0,
            max_depth: 100,
            ..Default::default()
        }
        .validated();
        assert_eq!(options.max_depth, MAX_TREE_DEPTH);
        assert_eq!(options.max_leaf_triangles, 1);
        assert_eq!(BVHOptions::default().validated(), BVHOptions::default());
    }

    #[test]
    fn padding_grows_boxes() {
        let b = Bounds3::new(Point3::new(10.0, 0.0, 0.0), Point3::new(11.0, 1.0, 0.0));
        let p = pad_bounds(&b);
        assert!(p.contains_bounds(&b));
        assert!(p.p_min.z < 0.0 && p.p_max.z > 0.0);
        assert!(p.p_max.x - b.p_max.x < 1e-3);
        assert!(pad_bounds(&Bounds3f::EMPTY).is_empty());
    }
}
