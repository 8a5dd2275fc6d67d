//! Recursive top-down BVH construction.

use super::common::*;
use order_stat::kth_by;
use raycast_core::geometry::*;
use raycast_core::pbrt::*;
use shared_arena::{ArenaArc, SharedArena};
use std::cmp::Ordering;

const N_BUCKETS: usize = 12;

/// State shared by all levels of the recursive build.
pub struct BuildContext<'a> {
    /// Allocator for build nodes.
    pub arena: &'a SharedArena<BVHBuildNode>,

    /// Build options.
    pub options: BVHOptions,

    /// Used to return total number of nodes.
    pub total_nodes: usize,

    /// Deepest leaf created so far.
    pub max_depth_reached: usize,

    /// Triangle indices ordered such that triangles in leaf nodes occupy
    /// contiguous ranges.
    pub ordered_triangles: Vec<usize>,
}

impl<'a> BuildContext<'a> {
    /// Create a new build context.
    ///
    /// * `arena`       - Allocator for build nodes.
    /// * `options`     - Build options.
    /// * `n_triangles` - Number of triangles that will be placed in leaves.
    pub fn new(arena: &'a SharedArena<BVHBuildNode>, options: BVHOptions, n_triangles: usize) -> Self {
        Self {
            arena,
            options,
            total_nodes: 0,
            max_depth_reached: 0,
            ordered_triangles: Vec::with_capacity(n_triangles),
        }
    }
}

/// Recursively build the BVH structure over `primitive_info[start..end]`.
///
/// * `ctx`            - Build state.
/// * `primitive_info` - Triangle information; reordered in place.
/// * `start`          - Starting index. For first call it should be 0.
/// * `end`            - Ending index + 1. For first call it should be number
///                      of triangles.
/// * `depth`          - Depth of the node being built. The root has depth 0.
pub fn build(
    ctx: &mut BuildContext,
    primitive_info: &mut [BVHPrimitiveInfo],
    start: usize,
    end: usize,
    depth: usize,
) -> ArenaArc<BVHBuildNode> {
    // Compute bounds of all triangles in BVH node.
    let bounds = primitive_info[start..end]
        .iter()
        .fold(Bounds3f::EMPTY, |b, info| b.union(&info.bounds));

    let n_triangles = end - start;
    ctx.total_nodes += 1;

    let split = if n_triangles <= ctx.options.max_leaf_triangles || depth >= ctx.options.max_depth
    {
        None
    } else {
        match ctx.options.split_method {
            SplitMethod::Middle => Some(split_middle(primitive_info, start, end, &bounds)),
            SplitMethod::EqualCounts => {
                let dim = bounds.maximum_extent();
                Some((split_equal_counts(primitive_info, start, end, dim), dim))
            }
            SplitMethod::SAH => Some(split_sah(primitive_info, start, end)),
        }
    };

    match split {
        Some((mid, dim)) => {
            // Create interior BVHBuildNode.
            let c0 = build(ctx, primitive_info, start, mid, depth + 1);
            let c1 = build(ctx, primitive_info, mid, end, depth + 1);
            ctx.arena
                .alloc_arc(BVHBuildNode::new_interior_node(dim, c0, c1))
        }
        None => {
            // Create leaf BVHBuildNode.
            let first_tri_offset = ctx.ordered_triangles.len();
            ctx.ordered_triangles
                .extend(primitive_info[start..end].iter().map(|info| info.triangle));
            ctx.max_depth_reached = ctx.max_depth_reached.max(depth);
            ctx.arena
                .alloc_arc(BVHBuildNode::new_leaf_node(first_tri_offset, n_triangles, bounds))
        }
    }
}

/// Split at the midpoint of the longest axis of the node bounds. If every
/// centroid falls on the same side, split by rank instead.
///
/// Returns the pivot index and the split axis.
///
/// * `primitive_info`  - Vector containing all triangle info.
/// * `start`           - Starting index in primitive_info.
/// * `end`             - Ending index + 1 in primitive_info.
/// * `bounds`          - Bounding box of the triangles in the node.
fn split_middle(
    primitive_info: &mut [BVHPrimitiveInfo],
    start: usize,
    end: usize,
    bounds: &Bounds3f,
) -> (usize, Axis) {
    let dim = bounds.maximum_extent();
    let pmid = (bounds.p_min[dim] + bounds.p_max[dim]) / 2.0;
    let infos = primitive_info[start..end].iter_mut();
    let split = itertools::partition(infos, |pi| pi.centroid[dim] < pmid);
    let mid = start + split;

    if mid != start && mid != end {
        (mid, dim)
    } else {
        (split_equal_counts(primitive_info, start, end, dim), dim)
    }
}

/// Partition triangles into equally sized subsets such that the first half
/// of the triangles have smallest centroid coordinate values along the
/// chosen axis, and second half have the largest centroid coordinate values.
///
/// * `primitive_info`  - Vector containing all triangle info.
/// * `start`           - Starting index in primitive_info.
/// * `end`             - Ending index + 1 in primitive_info.
/// * `dim`             - Axis used to partition triangles.
fn split_equal_counts(
    primitive_info: &mut [BVHPrimitiveInfo],
    start: usize,
    end: usize,
    dim: Axis,
) -> usize {
    let mid = (start + end) / 2;
    let w = &mut primitive_info[start..end];
    kth_by(w, mid - start, |a, b| compare_centroids(a, b, dim));
    mid
}

/// Orders triangles by centroid along an axis, then by triangle index so
/// that coincident centroids still partition deterministically.
fn compare_centroids(a: &BVHPrimitiveInfo, b: &BVHPrimitiveInfo, dim: Axis) -> Ordering {
    a.centroid[dim]
        .partial_cmp(&b.centroid[dim])
        .unwrap_or(Ordering::Equal)
        .then(a.triangle.cmp(&b.triangle))
}

/// Partition triangles using the Surface Area Heuristic. Falls back to a
/// rank split when the centroids have no extent or the best bucket
/// boundary leaves one side empty.
///
/// Returns the pivot index and the split axis.
///
/// * `primitive_info` - Vector containing all triangle info.
/// * `start`          - Start index in primitive_info.
/// * `end`            - End index in primitive_info.
fn split_sah(primitive_info: &mut [BVHPrimitiveInfo], start: usize, end: usize) -> (usize, Axis) {
    // Compute bound of triangle centroids, choose split dimension dim.
    let centroid_bounds = primitive_info[start..end]
        .iter()
        .fold(Bounds3f::EMPTY, |b, info| b.union(&info.centroid));
    let dim = centroid_bounds.maximum_extent();

    if end - start <= 2 || centroid_bounds.p_max[dim] <= centroid_bounds.p_min[dim] {
        return (split_equal_counts(primitive_info, start, end, dim), dim);
    }

    let bucket_of = |info: &BVHPrimitiveInfo| -> usize {
        let b = (N_BUCKETS as Float * centroid_bounds.offset(&info.centroid)[dim]) as usize;
        b.min(N_BUCKETS - 1)
    };

    // Initialize BucketInfo for SAH partition buckets.
    let mut buckets = [BucketInfo::default(); N_BUCKETS];
    for info in primitive_info[start..end].iter() {
        let b = bucket_of(info);
        buckets[b].count += 1;
        buckets[b].bounds = buckets[b].bounds.union(&info.bounds);
    }

    // Compute costs for splitting after each bucket. Surface areas are
    // relative so the node's own area is left out.
    let mut cost = [0.0 as Float; N_BUCKETS - 1];
    for (i, cost_i) in cost.iter_mut().enumerate() {
        let (b0, count0) = buckets[..=i]
            .iter()
            .fold((Bounds3f::EMPTY, 0), |(b, c), bucket| {
                (b.union(&bucket.bounds), c + bucket.count)
            });
        let (b1, count1) = buckets[i + 1..]
            .iter()
            .fold((Bounds3f::EMPTY, 0), |(b, c), bucket| {
                (b.union(&bucket.bounds), c + bucket.count)
            });

        *cost_i = if count0 == 0 || count1 == 0 {
            INFINITY
        } else {
            count0 as Float * b0.surface_area() + count1 as Float * b1.surface_area()
        };
    }

    // Find bucket to split at that minimizes SAH metric.
    let mut min_cost_split_bucket = 0;
    for (i, cost_i) in cost.iter().enumerate().skip(1) {
        if *cost_i < cost[min_cost_split_bucket] {
            min_cost_split_bucket = i;
        }
    }

    let infos = primitive_info[start..end].iter_mut();
    let split = itertools::partition(infos, |pi| bucket_of(pi) <= min_cost_split_bucket);
    let mid = start + split;

    if mid != start && mid != end {
        (mid, dim)
    } else {
        (split_equal_counts(primitive_info, start, end, dim), dim)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
