//! 3-D Axis Aligned Bounding Boxes.

use super::{Point3, Point3f, Ray, Union, Vector3, Vector3f};
use crate::pbrt::{abs, gamma, max, min, Axis, Float, INFINITY};
use num_traits::Num;
use std::ops::{Index, Neg};

/// 3-D Axis Aligned Bounding Box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bounds3<T: Num> {
    /// Minimum bounds.
    pub p_min: Point3<T>,

    /// Maximum bounds.
    pub p_max: Point3<T>,
}

/// 3-D bounding box containing `Float` points.
pub type Bounds3f = Bounds3<Float>;

impl Bounds3f {
    /// The empty box. Minimum bounds are +∞ and maximum bounds are -∞ so that
    /// it is the identity for union.
    pub const EMPTY: Self = Self {
        p_min: Point3 {
            x: INFINITY,
            y: INFINITY,
            z: INFINITY,
        },
        p_max: Point3 {
            x: -INFINITY,
            y: -INFINITY,
            z: -INFINITY,
        },
    };

    /// Returns the parametric range `(t0, t1)` over which the ray overlaps the
    /// box, or `None` if it misses.
    ///
    /// The interval starts as `(-∞, ray.t_max)`; callers that only accept
    /// hits in front of the origin check `t1 >= 0`. An axis whose slab
    /// distances are NaN (zero direction component with the origin exactly on
    /// the slab plane) leaves the interval unchanged.
    ///
    /// * `ray`        - The ray.
    /// * `inv_dir`    - Reciprocal of the ray direction.
    /// * `dir_is_neg` - 1 for each axis along which the direction is negative.
    pub fn intersect_p(
        &self,
        ray: &Ray,
        inv_dir: &Vector3f,
        dir_is_neg: [u8; 3],
    ) -> Option<(Float, Float)> {
        if self.is_empty() {
            return None;
        }

        let mut t0 = -INFINITY;
        let mut t1 = ray.t_max;
        for axis in Axis::ALL {
            let i = axis as usize;
            let t_near = (self[dir_is_neg[i]][axis] - ray.o[axis]) * inv_dir[axis];
            let mut t_far = (self[1 - dir_is_neg[i]][axis] - ray.o[axis]) * inv_dir[axis];

            // Grow the exit distance to cover rounding in the computation above.
            // Infinite distances from parallel axes must stay infinite.
            if t_far.is_finite() {
                t_far += 2.0 * gamma(3) * abs(t_far);
            }

            // `max`/`min` keep the first argument when the second is NaN.
            t0 = max(t0, t_near);
            t1 = min(t1, t_far);
            if t0 > t1 {
                return None;
            }
        }
        Some((t0, t1))
    }
}

impl<T: Num + PartialOrd + Copy> Bounds3<T> {
    /// Creates a new 3-D bounding box from 2 points. The minimum and maximum
    /// bounds are used for each coordinate axis.
    ///
    /// * `p1` - First point.
    /// * `p2` - Second point.
    pub fn new(p1: Point3<T>, p2: Point3<T>) -> Self {
        Self {
            p_min: p1.min(&p2),
            p_max: p1.max(&p2),
        }
    }

    /// Returns true if the bounds describes an empty box where any of the
    /// components of p_max are less than p_min.
    pub fn is_empty(&self) -> bool {
        self.p_max.x < self.p_min.x || self.p_max.y < self.p_min.y || self.p_max.z < self.p_min.z
    }

    /// Returns the vector along the box diagonal from the minimum point to
    /// the maximum point.
    pub fn diagonal(&self) -> Vector3<T> {
        self.p_max - self.p_min
    }

    /// Returns the surface area of the bounding box.
    pub fn surface_area(&self) -> T {
        if self.is_empty() {
            T::zero()
        } else {
            let d = self.diagonal();
            let h = d.x * d.y + d.x * d.z + d.y * d.z;
            h + h
        }
    }

    /// Returns the index of which of the axes is longest.
    pub fn maximum_extent(&self) -> Axis {
        let d = self.diagonal();
        if d.x > d.y && d.x > d.z {
            Axis::X
        } else if d.y > d.z {
            Axis::Y
        } else {
            Axis::Z
        }
    }

    /// Returns the continuous position of a point relative to the corners of
    /// the box, where a point at the minimum corner has offset (0, 0, 0) and a
    /// point at the maximum corner has offset (1, 1, 1). Axes with no extent
    /// report the unscaled offset.
    ///
    /// * `p` - The point.
    pub fn offset(&self, p: &Point3<T>) -> Vector3<T> {
        let mut o = *p - self.p_min;
        for axis in Axis::ALL {
            if self.p_max[axis] > self.p_min[axis] {
                o[axis] = o[axis] / (self.p_max[axis] - self.p_min[axis]);
            }
        }
        o
    }

    /// Returns true if a point is inside the bounding box, including its
    /// boundary.
    ///
    /// * `p` - The point.
    pub fn contains(&self, p: &Point3<T>) -> bool {
        p.x >= self.p_min.x
            && p.x <= self.p_max.x
            && p.y >= self.p_min.y
            && p.y <= self.p_max.y
            && p.z >= self.p_min.z
            && p.z <= self.p_max.z
    }

    /// Returns true if another box lies inside this one. The empty box is
    /// contained in every box.
    ///
    /// * `other` - The other bounding box.
    pub fn contains_bounds(&self, other: &Self) -> bool {
        other.is_empty() || (self.contains(&other.p_min) && self.contains(&other.p_max))
    }

    /// Pad the bounding box by a constant amount in all dimensions. The empty
    /// box stays empty.
    ///
    /// * `delta` - Padding amount.
    pub fn expand(&self, delta: T) -> Self
    where
        T: Neg<Output = T>,
    {
        if self.is_empty() {
            return *self;
        }

        let d = Vector3::new(delta, delta, delta);
        Self {
            p_min: self.p_min - d,
            p_max: self.p_max + d,
        }
    }
}

impl Bounds3f {
    /// Returns the center of the box.
    pub fn centroid(&self) -> Point3f {
        0.5 * self.p_min + 0.5 * self.p_max
    }
}

impl<T: Num> Index<u8> for Bounds3<T> {
    type Output = Point3<T>;

    /// Index the minimum and maximum bounds.
    ///
    /// * `i` - 0 for minimum and 1 for maximum.
    fn index(&self, i: u8) -> &Self::Output {
        match i {
            0 => &self.p_min,
            1 => &self.p_max,
            _ => panic!("Invalid index for std::Index on Bounds3<T>"),
        }
    }
}

impl<T: Num + PartialOrd + Copy> From<Point3<T>> for Bounds3<T> {
    /// Use a 3-D point as minimum and maximum 3-D bounds.
    ///
    /// * `p` - 3-D point.
    fn from(p: Point3<T>) -> Self {
        Self { p_min: p, p_max: p }
    }
}

impl<T: Num + PartialOrd + Copy> Union<Point3<T>> for Bounds3<T> {
    /// Return a bounding box containing itself and a point.
    ///
    /// * `other` - The point.
    fn union(&self, other: &Point3<T>) -> Self {
        Self {
            p_min: self.p_min.min(other),
            p_max: self.p_max.max(other),
        }
    }
}

impl<T: Num + PartialOrd + Copy> Union<Bounds3<T>> for Bounds3<T> {
    /// Return a bounding box containing both bounding boxes.
    ///
    /// * `other` - The other bounding box.
    fn union(&self, other: &Bounds3<T>) -> Self {
        Self {
            p_min: self.p_min.min(&other.p_min),
            p_max: self.p_max.max(&other.p_max),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Dot;
    use float_cmp::approx_eq;
    use proptest::prelude::*;

    fn unit_box() -> Bounds3f {
        Bounds3::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0))
    }

    fn slab(b: &Bounds3f, ray: &Ray) -> Option<(Float, Float)> {
        let inv_dir = Vector3::new(1.0 / ray.d.x, 1.0 / ray.d.y, 1.0 / ray.d.z);
        let dir_is_neg = [
            (inv_dir.x < 0.0) as u8,
            (inv_dir.y < 0.0) as u8,
            (inv_dir.z < 0.0) as u8,
        ];
        b.intersect_p(ray, &inv_dir, dir_is_neg)
    }

    #[test]
    fn empty_is_union_identity() {
        let b = unit_box();
        assert!(Bounds3f::EMPTY.is_empty());
        assert_eq!(Bounds3f::EMPTY.union(&b), b);
        assert_eq!(b.union(&Bounds3f::EMPTY), b);
        assert_eq!(Bounds3f::EMPTY.surface_area(), 0.0);
    }

    #[test]
    fn degenerate_box_is_not_empty() {
        let b = Bounds3f::from(Point3::new(1.0, 2.0, 3.0));
        assert!(!b.is_empty());
        assert_eq!(b.surface_area(), 0.0);
        assert!(b.contains(&Point3::new(1.0, 2.0, 3.0)));
    }

    #[test]
    fn maximum_extent_picks_longest_axis() {
        let b = Bounds3::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 3.0, 2.0));
        assert_eq!(b.maximum_extent(), Axis::Y);
        assert!(approx_eq!(f32, b.surface_area(), 22.0));
    }

    #[test]
    fn offset_maps_corners() {
        let b = unit_box();
        assert_eq!(b.offset(&b.p_min), Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(b.offset(&b.p_max), Vector3::new(1.0, 1.0, 1.0));
        assert_eq!(b.offset(&Point3f::ZERO), Vector3::new(0.5, 0.5, 0.5));
    }

    #[test]
    fn expand_keeps_empty_box_empty() {
        assert!(Bounds3f::EMPTY.expand(1.0).is_empty());
        let b = unit_box().expand(0.5);
        assert_eq!(b.p_min, Point3::new(-1.5, -1.5, -1.5));
        assert_eq!(b.p_max, Point3::new(1.5, 1.5, 1.5));
    }

    #[test]
    fn slab_hit_reports_entry_and_exit() {
        let ray = Ray::new(Point3::new(0.0, 0.0, 10.0), Vector3::new(0.0, 0.0, -1.0), INFINITY);
        let (t0, t1) = slab(&unit_box(), &ray).expect("ray should hit the box");
        assert!(approx_eq!(f32, t0, 9.0, ulps = 4));
        assert!(t1 >= 11.0 && t1 < 11.001);
    }

    #[test]
    fn slab_miss_and_empty() {
        let ray = Ray::new(Point3::new(5.0, 0.0, 10.0), Vector3::new(0.0, 0.0, -1.0), INFINITY);
        assert!(slab(&unit_box(), &ray).is_none());

        let ray = Ray::new(Point3::new(0.0, 0.0, 10.0), Vector3::new(0.0, 0.0, -1.0), INFINITY);
        assert!(slab(&Bounds3f::EMPTY, &ray).is_none());
    }

    #[test]
    fn slab_parallel_ray_outside_slab_misses() {
        let axes = [
            Vector3f::new(1.0, 0.0, 0.0),
            Vector3f::new(0.0, 1.0, 0.0),
            Vector3f::new(0.0, 0.0, 1.0),
        ];
        for d in axes {
            for sign in [1.0, -1.0] {
                let d = d * sign;
                let start = Point3f::ZERO - d * 10.0;
                // Shift the origin off the box along each axis the ray is parallel to.
                for off in axes.iter().filter(|a| a.dot(&d) == 0.0) {
                    for shift in [3.0, -3.0] {
                        let ray = Ray::new(start + *off * shift, d, INFINITY);
                        assert!(slab(&unit_box(), &ray).is_none(), "{ray:?}");
                    }
                }
                let ray = Ray::new(start, d, INFINITY);
                assert!(slab(&unit_box(), &ray).is_some());
            }
        }
    }

    #[test]
    fn slab_respects_t_max() {
        let ray = Ray::new(Point3::new(0.0, 0.0, 10.0), Vector3::new(0.0, 0.0, -1.0), 5.0);
        assert!(slab(&unit_box(), &ray).is_none());
    }

    #[test]
    fn slab_origin_on_plane_does_not_constrain() {
        // Origin lies on the x = 1 face and the ray runs parallel to it.
        let ray = Ray::new(Point3::new(1.0, 0.0, 10.0), Vector3::new(0.0, 0.0, -1.0), INFINITY);
        assert!(slab(&unit_box(), &ray).is_some());

        // Flat box in the z = 0 plane hit by a ray lying in that plane.
        let flat = Bounds3::new(Point3::new(-1.0, -1.0, 0.0), Point3::new(1.0, 1.0, 0.0));
        let ray = Ray::new(Point3::new(-5.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0), INFINITY);
        assert!(slab(&flat, &ray).is_some());
    }

    #[test]
    fn slab_behind_origin_has_negative_exit() {
        let ray = Ray::new(Point3::new(0.0, 0.0, 10.0), Vector3::new(0.0, 0.0, 1.0), INFINITY);
        let (_, t1) = slab(&unit_box(), &ray).expect("line should cross the box");
        assert!(t1 < 0.0);
    }

    prop_point3!(
        point3_f32,
        f32,
        -100.0..100.0f32,
        -100.0..100.0f32,
        -100.0..100.0f32
    );

    proptest! {
        #[test]
        fn union_contains_both(p1 in point3_f32(), p2 in point3_f32(), p3 in point3_f32()) {
            let b1 = Bounds3::new(p1, p2);
            let b2 = Bounds3::from(p3);
            let u = b1.union(&b2);
            prop_assert!(u.contains_bounds(&b1));
            prop_assert!(u.contains_bounds(&b2));
            prop_assert!(u.contains(&p3));
        }

        #[test]
        fn centroid_is_inside(p1 in point3_f32(), p2 in point3_f32()) {
            let b = Bounds3::new(p1, p2);
            prop_assert!(b.contains(&b.centroid()));
        }

        #[test]
        fn ray_towards_centroid_hits(p1 in point3_f32(), p2 in point3_f32(), o in point3_f32()) {
            let b = Bounds3::new(p1, p2).expand(0.01);
            let d = b.centroid() - o;
            prop_assume!(d.length() > 1e-3);
            let ray = Ray::new(o, d.normalize(), INFINITY);
            let hit = slab(&b, &ray);
            prop_assert!(hit.is_some());
            let (t0, t1) = hit.unwrap();
            prop_assert!(t0 <= t1 && t1 >= 0.0);
        }
    }
}
