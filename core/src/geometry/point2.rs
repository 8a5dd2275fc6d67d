//! 2-D Points

use crate::pbrt::Float;
use num_traits::Num;
use std::ops::{Add, Mul};

/// A 2-D point containing numeric values.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Point2<T> {
    /// X-coordinate.
    pub x: T,

    /// Y-coordinate.
    pub y: T,
}

/// 2-D point containing `Float` values.
pub type Point2f = Point2<Float>;

impl<T: Num> Point2<T> {
    /// Creates a new 2-D point.
    ///
    /// * `x` - X-coordinate.
    /// * `y` - Y-coordinate.
    pub fn new(x: T, y: T) -> Self {
        Self { x, y }
    }
}

impl<T: Num> Add for Point2<T> {
    type Output = Point2<T>;

    fn add(self, other: Self) -> Self::Output {
        Point2::new(self.x + other.x, self.y + other.y)
    }
}

impl<T: Num + Copy> Mul<T> for Point2<T> {
    type Output = Point2<T>;

    fn mul(self, f: T) -> Self::Output {
        Point2::new(f * self.x, f * self.y)
    }
}

impl Mul<Point2f> for Float {
    type Output = Point2f;

    fn mul(self, p: Point2f) -> Point2f {
        Point2f::new(self * p.x, self * p.y)
    }
}

impl<T> From<[T; 2]> for Point2<T> {
    fn from([x, y]: [T; 2]) -> Self {
        Self { x, y }
    }
}
