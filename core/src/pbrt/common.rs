//! Common

use num_traits::Num;
use std::ops::{Add, Mul, Neg};

/// Use 32-bit precision for floating point numbers.
pub type Float = f32;

/// Infinty (∞)
pub const INFINITY: Float = Float::INFINITY;

/// PI (π)
pub const PI: Float = std::f32::consts::PI;

/// 2*PI (2π)
pub const TWO_PI: Float = PI * 2.0;

/// Machine Epsilon
pub const MACHINE_EPSILON: Float = std::f32::EPSILON * 0.5;

/// Returns the absolute value of a number.
///
/// * `n` - The number.
#[inline(always)]
pub fn abs<T>(n: T) -> T
where
    T: Num + Neg<Output = T> + PartialOrd + Copy,
{
    if n < T::zero() {
        -n
    } else {
        n
    }
}

/// Returns the minimum of 2 numbers. If `b` is NaN, `a` is returned.
///
/// * `a` - First number.
/// * `b` - Second number.
#[inline(always)]
pub fn min<T>(a: T, b: T) -> T
where
    T: Num + PartialOrd + Copy,
{
    if b < a {
        b
    } else {
        a
    }
}

/// Returns the maximum of 2 numbers. If `b` is NaN, `a` is returned.
///
/// * `a` - First number.
/// * `b` - Second number.
#[inline(always)]
pub fn max<T>(a: T, b: T) -> T
where
    T: Num + PartialOrd + Copy,
{
    if b > a {
        b
    } else {
        a
    }
}

/// Clamps a value x to [min, max].
///
/// * `x`   - The number to clamp.
/// * `min` - Minimum value.
/// * `max` - Maximum value.
#[inline(always)]
pub fn clamp<T>(x: T, min: T, max: T) -> T
where
    T: PartialOrd + Copy,
{
    if x < min {
        min
    } else if x > max {
        max
    } else {
        x
    }
}

/// Returns the error bound for adding n terms.
///
/// * `n` - Number of terms
#[inline(always)]
pub fn gamma(n: i32) -> Float {
    (n as Float * MACHINE_EPSILON) / (1.0 - n as Float * MACHINE_EPSILON)
}

/// Linearly interpolate between two points for parameters in [0, 1] and
/// extrapolate for parameters outside that interval.
///
/// * `t` - Parameter.
/// * `p0` - Point at t=0.
/// * `p1` - Point at t=1.
#[inline(always)]
pub fn lerp<P>(t: Float, p0: P, p1: P) -> P
where
    Float: Mul<P, Output = P>,
    P: Add<P, Output = P>,
{
    (1.0 - t) * p0 + t * p1
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn min_max_ignore_nan_in_second_argument() {
        assert_eq!(min(1.0, Float::NAN), 1.0);
        assert_eq!(max(1.0, Float::NAN), 1.0);
    }

    #[test]
    fn gamma_grows_with_terms() {
        assert!(gamma(3) > gamma(2));
        assert!(gamma(1) > 0.0);
    }

    proptest! {
        #[test]
        fn clamp_stays_in_range(x in -100.0..100.0f32, lo in -50.0..0.0f32, hi in 0.0..50.0f32) {
            let c = clamp(x, lo, hi);
            prop_assert!(c >= lo && c <= hi);
        }

        #[test]
        fn lerp_hits_end_points(p0 in -100.0..100.0f32, p1 in -100.0..100.0f32) {
            prop_assert_eq!(lerp(0.0, p0, p1), p0);
            prop_assert_eq!(lerp(1.0, p0, p1), p1);
        }
    }
}
