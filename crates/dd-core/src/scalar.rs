//! The floating-point abstraction the whole engine is generic over.
//!
//! Any type with `num-traits` float semantics qualifies: `f64` in-tree, or a
//! double-double / quad type supplied by the caller. Everything precision
//! dependent (tolerances, quadrature nodes, rounding floors) is derived from
//! [`Float::epsilon`] of the concrete type, never from `f64` constants.

use std::fmt::{Debug, Display};

use num_traits::{Float, FloatConst, FromPrimitive};

/// An (extended-precision) real scalar.
///
/// Blanket-implemented; there is nothing to implement by hand.
pub trait Scalar:
    Float + FloatConst + FromPrimitive + Debug + Display + Send + Sync + 'static
{
    /// Convert an `f64` literal. Unrepresentable values become NaN.
    #[inline]
    fn real(x: f64) -> Self {
        Self::from_f64(x).unwrap_or_else(Self::nan)
    }

    /// Convert a count or index.
    #[inline]
    fn count(n: usize) -> Self {
        Self::from_usize(n).unwrap_or_else(Self::nan)
    }

    /// Round to `f64`, for diagnostics.
    #[inline]
    fn to_real(self) -> f64 {
        self.to_f64().unwrap_or(f64::NAN)
    }
}

impl<T> Scalar for T where
    T: Float + FloatConst + FromPrimitive + Debug + Display + Send + Sync + 'static
{
}

/// Return `true` if `n` is a power of two (`0` is not).
#[inline]
pub fn is_power_of_two(n: usize) -> bool {
    n != 0 && n & (n - 1) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn literal_conversion() {
        assert_eq!(<f64 as Scalar>::real(0.25), 0.25);
        assert_eq!(<f32 as Scalar>::count(3), 3.0_f32);
        assert_eq!(Scalar::to_real(1.5_f32), 1.5);
    }

    #[test]
    fn powers_of_two() {
        assert!(!is_power_of_two(0));
        assert!(is_power_of_two(1));
        assert!(is_power_of_two(1024));
        assert!(!is_power_of_two(96));
    }

    proptest! {
        #[test]
        fn shifted_ones_are_powers_of_two(k in 0u32..usize::BITS) {
            let n = 1usize << k;
            prop_assert!(is_power_of_two(n));
            if n > 2 {
                prop_assert!(!is_power_of_two(n - 1));
                prop_assert!(!is_power_of_two(n + 1));
            }
        }

        #[test]
        fn narrowing_keeps_single_precision(x in 1e-30_f64..1e30) {
            let narrow = <f32 as Scalar>::real(x);
            assert_relative_eq!(narrow.to_real(), x, max_relative = 1e-7);
            prop_assert_eq!(<f64 as Scalar>::real(x).to_real(), x);
        }
    }
}
