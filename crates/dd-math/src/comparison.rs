//! Floating-point comparison utilities.

use dd_core::Scalar;

/// Return `true` if `|a - b| <= n * ε * max(|a|, |b|)`, with `ε` the machine
/// epsilon of `T`.
#[inline]
pub fn close_enough<T: Scalar>(a: T, b: T, n: usize) -> bool {
    if a == b {
        return true;
    }
    let eps = a.abs().max(b.abs()) * T::epsilon() * T::count(n);
    (a - b).abs() <= eps
}

/// `|actual - expected| / |expected|`, or the absolute difference when
/// `expected` is zero.
#[inline]
pub fn relative_error<T: Scalar>(actual: T, expected: T) -> T {
    let diff = (actual - expected).abs();
    if expected == T::zero() {
        diff
    } else {
        diff / expected.abs()
    }
}
