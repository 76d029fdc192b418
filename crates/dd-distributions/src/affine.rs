//! Location-scale algebra.
//!
//! Shifting or scaling a distribution yields a new, independent instance:
//! caches are never shared or carried over.

use dd_core::{ensure, errors::Result, Scalar};

/// Distributions closed under `X + s` and `k X`.
pub trait AffineTransform<T: Scalar>: Sized {
    /// Distribution of `X + s`.
    fn shift(&self, s: T) -> Result<Self>;

    /// Distribution of `k X`.
    fn scale(&self, k: T) -> Result<Self>;
}

pub(crate) fn check_shift<T: Scalar>(s: T) -> Result<()> {
    ensure!(s.is_finite(), "shift must be finite, got {s}");
    Ok(())
}

pub(crate) fn check_factor<T: Scalar>(k: T) -> Result<()> {
    ensure!(
        k.is_finite() && k != T::zero(),
        "scale factor must be finite and non-zero, got {k}"
    );
    Ok(())
}

/// Validate a location-scale pair.
pub(crate) fn check_location_scale<T: Scalar>(mu: T, sigma: T) -> Result<()> {
    ensure!(mu.is_finite(), "location must be finite, got {mu}");
    ensure!(
        sigma.is_finite() && sigma > T::zero(),
        "scale must be finite and positive, got {sigma}"
    );
    Ok(())
}
