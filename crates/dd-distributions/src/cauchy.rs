//! Cauchy distribution.

use dd_core::{errors::Result, Scalar};

use crate::affine::{check_factor, check_location_scale, check_shift, AffineTransform};
use crate::distribution::{is_probability, ContinuousDistribution, Interval};

/// Cauchy distribution with location `mu` and scale `sigma`. It has no mean
/// and no variance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CauchyDistribution<T> {
    mu: T,
    sigma: T,
}

impl<T: Scalar> CauchyDistribution<T> {
    /// Create the distribution; `sigma` must be finite and positive.
    pub fn new(mu: T, sigma: T) -> Result<Self> {
        check_location_scale(mu, sigma)?;
        Ok(Self { mu, sigma })
    }

    /// Location.
    pub fn mu(&self) -> T {
        self.mu
    }

    /// Scale.
    pub fn sigma(&self) -> T {
        self.sigma
    }
}

/// `P(Z <= z)` for the standard Cauchy, accurate in the left tail.
fn standard_lower<T: Scalar>(z: T) -> T {
    if z < T::zero() {
        (-z.recip()).atan() / T::PI()
    } else {
        T::real(0.5) + z.atan() / T::PI()
    }
}

/// Inverse of [`standard_lower`].
fn standard_quantile<T: Scalar>(p: T) -> T {
    if p == T::zero() {
        T::neg_infinity()
    } else if p == T::one() {
        T::infinity()
    } else if p < T::real(0.5) {
        -(T::PI() * p).tan().recip()
    } else {
        (T::PI() * (p - T::real(0.5))).tan()
    }
}

impl<T: Scalar> ContinuousDistribution<T> for CauchyDistribution<T> {
    fn pdf(&self, x: T) -> T {
        let z = (x - self.mu) / self.sigma;
        T::one() / (T::PI() * self.sigma * (T::one() + z * z))
    }

    fn cdf(&self, x: T, interval: Interval) -> Result<T> {
        let z = (x - self.mu) / self.sigma;
        Ok(match interval {
            Interval::Lower => standard_lower(z),
            Interval::Upper => standard_lower(-z),
        })
    }

    fn quantile(&self, p: T, interval: Interval) -> Result<T> {
        if !is_probability(p) {
            return Ok(T::nan());
        }
        let z = match interval {
            Interval::Lower => standard_quantile(p),
            Interval::Upper => -standard_quantile(p),
        };
        Ok(self.mu + self.sigma * z)
    }

    fn support(&self) -> (T, T) {
        (T::neg_infinity(), T::infinity())
    }

    fn try_median(&self) -> Option<T> {
        Some(self.mu)
    }
}

impl<T: Scalar> AffineTransform<T> for CauchyDistribution<T> {
    fn shift(&self, s: T) -> Result<Self> {
        check_shift(s)?;
        Self::new(self.mu + s, self.sigma)
    }

    fn scale(&self, k: T) -> Result<Self> {
        check_factor(k)?;
        Self::new(self.mu * k, self.sigma * k.abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn quartiles() {
        let d = CauchyDistribution::new(2.0, 3.0).unwrap();
        assert_abs_diff_eq!(d.cdf(-1.0, Interval::Lower).unwrap(), 0.25, epsilon = 1e-16);
        assert_abs_diff_eq!(d.cdf(5.0, Interval::Upper).unwrap(), 0.25, epsilon = 1e-16);
        assert_abs_diff_eq!(d.quantile(0.75, Interval::Lower).unwrap(), 5.0, epsilon = 1e-14);
        assert_abs_diff_eq!(d.quantile(0.75, Interval::Upper).unwrap(), -1.0, epsilon = 1e-14);
        assert_eq!(d.cdf(2.0, Interval::Lower).unwrap(), 0.5);
    }

    #[test]
    fn far_tail_keeps_relative_accuracy() {
        let d = CauchyDistribution::new(0.0, 1.0).unwrap();
        let p = d.cdf(-1e10, Interval::Lower).unwrap();
        assert!((p * std::f64::consts::PI * 1e10 - 1.0).abs() < 1e-14);
        let x = d.quantile(p, Interval::Lower).unwrap();
        assert!((x / -1e10 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn no_moments() {
        let d = CauchyDistribution::new(0.0, 1.0).unwrap();
        assert_eq!(d.try_mean(), None);
        assert_eq!(d.try_variance(), None);
        assert_eq!(d.try_median(), Some(0.0));
        assert_eq!(d.quantile(0.0, Interval::Upper).unwrap(), f64::INFINITY);
    }

    #[test]
    fn negative_scale_factor_reflects_location() {
        let d = CauchyDistribution::new(1.0, 2.0).unwrap().scale(-3.0).unwrap();
        assert_eq!((d.mu(), d.sigma()), (-3.0, 6.0));
    }
}
