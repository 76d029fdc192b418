//! Logistic distribution.

use dd_core::{errors::Result, Scalar};

use crate::affine::{check_factor, check_location_scale, check_shift, AffineTransform};
use crate::distribution::{is_probability, ContinuousDistribution, Interval};

/// Logistic distribution with location `mu` and scale `sigma`.
///
/// Every function is closed form, which makes it the reference for
/// cross-checking the numerical engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogisticDistribution<T> {
    mu: T,
    sigma: T,
}

impl<T: Scalar> LogisticDistribution<T> {
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

    fn standardize(&self, x: T) -> T {
        (x - self.mu) / self.sigma
    }
}

impl<T: Scalar> ContinuousDistribution<T> for LogisticDistribution<T> {
    fn pdf(&self, x: T) -> T {
        let e = (-self.standardize(x).abs()).exp();
        let d = T::one() + e;
        e / (self.sigma * d * d)
    }

    fn cdf(&self, x: T, interval: Interval) -> Result<T> {
        let z = self.standardize(x);
        let z = match interval {
            Interval::Lower => z,
            Interval::Upper => -z,
        };
        Ok(T::one() / (T::one() + (-z).exp()))
    }

    fn quantile(&self, p: T, interval: Interval) -> Result<T> {
        if !is_probability(p) {
            return Ok(T::nan());
        }
        // log(p / (1 - p))
        let logit = p.ln() - (-p).ln_1p();
        let z = match interval {
            Interval::Lower => logit,
            Interval::Upper => -logit,
        };
        Ok(self.mu + self.sigma * z)
    }

    fn support(&self) -> (T, T) {
        (T::neg_infinity(), T::infinity())
    }

    fn try_mean(&self) -> Option<T> {
        Some(self.mu)
    }

    fn try_variance(&self) -> Option<T> {
        let s = self.sigma * T::PI();
        Some(s * s / T::real(3.0))
    }

    fn try_median(&self) -> Option<T> {
        Some(self.mu)
    }
}

impl<T: Scalar> AffineTransform<T> for LogisticDistribution<T> {
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
    fn closed_forms() {
        let d = LogisticDistribution::new(1.0, 2.0).unwrap();
        assert_eq!(d.cdf(1.0, Interval::Lower).unwrap(), 0.5);
        assert_abs_diff_eq!(d.pdf(1.0), 0.125, epsilon = 1e-16);
        let e = (-1.0_f64).exp();
        assert_abs_diff_eq!(d.cdf(3.0, Interval::Lower).unwrap(), 1.0 / (1.0 + e), epsilon = 1e-16);
        assert_abs_diff_eq!(d.cdf(3.0, Interval::Upper).unwrap(), e / (1.0 + e), epsilon = 1e-16);
        assert_abs_diff_eq!(d.try_variance().unwrap(), 4.0 * std::f64::consts::PI.powi(2) / 3.0, epsilon = 1e-14);
    }

    #[test]
    fn quantile_inverts_cdf_in_both_tails() {
        let d = LogisticDistribution::new(-0.5, 0.25).unwrap();
        for p in [1e-12_f64, 0.1, 0.5, 0.75, 0.999] {
            let x = d.quantile(p, Interval::Lower).unwrap();
            assert_abs_diff_eq!(d.cdf(x, Interval::Lower).unwrap(), p, epsilon = 1e-15);
            let y = d.quantile(p, Interval::Upper).unwrap();
            assert!((d.cdf(y, Interval::Upper).unwrap() - p).abs() <= 1e-14 * p);
        }
        assert_eq!(d.quantile(0.0, Interval::Lower).unwrap(), f64::NEG_INFINITY);
        assert_eq!(d.quantile(1.0, Interval::Lower).unwrap(), f64::INFINITY);
        assert!(d.quantile(-0.1, Interval::Lower).unwrap().is_nan());
    }

    #[test]
    fn affine_maps() {
        let d = LogisticDistribution::new(1.0, 2.0).unwrap();
        let s = d.shift(3.0).unwrap().scale(-2.0).unwrap();
        assert_eq!((s.mu(), s.sigma()), (-8.0, 4.0));
        assert!(d.scale(0.0).is_err());
        assert!(d.shift(f64::NAN).is_err());
        assert!(LogisticDistribution::new(0.0, -1.0).is_err());
    }
}
