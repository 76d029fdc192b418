//! The interface shared by every continuous distribution.

use dd_core::{errors::Result, Scalar};
use rand::distributions::Open01;
use rand::Rng;

/// Which tail a cumulative query refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Interval {
    /// `P(X <= x)`; the lower quantile inverts it.
    #[default]
    Lower,
    /// `P(X > x)`; the upper quantile inverts it.
    Upper,
}

/// A continuous univariate distribution over a generic scalar.
///
/// Moments that may not exist are capability queries returning `None`
/// rather than failing.
pub trait ContinuousDistribution<T: Scalar> {
    /// Probability density at `x`.
    fn pdf(&self, x: T) -> T;

    /// Cumulative probability of the `interval` side of `x`.
    ///
    /// NaN propagates. Errors only come from an enforced convergence check.
    fn cdf(&self, x: T, interval: Interval) -> Result<T>;

    /// Point whose `interval` probability is `p`.
    ///
    /// NaN and probabilities outside `[0, 1]` give NaN.
    fn quantile(&self, p: T, interval: Interval) -> Result<T>;

    /// Closure of the support, `(lower, upper)`; bounds may be infinite.
    fn support(&self) -> (T, T);

    /// Mean, if it exists.
    fn try_mean(&self) -> Option<T> {
        None
    }

    /// Variance, if it exists.
    fn try_variance(&self) -> Option<T> {
        None
    }

    /// Median, the lower quantile of one half.
    fn try_median(&self) -> Option<T> {
        self.quantile(T::real(0.5), Interval::Lower)
            .ok()
            .filter(|m| m.is_finite())
    }

    /// Draw one variate by inverse-transform sampling.
    ///
    /// The uniform deviate is drawn in `(0, 1)` at `f64` resolution, so the
    /// extreme tails of an extended-precision type are not reached.
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<T>
    where
        Self: Sized,
    {
        let u: f64 = rng.sample(Open01);
        self.quantile(T::real(u), Interval::Lower)
    }
}

/// `true` for a probability the quantile functions accept.
pub(crate) fn is_probability<T: Scalar>(p: T) -> bool {
    p >= T::zero() && p <= T::one()
}
