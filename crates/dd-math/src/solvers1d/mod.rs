//! One-dimensional root polishing.

use dd_core::{errors::Result, Scalar};

use crate::comparison::close_enough;
use crate::quantile_builder::QuantileEstimate;

/// Polish a bracketed seed with at most `iterations` Newton steps.
///
/// `residual(x)` is `F(x) - p` for a monotone `F` and `derivative(x)` its
/// slope. Each iterate is clamped into the bracket, and the bracket shrinks
/// towards the side the step points to. Iteration stops early on a step below
/// `ε|x|` (or the smallest positive value), and aborts, keeping the current
/// iterate, on a zero or non-finite derivative or step.
///
/// A NaN seed is returned unchanged. Errors from `residual` propagate.
///
/// ```
/// use dd_math::{newton_refine, QuantileEstimate};
///
/// let seed = QuantileEstimate { x: 1.5, x0: 1.0, x1: 2.0 };
/// let root = newton_refine(|x: f64| Ok(x * x - 2.0), |x| 2.0 * x, seed, 8).unwrap();
/// assert!((root - std::f64::consts::SQRT_2).abs() < 1e-15);
/// ```
pub fn newton_refine<T, R, D>(
    mut residual: R,
    mut derivative: D,
    estimate: QuantileEstimate<T>,
    iterations: usize,
) -> Result<T>
where
    T: Scalar,
    R: FnMut(T) -> Result<T>,
    D: FnMut(T) -> T,
{
    let QuantileEstimate { mut x, x0, x1 } = estimate;
    if x.is_nan() {
        return Ok(x);
    }
    let (mut lo, mut hi) = (x0, x1);

    for _ in 0..iterations {
        let r = residual(x)?;
        if r == T::zero() || !r.is_finite() {
            break;
        }
        let slope = derivative(x);
        if slope == T::zero() || !slope.is_finite() {
            break;
        }
        let dx = r / slope;
        if !dx.is_finite() {
            break;
        }
        // The root lies on the side the step points to.
        if dx > T::zero() {
            hi = hi.min(x);
        } else {
            lo = lo.max(x);
        }

        let next = (x - dx).max(lo).min(hi);
        let negligible = close_enough(next, x, 1) || (next - x).abs() <= T::min_positive_value();
        x = next;
        if negligible {
            break;
        }
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn seed(x: f64, x0: f64, x1: f64) -> QuantileEstimate<f64> {
        QuantileEstimate { x, x0, x1 }
    }

    #[test]
    fn polishes_the_logistic_quantile() {
        let cdf = |x: f64| 1.0 / (1.0 + (-x).exp());
        let pdf = |x: f64| cdf(x) * (1.0 - cdf(x));
        let p = 0.8;
        let root = newton_refine(|x| Ok(cdf(x) - p), pdf, seed(1.2, 1.0, 1.5), 8).unwrap();
        assert_abs_diff_eq!(root, (p / (1.0 - p)).ln(), epsilon = 1e-15);
    }

    #[test]
    fn steps_are_clamped_into_the_bracket() {
        // Newton from 0.1 on atan overshoots far to the right without a bracket.
        let root = newton_refine(|x: f64| Ok(x.atan() - 1.4), |x| 1.0 / (1.0 + x * x), seed(0.1, 0.0, 10.0), 60)
            .unwrap();
        assert_abs_diff_eq!(root, 1.4_f64.tan(), epsilon = 1e-12);
    }

    #[test]
    fn zero_derivative_keeps_the_seed() {
        let root = newton_refine(|x: f64| Ok(x - 3.0), |_| 0.0, seed(2.5, 2.0, 4.0), 8).unwrap();
        assert_eq!(root, 2.5);
        let root = newton_refine(|x: f64| Ok(x - 3.0), |_| f64::NAN, seed(2.5, 2.0, 4.0), 8).unwrap();
        assert_eq!(root, 2.5);
    }

    #[test]
    fn saturated_seeds_walk_into_the_tail() {
        let cdf = |x: f64| 1.0 - (-x).exp();
        let p = 1.0 - 1e-12;
        let root = newton_refine(
            |x| Ok((-x).exp() - (1.0 - p)),
            |x| -(-x).exp(),
            seed(8.0, 8.0, f64::INFINITY),
            40,
        )
        .unwrap();
        assert!(root > 8.0);
        assert_abs_diff_eq!(cdf(root), p, epsilon = 1e-15);
    }

    #[test]
    fn nan_and_errors_propagate() {
        let root = newton_refine(|x: f64| Ok(x), |_| 1.0, seed(f64::NAN, 0.0, 1.0), 8).unwrap();
        assert!(root.is_nan());
        let failed = newton_refine(
            |_: f64| Err(dd_core::Error::Runtime("boom".into())),
            |_| 1.0,
            seed(0.5, 0.0, 1.0),
            8,
        );
        assert!(failed.is_err());
    }
}
