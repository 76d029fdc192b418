//! Table-seeded inversion of monotone functions.
//!
//! A [`QuantileBuilder`] tabulates a non-decreasing function on an equally
//! spaced grid and answers `estimate(p)` with a bracketed first guess of the
//! point where the function reaches `p`. Within a bracket the position is a
//! blend of linear and log2-domain interpolation; the per-node blend weight
//! records which of the two reproduces the node from its neighbours better.
//! Cumulative functions spanning many decades need the log part in the tails
//! and the linear part near the middle.
//!
//! The estimate is a seed, not a root: pair it with
//! [`newton_refine`](crate::solvers1d::newton_refine).

use dd_core::{ensure, errors::Result, is_power_of_two, Scalar};

/// Bracketed initial guess returned by [`QuantileBuilder::estimate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantileEstimate<T> {
    /// Interpolated position.
    pub x: T,
    /// Left end of the bracket (`-∞` when saturated below the table).
    pub x0: T,
    /// Right end of the bracket (`+∞` when saturated above the table).
    pub x1: T,
}

impl<T: Scalar> QuantileEstimate<T> {
    /// `true` if the target lay outside the tabulated range, so `x` is a
    /// domain boundary and the bracket is one-sided infinite.
    pub fn is_saturated(&self) -> bool {
        self.x0.is_infinite() || self.x1.is_infinite()
    }

    /// Mirror the estimate through the origin (used for decreasing tables
    /// tabulated on a reflected grid).
    pub fn reflected(&self) -> Self {
        Self {
            x: -self.x,
            x0: -self.x1,
            x1: -self.x0,
        }
    }

    fn nan() -> Self {
        Self {
            x: T::nan(),
            x0: T::nan(),
            x1: T::nan(),
        }
    }
}

/// Interpolation table of a non-decreasing function over `[a, b]`.
///
/// ```
/// use dd_math::QuantileBuilder;
///
/// let cdf = |x: f64| 1.0 - (-x).exp();
/// let q = QuantileBuilder::from_fn(0.0, 8.0, cdf, 64).unwrap();
/// let e = q.estimate(0.5);
/// assert!(e.x0 <= std::f64::consts::LN_2 && std::f64::consts::LN_2 <= e.x1);
/// ```
#[derive(Debug, Clone)]
pub struct QuantileBuilder<T> {
    a: T,
    b: T,
    h: T,
    values: Vec<T>,
    log2_values: Vec<T>,
    weights: Vec<T>,
}

impl<T: Scalar> QuantileBuilder<T> {
    /// Tabulate `f` at `samples + 1` equally spaced points of `[a, b]`.
    pub fn from_fn<F>(a: T, b: T, mut f: F, samples: usize) -> Result<Self>
    where
        F: FnMut(T) -> T,
    {
        check_grid(a, b, samples)?;
        let h = (b - a) / T::count(samples);
        let table = (0..=samples)
            .map(|i| f(grid_point(a, b, h, i, samples)))
            .collect();
        Self::from_table(a, b, table)
    }

    /// Build from precomputed values `table[i] = f(a + i (b - a) / samples)`.
    ///
    /// # Errors
    /// Returns an error if `samples = table.len() - 1` is not a power of two
    /// of at least 2, if the bounds are not finite with `a < b`, or if the
    /// table contains NaN or decreases.
    pub fn from_table(a: T, b: T, table: Vec<T>) -> Result<Self> {
        let samples = table.len().saturating_sub(1);
        check_grid(a, b, samples)?;
        ensure!(
            table.iter().all(|v| !v.is_nan()),
            "quantile table must not contain NaN"
        );
        ensure!(
            table.windows(2).all(|w| w[0] <= w[1]),
            "quantile table must be non-decreasing"
        );

        let log2_values: Vec<T> = table.iter().map(|v| v.log2()).collect();
        let mut weights = vec![T::zero(); samples + 1];
        let half = T::real(0.5);
        for i in 1..samples {
            let linear = (table[i - 1] + table[i + 1]) * half;
            let geometric = ((log2_values[i - 1] + log2_values[i + 1]) * half).exp2();
            let linear_error = (linear - table[i]).abs();
            let log_error = (geometric - table[i]).abs();
            weights[i] = log_weight(linear_error, log_error);
        }
        weights[0] = weights[1];
        weights[samples] = weights[samples - 1];

        Ok(Self {
            a,
            b,
            h: (b - a) / T::count(samples),
            values: table,
            log2_values,
            weights,
        })
    }

    /// Number of grid intervals.
    pub fn samples(&self) -> usize {
        self.values.len() - 1
    }

    /// The tabulated domain `(a, b)`.
    pub fn domain(&self) -> (T, T) {
        (self.a, self.b)
    }

    /// Tabulated values.
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// `log2` of the tabulated values.
    pub fn log2_values(&self) -> &[T] {
        &self.log2_values
    }

    /// Per-node weight of the log2-domain fraction, in `[0, 1]`.
    pub fn weights(&self) -> &[T] {
        &self.weights
    }

    /// Grid point `i`.
    pub fn node(&self, i: usize) -> T {
        grid_point(self.a, self.b, self.h, i, self.samples())
    }

    /// Seed for the point where the tabulated function reaches `p`.
    ///
    /// Below the first value the result is `(a, -∞, a)`, above the last one
    /// `(b, b, +∞)`. A NaN target gives NaN everywhere.
    ///
    /// Inside a bracket the linear and log2-domain fractions are blended by
    /// the node weights. When only one of them is finite (a zero value has
    /// an infinite log) that one is used alone rather than the blend
    /// collapsing to the left node; only when neither is finite does the
    /// fraction default to zero.
    pub fn estimate(&self, p: T) -> QuantileEstimate<T> {
        if p.is_nan() {
            return QuantileEstimate::nan();
        }
        let n = self.samples();
        if p < self.values[0] {
            return QuantileEstimate {
                x: self.a,
                x0: T::neg_infinity(),
                x1: self.a,
            };
        }
        if p > self.values[n] {
            return QuantileEstimate {
                x: self.b,
                x0: self.b,
                x1: T::infinity(),
            };
        }

        let i = self.bracket(p);
        let (v0, v1) = (self.values[i], self.values[i + 1]);
        let (l0, l1) = (self.log2_values[i], self.log2_values[i + 1]);
        let linear = (p - v0) / (v1 - v0);
        let log = (p.log2() - l0) / (l1 - l0);
        let w = (self.weights[i] + self.weights[i + 1]) * T::real(0.5);

        let fraction = if p == v0 {
            T::zero()
        } else if p == v1 {
            T::one()
        } else {
            match (linear.is_finite(), log.is_finite()) {
                (true, true) => (T::one() - w) * linear + w * log,
                (true, false) => linear,
                (false, true) => log,
                (false, false) => T::zero(),
            }
        };
        let fraction = if fraction.is_finite() {
            fraction.max(T::zero()).min(T::one())
        } else {
            T::zero()
        };

        let x0 = self.node(i);
        let x1 = self.node(i + 1);
        let x = if fraction == T::one() {
            x1
        } else {
            (x0 + fraction * self.h).max(x0).min(x1)
        };
        QuantileEstimate { x, x0, x1 }
    }

    /// Largest `i < samples` with `values[i] <= p`, by halving strides.
    fn bracket(&self, p: T) -> usize {
        let n = self.samples();
        let mut i = 0;
        let mut stride = n / 2;
        while stride > 0 {
            if i + stride < n && self.values[i + stride] <= p {
                i += stride;
            }
            stride /= 2;
        }
        i
    }
}

/// Share of the log-domain fraction given the two midpoint errors.
fn log_weight<T: Scalar>(linear_error: T, log_error: T) -> T {
    if !log_error.is_finite() {
        return T::zero();
    }
    if !linear_error.is_finite() {
        return T::one();
    }
    let total = linear_error + log_error;
    if total > T::zero() {
        linear_error / total
    } else {
        T::zero()
    }
}

fn check_grid<T: Scalar>(a: T, b: T, samples: usize) -> Result<()> {
    ensure!(
        a.is_finite() && b.is_finite() && a < b,
        "quantile grid needs a finite domain with a < b, got [{a}, {b}]"
    );
    ensure!(
        is_power_of_two(samples) && samples >= 2,
        "quantile samples must be a power of two >= 2, got {samples}"
    );
    Ok(())
}

fn grid_point<T: Scalar>(a: T, b: T, h: T, i: usize, samples: usize) -> T {
    if i == samples {
        b
    } else {
        a + h * T::count(i)
    }
}
