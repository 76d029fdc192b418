//! Cached cumulative integrals of a non-negative function on a finite domain.
//!
//! `[a, b]` is split into `samples` equal segments, each integrated once.
//! Prefix sums from the left (`lower`) and suffix sums from the right
//! (`upper`) answer any cumulative query as one cached sum plus a residual
//! integral over less than one segment, so repeated CDF evaluations cost a
//! bounded amount of adaptive work instead of a full integration.

use std::fmt;

use dd_core::{ensure, errors::Result, is_power_of_two, EngineConfig, Scalar};

use crate::integrals::{AdaptiveGaussKronrod, Integration};

/// Prefix/suffix integral tables of `f` over `[a, b]`.
///
/// The tables are built in the constructor and never change. `f` is expected
/// to be non-negative (a density); residual integrals are clamped into the
/// enclosing segment so that [`lower`](Self::lower) is non-decreasing and
/// [`upper`](Self::upper) non-increasing.
pub struct CdfSegmentCache<T, F> {
    a: T,
    b: T,
    h: T,
    f: F,
    segments: Vec<T>,
    lower: Vec<T>,
    upper: Vec<T>,
    relative_tolerance: T,
    integrator: AdaptiveGaussKronrod<T>,
    require_convergence: bool,
}

impl<T, F> CdfSegmentCache<T, F>
where
    T: Scalar,
    F: Fn(T) -> T,
{
    /// Build the cache with the default [`EngineConfig`].
    pub fn new(a: T, b: T, f: F, samples: usize) -> Result<Self> {
        Self::with_config(a, b, f, samples, &EngineConfig::default())
    }

    /// Build the cache with explicit tolerances and budget.
    ///
    /// # Errors
    /// Returns an error if the bounds are not finite with `a < b`, if
    /// `samples` is not a power of two, or (when `config.require_convergence`
    /// is set) if a segment integral fails to converge.
    pub fn with_config(a: T, b: T, f: F, samples: usize, config: &EngineConfig) -> Result<Self> {
        ensure!(
            a.is_finite() && b.is_finite() && a < b,
            "segment cache needs a finite domain with a < b, got [{a}, {b}]"
        );
        ensure!(
            is_power_of_two(samples),
            "segment cache samples must be a power of two, got {samples}"
        );

        let h = (b - a) / T::count(samples);
        let relative_tolerance = T::real(config.tolerance_ulps) * T::epsilon();
        let integrator =
            AdaptiveGaussKronrod::new(T::zero())?.with_max_evaluations(config.max_evaluations);

        let mut cache = Self {
            a,
            b,
            h,
            f,
            segments: Vec::with_capacity(samples),
            lower: Vec::with_capacity(samples + 1),
            upper: vec![T::zero(); samples + 1],
            relative_tolerance,
            integrator,
            require_convergence: config.require_convergence,
        };

        let half = T::real(0.5);
        let mut left = cache.node(0);
        let mut f_left = (cache.f)(left);
        for i in 0..samples {
            let right = cache.node(i + 1);
            let f_right = (cache.f)(right);
            // Trapezoid estimate of the segment sets its local tolerance.
            let trapezoid = (f_left + f_right).abs() * h * half;
            let segment = cache.residual(left, right, trapezoid * relative_tolerance)?;
            cache.segments.push(segment);
            left = right;
            f_left = f_right;
        }

        let mut acc = T::zero();
        cache.lower.push(acc);
        for &s in &cache.segments {
            acc = acc + s;
            cache.lower.push(acc);
        }
        let mut acc = T::zero();
        for i in (0..samples).rev() {
            acc = acc + cache.segments[i];
            cache.upper[i] = acc;
        }

        Ok(cache)
    }

    /// Number of segments.
    pub fn samples(&self) -> usize {
        self.segments.len()
    }

    /// The cached domain `(a, b)`.
    pub fn domain(&self) -> (T, T) {
        (self.a, self.b)
    }

    /// Integral over the whole domain.
    pub fn total(&self) -> T {
        self.lower[self.samples()]
    }

    /// `lower_table()[i]` is the integral over `[a, a + i h]`.
    pub fn lower_table(&self) -> &[T] {
        &self.lower
    }

    /// `upper_table()[i]` is the integral over `[a + i h, b]`.
    pub fn upper_table(&self) -> &[T] {
        &self.upper
    }

    /// The integrand.
    pub fn integrand(&self) -> &F {
        &self.f
    }

    /// Integral of `f` over `[a, x]`; `0` below the domain, the total above it.
    pub fn lower(&self, x: T) -> Result<T> {
        if x.is_nan() {
            return Ok(x);
        }
        if x <= self.a {
            return Ok(T::zero());
        }
        if x >= self.b {
            return Ok(self.total());
        }

        let index = self.segment_index(x, false);
        let x0 = self.node(index);
        let base = self.lower[index];
        if x == x0 {
            return Ok(base);
        }
        let segment = self.segments[index];
        let eps = (base + segment) * self.relative_tolerance;
        let residual = self.residual(x0, x, eps)?;
        Ok(base + residual.max(T::zero()).min(segment))
    }

    /// Integral of `f` over `[x, b]`; the total below the domain, `0` above it.
    pub fn upper(&self, x: T) -> Result<T> {
        if x.is_nan() {
            return Ok(x);
        }
        if x <= self.a {
            return Ok(self.upper[0]);
        }
        if x >= self.b {
            return Ok(T::zero());
        }

        let index = self.segment_index(x, true);
        let x1 = self.node(index);
        let base = self.upper[index];
        if x == x1 {
            return Ok(base);
        }
        let segment = self.segments[index - 1];
        let eps = (base + segment) * self.relative_tolerance;
        let residual = self.residual(x, x1, eps)?;
        Ok(base + residual.max(T::zero()).min(segment))
    }

    /// Grid point `i`, exact at both ends.
    fn node(&self, i: usize) -> T {
        if i == self.intervals() {
            self.b
        } else {
            self.a + self.h * T::count(i)
        }
    }

    /// Segment count; valid while `segments` is still being filled.
    fn intervals(&self) -> usize {
        self.upper.len() - 1
    }

    /// Boundary at or below `x` (`ceil == false`, in `0..samples`) or at or
    /// above it (`ceil == true`, in `1..=samples`).
    fn segment_index(&self, x: T, ceil: bool) -> usize {
        let n = self.intervals();
        let t = (x - self.a) / self.h;
        let t = if ceil { t.ceil() } else { t.floor() };
        let i = t.to_usize().unwrap_or(0);
        if ceil {
            i.clamp(1, n)
        } else {
            i.min(n - 1)
        }
    }

    fn residual(&self, x0: T, x1: T, eps: T) -> Result<T> {
        let eps = if eps.is_finite() { eps.abs() } else { T::zero() };
        let integration: Integration<T> = self
            .integrator
            .clone()
            .with_tolerance(eps)?
            .integrate(&self.f, x0, x1)?;
        let integration = if self.require_convergence {
            integration.require_converged()?
        } else {
            integration
        };
        Ok(integration.value)
    }
}

impl<T: fmt::Debug, F> fmt::Debug for CdfSegmentCache<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CdfSegmentCache")
            .field("a", &self.a)
            .field("b", &self.b)
            .field("samples", &self.segments.len())
            .finish_non_exhaustive()
    }
}
