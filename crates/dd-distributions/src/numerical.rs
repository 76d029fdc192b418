//! Distributions known only through their density.
//!
//! [`NumericalDistribution`] derives CDF, complementary CDF, both quantiles
//! and the first two moments from a PDF closure. Inside a finite cache window
//! cumulative queries go through a [`CdfSegmentCache`]; outside it they are
//! one-shot adaptive integrals anchored at the window edge. Quantiles are
//! seeded from [`QuantileBuilder`] tables over the window and polished with
//! [`newton_refine`], using the density as derivative.
//!
//! All tables are built together on the first query that needs them.

use std::fmt;
use std::sync::Arc;

use dd_core::{ensure, errors::Result, EngineConfig, Lazy, Scalar, Settings};
use dd_math::{
    newton_refine, AdaptiveGaussKronrod, CdfSegmentCache, Integration, QuantileBuilder,
    QuantileEstimate,
};

use crate::distribution::{is_probability, ContinuousDistribution, Interval};

/// A shareable density function.
pub type Density<T> = Arc<dyn Fn(T) -> T + Send + Sync>;

type CachedDensity<T> = Box<dyn Fn(T) -> T + Send + Sync>;

/// Newton budget multiplier for seeds that start at a window edge.
const TAIL_ITERATION_FACTOR: usize = 8;

#[derive(Debug)]
struct Tables<T> {
    left_tail: T,
    right_tail: T,
    cache: CdfSegmentCache<T, CachedDensity<T>>,
    lower: QuantileBuilder<T>,
    /// Upper-tail values tabulated on the reflected window `[-b, -a]`, where
    /// they are non-decreasing.
    upper: QuantileBuilder<T>,
}

/// A continuous distribution evaluated entirely by the numerical engine.
///
/// ```
/// use dd_distributions::{ContinuousDistribution, Interval, NumericalDistribution};
///
/// let exponential = NumericalDistribution::new(
///     |x: f64| if x < 0.0 { 0.0 } else { (-x).exp() },
///     (0.0, f64::INFINITY),
///     (0.0, 40.0),
/// )
/// .unwrap();
/// let p = exponential.cdf(1.0, Interval::Lower).unwrap();
/// assert!((p - (1.0 - (-1.0_f64).exp())).abs() < 1e-14);
/// ```
#[derive(Clone)]
pub struct NumericalDistribution<T> {
    pdf: Density<T>,
    support: (T, T),
    window: (T, T),
    config: EngineConfig,
    tables: Lazy<Arc<Tables<T>>>,
}

impl<T: Scalar> NumericalDistribution<T> {
    /// Create a distribution from its density, its support `(lower, upper)`
    /// (bounds may be infinite) and a finite cache window inside the support.
    ///
    /// The engine configuration is a snapshot of the global [`Settings`].
    ///
    /// # Errors
    /// Returns an error if the support is empty or NaN, or the window is not
    /// finite, non-empty and contained in the support.
    pub fn new<P>(pdf: P, support: (T, T), window: (T, T)) -> Result<Self>
    where
        P: Fn(T) -> T + Send + Sync + 'static,
    {
        Self::from_density(Arc::new(pdf), support, window)
    }

    /// Like [`new`](Self::new) for an already shared density.
    pub fn from_density(pdf: Density<T>, support: (T, T), window: (T, T)) -> Result<Self> {
        let (lo, hi) = support;
        let (a, b) = window;
        ensure!(lo < hi, "support must be a non-empty interval, got ({lo}, {hi})");
        ensure!(
            a.is_finite() && b.is_finite() && a < b,
            "cache window must be finite and non-empty, got [{a}, {b}]"
        );
        ensure!(
            lo <= a && b <= hi,
            "cache window [{a}, {b}] must lie inside the support ({lo}, {hi})"
        );
        Ok(Self {
            pdf,
            support,
            window,
            config: Settings::instance().config(),
            tables: Lazy::new(),
        })
    }

    /// Use an explicit engine configuration. Any cached tables are dropped.
    pub fn with_config(mut self, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        self.config = config;
        self.tables = Lazy::new();
        Ok(self)
    }

    /// The engine configuration in effect.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The cache window `(a, b)`.
    pub fn window(&self) -> (T, T) {
        self.window
    }

    /// The density.
    pub fn density(&self) -> &Density<T> {
        &self.pdf
    }

    /// `true` once the segment cache and quantile tables exist.
    pub fn is_cached(&self) -> bool {
        self.tables.is_initialized()
    }

    /// Total probability mass, left tail plus window plus right tail.
    pub fn total_mass(&self) -> Result<T> {
        let t = self.tables()?;
        Ok(t.left_tail + t.cache.total() + t.right_tail)
    }

    fn tables(&self) -> Result<&Tables<T>> {
        let tables = self.tables.get_or_try_init(|| self.build().map(Arc::new))?;
        Ok(tables.as_ref())
    }

    fn build(&self) -> Result<Tables<T>> {
        let (lo, hi) = self.support;
        let (a, b) = self.window;
        let left_tail = self.integral(lo, a)?;
        let right_tail = self.integral(b, hi)?;

        let pdf = Arc::clone(&self.pdf);
        let density: CachedDensity<T> = Box::new(move |x| pdf(x));
        let cache = CdfSegmentCache::with_config(
            a,
            b,
            density,
            self.config.segment_samples,
            &self.config,
        )?;

        let n = self.config.quantile_samples;
        let h = (b - a) / T::count(n);
        let node = |i: usize| if i == n { b } else { a + h * T::count(i) };
        // Several quantile nodes may share one segment; their residuals are
        // independent integrals and can step back by rounding.
        let lower_table = running_max(
            (0..=n)
                .map(|i| Ok(left_tail + cache.lower(node(i))?))
                .collect::<Result<Vec<T>>>()?,
        );
        let upper_table = running_max(
            (0..=n)
                .map(|j| Ok(right_tail + cache.upper(node(n - j))?))
                .collect::<Result<Vec<T>>>()?,
        );

        Ok(Tables {
            left_tail,
            right_tail,
            lower: QuantileBuilder::from_table(a, b, lower_table)?,
            upper: QuantileBuilder::from_table(-b, -a, upper_table)?,
            cache,
        })
    }

    /// One-shot integral of the density over `[x0, x1]`, to the rounding
    /// floor or the evaluation budget.
    fn integral(&self, x0: T, x1: T) -> Result<T> {
        if x0 == x1 {
            return Ok(T::zero());
        }
        let integration = self.integrate(&*self.pdf, x0, x1)?;
        let integration = if self.config.require_convergence {
            integration.require_converged()?
        } else {
            integration
        };
        Ok(integration.value)
    }

    fn integrate<F>(&self, f: F, x0: T, x1: T) -> Result<Integration<T>>
    where
        F: Fn(T) -> T,
    {
        AdaptiveGaussKronrod::new(T::zero())?
            .with_max_evaluations(self.config.max_evaluations)
            .integrate(f, x0, x1)
    }

    fn lower_cdf(&self, x: T) -> Result<T> {
        let (lo, hi) = self.support;
        let (a, b) = self.window;
        if x.is_nan() {
            return Ok(x);
        }
        if x <= lo {
            return Ok(T::zero());
        }
        if x < a {
            return self.integral(lo, x);
        }
        let t = self.tables()?;
        if x >= hi {
            Ok(t.left_tail + t.cache.total() + t.right_tail)
        } else if x <= b {
            Ok(t.left_tail + t.cache.lower(x)?)
        } else {
            Ok(t.left_tail + t.cache.total() + self.integral(b, x)?)
        }
    }

    fn upper_cdf(&self, x: T) -> Result<T> {
        let (lo, hi) = self.support;
        let (a, b) = self.window;
        if x.is_nan() {
            return Ok(x);
        }
        if x >= hi {
            return Ok(T::zero());
        }
        if x > b {
            return self.integral(x, hi);
        }
        let t = self.tables()?;
        let window_mass = t.cache.upper_table()[0];
        if x <= lo {
            Ok(t.left_tail + window_mass + t.right_tail)
        } else if x >= a {
            Ok(t.cache.upper(x)? + t.right_tail)
        } else {
            Ok(window_mass + t.right_tail + self.integral(x, a)?)
        }
    }

    /// Polish a table seed against `cumulative`, whose slope is
    /// `sign * pdf`. A saturated seed starts at a window edge and walks into
    /// a tail, so Newton runs on `ln cumulative` there.
    fn polish<C>(&self, cumulative: C, sign: T, p: T, seed: QuantileEstimate<T>) -> Result<T>
    where
        C: Fn(T) -> Result<T>,
    {
        let (lo, hi) = self.support;
        let saturated = seed.is_saturated();
        let seed = QuantileEstimate {
            x0: seed.x0.max(lo),
            x1: seed.x1.min(hi),
            ..seed
        };
        let pdf = &self.pdf;
        if saturated {
            let log_p = p.ln();
            newton_refine(
                |x| Ok(cumulative(x)?.ln() - log_p),
                |x| sign * pdf(x) / cumulative(x).unwrap_or_else(|_| T::nan()),
                seed,
                self.config.newton_iterations * TAIL_ITERATION_FACTOR,
            )
        } else {
            newton_refine(
                |x| Ok(cumulative(x)? - p),
                |x| sign * pdf(x),
                seed,
                self.config.newton_iterations,
            )
        }
    }

    /// Integral of `g` over the support, split at the window edges; `None`
    /// unless every piece converged to a finite value. Each tail piece must
    /// converge on its own, so a divergent moment cannot cancel across tails.
    fn support_integral<G>(&self, g: G) -> Option<T>
    where
        G: Fn(T) -> T,
    {
        let (lo, hi) = self.support;
        let (a, b) = self.window;
        let mut total = T::zero();
        for (x0, x1) in [(lo, a), (a, b), (b, hi)] {
            if x0 == x1 {
                continue;
            }
            let piece = self.integrate(&g, x0, x1).ok()?;
            if !piece.is_converged() {
                return None;
            }
            total = total + piece.value;
        }
        Some(total).filter(|v| v.is_finite())
    }
}

impl<T: Scalar> ContinuousDistribution<T> for NumericalDistribution<T> {
    fn pdf(&self, x: T) -> T {
        (self.pdf)(x)
    }

    fn cdf(&self, x: T, interval: Interval) -> Result<T> {
        match interval {
            Interval::Lower => self.lower_cdf(x),
            Interval::Upper => self.upper_cdf(x),
        }
    }

    fn quantile(&self, p: T, interval: Interval) -> Result<T> {
        if !is_probability(p) {
            return Ok(T::nan());
        }
        let (lo, hi) = self.support;
        let (first, last) = match interval {
            Interval::Lower => (lo, hi),
            Interval::Upper => (hi, lo),
        };
        if p == T::zero() {
            return Ok(first);
        }
        if p == T::one() {
            return Ok(last);
        }

        let t = self.tables()?;
        match interval {
            Interval::Lower => self.polish(
                |x| self.lower_cdf(x),
                T::one(),
                p,
                t.lower.estimate(p),
            ),
            Interval::Upper => self.polish(
                |x| self.upper_cdf(x),
                -T::one(),
                p,
                t.upper.estimate(p).reflected(),
            ),
        }
    }

    fn support(&self) -> (T, T) {
        self.support
    }

    fn try_mean(&self) -> Option<T> {
        let pdf = &self.pdf;
        self.support_integral(|x| x * pdf(x))
    }

    fn try_variance(&self) -> Option<T> {
        let mean = self.try_mean()?;
        let pdf = &self.pdf;
        self.support_integral(|x| {
            let d = x - mean;
            d * d * pdf(x)
        })
    }
}

/// Replace each entry by the largest value seen so far.
fn running_max<T: Scalar>(mut values: Vec<T>) -> Vec<T> {
    let mut peak = T::neg_infinity();
    for v in values.iter_mut() {
        peak = peak.max(*v);
        *v = peak;
    }
    values
}

impl<T: fmt::Debug> fmt::Debug for NumericalDistribution<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NumericalDistribution")
            .field("support", &self.support)
            .field("window", &self.window)
            .field("config", &self.config)
            .field("cached", &self.tables.is_initialized())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use dd_core::Error;

    fn exponential() -> NumericalDistribution<f64> {
        NumericalDistribution::new(
            |x: f64| if x < 0.0 { 0.0 } else { (-x).exp() },
            (0.0, f64::INFINITY),
            (0.0, 32.0),
        )
        .unwrap()
        .with_config(EngineConfig {
            segment_samples: 64,
            quantile_samples: 64,
            ..EngineConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn tables_are_built_on_first_use() {
        let d = exponential();
        assert!(!d.is_cached());
        assert_eq!(d.cdf(-1.0, Interval::Lower).unwrap(), 0.0);
        assert!(!d.is_cached());
        d.cdf(1.0, Interval::Lower).unwrap();
        assert!(d.is_cached());
        let copy = d.clone();
        assert!(copy.is_cached());
    }

    #[test]
    fn cdf_inside_and_beyond_the_window() {
        let d = exponential();
        for x in [0.5_f64, 3.0, 31.9, 33.0, 45.0] {
            let upper = (-x).exp();
            assert_abs_diff_eq!(d.cdf(x, Interval::Lower).unwrap(), 1.0 - upper, epsilon = 1e-14);
            let got = d.cdf(x, Interval::Upper).unwrap();
            assert!((got - upper).abs() <= 1e-12 * upper, "x={x}: {got} vs {upper}");
        }
        assert_eq!(d.cdf(f64::INFINITY, Interval::Upper).unwrap(), 0.0);
        assert!(d.cdf(f64::NAN, Interval::Lower).unwrap().is_nan());
        assert_abs_diff_eq!(d.total_mass().unwrap(), 1.0, epsilon = 1e-14);
    }

    #[test]
    fn quantiles_invert_both_tails() {
        let d = exponential();
        for p in [1e-10, 0.05, 0.5, 0.95] {
            let x = d.quantile(p, Interval::Lower).unwrap();
            assert_abs_diff_eq!(x, -(-p).ln_1p(), epsilon = 1e-13);
        }
        for q in [1e-20, 1e-5, 0.5] {
            let x = d.quantile(q, Interval::Upper).unwrap();
            assert_abs_diff_eq!(x, -q.ln(), epsilon = 1e-11);
        }
        assert_eq!(d.quantile(0.0, Interval::Lower).unwrap(), 0.0);
        assert_eq!(d.quantile(0.0, Interval::Upper).unwrap(), f64::INFINITY);
        assert!(d.quantile(1.5, Interval::Lower).unwrap().is_nan());
        assert!(d.quantile(f64::NAN, Interval::Upper).unwrap().is_nan());
    }

    #[test]
    fn moments_by_integration() {
        let d = exponential();
        assert_abs_diff_eq!(d.try_mean().unwrap(), 1.0, epsilon = 1e-13);
        assert_abs_diff_eq!(d.try_variance().unwrap(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(d.try_median().unwrap(), std::f64::consts::LN_2, epsilon = 1e-14);
    }

    #[test]
    fn heavy_tails_have_no_mean() {
        let cauchy = NumericalDistribution::new(
            |x: f64| 1.0 / (std::f64::consts::PI * (1.0 + x * x)),
            (f64::NEG_INFINITY, f64::INFINITY),
            (-50.0, 50.0),
        )
        .unwrap()
        .with_config(EngineConfig {
            segment_samples: 64,
            quantile_samples: 64,
            max_evaluations: 5_000,
            ..EngineConfig::default()
        })
        .unwrap();
        assert_eq!(cauchy.try_mean(), None);
        assert_eq!(cauchy.try_variance(), None);
    }

    #[test]
    fn enforced_convergence_reports_the_budget() {
        let d = NumericalDistribution::new(
            |x: f64| 0.5 * (-(x - 0.3).abs()).exp(),
            (f64::NEG_INFINITY, f64::INFINITY),
            (-4.0, 4.0),
        )
        .unwrap()
        .with_config(EngineConfig {
            segment_samples: 8,
            quantile_samples: 8,
            max_evaluations: 63,
            require_convergence: true,
            ..EngineConfig::default()
        })
        .unwrap();
        assert!(matches!(
            d.cdf(0.5, Interval::Lower),
            Err(Error::NotConverged { .. })
        ));
    }

    #[test]
    fn quantile_grid_finer_than_segments() {
        let phi = |x: f64| (-0.5 * x * x).exp() / (2.0 * std::f64::consts::PI).sqrt();
        for (segments, quantiles) in [(1, 1024), (2, 4096), (4, 1024)] {
            let d = NumericalDistribution::new(phi, (f64::NEG_INFINITY, f64::INFINITY), (-12.0, 12.0))
                .unwrap()
                .with_config(EngineConfig {
                    segment_samples: segments,
                    quantile_samples: quantiles,
                    ..EngineConfig::default()
                })
                .unwrap();
            assert_abs_diff_eq!((d.density())(0.0), phi(0.0));
            let p = d.cdf(0.3, Interval::Lower).unwrap();
            assert_abs_diff_eq!(p, 0.617_911_422_188_952_6, epsilon = 1e-14);
            assert_abs_diff_eq!(d.quantile(p, Interval::Lower).unwrap(), 0.3, epsilon = 1e-12);
            assert_abs_diff_eq!(d.quantile(1.0 - p, Interval::Upper).unwrap(), 0.3, epsilon = 1e-12);
        }
    }

    #[test]
    fn running_max_flattens_dips() {
        assert_eq!(running_max(vec![0.0, 0.5, 0.4, 0.7, 0.7, 0.6]), vec![0.0, 0.5, 0.5, 0.7, 0.7, 0.7]);
        assert!(running_max(Vec::<f64>::new()).is_empty());
    }

    #[test]
    fn invalid_windows_are_rejected() {
        let pdf = |x: f64| (-x).exp();
        let support = (0.0, f64::INFINITY);
        assert!(NumericalDistribution::new(pdf, support, (-1.0, 1.0)).is_err());
        assert!(NumericalDistribution::new(pdf, support, (0.0, f64::INFINITY)).is_err());
        assert!(NumericalDistribution::new(pdf, support, (2.0, 1.0)).is_err());
        assert!(NumericalDistribution::new(pdf, (1.0, 1.0), (1.0, 1.0)).is_err());
        assert!(NumericalDistribution::new(pdf, (f64::NAN, 1.0), (0.0, 1.0)).is_err());
    }
}
