//! Normal distribution evaluated through the numerical engine.
//!
//! Only the density is closed form here; CDF and quantiles come from a
//! [`NumericalDistribution`] over `mu ± 16 sigma`. Beyond the window the tail
//! integrals take over, so the whole real line is covered.

use dd_core::{errors::Result, EngineConfig, Scalar};

use crate::affine::{check_factor, check_location_scale, check_shift, AffineTransform};
use crate::distribution::{ContinuousDistribution, Interval};
use crate::numerical::NumericalDistribution;

/// Half-width of the cache window, in standard deviations.
const WINDOW_SIGMAS: f64 = 16.0;

/// Normal distribution with mean `mu` and standard deviation `sigma`.
#[derive(Debug, Clone)]
pub struct NormalDistribution<T> {
    mu: T,
    sigma: T,
    engine: NumericalDistribution<T>,
}

fn density<T: Scalar>(mu: T, sigma: T, x: T) -> T {
    let z = (x - mu) / sigma;
    (-(z * z) * T::real(0.5)).exp() / (sigma * (T::real(2.0) * T::PI()).sqrt())
}

impl<T: Scalar> NormalDistribution<T> {
    /// Create the distribution with the global engine configuration.
    pub fn new(mu: T, sigma: T) -> Result<Self> {
        check_location_scale(mu, sigma)?;
        let half_width = sigma * T::real(WINDOW_SIGMAS);
        let engine = NumericalDistribution::new(
            move |x| density(mu, sigma, x),
            (T::neg_infinity(), T::infinity()),
            (mu - half_width, mu + half_width),
        )?;
        Ok(Self { mu, sigma, engine })
    }

    /// Use an explicit engine configuration.
    pub fn with_config(self, config: EngineConfig) -> Result<Self> {
        let Self { mu, sigma, engine } = self;
        Ok(Self {
            mu,
            sigma,
            engine: engine.with_config(config)?,
        })
    }

    /// Mean.
    pub fn mu(&self) -> T {
        self.mu
    }

    /// Standard deviation.
    pub fn sigma(&self) -> T {
        self.sigma
    }

    /// The engine answering CDF and quantile queries.
    pub fn engine(&self) -> &NumericalDistribution<T> {
        &self.engine
    }

    fn with_parameters(&self, mu: T, sigma: T) -> Result<Self> {
        Self::new(mu, sigma)?.with_config(*self.engine.config())
    }
}

impl<T: Scalar> ContinuousDistribution<T> for NormalDistribution<T> {
    fn pdf(&self, x: T) -> T {
        density(self.mu, self.sigma, x)
    }

    fn cdf(&self, x: T, interval: Interval) -> Result<T> {
        self.engine.cdf(x, interval)
    }

    fn quantile(&self, p: T, interval: Interval) -> Result<T> {
        self.engine.quantile(p, interval)
    }

    fn support(&self) -> (T, T) {
        (T::neg_infinity(), T::infinity())
    }

    fn try_mean(&self) -> Option<T> {
        Some(self.mu)
    }

    fn try_variance(&self) -> Option<T> {
        Some(self.sigma * self.sigma)
    }

    fn try_median(&self) -> Option<T> {
        Some(self.mu)
    }
}

impl<T: Scalar> AffineTransform<T> for NormalDistribution<T> {
    fn shift(&self, s: T) -> Result<Self> {
        check_shift(s)?;
        self.with_parameters(self.mu + s, self.sigma)
    }

    fn scale(&self, k: T) -> Result<Self> {
        check_factor(k)?;
        self.with_parameters(self.mu * k, self.sigma * k.abs())
    }
}
