//! # dd-distributions
//!
//! Continuous distributions on top of the numerical engine. A distribution
//! that only knows its density gets CDF, quantiles and moments from
//! [`NumericalDistribution`]; closed-form distributions implement the same
//! [`ContinuousDistribution`] trait and double as references for the engine.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Modules ───────────────────────────────────────────────────────────────────

/// Location-scale algebra.
pub mod affine;

/// Cauchy distribution.
pub mod cauchy;

/// The shared distribution trait.
pub mod distribution;

/// Logistic distribution.
pub mod logistic;

/// Normal distribution.
pub mod normal;

/// Density-only distributions.
pub mod numerical;

// ── Convenience re-exports ────────────────────────────────────────────────────

pub use affine::AffineTransform;
pub use cauchy::CauchyDistribution;
pub use distribution::{ContinuousDistribution, Interval};
pub use logistic::LogisticDistribution;
pub use normal::NormalDistribution;
pub use numerical::{Density, NumericalDistribution};
