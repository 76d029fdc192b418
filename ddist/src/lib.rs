//! # ddist
//!
//! Probability distributions over generic (extended-precision) scalars, with
//! a numerical engine that supplies CDFs, quantiles and moments for any
//! distribution that only has a closed-form density.
//!
//! This crate is a **façade** that re-exports the workspace crates.
//!
//! ## Quick start
//!
//! ```toml
//! [dependencies]
//! ddist = "0.1"
//! ```
//!
//! ```rust
//! use ddist::distributions::{ContinuousDistribution, Interval, NumericalDistribution};
//!
//! let laplace = NumericalDistribution::new(
//!     |x: f64| 0.5 * (-x.abs()).exp(),
//!     (f64::NEG_INFINITY, f64::INFINITY),
//!     (-40.0, 40.0),
//! )
//! .unwrap();
//! let median = laplace.quantile(0.5, Interval::Lower).unwrap();
//! assert!(median.abs() < 1e-12);
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Scalar abstraction, errors, settings and lazy cells.
pub use dd_core as core;

/// Quadrature, CDF segment cache, quantile tables and Newton polishing.
pub use dd_math as math;

/// Continuous distributions.
pub use dd_distributions as distributions;

// ── Top-level convenience re-exports ──────────────────────────────────────────

pub use dd_core::{EngineConfig, Error, Result, Scalar, Settings};
pub use dd_distributions::{ContinuousDistribution, Interval, NumericalDistribution};
