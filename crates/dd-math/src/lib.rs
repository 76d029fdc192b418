//! # dd-math
//!
//! The numerical fallback engine: Gauss–Kronrod quadrature with an adaptive
//! driver, a segment-cached cumulative integral, table-seeded inversion of
//! monotone functions and Newton polishing. Everything is generic over
//! [`dd_core::Scalar`].

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Modules ───────────────────────────────────────────────────────────────────

/// Cached prefix/suffix integrals on a finite domain.
pub mod cdf_segment_cache;

/// Floating-point comparison utilities.
pub mod comparison;

/// Numerical integration.
pub mod integrals;

/// Interpolation tables for inverting monotone functions.
pub mod quantile_builder;

/// 1D root polishing.
pub mod solvers1d;

// ── Convenience re-exports ────────────────────────────────────────────────────

pub use cdf_segment_cache::CdfSegmentCache;
pub use comparison::{close_enough, relative_error};
pub use integrals::{
    adaptive_integrate, AdaptiveGaussKronrod, GaussKronrodOrder, GaussKronrodRule, Integration,
};
pub use quantile_builder::{QuantileBuilder, QuantileEstimate};
pub use solvers1d::newton_refine;
