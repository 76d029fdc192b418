//! Numerical integration.
//!
//! Provides Gauss–Kronrod rules of several orders computed in the scalar's
//! own precision, and an adaptive driver that handles finite and infinite
//! intervals.

pub mod adaptive;
pub mod gauss_kronrod;

pub use adaptive::{adaptive_integrate, AdaptiveGaussKronrod};
pub use gauss_kronrod::{GaussKronrodOrder, GaussKronrodRule};

use dd_core::{Error, Result, Scalar};

/// Outcome of an adaptive integration.
///
/// `error` is the sum of the local `|Kronrod - Gauss|` estimates of the
/// accepted intervals. It is advisory: on budget exhaustion it can exceed
/// `tolerance`, and [`is_converged`](Self::is_converged) reports that.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Integration<T> {
    /// Estimated integral.
    pub value: T,
    /// Estimated absolute error.
    pub error: T,
    /// Number of integrand evaluations spent.
    pub evaluations: usize,
    /// Requested absolute tolerance.
    pub tolerance: T,
    /// `true` if some interval was accepted only because the evaluation
    /// budget ran out.
    pub budget_exhausted: bool,
}

impl<T: Scalar> Integration<T> {
    /// `true` if every interval met its tolerance (or the rounding floor).
    pub fn is_converged(&self) -> bool {
        !self.budget_exhausted && !self.error.is_nan()
    }

    /// Turn an unconverged result into [`Error::NotConverged`].
    pub fn require_converged(self) -> Result<Self> {
        if self.is_converged() {
            Ok(self)
        } else {
            Err(Error::NotConverged {
                evaluations: self.evaluations,
                error: self.error.to_real(),
                tolerance: self.tolerance.to_real(),
            })
        }
    }

    pub(crate) fn negated(self) -> Self {
        Self {
            value: -self.value,
            ..self
        }
    }
}
