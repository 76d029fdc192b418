//! Error types for ddist.
//!
//! A single `thiserror`-derived enum covers every failure the engine can
//! report. Non-convergence is normally *not* an error (the best-effort value
//! and its error estimate are returned); [`Error::NotConverged`] only appears
//! when a caller asked for convergence to be enforced.
//!
//! The `ensure!`, `ensure_post!` and `fail!` macros defined here are the
//! preferred way to raise errors.

use thiserror::Error;

/// The top-level error type used throughout ddist.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// General runtime error (raised by [`fail!`]).
    #[error("{0}")]
    Runtime(String),

    /// Invalid argument: bad sample counts, malformed interval bounds,
    /// invalid distribution parameters (raised by [`ensure!`]).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Postcondition violated (raised by [`ensure_post!`]).
    #[error("postcondition not satisfied: {0}")]
    Postcondition(String),

    /// An adaptive integral exhausted its evaluation budget above tolerance
    /// while convergence was required.
    #[error(
        "integration did not converge after {evaluations} evaluations \
         (error {error:e}, tolerance {tolerance:e})"
    )]
    NotConverged {
        /// Number of integrand evaluations spent.
        evaluations: usize,
        /// Reported error estimate.
        error: f64,
        /// Requested tolerance.
        tolerance: f64,
    },
}

/// Shorthand `Result` type used throughout ddist.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Returns `Err(Error::InvalidArgument(...))` if `$cond` is false.
///
/// # Example
/// ```
/// use dd_core::{ensure, errors::Error};
/// fn positive(x: f64) -> dd_core::errors::Result<f64> {
///     ensure!(x > 0.0, "x must be positive, got {x}");
///     Ok(x)
/// }
/// assert!(positive(1.0).is_ok());
/// assert!(matches!(positive(-1.0), Err(Error::InvalidArgument(_))));
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $($msg:tt)*) => {
        if !$cond {
            return Err($crate::errors::Error::InvalidArgument(
                format!($($msg)*)
            ));
        }
    };
}

/// Returns `Err(Error::Postcondition(...))` if `$cond` is false.
///
/// # Example
/// ```
/// use dd_core::ensure_post;
/// fn compute(x: f64) -> dd_core::errors::Result<f64> {
///     let result = x * 2.0;
///     ensure_post!(result > 0.0, "result must be positive, got {result}");
///     Ok(result)
/// }
/// assert!(compute(1.0).is_ok());
/// assert!(compute(-1.0).is_err());
/// ```
#[macro_export]
macro_rules! ensure_post {
    ($cond:expr, $($msg:tt)*) => {
        if !$cond {
            return Err($crate::errors::Error::Postcondition(
                format!($($msg)*)
            ));
        }
    };
}

/// Returns `Err(Error::Runtime(...))` immediately.
///
/// # Example
/// ```
/// use dd_core::fail;
/// fn always_err() -> dd_core::errors::Result<()> {
///     fail!("something went wrong");
/// }
/// assert!(always_err().is_err());
/// ```
#[macro_export]
macro_rules! fail {
    ($($msg:tt)*) => {
        return Err($crate::errors::Error::Runtime(format!($($msg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_converged_message() {
        let e = Error::NotConverged {
            evaluations: 126,
            error: 1.5e-3,
            tolerance: 1e-10,
        };
        let msg = e.to_string();
        assert!(msg.contains("126"), "{msg}");
        assert!(msg.contains("1.5e-3"), "{msg}");
    }

    #[test]
    fn ensure_maps_to_invalid_argument() {
        fn check(n: usize) -> Result<usize> {
            ensure!(n > 1, "need more than one sample, got {n}");
            Ok(n)
        }
        assert_eq!(check(2), Ok(2));
        assert_eq!(
            check(0),
            Err(Error::InvalidArgument(
                "need more than one sample, got 0".into()
            ))
        );
    }
}
