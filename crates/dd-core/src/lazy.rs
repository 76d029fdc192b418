//! Compute-once cells for derived data owned by immutable objects.
//!
//! A distribution instance never changes after construction, so its caches
//! (segment tables, quantile tables, tail masses) need no invalidation: they
//! are built on first demand and read thereafter. [`Lazy`] wraps a
//! `std::sync::OnceLock` so the owner stays `Sync`.
//!
//! Concurrent first use may run the initialiser on more than one thread; only
//! one result is published and every reader sees that same value.

use std::fmt;
use std::sync::OnceLock;

use crate::errors::Result;

/// A value computed at most once, on first access.
pub struct Lazy<T> {
    cell: OnceLock<T>,
}

impl<T> Lazy<T> {
    /// Create an empty cell.
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    /// Return the value if it has been computed.
    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    /// Return `true` once the value has been computed.
    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Return the cached value, computing it with `init` if absent.
    ///
    /// A failing initialiser leaves the cell empty so a later call retries.
    pub fn get_or_try_init<F>(&self, init: F) -> Result<&T>
    where
        F: FnOnce() -> Result<T>,
    {
        if let Some(value) = self.cell.get() {
            return Ok(value);
        }
        let value = init()?;
        Ok(self.cell.get_or_init(|| value))
    }
}

impl<T> Default for Lazy<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for Lazy<T> {
    fn clone(&self) -> Self {
        let cell = OnceLock::new();
        if let Some(value) = self.cell.get() {
            let _ = cell.set(value.clone());
        }
        Self { cell }
    }
}

impl<T> fmt::Debug for Lazy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lazy")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use std::cell::Cell;

    #[test]
    fn computes_once() {
        let calls = Cell::new(0);
        let lazy = Lazy::new();
        for _ in 0..3 {
            let v = lazy
                .get_or_try_init(|| {
                    calls.set(calls.get() + 1);
                    Ok(42)
                })
                .unwrap();
            assert_eq!(*v, 42);
        }
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn failed_init_is_retried() {
        let lazy: Lazy<i32> = Lazy::new();
        let err = lazy.get_or_try_init(|| Err(Error::Runtime("boom".into())));
        assert!(err.is_err());
        assert!(!lazy.is_initialized());
        assert_eq!(*lazy.get_or_try_init(|| Ok(7)).unwrap(), 7);
    }

    #[test]
    fn shared_across_threads() {
        let lazy: Lazy<Vec<u64>> = Lazy::new();
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    let v = lazy.get_or_try_init(|| Ok((0..100).collect())).unwrap();
                    assert_eq!(v.len(), 100);
                });
            }
        });
        assert!(lazy.is_initialized());
    }
}
