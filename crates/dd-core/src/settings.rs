//! Engine-wide numerical settings.
//!
//! [`Settings`] holds the default [`EngineConfig`] used by distributions that
//! are not given an explicit one. It is a process-wide singleton accessed via
//! a `std::sync::OnceLock`; the configuration sits behind a `Mutex` so it can
//! be changed from any thread.
//!
//! Distributions copy the configuration when they are constructed: changing
//! the global settings never affects an instance that already exists.

use std::sync::{Mutex, MutexGuard, OnceLock};

use crate::{ensure, errors::Result, scalar::is_power_of_two, Real};

/// Tunables of the numerical fallback engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Number of equal-width segments in a CDF segment cache (power of two).
    pub segment_samples: usize,
    /// Number of grid intervals in a quantile table (power of two).
    pub quantile_samples: usize,
    /// Integrand evaluation budget per adaptive integral; negative means
    /// unbounded.
    pub max_evaluations: i64,
    /// Relative tolerances are `tolerance_ulps * epsilon` of the scalar type.
    pub tolerance_ulps: Real,
    /// Newton polishing steps applied after a table-seeded quantile estimate.
    pub newton_iterations: usize,
    /// Report [`Error::NotConverged`](crate::Error::NotConverged) instead of
    /// silently returning a best-effort integral.
    pub require_convergence: bool,
}

impl EngineConfig {
    /// Check the invariants every consumer relies on.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            is_power_of_two(self.segment_samples),
            "segment_samples must be a power of two, got {}",
            self.segment_samples
        );
        ensure!(
            is_power_of_two(self.quantile_samples) && self.quantile_samples >= 2,
            "quantile_samples must be a power of two >= 2, got {}",
            self.quantile_samples
        );
        ensure!(
            self.tolerance_ulps.is_finite() && self.tolerance_ulps > 0.0,
            "tolerance_ulps must be positive, got {}",
            self.tolerance_ulps
        );
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            segment_samples: 1024,
            quantile_samples: 1024,
            max_evaluations: 1 << 16,
            tolerance_ulps: 64.0,
            newton_iterations: 8,
            require_convergence: false,
        }
    }
}

/// Process-wide settings used by the ddist library.
pub struct Settings {
    config: Mutex<EngineConfig>,
}

static INSTANCE: OnceLock<Settings> = OnceLock::new();

impl Settings {
    /// Return a reference to the global singleton.
    pub fn instance() -> &'static Settings {
        INSTANCE.get_or_init(|| Settings {
            config: Mutex::new(EngineConfig::default()),
        })
    }

    fn lock(&self) -> MutexGuard<'_, EngineConfig> {
        // The guarded value is plain data, a poisoned lock is still usable.
        self.config.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Return the current default configuration.
    pub fn config(&self) -> EngineConfig {
        *self.lock()
    }

    /// Replace the default configuration after validating it.
    pub fn set_config(&self, config: EngineConfig) -> Result<()> {
        config.validate()?;
        *self.lock() = config;
        Ok(())
    }

    /// Restore the built-in defaults.
    pub fn reset(&self) {
        *self.lock() = EngineConfig::default();
    }
}

/// Installs a configuration for the lifetime of the guard and restores the
/// previous one on drop.
///
/// # Example
/// ```
/// use dd_core::settings::{EngineConfig, ScopedConfig, Settings};
///
/// let before = Settings::instance().config();
/// {
///     let _guard = ScopedConfig::new(EngineConfig {
///         newton_iterations: 16,
///         ..before
///     })
///     .unwrap();
///     assert_eq!(Settings::instance().config().newton_iterations, 16);
/// }
/// assert_eq!(Settings::instance().config(), before);
/// ```
pub struct ScopedConfig {
    previous: EngineConfig,
}

impl ScopedConfig {
    /// Install `config` as the global default.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let settings = Settings::instance();
        let previous = settings.config();
        settings.set_config(config)?;
        Ok(Self { previous })
    }
}

impl Drop for ScopedConfig {
    fn drop(&mut self) {
        *Settings::instance().lock() = self.previous;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_non_power_of_two_samples() {
        let cfg = EngineConfig {
            segment_samples: 1000,
            ..EngineConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = EngineConfig {
            quantile_samples: 1,
            ..EngineConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_invalid_global_config() {
        let bad = EngineConfig {
            tolerance_ulps: 0.0,
            ..EngineConfig::default()
        };
        assert!(Settings::instance().set_config(bad).is_err());
        assert!(ScopedConfig::new(bad).is_err());
    }
}
