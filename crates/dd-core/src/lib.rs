//! # dd-core
//!
//! Core types, traits, and error definitions for ddist.
//!
//! This crate provides the foundational building blocks shared across the
//! other crates in the workspace – the [`Scalar`] abstraction, the error
//! hierarchy, the compute-once [`Lazy`] cell, and the engine [`Settings`].

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Public modules ───────────────────────────────────────────────────────────

/// Error types and the `ensure!` / `fail!` / `ensure_post!` macros.
pub mod errors;

/// Compute-once cells for lazily built caches.
pub mod lazy;

/// The generic real scalar.
pub mod scalar;

/// Process-wide engine configuration.
pub mod settings;

// ── Primitive type aliases ────────────────────────────────────────────────────

/// Plain floating-point type used for configuration values and diagnostics.
pub type Real = f64;

// ── Re-exports for convenience ────────────────────────────────────────────────

pub use errors::{Error, Result};
pub use lazy::Lazy;
pub use scalar::{is_power_of_two, Scalar};
pub use settings::{EngineConfig, ScopedConfig, Settings};
