#![forbid(unsafe_code)]

//! Logging shims for optional `tracing` support.
//!
//! With the `tracing` feature enabled, this module re-exports the real
//! `tracing` macros. Without it, crate-root no-op macros keep call sites
//! unconditional:
//!
//! ```ignore
//! #[cfg(feature = "tracing")]
//! use crate::logging::warn;
//! #[cfg(not(feature = "tracing"))]
//! use crate::warn;
//! ```

#[cfg(feature = "tracing")]
pub use tracing::{debug, trace, warn};

/// No-op `trace!` when the `tracing` feature is disabled.
#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

/// No-op `debug!` when the `tracing` feature is disabled.
#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {};
}

/// No-op `warn!` when the `tracing` feature is disabled.
#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {};
}
