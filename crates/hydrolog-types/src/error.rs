//! Boundary validation errors for hydrolog-types.

use thiserror::Error;

/// Errors raised when external input fails domain validation.
///
/// This error type is raised at the boundaries only (API payloads, config,
/// wire data); the classification engine itself never raises.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ValidationError {
    /// A ppm conversion scale outside the recognized set.
    ///
    /// Unrecognized scales are rejected, never silently coerced to a
    /// default, since the scale changes every displayed concentration.
    #[error("Unsupported ppm scale: {0:?} (expected \"500\" or \"700\")")]
    UnsupportedPpmScale(String),
}
