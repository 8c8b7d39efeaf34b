//! Error types for dcstat-core.

use thiserror::Error;

/// Result type alias for dcstat operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types.
#[derive(Error, Debug)]
pub enum Error {
    /// Histogram axis with no bins or an empty/non-finite range.
    #[error("invalid axis: {bins} bins over [{min}, {max})")]
    InvalidAxis { bins: usize, min: f64, max: f64 },
}
