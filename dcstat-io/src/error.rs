//! I/O error types.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;

/// I/O error types.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HDF5 library error.
    #[cfg(feature = "hdf5")]
    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),

    /// Invalid file format.
    #[error("invalid file format: {0}")]
    InvalidFormat(String),

    /// Input folder missing or not a directory.
    #[error("invalid input folder: {}", .0.display())]
    InvalidInputFolder(PathBuf),

    /// Event file whose extension names no known decoder.
    #[error("unsupported event file: {}", .0.display())]
    UnsupportedEventFile(PathBuf),

    /// Container format not compiled into this build.
    #[error("container format '{0}' is not available in this build")]
    FormatUnavailable(&'static str),

    /// Core library error.
    #[error("core error: {0}")]
    CoreError(#[from] dcstat_core::Error),
}
