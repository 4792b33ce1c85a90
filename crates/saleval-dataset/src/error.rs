//! Error types for the saleval-dataset crate.
//!
//! Covers catalog construction (directory scanning) and per-entry loading of
//! images and ground-truth masks.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for dataset operations.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// Error when the ground-truth directory is not found.
    #[error("Ground-truth directory not found: {path}")]
    GroundTruthDirectoryNotFound {
        /// The expected ground-truth directory path.
        path: PathBuf,
    },

    /// Error when the image directory is not found.
    #[error("Image directory not found: {path}")]
    ImageDirectoryNotFound {
        /// The expected image directory path.
        path: PathBuf,
    },

    /// Error when reading a directory fails.
    #[error("Failed to read directory: {path}")]
    DirectoryReadFailed {
        /// The directory path that failed to read.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Error when opening or decoding an image file fails.
    #[error("Failed to open image: {path}")]
    ImageOpenFailed {
        /// The image file path that failed to open.
        path: PathBuf,
        /// The underlying image processing error.
        #[source]
        source: image::ImageError,
    },

    /// Error when an entry index is outside the catalog.
    #[error("Entry index {index} out of range for dataset of {len} entries")]
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// Number of entries in the catalog.
        len: usize,
    },
}

/// A specialized `Result` type for dataset operations.
pub type DatasetResult<T> = Result<T, DatasetError>;
