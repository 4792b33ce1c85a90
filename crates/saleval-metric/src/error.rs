//! Error types for saliency evaluation.

use saleval_dataset::DatasetError;
use thiserror::Error;

use crate::predictor::PredictorError;

/// The error type for evaluation operations.
///
/// Per-entry variants carry the entry name so a failed run points at the
/// offending file.
#[derive(Error, Debug)]
pub enum MetricError {
    /// Error when an image or ground-truth mask cannot be loaded.
    #[error("Failed to load entry '{name}'")]
    Load {
        /// Name of the dataset entry.
        name: String,
        /// The underlying dataset error.
        #[source]
        source: DatasetError,
    },

    /// Error when the saliency predictor fails on an entry.
    #[error("Saliency prediction failed for entry '{name}'")]
    Prediction {
        /// Name of the dataset entry.
        name: String,
        /// The underlying predictor error.
        #[source]
        source: PredictorError,
    },

    /// Error when the saliency map and ground truth shapes disagree.
    #[error("Shape mismatch for entry '{name}': expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        /// Name of the dataset entry.
        name: String,
        /// Ground-truth shape `[height, width]`.
        expected: [usize; 2],
        /// Saliency map shape `[height, width]`.
        actual: [usize; 2],
    },

    /// Error when pixel buffers handed to the PR accumulator differ in length.
    #[error("Pixel count mismatch: saliency map has {saliency}, ground truth has {ground_truth}")]
    LengthMismatch {
        /// Number of saliency pixels.
        saliency: usize,
        /// Number of ground-truth pixels.
        ground_truth: usize,
    },

    /// Error when no pixel ever exceeds the adaptive threshold, e.g. an
    /// all-zero saliency map.
    #[error("Degenerate saliency map for entry '{name}': no pixel above threshold after {iterations} shrink steps")]
    DegenerateInput {
        /// Name of the dataset entry.
        name: String,
        /// Number of threshold shrink steps attempted.
        iterations: usize,
    },

    /// Error when normalizing statistics that aggregated zero images.
    #[error("No images were evaluated")]
    EmptyDataset,

    /// Error when tensor data cannot be read back to the host.
    #[error("Failed to convert tensor data: {reason}")]
    TensorConversion {
        /// Description of the conversion failure.
        reason: String,
    },

    /// Error raised while evaluating an entry that does not name it itself.
    #[error("Failed to evaluate entry '{name}'")]
    Entry {
        /// Name of the dataset entry.
        name: String,
        /// The underlying evaluation error.
        #[source]
        source: Box<MetricError>,
    },

    /// Error when the worker thread pool cannot be created.
    #[error("Failed to build worker thread pool: {reason}")]
    ThreadPool {
        /// Description of the failure.
        reason: String,
    },
}

impl MetricError {
    /// Name of the dataset entry the error refers to, if any.
    pub fn entry_name(&self) -> Option<&str> {
        match self {
            Self::Load { name, .. }
            | Self::Prediction { name, .. }
            | Self::DimensionMismatch { name, .. }
            | Self::DegenerateInput { name, .. }
            | Self::Entry { name, .. } => Some(name),
            Self::LengthMismatch { .. }
            | Self::EmptyDataset
            | Self::TensorConversion { .. }
            | Self::ThreadPool { .. } => None,
        }
    }

    /// Attaches `name` to an error that does not carry an entry name yet.
    pub fn with_entry(self, name: &str) -> Self {
        if self.entry_name().is_some() {
            return self;
        }
        Self::Entry {
            name: name.to_owned(),
            source: Box::new(self),
        }
    }
}

/// A specialized `Result` type for evaluation operations.
pub type MetricResult<T> = Result<T, MetricError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_entry_names_anonymous_errors() {
        let err = MetricError::LengthMismatch {
            saliency: 4,
            ground_truth: 6,
        }
        .with_entry("cat");

        assert_eq!(err.entry_name(), Some("cat"));
        assert!(matches!(
            err,
            MetricError::Entry { ref source, .. }
                if matches!(**source, MetricError::LengthMismatch { saliency: 4, ground_truth: 6 })
        ));
    }

    #[test]
    fn with_entry_keeps_existing_name() {
        let err = MetricError::DegenerateInput {
            name: "blank".to_owned(),
            iterations: 64,
        }
        .with_entry("other");
        assert!(matches!(err, MetricError::DegenerateInput { ref name, .. } if name == "blank"));
    }
}
