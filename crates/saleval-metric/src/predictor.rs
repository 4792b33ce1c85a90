//! The saliency predictor seam.
//!
//! The evaluator never computes saliency itself; it asks a
//! [`SaliencyPredictor`] for a score map per dataset entry. Closures work as
//! predictors, and [`PrecomputedMaps`] reads maps produced offline.

use std::path::PathBuf;

use burn::tensor::{backend::Backend, Tensor};
use saleval_dataset::{loader::load_luma_tensor, DatasetEntry, DatasetError};
use thiserror::Error;

/// Error type for saliency predictors.
#[derive(Error, Debug)]
pub enum PredictorError {
    /// A precomputed saliency map could not be read.
    #[error("Failed to load saliency map")]
    MapLoad(#[from] DatasetError),

    /// The produced map does not cover the image.
    #[error("Saliency map is {actual:?} but the image is {expected:?}")]
    DimensionMismatch {
        /// Image shape `[height, width]`.
        expected: [usize; 2],
        /// Map shape `[height, width]`.
        actual: [usize; 2],
    },

    /// Any other predictor failure.
    #[error("Predictor failed: {reason}")]
    Failed {
        /// Description of the failure.
        reason: String,
    },
}

pub type PredictorResult<T> = Result<T, PredictorError>;

/// Produces a saliency map for an image.
///
/// `image` is `[3, height, width]` RGB in `[0, 1]`; the returned map is
/// `[height, width]` with scores in `[0, 1]`. Predictors are shared by all
/// evaluation workers.
pub trait SaliencyPredictor<B: Backend>: Sync {
    fn predict(
        &self,
        entry: &DatasetEntry,
        image: Tensor<B, 3>,
        device: &B::Device,
    ) -> PredictorResult<Tensor<B, 2>>;
}

impl<B, F> SaliencyPredictor<B> for F
where
    B: Backend,
    F: Fn(&DatasetEntry, Tensor<B, 3>, &B::Device) -> PredictorResult<Tensor<B, 2>> + Sync,
{
    fn predict(
        &self,
        entry: &DatasetEntry,
        image: Tensor<B, 3>,
        device: &B::Device,
    ) -> PredictorResult<Tensor<B, 2>> {
        self(entry, image, device)
    }
}

/// Reads saliency maps computed ahead of time.
///
/// The map of entry `name` is the grayscale file `<dir>/<name>.<extension>`,
/// scaled to `[0, 1]`.
#[derive(Debug, Clone)]
pub struct PrecomputedMaps {
    dir: PathBuf,
    extension: String,
}

impl PrecomputedMaps {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        let extension: String = extension.into();
        Self {
            dir: dir.into(),
            extension: extension.trim_start_matches('.').to_owned(),
        }
    }

    /// Path of the map for the entry called `name`.
    pub fn map_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{}", self.extension))
    }
}

impl<B: Backend> SaliencyPredictor<B> for PrecomputedMaps {
    fn predict(
        &self,
        entry: &DatasetEntry,
        image: Tensor<B, 3>,
        device: &B::Device,
    ) -> PredictorResult<Tensor<B, 2>> {
        let [_, height, width] = image.dims();
        let map = load_luma_tensor::<B, _>(self.map_path(&entry.name), device)?;

        let actual = map.dims();
        if actual != [height, width] {
            return Err(PredictorError::DimensionMismatch {
                expected: [height, width],
                actual,
            });
        }
        Ok(map)
    }
}
