//! # saleval-metric
//!
//! Evaluation engine for saliency maps, generic over the burn [`Backend`].
//!
//! - [`PrStat`]: binned precision-recall accumulator over [`N_BINS`] thresholds
//! - [`Evaluator`]: per-image MAE and adaptive-threshold precision, recall and
//!   F-measure, plus an owned [`PrStat`]
//! - [`EvaluationRunner`]: drives an [`Evaluator`] over a
//!   [`SaliencyDataset`](saleval_dataset::SaliencyDataset), sequentially or as a
//!   rayon fold/reduce over per-worker evaluators
//! - [`SaliencyPredictor`]: the seam the score maps come through
//!
//! ## Numerical conventions
//!
//! Precision and recall are computed per image and then averaged over images,
//! so small images weigh as much as large ones. Every ratio is guarded with
//! [`EPSILON`] in the denominator except the per-bin curve F-measure, which
//! reports 0/0 bins as NaN.
//!
//! [`Backend`]: burn::tensor::backend::Backend

pub mod error;
pub mod evaluator;
pub mod pr_stat;
pub mod predictor;
pub mod runner;
pub mod utils;

pub use error::{MetricError, MetricResult};
pub use evaluator::{
    adaptive_threshold, mean_absolute_error, EvaluationSummary, Evaluator, ImageScores, PrCurve,
    SkippedEntry,
};
pub use pr_stat::{bin_threshold, PrStat};
pub use predictor::{PrecomputedMaps, PredictorError, PredictorResult, SaliencyPredictor};
pub use runner::{EvaluationRunner, ExecutionMode, FailurePolicy, RunnerOptions};

/// Number of threshold bins of the precision-recall curve.
pub const N_BINS: usize = 256;

/// Guard added to ratio denominators.
pub const EPSILON: f64 = 1e-10;

/// Default β² of the F-measure, weighting precision over recall.
pub const DEFAULT_BETA2: f64 = 0.3;
