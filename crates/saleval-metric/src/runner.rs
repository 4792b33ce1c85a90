//! Dataset-wide evaluation driver.
//!
//! [`EvaluationRunner`] pairs a catalog with a predictor and pushes every
//! entry through an [`Evaluator`]. In parallel mode each rayon worker folds
//! its share of the entries into a private evaluator and the partial
//! evaluators are merged pairwise, so no state is shared between workers.

use std::{error::Error as StdError, ops::Range};

use burn::tensor::backend::Backend;
use rayon::{prelude::*, ThreadPoolBuilder};
use saleval_dataset::SaliencyDataset;
use serde::{Deserialize, Serialize};

use crate::{
    error::{MetricError, MetricResult},
    evaluator::{EvaluationSummary, Evaluator, SkippedEntry},
    predictor::SaliencyPredictor,
    DEFAULT_BETA2,
};

/// How the entries of a dataset are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// One entry after another on the calling thread.
    Sequential,
    /// Fold/reduce over a rayon pool.
    #[default]
    Parallel,
}

/// What happens when a single entry cannot be evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// The whole run fails with the entry's error.
    #[default]
    Abort,
    /// The entry is logged, recorded as skipped and left out of the aggregate.
    Skip,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunnerOptions {
    pub beta2: f64,
    pub mode: ExecutionMode,
    pub failure_policy: FailurePolicy,
    /// Worker count for parallel mode; `None` uses the global rayon pool.
    pub num_threads: Option<usize>,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            beta2: DEFAULT_BETA2,
            mode: ExecutionMode::default(),
            failure_policy: FailurePolicy::default(),
            num_threads: None,
        }
    }
}

/// Evaluates every entry of a [`SaliencyDataset`] with a [`SaliencyPredictor`].
pub struct EvaluationRunner<'a, B: Backend, P> {
    dataset: &'a SaliencyDataset,
    predictor: &'a P,
    device: B::Device,
    options: RunnerOptions,
}

impl<'a, B, P> EvaluationRunner<'a, B, P>
where
    B: Backend,
    P: SaliencyPredictor<B>,
{
    pub const fn new(
        dataset: &'a SaliencyDataset,
        predictor: &'a P,
        device: B::Device,
        options: RunnerOptions,
    ) -> Self {
        Self {
            dataset,
            predictor,
            device,
            options,
        }
    }

    pub const fn options(&self) -> &RunnerOptions {
        &self.options
    }

    /// Evaluates the whole dataset and normalizes the result.
    ///
    /// Fails with [`MetricError::EmptyDataset`] when no entry made it into the
    /// aggregate.
    pub fn run(&self) -> MetricResult<EvaluationSummary> {
        tracing::info!(
            entries = self.dataset.len(),
            mode = ?self.options.mode,
            policy = ?self.options.failure_policy,
            beta2 = self.options.beta2,
            "starting evaluation",
        );

        let evaluator = match self.options.mode {
            ExecutionMode::Sequential => self.run_sequential()?,
            ExecutionMode::Parallel => self.run_parallel()?,
        };

        tracing::info!(
            evaluated = evaluator.image_count(),
            skipped = evaluator.skipped().len(),
            "evaluation finished",
        );

        evaluator.finalize()
    }

    /// Accumulates every entry on the calling thread.
    pub fn run_sequential(&self) -> MetricResult<Evaluator> {
        self.accumulate_range(0..self.dataset.len())
    }

    /// Accumulates every entry over rayon workers.
    pub fn run_parallel(&self) -> MetricResult<Evaluator> {
        match self.options.num_threads {
            Some(threads) => {
                let pool = ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| MetricError::ThreadPool {
                        reason: e.to_string(),
                    })?;
                pool.install(|| self.fold_parallel())
            }
            None => self.fold_parallel(),
        }
    }

    /// Accumulates the entries in `range` into a fresh evaluator.
    pub fn accumulate_range(&self, range: Range<usize>) -> MetricResult<Evaluator> {
        let mut evaluator = Evaluator::new(self.options.beta2);
        for index in range {
            self.evaluate(index, &mut evaluator)?;
        }
        Ok(evaluator)
    }

    /// Evaluates entry `index` into `evaluator`, applying the failure policy.
    pub fn evaluate(&self, index: usize, evaluator: &mut Evaluator) -> MetricResult<()> {
        let Err(err) = self.evaluate_entry(index, evaluator) else {
            return Ok(());
        };
        let name = err.entry_name().map(str::to_owned);
        match (self.options.failure_policy, name) {
            (FailurePolicy::Skip, Some(name)) => {
                let reason = error_chain(&err);
                tracing::warn!(entry = %name, %reason, "skipping entry");
                evaluator.record_skip(SkippedEntry::new(name, reason));
                Ok(())
            }
            _ => Err(err),
        }
    }

    fn fold_parallel(&self) -> MetricResult<Evaluator> {
        let beta2 = self.options.beta2;
        (0..self.dataset.len())
            .into_par_iter()
            .try_fold(
                || Evaluator::new(beta2),
                |mut evaluator, index| {
                    self.evaluate(index, &mut evaluator)?;
                    Ok::<_, MetricError>(evaluator)
                },
            )
            .try_reduce(|| Evaluator::new(beta2), |a, b| Ok(a.merge(b)))
    }

    fn evaluate_entry(&self, index: usize, evaluator: &mut Evaluator) -> MetricResult<()> {
        let entry = self.dataset.entry(index).map_err(|source| MetricError::Load {
            name: format!("#{index}"),
            source,
        })?;
        let name = entry.name.as_str();
        let load_failed = |source| MetricError::Load {
            name: name.to_owned(),
            source,
        };

        let image = self.dataset.image::<B>(index, &self.device).map_err(load_failed)?;
        let ground_truth = self
            .dataset
            .ground_truth::<B>(index, &self.device)
            .map_err(load_failed)?;
        let [_, height, width] = image.dims();

        let saliency = self
            .predictor
            .predict(entry, image, &self.device)
            .map_err(|source| MetricError::Prediction {
                name: name.to_owned(),
                source,
            })?;
        let actual = saliency.dims();
        if actual != [height, width] {
            return Err(MetricError::DimensionMismatch {
                name: name.to_owned(),
                expected: [height, width],
                actual,
            });
        }

        let scores = evaluator
            .add_image(name, saliency, ground_truth)
            .map_err(|e| e.with_entry(name))?;
        tracing::debug!(
            entry = name,
            mae = scores.mae,
            threshold = scores.threshold,
            precision = scores.precision,
            recall = scores.recall,
            f_measure = scores.f_measure,
            "entry evaluated",
        );
        Ok(())
    }
}

/// Renders an error and its sources as one line.
fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
