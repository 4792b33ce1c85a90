use saleval_dataset::SaliencyDataset;
use saleval_metric::EvaluationRunner;

use crate::{
    backend::{EvalBackend, EvalDevice, NAME},
    config::EvaluationConfig,
    error::AppResult,
    report::EvaluationReport,
};

/// Evaluates the precomputed saliency maps described by `config`.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the dataset directories
/// cannot be scanned, or the run fails (an entry error under the abort policy,
/// or nothing left to aggregate).
pub fn run_evaluation(config: &EvaluationConfig, device: EvalDevice) -> AppResult<EvaluationReport> {
    config.validate()?;

    tracing::info!(
        ground_truth = %config.ground_truth_dir.display(),
        images = %config.image_dir.display(),
        maps = %config.maps_dir.display(),
        backend = NAME,
        "running evaluation",
    );

    let dataset = SaliencyDataset::new(&config.dataset())?;
    let predictor = config.predictor();
    let runner =
        EvaluationRunner::<EvalBackend, _>::new(&dataset, &predictor, device, config.runner_options());

    let summary = runner.run()?;
    Ok(EvaluationReport::new(NAME, summary))
}
