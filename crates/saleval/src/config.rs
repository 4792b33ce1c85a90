//! Evaluation run configuration.

use std::path::{Path, PathBuf};

use burn::config::Config;
use saleval_dataset::DatasetConfig;
use saleval_metric::{
    ExecutionMode, FailurePolicy, PrecomputedMaps, RunnerOptions, DEFAULT_BETA2,
};
use serde::Deserialize;

use crate::error::{AppError, AppResult};

/// Everything one evaluation run needs.
///
/// Built in code through the burn `Config` builder, or read from JSON with
/// [`EvaluationConfig::from_file`], where every key but the three directories
/// may be omitted.
#[derive(Config, Debug)]
pub struct EvaluationConfig {
    /// Directory holding the ground-truth masks.
    pub ground_truth_dir: PathBuf,
    /// Directory holding the source images.
    pub image_dir: PathBuf,
    /// Directory of the precomputed saliency maps.
    pub maps_dir: PathBuf,
    /// Extension of mask files, without the leading dot.
    #[config(default = "default_mask_extension()")]
    pub mask_extension: String,
    /// Extension of image files, without the leading dot.
    #[config(default = "default_image_extension()")]
    pub image_extension: String,
    /// Extension of saliency map files, without the leading dot.
    #[config(default = "default_map_extension()")]
    pub map_extension: String,
    /// β² of the F-measure.
    #[config(default = "DEFAULT_BETA2")]
    pub beta2: f64,
    /// Evaluate entries on a rayon pool rather than one after another.
    #[config(default = true)]
    pub parallel: bool,
    /// Worker count; the global rayon pool is used when unset.
    #[config(default = "None")]
    pub num_threads: Option<usize>,
    /// Leave failing entries out of the aggregate instead of aborting.
    #[config(default = false)]
    pub skip_failures: bool,
}

fn default_mask_extension() -> String {
    String::from("png")
}

fn default_image_extension() -> String {
    String::from("jpg")
}

fn default_map_extension() -> String {
    String::from("png")
}

const fn default_beta2() -> f64 {
    DEFAULT_BETA2
}

const fn default_parallel() -> bool {
    true
}

/// JSON form of [`EvaluationConfig`] with per-key defaults.
#[derive(Debug, Deserialize)]
struct EvaluationFile {
    ground_truth_dir: PathBuf,
    image_dir: PathBuf,
    maps_dir: PathBuf,
    #[serde(default = "default_mask_extension")]
    mask_extension: String,
    #[serde(default = "default_image_extension")]
    image_extension: String,
    #[serde(default = "default_map_extension")]
    map_extension: String,
    #[serde(default = "default_beta2")]
    beta2: f64,
    #[serde(default = "default_parallel")]
    parallel: bool,
    #[serde(default)]
    num_threads: Option<usize>,
    #[serde(default)]
    skip_failures: bool,
}

impl From<EvaluationFile> for EvaluationConfig {
    fn from(file: EvaluationFile) -> Self {
        Self::new(file.ground_truth_dir, file.image_dir, file.maps_dir)
            .with_mask_extension(file.mask_extension)
            .with_image_extension(file.image_extension)
            .with_map_extension(file.map_extension)
            .with_beta2(file.beta2)
            .with_parallel(file.parallel)
            .with_num_threads(file.num_threads)
            .with_skip_failures(file.skip_failures)
    }
}

impl EvaluationConfig {
    /// Loads a JSON configuration file, filling omitted keys with defaults.
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let load_failed = |reason: String| AppError::ConfigLoad {
            path: path.to_path_buf(),
            reason,
        };

        let content = std::fs::read_to_string(path).map_err(|e| load_failed(e.to_string()))?;
        let file: EvaluationFile =
            serde_json::from_str(&content).map_err(|e| load_failed(e.to_string()))?;
        Ok(file.into())
    }

    /// Rejects values the evaluation cannot work with.
    pub fn validate(&self) -> AppResult<()> {
        if !(self.beta2.is_finite() && self.beta2 > 0.0) {
            return Err(AppError::InvalidConfig {
                field: "beta2",
                reason: format!("must be a positive finite number, got {}", self.beta2),
            });
        }
        if self.num_threads == Some(0) {
            return Err(AppError::InvalidConfig {
                field: "num_threads",
                reason: "must be at least 1".to_owned(),
            });
        }
        Ok(())
    }

    /// Catalog settings of the configured dataset.
    pub fn dataset(&self) -> DatasetConfig {
        DatasetConfig::new(self.ground_truth_dir.clone(), self.image_dir.clone())
            .with_mask_extension(self.mask_extension.clone())
            .with_image_extension(self.image_extension.clone())
    }

    pub fn runner_options(&self) -> RunnerOptions {
        RunnerOptions {
            beta2: self.beta2,
            mode: if self.parallel {
                ExecutionMode::Parallel
            } else {
                ExecutionMode::Sequential
            },
            failure_policy: if self.skip_failures {
                FailurePolicy::Skip
            } else {
                FailurePolicy::Abort
            },
            num_threads: self.num_threads,
        }
    }

    pub fn predictor(&self) -> PrecomputedMaps {
        PrecomputedMaps::new(&self.maps_dir, &self.map_extension)
    }
}
