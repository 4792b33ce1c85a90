use std::path::PathBuf;

use saleval_dataset::DatasetError;
use saleval_metric::MetricError;
use thiserror::Error;

/// Errors of the `saleval` application layer.
#[derive(Error, Debug)]
pub enum AppError {
    /// Error when a configuration file cannot be read or parsed.
    #[error("Failed to load configuration {path}: {reason}")]
    ConfigLoad {
        /// Path of the configuration file.
        path: PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// Error when a configuration value is out of range.
    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidConfig {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// Error when the command line lacks arguments needed to build a configuration.
    #[error("Missing arguments: {reason}")]
    MissingArguments {
        /// Which arguments are required.
        reason: &'static str,
    },

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Metric(#[from] MetricError),

    /// Error when a report file cannot be written.
    #[error("Failed to write report {path}")]
    ReportWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize JSON report")]
    Json(#[from] serde_json::Error),

    #[error("Failed to write curve CSV")]
    Csv(#[from] csv::Error),
}

pub type AppResult<T> = Result<T, AppError>;
