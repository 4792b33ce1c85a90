//! Command-line interface of the `saleval` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{
    config::EvaluationConfig,
    error::{AppError, AppResult},
};

#[derive(Parser, Debug)]
#[command(name = "saleval")]
#[command(about = "Evaluate saliency maps: MAE, adaptive F-measure and precision-recall curves")]
pub struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate precomputed saliency maps against ground-truth masks
    Evaluate(EvaluateArgs),

    /// Show backend information
    Info,
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// JSON configuration file; flags given on the command line override it
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory of ground-truth masks
    #[arg(long)]
    pub ground_truth: Option<PathBuf>,

    /// Directory of source images
    #[arg(long)]
    pub images: Option<PathBuf>,

    /// Directory of saliency maps
    #[arg(long)]
    pub maps: Option<PathBuf>,

    /// Extension of mask files [default: png]
    #[arg(long)]
    pub mask_ext: Option<String>,

    /// Extension of image files [default: jpg]
    #[arg(long)]
    pub image_ext: Option<String>,

    /// Extension of saliency map files [default: png]
    #[arg(long)]
    pub map_ext: Option<String>,

    /// Beta squared of the F-measure [default: 0.3]
    #[arg(long)]
    pub beta2: Option<f64>,

    /// Evaluate entries one after another
    #[arg(long)]
    pub sequential: bool,

    /// Number of worker threads
    #[arg(long)]
    pub threads: Option<usize>,

    /// Leave failing entries out instead of aborting
    #[arg(long)]
    pub skip_failures: bool,

    /// Write the full report as JSON
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Write the precision-recall curve as CSV
    #[arg(long)]
    pub curve_csv: Option<PathBuf>,
}

impl EvaluateArgs {
    /// Builds the run configuration: the `--config` file if given, then every
    /// flag present on the command line on top of it.
    pub fn to_config(&self) -> AppResult<EvaluationConfig> {
        let mut config = match &self.config {
            Some(path) => EvaluationConfig::from_file(path)?,
            None => {
                let (Some(ground_truth), Some(images), Some(maps)) =
                    (&self.ground_truth, &self.images, &self.maps)
                else {
                    return Err(AppError::MissingArguments {
                        reason: "--ground-truth, --images and --maps are required without --config",
                    });
                };
                EvaluationConfig::new(ground_truth.clone(), images.clone(), maps.clone())
            }
        };

        if let Some(dir) = &self.ground_truth {
            config.ground_truth_dir = dir.clone();
        }
        if let Some(dir) = &self.images {
            config.image_dir = dir.clone();
        }
        if let Some(dir) = &self.maps {
            config.maps_dir = dir.clone();
        }
        if let Some(ext) = &self.mask_ext {
            config.mask_extension = ext.clone();
        }
        if let Some(ext) = &self.image_ext {
            config.image_extension = ext.clone();
        }
        if let Some(ext) = &self.map_ext {
            config.map_extension = ext.clone();
        }
        if let Some(beta2) = self.beta2 {
            config.beta2 = beta2;
        }
        if self.threads.is_some() {
            config.num_threads = self.threads;
        }
        if self.sequential {
            config.parallel = false;
        }
        if self.skip_failures {
            config.skip_failures = true;
        }
        Ok(config)
    }
}
