//! `saleval`: saliency map evaluation against labeled datasets.
//!
//! The heavy lifting lives in [`saleval_metric`] and [`saleval_dataset`];
//! this crate wires them to a configuration file, a compile-time backend and
//! report writers for the `saleval` binary.

pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod evaluate;
pub mod logging;
pub mod report;

#[doc(inline)]
pub use backend::{EvalBackend, EvalDevice, NAME};
pub use config::EvaluationConfig;
pub use error::{AppError, AppResult};
pub use evaluate::run_evaluation;
#[doc(inline)]
pub use saleval_dataset as dataset;
#[doc(inline)]
pub use saleval_metric as metric;
