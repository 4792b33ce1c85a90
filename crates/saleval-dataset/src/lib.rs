//! # saleval-dataset
//!
//! Dataset catalog for saliency map evaluation: enumerates matched
//! (image, ground-truth mask) pairs from a directory layout and loads them as
//! burn tensors.
//!
//! Ground-truth masks live in one directory and source images in another;
//! `<stem>.<mask_extension>` pairs with `<stem>.<image_extension>`.

pub mod config;
pub mod dataset;
pub mod error;
pub mod loader;

pub use config::DatasetConfig;
pub use dataset::{DatasetEntry, SaliencyDataset};
pub use error::{DatasetError, DatasetResult};
