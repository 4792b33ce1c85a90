//! Dataset catalog for saliency evaluation.
//!
//! The catalog is built once from a [`DatasetConfig`] by scanning the
//! ground-truth directory, and is then shared read-only by every evaluation
//! worker. Images and masks are decoded lazily, per entry, on request.

use std::{
    fs,
    path::{Path, PathBuf},
};

use burn::{
    data::dataset::Dataset,
    tensor::{backend::Backend, Tensor},
};

use crate::{
    config::DatasetConfig,
    error::{DatasetError, DatasetResult},
    loader::{load_mask_tensor, load_rgb_tensor},
};

/// One matched (image, ground-truth mask) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetEntry {
    /// Path of the source image. Not checked for existence at scan time.
    pub image_path: PathBuf,
    /// Path of the ground-truth mask.
    pub ground_truth_path: PathBuf,
    /// Identifier derived from the ground-truth file stem.
    pub name: String,
}

/// Catalog of the (image, ground truth) pairs of one evaluation run.
#[derive(Debug, Clone, Default)]
pub struct SaliencyDataset {
    entries: Vec<DatasetEntry>,
}

impl SaliencyDataset {
    /// Scans the configured ground-truth directory and builds the catalog.
    ///
    /// Every regular file whose extension matches `mask_extension` (ignoring
    /// ASCII case) becomes an entry; its image path is derived by swapping in
    /// `image_extension` under `image_dir`. Entries are ordered by name.
    pub fn new(config: &DatasetConfig) -> DatasetResult<Self> {
        let gt_root = &config.ground_truth_dir;
        let image_root = &config.image_dir;

        if !gt_root.is_dir() {
            return Err(DatasetError::GroundTruthDirectoryNotFound {
                path: gt_root.clone(),
            });
        }
        if !image_root.is_dir() {
            return Err(DatasetError::ImageDirectoryNotFound {
                path: image_root.clone(),
            });
        }

        let read_failed = |source| DatasetError::DirectoryReadFailed {
            path: gt_root.clone(),
            source,
        };

        let mut entries = Vec::new();
        for dir_entry in fs::read_dir(gt_root).map_err(read_failed)? {
            let path = dir_entry.map_err(read_failed)?.path();
            if !path.is_file() {
                continue;
            }

            let Some(stem) = mask_stem(&path, &config.mask_extension) else {
                tracing::debug!(path = %path.display(), "skipping non-mask file");
                continue;
            };

            let image_path = image_root.join(format!("{stem}.{}", config.image_extension));
            entries.push(DatasetEntry {
                image_path,
                ground_truth_path: path.clone(),
                name: stem.to_owned(),
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));

        tracing::info!(
            entries = entries.len(),
            ground_truth = %gt_root.display(),
            images = %image_root.display(),
            "dataset catalog built",
        );

        Ok(Self { entries })
    }

    /// Builds a catalog from already matched entries.
    pub const fn from_entries(entries: Vec<DatasetEntry>) -> Self {
        Self { entries }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[DatasetEntry] {
        &self.entries
    }

    /// Returns the entry at `index`.
    pub fn entry(&self, index: usize) -> DatasetResult<&DatasetEntry> {
        self.entries
            .get(index)
            .ok_or(DatasetError::IndexOutOfRange {
                index,
                len: self.entries.len(),
            })
    }

    /// Identifier of the entry at `index`.
    pub fn name(&self, index: usize) -> DatasetResult<&str> {
        self.entry(index).map(|e| e.name.as_str())
    }

    /// Loads the binarized ground-truth mask of entry `index` as `[height, width]`.
    pub fn ground_truth<B: Backend>(
        &self,
        index: usize,
        device: &B::Device,
    ) -> DatasetResult<Tensor<B, 2>> {
        load_mask_tensor(&self.entry(index)?.ground_truth_path, device)
    }

    /// Loads the source image of entry `index` as `[3, height, width]`.
    pub fn image<B: Backend>(&self, index: usize, device: &B::Device) -> DatasetResult<Tensor<B, 3>> {
        load_rgb_tensor(&self.entry(index)?.image_path, device)
    }
}

impl Dataset<DatasetEntry> for SaliencyDataset {
    fn get(&self, index: usize) -> Option<DatasetEntry> {
        self.entries.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Returns the file stem when `path` carries the mask extension.
fn mask_stem<'a>(path: &'a Path, mask_extension: &str) -> Option<&'a str> {
    let extension = path.extension()?.to_str()?;
    if !extension.eq_ignore_ascii_case(mask_extension.trim_start_matches('.')) {
        return None;
    }
    path.file_stem()?.to_str().filter(|stem| !stem.is_empty())
}
