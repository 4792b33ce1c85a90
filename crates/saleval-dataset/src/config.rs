use std::path::PathBuf;

use burn::config::Config;

/// Location and naming convention of an evaluation dataset.
///
/// A ground-truth mask `<stem>.<mask_extension>` in `ground_truth_dir` pairs
/// with the source image `<stem>.<image_extension>` in `image_dir`.
#[derive(Config, Debug)]
pub struct DatasetConfig {
    /// Directory holding the ground-truth masks.
    pub ground_truth_dir: PathBuf,
    /// Directory holding the source images.
    pub image_dir: PathBuf,
    /// Extension of mask files, without the leading dot.
    #[config(default = "String::from(\"png\")")]
    pub mask_extension: String,
    /// Extension of image files, without the leading dot.
    #[config(default = "String::from(\"jpg\")")]
    pub image_extension: String,
}
