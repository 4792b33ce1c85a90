//! Image loading utilities.
//!
//! Converts decoded images into burn tensors in the layouts the evaluator
//! consumes: RGB images as `[3, height, width]` and single-channel maps as
//! `[height, width]`.

use std::path::Path;

use burn::tensor::{backend::Backend, Tensor, TensorData};
use image::{DynamicImage, GenericImageView};

use crate::error::{DatasetError, DatasetResult};

/// Luma values strictly above this count as foreground in a ground-truth mask.
pub const MASK_FOREGROUND_LEVEL: u8 = 127;

/// Opens an image file, attaching the path to any decoding error.
pub fn open_image<P: AsRef<Path>>(path: P) -> DatasetResult<DynamicImage> {
    let path = path.as_ref();
    image::open(path).map_err(|source| DatasetError::ImageOpenFailed {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads an RGB image as a tensor of shape `[3, height, width]` in `[0, 1]`.
pub fn load_rgb_tensor<B: Backend, P: AsRef<Path>>(
    path: P,
    device: &B::Device,
) -> DatasetResult<Tensor<B, 3>> {
    let img = open_image(path)?;
    Ok(rgb_image_to_tensor(img, device))
}

/// Converts a decoded image to a `[3, height, width]` tensor.
pub fn rgb_image_to_tensor<B: Backend>(img: DynamicImage, device: &B::Device) -> Tensor<B, 3> {
    let (width, height) = img.dimensions();

    // HWC layout straight from the image crate
    let buf = img.into_rgb32f().into_raw();
    let data = TensorData::new(buf, [height as usize, width as usize, 3]);

    Tensor::<B, 3>::from_data(data, device).permute([2, 0, 1])
}

/// Loads a ground-truth mask as a binary `[height, width]` tensor.
///
/// The file is read as 8-bit luma; values above [`MASK_FOREGROUND_LEVEL`]
/// become `1.0`, everything else `0.0`.
pub fn load_mask_tensor<B: Backend, P: AsRef<Path>>(
    path: P,
    device: &B::Device,
) -> DatasetResult<Tensor<B, 2>> {
    let img = open_image(path)?;
    Ok(mask_image_to_tensor(&img, device))
}

/// Binarizes a decoded mask image into a `[height, width]` tensor.
pub fn mask_image_to_tensor<B: Backend>(img: &DynamicImage, device: &B::Device) -> Tensor<B, 2> {
    let luma = img.to_luma8();
    let (width, height) = luma.dimensions();

    let values: Vec<f32> = luma
        .into_raw()
        .into_iter()
        .map(|v| if v > MASK_FOREGROUND_LEVEL { 1.0 } else { 0.0 })
        .collect();

    Tensor::from_data(
        TensorData::new(values, [height as usize, width as usize]),
        device,
    )
}

/// Loads a grayscale score map as a `[height, width]` tensor in `[0, 1]`.
pub fn load_luma_tensor<B: Backend, P: AsRef<Path>>(
    path: P,
    device: &B::Device,
) -> DatasetResult<Tensor<B, 2>> {
    let img = open_image(path)?;
    Ok(luma_image_to_tensor(img, device))
}

/// Converts a decoded image to a single-channel `[height, width]` tensor.
pub fn luma_image_to_tensor<B: Backend>(img: DynamicImage, device: &B::Device) -> Tensor<B, 2> {
    let luma = img.to_luma32f();
    let (width, height) = luma.dimensions();

    Tensor::from_data(
        TensorData::new(luma.into_raw(), [height as usize, width as usize]),
        device,
    )
}
