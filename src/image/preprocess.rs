//! Conversion of encoded image bytes into the classifier's input tensor.

use image::{imageops::FilterType, DynamicImage, GenericImageView};
use ndarray::Array3;

use crate::error::{Error, Result};

use super::{NormalizedTensor, IMAGENET_MEAN, IMAGENET_STD, IMG_SIZE, RGB_CHANNELS};

/// Decode an encoded image and convert it to a normalized tensor.
///
/// The image is:
/// 1. Decoded from memory (any format the `image` crate recognises)
/// 2. Center-cropped to its largest square, then scaled to 224x224 (a cover fit)
/// 3. Converted to RGB and mapped to [0, 1]
/// 4. Standardized with the ImageNet mean/std
/// 5. Returned as a planar CHW tensor (3, 224, 224)
///
/// # Errors
///
/// Returns [`Error::EmptyInput`] for a zero-length buffer and
/// [`Error::Decode`] when the bytes are not a decodable image.
pub fn preprocess(bytes: &[u8]) -> Result<NormalizedTensor> {
    if bytes.is_empty() {
        return Err(Error::EmptyInput);
    }

    let img = image::load_from_memory(bytes).map_err(|source| Error::Decode { source })?;

    tracing::debug!(
        width = img.width(),
        height = img.height(),
        "decoded input image"
    );

    Ok(preprocess_image(&img))
}

/// Convert an already decoded image to a normalized tensor.
#[must_use]
pub fn preprocess_image(img: &DynamicImage) -> NormalizedTensor {
    let covered = resize_cover(img, IMG_SIZE);
    let rgb = covered.to_rgb8();

    let size = IMG_SIZE as usize;
    let mut tensor = Array3::<f32>::zeros((RGB_CHANNELS, size, size));

    for (x, y, pixel) in rgb.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        for c in 0..RGB_CHANNELS {
            let value = f32::from(pixel[c]) / 255.0;
            tensor[[c, y, x]] = (value - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
        }
    }

    tensor
}

/// Source-space square that survives a cover fit onto a square target:
/// `(left, top, side)`.
///
/// Covering a square box and cropping the overflow keeps exactly the centered
/// `min(width, height)` square of the source, so the crop is taken before
/// resizing and the resize cost is bounded by the output size.
#[must_use]
pub const fn cover_crop(width: u32, height: u32) -> (u32, u32, u32) {
    let side = if width < height { width } else { height };
    ((width - side) / 2, (height - side) / 2, side)
}

/// Crop the centered square of the source, then scale it to `size` x `size`.
fn resize_cover(img: &DynamicImage, size: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    let (left, top, side) = cover_crop(width, height);

    let square = if side == width && side == height {
        img.clone()
    } else {
        img.crop_imm(left, top, side, side)
    };

    if side == size {
        square
    } else {
        square.resize_exact(size, size, FilterType::Lanczos3)
    }
}
