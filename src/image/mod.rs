//! Image decoding and tensor preparation.

mod preprocess;

pub use preprocess::{cover_crop, preprocess, preprocess_image};

use ndarray::Array3;

/// Image tensor in CHW format (channels, height, width), normalized with
/// ImageNet statistics. The batch axis is added by the model executor.
pub type NormalizedTensor = Array3<f32>;

/// Square input resolution the classifier was trained at.
pub const IMG_SIZE: u32 = 224;

/// Number of channels in RGB images.
pub const RGB_CHANNELS: usize = 3;

/// Per-channel mean (R, G, B) of the training distribution.
pub const IMAGENET_MEAN: [f32; RGB_CHANNELS] = [0.485, 0.456, 0.406];

/// Per-channel standard deviation (R, G, B) of the training distribution.
pub const IMAGENET_STD: [f32; RGB_CHANNELS] = [0.229, 0.224, 0.225];
