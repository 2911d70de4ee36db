#![allow(dead_code)]

use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use fake_image_detector::model::{CandidatePaths, LoadedModel, Logit, ModelBackend, ModelExecutor};
use fake_image_detector::{InferencePipeline, Result};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use ndarray::ArrayView4;

/// Counts loads and forward passes. The logit is the mean of the input tensor
/// plus a fixed offset, so different images give different answers.
#[derive(Clone, Default)]
pub struct CountingBackend {
    pub loads: Arc<AtomicUsize>,
    pub forwards: Arc<AtomicUsize>,
    pub offset: f32,
    pub load_delay: Duration,
}

struct MeanModel {
    forwards: Arc<AtomicUsize>,
    offset: f32,
}

impl LoadedModel for MeanModel {
    fn forward(&self, input: ArrayView4<'_, f32>) -> Result<Logit> {
        self.forwards.fetch_add(1, Ordering::SeqCst);
        Ok(input.mean().unwrap_or(0.0) + self.offset)
    }
}

impl ModelBackend for CountingBackend {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn load(&self, _path: &Path) -> Result<Box<dyn LoadedModel>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.load_delay);
        Ok(Box::new(MeanModel {
            forwards: Arc::clone(&self.forwards),
            offset: self.offset,
        }))
    }
}

impl CountingBackend {
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn forwards(&self) -> usize {
        self.forwards.load(Ordering::SeqCst)
    }
}

/// A pipeline whose model "artifact" is an empty temp file.
pub fn pipeline_with(backend: CountingBackend) -> (tempfile::NamedTempFile, InferencePipeline) {
    let artifact = tempfile::NamedTempFile::new().unwrap();
    let executor = ModelExecutor::new(
        Box::new(CandidatePaths::new(vec![artifact.path().to_path_buf()])),
        Box::new(backend),
    );
    (artifact, InferencePipeline::new(executor))
}

pub fn encode(img: RgbImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img).write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

pub fn gradient_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 255 / width) as u8, (y * 255 / height) as u8, 64])
    });
    encode(img, ImageFormat::Png)
}
