//! Exercises the real ONNX backend. Needs an exported classifier:
//!
//! ```sh
//! FAKE_DETECTOR_MODEL=public/model.onnx cargo test --test onnx -- --ignored
//! ```

use std::path::PathBuf;

use fake_image_detector::{BackendConfig, Error, ErrorKind, InferencePipeline, ModelConfig};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

fn model_path() -> PathBuf {
    std::env::var_os("FAKE_DETECTOR_MODEL")
        .map(PathBuf::from)
        .expect("set FAKE_DETECTOR_MODEL to an exported model.onnx")
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 90]));
    let mut buf = std::io::Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

#[test]
#[ignore = "requires an exported model.onnx"]
fn onnx_forward_pass() {
    let pipeline = InferencePipeline::from_config(&ModelConfig {
        candidates: vec![model_path()],
        backend: BackendConfig::Onnx,
        intra_threads: 1,
    });
    let bytes = png(640, 480);

    let first = pipeline.analyze(&bytes).unwrap();
    let second = pipeline.analyze(&bytes).unwrap();

    assert_eq!(first, second);
    assert!((first.probability_real + first.probability_fake - 1.0).abs() < 1e-9);
}

#[test]
fn onnx_rejects_non_model_file() {
    let artifact = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(artifact.path(), b"not an onnx graph").unwrap();
    let pipeline = InferencePipeline::from_config(&ModelConfig {
        candidates: vec![artifact.path().to_path_buf()],
        ..ModelConfig::default()
    });

    let err = pipeline.executor().ensure_loaded().unwrap_err();

    assert!(matches!(err, Error::ModelLoad { .. }), "{err}");
    assert_eq!(err.kind(), ErrorKind::Inference);
    assert!(!pipeline.executor().is_loaded());
}
