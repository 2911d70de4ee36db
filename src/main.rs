//! fake-image-detector CLI - classify images as real or fake.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use image::{DynamicImage, Rgb, RgbImage};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fake_image_detector::{image::preprocess_image, BackendConfig, Config, InferencePipeline};

/// Detect generated or manipulated images with a binary classifier.
#[derive(Parser, Debug)]
#[command(name = "fake-image-detector")]
#[command(version, about, long_about = None)]
struct Args {
    /// JSON configuration file.
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Model artifact location; may be repeated. Replaces the configured candidates.
    #[arg(
        short,
        long = "model",
        global = true,
        value_name = "PATH",
        env = "FAKE_DETECTOR_MODEL",
        value_delimiter = ','
    )]
    models: Vec<PathBuf>,

    /// Run inference through an external runner instead of ONNX Runtime.
    #[arg(long, global = true, value_name = "PROGRAM")]
    backend_program: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify image files and print one JSON result per line.
    Analyze {
        /// Input image paths.
        #[arg(value_name = "IMAGE", required = true)]
        images: Vec<PathBuf>,
    },

    /// Locate and load the model, then run one forward pass on a grey image.
    Check,

    /// Serve the HTTP API.
    Serve {
        /// Bind address.
        #[arg(long, value_name = "HOST")]
        host: Option<String>,

        /// Listen port.
        #[arg(short, long, value_name = "PORT")]
        port: Option<u16>,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("fake_image_detector={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if let Err(err) = run(args) {
        tracing::error!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };

    if !args.models.is_empty() {
        config.model.candidates.clone_from(&args.models);
    }

    if let Some(program) = &args.backend_program {
        config.model.backend = BackendConfig::Subprocess {
            program: program.clone(),
            args: Vec::new(),
        };
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn run(args: Args) -> Result<()> {
    let mut config = load_config(&args)?;
    let pipeline = InferencePipeline::from_config(&config.model);

    match args.command {
        Command::Analyze { images } => analyze(&pipeline, &images),
        Command::Check => check(&pipeline),
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }

            let runtime = tokio::runtime::Runtime::new().context("Failed to start runtime")?;
            runtime
                .block_on(fake_image_detector::server::serve(pipeline, &config.server))
                .context("Server failed")
        }
    }
}

fn analyze(pipeline: &InferencePipeline, images: &[PathBuf]) -> Result<()> {
    for path in images {
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

        let result = pipeline
            .analyze(&bytes)
            .with_context(|| format!("Failed to analyze {}", path.display()))?;

        let line = serde_json::json!({
            "file": path.display().to_string(),
            "prediction": result.prediction,
            "confidence": result.confidence,
            "probability_real": result.probability_real,
            "probability_fake": result.probability_fake,
        });
        println!("{line}");
    }

    Ok(())
}

fn check(pipeline: &InferencePipeline) -> Result<()> {
    let executor = pipeline.executor();
    let handle = executor.ensure_loaded().context("Failed to load model")?;
    println!("Model: {} ({} backend)", handle.path().display(), executor.backend_name());

    let grey = DynamicImage::ImageRgb8(RgbImage::from_pixel(224, 224, Rgb([128, 128, 128])));
    let logit = executor
        .run(&preprocess_image(&grey))
        .context("Forward pass failed")?;

    let result = fake_image_detector::pipeline::decide(logit);
    println!(
        "Forward pass OK: logit {logit:.4}, probability_real {:.4}",
        result.probability_real
    );

    Ok(())
}
