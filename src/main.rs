//! Artifact Feature Extraction CLI
//!
//! Reads decoded luma frames (or generates synthetic ones), extracts the
//! per-block feature vectors and writes them as a flat little-endian f32
//! file with a TOML manifest.

use artifact_features::{
    capture::{
        ConfigError, FileConfig, FrameSource, RawFrameReader, SourceError, SyntheticPattern,
        SyntheticSource,
    },
    metrics::{MetricsError, MetricsRegistry, MetricsSnapshot},
    pipeline::{FeatureBuffer, FeatureManifest, FrameFeaturePipeline, OutputError},
};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Frames generated when a synthetic source has no explicit limit.
const DEFAULT_SYNTHETIC_FRAMES: u64 = 30;

#[derive(Parser, Debug)]
#[command(
    name = "artifact-features",
    version,
    about = "Extract per-macroblock artifact features from raw luma frames"
)]
struct Cli {
    /// TOML configuration file; flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,
    /// File of concatenated raw 8-bit luma frames.
    #[arg(long)]
    input: Option<PathBuf>,
    /// Synthetic source used without --input: uniform:<value>, edge or noise:<seed>.
    #[arg(long)]
    pattern: Option<SyntheticPattern>,
    /// Frame width in pixels.
    #[arg(long)]
    width: Option<usize>,
    /// Frame height in pixels.
    #[arg(long)]
    height: Option<usize>,
    /// Block side length in pixels.
    #[arg(long)]
    block_dim: Option<usize>,
    /// Stop after this many frames.
    #[arg(long)]
    frames: Option<u64>,
    /// Destination of the flat f32 feature file.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Destination of the TOML manifest.
    #[arg(long)]
    manifest: Option<PathBuf>,
    /// Directory for raw dumps of the first frame's planes and tables.
    #[arg(long)]
    dump_dir: Option<PathBuf>,
    /// Prometheus text file written when the run ends.
    #[arg(long)]
    metrics_file: Option<PathBuf>,
    /// Serve /metrics on this port while running.
    #[cfg(feature = "metrics")]
    #[arg(long)]
    metrics_port: Option<u16>,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Output(#[from] OutputError),
    #[error(transparent)]
    Metrics(#[from] MetricsError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Cli {
    /// Merges flags over the file configuration.
    fn settings(&self) -> Result<FileConfig, ConfigError> {
        let mut settings = match &self.config {
            Some(path) => FileConfig::from_file(path)?,
            None => FileConfig::default(),
        };

        let extractor = &mut settings.extractor;
        extractor.width = self.width.unwrap_or(extractor.width);
        extractor.height = self.height.unwrap_or(extractor.height);
        extractor.block_dim = self.block_dim.unwrap_or(extractor.block_dim);

        let input = &mut settings.input;
        input.path = self.input.clone().or(input.path.take());
        input.pattern = self.pattern.or(input.pattern);
        input.frame_limit = self.frames.or(input.frame_limit);

        let output = &mut settings.output;
        output.features_path = self.output.clone().or(output.features_path.take());
        output.manifest_path = self.manifest.clone().or(output.manifest_path.take());
        output.dump_dir = self.dump_dir.clone().or(output.dump_dir.take());
        output.metrics_path = self.metrics_file.clone().or(output.metrics_path.take());
        #[cfg(feature = "metrics")]
        {
            output.metrics_port = self.metrics_port.unwrap_or(output.metrics_port);
        }

        settings.extractor.validate()?;
        Ok(settings)
    }
}

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::from(1)
        }
    }
}

fn run(cli: &Cli) -> Result<(), CliError> {
    info!("Artifact Features v{}", artifact_features::VERSION);

    let settings = cli.settings()?;
    let config = settings.extractor;
    let pipeline = FrameFeaturePipeline::new(config)?;

    let (mut source, limit): (Box<dyn FrameSource>, Option<u64>) = match &settings.input.path {
        Some(path) => (
            Box::new(RawFrameReader::open(path, config.width, config.height)?),
            settings.input.frame_limit,
        ),
        None => {
            let pattern = settings
                .input
                .pattern
                .unwrap_or(SyntheticPattern::Noise { seed: 0 });
            let limit = settings.input.frame_limit.unwrap_or(DEFAULT_SYNTHETIC_FRAMES);
            info!(?pattern, frames = limit, "Using synthetic frames");
            (Box::new(SyntheticSource::new(&config, pattern)), Some(limit))
        }
    };

    let registry = MetricsRegistry::new()?;
    #[cfg(feature = "metrics")]
    let _runtime = start_metrics_server(settings.output.metrics_port, &registry)?;

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        if let Err(e) = ctrlc::set_handler(move || running.store(false, Ordering::SeqCst)) {
            warn!("Failed to install Ctrl-C handler: {}", e);
        }
    }

    info!(
        width = config.width,
        height = config.height,
        block_dim = config.block_dim,
        blocks_per_frame = config.interior_blocks(),
        "Processing frames..."
    );

    let mut buffer = FeatureBuffer::new();
    let mut frames_read = 0u64;
    let mut frames_failed = 0u64;
    let mut dump_dir = settings.output.dump_dir.clone();
    let started = Instant::now();

    while running.load(Ordering::SeqCst) {
        if limit.is_some_and(|limit| frames_read >= limit) {
            break;
        }

        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(e @ SourceError::Truncated { .. }) => {
                warn!("Stopping at incomplete frame: {}", e);
                frames_failed += 1;
                break;
            }
            Err(e) => return Err(e.into()),
        };
        frames_read += 1;

        let frame_start = Instant::now();
        match pipeline.extract_frame_features(&frame) {
            Ok(features) => {
                if let Some(dir) = dump_dir.take() {
                    features.dump_planes(&dir)?;
                }
                let blocks = buffer.append_frame(&features);
                debug!(sequence = frame.sequence(), blocks, "Frame done");
            }
            Err(e) => {
                warn!("Frame {}: skipped: {}", frame.sequence(), e);
                frames_failed += 1;
            }
        }

        registry.update(&MetricsSnapshot::from_buffer(
            &buffer,
            frames_failed,
            Some(frame_start.elapsed()),
        ));
    }

    if !running.load(Ordering::SeqCst) {
        warn!("Interrupted, writing partial results");
    }

    info!(
        "Processed {} frames: {} extracted, {} failed, {} vectors in {:.2?}",
        frames_read,
        buffer.frames(),
        frames_failed,
        buffer.vector_count(),
        started.elapsed()
    );

    if let Some(path) = &settings.output.features_path {
        buffer.write_to(path)?;
        info!(path = %path.display(), bytes = buffer.size_bytes(), "Wrote features");
    }

    if let Some(path) = &settings.output.manifest_path {
        FeatureManifest::new(&config, &buffer).write_to(path)?;
        info!(path = %path.display(), "Wrote manifest");
    }

    if let Some(path) = &settings.output.metrics_path {
        std::fs::write(path, registry.encode()?)?;
    }

    info!("Done. Feature digest: {}", buffer.digest().to_hex());
    Ok(())
}

#[cfg(feature = "metrics")]
fn start_metrics_server(
    port: u16,
    registry: &MetricsRegistry,
) -> Result<Option<tokio::runtime::Runtime>, CliError> {
    use artifact_features::metrics::{MetricsServer, MetricsServerConfig};

    if port == 0 {
        return Ok(None);
    }

    let runtime = tokio::runtime::Runtime::new()?;
    let server = MetricsServer::new(MetricsServerConfig::with_port(port), registry.clone());
    runtime.spawn(async move {
        if let Err(e) = server.run().await {
            error!("Metrics server stopped: {}", e);
        }
    });
    Ok(Some(runtime))
}
