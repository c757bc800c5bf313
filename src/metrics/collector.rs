//! Metrics collection and registry.

use crate::pipeline::FeatureBuffer;
use prometheus::{Encoder, Gauge, IntCounter, IntGauge, Registry, TextEncoder};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Registration or encoding failed.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of extraction progress for a metrics update.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Frames whose features were extracted.
    pub frames_processed: u64,
    /// Frames rejected by the pipeline.
    pub frames_failed: u64,
    /// Feature vectors extracted in total.
    pub blocks_extracted: u64,
    /// Current size of the feature buffer in bytes.
    pub buffer_bytes: usize,
    /// Wall-clock time of the most recent frame.
    pub last_frame_seconds: Option<f64>,
}

impl MetricsSnapshot {
    /// Creates a snapshot from the current feature buffer.
    pub fn from_buffer(buffer: &FeatureBuffer, frames_failed: u64, last_frame: Option<Duration>) -> Self {
        Self {
            frames_processed: buffer.frames(),
            frames_failed,
            blocks_extracted: buffer.vector_count() as u64,
            buffer_bytes: buffer.size_bytes(),
            last_frame_seconds: last_frame.map(|d| d.as_secs_f64()),
        }
    }
}

/// Pipeline state as reported by the health endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    /// False once too many frames in a row were rejected.
    pub healthy: bool,
    /// Frames whose features were extracted.
    pub frames_processed: u64,
    /// Frames rejected by the pipeline.
    pub frames_failed: u64,
    /// Rejected frames since the last extracted one.
    pub consecutive_failures: u64,
}

/// Prometheus metrics registry for feature extraction.
///
/// Clones share the same underlying metrics.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,

    frames_processed: IntCounter,
    frames_failed: IntCounter,
    blocks_extracted: IntCounter,

    buffer_bytes: IntGauge,
    last_frame_seconds: Gauge,
    consecutive_failures: IntGauge,
}

impl MetricsRegistry {
    /// Creates a new registry with all extraction metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let frames_processed = IntCounter::new(
            "artifact_features_frames_processed_total",
            "Total number of frames whose features were extracted",
        )?;
        let frames_failed = IntCounter::new(
            "artifact_features_frames_failed_total",
            "Total number of frames rejected by the pipeline",
        )?;
        let blocks_extracted = IntCounter::new(
            "artifact_features_blocks_extracted_total",
            "Total number of block feature vectors extracted",
        )?;
        let buffer_bytes = IntGauge::new(
            "artifact_features_feature_buffer_bytes",
            "Current size of the feature buffer in bytes",
        )?;
        let last_frame_seconds = Gauge::new(
            "artifact_features_last_frame_seconds",
            "Processing time of the most recent frame",
        )?;
        let consecutive_failures = IntGauge::new(
            "artifact_features_consecutive_failures",
            "Frames rejected since the last successfully extracted frame",
        )?;

        registry.register(Box::new(frames_processed.clone()))?;
        registry.register(Box::new(frames_failed.clone()))?;
        registry.register(Box::new(blocks_extracted.clone()))?;
        registry.register(Box::new(buffer_bytes.clone()))?;
        registry.register(Box::new(last_frame_seconds.clone()))?;
        registry.register(Box::new(consecutive_failures.clone()))?;

        Ok(Self {
            registry,
            frames_processed,
            frames_failed,
            blocks_extracted,
            buffer_bytes,
            last_frame_seconds,
            consecutive_failures,
        })
    }

    /// Updates all metrics from a snapshot.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        // An extracted frame ends a failure streak; failures seen in the same
        // snapshot start a new one.
        if advance(&self.frames_processed, snapshot.frames_processed) > 0 {
            self.consecutive_failures.set(0);
        }
        let failed = advance(&self.frames_failed, snapshot.frames_failed);
        self.consecutive_failures.add(failed as i64);
        advance(&self.blocks_extracted, snapshot.blocks_extracted);

        self.buffer_bytes.set(snapshot.buffer_bytes as i64);
        if let Some(secs) = snapshot.last_frame_seconds {
            self.last_frame_seconds.set(secs);
        }
    }

    /// Summarizes extraction progress. Unhealthy once more than
    /// `max_consecutive_failures` frames in a row were rejected.
    pub fn health(&self, max_consecutive_failures: u64) -> HealthReport {
        let consecutive_failures = self.consecutive_failures.get().max(0) as u64;
        HealthReport {
            healthy: consecutive_failures <= max_consecutive_failures,
            frames_processed: self.frames_processed.get(),
            frames_failed: self.frames_failed.get(),
            consecutive_failures,
        }
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Moves a counter up to `total`, returning the increment.
fn advance(counter: &IntCounter, total: u64) -> u64 {
    let delta = total.saturating_sub(counter.get());
    if delta > 0 {
        counter.inc_by(delta);
    }
    delta
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{ExtractorConfig, SyntheticPattern, SyntheticSource};
    use crate::pipeline::FrameFeaturePipeline;

    #[test]
    fn test_registry_creation() {
        let registry = MetricsRegistry::new();
        assert!(registry.is_ok());
    }

    #[test]
    fn test_metrics_update() {
        let registry = MetricsRegistry::new().unwrap();

        let snapshot = MetricsSnapshot {
            frames_processed: 4,
            frames_failed: 1,
            blocks_extracted: 8,
            buffer_bytes: 4224,
            last_frame_seconds: Some(0.5),
        };
        registry.update(&snapshot);

        let output = registry.encode().unwrap();
        assert!(output.contains("artifact_features_frames_processed_total 4"));
        assert!(output.contains("artifact_features_frames_failed_total 1"));
        assert!(output.contains("artifact_features_feature_buffer_bytes 4224"));
        assert!(output.contains("artifact_features_last_frame_seconds 0.5"));
    }

    #[test]
    fn test_counters_never_decrease() {
        let registry = MetricsRegistry::new().unwrap();
        registry.update(&MetricsSnapshot {
            frames_processed: 10,
            ..Default::default()
        });
        registry.update(&MetricsSnapshot {
            frames_processed: 3,
            ..Default::default()
        });

        let output = registry.encode().unwrap();
        assert!(output.contains("artifact_features_frames_processed_total 10"));
    }

    #[test]
    fn test_snapshot_from_buffer() {
        let config = ExtractorConfig::with_dimensions(64, 48);
        let pipeline = FrameFeaturePipeline::new(config).unwrap();
        let source = SyntheticSource::new(&config, SyntheticPattern::Uniform { value: 9 });
        let mut buffer = FeatureBuffer::new();
        pipeline.process(&source.render(1), &mut buffer).unwrap();

        let snapshot = MetricsSnapshot::from_buffer(&buffer, 2, Some(Duration::from_millis(250)));

        assert_eq!(snapshot.frames_processed, 1);
        assert_eq!(snapshot.frames_failed, 2);
        assert_eq!(snapshot.blocks_extracted, 2);
        assert_eq!(snapshot.buffer_bytes, 2 * 132 * 4);
        assert_eq!(snapshot.last_frame_seconds, Some(0.25));
    }

    #[test]
    fn test_failure_streak_drives_health() {
        let registry = MetricsRegistry::new().unwrap();
        let snapshot = |frames_processed, frames_failed| MetricsSnapshot {
            frames_processed,
            frames_failed,
            ..Default::default()
        };

        registry.update(&snapshot(5, 0));
        assert!(registry.health(2).healthy);

        registry.update(&snapshot(5, 1));
        registry.update(&snapshot(5, 2));
        assert_eq!(registry.health(2).consecutive_failures, 2);
        assert!(registry.health(2).healthy);

        registry.update(&snapshot(5, 3));
        let report = registry.health(2);
        assert!(!report.healthy);
        assert_eq!(report.frames_processed, 5);
        assert_eq!(report.frames_failed, 3);

        registry.update(&snapshot(6, 3));
        assert_eq!(registry.health(2).consecutive_failures, 0);
        assert!(registry.health(2).healthy);

        let output = registry.encode().unwrap();
        assert!(output.contains("artifact_features_consecutive_failures 0"));
    }

    #[test]
    fn test_metrics_encode() {
        let registry = MetricsRegistry::new().unwrap();
        let output = registry.encode().unwrap();

        assert!(output.contains("artifact_features_blocks_extracted_total"));
        assert!(output.contains("artifact_features_feature_buffer_bytes"));
    }
}
