//! Prometheus metrics for feature extraction.
//!
//! # Metrics Exposed
//!
//! - `artifact_features_frames_processed_total` - Frames whose features were extracted
//! - `artifact_features_frames_failed_total` - Frames rejected by the pipeline
//! - `artifact_features_blocks_extracted_total` - Feature vectors extracted
//! - `artifact_features_feature_buffer_bytes` - Current feature buffer size
//! - `artifact_features_last_frame_seconds` - Processing time of the latest frame
//! - `artifact_features_consecutive_failures` - Rejected frames since the last good one
//!
//! With the `metrics` feature an HTTP server exposes them on `/metrics`, and
//! `/health` answers 503 with a JSON [`HealthReport`] once the failure streak
//! exceeds the configured limit.
//!
//! # Example
//!
//! ```no_run
//! use artifact_features::metrics::{MetricsRegistry, MetricsSnapshot};
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//!
//! let snapshot = MetricsSnapshot {
//!     frames_processed: 120,
//!     frames_failed: 1,
//!     blocks_extracted: 120 * 3354,
//!     buffer_bytes: 120 * 3354 * 132 * 4,
//!     last_frame_seconds: Some(0.004),
//! };
//!
//! registry.update(&snapshot);
//! ```

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{HealthReport, MetricsError, MetricsRegistry, MetricsSnapshot};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, ServerError};
