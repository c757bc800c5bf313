//! Artifact Feature Extraction Library
//!
//! Computes per-macroblock edge statistics from decoded 8-bit luma frames.
//! The features feed a classifier that flags blocks damaged by packet loss
//! during video decoding.
//!
//! # Architecture
//!
//! The system follows an explicit data flow:
//!
//! ```text
//! capture → filtering → features → pipeline
//!  frame    |Δrow|,|Δcol|   132 values   flat f32 buffer
//!           + SATs          per block
//! ```
//!
//! Every interior block (all but the outermost ring) yields 132 values:
//! body mean and variance of both difference planes, then mean, variance
//! and their deltas to the body for four window depths on each of the four
//! borders of each plane. See [`features::FeatureLayout`] for the order.
//!
//! # Example
//!
//! ```no_run
//! use artifact_features::{
//!     capture::{ExtractorConfig, SyntheticPattern, SyntheticSource},
//!     pipeline::{FeatureBuffer, FrameFeaturePipeline},
//! };
//!
//! let config = ExtractorConfig::default();
//! let pipeline = FrameFeaturePipeline::new(config).unwrap();
//! let source = SyntheticSource::new(&config, SyntheticPattern::Noise { seed: 7 });
//!
//! let mut buffer = FeatureBuffer::new();
//! for seq in 1..=10 {
//!     pipeline.process(&source.render(seq), &mut buffer).unwrap();
//! }
//!
//! // 78 x 43 interior blocks per 1280x720 frame
//! assert_eq!(buffer.vector_count(), 10 * 3354);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod capture;
pub mod error;
pub mod features;
pub mod filtering;
pub mod metrics;
pub mod pipeline;

// Re-export commonly used types at crate root
pub use capture::{ExtractorConfig, Frame, FrameSource};
pub use error::ExtractionError;
pub use features::{BlockCoordinate, BlockFeatureExtractor, FeatureVector, FEATURE_VECTOR_LEN};
pub use filtering::{EdgeFilter, SummedAreaTable};
pub use pipeline::{FeatureBuffer, FrameFeaturePipeline, FrameFeatures};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
