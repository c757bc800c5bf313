//! Frame input and extraction geometry.
//!
//! This module provides the frame type, the configuration that fixes
//! frame and block dimensions, and sources that hand decoded luma
//! planes to the pipeline. Decoding itself happens elsewhere.

mod config;
mod frame;
mod source;

pub use config::{ConfigError, ExtractorConfig, FileConfig, InputConfig, OutputConfig};
pub use frame::Frame;
pub use source::{FrameSource, RawFrameReader, SourceError, SyntheticPattern, SyntheticSource};
