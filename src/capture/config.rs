//! Extraction geometry and file configuration.
//!
//! Frame size and block dimension are explicit parameters rather than
//! constants so the pipeline is independent of the deployment's frame size.

use super::SyntheticPattern;
use crate::features::MAX_HALF_DEPTH;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Geometry of the frames fed to the feature pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Frame width in pixels.
    pub width: usize,
    /// Frame height in pixels.
    pub height: usize,
    /// Side length of a square block in pixels.
    pub block_dim: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            block_dim: 16,
        }
    }
}

impl ExtractorConfig {
    /// Creates a configuration with the default 16 pixel block.
    pub fn with_dimensions(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Validates the geometry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if self.block_dim < MAX_HALF_DEPTH {
            return Err(ConfigError::BlockTooSmall {
                block_dim: self.block_dim,
                min: MAX_HALF_DEPTH,
            });
        }
        if self.width % self.block_dim != 0 || self.height % self.block_dim != 0 {
            return Err(ConfigError::NotBlockAligned {
                width: self.width,
                height: self.height,
                block_dim: self.block_dim,
            });
        }
        if self.blocks_per_row() < 3 || self.blocks_per_col() < 3 {
            return Err(ConfigError::NoInteriorBlocks);
        }
        // The first-order SAT is 32-bit.
        let max_sum = (self.width as u64) * (self.height as u64) * u64::from(u8::MAX);
        if max_sum > u64::from(u32::MAX) {
            return Err(ConfigError::FrameTooLarge {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    /// Number of blocks along one row of the frame.
    #[inline]
    pub fn blocks_per_row(&self) -> usize {
        self.width / self.block_dim
    }

    /// Number of blocks along one column of the frame.
    #[inline]
    pub fn blocks_per_col(&self) -> usize {
        self.height / self.block_dim
    }

    /// Number of blocks that receive a feature vector (outer ring excluded).
    #[inline]
    pub fn interior_blocks(&self) -> usize {
        self.blocks_per_row().saturating_sub(2) * self.blocks_per_col().saturating_sub(2)
    }

    /// Number of feature values produced for one frame.
    #[inline]
    pub fn values_per_frame(&self) -> usize {
        self.interior_blocks() * crate::features::FEATURE_VECTOR_LEN
    }

    /// Number of bytes in one raw frame.
    #[inline]
    pub fn frame_bytes(&self) -> usize {
        self.width * self.height
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid frame dimensions")]
    InvalidDimensions,
    #[error("block dimension {block_dim} is smaller than the deepest border window ({min} px)")]
    BlockTooSmall { block_dim: usize, min: usize },
    #[error("frame {width}x{height} is not a multiple of the {block_dim} px block")]
    NotBlockAligned {
        width: usize,
        height: usize,
        block_dim: usize,
    },
    #[error("frame has no interior blocks (need at least 3 blocks per axis)")]
    NoInteriorBlocks,
    #[error("frame {width}x{height} overflows the 32-bit summed-area table")]
    FrameTooLarge { width: usize, height: usize },
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub extractor: ExtractorConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Where frames come from.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InputConfig {
    /// File of concatenated raw luma frames.
    pub path: Option<PathBuf>,
    /// Stop after this many frames.
    pub frame_limit: Option<u64>,
    /// Synthetic pattern used when no path is given.
    pub pattern: Option<SyntheticPattern>,
}

/// Where results go.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Flat little-endian f32 feature buffer.
    pub features_path: Option<PathBuf>,
    /// TOML manifest describing the feature buffer.
    pub manifest_path: Option<PathBuf>,
    /// Directory for first-frame plane dumps.
    pub dump_dir: Option<PathBuf>,
    /// Prometheus text file written when the run ends.
    pub metrics_path: Option<PathBuf>,
    /// Metrics server port (0 to disable).
    pub metrics_port: u16,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            features_path: None,
            manifest_path: None,
            dump_dir: None,
            metrics_path: None,
            metrics_port: 0,
        }
    }
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.extractor.validate()?;
        Ok(config)
    }
}
