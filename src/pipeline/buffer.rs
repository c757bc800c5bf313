//! Accumulated feature vectors and their output sidecar.

use super::FrameFeatures;
use crate::capture::ExtractorConfig;
use crate::features::{FeatureVector, FEATURE_VECTOR_LEN};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Errors writing feature output.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Manifest could not be serialized.
    #[error("Failed to serialize manifest: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Flat buffer of feature vectors, [`FEATURE_VECTOR_LEN`] values each.
///
/// Vectors of successive frames are stored back to back in extraction order.
#[derive(Debug, Clone, Default)]
pub struct FeatureBuffer {
    values: Vec<f32>,
    frames: u64,
}

impl FeatureBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a buffer with room for `frames` frames of the given geometry.
    pub fn with_frame_capacity(config: &ExtractorConfig, frames: usize) -> Self {
        Self {
            values: Vec::with_capacity(config.values_per_frame() * frames),
            frames: 0,
        }
    }

    /// Appends a single vector.
    pub fn push(&mut self, vector: &FeatureVector) {
        self.values.extend_from_slice(vector.as_slice());
    }

    /// Appends every interior block of a frame and counts the frame.
    ///
    /// Returns the number of vectors appended.
    pub fn append_frame(&mut self, features: &FrameFeatures) -> usize {
        self.values.reserve(features.len() * FEATURE_VECTOR_LEN);
        let mut appended = 0;
        for (_, vector) in features {
            self.push(&vector);
            appended += 1;
        }
        self.frames += 1;
        appended
    }

    /// Frames appended through [`Self::append_frame`].
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Number of complete vectors held.
    pub fn vector_count(&self) -> usize {
        self.values.len() / FEATURE_VECTOR_LEN
    }

    /// Number of `f32` values held.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when no values are held.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Size of the serialized buffer in bytes.
    pub fn size_bytes(&self) -> usize {
        self.values.len() * std::mem::size_of::<f32>()
    }

    /// All values in order.
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    /// Iterates over the stored vectors.
    pub fn vectors(&self) -> impl Iterator<Item = &[f32]> + '_ {
        self.values.chunks_exact(FEATURE_VECTOR_LEN)
    }

    /// Drops all values and resets the frame count.
    pub fn clear(&mut self) {
        self.values.clear();
        self.frames = 0;
    }

    /// Writes every value as little-endian `f32`.
    pub fn write_le<W: Write>(&self, mut out: W) -> io::Result<()> {
        let mut bytes = Vec::with_capacity(FEATURE_VECTOR_LEN * 4);
        for vector in self.values.chunks(FEATURE_VECTOR_LEN) {
            bytes.clear();
            for v in vector {
                bytes.extend_from_slice(&v.to_le_bytes());
            }
            out.write_all(&bytes)?;
        }
        out.flush()
    }

    /// Writes the buffer to `path`, replacing any existing file.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), OutputError> {
        let file = File::create(path.as_ref())?;
        self.write_le(BufWriter::new(file))?;
        Ok(())
    }

    /// BLAKE3 hash of the little-endian serialization.
    pub fn digest(&self) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new();
        for v in &self.values {
            hasher.update(&v.to_le_bytes());
        }
        hasher.finalize()
    }
}

/// Sidecar describing a written feature file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureManifest {
    /// Version of the extractor that wrote the file.
    pub version: String,
    /// When the manifest was created.
    pub created_at: DateTime<Utc>,
    /// Frame width in pixels.
    pub width: usize,
    /// Frame height in pixels.
    pub height: usize,
    /// Block side length in pixels.
    pub block_dim: usize,
    /// Frames in the file.
    pub frames: u64,
    /// Vectors per frame.
    pub vectors_per_frame: usize,
    /// Values per vector.
    pub values_per_vector: usize,
    /// Sample encoding of the feature file.
    pub sample_format: String,
    /// Hex BLAKE3 digest of the feature file.
    pub digest: String,
}

impl FeatureManifest {
    /// Describes `buffer` as extracted with `config`.
    pub fn new(config: &ExtractorConfig, buffer: &FeatureBuffer) -> Self {
        Self {
            version: crate::VERSION.to_string(),
            created_at: Utc::now(),
            width: config.width,
            height: config.height,
            block_dim: config.block_dim,
            frames: buffer.frames(),
            vectors_per_frame: config.interior_blocks(),
            values_per_vector: FEATURE_VECTOR_LEN,
            sample_format: "f32le".to_string(),
            digest: buffer.digest().to_hex().to_string(),
        }
    }

    /// Serializes the manifest as TOML.
    pub fn to_toml(&self) -> Result<String, OutputError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Writes the manifest to `path`.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), OutputError> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }
}
