//! Frame sources.
//!
//! Decoding is out of scope: a source only hands over already-decoded luma
//! planes. Real deployments read raw frames written by a decoder; tests,
//! demos and benchmarks use the deterministic synthetic source.

use super::{ExtractorConfig, Frame};
use rand_chacha::ChaCha8Rng;
use rand_core::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur while reading frames.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read frame: {0}")]
    Io(#[from] std::io::Error),
    #[error("truncated frame {sequence}: got {got} of {expected} bytes")]
    Truncated {
        sequence: u64,
        got: usize,
        expected: usize,
    },
    #[error("invalid frame geometry {width}x{height}")]
    InvalidGeometry { width: usize, height: usize },
}

/// Trait for anything that yields decoded frames.
pub trait FrameSource {
    /// Returns the next frame, or `None` at end of stream.
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError>;
}

/// Reads concatenated raw 8-bit luma frames of a fixed size.
pub struct RawFrameReader<R> {
    reader: R,
    width: usize,
    height: usize,
    sequence: u64,
}

impl RawFrameReader<BufReader<File>> {
    /// Opens a raw frame file.
    pub fn open(path: impl AsRef<Path>, width: usize, height: usize) -> Result<Self, SourceError> {
        let file = File::open(path.as_ref())?;
        tracing::info!(path = %path.as_ref().display(), width, height, "Opened raw frame file");
        Self::new(BufReader::new(file), width, height)
    }
}

impl<R: Read> RawFrameReader<R> {
    /// Wraps a reader producing frames of `width * height` bytes.
    pub fn new(reader: R, width: usize, height: usize) -> Result<Self, SourceError> {
        if width == 0 || height == 0 {
            return Err(SourceError::InvalidGeometry { width, height });
        }
        Ok(Self {
            reader,
            width,
            height,
            sequence: 0,
        })
    }

    /// Number of frames read so far.
    pub fn frames_read(&self) -> u64 {
        self.sequence
    }
}

impl<R: Read> FrameSource for RawFrameReader<R> {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        let expected = self.width * self.height;
        let mut pixels = vec![0u8; expected];
        let mut filled = 0;

        while filled < expected {
            match self.reader.read(&mut pixels[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        if filled == 0 {
            return Ok(None);
        }
        if filled < expected {
            return Err(SourceError::Truncated {
                sequence: self.sequence + 1,
                got: filled,
                expected,
            });
        }

        self.sequence += 1;
        Ok(Some(
            Frame::new(pixels, self.width, self.height, self.sequence).with_pts(self.sequence - 1),
        ))
    }
}

/// Content of a synthetic frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyntheticPattern {
    /// Every pixel has the same value.
    Uniform { value: u8 },
    /// Left half 0, right half 255.
    VerticalEdge,
    /// Seeded pseudo-random noise, different for every frame.
    Noise { seed: u64 },
}

impl FromStr for SyntheticPattern {
    type Err = String;

    /// Parses `uniform:<value>`, `edge` or `noise:<seed>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, arg) = match s.split_once(':') {
            Some((kind, arg)) => (kind, Some(arg)),
            None => (s, None),
        };
        match (kind, arg) {
            ("edge", None) => Ok(Self::VerticalEdge),
            ("uniform", Some(v)) => v
                .parse()
                .map(|value| Self::Uniform { value })
                .map_err(|e| format!("invalid uniform value '{}': {}", v, e)),
            ("noise", Some(v)) => v
                .parse()
                .map(|seed| Self::Noise { seed })
                .map_err(|e| format!("invalid noise seed '{}': {}", v, e)),
            _ => Err(format!(
                "unknown pattern '{}' (expected uniform:<value>, edge or noise:<seed>)",
                s
            )),
        }
    }
}

/// Deterministic frame generator.
#[derive(Debug)]
pub struct SyntheticSource {
    pattern: SyntheticPattern,
    width: usize,
    height: usize,
    sequence: u64,
    limit: Option<u64>,
}

impl SyntheticSource {
    /// Creates an unbounded source for the given geometry.
    pub fn new(config: &ExtractorConfig, pattern: SyntheticPattern) -> Self {
        Self {
            pattern,
            width: config.width,
            height: config.height,
            sequence: 0,
            limit: None,
        }
    }

    /// Stops after `limit` frames.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Renders the frame with the given sequence number.
    pub fn render(&self, sequence: u64) -> Frame {
        let (width, height) = (self.width, self.height);
        let pixels = match self.pattern {
            SyntheticPattern::Uniform { value } => vec![value; width * height],
            SyntheticPattern::VerticalEdge => {
                let half = width / 2;
                let row: Vec<u8> = (0..width).map(|c| if c < half { 0 } else { 255 }).collect();
                row.repeat(height)
            }
            SyntheticPattern::Noise { seed } => {
                let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(sequence));
                let mut pixels = vec![0u8; width * height];
                rng.fill_bytes(&mut pixels);
                pixels
            }
        };
        Frame::new(pixels, width, height, sequence)
    }
}

impl FrameSource for SyntheticSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        if self.limit.is_some_and(|limit| self.sequence >= limit) {
            return Ok(None);
        }
        self.sequence += 1;
        Ok(Some(self.render(self.sequence)))
    }
}
