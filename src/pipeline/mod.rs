//! Frame-to-feature orchestration.
//!
//! ```text
//! Frame → EdgeFilter → (vertical, horizontal)
//!       → SummedAreaTable ×2
//!       → BlockFeatureExtractor per interior block (row-major)
//!       → FeatureBuffer
//! ```
//!
//! Planes and tables live in a [`FrameFeatures`] value owned by the caller
//! and are dropped with it. Nothing is shared between frames, so separate
//! frames can be processed on separate threads.

mod buffer;

pub use buffer::{FeatureBuffer, FeatureManifest, OutputError};

use crate::capture::{ConfigError, ExtractorConfig, Frame};
use crate::error::ExtractionError;
use crate::features::{BlockCoordinate, BlockFeatureExtractor, FeatureVector};
use crate::filtering::{EdgeFilter, EdgePlanes, SummedAreaTable};
use std::fs::File;
use std::io::{self, BufWriter};
use std::ops::Range;
use std::path::Path;
use std::time::Instant;

/// Runs filter, SAT construction and block extraction for whole frames.
#[derive(Debug, Clone)]
pub struct FrameFeaturePipeline {
    config: ExtractorConfig,
    filter: EdgeFilter,
}

impl FrameFeaturePipeline {
    /// Creates a pipeline for frames of the configured geometry.
    pub fn new(config: ExtractorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            filter: EdgeFilter::new(),
        })
    }

    /// Returns the geometry this pipeline was built for.
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Filters the frame and builds both summed-area tables.
    ///
    /// The returned value yields one feature vector per interior block,
    /// lazily and as many times as it is iterated.
    pub fn extract_frame_features(&self, frame: &Frame) -> Result<FrameFeatures, ExtractionError> {
        if frame.width() != self.config.width || frame.height() != self.config.height {
            return Err(ExtractionError::invalid(format!(
                "frame {} is {}x{}, pipeline expects {}x{}",
                frame.sequence(),
                frame.width(),
                frame.height(),
                self.config.width,
                self.config.height
            )));
        }

        let start = Instant::now();
        let planes = self.filter.filter(frame)?;
        let filtered = start.elapsed();

        let vertical = SummedAreaTable::build(&planes.vertical)?;
        let horizontal = SummedAreaTable::build(&planes.horizontal)?;

        tracing::trace!(
            sequence = frame.sequence(),
            filter_us = filtered.as_micros() as u64,
            sat_us = (start.elapsed() - filtered).as_micros() as u64,
            "Frame planes prepared"
        );

        Ok(FrameFeatures {
            planes,
            vertical,
            horizontal,
            config: self.config,
            sequence: frame.sequence(),
        })
    }

    /// Extracts every interior block of `frame` and appends it to `buffer`.
    ///
    /// Returns the number of vectors appended. On error nothing is appended.
    pub fn process(&self, frame: &Frame, buffer: &mut FeatureBuffer) -> Result<usize, ExtractionError> {
        let start = Instant::now();
        let features = self.extract_frame_features(frame).map_err(|e| {
            tracing::warn!(sequence = frame.sequence(), error = %e, "Frame rejected");
            e
        })?;
        let appended = buffer.append_frame(&features);

        tracing::debug!(
            sequence = frame.sequence(),
            blocks = appended,
            elapsed_us = start.elapsed().as_micros() as u64,
            "Frame features extracted"
        );
        Ok(appended)
    }
}

/// Filtered planes and tables of one frame, ready for block extraction.
pub struct FrameFeatures {
    planes: EdgePlanes,
    vertical: SummedAreaTable,
    horizontal: SummedAreaTable,
    config: ExtractorConfig,
    sequence: u64,
}

impl FrameFeatures {
    /// Sequence number of the source frame.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Number of interior blocks, i.e. vectors yielded by [`Self::iter`].
    pub fn len(&self) -> usize {
        self.config.interior_blocks()
    }

    /// True when the frame has no interior blocks.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The two difference planes.
    pub fn edge_planes(&self) -> &EdgePlanes {
        &self.planes
    }

    /// Tables of the vertical and horizontal planes, in that order.
    pub fn tables(&self) -> (&SummedAreaTable, &SummedAreaTable) {
        (&self.vertical, &self.horizontal)
    }

    /// Extractor over this frame's tables, for random access to blocks.
    pub fn extractor(&self) -> BlockFeatureExtractor<'_> {
        BlockFeatureExtractor::for_frame(&self.vertical, &self.horizontal, self.config.block_dim)
    }

    /// Interior blocks in row-major order with their feature vectors.
    pub fn iter(&self) -> BlockFeatures<'_> {
        BlockFeatures {
            extractor: self.extractor(),
            rows: 1..self.config.blocks_per_col() - 1,
            cols: 1..self.config.blocks_per_row() - 1,
            row: 1,
            col: 1,
        }
    }

    /// Writes the filtered planes and tables as raw little-endian files.
    ///
    /// Produces `vertical.u8`, `horizontal.u8`, `vertical_sat.u32`,
    /// `vertical_sq_sat.u64`, `horizontal_sat.u32` and `horizontal_sq_sat.u64`.
    ///
    /// The square tables are also written as `*_sq_sat.u32`, truncated to
    /// their low 32 bits. External parity tools that read 32-bit square
    /// tables expect that layout; it wraps on bright, busy frames.
    pub fn dump_planes(&self, dir: impl AsRef<Path>) -> io::Result<()> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let create = |name: &str| File::create(dir.join(name)).map(BufWriter::new);

        self.planes.vertical.write_raw(create("vertical.u8")?)?;
        self.planes.horizontal.write_raw(create("horizontal.u8")?)?;
        self.vertical.sums().write_raw(create("vertical_sat.u32")?)?;
        self.vertical.squares().write_raw(create("vertical_sq_sat.u64")?)?;
        self.horizontal.sums().write_raw(create("horizontal_sat.u32")?)?;
        self.horizontal.squares().write_raw(create("horizontal_sq_sat.u64")?)?;
        self.vertical
            .squares()
            .map(|v| v as u32)
            .write_raw(create("vertical_sq_sat.u32")?)?;
        self.horizontal
            .squares()
            .map(|v| v as u32)
            .write_raw(create("horizontal_sq_sat.u32")?)?;

        tracing::info!(dir = %dir.display(), sequence = self.sequence, "Dumped frame planes");
        Ok(())
    }
}

impl std::fmt::Debug for FrameFeatures {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameFeatures")
            .field("sequence", &self.sequence)
            .field("width", &self.config.width)
            .field("height", &self.config.height)
            .field("blocks", &self.len())
            .finish()
    }
}

impl<'a> IntoIterator for &'a FrameFeatures {
    type Item = (BlockCoordinate, FeatureVector);
    type IntoIter = BlockFeatures<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy row-major iterator over the interior blocks of a frame.
pub struct BlockFeatures<'a> {
    extractor: BlockFeatureExtractor<'a>,
    rows: Range<usize>,
    cols: Range<usize>,
    row: usize,
    col: usize,
}

impl BlockFeatures<'_> {
    fn remaining(&self) -> usize {
        if self.row >= self.rows.end {
            return 0;
        }
        let rows_after = self.rows.end - self.row - 1;
        (self.cols.end - self.col) + rows_after * self.cols.len()
    }
}

impl Iterator for BlockFeatures<'_> {
    type Item = (BlockCoordinate, FeatureVector);

    fn next(&mut self) -> Option<Self::Item> {
        if self.row >= self.rows.end || self.cols.is_empty() {
            return None;
        }

        let block = BlockCoordinate::new(self.row, self.col);
        self.col += 1;
        if self.col >= self.cols.end {
            self.col = self.cols.start;
            self.row += 1;
        }

        Some((block, self.extractor.extract_within(block)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = if self.cols.is_empty() { 0 } else { self.remaining() };
        (n, Some(n))
    }
}

impl ExactSizeIterator for BlockFeatures<'_> {}
