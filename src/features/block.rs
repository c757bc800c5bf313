//! Per-block feature extraction over a pair of summed-area tables.

use super::border::{BlockRect, BorderStatistics, Moments};
use super::vector::{
    Border, Direction, FeatureVector, BODY_VALUES, FEATURE_VECTOR_LEN, MAX_HALF_DEPTH,
    VALUES_PER_BORDER,
};
use crate::error::ExtractionError;
use crate::filtering::SummedAreaTable;

/// Identifies a block by its position in the block grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockCoordinate {
    /// Block row.
    pub row: usize,
    /// Block column.
    pub col: usize,
}

impl BlockCoordinate {
    /// Block at grid position `(row, col)`.
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Pixel `(row, col)` of the block's top-left corner.
    ///
    /// Overflows for indices far outside any frame; check with
    /// [`BlockFeatureExtractor::contains`] first.
    #[inline]
    pub fn top_left(&self, block_dim: usize) -> (usize, usize) {
        (self.row * block_dim, self.col * block_dim)
    }
}

/// Computes the 132-value feature vector of a block.
///
/// Borrows the vertical and horizontal tables of one frame; extraction
/// only reads them, so blocks can be processed in any order.
#[derive(Debug, Clone, Copy)]
pub struct BlockFeatureExtractor<'a> {
    vertical: &'a SummedAreaTable,
    horizontal: &'a SummedAreaTable,
    block_dim: usize,
}

impl<'a> BlockFeatureExtractor<'a> {
    /// Creates an extractor over the tables of one frame.
    ///
    /// Both tables must come from planes of the same size.
    pub fn new(
        vertical: &'a SummedAreaTable,
        horizontal: &'a SummedAreaTable,
        block_dim: usize,
    ) -> Result<Self, ExtractionError> {
        if block_dim == 0 {
            return Err(ExtractionError::invalid("block dimension is zero"));
        }
        if vertical.width() != horizontal.width() || vertical.height() != horizontal.height() {
            return Err(ExtractionError::invalid(format!(
                "table size mismatch: vertical {}x{}, horizontal {}x{}",
                vertical.width(),
                vertical.height(),
                horizontal.width(),
                horizontal.height()
            )));
        }
        Ok(Self {
            vertical,
            horizontal,
            block_dim,
        })
    }

    /// Extractor over tables built by the pipeline from one frame.
    pub(crate) fn for_frame(
        vertical: &'a SummedAreaTable,
        horizontal: &'a SummedAreaTable,
        block_dim: usize,
    ) -> Self {
        debug_assert_eq!(vertical.width(), horizontal.width());
        debug_assert_eq!(vertical.height(), horizontal.height());
        Self {
            vertical,
            horizontal,
            block_dim,
        }
    }

    /// Block side length in pixels.
    #[inline]
    pub fn block_dim(&self) -> usize {
        self.block_dim
    }

    /// True when every border window of `block` lies inside the planes.
    pub fn contains(&self, block: BlockCoordinate) -> bool {
        // Grid index to pixel span [start - 8, start + dim + 8), overflow
        // counts as outside.
        let fits = |index: usize, extent: usize| {
            index
                .checked_mul(self.block_dim)
                .filter(|&start| start >= MAX_HALF_DEPTH)
                .and_then(|start| start.checked_add(self.block_dim + MAX_HALF_DEPTH))
                .is_some_and(|end| end <= extent)
        };
        fits(block.row, self.vertical.height()) && fits(block.col, self.vertical.width())
    }

    /// Extracts the feature vector of `block`.
    ///
    /// Fails with [`ExtractionError::Bounds`] if a border window would leave
    /// the plane; the outermost ring of blocks never qualifies.
    pub fn extract(&self, block: BlockCoordinate) -> Result<FeatureVector, ExtractionError> {
        self.check(block)?;
        Ok(self.extract_within(block))
    }

    /// Statistics of one border of `block` on one plane.
    pub fn border_statistics(
        &self,
        block: BlockCoordinate,
        direction: Direction,
        border: Border,
    ) -> Result<BorderStatistics, ExtractionError> {
        self.check(block)?;
        Ok(BorderStatistics::compute(
            self.table(direction),
            border,
            self.rect(block),
        ))
    }

    /// Extracts a block already known to be inside the planes.
    pub(crate) fn extract_within(&self, block: BlockCoordinate) -> FeatureVector {
        let rect = self.rect(block);
        let body_count = self.block_dim * self.block_dim;

        let mut values = [0f32; FEATURE_VECTOR_LEN];
        let mut slot = BODY_VALUES;

        for (i, direction) in Direction::ALL.into_iter().enumerate() {
            let sat = self.table(direction);
            let body = Moments::from_sums(sat.window_within(rect.rows(), rect.cols()), body_count);
            values[2 * i] = body.mean as f32;
            values[2 * i + 1] = body.variance as f32;

            for border in Border::ALL {
                let stats = BorderStatistics::compute(sat, border, rect);
                values[slot..slot + VALUES_PER_BORDER].copy_from_slice(&stats.values(&body));
                slot += VALUES_PER_BORDER;
            }
        }

        debug_assert_eq!(slot, FEATURE_VECTOR_LEN);
        FeatureVector::from_array(values)
    }

    fn check(&self, block: BlockCoordinate) -> Result<(), ExtractionError> {
        if self.contains(block) {
            Ok(())
        } else {
            Err(ExtractionError::Bounds {
                row: block.row,
                col: block.col,
                width: self.vertical.width(),
                height: self.vertical.height(),
            })
        }
    }

    #[inline]
    fn table(&self, direction: Direction) -> &'a SummedAreaTable {
        match direction {
            Direction::Vertical => self.vertical,
            Direction::Horizontal => self.horizontal,
        }
    }

    #[inline]
    fn rect(&self, block: BlockCoordinate) -> BlockRect {
        let (top, left) = block.top_left(self.block_dim);
        BlockRect {
            top,
            left,
            dim: self.block_dim,
        }
    }
}

/// Extracts one block's features from the tables of a frame.
pub fn extract_block_features(
    vertical: &SummedAreaTable,
    horizontal: &SummedAreaTable,
    block: BlockCoordinate,
    block_dim: usize,
) -> Result<FeatureVector, ExtractionError> {
    BlockFeatureExtractor::new(vertical, horizontal, block_dim)?.extract(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{BorderStat, FeatureLayout, HALF_DEPTHS, SCALES};
    use crate::filtering::Plane;
    use proptest::prelude::*;
    use std::ops::Range;

    const DIM: usize = 16;

    fn tables(vertical: &Plane<u8>, horizontal: &Plane<u8>) -> (SummedAreaTable, SummedAreaTable) {
        (
            SummedAreaTable::build(vertical).unwrap(),
            SummedAreaTable::build(horizontal).unwrap(),
        )
    }

    fn pseudo_random_plane(width: usize, height: usize, salt: usize) -> Plane<u8> {
        let data = (0..width * height)
            .map(|i| ((i * 2654435761 + salt * 40503) >> 7) as u8)
            .collect();
        Plane::from_vec(data, width, height).unwrap()
    }

    /// Direct loop over the plane, no prefix sums.
    fn naive_moments(plane: &Plane<u8>, rows: Range<usize>, cols: Range<usize>) -> Moments {
        let (mut sum, mut sum_sq, mut n) = (0u64, 0u64, 0usize);
        for r in rows {
            for c in cols.clone() {
                let v = u64::from(plane.at(r, c));
                sum += v;
                sum_sq += v * v;
                n += 1;
            }
        }
        let mean = sum as f64 / n as f64;
        Moments {
            mean,
            variance: sum_sq as f64 / n as f64 - mean * mean,
        }
    }

    /// Straightforward rendition of the layout, window by window.
    fn naive_features(vertical: &Plane<u8>, horizontal: &Plane<u8>, block: BlockCoordinate) -> Vec<f32> {
        let (i1, j1) = block.top_left(DIM);
        let (i2, j2) = (i1 + DIM, j1 + DIM);

        let vbody = naive_moments(vertical, i1..i2, j1..j2);
        let hbody = naive_moments(horizontal, i1..i2, j1..j2);
        let mut out = vec![
            vbody.mean as f32,
            vbody.variance as f32,
            hbody.mean as f32,
            hbody.variance as f32,
        ];

        for (plane, body) in [(vertical, vbody), (horizontal, hbody)] {
            let windows = |d: usize| {
                [
                    (i1..i2, j1 - d..j1 + d),
                    (i1 - d..i1 + d, j1..j2),
                    (i1..i2, j2 - d..j2 + d),
                    (i2 - d..i2 + d, j1..j2),
                ]
            };
            for border in 0..4 {
                let ms: Vec<Moments> = HALF_DEPTHS
                    .iter()
                    .map(|&d| {
                        let (rows, cols) = windows(d)[border].clone();
                        naive_moments(plane, rows, cols)
                    })
                    .collect();
                out.extend(ms.iter().map(|m| m.mean as f32));
                out.extend(ms.iter().map(|m| m.variance as f32));
                out.extend(ms.iter().map(|m| (m.mean - body.mean) as f32));
                out.extend(ms.iter().map(|m| (m.variance - body.variance) as f32));
            }
        }
        out
    }

    #[test]
    fn test_matches_naive_window_statistics() {
        let vertical = pseudo_random_plane(80, 64, 1);
        let horizontal = pseudo_random_plane(80, 64, 2);
        let (vsat, hsat) = tables(&vertical, &horizontal);
        let extractor = BlockFeatureExtractor::new(&vsat, &hsat, DIM).unwrap();

        for row in 1..3 {
            for col in 1..4 {
                let block = BlockCoordinate::new(row, col);
                let features = extractor.extract(block).unwrap();
                let expected = naive_features(&vertical, &horizontal, block);

                assert_eq!(features.as_slice(), expected.as_slice(), "block {:?}", block);
            }
        }
    }

    #[test]
    fn test_uniform_planes_give_zero_vector() {
        let flat = Plane::<u8>::new(48, 48);
        let (vsat, hsat) = tables(&flat, &flat);

        let features = extract_block_features(&vsat, &hsat, BlockCoordinate::new(1, 1), DIM).unwrap();

        assert_eq!(features.len(), FEATURE_VECTOR_LEN);
        assert!(features.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_outer_ring_is_out_of_bounds() {
        let flat = Plane::<u8>::new(64, 48);
        let (vsat, hsat) = tables(&flat, &flat);
        let extractor = BlockFeatureExtractor::new(&vsat, &hsat, DIM).unwrap();

        for block in [
            BlockCoordinate::new(0, 1),
            BlockCoordinate::new(1, 0),
            BlockCoordinate::new(2, 1),
            BlockCoordinate::new(1, 3),
            BlockCoordinate::new(9, 9),
        ] {
            assert!(!extractor.contains(block));
            assert!(matches!(
                extractor.extract(block),
                Err(ExtractionError::Bounds { width: 64, height: 48, .. })
            ));
        }
        assert!(extractor.contains(BlockCoordinate::new(1, 2)));
    }

    #[test]
    fn test_huge_block_index_is_out_of_bounds() {
        let mut vertical = Plane::<u8>::new(48, 48);
        vertical.row_mut(20).fill(200);
        let (vsat, hsat) = tables(&vertical, &Plane::new(48, 48));
        let extractor = BlockFeatureExtractor::new(&vsat, &hsat, DIM).unwrap();

        // row * 16 wraps around to 16, the pixel row of block (1, 1)
        let wrapping = usize::MAX / DIM + 2;
        for block in [
            BlockCoordinate::new(wrapping, 1),
            BlockCoordinate::new(1, wrapping),
            BlockCoordinate::new(usize::MAX, usize::MAX),
        ] {
            assert!(!extractor.contains(block));
            assert!(matches!(
                extractor.extract(block),
                Err(ExtractionError::Bounds { width: 48, height: 48, .. })
            ));
            assert!(extractor
                .border_statistics(block, Direction::Vertical, Border::Top)
                .is_err());
        }
        assert!(extractor.extract(BlockCoordinate::new(1, 1)).is_ok());
    }

    #[test]
    fn test_mismatched_tables_rejected() {
        let (a, b) = tables(&Plane::new(48, 48), &Plane::new(64, 48));
        assert!(matches!(
            BlockFeatureExtractor::new(&a, &b, DIM),
            Err(ExtractionError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_hot_pixel_only_touches_nearest_border() {
        // One strong step just inside the top edge of block (1, 1).
        let mut vertical = Plane::<u8>::new(48, 48);
        vertical.row_mut(16)[20] = 255;
        let horizontal = Plane::<u8>::new(48, 48);
        let (vsat, hsat) = tables(&vertical, &horizontal);

        let features = extract_block_features(&vsat, &hsat, BlockCoordinate::new(1, 1), DIM).unwrap();
        let top = FeatureLayout::index(Direction::Vertical, Border::Top, BorderStat::Mean, 0);
        let bottom = FeatureLayout::index(Direction::Vertical, Border::Bottom, BorderStat::Mean, 0);
        let left = FeatureLayout::index(Direction::Vertical, Border::Left, BorderStat::Mean, 0);

        assert_eq!(features[top], 255.0 / 32.0);
        assert_eq!(features[bottom], 0.0);
        assert_eq!(features[left], 0.0);
        assert_eq!(features.block_mean(Direction::Vertical), 255.0 / 256.0);
        assert_eq!(features.block_mean(Direction::Horizontal), 0.0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_deeper_windows_contain_shallower(
            data in proptest::collection::vec(any::<u8>(), 64 * 64),
            row in 1usize..3,
            col in 1usize..3,
        ) {
            let plane = Plane::from_vec(data, 64, 64).unwrap();
            let sat = SummedAreaTable::build(&plane).unwrap();
            let extractor = BlockFeatureExtractor::new(&sat, &sat, DIM).unwrap();
            let block = BlockCoordinate::new(row, col);

            for border in Border::ALL {
                let stats = extractor
                    .border_statistics(block, Direction::Vertical, border)
                    .unwrap();
                for scale in 1..SCALES {
                    prop_assert!(stats.sums[scale].sum >= stats.sums[scale - 1].sum);
                    prop_assert!(stats.sums[scale].sum_sq >= stats.sums[scale - 1].sum_sq);
                }
            }

            let features = extractor.extract(block).unwrap();
            prop_assert_eq!(features.len(), FEATURE_VECTOR_LEN);
        }
    }
}
