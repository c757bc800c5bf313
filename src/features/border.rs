//! Multi-scale statistics along one block border.
//!
//! Each border gets four windows, one block-length long and 2, 4, 8 and 16
//! pixels deep, straddling the edge. Offsets are taken relative to the edge
//! coordinate (first column of the block for `Left`, first column past the
//! block for `Right`, and likewise in rows for `Top` and `Bottom`):
//!
//! ```text
//! depth  2: taps {0, -1}
//! depth  4: adds {1, -2}
//! depth  8: adds {2, 3, -3, -4}
//! depth 16: adds {4..7, -5..-8}
//! ```
//!
//! The strips are accumulated in that order, so every deeper window
//! contains the shallower one.

use super::vector::{Border, HALF_DEPTHS, SCALES, VALUES_PER_BORDER};
use crate::filtering::{SummedAreaTable, WindowSums};
use std::ops::Range;

/// Mean and population variance of a window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Moments {
    /// `sum / n`.
    pub mean: f64,
    /// `sum_sq / n - mean²`. Not clamped; rounding may leave it slightly negative.
    pub variance: f64,
}

impl Moments {
    /// Derives moments from window sums over `count` samples.
    #[inline]
    pub fn from_sums(sums: WindowSums, count: usize) -> Self {
        let n = count as f64;
        let mean = sums.sum as f64 / n;
        let variance = sums.sum_sq as f64 / n - mean * mean;
        Self { mean, variance }
    }
}

/// Geometry of a block within a plane, in pixels.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BlockRect {
    pub top: usize,
    pub left: usize,
    pub dim: usize,
}

impl BlockRect {
    #[inline]
    pub fn rows(&self) -> Range<usize> {
        self.top..self.top + self.dim
    }

    #[inline]
    pub fn cols(&self) -> Range<usize> {
        self.left..self.left + self.dim
    }
}

/// Window sums and moments of one border at every depth.
#[derive(Debug, Clone)]
pub struct BorderStatistics {
    /// Accumulated sums, shallowest first.
    pub sums: [WindowSums; SCALES],
    /// Moments derived from `sums`.
    pub moments: [Moments; SCALES],
}

impl BorderStatistics {
    /// Computes the four windows of `border`.
    ///
    /// The caller guarantees that every window lies inside the table.
    pub(crate) fn compute(sat: &SummedAreaTable, border: Border, block: BlockRect) -> Self {
        let edge = match border {
            Border::Left => block.left,
            Border::Right => block.left + block.dim,
            Border::Top => block.top,
            Border::Bottom => block.top + block.dim,
        };

        // Perpendicular offsets [lo, hi) from the edge, as absolute coordinates.
        let strip = |lo: usize, hi: usize| -> WindowSums {
            match border {
                Border::Left | Border::Right => sat.window_within(block.rows(), lo..hi),
                Border::Top | Border::Bottom => sat.window_within(lo..hi, block.cols()),
            }
        };

        let mut sums = [WindowSums::default(); SCALES];
        let mut moments = [Moments::default(); SCALES];
        let mut acc = WindowSums::default();
        let mut prev = 0;

        for (scale, &half) in HALF_DEPTHS.iter().enumerate() {
            // Inside taps [prev, half), outside taps [-half, -prev).
            acc += strip(edge + prev, edge + half);
            acc += strip(edge - half, edge - prev);
            prev = half;

            sums[scale] = acc;
            moments[scale] = Moments::from_sums(acc, block.dim * 2 * half);
        }

        Self { sums, moments }
    }

    /// The border's 16 feature values relative to the block body.
    pub fn values(&self, body: &Moments) -> [f32; VALUES_PER_BORDER] {
        let mut out = [0f32; VALUES_PER_BORDER];
        for (scale, m) in self.moments.iter().enumerate() {
            out[scale] = m.mean as f32;
            out[SCALES + scale] = m.variance as f32;
            out[2 * SCALES + scale] = (m.mean - body.mean) as f32;
            out[3 * SCALES + scale] = (m.variance - body.variance) as f32;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filtering::Plane;

    const DIM: usize = 16;

    /// 48x48 plane with the single interior block at (16, 16).
    fn sat_with(pixels: &[(usize, usize, u8)]) -> SummedAreaTable {
        let mut plane = Plane::<u8>::new(48, 48);
        for &(r, c, v) in pixels {
            plane.row_mut(r)[c] = v;
        }
        SummedAreaTable::build(&plane).unwrap()
    }

    fn block() -> BlockRect {
        BlockRect {
            top: 16,
            left: 16,
            dim: DIM,
        }
    }

    /// Depth index at which a tap at `offset` from the edge first counts.
    fn first_scale(offset: isize) -> usize {
        HALF_DEPTHS
            .iter()
            .position(|&h| offset >= -(h as isize) && offset < h as isize)
            .unwrap()
    }

    #[test]
    fn test_tap_pattern_left_border() {
        for offset in -8isize..8 {
            let col = (16 + offset) as usize;
            let sat = sat_with(&[(20, col, 100)]);
            let stats = BorderStatistics::compute(&sat, Border::Left, block());

            let first = first_scale(offset);
            for scale in 0..SCALES {
                let expected = if scale >= first { 100 } else { 0 };
                assert_eq!(stats.sums[scale].sum, expected, "offset {offset} scale {scale}");
            }
        }
    }

    #[test]
    fn test_tap_pattern_bottom_border() {
        // Bottom edge coordinate is row 32, the first row past the block.
        for offset in -8isize..8 {
            let row = (32 + offset) as usize;
            let sat = sat_with(&[(row, 20, 7)]);
            let stats = BorderStatistics::compute(&sat, Border::Bottom, block());

            let first = first_scale(offset);
            for scale in 0..SCALES {
                let expected = if scale >= first { 7 } else { 0 };
                assert_eq!(stats.sums[scale].sum, expected, "offset {offset} scale {scale}");
            }
        }
    }

    #[test]
    fn test_known_first_scale_offsets() {
        assert_eq!(first_scale(0), 0);
        assert_eq!(first_scale(-1), 0);
        assert_eq!(first_scale(1), 1);
        assert_eq!(first_scale(-2), 1);
        assert_eq!(first_scale(3), 2);
        assert_eq!(first_scale(-4), 2);
        assert_eq!(first_scale(7), 3);
        assert_eq!(first_scale(-8), 3);
    }

    #[test]
    fn test_pixel_outside_along_edge_ignored() {
        // Column 16 is inside the left window, but row 15 is above the block.
        let sat = sat_with(&[(15, 16, 200), (32, 16, 200)]);
        let stats = BorderStatistics::compute(&sat, Border::Left, block());

        assert!(stats.sums.iter().all(|s| s.sum == 0));
    }

    #[test]
    fn test_moments_of_constant_window() {
        let mut plane = Plane::<u8>::new(48, 48);
        for r in 0..48 {
            plane.row_mut(r).fill(10);
        }
        let sat = SummedAreaTable::build(&plane).unwrap();
        let stats = BorderStatistics::compute(&sat, Border::Top, block());

        for (scale, m) in stats.moments.iter().enumerate() {
            assert_eq!(m.mean, 10.0);
            assert_eq!(m.variance, 0.0);
            assert_eq!(stats.sums[scale].sum, (10 * DIM * 2 * HALF_DEPTHS[scale]) as u64);
        }
    }

    #[test]
    fn test_moments_population_variance() {
        // samples 0, 2, 4, 6
        let sums = WindowSums {
            sum: 12,
            sum_sq: 56,
        };
        let m = Moments::from_sums(sums, 4);

        assert_eq!(m.mean, 3.0);
        assert_eq!(m.variance, 5.0);
    }

    #[test]
    fn test_moments_keep_negative_rounding() {
        // Exact variance is 0 (sum² / n == sum_sq), but 15/9 is inexact in
        // f64 and its square rounds above 25/9.
        let sums = WindowSums {
            sum: 15,
            sum_sq: 25,
        };
        let m = Moments::from_sums(sums, 9);

        assert!(m.variance < 0.0);
        assert_eq!(m.variance, 25.0 / 9.0 - (15.0f64 / 9.0) * (15.0 / 9.0));

        let stats = BorderStatistics {
            sums: [sums; SCALES],
            moments: [m; SCALES],
        };
        let values = stats.values(&Moments::default());
        assert!(values[SCALES] < 0.0);
        assert!(values[3 * SCALES] < 0.0);
    }

    #[test]
    fn test_values_layout_and_deltas() {
        let sat = sat_with(&[(16, 15, 64)]);
        let stats = BorderStatistics::compute(&sat, Border::Left, block());
        let body = Moments {
            mean: 1.0,
            variance: 2.0,
        };
        let values = stats.values(&body);

        // depth 2: 64 over 32 samples
        assert_eq!(values[0], 2.0);
        assert_eq!(values[3], 0.25);
        // variance = 4096/32 - 2² = 124
        assert_eq!(values[SCALES], 124.0);
        assert_eq!(values[2 * SCALES], 1.0);
        assert_eq!(values[3 * SCALES], 122.0);
    }
}
