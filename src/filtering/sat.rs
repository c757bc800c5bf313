//! Summed-area tables over a filtered plane.
//!
//! Every border and body statistic of a block reduces to a rectangle sum
//! and a rectangle sum of squares. Building both prefix-sum tables once per
//! plane turns each of those sums into four lookups.

use super::Plane;
use crate::error::ExtractionError;
use std::ops::Range;

/// Sum and sum of squares over one rectangular window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowSums {
    /// Sum of sample values.
    pub sum: u64,
    /// Sum of squared sample values.
    pub sum_sq: u64,
}

impl std::ops::AddAssign for WindowSums {
    fn add_assign(&mut self, rhs: Self) {
        self.sum += rhs.sum;
        self.sum_sq += rhs.sum_sq;
    }
}

/// First- and second-order prefix sums of an 8-bit plane.
///
/// `sum.at(r, c)` is the sum of all samples in `[0, r] x [0, c]`.
/// Squares accumulate in 64 bits: 255² over a 1280x720 plane already
/// exceeds `u32::MAX`.
#[derive(Debug, Clone)]
pub struct SummedAreaTable {
    sum: Plane<u32>,
    sum_sq: Plane<u64>,
}

impl SummedAreaTable {
    /// Builds both tables in one pass over the plane.
    ///
    /// Fails with [`ExtractionError::InvalidInput`] for an empty plane or a
    /// plane large enough to overflow the 32-bit first-order table.
    pub fn build(plane: &Plane<u8>) -> Result<Self, ExtractionError> {
        let (width, height) = (plane.width(), plane.height());
        if width == 0 || height == 0 {
            return Err(ExtractionError::invalid(format!(
                "plane has zero dimension ({}x{})",
                width, height
            )));
        }
        if (width as u64) * (height as u64) * u64::from(u8::MAX) > u64::from(u32::MAX) {
            return Err(ExtractionError::invalid(format!(
                "plane {}x{} overflows a 32-bit summed-area table",
                width, height
            )));
        }

        let mut sum = Plane::<u32>::new(width, height);
        let mut sum_sq = Plane::<u64>::new(width, height);

        // sat[r,c] = running row sum up to c + sat[r-1,c], which expands to
        // plane[r,c] + sat[r-1,c] + sat[r,c-1] - sat[r-1,c-1].
        for r in 0..height {
            let src = plane.row(r);
            let mut run = 0u32;
            let mut run_sq = 0u64;

            for (c, &v) in src.iter().enumerate() {
                run += u32::from(v);
                run_sq += u64::from(v) * u64::from(v);

                let (above, above_sq) = if r == 0 {
                    (0, 0)
                } else {
                    (sum.at(r - 1, c), sum_sq.at(r - 1, c))
                };
                sum.row_mut(r)[c] = run + above;
                sum_sq.row_mut(r)[c] = run_sq + above_sq;
            }
        }

        Ok(Self { sum, sum_sq })
    }

    /// Width of the source plane.
    #[inline]
    pub fn width(&self) -> usize {
        self.sum.width()
    }

    /// Height of the source plane.
    #[inline]
    pub fn height(&self) -> usize {
        self.sum.height()
    }

    /// First-order table.
    #[inline]
    pub fn sums(&self) -> &Plane<u32> {
        &self.sum
    }

    /// Second-order table.
    #[inline]
    pub fn squares(&self) -> &Plane<u64> {
        &self.sum_sq
    }

    /// Sums over the half-open window `rows x cols`, or `None` if the window
    /// leaves the plane.
    pub fn window(&self, rows: Range<usize>, cols: Range<usize>) -> Option<WindowSums> {
        if rows.end > self.height() || cols.end > self.width() {
            return None;
        }
        Some(self.window_within(rows, cols))
    }

    /// Sums over a window already known to lie inside the plane.
    ///
    /// Empty ranges yield zero. Panics if the window leaves the plane.
    #[inline]
    pub(crate) fn window_within(&self, rows: Range<usize>, cols: Range<usize>) -> WindowSums {
        if rows.start >= rows.end || cols.start >= cols.end {
            return WindowSums::default();
        }

        let (r0, r1, c0, c1) = (rows.start, rows.end, cols.start, cols.end);
        let a = self.corner(r1, c1);
        let b = self.corner(r0, c1);
        let c = self.corner(r1, c0);
        let d = self.corner(r0, c0);

        // a - b - c + d is never negative; add first so nothing underflows.
        WindowSums {
            sum: (a.sum + d.sum) - (b.sum + c.sum),
            sum_sq: (a.sum_sq + d.sum_sq) - (b.sum_sq + c.sum_sq),
        }
    }

    /// Prefix sums of `[0, row_end) x [0, col_end)`; zero along the
    /// virtual row and column before the plane.
    #[inline]
    fn corner(&self, row_end: usize, col_end: usize) -> WindowSums {
        if row_end == 0 || col_end == 0 {
            return WindowSums::default();
        }
        WindowSums {
            sum: u64::from(self.sum.at(row_end - 1, col_end - 1)),
            sum_sq: self.sum_sq.at(row_end - 1, col_end - 1),
        }
    }
}
