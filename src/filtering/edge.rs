//! Directional absolute-difference filters.
//!
//! Blocking artifacts show up as sharp steps between neighbouring pixels
//! along block edges. Two first-difference planes capture those steps:
//! `vertical` compares each pixel with the one below it, `horizontal`
//! with the one to its right.

use super::Plane;
use crate::capture::Frame;
use crate::error::ExtractionError;

/// The two filtered planes of one frame.
#[derive(Debug, Clone)]
pub struct EdgePlanes {
    /// `|frame[r,c] - frame[r+1,c]|`, zero on the last row.
    pub vertical: Plane<u8>,
    /// `|frame[r,c] - frame[r,c+1]|`, zero on the last column.
    pub horizontal: Plane<u8>,
}

/// Computes vertical and horizontal absolute differences of a frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct EdgeFilter;

impl EdgeFilter {
    pub fn new() -> Self {
        Self
    }

    /// Filters a frame into its vertical and horizontal difference planes.
    ///
    /// Fails with [`ExtractionError::InvalidInput`] on an empty frame or a
    /// pixel buffer that does not match the frame dimensions.
    pub fn filter(&self, frame: &Frame) -> Result<EdgePlanes, ExtractionError> {
        let (width, height) = (frame.width(), frame.height());
        if width == 0 || height == 0 {
            return Err(ExtractionError::invalid(format!(
                "frame has zero dimension ({}x{})",
                width, height
            )));
        }
        if frame.pixels().len() != frame.pixel_count() {
            return Err(ExtractionError::invalid(format!(
                "frame buffer holds {} bytes, expected {}",
                frame.pixels().len(),
                frame.pixel_count()
            )));
        }

        let mut vertical = Plane::new(width, height);
        let mut horizontal = Plane::new(width, height);

        for r in 0..height {
            let row = frame.row(r);

            // Last column stays 0: no right neighbour.
            let hor = horizontal.row_mut(r);
            for (out, pair) in hor.iter_mut().zip(row.windows(2)) {
                *out = pair[0].abs_diff(pair[1]);
            }

            // Last row stays 0: no row below.
            if r + 1 < height {
                let below = frame.row(r + 1);
                let ver = vertical.row_mut(r);
                for ((out, &a), &b) in ver.iter_mut().zip(row).zip(below) {
                    *out = a.abs_diff(b);
                }
            }
        }

        Ok(EdgePlanes {
            vertical,
            horizontal,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_from(pixels: Vec<u8>, width: usize, height: usize) -> Frame {
        Frame::new(pixels, width, height, 1)
    }

    #[test]
    fn test_small_frame_values() {
        #[rustfmt::skip]
        let frame = frame_from(vec![
            10, 20, 5,
            40, 10, 5,
        ], 3, 2);

        let planes = EdgeFilter::new().filter(&frame).unwrap();

        assert_eq!(planes.vertical.as_slice(), &[30, 10, 0, 0, 0, 0]);
        assert_eq!(planes.horizontal.as_slice(), &[10, 15, 0, 30, 5, 0]);
    }

    #[test]
    fn test_matches_definition_everywhere() {
        let (width, height) = (17, 9);
        let pixels: Vec<u8> = (0..width * height)
            .map(|i| ((i * 37 + i / 5) % 256) as u8)
            .collect();
        let frame = frame_from(pixels, width, height);

        let planes = EdgeFilter::new().filter(&frame).unwrap();

        for r in 0..height {
            for c in 0..width {
                let here = frame.get(r, c).unwrap();
                let expected_v = if r + 1 < height {
                    here.abs_diff(frame.get(r + 1, c).unwrap())
                } else {
                    0
                };
                let expected_h = if c + 1 < width {
                    here.abs_diff(frame.get(r, c + 1).unwrap())
                } else {
                    0
                };
                assert_eq!(planes.vertical.at(r, c), expected_v, "vertical ({r}, {c})");
                assert_eq!(planes.horizontal.at(r, c), expected_h, "horizontal ({r}, {c})");
            }
        }
    }

    #[test]
    fn test_full_range_difference() {
        let frame = frame_from(vec![0, 255, 255, 0], 2, 2);
        let planes = EdgeFilter::new().filter(&frame).unwrap();

        assert_eq!(planes.vertical.at(0, 0), 255);
        assert_eq!(planes.horizontal.at(0, 0), 255);
        assert_eq!(planes.horizontal.at(1, 0), 255);
        // Bottom-right corner has neither neighbour
        assert_eq!(planes.vertical.at(1, 1), 0);
        assert_eq!(planes.horizontal.at(1, 1), 0);
    }

    #[test]
    fn test_uniform_frame_is_flat() {
        let frame = Frame::filled(128, 64, 48, 1);
        let planes = EdgeFilter::new().filter(&frame).unwrap();

        assert!(planes.vertical.as_slice().iter().all(|&v| v == 0));
        assert!(planes.horizontal.as_slice().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let frame = frame_from(Vec::new(), 0, 4);
        assert!(matches!(
            EdgeFilter::new().filter(&frame),
            Err(ExtractionError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_short_buffer_rejected() {
        let frame = frame_from(vec![0u8; 10], 4, 4);
        assert!(matches!(
            EdgeFilter::new().filter(&frame),
            Err(ExtractionError::InvalidInput(_))
        ));
    }
}
