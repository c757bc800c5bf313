//! Frame type representing one decoded luma image.

/// A single 8-bit single-channel frame, row-major with stride = width.
///
/// Frames are immutable inputs to the feature pipeline. The sequence number
/// and presentation timestamp are carried along for logging and for the
/// external labelling step; they play no part in the computation.
#[derive(Clone)]
pub struct Frame {
    /// Raw luma samples.
    pixels: Vec<u8>,
    /// Frame width in pixels.
    width: usize,
    /// Frame height in pixels.
    height: usize,
    /// Monotonic sequence number assigned by the source.
    sequence: u64,
    /// Presentation timestamp in source units.
    pts: u64,
}

impl Frame {
    /// Creates a new frame with the given parameters.
    pub fn new(pixels: Vec<u8>, width: usize, height: usize, sequence: u64) -> Self {
        Self {
            pixels,
            width,
            height,
            sequence,
            pts: 0,
        }
    }

    /// Creates a frame where every pixel has the same value.
    pub fn filled(value: u8, width: usize, height: usize, sequence: u64) -> Self {
        Self::new(vec![value; width * height], width, height, sequence)
    }

    /// Attaches a presentation timestamp.
    pub fn with_pts(mut self, pts: u64) -> Self {
        self.pts = pts;
        self
    }

    /// Returns a reference to the raw pixel data.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Returns the frame width.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the frame height.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the row stride in pixels.
    #[inline]
    pub fn stride(&self) -> usize {
        self.width
    }

    /// Returns the sequence number.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns the presentation timestamp.
    #[inline]
    pub fn pts(&self) -> u64 {
        self.pts
    }

    /// Returns one row of pixels.
    ///
    /// Panics if `row >= height`.
    #[inline]
    pub fn row(&self, row: usize) -> &[u8] {
        let start = row * self.stride();
        &self.pixels[start..start + self.width]
    }

    /// Returns the pixel at `(row, col)`, or `None` when out of range.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<u8> {
        if row < self.height && col < self.width {
            Some(self.pixels[row * self.stride() + col])
        } else {
            None
        }
    }

    /// Returns the total number of pixels (width * height).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Validates that the pixel buffer size matches non-zero dimensions.
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0 && self.pixels.len() == self.pixel_count()
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("sequence", &self.sequence)
            .field("pts", &self.pts)
            .field("pixel_bytes", &self.pixels.len())
            .finish()
    }
}
