//! Owned 2D raster used for every derived plane.

use std::io::{self, Write};

/// Sample types a plane can hold and dump as raw little-endian bytes.
pub trait Sample: Copy + Default + std::fmt::Debug {
    /// Appends the little-endian encoding of `self`.
    fn extend_le(self, out: &mut Vec<u8>);
}

impl Sample for u8 {
    #[inline]
    fn extend_le(self, out: &mut Vec<u8>) {
        out.push(self);
    }
}

impl Sample for u32 {
    #[inline]
    fn extend_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

impl Sample for u64 {
    #[inline]
    fn extend_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

/// Row-major raster with stride = width.
#[derive(Clone, PartialEq)]
pub struct Plane<T> {
    data: Vec<T>,
    width: usize,
    height: usize,
}

impl<T: Sample> Plane<T> {
    /// Creates a zero-filled plane.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            data: vec![T::default(); width * height],
            width,
            height,
        }
    }

    /// Wraps an existing buffer. Returns `None` if the length does not match.
    pub fn from_vec(data: Vec<T>, width: usize, height: usize) -> Option<Self> {
        (data.len() == width * height).then_some(Self {
            data,
            width,
            height,
        })
    }

    /// Plane width in samples.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Plane height in samples.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Distance between the starts of consecutive rows.
    #[inline]
    pub fn stride(&self) -> usize {
        self.width
    }

    /// Sample at `(row, col)`. Panics when out of range.
    #[inline]
    pub fn at(&self, row: usize, col: usize) -> T {
        debug_assert!(row < self.height && col < self.width);
        self.data[row * self.width + col]
    }

    /// Sample at `(row, col)`, or `None` when out of range.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        (row < self.height && col < self.width).then(|| self.data[row * self.width + col])
    }

    /// One row of samples.
    #[inline]
    pub fn row(&self, row: usize) -> &[T] {
        let start = row * self.width;
        &self.data[start..start + self.width]
    }

    /// One mutable row of samples.
    #[inline]
    pub fn row_mut(&mut self, row: usize) -> &mut [T] {
        let start = row * self.width;
        &mut self.data[start..start + self.width]
    }

    /// The whole buffer.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Converts every sample, keeping the geometry.
    pub fn map<U: Sample>(&self, f: impl Fn(T) -> U) -> Plane<U> {
        Plane {
            data: self.data.iter().map(|&v| f(v)).collect(),
            width: self.width,
            height: self.height,
        }
    }

    /// Writes the plane as raw little-endian samples, row by row.
    pub fn write_raw<W: Write>(&self, mut out: W) -> io::Result<()> {
        let mut bytes = Vec::with_capacity(self.width * std::mem::size_of::<T>());
        for r in 0..self.height {
            bytes.clear();
            for &v in self.row(r) {
                v.extend_le(&mut bytes);
            }
            out.write_all(&bytes)?;
        }
        out.flush()
    }
}

impl<T> std::fmt::Debug for Plane<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plane")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("sample", &std::any::type_name::<T>())
            .finish()
    }
}
