//! Dense row-major 2D pixel buffers.

use std::ops::{Index, IndexMut};

use bytemuck::Pod;
use rayon::prelude::*;

use crate::color::Rgba;
use crate::error::{RenderError, Result};

/// RGBA output image, 4 bytes per pixel.
pub type RgbaImage = Image<Rgba>;

/// A `width * height` buffer of pixels stored row by row.
#[derive(Debug, Clone, PartialEq)]
pub struct Image<T> {
    width: usize,
    height: usize,
    data: Vec<T>,
}

impl<T: Clone + Default> Image<T> {
    /// Create an image filled with `T::default()`.
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, T::default())
    }
}

impl<T: Clone> Image<T> {
    /// Create an image with every pixel set to `value`.
    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Overwrite every pixel with `value`.
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }
}

impl<T> Image<T> {
    /// Wrap an existing row-major buffer.
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Result<Self> {
        if data.len() != width * height {
            return Err(RenderError::BufferLength {
                expected: width * height,
                found: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// `(width, height)`.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Number of pixels.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True for a zero-sized image.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Pixel at `(x, y)`, or `None` outside the image.
    pub fn get(&self, x: usize, y: usize) -> Option<&T> {
        if x < self.width && y < self.height {
            self.data.get(x + y * self.width)
        } else {
            None
        }
    }

    /// Pixels as a flat row-major slice.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Pixels as a mutable flat row-major slice.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Consume the image, returning its buffer.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Iterate over rows.
    pub fn rows(&self) -> std::slice::Chunks<'_, T> {
        self.data.chunks(self.width.max(1))
    }

    /// Parallel iterator over mutable rows.
    pub fn par_rows_mut(&mut self) -> rayon::slice::ChunksMut<'_, T>
    where
        T: Send,
    {
        self.data.par_chunks_mut(self.width.max(1))
    }

    /// Fail unless `other` has the same size as `self`.
    pub fn ensure_same_size<U>(&self, other: &Image<U>, what: &'static str) -> Result<()> {
        if self.dimensions() != other.dimensions() {
            return Err(RenderError::DimensionMismatch {
                what,
                expected: self.dimensions(),
                found: other.dimensions(),
            });
        }
        Ok(())
    }
}

impl<T: Pod> Image<T> {
    /// Raw bytes of the buffer, e.g. packed RGBA for display or encoding.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }
}

impl<T> Index<usize> for Image<T> {
    type Output = T;

    fn index(&self, i: usize) -> &T {
        &self.data[i]
    }
}

impl<T> IndexMut<usize> for Image<T> {
    fn index_mut(&mut self, i: usize) -> &mut T {
        &mut self.data[i]
    }
}

impl<T> Index<(usize, usize)> for Image<T> {
    type Output = T;

    fn index(&self, (x, y): (usize, usize)) -> &T {
        &self.data[x + y * self.width]
    }
}

impl<T> IndexMut<(usize, usize)> for Image<T> {
    fn index_mut(&mut self, (x, y): (usize, usize)) -> &mut T {
        &mut self.data[x + y * self.width]
    }
}
