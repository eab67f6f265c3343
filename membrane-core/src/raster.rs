//! Fixed-shape 2-D grids.
//!
//! Pixel `(i, j)` is column `i` (x, `0..width`) and row `j` (y, `0..height`).
//! Storage is column by column: `(i, j)` lives at offset `i * height + j`, so
//! walking `j` for a fixed `i` touches contiguous memory. The image readers
//! convert file order to this layout; the solver's stencil relies on it.

use crate::error::{MirrorError, Result};

/// Smallest supported extent along either axis. The solver needs one
/// interior pixel surrounded by a one-pixel frame.
pub const MIN_EXTENT: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct Raster<T> {
    width: usize,
    height: usize,
    data: Vec<T>,
}

impl<T: Clone + Default> Raster<T> {
    /// Default-filled raster (zero for numbers, `false` for masks).
    pub fn new(width: usize, height: usize) -> Result<Self> {
        check_extent(width, height)?;
        Ok(Raster {
            width,
            height,
            data: vec![T::default(); width * height],
        })
    }
}

impl<T> Raster<T> {
    /// Wraps a buffer laid out as `i * height + j`.
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Result<Self> {
        check_extent(width, height)?;
        if data.len() != width * height {
            return Err(MirrorError::BufferLength {
                width,
                height,
                expected: width * height,
                found: data.len(),
            });
        }
        Ok(Raster {
            width,
            height,
            data,
        })
    }

    pub fn from_fn<F>(width: usize, height: usize, mut f: F) -> Result<Self>
    where
        F: FnMut(usize, usize) -> T,
    {
        check_extent(width, height)?;
        let mut data = Vec::with_capacity(width * height);
        for i in 0..width {
            for j in 0..height {
                data.push(f(i, j));
            }
        }
        Ok(Raster {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn contains(&self, i: usize, j: usize) -> bool {
        i < self.width && j < self.height
    }

    pub fn is_edge(&self, i: usize, j: usize) -> bool {
        i == 0 || j == 0 || i == self.width - 1 || j == self.height - 1
    }

    #[inline]
    pub(crate) fn offset(&self, i: usize, j: usize) -> usize {
        debug_assert!(self.contains(i, j));
        i * self.height + j
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn get_ref(&self, i: usize, j: usize) -> Result<&T> {
        self.check(i, j)?;
        Ok(&self.data[self.offset(i, j)])
    }

    pub fn set(&mut self, i: usize, j: usize, value: T) -> Result<()> {
        self.check(i, j)?;
        let k = self.offset(i, j);
        self.data[k] = value;
        Ok(())
    }

    pub fn ensure_shape<U>(&self, other: &Raster<U>) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(MirrorError::ShapeMismatch {
                expected: self.shape(),
                found: other.shape(),
            });
        }
        Ok(())
    }

    /// Interior pixels `1..=width-2` (outer) by `1..=height-2` (inner), in
    /// the order the solver sweeps them.
    pub fn interior(&self) -> impl Iterator<Item = (usize, usize)> + use<T> {
        let (w, h) = (self.width, self.height);
        (1..w - 1).flat_map(move |i| (1..h - 1).map(move |j| (i, j)))
    }

    /// All pixels in storage order, with their coordinates.
    pub fn indexed(&self) -> impl Iterator<Item = ((usize, usize), &T)> {
        let h = self.height;
        self.data
            .iter()
            .enumerate()
            .map(move |(k, v)| ((k / h, k % h), v))
    }

    /// Visits every pixel mutably, in storage order.
    pub fn update<F>(&mut self, mut f: F)
    where
        F: FnMut(usize, usize, &mut T),
    {
        let h = self.height;
        for (k, v) in self.data.iter_mut().enumerate() {
            f(k / h, k % h, v);
        }
    }

    pub fn map<U, F>(&self, f: F) -> Raster<U>
    where
        F: FnMut(&T) -> U,
    {
        Raster {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(f).collect(),
        }
    }

    fn check(&self, i: usize, j: usize) -> Result<()> {
        if !self.contains(i, j) {
            return Err(MirrorError::OutOfBounds {
                i,
                j,
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}

impl<T: Clone> Raster<T> {
    /// Overwrites the one-pixel outer frame.
    pub fn fill_frame(&mut self, value: T) {
        let (w, h) = self.shape();
        for i in 0..w {
            for j in [0, h - 1] {
                let k = self.offset(i, j);
                self.data[k] = value.clone();
            }
        }
        for j in 1..h - 1 {
            for i in [0, w - 1] {
                let k = self.offset(i, j);
                self.data[k] = value.clone();
            }
        }
    }
}

impl<T: Copy> Raster<T> {
    pub fn get(&self, i: usize, j: usize) -> Result<T> {
        self.get_ref(i, j).copied()
    }
}

impl Raster<f64> {
    /// `(min, max)` over every pixel.
    pub fn min_max(&self) -> (f64, f64) {
        self.data
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    }

    /// First non-finite pixel, if any.
    pub fn find_non_finite(&self) -> Option<(usize, usize, f64)> {
        self.indexed()
            .find(|(_, v)| !v.is_finite())
            .map(|((i, j), &v)| (i, j, v))
    }

    pub fn scale(&mut self, factor: f64) {
        for v in &mut self.data {
            *v *= factor;
        }
    }
}

fn check_extent(width: usize, height: usize) -> Result<()> {
    if width < MIN_EXTENT || height < MIN_EXTENT {
        return Err(MirrorError::TooSmall { width, height });
    }
    Ok(())
}
