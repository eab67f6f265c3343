use crate::raster::Raster;

/// Pixels that take part in the relaxation. The outer frame is always
/// clamped so the 5-point stencil never reads outside the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryMask {
    inner: Raster<bool>,
}

impl BoundaryMask {
    /// `true` wherever the aperture image is non-zero, frame excluded.
    pub fn from_aperture(aperture: &Raster<u8>) -> Self {
        Self::from_raster(aperture.map(|&v| v > 0))
    }

    pub fn from_raster(mut inner: Raster<bool>) -> Self {
        inner.fill_frame(false);
        BoundaryMask { inner }
    }

    #[inline]
    pub fn is_interior(&self, i: usize, j: usize) -> bool {
        self.inner.contains(i, j) && self.inner.as_slice()[self.inner.offset(i, j)]
    }

    pub fn interior_count(&self) -> usize {
        self.inner.as_slice().iter().filter(|&&b| b).count()
    }

    pub fn raster(&self) -> &Raster<bool> {
        &self.inner
    }

    pub fn shape(&self) -> (usize, usize) {
        self.inner.shape()
    }
}
