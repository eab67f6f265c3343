use membrane_core::Raster;

/// Greyscale rendering of a wavefront, in image (row-major) order.
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    pub width: usize,
    pub height: usize,
    pub maxval: u8,
    pub pixels: Vec<u8>,
    /// The wavefront had zero range and was rendered as flat mid-grey.
    pub flat: bool,
}

/// Rescales `u` to `[0, maxval]` using its own min and max.
pub fn render(u: &Raster<f64>, maxval: u8) -> Preview {
    let (w, h) = u.shape();
    let (lo, hi) = u.min_max();
    let range = hi - lo;
    let flat = range == 0.0;

    let mut pixels = vec![0u8; w * h];
    if flat {
        pixels.fill(((u16::from(maxval) + 1) / 2) as u8);
    } else {
        let top = f64::from(maxval);
        for ((i, j), &v) in u.indexed() {
            pixels[j * w + i] = ((v - lo) / range * top).clamp(0.0, top) as u8;
        }
    }

    Preview {
        width: w,
        height: h,
        maxval,
        pixels,
        flat,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spans_full_grey_range() {
        let u = Raster::from_fn(3, 3, |i, j| (i + 3 * j) as f64 * 0.5).unwrap();
        let p = render(&u, 255);
        assert!(!p.flat);
        assert_eq!(p.pixels[0], 0);
        assert_eq!(p.pixels[8], 255);
        // (1, 0) sits one eighth of the way up
        assert_eq!(p.pixels[1], 31);
    }

    #[test]
    fn flat_wavefront_is_mid_grey() {
        let u: Raster<f64> = Raster::new(4, 3).unwrap();
        let p = render(&u, 255);
        assert!(p.flat);
        assert!(p.pixels.iter().all(|&g| g == 128));
    }
}
