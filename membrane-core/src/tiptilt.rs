use crate::control::clamp_control;
use crate::raster::Raster;

/// Peak wavefront tilt of the tip-tilt mirror at full control.
pub const DEFAULT_TILT_AMPLITUDE: f64 = 2.0;

/// Adds a plane wavefront for a two-axis tip-tilt mirror. `control[0]` tilts
/// along `i`, `control[1]` along `j`; each ranges over `[-1, 1]` and gives a
/// slope from `-amplitude` to `+amplitude` edge to edge.
pub fn apply_tip_tilt(image: &mut Raster<f64>, control: [f64; 2], amplitude: f64) {
    let (w, h) = image.shape();
    let cx = clamp_control(control[0]);
    let cy = clamp_control(control[1]);
    let sx = (w - 1) as f64;
    let sy = (h - 1) as f64;

    image.update(|i, j, v| {
        *v += (i as f64 / sx - 0.5) * 2.0 * amplitude * cx
            + (j as f64 / sy - 0.5) * 2.0 * amplitude * cy;
    });
}
