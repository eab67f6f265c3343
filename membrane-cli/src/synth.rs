//! Synthetic mirror layouts: a circular aperture, a hexagonal electrode
//! pattern and voltage settings drawn from a seeded generator.

use membrane_core::Raster;
use rand::Rng;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoltagePattern {
    Uniform,
    Random,
    Defocus,
    Tilt,
}

impl VoltagePattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoltagePattern::Uniform => "uniform",
            VoltagePattern::Random => "random",
            VoltagePattern::Defocus => "defocus",
            VoltagePattern::Tilt => "tilt",
        }
    }

    pub fn parse(s: &str) -> Option<VoltagePattern> {
        match s {
            "uniform" => Some(VoltagePattern::Uniform),
            "random" => Some(VoltagePattern::Random),
            "defocus" => Some(VoltagePattern::Defocus),
            "tilt" => Some(VoltagePattern::Tilt),
            _ => None,
        }
    }
}

pub fn sample_pattern<R: Rng>(rng: &mut R) -> VoltagePattern {
    match rng.gen_range(0..4) {
        0 => VoltagePattern::Uniform,
        1 => VoltagePattern::Random,
        2 => VoltagePattern::Defocus,
        _ => VoltagePattern::Tilt,
    }
}

/// Electrode centres on a hexagonal lattice, in pixels from the grid centre.
#[derive(Debug, Clone)]
pub struct HexLayout {
    pub rings: usize,
    pub pitch: f64,
    pub centres: Vec<(f64, f64)>,
    ring_of: Vec<usize>,
}

impl HexLayout {
    /// `rings` hexagonal rings around a central cell, sized to fill a circle
    /// of `radius` pixels. Three rings give the 37-electrode layout.
    pub fn new(rings: usize, radius: f64) -> HexLayout {
        let pitch = radius / (rings as f64 + 0.5);
        let r = rings as i64;
        let mut cells = Vec::new();
        for q in -r..=r {
            for s in -r..=r {
                let ring = q.abs().max(s.abs()).max((q + s).abs());
                if ring <= r {
                    let x = pitch * (q as f64 + s as f64 / 2.0);
                    let y = pitch * (s as f64 * 3f64.sqrt() / 2.0);
                    cells.push((ring as usize, y.atan2(x), (x, y)));
                }
            }
        }
        // number electrodes ring by ring, counter-clockwise within a ring
        cells.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));

        HexLayout {
            rings,
            pitch,
            centres: cells.iter().map(|c| c.2).collect(),
            ring_of: cells.iter().map(|c| c.0).collect(),
        }
    }

    pub fn count(&self) -> usize {
        self.centres.len()
    }

    pub fn ring(&self, electrode: usize) -> usize {
        self.ring_of[electrode]
    }

    /// 1-based index of the electrode nearest to `(x, y)`.
    pub fn nearest(&self, x: f64, y: f64) -> usize {
        let mut best = (f64::INFINITY, 0);
        for (k, &(cx, cy)) in self.centres.iter().enumerate() {
            let d = (x - cx).powi(2) + (y - cy).powi(2);
            if d < best.0 {
                best = (d, k);
            }
        }
        best.1 + 1
    }
}

fn centre(n: usize) -> f64 {
    (n as f64 - 1.0) / 2.0
}

/// 255 inside a centred circle of `radius_frac * n` pixels, 0 outside.
pub fn circular_aperture(n: usize, radius_frac: f64) -> membrane_core::Result<Raster<u8>> {
    let c = centre(n);
    let radius = radius_frac * n as f64;
    Raster::from_fn(n, n, |i, j| {
        let (dx, dy) = (i as f64 - c, j as f64 - c);
        if dx * dx + dy * dy <= radius * radius { 255 } else { 0 }
    })
}

/// Each pixel inside the aperture circle belongs to its nearest electrode.
pub fn hex_electrodes(n: usize, radius_frac: f64, layout: &HexLayout) -> membrane_core::Result<Raster<u8>> {
    let c = centre(n);
    let radius = radius_frac * n as f64;
    Raster::from_fn(n, n, |i, j| {
        let (dx, dy) = (i as f64 - c, j as f64 - c);
        if dx * dx + dy * dy <= radius * radius {
            layout.nearest(dx, dy).min(u8::MAX as usize) as u8
        } else {
            0
        }
    })
}

/// Voltages for every electrode of `layout`, within `[v_min, v_max]`.
pub fn generate_voltages<R: Rng>(
    rng: &mut R,
    layout: &HexLayout,
    pattern: VoltagePattern,
    v_min: i32,
    v_max: i32,
) -> Vec<i32> {
    let lo = v_min.min(v_max);
    let hi = v_min.max(v_max);
    let span = f64::from(hi - lo);
    let level = |t: f64| lo + (t.clamp(0.0, 1.0) * span).round() as i32;

    match pattern {
        VoltagePattern::Uniform => {
            let v = rng.gen_range(lo..=hi);
            vec![v; layout.count()]
        }

        VoltagePattern::Random => (0..layout.count()).map(|_| rng.gen_range(lo..=hi)).collect(),

        VoltagePattern::Defocus => {
            // centre high and rim low, or the reverse
            let inward = rng.gen_range(0..2) == 0;
            let rings = layout.rings.max(1) as f64;
            (0..layout.count())
                .map(|k| {
                    let t = layout.ring(k) as f64 / rings;
                    level(if inward { 1.0 - t } else { t })
                })
                .collect()
        }

        VoltagePattern::Tilt => {
            let angle = rng.gen_range(0.0..std::f64::consts::TAU);
            let (dx, dy) = (angle.cos(), angle.sin());
            let extent = layout.pitch * (layout.rings as f64 + 0.5);
            layout
                .centres
                .iter()
                .map(|&(x, y)| level(0.5 + 0.5 * (x * dx + y * dy) / extent))
                .collect()
        }
    }
}
