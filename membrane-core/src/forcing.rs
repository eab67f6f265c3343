//! Electrostatic source term of the membrane equation.
//!
//! The pull of an electrode on the membrane goes as the square of its
//! voltage, so each electrode contributes `(v / 255)^2 / C` to the forcing
//! raster over the pixels it covers.

use crate::error::{MirrorError, Result};
use crate::mask::BoundaryMask;
use crate::raster::Raster;

/// Electrodes on the 37-channel membrane mirror.
pub const DEFAULT_ELECTRODES: usize = 37;

/// Largest electrode drive level (8-bit DAC).
pub const MAX_VOLTAGE: i32 = 255;

/// Surface calibration: with every electrode at 180 the membrane centre
/// moves by about 3 um.
pub const SURFACE_CALIBRATION: f64 = 151.5712;

/// A reflected wavefront sees twice the surface deformation.
pub const WAVEFRONT_GAIN: f64 = 2.0;

/// Calibration constant that yields wavefront, not surface, deflection.
pub const WAVEFRONT_CALIBRATION: f64 = SURFACE_CALIBRATION / WAVEFRONT_GAIN;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForcingBuilder {
    electrodes: usize,
    calibration: f64,
}

impl Default for ForcingBuilder {
    fn default() -> Self {
        ForcingBuilder::new(DEFAULT_ELECTRODES)
    }
}

impl ForcingBuilder {
    pub fn new(electrodes: usize) -> Self {
        ForcingBuilder {
            electrodes,
            calibration: WAVEFRONT_CALIBRATION,
        }
    }

    pub fn with_calibration(mut self, calibration: f64) -> Self {
        self.calibration = calibration;
        self
    }

    pub fn electrodes(&self) -> usize {
        self.electrodes
    }

    pub fn calibration(&self) -> f64 {
        self.calibration
    }

    /// Per-electrode forcing level for a validated voltage table.
    pub fn levels(&self, voltages: &[i32]) -> Result<Vec<f64>> {
        if voltages.len() != self.electrodes {
            return Err(MirrorError::VoltageCount {
                expected: self.electrodes,
                found: voltages.len(),
            });
        }
        voltages
            .iter()
            .enumerate()
            .map(|(k, &v)| {
                if !(0..=MAX_VOLTAGE).contains(&v) {
                    return Err(MirrorError::VoltageOutOfRange {
                        electrode: k + 1,
                        value: v,
                    });
                }
                let x = v as f64 / MAX_VOLTAGE as f64;
                Ok(x * x / self.calibration)
            })
            .collect()
    }

    pub fn build(&self, electrode_map: &Raster<u8>, voltages: &[i32]) -> Result<Raster<f64>> {
        let levels = self.levels(voltages)?;
        if let Some(((i, j), &index)) = electrode_map
            .indexed()
            .find(|(_, k)| **k as usize > self.electrodes)
        {
            return Err(MirrorError::ElectrodeOutOfRange {
                index,
                count: self.electrodes,
                i,
                j,
            });
        }
        Ok(electrode_map.map(|&k| match k {
            0 => 0.0,
            k => levels[k as usize - 1],
        }))
    }

    /// Like [`ForcingBuilder::build`], with the forcing cleared outside the
    /// mask.
    pub fn build_masked(
        &self,
        electrode_map: &Raster<u8>,
        voltages: &[i32],
        mask: &BoundaryMask,
    ) -> Result<Raster<f64>> {
        mask.raster().ensure_shape(electrode_map)?;
        let forcing = self.build(electrode_map, voltages)?;
        let keep = mask.raster().as_slice();
        let data = forcing
            .as_slice()
            .iter()
            .zip(keep)
            .map(|(&f, &inside)| if inside { f } else { 0.0 })
            .collect();
        Raster::from_vec(forcing.width(), forcing.height(), data)
    }
}
