//! Mirror response for a fixed aperture and electrode layout.

use crate::control::voltages_from_controls;
use crate::error::Result;
use crate::forcing::ForcingBuilder;
use crate::mask::BoundaryMask;
use crate::raster::Raster;
use crate::sor::{Solution, SolveParams, SorSolver};

/// Holds the parts of a solve that do not change between voltage settings:
/// the aperture mask, the electrode map and the forcing calibration.
#[derive(Debug, Clone)]
pub struct ResponseDriver {
    mask: BoundaryMask,
    electrode_map: Raster<u8>,
    forcing: ForcingBuilder,
}

impl ResponseDriver {
    /// Fails with `ShapeMismatch` when the aperture and the electrode map
    /// differ in size.
    pub fn new(aperture: &Raster<u8>, electrode_map: Raster<u8>, electrodes: usize) -> Result<Self> {
        aperture.ensure_shape(&electrode_map)?;
        let mask = BoundaryMask::from_aperture(aperture);
        log::debug!(
            "membrane {}x{}: {} interior pixels, {electrodes} electrodes",
            aperture.width(),
            aperture.height(),
            mask.interior_count()
        );
        Ok(ResponseDriver {
            mask,
            electrode_map,
            forcing: ForcingBuilder::new(electrodes),
        })
    }

    pub fn with_forcing(mut self, forcing: ForcingBuilder) -> Self {
        self.forcing = forcing;
        self
    }

    pub fn mask(&self) -> &BoundaryMask {
        &self.mask
    }

    pub fn electrodes(&self) -> usize {
        self.forcing.electrodes()
    }

    pub fn shape(&self) -> (usize, usize) {
        self.mask.shape()
    }

    pub fn forcing_for(&self, voltages: &[i32]) -> Result<Raster<f64>> {
        self.forcing
            .build_masked(&self.electrode_map, voltages, &self.mask)
    }

    /// Wavefront for a set of electrode voltages in `[0, 255]`.
    pub fn respond(&self, voltages: &[i32], params: SolveParams) -> Result<Solution> {
        let forcing = self.forcing_for(voltages)?;
        let solution = SorSolver::new(&self.mask, &forcing, params)?.run()?;
        self.report(&solution);
        Ok(solution)
    }

    /// Like [`ResponseDriver::respond`], relaxing from a previous wavefront.
    pub fn respond_from(
        &self,
        voltages: &[i32],
        params: SolveParams,
        previous: &Raster<f64>,
    ) -> Result<Solution> {
        let forcing = self.forcing_for(voltages)?;
        let solution = SorSolver::new(&self.mask, &forcing, params)?
            .warm_start(previous.clone())?
            .run()?;
        self.report(&solution);
        Ok(solution)
    }

    /// Wavefront for linear control signals in `[-1, 1]`.
    pub fn respond_control(&self, controls: &[f64], params: SolveParams) -> Result<Solution> {
        self.respond(&voltages_from_controls(controls), params)
    }

    fn report(&self, solution: &Solution) {
        if solution.termination.is_converged() {
            log::info!(
                "response {} after {} sweeps (r={:.3e}, omega={:.4})",
                solution.termination,
                solution.sweeps,
                solution.residual,
                solution.omega
            );
        } else {
            log::warn!(
                "response stopped at the iteration cap ({} sweeps, r={:.3e})",
                solution.sweeps,
                solution.residual
            );
        }
    }
}
