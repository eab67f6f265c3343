//! Static response of an electrostatic membrane deformable mirror.
//!
//! An aperture image fixes where the membrane is clamped, an electrode map
//! assigns pixels to electrodes, and a voltage per electrode sets the
//! electrostatic pull. The membrane shape follows from a Dirichlet Poisson
//! problem, relaxed with SOR on the pixel grid. Results are wavefronts in
//! micrometres, i.e. twice the surface deflection.
//!
//! ```no_run
//! use membrane_core::{Raster, ResponseDriver, SolveParams};
//!
//! # fn main() -> membrane_core::Result<()> {
//! let aperture = Raster::from_vec(5, 5, vec![1u8; 25])?;
//! let electrodes = Raster::from_vec(5, 5, vec![1u8; 25])?;
//! let driver = ResponseDriver::new(&aperture, electrodes, 1)?;
//! let solution = driver.respond(&[180], SolveParams::default())?;
//! println!("{} after {} sweeps", solution.termination, solution.sweeps);
//! # Ok(())
//! # }
//! ```

pub mod control;
pub mod error;
pub mod forcing;
pub mod mask;
pub mod raster;
pub mod response;
pub mod sor;
pub mod tiptilt;

pub use control::{control_to_voltage, voltages_from_controls};
pub use error::{MirrorError, Result};
pub use forcing::{DEFAULT_ELECTRODES, ForcingBuilder, SURFACE_CALIBRATION, WAVEFRONT_CALIBRATION};
pub use mask::BoundaryMask;
pub use raster::Raster;
pub use response::ResponseDriver;
pub use sor::{
    Solution, SolveParams, SolverState, SorSolver, Termination, default_max_iterations,
    relaxation_factor,
};
pub use tiptilt::apply_tip_tilt;
