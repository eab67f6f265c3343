//! Successive over-relaxation for the clamped membrane.
//!
//! Relaxes `u` towards `u = (Σ neighbours - f) / 4` on the interior of a
//! [`BoundaryMask`] with `u = 0` everywhere else, using the 5-point stencil
//! on a unit grid. A non-negative forcing therefore pulls the membrane to
//! negative `u`. Pixels are
//! relaxed in place, `i` outer and `j` inner, so each update already sees the
//! new values of its `(i-1, j)` and `(i, j-1)` neighbours.
//!
//! The relaxation factor defaults to the Chebyshev optimum for a rectangle of
//! the same size, which is a good estimate for the irregular apertures a
//! membrane mirror uses.

use std::f64::consts::PI;
use std::fmt;

use crate::error::{MirrorError, Result};
use crate::mask::BoundaryMask;
use crate::raster::Raster;

pub const DEFAULT_TOLERANCE: f64 = 1e-8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveParams {
    /// Stop once the relative change of a sweep drops below this.
    pub tolerance: f64,
    /// Hard cap on sweeps; `None` picks `ceil(2 * sqrt(W * H))`.
    pub max_iterations: Option<usize>,
    /// Over-relaxation factor; `None` picks [`relaxation_factor`].
    pub omega: Option<f64>,
}

impl Default for SolveParams {
    fn default() -> Self {
        SolveParams {
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: None,
            omega: None,
        }
    }
}

impl SolveParams {
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    pub fn with_omega(mut self, omega: f64) -> Self {
        self.omega = Some(omega);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(MirrorError::InvalidParams(format!(
                "tolerance must be finite and >= 0, got {}",
                self.tolerance
            )));
        }
        if self.max_iterations == Some(0) {
            return Err(MirrorError::InvalidParams(
                "max_iterations must be >= 1".into(),
            ));
        }
        if let Some(omega) = self.omega {
            if !(omega > 0.0 && omega < 2.0) {
                return Err(MirrorError::InvalidParams(format!(
                    "omega must lie in (0, 2), got {omega}"
                )));
            }
        }
        Ok(())
    }

    pub fn iterations_for(&self, width: usize, height: usize) -> usize {
        self.max_iterations
            .unwrap_or_else(|| default_max_iterations(width, height))
    }

    pub fn omega_for(&self, width: usize, height: usize) -> f64 {
        self.omega
            .unwrap_or_else(|| relaxation_factor(width, height))
    }
}

/// Spectral radius of Jacobi iteration on a `width` x `height` rectangle.
pub fn spectral_radius(width: usize, height: usize) -> f64 {
    ((PI / width as f64).cos() + (PI / height as f64).cos()) / 2.0
}

/// Chebyshev-optimal SOR factor, always in `(1, 2)` for grids of 3x3 or more.
pub fn relaxation_factor(width: usize, height: usize) -> f64 {
    let rho = spectral_radius(width, height);
    2.0 / (1.0 + (1.0 - rho * rho).sqrt())
}

pub fn default_max_iterations(width: usize, height: usize) -> usize {
    (2.0 * ((width * height) as f64).sqrt()).ceil() as usize
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverState {
    Initialized,
    Running,
    Converged,
    MaxIterReached,
    Failed,
}

impl SolverState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SolverState::Initialized | SolverState::Running)
    }
}

/// Why a successful solve stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Termination {
    Converged,
    MaxIterReached,
}

impl Termination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Termination::Converged => "converged",
            Termination::MaxIterReached => "max_iter_reached",
        }
    }

    pub fn is_converged(&self) -> bool {
        matches!(self, Termination::Converged)
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accumulators of a single sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepStats {
    /// Sum of `u` over relaxed pixels, after their update.
    pub sum: f64,
    /// Sum of squared applied corrections `(omega * residual)^2`.
    pub change_sq: f64,
}

impl SweepStats {
    /// `sqrt(change_sq / sum^2)`. A zero sum reports infinity, except for an
    /// unforced membrane, which is already at rest.
    pub fn relative_residual(&self, unforced: bool) -> f64 {
        if self.sum == 0.0 {
            if unforced { 0.0 } else { f64::INFINITY }
        } else {
            (self.change_sq / (self.sum * self.sum)).sqrt()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub deflection: Raster<f64>,
    pub termination: Termination,
    pub sweeps: usize,
    pub residual: f64,
    pub omega: f64,
}

impl Solution {
    /// Adds `gain * u` onto an existing wavefront of the same shape.
    pub fn accumulate_into(&self, image: &mut Raster<f64>, gain: f64) -> Result<()> {
        image.ensure_shape(&self.deflection)?;
        for (dst, &u) in image
            .as_mut_slice()
            .iter_mut()
            .zip(self.deflection.as_slice())
        {
            *dst += gain * u;
        }
        Ok(())
    }
}

pub struct SorSolver<'a> {
    mask: &'a BoundaryMask,
    forcing: &'a Raster<f64>,
    u: Raster<f64>,
    omega: f64,
    tolerance: f64,
    max_iterations: usize,
    unforced: bool,
    sweeps: usize,
    residual: f64,
    state: SolverState,
}

impl<'a> SorSolver<'a> {
    pub fn new(mask: &'a BoundaryMask, forcing: &'a Raster<f64>, params: SolveParams) -> Result<Self> {
        params.validate()?;
        mask.raster().ensure_shape(forcing)?;
        if let Some((i, j, value)) = forcing.find_non_finite() {
            return Err(MirrorError::NonFiniteInput { i, j, value });
        }

        let (w, h) = forcing.shape();
        let omega = params.omega_for(w, h);
        let max_iterations = params.iterations_for(w, h);
        log::debug!(
            "SOR on {w}x{h}: {} interior pixels, omega={omega:.6}, max_iterations={max_iterations}",
            mask.interior_count()
        );

        Ok(SorSolver {
            mask,
            forcing,
            u: Raster::new(w, h)?,
            omega,
            tolerance: params.tolerance,
            max_iterations,
            unforced: forcing.as_slice().iter().all(|&v| v == 0.0),
            sweeps: 0,
            residual: f64::INFINITY,
            state: SolverState::Initialized,
        })
    }

    /// Starts from a previous deflection instead of zero. Pixels outside the
    /// mask are cleared.
    pub fn warm_start(mut self, initial: Raster<f64>) -> Result<Self> {
        if self.state != SolverState::Initialized {
            return Err(MirrorError::InvalidParams(
                "warm start is only possible before the first sweep".into(),
            ));
        }
        self.u.ensure_shape(&initial)?;
        if let Some((i, j, value)) = initial.find_non_finite() {
            return Err(MirrorError::NonFiniteInput { i, j, value });
        }
        let mut u = initial;
        for (v, &inside) in u.as_mut_slice().iter_mut().zip(self.mask.raster().as_slice()) {
            if !inside {
                *v = 0.0;
            }
        }
        self.u = u;
        Ok(self)
    }

    // ---- Accessors ----

    pub fn state(&self) -> SolverState {
        self.state
    }

    pub fn sweeps(&self) -> usize {
        self.sweeps
    }

    pub fn residual(&self) -> f64 {
        self.residual
    }

    pub fn omega(&self) -> f64 {
        self.omega
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn deflection(&self) -> &Raster<f64> {
        &self.u
    }

    // ---- Driving ----

    /// Runs one sweep unless the solve already finished, and returns the
    /// state afterwards.
    pub fn step(&mut self) -> Result<SolverState> {
        match self.state {
            SolverState::Converged | SolverState::MaxIterReached => return Ok(self.state),
            SolverState::Failed => return Err(MirrorError::Diverged { sweeps: self.sweeps }),
            SolverState::Initialized | SolverState::Running => {}
        }

        self.state = SolverState::Running;
        let stats = self.sweep();
        self.sweeps += 1;
        self.residual = stats.relative_residual(self.unforced);
        log::trace!(
            "sweep {}: sum={:e} change_sq={:e} r={:e}",
            self.sweeps,
            stats.sum,
            stats.change_sq,
            self.residual
        );

        if !stats.sum.is_finite() || !stats.change_sq.is_finite() {
            self.state = SolverState::Failed;
            return Err(MirrorError::Diverged { sweeps: self.sweeps });
        }

        if self.residual < self.tolerance {
            self.state = SolverState::Converged;
        } else if self.sweeps >= self.max_iterations {
            self.state = SolverState::MaxIterReached;
        }
        Ok(self.state)
    }

    /// Sweeps until convergence or the iteration cap.
    pub fn run(mut self) -> Result<Solution> {
        while !self.step()?.is_terminal() {}

        let termination = match self.state {
            SolverState::Converged => Termination::Converged,
            _ => Termination::MaxIterReached,
        };
        log::debug!(
            "SOR {termination} after {} sweeps (r={:e})",
            self.sweeps,
            self.residual
        );
        Ok(Solution {
            deflection: self.u,
            termination,
            sweeps: self.sweeps,
            residual: self.residual,
            omega: self.omega,
        })
    }

    // ---- Internal numeric routines ----

    fn sweep(&mut self) -> SweepStats {
        let (w, h) = self.u.shape();
        let omega = self.omega;
        let mask = self.mask.raster().as_slice();
        let f = self.forcing.as_slice();
        let u = self.u.as_mut_slice();

        let mut sum = 0.0;
        let mut change_sq = 0.0;

        // Neighbours sit at -/+height along i and -/+1 along j.
        for i in 1..(w - 1) {
            let col = i * h;
            for j in 1..(h - 1) {
                let k = col + j;
                if !mask[k] {
                    u[k] = 0.0;
                    continue;
                }
                let residual = -u[k] - (f[k] - u[k - h] - u[k + h] - u[k - 1] - u[k + 1]) / 4.0;
                let delta = omega * residual;
                u[k] += delta;
                sum += u[k];
                change_sq += delta * delta;
            }
        }

        SweepStats { sum, change_sq }
    }
}
