//! End-to-end solves on small hand-checkable membranes.

use membrane_core::sor::spectral_radius;
use membrane_core::{
    BoundaryMask, MirrorError, Raster, ResponseDriver, SolveParams, SolverState, SorSolver,
    Termination, WAVEFRONT_CALIBRATION, relaxation_factor,
};

fn single_pixel_aperture(n: usize, at: (usize, usize)) -> Raster<u8> {
    Raster::from_fn(n, n, |i, j| u8::from((i, j) == at)).unwrap()
}

fn disc(n: usize, radius: f64) -> Raster<u8> {
    let c = (n - 1) as f64 / 2.0;
    Raster::from_fn(n, n, |i, j| {
        let (dx, dy) = (i as f64 - c, j as f64 - c);
        if dx * dx + dy * dy <= radius * radius { 255 } else { 0 }
    })
    .unwrap()
}

#[test]
fn single_interior_pixel_settles_at_quarter_forcing() {
    let aperture = single_pixel_aperture(5, (2, 2));
    let electrodes = Raster::from_vec(5, 5, vec![1u8; 25]).unwrap();
    let driver = ResponseDriver::new(&aperture, electrodes, 1).unwrap();

    let f = 1.0 / WAVEFRONT_CALIBRATION;
    let omega = relaxation_factor(5, 5);

    // first sweep: all neighbours are clamped, so the update is -omega * f / 4
    let forcing = driver.forcing_for(&[255]).unwrap();
    let mut solver = SorSolver::new(driver.mask(), &forcing, SolveParams::default()).unwrap();
    solver.step().unwrap();
    let first = solver.deflection().get(2, 2).unwrap();
    assert!((first + omega * f / 4.0).abs() < 1e-15);

    let sol = driver
        .respond(&[255], SolveParams::default().with_max_iterations(100))
        .unwrap();
    assert_eq!(sol.termination, Termination::Converged);
    let u = sol.deflection.get(2, 2).unwrap();
    assert!((u + f / 4.0).abs() < 1e-8 * f, "u(2,2) = {u}");
    for ((i, j), &v) in sol.deflection.indexed() {
        if (i, j) != (2, 2) {
            assert_eq!(v, 0.0);
        }
    }
}

#[test]
fn zero_voltage_converges_immediately() {
    let aperture = Raster::from_vec(7, 7, vec![1u8; 49]).unwrap();
    let electrodes = Raster::from_fn(7, 7, |i, j| ((i + j) % 3) as u8).unwrap();
    let driver = ResponseDriver::new(&aperture, electrodes, 2).unwrap();

    let sol = driver.respond(&[0, 0], SolveParams::default()).unwrap();
    assert_eq!(sol.termination, Termination::Converged);
    assert!(sol.sweeps <= 2);
    assert!(sol.deflection.as_slice().iter().all(|&u| u == 0.0));
}

#[test]
fn minimum_grid_solves_single_pixel() {
    let aperture = Raster::from_vec(3, 3, vec![1u8; 9]).unwrap();
    let electrodes = Raster::from_vec(3, 3, vec![1u8; 9]).unwrap();
    let driver = ResponseDriver::new(&aperture, electrodes, 1).unwrap();

    let sol = driver
        .respond(&[128], SolveParams::default().with_max_iterations(50))
        .unwrap();
    let expected = -(128.0f64 / 255.0).powi(2) / WAVEFRONT_CALIBRATION / 4.0;
    assert_eq!(sol.termination, Termination::Converged);
    assert!((sol.deflection.get(1, 1).unwrap() - expected).abs() < 1e-8 * expected.abs());
    assert!(sol.omega > 1.0 && sol.omega < 2.0);
}

#[test]
fn rectangular_grid_relaxation_factor() {
    let rho = (std::f64::consts::PI / 100.0).cos() / 2.0 + (std::f64::consts::PI / 50.0).cos() / 2.0;
    assert!((spectral_radius(100, 50) - rho).abs() < 1e-14);
    assert!((spectral_radius(100, 50) - 0.9987666443970016).abs() < 1e-10);

    let omega = relaxation_factor(100, 50);
    assert!((omega - 2.0 / (1.0 + (1.0 - rho * rho).sqrt())).abs() < 1e-10);
    assert!((omega - 1.9053958024423505).abs() < 1e-10);
}

#[test]
fn iteration_cap_returns_usable_deflection() {
    let aperture = disc(32, 14.0);
    let electrodes = Raster::from_fn(32, 32, |i, j| (1 + (i / 8) * 4 + j / 8) as u8).unwrap();
    let driver = ResponseDriver::new(&aperture, electrodes, 16).unwrap();
    let voltages: Vec<i32> = (0..16).map(|k| 40 + 13 * k).collect();

    let params = SolveParams::default().with_tolerance(0.0).with_max_iterations(5);
    let sol = driver.respond(&voltages, params).unwrap();
    assert_eq!(sol.termination, Termination::MaxIterReached);
    assert_eq!(sol.sweeps, 5);
    for ((i, j), &u) in sol.deflection.indexed() {
        assert!(u.is_finite());
        if !driver.mask().is_interior(i, j) {
            assert_eq!(u, 0.0);
        }
    }
}

#[test]
fn mismatched_inputs_fail_before_sweeping() {
    let aperture: Raster<u8> = Raster::new(10, 10).unwrap();
    let electrodes: Raster<u8> = Raster::new(10, 11).unwrap();
    assert!(matches!(
        ResponseDriver::new(&aperture, electrodes, 37),
        Err(MirrorError::ShapeMismatch { .. })
    ));

    let mask = BoundaryMask::from_aperture(&aperture);
    let forcing: Raster<f64> = Raster::new(10, 11).unwrap();
    assert_eq!(
        SorSolver::new(&mask, &forcing, SolveParams::default()).err(),
        Some(MirrorError::ShapeMismatch {
            expected: (10, 10),
            found: (10, 11)
        })
    );
}

#[test]
fn solver_reports_running_until_done() {
    let aperture = disc(16, 6.0);
    let mask = BoundaryMask::from_aperture(&aperture);
    let forcing = Raster::from_vec(16, 16, vec![0.01; 256]).unwrap();
    let mut solver = SorSolver::new(&mask, &forcing, SolveParams::default()).unwrap();
    let cap = solver.max_iterations();
    assert_eq!(cap, 32);

    let mut last = solver.state();
    assert_eq!(last, SolverState::Initialized);
    while !last.is_terminal() {
        last = solver.step().unwrap();
    }
    assert!(matches!(
        last,
        SolverState::Converged | SolverState::MaxIterReached
    ));
    assert!(solver.sweeps() <= cap);
}
